// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pass two: narrow every expression to a single typing.

use itertools::{iproduct, Itertools};
use sable_ast::decl::{Decl, DeclKind as AstDeclKind};
use sable_ast::expr::{Expr, ExprKind};
use sable_ast::stmt::{Stmt, StmtKind};
use sable_ast::DeclId;
use sable_resolve::DeclKind;
use sable_types::{is_a_rigid, more_specific, unifiable, ErrorKind, Type, TypeError};

use super::Resolver;
use crate::context::TypeContext;
use crate::program::CallResolution;

/// What the surrounding construct requires of an expression's type.
#[derive(Debug, Clone)]
pub(super) enum Expect {
    /// Nothing; the expression must be unambiguous on its own.
    None,
    /// The value flows into a slot of this type.
    Into(Type),
    /// A value of this type flows into the expression.
    From(Type),
    /// This type, as already chosen by an enclosing call or member access.
    Exact(Type),
    /// Related to this type in either direction.
    Related(Type),
}

impl Expect {
    fn expected(&self) -> Type {
        match self {
            Expect::None => Type::Top,
            Expect::Into(t) | Expect::From(t) | Expect::Exact(t) | Expect::Related(t) => t.clone(),
        }
    }
}

/// `a` is more specific than `b` and not the other way round.
fn strictly_more_specific(a: &[Type], b: &[Type]) -> bool {
    more_specific(a, b) && !more_specific(b, a)
}

fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Call { callee, .. } => format!("call to `{}`", callee),
        ExprKind::Ident(name) => format!("reference to `{}`", name),
        ExprKind::Member { member, .. } => describe(member),
        _ => "expression".to_string(),
    }
}

impl<'a> Resolver<'a> {
    pub(super) fn fix_decl(&mut self, decl: &Decl) -> Result<(), TypeError> {
        match &decl.kind {
            AstDeclKind::Class(class) => {
                for member in &class.members {
                    self.fix_decl(member)?;
                }
            }
            AstDeclKind::Procedure(proc) => {
                for stmt in &proc.body {
                    self.fix_stmt(stmt)?;
                }
            }
            AstDeclKind::Variable(var) => {
                if let Some(init) = &var.init {
                    let id = self.decl_id(decl.id, decl.span)?;
                    let declared = self.decl_type(id)?;
                    let ty = self.subst.apply(&declared);
                    self.fix_expr(init, Expect::Into(ty))?;
                }
            }
        }
        Ok(())
    }

    fn fix_stmt(&mut self, stmt: &Stmt) -> Result<(), TypeError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.fix_expr(expr, Expect::None)?;
            }
            StmtKind::Var(var) => {
                if let Some(init) = &var.init {
                    let id = self.decl_id(stmt.id, stmt.span)?;
                    let declared = self.decl_type(id)?;
                    let ty = self.subst.apply(&declared);
                    self.fix_expr(init, Expect::Into(ty))?;
                }
            }
            StmtKind::Assign { target, value } => self.fix_assign(stmt, target, value)?,
            StmtKind::Return(value) => self.fix_return(stmt, value.as_ref())?,
            StmtKind::If { cond, then_body, else_body } => {
                self.fix_expr(cond, Expect::Exact(self.core.bool()))?;
                for stmt in then_body.iter().chain(else_body) {
                    self.fix_stmt(stmt)?;
                }
            }
            StmtKind::While { cond, body } => {
                self.fix_expr(cond, Expect::Exact(self.core.bool()))?;
                for stmt in body {
                    self.fix_stmt(stmt)?;
                }
            }
        }
        self.node_types.insert(stmt.id, self.core.void());
        Ok(())
    }

    /// Both sides single: they must unify. One side single: it decides.
    /// Neither: the pairs that unify must come down to exactly one.
    fn fix_assign(&mut self, stmt: &Stmt, target: &Expr, value: &Expr) -> Result<(), TypeError> {
        if !target.kind.is_place() {
            return Err(TypeError::invalid("cannot assign to this expression", target.span));
        }
        let targets = self.candidate_types(target)?;
        let values = self.candidate_types(value)?;

        if targets.len() == 1 {
            let ty = self.fix_expr(target, Expect::None)?;
            self.fix_expr(value, Expect::Into(ty))?;
            return Ok(());
        }
        if values.len() == 1 {
            let ty = self.fix_expr(value, Expect::None)?;
            self.fix_expr(target, Expect::From(ty))?;
            return Ok(());
        }

        let rigid = self.rigid_at(self.scope_of(stmt.id, stmt.span)?);
        let pairs = iproduct!(targets.iter(), values.iter())
            .filter(|(t, v)| is_a_rigid(v, t, &self.subst, &rigid).is_ok())
            .collect_vec();
        match pairs.as_slice() {
            [] => Err(TypeError::Mismatch {
                expected: targets[0].clone(),
                found: values[0].clone(),
                span: stmt.span,
            }),
            [(t, v)] => {
                let (t, v) = ((*t).clone(), (*v).clone());
                self.fix_expr(target, Expect::Exact(t))?;
                self.fix_expr(value, Expect::Exact(v))?;
                Ok(())
            }
            _ => Err(TypeError::Ambiguous {
                what: "assignment".to_string(),
                candidates: pairs.iter().map(|(t, _)| (*t).clone()).unique().collect(),
                span: stmt.span,
            }),
        }
    }

    fn fix_return(&mut self, stmt: &Stmt, value: Option<&Expr>) -> Result<(), TypeError> {
        let scope = self.scope_of(stmt.id, stmt.span)?;
        let proc = self
            .program
            .scopes
            .enclosing_procedure(scope)
            .ok_or_else(|| TypeError::invalid("return outside of a procedure", stmt.span))?;

        if self.decl(proc).as_procedure().is_some_and(|p| p.constructor_of.is_some()) {
            if let Some(value) = value {
                return Err(TypeError::invalid("an initializer cannot return a value", value.span));
            }
            return Ok(());
        }

        let declared = self.decl_type(proc)?;
        let ret = match declared.as_function() {
            Some(f) => self.subst.apply(&f.ret),
            None => return Err(TypeError::internal("procedure without a signature", stmt.span)),
        };
        match value {
            Some(value) => {
                self.fix_expr(value, Expect::Into(ret))?;
            }
            None => {
                let void = self.core.void();
                if is_a_rigid(&void, &ret, &self.subst, &self.rigid_at(scope)).is_err() {
                    return Err(TypeError::Mismatch {
                        expected: ret,
                        found: void,
                        span: stmt.span,
                    });
                }
            }
        }
        Ok(())
    }

    /// Distinct candidate types of an expression collected in pass one.
    fn candidate_types(&self, expr: &Expr) -> Result<Vec<Type>, TypeError> {
        let contexts = self
            .contexts
            .get(&expr.id)
            .ok_or_else(|| TypeError::internal("expression was never collected", expr.span))?;
        Ok(contexts.iter().map(|c| self.subst.apply(&c.ty)).unique().collect())
    }

    pub(super) fn fix_expr(&mut self, expr: &Expr, expect: Expect) -> Result<Type, TypeError> {
        let winner = self.select(expr, &expect)?;
        self.commit(expr, winner)
    }

    /// Whether the bindings of a typing agree with the program-wide ones.
    fn consistent(&self, ctx: &TypeContext) -> bool {
        ctx.subst.iter().all(|(var, ty)| match self.subst.get(*var) {
            Some(global) => unifiable(&self.subst.apply(global), &self.subst.apply(ty)),
            None => true,
        })
    }

    /// Keep the typings `expect` admits, then the best fits among them.
    fn select(&mut self, expr: &Expr, expect: &Expect) -> Result<TypeContext, TypeError> {
        let candidates = self
            .contexts
            .get(&expr.id)
            .cloned()
            .ok_or_else(|| TypeError::internal("expression was never collected", expr.span))?;

        let rigid = self.rigid_at(self.scope_of(expr.id, expr.span)?);
        let mut admitted = Vec::new();
        for mut ctx in candidates.iter().cloned() {
            if !self.consistent(&ctx) {
                continue;
            }
            let base = ctx.subst.clone().merged(&self.subst);
            let ty = base.apply(&ctx.ty);
            let checked = match expect {
                Expect::None => Ok(base),
                Expect::Into(t) => is_a_rigid(&ty, t, &base, &rigid),
                Expect::From(t) => is_a_rigid(t, &ty, &base, &rigid),
                Expect::Exact(t) => {
                    is_a_rigid(&ty, t, &base, &rigid).and_then(|s| is_a_rigid(t, &ty, &s, &rigid))
                }
                Expect::Related(t) => {
                    is_a_rigid(&ty, t, &base, &rigid).or_else(|_| is_a_rigid(t, &ty, &base, &rigid))
                }
            };
            if let Ok(subst) = checked {
                ctx.ty = subst.apply(&ctx.ty);
                ctx.subst = subst;
                admitted.push(ctx);
            }
        }
        let admitted = admitted
            .into_iter()
            .unique_by(|c| (c.ty.clone(), c.decl, c.call.as_ref().map(|m| m.args.clone())))
            .collect_vec();

        let keys = admitted
            .iter()
            .map(|c| c.specificity_key().iter().map(|t| self.subst.apply(t)).collect_vec())
            .collect_vec();
        let best = (0..admitted.len())
            .filter(|&j| !(0..admitted.len()).any(|i| i != j && strictly_more_specific(&keys[i], &keys[j])))
            .collect_vec();
        if best.len() < admitted.len() {
            tracing::trace!(
                what = %describe(expr),
                admitted = admitted.len(),
                kept = best.len(),
                "less specific candidates dropped"
            );
        }

        match best.as_slice() {
            [] => Err(TypeError::Mismatch {
                expected: expect.expected(),
                found: candidates
                    .first()
                    .map(|c| self.subst.apply(&c.ty))
                    .unwrap_or(Type::Bottom),
                span: expr.span,
            }),
            [only] => Ok(admitted[*only].clone()),
            _ => Err(TypeError::Ambiguous {
                what: describe(expr),
                candidates: best.iter().map(|&i| admitted[i].ty.clone()).collect(),
                span: expr.span,
            }),
        }
    }

    /// Record `ctx` as the typing of `expr` and fix its subexpressions
    /// accordingly.
    fn commit(&mut self, expr: &Expr, ctx: TypeContext) -> Result<Type, TypeError> {
        self.absorb(&ctx.subst);
        let ty = ctx.ty.clone();
        self.node_types.insert(expr.id, ty.clone());
        if let Some(decl) = ctx.decl {
            self.node_decls.insert(expr.id, decl);
            self.pin_variable(decl, &ty);
        }

        match &expr.kind {
            ExprKind::Call { callee, args, .. } => self.commit_call(expr, callee, args, &ctx)?,
            ExprKind::Member { object, member } => {
                let qualifier = ctx
                    .qualifier
                    .clone()
                    .ok_or_else(|| TypeError::internal("member typing without an object type", expr.span))?;
                self.fix_expr(object, Expect::Exact(qualifier))?;
                self.commit(member, ctx)?;
            }
            ExprKind::Cast { expr: inner, ty: written } => {
                let from = self.candidate_types(inner)?.first().cloned().unwrap_or(Type::Bottom);
                match self.fix_expr(inner, Expect::Related(ty.clone())) {
                    Ok(_) => {}
                    Err(err) if err.kind() == ErrorKind::Mismatch && err.span() == inner.span => {
                        return Err(TypeError::ImpossibleCast {
                            from,
                            to: ty.clone(),
                            span: written.span.to(inner.span),
                        });
                    }
                    Err(err) => return Err(err),
                }
            }
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::String(_)
            | ExprKind::Char(_)
            | ExprKind::Bool(_)
            | ExprKind::This
            | ExprKind::Ident(_) => {}
        }
        Ok(ty)
    }

    /// A `?` variable used before its declaration was fixed takes the type
    /// its use settled on.
    fn pin_variable(&mut self, decl: DeclId, ty: &Type) {
        let declared = self.decl(decl);
        if !matches!(declared.kind, DeclKind::Variable(_)) {
            return;
        }
        let Some(declared) = declared.ty.get().map(|t| self.subst.apply(t)) else {
            return;
        };
        if let Type::Var(var) = declared {
            if !self.type_params.contains(&var.id) && !ty.occurs(var.id) {
                self.subst.bind(var.id, ty.clone());
            }
        }
    }

    fn commit_call(&mut self, expr: &Expr, callee: &str, args: &[Expr], ctx: &TypeContext) -> Result<(), TypeError> {
        let (Some(call), Some(target)) = (&ctx.call, ctx.decl) else {
            return Err(TypeError::internal("call typing without a target", expr.span));
        };
        for (arg, ty) in args.iter().zip(&call.args) {
            let expected = self.subst.apply(&ctx.subst.apply(ty));
            self.fix_expr(arg, Expect::Exact(expected))?;
        }

        let scope = self.scope_of(expr.id, expr.span)?;
        let missing = call
            .type_params
            .iter()
            .filter(|tp| ctx.subst.apply(&Type::Var((*tp).clone())) == Type::Var((*tp).clone()))
            .filter(|tp| !self.in_scope(tp, scope))
            .map(|tp| tp.to_string())
            .collect_vec();
        if !missing.is_empty() {
            return Err(TypeError::UnrecoverableTypeParams {
                name: callee.to_string(),
                missing,
                span: expr.span,
            });
        }

        let type_args = call
            .type_params
            .iter()
            .map(|tp| ctx.subst.apply(&Type::Var(tp.clone())))
            .collect();
        self.calls.insert(
            expr.id,
            CallResolution {
                target,
                type_args,
                constructor: call.constructor,
            },
        );
        Ok(())
    }
}
