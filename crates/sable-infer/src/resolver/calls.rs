// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pass one for calls and member accesses.

use std::collections::HashSet;

use itertools::Itertools;
use sable_ast::decl::TypeExpr;
use sable_ast::expr::{Expr, ExprKind};
use sable_ast::{DeclId, ScopeId, Span};
use sable_resolve::DeclKind;
use sable_types::{is_a_rigid, FunctionType, Substitution, Type, TypeError, TypeVar};

use super::Resolver;
use crate::context::{CallMatch, TypeContext};
use crate::program::ConstructorKind;

/// The class a method call or field access is resolved in.
#[derive(Debug, Clone)]
pub(super) struct MemberTarget {
    pub(super) scope: ScopeId,
    /// Class parameters bound to the object's type arguments, plus the
    /// instantiations the class makes of its own super classes.
    pub(super) subst: Substitution,
}

impl<'a> Resolver<'a> {
    /// Overloads of `name` visible from `scope` with overridden ones
    /// removed. Signatures are committed first so overrides can be compared.
    pub(super) fn overload_candidates(
        &mut self,
        scope: ScopeId,
        name: &str,
        class_only: bool,
        span: Span,
    ) -> Result<Vec<DeclId>, TypeError> {
        let layers = self.program.scopes.overload_layers(scope, name, class_only);
        for id in layers.into_iter().flatten() {
            self.decl_type(id)?;
        }
        self.program
            .scopes
            .resolve_overloads(scope, name, &self.program.decls, class_only, span)
    }

    /// Typings of a call: one per candidate declaration and argument type
    /// combination that unifies with it.
    pub(super) fn collect_call(
        &mut self,
        callee: &str,
        type_args: &[TypeExpr],
        args: &[Expr],
        scope: ScopeId,
        member: Option<&MemberTarget>,
        span: Span,
    ) -> Result<Vec<TypeContext>, TypeError> {
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            let found = self.collect_expr(arg)?;
            let types = found.into_iter().map(|c| self.subst.apply(&c.ty)).unique().collect_vec();
            arg_types.push(types);
        }

        let (targets, constructor) = self.call_targets(callee, scope, member, span)?;
        let explicit = type_args
            .iter()
            .map(|t| self.annotate(t, scope))
            .collect::<Result<Vec<_>, _>>()?;

        let combinations: usize = arg_types.iter().map(Vec::len).product();
        if combinations > self.options.combination_warn_limit {
            tracing::warn!(callee, combinations, "large number of argument type combinations");
        }
        let tuples: Vec<Vec<Type>> = if arg_types.is_empty() {
            vec![vec![]]
        } else {
            arg_types.iter().cloned().multi_cartesian_product().collect()
        };

        let base = match member {
            Some(target) => target.subst.clone(),
            None => self.program.scopes.substitutions(scope),
        }
        .merged(&self.subst);

        let visible = self.rigid_at(scope);
        let mut found = Vec::new();
        let mut arity_error = None;
        for &target in &targets {
            let Some(sig) = self.decl_type(target)?.as_function().cloned() else {
                continue;
            };
            let type_params = self.call_type_params(target, constructor.is_some());
            // The callee's own parameters are instantiated here even when the
            // call sits inside its declaration.
            let rigid: HashSet<_> = visible
                .iter()
                .copied()
                .filter(|v| type_params.iter().all(|p| p.id != *v))
                .collect();

            let mut preset = base.clone();
            if !explicit.is_empty() {
                if explicit.len() != type_params.len() {
                    arity_error.get_or_insert(TypeError::GenericArity {
                        name: callee.to_string(),
                        expected: type_params.len(),
                        found: explicit.len(),
                        span,
                    });
                    continue;
                }
                for (var, ty) in type_params.iter().zip(&explicit) {
                    preset.bind(var.id, ty.clone());
                }
            }

            let kind = constructor.map(|_| {
                if self.decl(target).as_procedure().is_some_and(|p| p.synthesized) {
                    ConstructorKind::Synthesized
                } else {
                    ConstructorKind::Explicit
                }
            });
            let params = sig.params.iter().map(|p| base.apply(p)).collect_vec();
            let declared = Type::Function(sig.clone());
            for tuple in &tuples {
                let offered = Type::Function(FunctionType {
                    name: callee.to_string(),
                    params: tuple.clone(),
                    ret: Box::new(Type::Top),
                });
                let Ok(subst) = is_a_rigid(&offered, &declared, &preset, &rigid) else { continue };
                found.push(TypeContext {
                    ty: subst.apply(&sig.ret),
                    qualifier: None,
                    decl: Some(target),
                    subst,
                    call: Some(CallMatch {
                        args: tuple.clone(),
                        params: params.clone(),
                        type_params: type_params.clone(),
                        constructor: kind,
                    }),
                });
            }
        }

        tracing::trace!(
            callee,
            targets = targets.len(),
            combinations,
            matches = found.len(),
            "call candidates collected"
        );
        if found.is_empty() {
            if let Some(err) = arity_error {
                return Err(err);
            }
            return Err(TypeError::NoMatchingCall {
                name: callee.to_string(),
                args: arg_types.iter().map(|t| t.first().cloned().unwrap_or(Type::Top)).collect(),
                span,
            });
        }
        Ok(found)
    }

    /// Declarations a call of `callee` may pick from, and whether the call
    /// constructs a class.
    fn call_targets(
        &mut self,
        callee: &str,
        scope: ScopeId,
        member: Option<&MemberTarget>,
        span: Span,
    ) -> Result<(Vec<DeclId>, Option<DeclId>), TypeError> {
        if let Some(target) = member {
            let found = self.overload_candidates(target.scope, callee, true, span)?;
            return Ok((found, None));
        }

        if let Some(id) = self.program.scopes.resolve(scope, callee) {
            match &self.decl(id).kind {
                DeclKind::Class(info) => {
                    let initializers = info.initializers();
                    self.decl_type(id)?;
                    return Ok((initializers, Some(id)));
                }
                DeclKind::CoreClass => {
                    return Err(TypeError::invalid(format!("core class `{}` has no initializer", callee), span));
                }
                DeclKind::TypeParam(_) => {
                    return Err(TypeError::invalid(format!("type parameter `{}` is not callable", callee), span));
                }
                DeclKind::Variable(_) | DeclKind::Procedure(_) => {
                    let callable = !self.program.scopes.overload_layers(scope, callee, false).is_empty();
                    if !callable {
                        return Err(TypeError::invalid(format!("`{}` is not callable", callee), span));
                    }
                }
            }
        }
        let found = self.overload_candidates(scope, callee, false, span)?;
        Ok((found, None))
    }

    /// Variables a call of `target` has to bind: the class parameters for
    /// an initializer, the procedure's own parameters otherwise.
    fn call_type_params(&self, target: DeclId, constructs: bool) -> Vec<TypeVar> {
        let Some(proc) = self.decl(target).as_procedure() else { return Vec::new() };
        let owner_params = match (constructs, proc.constructor_of) {
            (true, Some(class)) => self.decl(class).as_class().map(|c| c.type_params.clone()).unwrap_or_default(),
            _ => proc.type_params.clone(),
        };
        owner_params
            .iter()
            .filter_map(|&tp| match &self.decl(tp).kind {
                DeclKind::TypeParam(var) => Some(var.clone()),
                _ => None,
            })
            .collect()
    }

    /// Typings of `object.member`: for each class the object may be, the
    /// member resolved in that class, tagged with the object's type.
    pub(super) fn collect_member(&mut self, object: &Expr, member: &Expr, span: Span) -> Result<Vec<TypeContext>, TypeError> {
        let objects = self.collect_expr(object)?;
        let scope = self.scope_of(member.id, member.span)?;

        let mut found: Vec<TypeContext> = Vec::new();
        let mut first_error = None;
        for object_ty in objects.iter().map(|c| self.subst.apply(&c.ty)).unique().collect_vec() {
            let Some(target) = self.member_target(&object_ty) else { continue };
            let result = match &member.kind {
                ExprKind::Ident(name) => self.field_contexts(name, &target, member.span),
                ExprKind::Call { callee, type_args, args } => {
                    self.collect_call(callee, type_args, args, scope, Some(&target), member.span)
                }
                _ => return Err(TypeError::invalid("member must be a field or a method call", member.span)),
            };
            match result {
                Ok(contexts) => found.extend(contexts.into_iter().map(|c| c.qualified(object_ty.clone()))),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        if found.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                TypeError::invalid("member access on a value that is not a class instance", span)
            }));
        }
        self.contexts.insert(member.id, found.clone());
        Ok(found)
    }

    /// Member scope and parameter bindings for an object of type `object`.
    fn member_target(&self, object: &Type) -> Option<MemberTarget> {
        let class = object.as_class()?;
        let id = self.program.decls.class_named(&class.name)?;
        let info = self.decl(id).as_class()?;

        let mut subst = Substitution::new();
        for (&tp, arg) in info.type_params.iter().zip(&class.params) {
            if let DeclKind::TypeParam(var) = &self.decl(tp).kind {
                if arg != &Type::Var(var.clone()) {
                    subst.bind(var.id, arg.clone());
                }
            }
        }
        subst.merge(&self.program.scopes.substitutions(info.member_scope));
        Some(MemberTarget {
            scope: info.member_scope,
            subst,
        })
    }

    fn field_contexts(&mut self, name: &str, target: &MemberTarget, span: Span) -> Result<Vec<TypeContext>, TypeError> {
        let unknown = || TypeError::UnknownIdentifier {
            name: name.to_string(),
            span,
        };
        let id = self.program.scopes.lookup_in_class(target.scope, name).ok_or_else(unknown)?;
        if self.decl(id).as_variable().is_none() {
            return Err(unknown());
        }
        let ty = self.decl_type(id)?;
        Ok(vec![TypeContext::denoting(target.subst.apply(&ty), id)])
    }
}
