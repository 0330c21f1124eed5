// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Pass one: declaration types and candidate typings.

use itertools::Itertools;
use sable_ast::decl::{Decl, DeclKind as AstDeclKind, TypeExpr};
use sable_ast::expr::{Expr, ExprKind};
use sable_ast::stmt::{Stmt, StmtKind};
use sable_ast::{DeclId, ScopeId, Span};
use sable_resolve::DeclKind;
use sable_types::{erase, ClassType, FunctionType, Substitution, Type, TypeError};

use super::Resolver;
use crate::context::TypeContext;

/// What kind of type a declaration still needs.
enum Shape {
    Class,
    Procedure,
    Variable(TypeExpr, ScopeId),
    Preset,
}

impl<'a> Resolver<'a> {
    pub(super) fn collect_decl(&mut self, decl: &Decl) -> Result<(), TypeError> {
        let id = self.decl_id(decl.id, decl.span)?;
        self.decl_type(id)?;
        match &decl.kind {
            AstDeclKind::Class(class) => {
                for member in &class.members {
                    self.collect_decl(member)?;
                }
                let default = self.decl(id).as_class().and_then(|info| info.default_constructor);
                if let Some(ctor) = default {
                    self.decl_type(ctor)?;
                }
            }
            AstDeclKind::Procedure(_) => self.collect_body(id)?,
            AstDeclKind::Variable(var) => {
                if let Some(init) = &var.init {
                    self.collect_expr(init)?;
                }
            }
        }
        Ok(())
    }

    /// Type of a declaration, computing and committing it on first use.
    pub(super) fn decl_type(&mut self, id: DeclId) -> Result<Type, TypeError> {
        let decl = &self.program.decls[id];
        if let Some(ty) = decl.ty.get() {
            return Ok(ty.clone());
        }
        let (name, span) = (decl.name.clone(), decl.span);
        let shape = match &decl.kind {
            DeclKind::Class(_) => Shape::Class,
            DeclKind::Procedure(_) => Shape::Procedure,
            DeclKind::Variable(var) => Shape::Variable(var.ty.clone(), decl.scope),
            DeclKind::CoreClass | DeclKind::TypeParam(_) => Shape::Preset,
        };
        if !self.visited.insert(id) {
            return Err(match shape {
                Shape::Class => TypeError::CyclicInheritance { name, span },
                _ => TypeError::internal(format!("type of `{}` depends on itself", name), span),
            });
        }

        match shape {
            Shape::Class => self.collect_class(id),
            Shape::Procedure => self.collect_signature(id),
            Shape::Variable(written, scope) => {
                let ty = self.annotate(&written, scope)?;
                self.program.decls[id].ty.set(ty.clone());
                Ok(ty)
            }
            Shape::Preset => Err(TypeError::internal(format!("`{}` has no type", name), span)),
        }
    }

    /// Commit a class type: super types first, then the class itself.
    fn collect_class(&mut self, id: DeclId) -> Result<Type, TypeError> {
        let decl = self.decl(id);
        let (name, span) = (decl.name.clone(), decl.span);
        let info = decl.as_class().cloned().ok_or_else(|| TypeError::internal("not a class", span))?;

        let params = info
            .type_params
            .iter()
            .map(|&tp| self.decl(tp).ty.get().cloned().unwrap_or(Type::Bottom))
            .collect::<Vec<_>>();

        let mut supers = Vec::new();
        for written in &info.supers {
            let ty = self.annotate(written, info.member_scope)?;
            let Type::Class(sup) = ty else {
                return Err(TypeError::invalid(format!("`{}` cannot inherit from {}", name, ty), written.span));
            };
            if sup.distance_to_root().is_none() {
                return Err(TypeError::invalid(format!("`{}` cannot inherit from {}", name, sup), written.span));
            }
            self.link_super(info.member_scope, &sup);
            supers.push(sup);
        }
        if supers.is_empty() {
            if let Type::Class(object) = self.core.object() {
                supers.push(object);
            }
        }

        let ty = Type::Class(ClassType::new(name.clone(), supers, params));
        tracing::trace!(class = %name, ty = %ty, "class type committed");
        self.program.decls[id].ty.set(ty.clone());
        Ok(ty)
    }

    /// Make the members of `sup` visible from `member_scope`, with the super
    /// class's parameters bound to the written arguments.
    fn link_super(&mut self, member_scope: ScopeId, sup: &ClassType) {
        let Some(super_id) = self.program.decls.class_named(&sup.name) else { return };
        let Some(super_info) = self.decl(super_id).as_class() else { return };
        let (super_scope, super_params) = (super_info.member_scope, super_info.type_params.clone());
        self.program.scopes.add_class_parent(member_scope, super_scope);

        let mut inst = Substitution::new();
        for (param, arg) in super_params.iter().zip(&sup.params) {
            if let Some(Type::Var(var)) = self.decl(*param).ty.get() {
                if arg != &Type::Var(var.clone()) {
                    inst.bind(var.id, arg.clone());
                }
            }
        }
        if !inst.is_empty() {
            self.program.scopes.add_substitution(member_scope, &inst);
        }
    }

    /// Commit a procedure signature. Procedures declared `?` get a
    /// placeholder return variable bound once their body is collected.
    fn collect_signature(&mut self, id: DeclId) -> Result<Type, TypeError> {
        let decl = self.decl(id);
        let (name, span) = (decl.name.clone(), decl.span);
        let info = decl.as_procedure().cloned().ok_or_else(|| TypeError::internal("not a procedure", span))?;

        let params = info
            .params
            .iter()
            .map(|&p| self.decl_type(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut placeholder = None;
        let ret = match (&info.constructor_of, &info.ret) {
            (Some(class), _) => self.decl_type(*class)?,
            (None, None) => self.core.void(),
            (None, Some(written)) if written.is_infer() && info.is_native => {
                let fallback = self.options.native_return_fallback.clone();
                self.core.get(&fallback).cloned().map(Type::Class).unwrap_or_else(|| self.core.void())
            }
            (None, Some(written)) if written.is_infer() => {
                let var = self.program.vars.fresh(info.body_scope);
                placeholder = Some(var.clone());
                Type::Var(var)
            }
            (None, Some(written)) => self.annotate(written, info.body_scope)?,
        };

        let ty = Type::Function(FunctionType {
            name: name.clone(),
            params,
            ret: Box::new(ret),
        });
        self.program.decls[id].ty.set(ty.clone());
        self.check_duplicate(id)?;

        if let Some(var) = placeholder {
            self.pending_returns.insert(id, var);
            self.collect_body(id)?;
        }
        Ok(ty)
    }

    /// Two non-generic overloads in one set with the same erased parameter
    /// list can never be told apart.
    fn check_duplicate(&self, id: DeclId) -> Result<(), TypeError> {
        let decl = self.decl(id);
        let Some(info) = decl.as_procedure() else { return Ok(()) };
        if !info.type_params.is_empty() || info.synthesized {
            return Ok(());
        }
        let siblings = match info.constructor_of {
            Some(class) => self.decl(class).as_class().map(|c| c.constructors.clone()).unwrap_or_default(),
            None => self
                .program
                .scopes
                .get(decl.scope)
                .and_then(|s| s.overloads.get(&decl.name))
                .cloned()
                .unwrap_or_default(),
        };

        let erased = |ty: &Type| ty.as_function().map(|f| f.params.iter().map(erase).collect_vec());
        let Some(mine) = decl.ty.get().and_then(erased) else { return Ok(()) };
        for other in siblings {
            if other == id {
                continue;
            }
            let other = self.decl(other);
            let generic = other.as_procedure().is_some_and(|p| !p.type_params.is_empty());
            if generic {
                continue;
            }
            if other.ty.get().and_then(erased).as_ref() == Some(&mine) {
                return Err(TypeError::DuplicateOverload {
                    name: decl.name.clone(),
                    signature: erase(decl.ty.get().unwrap_or(&Type::Top)),
                    span: decl.span,
                });
            }
        }
        Ok(())
    }

    pub(super) fn collect_body(&mut self, id: DeclId) -> Result<(), TypeError> {
        if !self.bodies.insert(id) {
            return Ok(());
        }
        let Some(node) = self.decl(id).node else { return Ok(()) };
        if let Some(proc) = self.index.procedure(node) {
            for stmt in &proc.body {
                self.collect_stmt(stmt)?;
            }
        }
        if self.pending_returns.contains_key(&id) {
            self.infer_return(id)?;
        }
        Ok(())
    }

    fn collect_stmt(&mut self, stmt: &Stmt) -> Result<(), TypeError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.collect_expr(expr)?;
            }
            StmtKind::Var(var) => {
                let id = self.decl_id(stmt.id, stmt.span)?;
                self.decl_type(id)?;
                if let Some(init) = &var.init {
                    self.collect_expr(init)?;
                }
            }
            StmtKind::Assign { target, value } => {
                self.collect_expr(target)?;
                self.collect_expr(value)?;
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.collect_expr(value)?;
                }
            }
            StmtKind::If { cond, then_body, else_body } => {
                self.collect_expr(cond)?;
                for stmt in then_body.iter().chain(else_body) {
                    self.collect_stmt(stmt)?;
                }
            }
            StmtKind::While { cond, body } => {
                self.collect_expr(cond)?;
                for stmt in body {
                    self.collect_stmt(stmt)?;
                }
            }
        }
        Ok(())
    }

    /// Candidate typings of `expr`. Computed once per node.
    pub(super) fn collect_expr(&mut self, expr: &Expr) -> Result<Vec<TypeContext>, TypeError> {
        if let Some(found) = self.contexts.get(&expr.id) {
            return Ok(found.clone());
        }
        if !self.collecting.insert(expr.id) {
            return Err(TypeError::internal("expression depends on itself", expr.span));
        }
        let scope = self.scope_of(expr.id, expr.span)?;

        let found = match &expr.kind {
            ExprKind::Int(_) => vec![TypeContext::of(self.core.int())],
            ExprKind::Float(_) => vec![TypeContext::of(self.core.float())],
            ExprKind::String(_) => vec![TypeContext::of(self.core.string())],
            ExprKind::Char(_) => vec![TypeContext::of(self.core.char())],
            ExprKind::Bool(_) => vec![TypeContext::of(self.core.bool())],
            ExprKind::This => {
                let class = self
                    .program
                    .scopes
                    .enclosing_class(scope)
                    .ok_or_else(|| TypeError::invalid("`this` outside of a class", expr.span))?;
                vec![TypeContext::denoting(self.decl_type(class)?, class)]
            }
            ExprKind::Ident(name) => self.collect_ident(name, scope, expr.span)?,
            ExprKind::Call { callee, type_args, args } => {
                self.collect_call(callee, type_args, args, scope, None, expr.span)?
            }
            ExprKind::Member { object, member } => self.collect_member(object, member, expr.span)?,
            ExprKind::Cast { expr: inner, ty } => {
                self.collect_expr(inner)?;
                vec![TypeContext::of(self.annotate(ty, scope)?)]
            }
        };

        if found.is_empty() {
            return Err(TypeError::internal("expression has no typing", expr.span));
        }
        self.contexts.insert(expr.id, found.clone());
        Ok(found)
    }

    fn collect_ident(&mut self, name: &str, scope: ScopeId, span: Span) -> Result<Vec<TypeContext>, TypeError> {
        let Some(id) = self.program.scopes.resolve(scope, name) else {
            // A procedure used as a value.
            let candidates = self.overload_candidates(scope, name, false, span)?;
            let visible = self.program.scopes.substitutions(scope);
            return candidates
                .into_iter()
                .map(|c| Ok(TypeContext::denoting(visible.apply(&self.decl_type(c)?), c)))
                .collect();
        };

        match &self.decl(id).kind {
            DeclKind::Variable(_) => {}
            DeclKind::Class(_) | DeclKind::CoreClass | DeclKind::TypeParam(_) => {
                return Err(TypeError::invalid(format!("type `{}` used as a value", name), span));
            }
            DeclKind::Procedure(_) => {
                return Err(TypeError::internal(format!("procedure `{}` bound uniquely", name), span));
            }
        }

        let ty = self.decl_type(id)?;
        let ty = self.program.scopes.substitutions(scope).apply(&ty);
        if let Some(from_init) = self.initializer_contexts(id, &ty)? {
            return Ok(from_init.into_iter().map(|c| TypeContext::denoting(c.ty, id)).collect());
        }
        Ok(vec![TypeContext::denoting(ty, id)])
    }

    /// For a `?` variable whose type is still open, the typings of its
    /// initializer.
    fn initializer_contexts(&mut self, id: DeclId, ty: &Type) -> Result<Option<Vec<TypeContext>>, TypeError> {
        let decl = self.decl(id);
        let inferred = decl.as_variable().is_some_and(|v| v.ty.is_infer());
        if !inferred || !self.subst.apply(ty).is_var() {
            return Ok(None);
        }
        let Some(init) = decl.node.and_then(|n| self.index.variable(n)).and_then(|v| v.init.as_ref()) else {
            return Ok(None);
        };
        if self.collecting.contains(&init.id) && !self.contexts.contains_key(&init.id) {
            return Ok(None);
        }
        self.collect_expr(init).map(Some)
    }
}
