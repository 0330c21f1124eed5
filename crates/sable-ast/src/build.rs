// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Programmatic AST construction.
//!
//! Hands out fresh [`NodeId`]s so trees assembled without a parser still
//! satisfy the "unique id per node" contract. Every node gets the span
//! `id..id+1`, which keeps error locations distinguishable.

use crate::decl::{ClassDecl, Decl, DeclKind, Param, ProcDecl, TypeExpr, TypeParam, VarDecl};
use crate::expr::{Expr, ExprKind};
use crate::stmt::{Stmt, StmtKind};
use crate::{Module, NodeId, Span};

#[derive(Debug, Default)]
pub struct AstBuilder {
    next: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self) -> (NodeId, Span) {
        let id = NodeId(self.next);
        self.next += 1;
        (id, Span::new(id.0 as usize, id.0 as usize + 1))
    }

    pub fn module(&self, decls: Vec<Decl>) -> Module {
        Module { decls }
    }

    // ---- types ----

    pub fn ty(&mut self, name: &str) -> TypeExpr {
        let (_, span) = self.node();
        TypeExpr::named(name, vec![], span)
    }

    pub fn generic_ty(&mut self, name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        let (_, span) = self.node();
        TypeExpr::named(name, args, span)
    }

    pub fn infer(&mut self) -> TypeExpr {
        let (_, span) = self.node();
        TypeExpr::infer(span)
    }

    // ---- expressions ----

    fn expr(&mut self, kind: ExprKind) -> Expr {
        let (id, span) = self.node();
        Expr { id, kind, span }
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::Int(value))
    }

    pub fn float(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::Float(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::String(value.to_string()))
    }

    pub fn char(&mut self, value: char) -> Expr {
        self.expr(ExprKind::Char(value))
    }

    pub fn bool(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Bool(value))
    }

    pub fn this(&mut self) -> Expr {
        self.expr(ExprKind::This)
    }

    pub fn ident(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Ident(name.to_string()))
    }

    pub fn call(&mut self, callee: &str, args: Vec<Expr>) -> Expr {
        self.generic_call(callee, vec![], args)
    }

    pub fn generic_call(&mut self, callee: &str, type_args: Vec<TypeExpr>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: callee.to_string(),
            type_args,
            args,
        })
    }

    pub fn member(&mut self, object: Expr, member: Expr) -> Expr {
        self.expr(ExprKind::Member {
            object: Box::new(object),
            member: Box::new(member),
        })
    }

    pub fn cast(&mut self, expr: Expr, ty: TypeExpr) -> Expr {
        self.expr(ExprKind::Cast {
            expr: Box::new(expr),
            ty,
        })
    }

    // ---- statements ----

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        let (id, span) = self.node();
        Stmt { id, kind, span }
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn local(&mut self, ty: TypeExpr, name: &str, init: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Var(VarDecl {
            name: name.to_string(),
            ty,
            init,
            is_public: false,
        }))
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Stmt {
        self.stmt(StmtKind::Assign { target, value })
    }

    pub fn ret(&mut self, value: Expr) -> Stmt {
        self.stmt(StmtKind::Return(Some(value)))
    }

    pub fn ret_void(&mut self) -> Stmt {
        self.stmt(StmtKind::Return(None))
    }

    pub fn if_else(&mut self, cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::If { cond, then_body, else_body })
    }

    pub fn while_loop(&mut self, cond: Expr, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::While { cond, body })
    }

    // ---- declarations ----

    fn decl(&mut self, kind: DeclKind) -> Decl {
        let (id, span) = self.node();
        Decl { id, kind, span }
    }

    pub fn param(&mut self, name: &str, ty: TypeExpr) -> Param {
        let (id, span) = self.node();
        Param { id, name: name.to_string(), ty, span }
    }

    pub fn type_params(&mut self, names: &[&str]) -> Vec<TypeParam> {
        names
            .iter()
            .map(|name| {
                let (id, span) = self.node();
                TypeParam { id, name: name.to_string(), span }
            })
            .collect()
    }

    pub fn class(&mut self, name: &str, type_params: &[&str], supers: Vec<TypeExpr>, members: Vec<Decl>) -> Decl {
        let type_params = self.type_params(type_params);
        self.decl(DeclKind::Class(ClassDecl {
            name: name.to_string(),
            type_params,
            supers,
            members,
        }))
    }

    /// A public field (`+T name`).
    pub fn field(&mut self, ty: TypeExpr, name: &str) -> Decl {
        self.decl(DeclKind::Variable(VarDecl {
            name: name.to_string(),
            ty,
            init: None,
            is_public: true,
        }))
    }

    pub fn global(&mut self, ty: TypeExpr, name: &str, init: Option<Expr>) -> Decl {
        self.decl(DeclKind::Variable(VarDecl {
            name: name.to_string(),
            ty,
            init,
            is_public: false,
        }))
    }

    pub fn procedure(&mut self, name: &str, params: Vec<Param>, ret: Option<TypeExpr>, body: Vec<Stmt>) -> Decl {
        self.generic_procedure(name, &[], params, ret, body)
    }

    pub fn generic_procedure(
        &mut self,
        name: &str,
        type_params: &[&str],
        params: Vec<Param>,
        ret: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Decl {
        let type_params = self.type_params(type_params);
        self.decl(DeclKind::Procedure(ProcDecl {
            name: name.to_string(),
            type_params,
            params,
            ret,
            body,
            is_constructor: false,
            is_native: false,
        }))
    }

    /// An explicit initializer for class `class_name`.
    pub fn constructor(&mut self, class_name: &str, params: Vec<Param>, body: Vec<Stmt>) -> Decl {
        self.decl(DeclKind::Procedure(ProcDecl {
            name: class_name.to_string(),
            type_params: vec![],
            params,
            ret: None,
            body,
            is_constructor: true,
            is_native: false,
        }))
    }

    pub fn native(&mut self, name: &str, params: Vec<Param>, ret: Option<TypeExpr>) -> Decl {
        self.decl(DeclKind::Procedure(ProcDecl {
            name: name.to_string(),
            type_params: vec![],
            params,
            ret,
            body: vec![],
            is_constructor: false,
            is_native: true,
        }))
    }
}
