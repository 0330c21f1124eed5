// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression AST nodes.

use crate::decl::TypeExpr;
use crate::{NodeId, Span};

/// An expression in the AST.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    String(String),
    /// Character literal
    Char(char),
    /// Boolean literal
    Bool(bool),
    /// The receiver inside a class body
    This,
    /// Identifier (variable, field, or procedure used as a value)
    Ident(String),
    /// Call of a procedure, method, or constructor by name.
    ///
    /// `type_args` holds explicit generic arguments (`f<Int>(x)`); when
    /// present they must cover every type parameter of the target.
    Call {
        callee: String,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    /// Qualified access `object.member`; `member` is an `Ident` (field)
    /// or a `Call` (method).
    Member {
        object: Box<Expr>,
        member: Box<Expr>,
    },
    /// Explicit cast (`expr as T`)
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
}

impl ExprKind {
    /// Whether this expression can appear on the left of an assignment.
    pub fn is_place(&self) -> bool {
        matches!(self, ExprKind::Ident(_) | ExprKind::Member { .. })
    }
}
