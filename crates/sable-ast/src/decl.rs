// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration AST nodes.

use std::fmt;

use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::{NodeId, Span};

/// A declaration (top-level or class member).
#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub kind: DeclKind,
    pub span: Span,
}

/// The kind of declaration.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// Class declaration
    Class(ClassDecl),
    /// Function, procedure, method, or constructor
    Procedure(ProcDecl),
    /// Global variable or class field
    Variable(VarDecl),
}

/// A class declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// Super classes in declaration order; order is inheritance precedence.
    pub supers: Vec<TypeExpr>,
    pub members: Vec<Decl>,
}

/// A procedure declaration.
///
/// `ret` is `None` for procedures without a return annotation (void);
/// `Some(TypeExpr::infer())` asks for return-type inference.
#[derive(Debug, Clone)]
pub struct ProcDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    /// Explicit initializer of the enclosing class.
    pub is_constructor: bool,
    /// Implemented outside the language; the body is empty and the
    /// annotation is trusted verbatim.
    pub is_native: bool,
}

/// A procedure parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A generic type parameter.
#[derive(Debug, Clone)]
pub struct TypeParam {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

/// A variable declaration (global, field, or local).
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub init: Option<Expr>,
    /// `+` prefixed field.
    pub is_public: bool,
}

/// A written type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// The `?` marker: infer this type.
    Infer,
    /// A (possibly generic) type name: `Int`, `Foo<X>`.
    Named { name: String, args: Vec<TypeExpr> },
}

impl TypeExpr {
    pub fn infer(span: Span) -> Self {
        Self { kind: TypeExprKind::Infer, span }
    }

    pub fn named(name: impl Into<String>, args: Vec<TypeExpr>, span: Span) -> Self {
        Self {
            kind: TypeExprKind::Named { name: name.into(), args },
            span,
        }
    }

    pub fn is_infer(&self) -> bool {
        matches!(self.kind, TypeExprKind::Infer)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Infer => write!(f, "?"),
            TypeExprKind::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 { write!(f, ", ")?; }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
        }
    }
}
