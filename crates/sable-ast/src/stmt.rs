//! Statement AST nodes.

use crate::decl::VarDecl;
use crate::expr::Expr;
use crate::{NodeId, Span};

/// A statement in the AST.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),
    /// Local variable declaration (`Int a := 5`, `? b := a`)
    Var(VarDecl),
    /// Assignment
    Assign {
        target: Expr,
        value: Expr,
    },
    /// Return statement
    Return(Option<Expr>),
    /// Conditional with optional else block
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    /// While loop
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
}
