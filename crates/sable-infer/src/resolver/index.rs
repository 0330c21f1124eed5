// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lookup of declaration and statement nodes by id.

use std::collections::HashMap;

use sable_ast::decl::{Decl, DeclKind, ProcDecl, VarDecl};
use sable_ast::stmt::{Stmt, StmtKind};
use sable_ast::{Module, NodeId};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Node<'a> {
    Decl(&'a Decl),
    Stmt(&'a Stmt),
}

/// Borrowed view of a module, addressable by [`NodeId`].
#[derive(Debug, Default)]
pub(crate) struct AstIndex<'a> {
    nodes: HashMap<NodeId, Node<'a>>,
}

impl<'a> AstIndex<'a> {
    pub(crate) fn build(module: &'a Module) -> Self {
        let mut index = Self::default();
        for decl in &module.decls {
            index.add_decl(decl);
        }
        index
    }

    fn add_decl(&mut self, decl: &'a Decl) {
        self.nodes.insert(decl.id, Node::Decl(decl));
        match &decl.kind {
            DeclKind::Class(class) => {
                for member in &class.members {
                    self.add_decl(member);
                }
            }
            DeclKind::Procedure(proc) => self.add_block(&proc.body),
            DeclKind::Variable(_) => {}
        }
    }

    fn add_block(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            self.add_stmt(stmt);
        }
    }

    fn add_stmt(&mut self, stmt: &'a Stmt) {
        self.nodes.insert(stmt.id, Node::Stmt(stmt));
        match &stmt.kind {
            StmtKind::If { then_body, else_body, .. } => {
                self.add_block(then_body);
                self.add_block(else_body);
            }
            StmtKind::While { body, .. } => self.add_block(body),
            StmtKind::Expr(_) | StmtKind::Var(_) | StmtKind::Assign { .. } | StmtKind::Return(_) => {}
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<Node<'a>> {
        self.nodes.get(&id).copied()
    }

    pub(crate) fn stmt(&self, id: NodeId) -> Option<&'a Stmt> {
        match self.get(id)? {
            Node::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub(crate) fn procedure(&self, id: NodeId) -> Option<&'a ProcDecl> {
        match self.get(id)? {
            Node::Decl(Decl { kind: DeclKind::Procedure(proc), .. }) => Some(proc),
            _ => None,
        }
    }

    /// The variable declared by a global/field declaration or a local
    /// variable statement.
    pub(crate) fn variable(&self, id: NodeId) -> Option<&'a VarDecl> {
        match self.get(id)? {
            Node::Decl(Decl { kind: DeclKind::Variable(var), .. }) => Some(var),
            Node::Stmt(Stmt { kind: StmtKind::Var(var), .. }) => Some(var),
            _ => None,
        }
    }
}
