// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Output of type inference.

use std::collections::HashMap;

use sable_ast::{DeclId, NodeId};
use sable_types::Type;

/// How a constructor call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorKind {
    /// An initializer written in the class body.
    Explicit,
    /// The default initializer taking every field.
    Synthesized,
}

/// The declaration a call site resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResolution {
    pub target: DeclId,
    /// Type arguments of the target's type parameters, in declaration
    /// order. For constructor calls these are the class's parameters.
    pub type_args: Vec<Type>,
    pub constructor: Option<ConstructorKind>,
}

/// A fully typed program.
#[derive(Debug, Default)]
pub struct TypedProgram {
    /// Type of every expression and statement node.
    pub node_types: HashMap<NodeId, Type>,
    /// Declaration denoted by identifiers, member accesses and calls, and
    /// declared by declaring nodes.
    pub node_decls: HashMap<NodeId, DeclId>,
    pub decl_types: HashMap<DeclId, Type>,
    pub calls: HashMap<NodeId, CallResolution>,
}

impl TypedProgram {
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.node_types.get(&node)
    }

    pub fn decl_of(&self, node: NodeId) -> Option<DeclId> {
        self.node_decls.get(&node).copied()
    }

    pub fn call(&self, node: NodeId) -> Option<&CallResolution> {
        self.calls.get(&node)
    }
}
