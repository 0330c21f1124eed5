// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Abstract Syntax Tree types for the Sable language.
//!
//! This crate defines the AST nodes shared between the declaration pass,
//! the type resolver, and code generation. Nodes are plain tagged unions;
//! semantic results live in side tables keyed by [`NodeId`].

pub mod span;
pub mod expr;
pub mod stmt;
pub mod decl;
pub mod build;

pub use span::Span;
pub use build::AstBuilder;

/// Unique identifier for AST nodes.
///
/// Used by semantic analysis passes to track resolution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}

/// Handle of a lexical scope in the scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The outermost scope; core classes live here.
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// Handle of a declaration (class, procedure, variable, type parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// A compilation unit: the top-level declarations of one source file.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub decls: Vec<decl::Decl>,
}
