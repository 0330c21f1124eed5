// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Scopes and declarations for the Sable language.
//!
//! The declaration pass walks a [`Module`](sable_ast::Module) once, binding
//! every declared name in an arena of scopes. Class member scopes link to the
//! member scopes of their super classes so that inherited members and
//! overloads are found by lookup, and overridden overloads are dropped.

mod decl;
mod declare;
mod scope;

pub use decl::{ClassInfo, DeclKind, DeclTable, Declaration, ProcInfo, Slot, VarInfo, VarRole};
pub use declare::{declare, DeclaredProgram};
pub use scope::{Scope, ScopeKind, ScopeTree};
