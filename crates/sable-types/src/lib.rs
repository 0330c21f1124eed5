// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type model and unification engine for the Sable language.
//!
//! Types are immutable values. Unification never mutates its inputs; it
//! produces a [`Substitution`] that callers apply or merge as they see fit.

mod types;
mod subst;
mod unify;
mod core;
mod errors;

pub use types::{ClassType, FunctionType, Type, TypeVar, TypeVarGen, TypeVarId};
pub use subst::Substitution;
pub use unify::{erase, is_a, is_a_rigid, is_a_under, more_specific, unifiable, Mismatch};
pub use core::{CoreClasses, ARRAY, BOOL, CHAR, FLOAT, INT, OBJECT, STRING, VOID};
pub use errors::{ErrorKind, TypeError};
