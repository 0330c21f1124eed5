// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type inference and overload resolution for the Sable language.
//!
//! Given a declared program (see [`sable_resolve::declare`]), [`infer`]
//! assigns every expression exactly one type, picks the overload each call
//! resolves to and fills in every `?` in the source.

mod context;
mod options;
mod program;
mod resolver;

use std::sync::Arc;

use sable_ast::Module;
use sable_resolve::DeclaredProgram;
use sable_types::{CoreClasses, TypeError};

pub use context::{CallMatch, TypeContext};
pub use options::InferOptions;
pub use program::{CallResolution, ConstructorKind, TypedProgram};

use resolver::Resolver;

/// Type a declared program with default options.
pub fn infer(program: DeclaredProgram, module: &Module) -> Result<TypedProgram, TypeError> {
    infer_with(program, module, InferOptions::default())
}

pub fn infer_with(program: DeclaredProgram, module: &Module, options: InferOptions) -> Result<TypedProgram, TypeError> {
    Resolver::new(program, module, options).run(module)
}

/// Declare and type a module against a fresh set of core classes.
pub fn check(module: &Module) -> Result<TypedProgram, TypeError> {
    let program = sable_resolve::declare(module, Arc::new(CoreClasses::new()))?;
    infer(program, module)
}
