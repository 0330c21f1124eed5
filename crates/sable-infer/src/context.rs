// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Provisional typings collected for expression nodes.

use sable_ast::DeclId;
use sable_types::{Substitution, Type, TypeVar};

use crate::program::ConstructorKind;

/// One admissible typing of an expression.
///
/// The first pass collects every typing an expression could have; the
/// second pass keeps exactly one.
#[derive(Debug, Clone)]
pub struct TypeContext {
    pub ty: Type,
    /// Type of the object on the left of a member access.
    pub qualifier: Option<Type>,
    /// Declaration the expression denotes.
    pub decl: Option<DeclId>,
    /// Bindings that produced `ty`.
    pub subst: Substitution,
    pub call: Option<CallMatch>,
}

/// The argument tuple and signature a call context was matched with.
#[derive(Debug, Clone)]
pub struct CallMatch {
    pub args: Vec<Type>,
    /// Parameter types of the target as seen from the call site.
    pub params: Vec<Type>,
    /// Variables the call must bind.
    pub type_params: Vec<TypeVar>,
    pub constructor: Option<ConstructorKind>,
}

impl TypeContext {
    pub fn of(ty: Type) -> Self {
        Self {
            ty,
            qualifier: None,
            decl: None,
            subst: Substitution::new(),
            call: None,
        }
    }

    pub fn denoting(ty: Type, decl: DeclId) -> Self {
        Self {
            decl: Some(decl),
            ..Self::of(ty)
        }
    }

    pub fn qualified(mut self, qualifier: Type) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Parameter list used to rank this context against others.
    pub fn specificity_key(&self) -> Vec<Type> {
        match &self.call {
            Some(call) => call.params.clone(),
            None => vec![self.ty.clone()],
        }
    }
}
