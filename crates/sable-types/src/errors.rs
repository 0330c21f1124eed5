// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type error types.

use sable_ast::Span;

use crate::types::Type;

/// A type error. Every variant carries the span of the offending node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("unknown identifier `{name}`")]
    UnknownIdentifier { name: String, span: Span },
    #[error("unknown type `{name}`")]
    UnknownType { name: String, span: Span },
    #[error("`{name}` is already declared in this scope")]
    Redeclaration { name: String, span: Span },
    #[error("overload of `{name}` duplicates an existing signature {signature}")]
    DuplicateOverload { name: String, signature: Type, span: Span },
    #[error("type mismatch: expected {expected}, found {found}")]
    Mismatch { expected: Type, found: Type, span: Span },
    #[error("impossible cast from {from} to {to}")]
    ImpossibleCast { from: Type, to: Type, span: Span },
    #[error("no overload of `{name}` accepts ({})", join(.args))]
    NoMatchingCall { name: String, args: Vec<Type>, span: Span },
    #[error("could not uniquely determine type of `{name}`")]
    CannotDetermine { name: String, span: Span },
    #[error("ambiguous {what}: candidates {}", join(.candidates))]
    Ambiguous { what: String, candidates: Vec<Type>, span: Span },
    #[error("invalid expression: {reason}")]
    InvalidExpression { reason: String, span: Span },
    #[error("cyclic inheritance involving `{name}`")]
    CyclicInheritance { name: String, span: Span },
    #[error("`{name}` takes {expected} type arguments, found {found}")]
    GenericArity { name: String, expected: usize, found: usize, span: Span },
    #[error("could not recover all type parameters of `{name}` (missing {})", .missing.join(", "))]
    UnrecoverableTypeParams { name: String, missing: Vec<String>, span: Span },
    #[error("internal error: {message}")]
    Internal { message: String, span: Span },
}

/// Coarse classification of a [`TypeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownIdentifier,
    Redeclaration,
    Mismatch,
    Ambiguous,
    InvalidExpression,
    CyclicInheritance,
    Internal,
}

impl TypeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TypeError::UnknownIdentifier { .. } | TypeError::UnknownType { .. } => ErrorKind::UnknownIdentifier,
            TypeError::Redeclaration { .. } | TypeError::DuplicateOverload { .. } => ErrorKind::Redeclaration,
            TypeError::Mismatch { .. }
            | TypeError::ImpossibleCast { .. }
            | TypeError::NoMatchingCall { .. }
            | TypeError::CannotDetermine { .. }
            | TypeError::GenericArity { .. }
            | TypeError::UnrecoverableTypeParams { .. } => ErrorKind::Mismatch,
            TypeError::Ambiguous { .. } => ErrorKind::Ambiguous,
            TypeError::InvalidExpression { .. } => ErrorKind::InvalidExpression,
            TypeError::CyclicInheritance { .. } => ErrorKind::CyclicInheritance,
            TypeError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeError::UnknownIdentifier { span, .. }
            | TypeError::UnknownType { span, .. }
            | TypeError::Redeclaration { span, .. }
            | TypeError::DuplicateOverload { span, .. }
            | TypeError::Mismatch { span, .. }
            | TypeError::ImpossibleCast { span, .. }
            | TypeError::NoMatchingCall { span, .. }
            | TypeError::CannotDetermine { span, .. }
            | TypeError::Ambiguous { span, .. }
            | TypeError::InvalidExpression { span, .. }
            | TypeError::CyclicInheritance { span, .. }
            | TypeError::GenericArity { span, .. }
            | TypeError::UnrecoverableTypeParams { span, .. }
            | TypeError::Internal { span, .. } => *span,
        }
    }

    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        TypeError::Internal {
            message: message.into(),
            span,
        }
    }

    pub fn invalid(reason: impl Into<String>, span: Span) -> Self {
        TypeError::InvalidExpression {
            reason: reason.into(),
            span,
        }
    }
}

fn join(types: &[Type]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}
