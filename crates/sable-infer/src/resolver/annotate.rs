// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Written types to semantic types.

use sable_ast::decl::{TypeExpr, TypeExprKind};
use sable_ast::{ScopeId, Span};
use sable_resolve::DeclKind;
use sable_types::{Substitution, Type, TypeError};

use super::Resolver;

impl<'a> Resolver<'a> {
    /// Resolve a written type as seen from `scope`. `?` becomes a fresh
    /// variable.
    pub(super) fn annotate(&mut self, texpr: &TypeExpr, scope: ScopeId) -> Result<Type, TypeError> {
        let (name, args) = match &texpr.kind {
            TypeExprKind::Infer => return Ok(Type::Var(self.program.vars.fresh(scope))),
            TypeExprKind::Named { name, args } => (name, args),
        };
        let unknown = || TypeError::UnknownType {
            name: name.clone(),
            span: texpr.span,
        };
        let id = self.program.scopes.resolve(scope, name).ok_or_else(unknown)?;

        let param = match &self.program.decls[id].kind {
            DeclKind::TypeParam(var) => Some(var.clone()),
            DeclKind::Class(_) | DeclKind::CoreClass => None,
            DeclKind::Procedure(_) | DeclKind::Variable(_) => return Err(unknown()),
        };
        if let Some(var) = param {
            if !args.is_empty() {
                return Err(TypeError::GenericArity {
                    name: name.clone(),
                    expected: 0,
                    found: args.len(),
                    span: texpr.span,
                });
            }
            return Ok(Type::Var(var));
        }

        let generic = self.decl_type(id)?;
        let args = args
            .iter()
            .map(|arg| self.annotate(arg, scope))
            .collect::<Result<Vec<_>, _>>()?;
        instantiate(&generic, name, args, texpr.span)
    }
}

/// Bind the parameters of a generic class type to `args`.
pub(super) fn instantiate(generic: &Type, name: &str, args: Vec<Type>, span: Span) -> Result<Type, TypeError> {
    let Type::Class(class) = generic else {
        return Err(TypeError::internal(format!("`{}` is not a class type", name), span));
    };
    let vars = class.type_vars();
    if vars.len() != args.len() {
        return Err(TypeError::GenericArity {
            name: name.to_string(),
            expected: vars.len(),
            found: args.len(),
            span,
        });
    }
    let mut subst = Substitution::new();
    for (var, arg) in vars.iter().zip(args) {
        subst.bind(var.id, arg);
    }
    Ok(subst.apply(generic))
}
