// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Substitutions from type variables to types.

use std::collections::HashMap;
use std::fmt;

use crate::types::{ClassType, FunctionType, Type, TypeVarId};

/// A finite map from type variables to types.
///
/// Bindings may mention other bound variables; [`Substitution::apply`]
/// follows chains until no bound variable remains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    bindings: HashMap<TypeVarId, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn get(&self, var: TypeVarId) -> Option<&Type> {
        self.bindings.get(&var)
    }

    pub fn contains(&self, var: TypeVarId) -> bool {
        self.bindings.contains_key(&var)
    }

    /// Record `var := ty`. Callers check that `var` is unbound and that the
    /// occurs check holds.
    pub fn bind(&mut self, var: TypeVarId, ty: Type) {
        self.bindings.insert(var, ty);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeVarId, &Type)> {
        self.bindings.iter()
    }

    /// Follow variable bindings at the top level only.
    pub fn walk<'a>(&'a self, mut ty: &'a Type) -> &'a Type {
        while let Type::Var(v) = ty {
            match self.bindings.get(&v.id) {
                Some(next) => ty = next,
                None => break,
            }
        }
        ty
    }

    /// Replace every bound variable in `ty`, recursively, until a fixed
    /// point is reached.
    pub fn apply(&self, ty: &Type) -> Type {
        if self.is_empty() {
            return ty.clone();
        }
        match ty {
            Type::Var(v) => match self.bindings.get(&v.id) {
                Some(bound) => self.apply(bound),
                None => ty.clone(),
            },
            Type::Class(c) => Type::Class(self.apply_class(c)),
            Type::Function(f) => Type::Function(FunctionType {
                name: f.name.clone(),
                params: f.params.iter().map(|p| self.apply(p)).collect(),
                ret: Box::new(self.apply(&f.ret)),
            }),
            Type::Top | Type::Bottom => ty.clone(),
        }
    }

    pub fn apply_class(&self, class: &ClassType) -> ClassType {
        ClassType {
            name: class.name.clone(),
            supers: class.supers.iter().map(|s| self.apply_class(s)).collect(),
            params: class.params.iter().map(|p| self.apply(p)).collect(),
        }
    }

    /// Add every binding of `other` that this substitution does not already
    /// have. Existing bindings win.
    pub fn merge(&mut self, other: &Substitution) {
        for (var, ty) in &other.bindings {
            self.bindings.entry(*var).or_insert_with(|| ty.clone());
        }
    }

    /// `merge` by value.
    pub fn merged(mut self, other: &Substitution) -> Self {
        self.merge(other);
        self
    }

    /// Keep only the bindings for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(TypeVarId) -> bool) {
        self.bindings.retain(|var, _| keep(*var));
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort_by_key(|(var, _)| **var);
        write!(f, "{{")?;
        for (i, (var, ty)) in entries.into_iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "'t{} := {}", var.0, ty)?;
        }
        write!(f, "}}")
    }
}
