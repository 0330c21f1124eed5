// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type definitions for the type system.

use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};

use sable_ast::ScopeId;

use crate::core::OBJECT;

/// Unique identifier for type variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

/// A type variable: either a named generic parameter (`X` in `class Foo<X>`)
/// or an anonymous variable created for a `?` annotation.
///
/// Identity is the id alone; two variables spelled the same in different
/// declarations are different variables.
#[derive(Debug, Clone)]
pub struct TypeVar {
    pub id: TypeVarId,
    pub name: Option<String>,
    /// Scope that introduced the variable.
    pub owner: ScopeId,
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeVar {}

impl Hash for TypeVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A nominal class type.
///
/// `supers` are stored already instantiated in terms of `params`, so
/// applying a substitution to a class type also instantiates its lineage.
#[derive(Debug, Clone)]
pub struct ClassType {
    pub name: String,
    pub supers: Vec<ClassType>,
    pub params: Vec<Type>,
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl Eq for ClassType {}

impl Hash for ClassType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.params.hash(state);
    }
}

/// A procedure signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

/// A type in Sable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Class(ClassType),
    Var(TypeVar),
    Function(FunctionType),
    /// Unconstrained: unifies with everything.
    Top,
    /// Impossible: unifies with nothing.
    Bottom,
}

impl ClassType {
    pub fn new(name: impl Into<String>, supers: Vec<ClassType>, params: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            supers,
            params,
        }
    }

    pub fn is_root(&self) -> bool {
        self.name == OBJECT
    }

    /// Length of the shortest super chain to `Object`; `None` for types
    /// outside the object lattice (`void`).
    pub fn distance_to_root(&self) -> Option<usize> {
        if self.is_root() {
            return Some(0);
        }
        self.supers
            .iter()
            .filter_map(|s| s.distance_to_root())
            .min()
            .map(|d| d + 1)
    }

    /// This type and every transitive super type, nearest first.
    pub fn ancestors(&self) -> Vec<ClassType> {
        let mut out: Vec<ClassType> = Vec::new();
        let mut queue = VecDeque::from([self]);
        while let Some(ty) = queue.pop_front() {
            if out.contains(ty) {
                continue;
            }
            out.push(ty.clone());
            queue.extend(ty.supers.iter());
        }
        out
    }

    /// Nearest proper super type named `name`, breadth first in
    /// declaration order.
    pub fn find_super(&self, name: &str) -> Option<&ClassType> {
        let mut queue: VecDeque<&ClassType> = self.supers.iter().collect();
        while let Some(ty) = queue.pop_front() {
            if ty.name == name {
                return Some(ty);
            }
            queue.extend(ty.supers.iter());
        }
        None
    }

    pub fn type_vars(&self) -> Vec<TypeVar> {
        self.params
            .iter()
            .filter_map(|p| match p {
                Type::Var(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Type {
    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Type::Var(_))
    }

    /// Whether `var` occurs anywhere inside this type.
    pub fn occurs(&self, var: TypeVarId) -> bool {
        match self {
            Type::Var(v) => v.id == var,
            Type::Class(c) => c.params.iter().any(|p| p.occurs(var)),
            Type::Function(f) => f.params.iter().any(|p| p.occurs(var)) || f.ret.occurs(var),
            Type::Top | Type::Bottom => false,
        }
    }

    /// Free variables in order of first appearance.
    pub fn free_vars(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<TypeVar>) {
        match self {
            Type::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Type::Class(c) => c.params.iter().for_each(|p| p.collect_vars(out)),
            Type::Function(f) => {
                f.params.iter().for_each(|p| p.collect_vars(out));
                f.ret.collect_vars(out);
            }
            Type::Top | Type::Bottom => {}
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.free_vars().is_empty()
    }
}

/// Source of fresh type variables for one compilation unit.
#[derive(Debug, Clone)]
pub struct TypeVarGen {
    next: u32,
}

impl TypeVarGen {
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    pub fn fresh(&mut self, owner: ScopeId) -> TypeVar {
        let id = TypeVarId(self.next);
        self.next += 1;
        TypeVar { id, name: None, owner }
    }

    pub fn named(&mut self, name: impl Into<String>, owner: ScopeId) -> TypeVar {
        let mut var = self.fresh(owner);
        var.name = Some(name.into());
        var
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "'t{}", self.id.0),
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "<")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 { write!(f, ", ")?; }
                write!(f, "{}", p)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(c) => write!(f, "{}", c),
            Type::Var(v) => write!(f, "{}", v),
            Type::Function(func) => {
                write!(f, "{}(", func.name)?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", func.ret)
            }
            Type::Top => write!(f, "_"),
            Type::Bottom => write!(f, "!"),
        }
    }
}
