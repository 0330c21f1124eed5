// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declarations and the declaration table.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use sable_ast::decl::TypeExpr;
use sable_ast::{DeclId, NodeId, ScopeId, Span};
use sable_types::{Type, TypeVar};

/// A write-once cell for a resolved type.
///
/// Committing twice means the resolver visited a declaration more than once
/// and is a bug, not a user error.
#[derive(Debug, Clone)]
pub struct Slot<T> {
    value: Option<T>,
}

impl<T> Slot<T> {
    pub fn empty() -> Self {
        Self { value: None }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn set(&mut self, value: T) {
        assert!(self.value.is_none(), "type slot committed twice");
        self.value = Some(value);
    }

    /// Rewrite a committed value; used by the final push-down.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) {
        if let Some(value) = &self.value {
            self.value = Some(f(value));
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRole {
    Global,
    Field,
    Parameter,
    Local,
}

#[derive(Debug, Clone)]
pub struct VarInfo {
    pub role: VarRole,
    /// Written type; `?` for inferred.
    pub ty: TypeExpr,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Scope holding the type parameters, fields and methods.
    pub member_scope: ScopeId,
    pub type_params: Vec<DeclId>,
    /// Super classes as written, in precedence order. Empty means `Object`.
    pub supers: Vec<TypeExpr>,
    /// Explicit initializers.
    pub constructors: Vec<DeclId>,
    /// Initializer synthesized when the class declares none. It takes the
    /// class's own fields in declaration order; inherited fields are not
    /// parameters.
    pub default_constructor: Option<DeclId>,
    pub fields: Vec<DeclId>,
}

impl ClassInfo {
    /// Initializers a constructor call may pick from.
    pub fn initializers(&self) -> Vec<DeclId> {
        if self.constructors.is_empty() {
            self.default_constructor.into_iter().collect()
        } else {
            self.constructors.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcInfo {
    pub body_scope: ScopeId,
    pub type_params: Vec<DeclId>,
    pub params: Vec<DeclId>,
    /// `None` is void; `Some(?)` asks for inference.
    pub ret: Option<TypeExpr>,
    /// Return statements of the body, in source order.
    pub returns: Vec<NodeId>,
    pub is_native: bool,
    /// Class this procedure initializes.
    pub constructor_of: Option<DeclId>,
    /// Default initializer made up by the declaration pass.
    pub synthesized: bool,
    /// Class this procedure is a member of.
    pub owner: Option<DeclId>,
}

impl ProcInfo {
    pub fn infers_return(&self) -> bool {
        self.ret.as_ref().is_some_and(TypeExpr::is_infer)
    }
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Class(ClassInfo),
    /// Built-in class; its type is committed at registration.
    CoreClass,
    Procedure(ProcInfo),
    Variable(VarInfo),
    /// Generic parameter; its type is committed at registration.
    TypeParam(TypeVar),
}

/// A declared entity.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    /// Declaring AST node; `None` for core classes and synthesized
    /// initializers.
    pub node: Option<NodeId>,
    /// Scope the declaration is bound in.
    pub scope: ScopeId,
    pub span: Span,
    pub ty: Slot<Type>,
}

impl Declaration {
    pub fn as_class(&self) -> Option<&ClassInfo> {
        match &self.kind {
            DeclKind::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_procedure(&self) -> Option<&ProcInfo> {
        match &self.kind {
            DeclKind::Procedure(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VarInfo> {
        match &self.kind {
            DeclKind::Variable(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, DeclKind::Class(_) | DeclKind::CoreClass)
    }

    /// Procedures share a name through overload sets; everything else
    /// binds uniquely.
    pub fn is_overloadable(&self) -> bool {
        matches!(self.kind, DeclKind::Procedure(_))
    }
}

/// Arena of all declarations in a program.
#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<Declaration>,
    classes: HashMap<String, DeclId>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new declaration and return its ID.
    pub fn insert(&mut self, name: String, kind: DeclKind, node: Option<NodeId>, scope: ScopeId, span: Span) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        if matches!(kind, DeclKind::Class(_) | DeclKind::CoreClass) {
            self.classes.entry(name.clone()).or_insert(id);
        }
        self.decls.push(Declaration {
            id,
            name,
            kind,
            node,
            scope,
            span,
            ty: Slot::empty(),
        });
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.decls.get_mut(id.0 as usize)
    }

    /// First class declared under `name`.
    pub fn class_named(&self, name: &str) -> Option<DeclId> {
        self.classes.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Declaration> {
        self.decls.iter_mut()
    }
}

impl Index<DeclId> for DeclTable {
    type Output = Declaration;

    fn index(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }
}

impl IndexMut<DeclId> for DeclTable {
    fn index_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.decls[id.0 as usize]
    }
}
