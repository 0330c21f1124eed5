// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The two-pass type resolver.
//!
//! Pass one (`collect`) computes, for every expression, the list of typings
//! it could have, together with the declaration each typing denotes. Calls
//! produce one typing per matching overload and argument combination.
//!
//! Pass two (`fix`) walks top-down, narrowing each list to exactly one
//! typing using what the context expects (an assignment target, a
//! parameter type, a return type, `Bool` for conditions). The bindings of
//! the winning typing are absorbed into a program-wide substitution, which
//! is finally pushed down into every node and declaration.

mod annotate;
mod calls;
mod collect;
mod fix;
mod index;
mod returns;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sable_ast::{DeclId, Module, NodeId, ScopeId, Span};
use sable_resolve::{DeclKind, DeclaredProgram, Declaration};
use sable_types::{CoreClasses, Substitution, Type, TypeError, TypeVar, TypeVarId};

use crate::context::TypeContext;
use crate::options::InferOptions;
use crate::program::{CallResolution, TypedProgram};

use self::index::AstIndex;

pub(crate) struct Resolver<'a> {
    program: DeclaredProgram,
    index: AstIndex<'a>,
    options: InferOptions,
    core: Arc<CoreClasses>,
    /// Program-wide bindings of `?` variables and inferred returns.
    subst: Substitution,
    /// Variables introduced by generic parameter lists. Their bindings are
    /// local to a call and never enter `subst`.
    type_params: HashSet<TypeVarId>,
    /// Generic parameters declared by the module, with their owning scopes.
    generics: Vec<TypeVar>,

    // Pass one.
    contexts: HashMap<NodeId, Vec<TypeContext>>,
    /// Expressions whose collection has started.
    collecting: HashSet<NodeId>,
    /// Declarations whose type collection has started.
    visited: HashSet<DeclId>,
    /// Procedures whose bodies have been collected.
    bodies: HashSet<DeclId>,
    /// Placeholder return variables of procedures declared `?`.
    pending_returns: HashMap<DeclId, TypeVar>,

    // Pass two.
    node_types: HashMap<NodeId, Type>,
    node_decls: HashMap<NodeId, DeclId>,
    calls: HashMap<NodeId, CallResolution>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(program: DeclaredProgram, module: &'a Module, options: InferOptions) -> Self {
        let core = Arc::clone(&program.core);
        let generics: Vec<TypeVar> = program
            .decls
            .iter()
            .filter_map(|d| match &d.kind {
                DeclKind::TypeParam(var) => Some(var.clone()),
                _ => None,
            })
            .collect();
        let mut type_params: HashSet<TypeVarId> = generics.iter().map(|v| v.id).collect();
        type_params.insert(core.array_param().id);
        let node_decls = program.node_decls.clone();

        Self {
            program,
            index: AstIndex::build(module),
            options,
            core,
            subst: Substitution::new(),
            type_params,
            generics,
            contexts: HashMap::new(),
            collecting: HashSet::new(),
            visited: HashSet::new(),
            bodies: HashSet::new(),
            pending_returns: HashMap::new(),
            node_types: HashMap::new(),
            node_decls,
            calls: HashMap::new(),
        }
    }

    pub(crate) fn run(mut self, module: &'a Module) -> Result<TypedProgram, TypeError> {
        tracing::debug!(decls = module.decls.len(), "collecting candidate types");
        for decl in &module.decls {
            self.collect_decl(decl)?;
        }

        tracing::debug!(nodes = self.contexts.len(), "fixing types");
        for decl in &module.decls {
            self.fix_decl(decl)?;
        }

        tracing::debug!(bindings = self.subst.len(), "pushing substitution down");
        self.finish()
    }

    fn decl(&self, id: DeclId) -> &Declaration {
        &self.program.decls[id]
    }

    fn decl_id(&self, node: NodeId, span: Span) -> Result<DeclId, TypeError> {
        self.program
            .node_decls
            .get(&node)
            .copied()
            .ok_or_else(|| TypeError::internal("node declares nothing", span))
    }

    fn scope_of(&self, node: NodeId, span: Span) -> Result<ScopeId, TypeError> {
        self.program
            .scope_of(node)
            .ok_or_else(|| TypeError::internal("node has no scope", span))
    }

    /// Move the bindings of `from` that are not generic parameters into the
    /// program-wide substitution.
    fn absorb(&mut self, from: &Substitution) {
        for (var, ty) in from.iter() {
            if self.type_params.contains(var) || self.subst.contains(*var) {
                continue;
            }
            let ty = from.apply(ty);
            if !ty.occurs(*var) {
                self.subst.bind(*var, ty);
            }
        }
    }

    /// Whether `var` is one of the generic parameters visible from `scope`.
    fn in_scope(&self, var: &TypeVar, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == var.owner {
                return true;
            }
            current = self.program.scopes.get(id).and_then(|s| s.parent);
        }
        false
    }

    /// Generic parameters that are fixed but unknown at `scope`: inside
    /// their own class or procedure they may not be bound to anything.
    fn rigid_at(&self, scope: ScopeId) -> HashSet<TypeVarId> {
        self.generics
            .iter()
            .filter(|v| self.in_scope(v, scope))
            .map(|v| v.id)
            .collect()
    }

    fn finish(mut self) -> Result<TypedProgram, TypeError> {
        let subst = std::mem::take(&mut self.subst);
        for ty in self.node_types.values_mut() {
            *ty = subst.apply(ty);
        }
        for call in self.calls.values_mut() {
            for arg in &mut call.type_args {
                *arg = subst.apply(arg);
            }
        }

        let mut decl_types = HashMap::new();
        for decl in self.program.decls.iter_mut() {
            decl.ty.update(|ty| subst.apply(ty));
            if let Some(ty) = decl.ty.get() {
                decl_types.insert(decl.id, ty.clone());
            }
        }

        // Every `?` must have been pinned down by now.
        for decl in self.program.decls.iter() {
            let inferred = match &decl.kind {
                DeclKind::Variable(var) => var.ty.is_infer(),
                DeclKind::Procedure(proc) => proc.infers_return(),
                _ => false,
            };
            if !inferred {
                continue;
            }
            let Some(ty) = decl.ty.get() else { continue };
            let undetermined = ty.free_vars().iter().any(|v| !self.type_params.contains(&v.id));
            if undetermined {
                return Err(TypeError::CannotDetermine {
                    name: decl.name.clone(),
                    span: decl.span,
                });
            }
        }

        Ok(TypedProgram {
            node_types: self.node_types,
            node_decls: self.node_decls,
            decl_types,
            calls: self.calls,
        })
    }
}
