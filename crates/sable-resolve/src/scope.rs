// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Scope tree for name and overload lookup.

use std::collections::{HashMap, HashSet};

use sable_ast::{DeclId, ScopeId, Span};
use sable_types::{more_specific, Substitution, Type, TypeError};

use crate::decl::DeclTable;

/// The kind of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Global scope (top-level declarations and core classes).
    Global,
    /// Member scope of a class.
    Class(DeclId),
    /// Parameters and body of a procedure.
    Procedure(DeclId),
    /// Body of an `if` branch or a loop.
    Block,
}

/// A scope in the scope tree.
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// Uniquely bound names.
    pub bindings: HashMap<String, DeclId>,
    /// Procedure overload sets.
    pub overloads: HashMap<String, Vec<DeclId>>,
    /// Member scopes of the super classes, in precedence order.
    pub class_parents: Vec<ScopeId>,
    /// Bindings that hold for everything visible from this scope, such as
    /// a super class's parameters instantiated by the subclass.
    pub substitution: Substitution,
}

impl Scope {
    fn new(id: ScopeId, parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            id,
            parent,
            kind,
            bindings: HashMap::new(),
            overloads: HashMap::new(),
            class_parents: Vec::new(),
            substitution: Substitution::new(),
        }
    }
}

/// Tree of scopes, addressed by [`ScopeId`].
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl ScopeTree {
    /// Create a new scope tree with a global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeId::GLOBAL, None, ScopeKind::Global)],
            current: ScopeId::GLOBAL,
        }
    }

    /// Push a new scope under the current one and enter it.
    pub fn push(&mut self, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, Some(self.current), kind));
        self.current = id;
        id
    }

    /// Return to the parent of the current scope.
    pub fn pop(&mut self) {
        if let Some(parent) = self.scope(self.current).parent {
            self.current = parent;
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Bind `name` in `scope`. Overloadable declarations join the overload
    /// set; anything else must be the only use of the name in this scope.
    pub fn define(&mut self, scope: ScopeId, name: &str, decl: DeclId, overloadable: bool, span: Span) -> Result<(), TypeError> {
        let target = self.scope_mut(scope);
        let taken = target.bindings.contains_key(name) || (!overloadable && target.overloads.contains_key(name));
        if taken {
            return Err(TypeError::Redeclaration {
                name: name.to_string(),
                span,
            });
        }
        if overloadable {
            target.overloads.entry(name.to_string()).or_default().push(decl);
        } else {
            target.bindings.insert(name.to_string(), decl);
        }
        Ok(())
    }

    /// Look `name` up starting at `scope`: local bindings, then the
    /// inherited class scopes in order, then the lexical parent.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        let mut scope_id = Some(scope);
        while let Some(id) = scope_id {
            if let Some(decl) = self.lookup_in_class(id, name) {
                return Some(decl);
            }
            scope_id = self.scope(id).parent;
        }
        None
    }

    /// Look `name` up in `scope` and the class scopes it inherits from,
    /// without leaving the class hierarchy.
    pub fn lookup_in_class(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.hierarchy(scope)
            .into_iter()
            .find_map(|id| self.scope(id).bindings.get(name).copied())
    }

    /// `scope` followed by its inherited class scopes, depth first in
    /// declaration order, each once.
    fn hierarchy(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.scope(id).class_parents.iter().rev());
        }
        out
    }

    /// Overload sets for `name` visible from `scope`, nearest first. With
    /// `class_only` the lexical parents are not consulted.
    pub fn overload_layers(&self, scope: ScopeId, name: &str, class_only: bool) -> Vec<Vec<DeclId>> {
        let mut layers = Vec::new();
        let mut seen = HashSet::new();
        let mut scope_id = Some(scope);
        while let Some(id) = scope_id {
            for inherited in self.hierarchy(id) {
                if !seen.insert(inherited) {
                    continue;
                }
                if let Some(set) = self.scope(inherited).overloads.get(name) {
                    layers.push(set.clone());
                }
            }
            if class_only {
                break;
            }
            scope_id = self.scope(id).parent;
        }
        layers
    }

    /// Candidate declarations for a call of `name` from `scope`, with
    /// overridden declarations removed.
    ///
    /// Layers are visited nearest first. A candidate from a later layer is
    /// dropped when an already collected candidate has parameters at least
    /// as specific as its own. Candidates whose signature is not committed
    /// yet are never dropped.
    pub fn resolve_overloads(
        &self,
        scope: ScopeId,
        name: &str,
        decls: &DeclTable,
        class_only: bool,
        span: Span,
    ) -> Result<Vec<DeclId>, TypeError> {
        let subst = self.substitutions(scope);
        let params = |id: DeclId| -> Option<Vec<Type>> {
            let ty = decls.get(id)?.ty.get()?;
            let func = ty.as_function()?;
            Some(func.params.iter().map(|p| subst.apply(p)).collect())
        };

        let mut chosen: Vec<DeclId> = Vec::new();
        for layer in self.overload_layers(scope, name, class_only) {
            let mut accepted = Vec::new();
            for candidate in layer {
                let overridden = params(candidate).is_some_and(|theirs| {
                    chosen
                        .iter()
                        .filter_map(|&c| params(c))
                        .any(|ours| more_specific(&ours, &theirs))
                });
                if overridden {
                    tracing::trace!(name, ?candidate, "overridden candidate dropped");
                } else {
                    accepted.push(candidate);
                }
            }
            chosen.extend(accepted);
        }

        if chosen.is_empty() {
            return Err(TypeError::UnknownIdentifier {
                name: name.to_string(),
                span,
            });
        }
        Ok(chosen)
    }

    pub fn add_class_parent(&mut self, scope: ScopeId, parent: ScopeId) {
        let parents = &mut self.scope_mut(scope).class_parents;
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    pub fn add_substitution(&mut self, scope: ScopeId, subst: &Substitution) {
        self.scope_mut(scope).substitution.merge(subst);
    }

    /// Every substitution visible from `scope`, inner bindings winning.
    pub fn substitutions(&self, scope: ScopeId) -> Substitution {
        let mut merged = Substitution::new();
        let mut scope_id = Some(scope);
        while let Some(id) = scope_id {
            for inherited in self.hierarchy(id) {
                merged.merge(&self.scope(inherited).substitution);
            }
            scope_id = self.scope(id).parent;
        }
        merged
    }

    /// Innermost class whose member scope encloses `scope`.
    pub fn enclosing_class(&self, scope: ScopeId) -> Option<DeclId> {
        self.ancestors(scope).find_map(|s| match s.kind {
            ScopeKind::Class(decl) => Some(decl),
            _ => None,
        })
    }

    /// Innermost procedure whose body encloses `scope`.
    pub fn enclosing_procedure(&self, scope: ScopeId) -> Option<DeclId> {
        self.ancestors(scope).find_map(|s| match s.kind {
            ScopeKind::Procedure(decl) => Some(decl),
            _ => None,
        })
    }

    /// `scope` and its lexical parents.
    fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(self.get(scope), move |s| s.parent.and_then(|p| self.get(p)))
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{DeclKind, VarInfo, VarRole};
    use pretty_assertions::assert_eq;
    use sable_ast::decl::TypeExpr;
    use sable_types::{CoreClasses, FunctionType};

    fn variable(decls: &mut DeclTable, name: &str, scope: ScopeId) -> DeclId {
        let info = VarInfo {
            role: VarRole::Local,
            ty: TypeExpr::infer(Span::default()),
            is_public: false,
        };
        decls.insert(name.to_string(), DeclKind::Variable(info), None, scope, Span::default())
    }

    /// A procedure declaration with a committed signature.
    fn procedure(decls: &mut DeclTable, name: &str, scope: ScopeId, params: Vec<Type>) -> DeclId {
        let core = CoreClasses::new();
        let id = variable(decls, name, scope);
        decls[id].ty.set(Type::Function(FunctionType {
            name: name.to_string(),
            params,
            ret: Box::new(core.void()),
        }));
        id
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let mut scopes = ScopeTree::new();
        let mut decls = DeclTable::new();
        let a = variable(&mut decls, "a", ScopeId::GLOBAL);
        let b = variable(&mut decls, "a", ScopeId::GLOBAL);
        assert!(scopes.define(ScopeId::GLOBAL, "a", a, false, Span::default()).is_ok());
        let err = scopes.define(ScopeId::GLOBAL, "a", b, false, Span::new(4, 5)).unwrap_err();
        assert_eq!(err, TypeError::Redeclaration { name: "a".to_string(), span: Span::new(4, 5) });

        // Shadowing in a nested scope is fine.
        let inner = scopes.push(ScopeKind::Block);
        assert!(scopes.define(inner, "a", b, false, Span::default()).is_ok());
        assert_eq!(scopes.resolve(inner, "a"), Some(b));
        assert_eq!(scopes.resolve(ScopeId::GLOBAL, "a"), Some(a));
    }

    #[test]
    fn test_resolve_prefers_inherited_members_over_lexical() {
        let mut scopes = ScopeTree::new();
        let mut decls = DeclTable::new();
        let global_x = variable(&mut decls, "x", ScopeId::GLOBAL);
        scopes.define(ScopeId::GLOBAL, "x", global_x, false, Span::default()).unwrap();

        let base = scopes.push(ScopeKind::Class(DeclId(100)));
        let field_x = variable(&mut decls, "x", base);
        scopes.define(base, "x", field_x, false, Span::default()).unwrap();
        scopes.pop();

        let derived = scopes.push(ScopeKind::Class(DeclId(101)));
        scopes.add_class_parent(derived, base);
        let body = scopes.push(ScopeKind::Procedure(DeclId(102)));

        assert_eq!(scopes.resolve(body, "x"), Some(field_x));
        assert_eq!(scopes.lookup_in_class(derived, "x"), Some(field_x));
        assert_eq!(scopes.lookup_in_class(body, "x"), None);
        assert_eq!(scopes.enclosing_class(body), Some(DeclId(101)));
        assert_eq!(scopes.enclosing_procedure(body), Some(DeclId(102)));
        assert_eq!(scopes.enclosing_procedure(derived), None);
    }

    #[test]
    fn test_override_elimination() {
        let core = CoreClasses::new();
        let mut scopes = ScopeTree::new();
        let mut decls = DeclTable::new();

        let a = scopes.push(ScopeKind::Class(DeclId(100)));
        let a_test = procedure(&mut decls, "test", a, vec![core.int()]);
        let a_other = procedure(&mut decls, "test", a, vec![core.string()]);
        scopes.define(a, "test", a_test, true, Span::default()).unwrap();
        scopes.define(a, "test", a_other, true, Span::default()).unwrap();
        scopes.pop();

        let b = scopes.push(ScopeKind::Class(DeclId(101)));
        scopes.add_class_parent(b, a);
        let b_test = procedure(&mut decls, "test", b, vec![core.int()]);
        scopes.define(b, "test", b_test, true, Span::default()).unwrap();

        let found = scopes.resolve_overloads(b, "test", &decls, true, Span::default()).unwrap();
        assert_eq!(found, vec![b_test, a_other]);

        let found = scopes.resolve_overloads(a, "test", &decls, true, Span::default()).unwrap();
        assert_eq!(found, vec![a_test, a_other]);
    }

    #[test]
    fn test_override_through_instantiated_super() {
        let core = CoreClasses::new();
        let mut gen = core.var_gen();
        let mut scopes = ScopeTree::new();
        let mut decls = DeclTable::new();

        // class Foo<X>: f(X)
        let foo = scopes.push(ScopeKind::Class(DeclId(100)));
        let x = gen.named("X", foo);
        let foo_f = procedure(&mut decls, "f", foo, vec![Type::Var(x.clone())]);
        scopes.define(foo, "f", foo_f, true, Span::default()).unwrap();
        scopes.pop();

        // class Bar : Foo<Int>: f(Int)
        let bar = scopes.push(ScopeKind::Class(DeclId(101)));
        scopes.add_class_parent(bar, foo);
        let mut inst = Substitution::new();
        inst.bind(x.id, core.int());
        scopes.add_substitution(bar, &inst);
        let bar_f = procedure(&mut decls, "f", bar, vec![core.int()]);
        scopes.define(bar, "f", bar_f, true, Span::default()).unwrap();

        let found = scopes.resolve_overloads(bar, "f", &decls, false, Span::default()).unwrap();
        assert_eq!(found, vec![bar_f]);
        assert_eq!(scopes.substitutions(bar).apply(&Type::Var(x)), core.int());
    }

    #[test]
    fn test_unknown_overload() {
        let scopes = ScopeTree::new();
        let decls = DeclTable::new();
        let err = scopes
            .resolve_overloads(ScopeId::GLOBAL, "nope", &decls, false, Span::new(1, 2))
            .unwrap_err();
        assert_eq!(err, TypeError::UnknownIdentifier { name: "nope".to_string(), span: Span::new(1, 2) });
    }

    #[test]
    fn test_overload_and_binding_conflict() {
        let mut scopes = ScopeTree::new();
        let mut decls = DeclTable::new();
        let f = procedure(&mut decls, "f", ScopeId::GLOBAL, vec![]);
        let v = variable(&mut decls, "f", ScopeId::GLOBAL);
        scopes.define(ScopeId::GLOBAL, "f", f, true, Span::default()).unwrap();
        assert!(scopes.define(ScopeId::GLOBAL, "f", v, false, Span::default()).is_err());
    }
}
