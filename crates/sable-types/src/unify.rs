// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Directional unification.
//!
//! `is_a(candidate, target)` asks whether a value of type `candidate` can be
//! used where `target` is expected. Class types are related nominally: the
//! candidate either has the target's name or carries a super type with that
//! name somewhere in its (already instantiated) lineage.

use std::collections::HashSet;

use crate::subst::Substitution;
use crate::types::{ClassType, FunctionType, Type, TypeVarId};

/// Unification failure. Reported with the outermost pair of types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("type mismatch: expected {expected}, found {found}")]
pub struct Mismatch {
    pub expected: Type,
    pub found: Type,
}

struct Unifier {
    subst: Substitution,
    rigid: HashSet<TypeVarId>,
}

impl Unifier {
    fn new(subst: Substitution) -> Self {
        Self {
            subst,
            rigid: HashSet::new(),
        }
    }

    fn is_flexible(&self, var: TypeVarId) -> bool {
        !self.rigid.contains(&var)
    }

    fn unify(&mut self, candidate: &Type, target: &Type) -> bool {
        let candidate = self.subst.walk(candidate).clone();
        let target = self.subst.walk(target).clone();

        match (&candidate, &target) {
            (Type::Bottom, _) | (_, Type::Bottom) => false,
            (Type::Top, _) | (_, Type::Top) => true,

            (Type::Var(a), Type::Var(b)) if a == b => true,
            (_, Type::Var(v)) if self.is_flexible(v.id) => self.bind(v.id, &candidate),
            (Type::Var(v), _) if self.is_flexible(v.id) => self.bind(v.id, &target),

            (Type::Class(c), Type::Class(t)) => {
                if c.name == t.name {
                    c.params.len() == t.params.len()
                        && c.params.iter().zip(&t.params).all(|(a, b)| self.unify(a, b))
                } else {
                    match c.find_super(&t.name) {
                        Some(sup) => {
                            let sup = Type::Class(sup.clone());
                            self.unify(&sup, &target)
                        }
                        None => false,
                    }
                }
            }

            (Type::Function(c), Type::Function(t)) => {
                c.params.len() == t.params.len()
                    && c.params.iter().zip(&t.params).all(|(a, b)| self.unify(a, b))
                    && self.unify(&c.ret, &t.ret)
            }

            _ => false,
        }
    }

    fn bind(&mut self, var: TypeVarId, ty: &Type) -> bool {
        let ty = self.subst.apply(ty);
        if ty.occurs(var) {
            return false;
        }
        self.subst.bind(var, ty);
        true
    }
}

/// Unify `candidate` into `target` with an empty starting substitution.
pub fn is_a(candidate: &Type, target: &Type) -> Result<Substitution, Mismatch> {
    is_a_under(candidate, target, &Substitution::new())
}

/// Unify `candidate` into `target`, extending `base`. On success the
/// returned substitution contains `base` plus the new bindings.
pub fn is_a_under(candidate: &Type, target: &Type, base: &Substitution) -> Result<Substitution, Mismatch> {
    is_a_rigid(candidate, target, base, &HashSet::new())
}

/// Like [`is_a_under`], but the variables in `rigid` stand for one unknown
/// type and are never bound. Variables already bound in `base` still resolve.
pub fn is_a_rigid(
    candidate: &Type,
    target: &Type,
    base: &Substitution,
    rigid: &HashSet<TypeVarId>,
) -> Result<Substitution, Mismatch> {
    let mut unifier = Unifier::new(base.clone());
    unifier.rigid = rigid.clone();
    if unifier.unify(candidate, target) {
        Ok(unifier.subst)
    } else {
        Err(Mismatch {
            expected: base.apply(target),
            found: base.apply(candidate),
        })
    }
}

/// Related in either direction.
pub fn unifiable(a: &Type, b: &Type) -> bool {
    is_a(a, b).is_ok() || is_a(b, a).is_ok()
}

/// Replace every type variable with `Top`.
pub fn erase(ty: &Type) -> Type {
    match ty {
        Type::Var(_) => Type::Top,
        Type::Class(c) => Type::Class(erase_class(c)),
        Type::Function(f) => Type::Function(FunctionType {
            name: f.name.clone(),
            params: f.params.iter().map(erase).collect(),
            ret: Box::new(erase(&f.ret)),
        }),
        Type::Top | Type::Bottom => ty.clone(),
    }
}

fn erase_class(class: &ClassType) -> ClassType {
    ClassType {
        name: class.name.clone(),
        supers: class.supers.iter().map(erase_class).collect(),
        params: class.params.iter().map(erase).collect(),
    }
}

/// Whether parameter list `a` is at least as specific as `b`: each of `a`'s
/// parameters unifies into the corresponding one of `b` while `a`'s own
/// variables stay rigid.
pub fn more_specific(a: &[Type], b: &[Type]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unifier = Unifier::new(Substitution::new());
    unifier.rigid = a.iter().flat_map(|t| t.free_vars()).map(|v| v.id).collect();
    a.iter().zip(b).all(|(x, y)| unifier.unify(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeVarGen;
    use sable_ast::ScopeId;

    fn object() -> ClassType {
        ClassType::new("Object", vec![], vec![])
    }

    fn class(name: &str, supers: Vec<ClassType>) -> Type {
        Type::Class(ClassType::new(name, supers, vec![]))
    }

    fn int() -> Type {
        class("Int", vec![object()])
    }

    #[test]
    fn unification_is_reflexive() {
        let mut gen = TypeVarGen::starting_at(0);
        let x = Type::Var(gen.named("X", ScopeId::GLOBAL));
        let boxed = Type::Class(ClassType::new("Box", vec![object()], vec![x.clone()]));
        for ty in [int(), x, boxed, Type::Top] {
            let s = is_a(&ty, &ty).unwrap();
            assert!(s.is_empty(), "{} bound something against itself", ty);
        }
    }

    #[test]
    fn subclass_is_a_superclass_but_not_reverse() {
        let a = ClassType::new("A", vec![object()], vec![]);
        let b = class("B", vec![a.clone()]);
        let a = Type::Class(a);
        assert!(is_a(&b, &a).is_ok());
        let err = is_a(&a, &b).unwrap_err();
        assert_eq!(err.expected, b);
        assert_eq!(err.found, a);
    }

    #[test]
    fn generic_super_is_instantiated() {
        let mut gen = TypeVarGen::starting_at(0);
        let x = gen.named("X", ScopeId(1));
        let y = gen.named("Y", ScopeId(2));
        // class Wrap<Y> : Box<Y>
        let boxed_y = ClassType::new("Box", vec![object()], vec![Type::Var(y.clone())]);
        let wrap_int = Type::Class(ClassType::new("Wrap", vec![boxed_y], vec![Type::Var(y.clone())]));
        let mut pin = Substitution::new();
        pin.bind(y.id, int());
        let wrap_int = pin.apply(&wrap_int);

        let box_x = Type::Class(ClassType::new("Box", vec![object()], vec![Type::Var(x.clone())]));
        let s = is_a(&wrap_int, &box_x).unwrap();
        assert_eq!(s.apply(&Type::Var(x)), int());
    }

    #[test]
    fn bound_variables_are_never_overwritten() {
        let mut gen = TypeVarGen::starting_at(0);
        let x = Type::Var(gen.fresh(ScopeId::GLOBAL));
        let pair = |a: Type, b: Type| Type::Class(ClassType::new("Pair", vec![object()], vec![a, b]));
        let chr = class("Char", vec![object()]);
        assert!(is_a(&pair(int(), int()), &pair(x.clone(), x.clone())).is_ok());
        assert!(is_a(&pair(int(), chr), &pair(x.clone(), x)).is_err());
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let mut gen = TypeVarGen::starting_at(0);
        let x = gen.fresh(ScopeId::GLOBAL);
        let boxed = Type::Class(ClassType::new("Box", vec![object()], vec![Type::Var(x.clone())]));
        assert!(is_a(&boxed, &Type::Var(x)).is_err());
    }

    #[test]
    fn top_and_bottom() {
        assert!(is_a(&int(), &Type::Top).is_ok());
        assert!(is_a(&Type::Top, &int()).is_ok());
        assert!(is_a(&Type::Bottom, &Type::Top).is_err());
        assert!(is_a(&int(), &Type::Bottom).is_err());
    }

    #[test]
    fn specificity_holds_own_variables_rigid() {
        let mut gen = TypeVarGen::starting_at(0);
        let x = Type::Var(gen.named("X", ScopeId(1)));
        let a = ClassType::new("A", vec![object()], vec![]);
        let b = class("B", vec![a.clone()]);
        let a = Type::Class(a);

        assert!(more_specific(&[b.clone()], &[a.clone()]));
        assert!(!more_specific(&[a.clone()], &[b.clone()]));
        assert!(more_specific(&[int()], &[x.clone()]));
        assert!(!more_specific(&[x.clone()], &[int()]));
        assert!(more_specific(&[a.clone()], &[a]));
    }

    #[test]
    fn rigid_variables_do_not_bind() {
        let mut gen = TypeVarGen::starting_at(0);
        let x = gen.named("X", ScopeId(1));
        let y = Type::Var(gen.fresh(ScopeId(1)));
        let x_id = x.id;
        let rigid: HashSet<_> = [x_id].into_iter().collect();
        let x = Type::Var(x);
        let none = Substitution::new();

        assert!(is_a_rigid(&x, &int(), &none, &rigid).is_err());
        assert!(is_a_rigid(&int(), &x, &none, &rigid).is_err());
        assert!(is_a_rigid(&x, &x, &none, &rigid).is_ok());
        assert!(is_a_rigid(&x, &Type::Top, &none, &rigid).is_ok());

        // A flexible variable may still take the rigid one as its value.
        let s = is_a_rigid(&x, &y, &none, &rigid).unwrap();
        assert_eq!(s.apply(&y), x);

        let mut pinned = Substitution::new();
        pinned.bind(x_id, int());
        assert!(is_a_rigid(&int(), &x, &pinned, &rigid).is_ok());
    }

    #[test]
    fn erase_replaces_variables() {
        let mut gen = TypeVarGen::starting_at(0);
        let x = Type::Var(gen.named("X", ScopeId(1)));
        let y = Type::Var(gen.named("Y", ScopeId(2)));
        let box_of = |t: Type| Type::Class(ClassType::new("Box", vec![object()], vec![t]));
        assert_eq!(erase(&box_of(x)), erase(&box_of(y)));
        assert_eq!(erase(&box_of(int())), box_of(int()));
    }
}
