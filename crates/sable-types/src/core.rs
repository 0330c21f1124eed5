// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Built-in classes.

use sable_ast::ScopeId;

use crate::subst::Substitution;
use crate::types::{ClassType, Type, TypeVar, TypeVarGen, TypeVarId};

pub const OBJECT: &str = "Object";
pub const CHAR: &str = "Char";
pub const STRING: &str = "String";
pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const BOOL: &str = "Bool";
pub const ARRAY: &str = "Array";
pub const VOID: &str = "void";

/// Registry of the core classes every program starts with.
///
/// Built once and shared read-only between passes.
#[derive(Debug, Clone)]
pub struct CoreClasses {
    classes: Vec<ClassType>,
    array_param: TypeVar,
}

impl CoreClasses {
    pub fn new() -> Self {
        let object = ClassType::new(OBJECT, vec![], vec![]);
        let leaf = |name: &str| ClassType::new(name, vec![object.clone()], vec![]);
        let array_param = TypeVar {
            id: TypeVarId(0),
            name: Some("T".to_string()),
            owner: ScopeId::GLOBAL,
        };
        let classes = vec![
            object.clone(),
            leaf(CHAR),
            leaf(STRING),
            leaf(INT),
            leaf(FLOAT),
            leaf(BOOL),
            ClassType::new(ARRAY, vec![object.clone()], vec![Type::Var(array_param.clone())]),
            ClassType::new(VOID, vec![], vec![]),
        ];
        Self { classes, array_param }
    }

    /// Variable generator that does not collide with variables owned by
    /// the core classes.
    pub fn var_gen(&self) -> TypeVarGen {
        TypeVarGen::starting_at(self.array_param.id.0 + 1)
    }

    pub fn get(&self, name: &str) -> Option<&ClassType> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassType> {
        self.classes.iter()
    }

    fn ty(&self, name: &str) -> Type {
        match self.get(name) {
            Some(class) => Type::Class(class.clone()),
            None => Type::Bottom,
        }
    }

    pub fn object(&self) -> Type {
        self.ty(OBJECT)
    }

    pub fn char(&self) -> Type {
        self.ty(CHAR)
    }

    pub fn string(&self) -> Type {
        self.ty(STRING)
    }

    pub fn int(&self) -> Type {
        self.ty(INT)
    }

    pub fn float(&self) -> Type {
        self.ty(FLOAT)
    }

    pub fn bool(&self) -> Type {
        self.ty(BOOL)
    }

    pub fn void(&self) -> Type {
        self.ty(VOID)
    }

    pub fn array_param(&self) -> &TypeVar {
        &self.array_param
    }

    /// `Array<elem>`.
    pub fn array_of(&self, elem: Type) -> Type {
        let mut s = Substitution::new();
        s.bind(self.array_param.id, elem);
        s.apply(&self.ty(ARRAY))
    }
}

impl Default for CoreClasses {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unify::is_a;

    #[test]
    fn every_core_class_but_void_reaches_object() {
        let core = CoreClasses::new();
        for class in core.iter() {
            let distance = class.distance_to_root();
            if class.name == VOID {
                assert_eq!(distance, None);
            } else if class.name == OBJECT {
                assert_eq!(distance, Some(0));
            } else {
                assert_eq!(distance, Some(1), "{}", class.name);
            }
        }
    }

    #[test]
    fn array_instantiation() {
        let core = CoreClasses::new();
        let ints = core.array_of(core.int());
        assert_eq!(ints.to_string(), "Array<Int>");
        assert!(is_a(&ints, &core.object()).is_ok());
        assert!(is_a(&ints, &core.array_of(core.string())).is_err());
        assert!(is_a(&core.void(), &core.object()).is_err());
    }

    #[test]
    fn fresh_variables_skip_reserved_ids() {
        let core = CoreClasses::new();
        let mut gen = core.var_gen();
        assert_ne!(gen.fresh(ScopeId::GLOBAL).id, core.array_param().id);
    }
}
