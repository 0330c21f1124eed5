// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration pass: builds the scope tree and the declaration table.
//!
//! Every class, procedure, parameter, variable and type parameter becomes a
//! [`Declaration`] bound in the scope it is visible in. Every statement and
//! expression node is tagged with its enclosing scope so later passes can
//! resolve names from it.

use std::collections::HashMap;
use std::sync::Arc;

use sable_ast::decl::{ClassDecl, Decl, DeclKind as AstDeclKind, ProcDecl, TypeParam, VarDecl};
use sable_ast::expr::{Expr, ExprKind};
use sable_ast::stmt::{Stmt, StmtKind};
use sable_ast::{DeclId, Module, NodeId, ScopeId, Span};
use sable_types::{CoreClasses, Type, TypeError, TypeVarGen};

use crate::decl::{ClassInfo, DeclKind, DeclTable, Declaration, ProcInfo, VarInfo, VarRole};
use crate::scope::{ScopeKind, ScopeTree};

/// Output of the declaration pass.
#[derive(Debug)]
pub struct DeclaredProgram {
    pub scopes: ScopeTree,
    pub decls: DeclTable,
    /// Enclosing scope of every statement and expression node.
    pub node_scopes: HashMap<NodeId, ScopeId>,
    /// Declaration introduced by a declaring node (declarations, parameters,
    /// type parameters, local variable statements).
    pub node_decls: HashMap<NodeId, DeclId>,
    pub core: Arc<CoreClasses>,
    /// Generator for type variables, continued by later passes.
    pub vars: TypeVarGen,
}

/// Run the declaration pass over `module`.
pub fn declare(module: &Module, core: Arc<CoreClasses>) -> Result<DeclaredProgram, TypeError> {
    let mut declarer = Declarer::new(core);
    declarer.register_core()?;
    for decl in &module.decls {
        declarer.declare_decl(decl, None)?;
    }
    tracing::debug!(
        decls = declarer.decls.len(),
        scopes = declarer.scopes.len(),
        "declaration pass finished"
    );
    Ok(declarer.finish())
}

struct Declarer {
    scopes: ScopeTree,
    decls: DeclTable,
    node_scopes: HashMap<NodeId, ScopeId>,
    node_decls: HashMap<NodeId, DeclId>,
    core: Arc<CoreClasses>,
    vars: TypeVarGen,
    /// Return statements of the procedures being declared, innermost last.
    returns: Vec<Vec<NodeId>>,
}

impl Declarer {
    fn new(core: Arc<CoreClasses>) -> Self {
        Self {
            scopes: ScopeTree::new(),
            decls: DeclTable::new(),
            node_scopes: HashMap::new(),
            node_decls: HashMap::new(),
            vars: core.var_gen(),
            core,
            returns: Vec::new(),
        }
    }

    fn finish(self) -> DeclaredProgram {
        DeclaredProgram {
            scopes: self.scopes,
            decls: self.decls,
            node_scopes: self.node_scopes,
            node_decls: self.node_decls,
            core: self.core,
            vars: self.vars,
        }
    }

    fn register_core(&mut self) -> Result<(), TypeError> {
        let core = Arc::clone(&self.core);
        for class in core.iter() {
            let id = self.decls.insert(class.name.clone(), DeclKind::CoreClass, None, ScopeId::GLOBAL, Span::default());
            self.decls[id].ty.set(Type::Class(class.clone()));
            self.scopes.define(ScopeId::GLOBAL, &class.name, id, false, Span::default())?;
        }
        Ok(())
    }

    /// Insert `kind` in the current scope and bind it.
    fn bind(&mut self, name: &str, kind: DeclKind, node: Option<NodeId>, span: Span) -> Result<DeclId, TypeError> {
        let scope = self.scopes.current();
        let overloadable = matches!(kind, DeclKind::Procedure(_));
        let id = self.decls.insert(name.to_string(), kind, node, scope, span);
        self.scopes.define(scope, name, id, overloadable, span)?;
        if let Some(node) = node {
            self.node_decls.insert(node, id);
        }
        Ok(id)
    }

    fn declare_decl(&mut self, decl: &Decl, owner: Option<DeclId>) -> Result<Option<DeclId>, TypeError> {
        match &decl.kind {
            AstDeclKind::Class(class) => self.declare_class(class, decl).map(Some),
            AstDeclKind::Procedure(proc) if proc.is_constructor => {
                let Some(class) = owner else {
                    return Err(TypeError::invalid(
                        format!("initializer `{}` outside of a class", proc.name),
                        decl.span,
                    ));
                };
                let class_name = &self.decls[class].name;
                if &proc.name != class_name {
                    return Err(TypeError::invalid(
                        format!("initializer `{}` declared in class `{}`", proc.name, class_name),
                        decl.span,
                    ));
                }
                // Initializers are reached through the class, not by name.
                self.declare_procedure(proc, decl, owner, Some(class), false).map(Some)
            }
            AstDeclKind::Procedure(proc) => self.declare_procedure(proc, decl, owner, None, true).map(Some),
            AstDeclKind::Variable(var) => {
                let role = if owner.is_some() { VarRole::Field } else { VarRole::Global };
                if let Some(init) = &var.init {
                    self.declare_expr(init);
                }
                let info = VarInfo {
                    role,
                    ty: var.ty.clone(),
                    is_public: var.is_public,
                };
                self.bind(&var.name, DeclKind::Variable(info), Some(decl.id), decl.span).map(Some)
            }
        }
    }

    fn declare_type_params(&mut self, params: &[TypeParam]) -> Result<Vec<DeclId>, TypeError> {
        let scope = self.scopes.current();
        params
            .iter()
            .map(|tp| {
                let var = self.vars.named(tp.name.clone(), scope);
                let id = self.bind(&tp.name, DeclKind::TypeParam(var.clone()), Some(tp.id), tp.span)?;
                self.decls[id].ty.set(Type::Var(var));
                Ok(id)
            })
            .collect()
    }

    fn declare_class(&mut self, class: &ClassDecl, decl: &Decl) -> Result<DeclId, TypeError> {
        let placeholder = ClassInfo {
            member_scope: ScopeId::GLOBAL,
            type_params: Vec::new(),
            supers: class.supers.clone(),
            constructors: Vec::new(),
            default_constructor: None,
            fields: Vec::new(),
        };
        let id = self.bind(&class.name, DeclKind::Class(placeholder), Some(decl.id), decl.span)?;

        let member_scope = self.scopes.push(ScopeKind::Class(id));
        let type_params = self.declare_type_params(&class.type_params)?;

        let mut fields = Vec::new();
        let mut constructors = Vec::new();
        for member in &class.members {
            let Some(member_id) = self.declare_decl(member, Some(id))? else { continue };
            match &self.decls[member_id].kind {
                DeclKind::Variable(_) => fields.push(member_id),
                DeclKind::Procedure(info) if info.constructor_of.is_some() => constructors.push(member_id),
                _ => {}
            }
        }

        let default_constructor = if constructors.is_empty() {
            Some(self.synthesize_constructor(id, &class.name, &fields, decl.span))
        } else {
            None
        };
        self.scopes.pop();

        tracing::trace!(class = %class.name, fields = fields.len(), constructors = constructors.len(), "declared class");
        self.decls[id].kind = DeclKind::Class(ClassInfo {
            member_scope,
            type_params,
            supers: class.supers.clone(),
            constructors,
            default_constructor,
            fields,
        });
        Ok(id)
    }

    /// Default initializer taking every field in declaration order.
    fn synthesize_constructor(&mut self, class: DeclId, name: &str, fields: &[DeclId], span: Span) -> DeclId {
        let scope = self.scopes.current();
        let info = ProcInfo {
            body_scope: scope,
            type_params: Vec::new(),
            params: fields.to_vec(),
            ret: None,
            returns: Vec::new(),
            is_native: false,
            constructor_of: Some(class),
            synthesized: true,
            owner: Some(class),
        };
        let id = self.decls.insert(name.to_string(), DeclKind::Procedure(info), None, scope, span);
        let body_scope = self.scopes.push(ScopeKind::Procedure(id));
        self.scopes.pop();
        if let DeclKind::Procedure(info) = &mut self.decls[id].kind {
            info.body_scope = body_scope;
        }
        id
    }

    fn declare_procedure(
        &mut self,
        proc: &ProcDecl,
        decl: &Decl,
        owner: Option<DeclId>,
        constructor_of: Option<DeclId>,
        bound: bool,
    ) -> Result<DeclId, TypeError> {
        let placeholder = ProcInfo {
            body_scope: ScopeId::GLOBAL,
            type_params: Vec::new(),
            params: Vec::new(),
            ret: proc.ret.clone(),
            returns: Vec::new(),
            is_native: proc.is_native,
            constructor_of,
            synthesized: false,
            owner,
        };
        let id = if bound {
            self.bind(&proc.name, DeclKind::Procedure(placeholder), Some(decl.id), decl.span)?
        } else {
            let scope = self.scopes.current();
            let id = self.decls.insert(proc.name.clone(), DeclKind::Procedure(placeholder), Some(decl.id), scope, decl.span);
            self.node_decls.insert(decl.id, id);
            id
        };

        let body_scope = self.scopes.push(ScopeKind::Procedure(id));
        let type_params = self.declare_type_params(&proc.type_params)?;
        let mut params = Vec::with_capacity(proc.params.len());
        for param in &proc.params {
            let info = VarInfo {
                role: VarRole::Parameter,
                ty: param.ty.clone(),
                is_public: false,
            };
            params.push(self.bind(&param.name, DeclKind::Variable(info), Some(param.id), param.span)?);
        }

        self.returns.push(Vec::new());
        let body = self.declare_block(&proc.body);
        let returns = self.returns.pop().unwrap_or_default();
        self.scopes.pop();
        body?;

        if let DeclKind::Procedure(info) = &mut self.decls[id].kind {
            info.body_scope = body_scope;
            info.type_params = type_params;
            info.params = params;
            info.returns = returns;
        }
        Ok(id)
    }

    fn declare_block(&mut self, stmts: &[Stmt]) -> Result<(), TypeError> {
        for stmt in stmts {
            self.declare_stmt(stmt)?;
        }
        Ok(())
    }

    fn declare_nested_block(&mut self, stmts: &[Stmt]) -> Result<(), TypeError> {
        self.scopes.push(ScopeKind::Block);
        let result = self.declare_block(stmts);
        self.scopes.pop();
        result
    }

    fn declare_stmt(&mut self, stmt: &Stmt) -> Result<(), TypeError> {
        self.node_scopes.insert(stmt.id, self.scopes.current());
        match &stmt.kind {
            StmtKind::Expr(expr) => self.declare_expr(expr),
            StmtKind::Var(var) => self.declare_local(var, stmt)?,
            StmtKind::Assign { target, value } => {
                self.declare_expr(target);
                self.declare_expr(value);
            }
            StmtKind::Return(value) => {
                let Some(returns) = self.returns.last_mut() else {
                    return Err(TypeError::invalid("return outside of a procedure", stmt.span));
                };
                returns.push(stmt.id);
                if let Some(value) = value {
                    self.declare_expr(value);
                }
            }
            StmtKind::If { cond, then_body, else_body } => {
                self.declare_expr(cond);
                self.declare_nested_block(then_body)?;
                self.declare_nested_block(else_body)?;
            }
            StmtKind::While { cond, body } => {
                self.declare_expr(cond);
                self.declare_nested_block(body)?;
            }
        }
        Ok(())
    }

    fn declare_local(&mut self, var: &VarDecl, stmt: &Stmt) -> Result<(), TypeError> {
        if let Some(init) = &var.init {
            self.declare_expr(init);
        }
        let info = VarInfo {
            role: VarRole::Local,
            ty: var.ty.clone(),
            is_public: false,
        };
        self.bind(&var.name, DeclKind::Variable(info), Some(stmt.id), stmt.span)?;
        Ok(())
    }

    fn declare_expr(&mut self, expr: &Expr) {
        self.node_scopes.insert(expr.id, self.scopes.current());
        match &expr.kind {
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.declare_expr(arg);
                }
            }
            ExprKind::Member { object, member } => {
                self.declare_expr(object);
                self.declare_expr(member);
            }
            ExprKind::Cast { expr: inner, .. } => self.declare_expr(inner),
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::String(_)
            | ExprKind::Char(_)
            | ExprKind::Bool(_)
            | ExprKind::This
            | ExprKind::Ident(_) => {}
        }
    }
}

impl DeclaredProgram {
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    /// Scope a statement or expression was declared in.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sable_ast::AstBuilder;
    use sable_types::ErrorKind;

    fn run(module: &Module) -> Result<DeclaredProgram, TypeError> {
        declare(module, Arc::new(CoreClasses::new()))
    }

    fn find<'a>(program: &'a DeclaredProgram, name: &str) -> Vec<&'a Declaration> {
        program.decls.iter().filter(|d| d.name == name).collect()
    }

    #[test]
    fn test_core_classes_are_global() {
        let program = run(&Module::default()).unwrap();
        for name in ["Object", "Char", "String", "Int", "Float", "Bool", "Array", "void"] {
            let id = program.scopes.resolve(ScopeId::GLOBAL, name).expect(name);
            assert!(matches!(program.decl(id).kind, DeclKind::CoreClass));
            assert!(program.decl(id).ty.is_set());
        }
    }

    #[test]
    fn test_default_constructor_takes_fields() {
        let mut b = AstBuilder::new();
        let x_ty = b.ty("X");
        let x = b.field(x_ty, "x");
        let int = b.ty("Int");
        let y = b.field(int, "y");
        let foo = b.class("Foo", &["X"], vec![], vec![x, y]);
        let program = run(&b.module(vec![foo])).unwrap();

        let class_id = program.decls.class_named("Foo").unwrap();
        let info = program.decl(class_id).as_class().unwrap();
        assert!(info.constructors.is_empty());
        assert_eq!(info.type_params.len(), 1);
        let ctor = info.default_constructor.unwrap();
        let proc = program.decl(ctor).as_procedure().unwrap();
        assert!(proc.synthesized);
        assert_eq!(proc.params, info.fields);
        assert_eq!(info.initializers(), vec![ctor]);
    }

    #[test]
    fn test_default_constructor_skips_inherited_fields() {
        let mut b = AstBuilder::new();
        let int = b.ty("Int");
        let a = b.field(int, "a");
        let base = b.class("A", &[], vec![], vec![a]);
        let chr = b.ty("Char");
        let c = b.field(chr, "c");
        let a_ty = b.ty("A");
        let derived = b.class("B", &[], vec![a_ty], vec![c]);
        let program = run(&b.module(vec![base, derived])).unwrap();

        let info = program.decl(program.decls.class_named("B").unwrap()).as_class().unwrap();
        let ctor = info.default_constructor.unwrap();
        let params = &program.decl(ctor).as_procedure().unwrap().params;
        assert_eq!(params.len(), 1);
        assert_eq!(program.decl(params[0]).name, "c");
    }

    #[test]
    fn test_explicit_constructor_suppresses_default() {
        let mut b = AstBuilder::new();
        let int = b.ty("Int");
        let p = b.param("v", int);
        let ctor = b.constructor("Foo", vec![p], vec![]);
        let foo = b.class("Foo", &[], vec![], vec![ctor]);
        let program = run(&b.module(vec![foo])).unwrap();

        let info = program.decl(program.decls.class_named("Foo").unwrap()).as_class().unwrap();
        assert_eq!(info.constructors.len(), 1);
        assert_eq!(info.default_constructor, None);
        // Initializers are not callable by name from inside the class.
        assert_eq!(program.scopes.overload_layers(info.member_scope, "Foo", true), Vec::<Vec<DeclId>>::new());
    }

    #[test]
    fn test_returns_are_recorded_per_procedure() {
        let mut b = AstBuilder::new();
        let t = b.bool(true);
        let one = b.int(1);
        let r1 = b.ret(one);
        let two = b.int(2);
        let r2 = b.ret(two);
        let branch = b.if_else(t, vec![r1], vec![r2]);
        let ret = b.infer();
        let f = b.procedure("f", vec![], Some(ret), vec![branch]);
        let program = run(&b.module(vec![f])).unwrap();

        let f = find(&program, "f")[0].as_procedure().unwrap();
        assert_eq!(f.returns.len(), 2);
        assert!(f.infers_return());
    }

    #[test]
    fn test_duplicate_local_is_redeclaration() {
        let mut b = AstBuilder::new();
        let int = b.ty("Int");
        let one = b.int(1);
        let a1 = b.local(int, "a", Some(one));
        let int = b.ty("Int");
        let two = b.int(2);
        let a2 = b.local(int, "a", Some(two));
        let f = b.procedure("f", vec![], None, vec![a1, a2]);
        let err = run(&b.module(vec![f])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Redeclaration);
    }

    #[test]
    fn test_shadowing_in_nested_block() {
        let mut b = AstBuilder::new();
        let int = b.ty("Int");
        let one = b.int(1);
        let a1 = b.local(int, "a", Some(one));
        let int = b.ty("Int");
        let two = b.int(2);
        let a2 = b.local(int, "a", Some(two));
        let cond = b.bool(true);
        let inner = b.while_loop(cond, vec![a2]);
        let f = b.procedure("f", vec![], None, vec![a1, inner]);
        assert!(run(&b.module(vec![f])).is_ok());
    }

    #[test]
    fn test_overloads_share_a_name() {
        let mut b = AstBuilder::new();
        let int = b.ty("Int");
        let p1 = b.param("a", int);
        let f1 = b.procedure("f", vec![p1], None, vec![]);
        let chr = b.ty("Char");
        let p2 = b.param("a", chr);
        let f2 = b.procedure("f", vec![p2], None, vec![]);
        let program = run(&b.module(vec![f1, f2])).unwrap();
        assert_eq!(program.scopes.overload_layers(ScopeId::GLOBAL, "f", false)[0].len(), 2);
    }

    #[test]
    fn test_nodes_are_scoped() {
        let mut b = AstBuilder::new();
        let x = b.ident("x");
        let x_id = x.id;
        let stmt = b.expr_stmt(x);
        let f = b.procedure("f", vec![], None, vec![stmt]);
        let program = run(&b.module(vec![f])).unwrap();
        let f = find(&program, "f")[0].as_procedure().unwrap();
        assert_eq!(program.scope_of(x_id), Some(f.body_scope));
    }
}
