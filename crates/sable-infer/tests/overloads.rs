// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Overload resolution, generic calls and override elimination.

use pretty_assertions::assert_eq;
use sable_ast::decl::Decl;
use sable_ast::{AstBuilder, NodeId};
use sable_infer::{check, TypedProgram};
use sable_types::{ErrorKind, TypeError};

fn declared_type(typed: &TypedProgram, node: NodeId) -> String {
    let id = typed.decl_of(node).expect("node declares something");
    typed.decl_types[&id].to_string()
}

fn type_args(typed: &TypedProgram, call: NodeId) -> Vec<String> {
    typed.call(call).expect("call was resolved").type_args.iter().map(ToString::to_string).collect()
}

/// `class A {}` and `class B : A {}`.
fn hierarchy(b: &mut AstBuilder) -> (Decl, Decl) {
    let a = b.class("A", &[], vec![], vec![]);
    let a_ty = b.ty("A");
    let bee = b.class("B", &[], vec![a_ty], vec![]);
    (a, bee)
}

/// `native name(ty v);`
fn native(b: &mut AstBuilder, name: &str, ty: &str) -> Decl {
    let ty = b.ty(ty);
    let v = b.param("v", ty);
    b.native(name, vec![v], None)
}

#[test]
fn test_best_fit_prefers_most_specific_parameter() {
    // Int f(A a) { return 1; }  Char f(B b) { return 'c'; }
    // main() { A a = A(); B b = B(); ? r1 = f(a); ? r2 = f(b); }
    let mut b = AstBuilder::new();
    let (a_class, b_class) = hierarchy(&mut b);

    let a_ty = b.ty("A");
    let a_param = b.param("a", a_ty);
    let one = b.int(1);
    let ret = b.ret(one);
    let int_ty = b.ty("Int");
    let f_a = b.procedure("f", vec![a_param], Some(int_ty), vec![ret]);
    let f_a_node = f_a.id;

    let b_ty = b.ty("B");
    let b_param = b.param("b", b_ty);
    let c = b.char('c');
    let ret = b.ret(c);
    let char_ty = b.ty("Char");
    let f_b = b.procedure("f", vec![b_param], Some(char_ty), vec![ret]);
    let f_b_node = f_b.id;

    let make_a = b.call("A", vec![]);
    let a_ty = b.ty("A");
    let a = b.local(a_ty, "a", Some(make_a));
    let make_b = b.call("B", vec![]);
    let b_ty = b.ty("B");
    let bee = b.local(b_ty, "b", Some(make_b));
    let a_ref = b.ident("a");
    let call_a = b.call("f", vec![a_ref]);
    let call_a_node = call_a.id;
    let r1_ty = b.infer();
    let r1 = b.local(r1_ty, "r1", Some(call_a));
    let r1_node = r1.id;
    let b_ref = b.ident("b");
    let call_b = b.call("f", vec![b_ref]);
    let call_b_node = call_b.id;
    let r2_ty = b.infer();
    let r2 = b.local(r2_ty, "r2", Some(call_b));
    let r2_node = r2.id;
    let main = b.procedure("main", vec![], None, vec![a, bee, r1, r2]);
    let module = b.module(vec![a_class, b_class, f_a, f_b, main]);

    let typed = check(&module).unwrap();
    assert_eq!(declared_type(&typed, r1_node), "Int");
    assert_eq!(declared_type(&typed, r2_node), "Char");
    assert_eq!(typed.call(call_a_node).unwrap().target, typed.decl_of(f_a_node).unwrap());
    assert_eq!(typed.call(call_b_node).unwrap().target, typed.decl_of(f_b_node).unwrap());
}

#[test]
fn test_equally_generic_overloads_are_ambiguous() {
    // <X> f(X a) {}  <Y> f(Y b) {}  main() { f(5); }
    let mut b = AstBuilder::new();
    let x_ty = b.ty("X");
    let a = b.param("a", x_ty);
    let f_x = b.generic_procedure("f", &["X"], vec![a], None, vec![]);
    let y_ty = b.ty("Y");
    let bp = b.param("b", y_ty);
    let f_y = b.generic_procedure("f", &["Y"], vec![bp], None, vec![]);
    let five = b.int(5);
    let call = b.call("f", vec![five]);
    let stmt = b.expr_stmt(call);
    let main = b.procedure("main", vec![], None, vec![stmt]);
    let module = b.module(vec![f_x, f_y, main]);

    let err = check(&module).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ambiguous);
    assert!(matches!(&err, TypeError::Ambiguous { candidates, .. } if candidates.len() == 2));
}

#[test]
fn test_concrete_overload_beats_generic() {
    // show(Int v) {}  <X> show(X v) {}  main() { show(5); show('c'); }
    let mut b = AstBuilder::new();
    let int_ty = b.ty("Int");
    let v = b.param("v", int_ty);
    let concrete = b.procedure("show", vec![v], None, vec![]);
    let concrete_node = concrete.id;
    let x_ty = b.ty("X");
    let v = b.param("v", x_ty);
    let generic = b.generic_procedure("show", &["X"], vec![v], None, vec![]);
    let generic_node = generic.id;

    let five = b.int(5);
    let show_int = b.call("show", vec![five]);
    let show_int_node = show_int.id;
    let first = b.expr_stmt(show_int);
    let c = b.char('c');
    let show_char = b.call("show", vec![c]);
    let show_char_node = show_char.id;
    let second = b.expr_stmt(show_char);
    let main = b.procedure("main", vec![], None, vec![first, second]);
    let module = b.module(vec![concrete, generic, main]);

    let typed = check(&module).unwrap();
    assert_eq!(typed.call(show_int_node).unwrap().target, typed.decl_of(concrete_node).unwrap());
    assert_eq!(typed.call(show_char_node).unwrap().target, typed.decl_of(generic_node).unwrap());
    assert_eq!(type_args(&typed, show_char_node), vec!["Char"]);
}

/// `<X> ? id(X a) { return a; }`
fn identity(b: &mut AstBuilder) -> Decl {
    let x_ty = b.ty("X");
    let a = b.param("a", x_ty);
    let a_ref = b.ident("a");
    let ret = b.ret(a_ref);
    let ret_ty = b.infer();
    b.generic_procedure("id", &["X"], vec![a], Some(ret_ty), vec![ret])
}

#[test]
fn test_explicit_type_arguments() {
    let mut b = AstBuilder::new();
    let id = identity(&mut b);
    let int_ty = b.ty("Int");
    let five = b.int(5);
    let call = b.generic_call("id", vec![int_ty], vec![five]);
    let call_node = call.id;
    let n_ty = b.infer();
    let n = b.local(n_ty, "n", Some(call));
    let n_node = n.id;
    let c = b.char('c');
    let implicit = b.call("id", vec![c]);
    let implicit_node = implicit.id;
    let m_ty = b.infer();
    let m = b.local(m_ty, "m", Some(implicit));
    let m_node = m.id;
    let main = b.procedure("main", vec![], None, vec![n, m]);
    let module = b.module(vec![id, main]);

    let typed = check(&module).unwrap();
    assert_eq!(declared_type(&typed, n_node), "Int");
    assert_eq!(type_args(&typed, call_node), vec!["Int"]);
    assert_eq!(declared_type(&typed, m_node), "Char");
    assert_eq!(type_args(&typed, implicit_node), vec!["Char"]);
}

#[test]
fn test_explicit_type_argument_must_fit() {
    let mut b = AstBuilder::new();
    let id = identity(&mut b);
    let char_ty = b.ty("Char");
    let five = b.int(5);
    let call = b.generic_call("id", vec![char_ty], vec![five]);
    let stmt = b.expr_stmt(call);
    let main = b.procedure("main", vec![], None, vec![stmt]);
    let module = b.module(vec![id, main]);

    let err = check(&module).unwrap_err();
    assert!(matches!(err, TypeError::NoMatchingCall { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Mismatch);
}

#[test]
fn test_partial_type_arguments_are_rejected() {
    // <X, Y> pair(X a, Y b) {}  main() { pair<Int>(1, 2); }
    let mut b = AstBuilder::new();
    let x_ty = b.ty("X");
    let a = b.param("a", x_ty);
    let y_ty = b.ty("Y");
    let bp = b.param("b", y_ty);
    let pair = b.generic_procedure("pair", &["X", "Y"], vec![a, bp], None, vec![]);
    let int_ty = b.ty("Int");
    let one = b.int(1);
    let two = b.int(2);
    let call = b.generic_call("pair", vec![int_ty], vec![one, two]);
    let stmt = b.expr_stmt(call);
    let main = b.procedure("main", vec![], None, vec![stmt]);
    let module = b.module(vec![pair, main]);

    let err = check(&module).unwrap_err();
    assert!(
        matches!(err, TypeError::GenericArity { expected: 2, found: 1, .. }),
        "{err}"
    );
}

#[test]
fn test_unrecoverable_type_parameter() {
    // <X> make() {}  main() { make(); }
    let mut b = AstBuilder::new();
    let make = b.generic_procedure("make", &["X"], vec![], None, vec![]);
    let call = b.call("make", vec![]);
    let stmt = b.expr_stmt(call);
    let main = b.procedure("main", vec![], None, vec![stmt]);
    let module = b.module(vec![make, main]);

    let err = check(&module).unwrap_err();
    match err {
        TypeError::UnrecoverableTypeParams { name, missing, .. } => {
            assert_eq!(name, "make");
            assert_eq!(missing, vec!["X".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn explicit_arguments_recover_unused_parameter() {
    // <X> make() {}  main() { make<Int>(); }
    let mut b = AstBuilder::new();
    let make = b.generic_procedure("make", &["X"], vec![], None, vec![]);
    let int_ty = b.ty("Int");
    let call = b.generic_call("make", vec![int_ty], vec![]);
    let call_node = call.id;
    let stmt = b.expr_stmt(call);
    let main = b.procedure("main", vec![], None, vec![stmt]);
    let module = b.module(vec![make, main]);

    let typed = check(&module).unwrap();
    assert_eq!(type_args(&typed, call_node), vec!["Int"]);
}

#[test]
fn test_explicit_arguments_on_generic_constructor() {
    // class Foo<X> { +X x; }  main() { ? foo = Foo<Int>(5); }
    let mut b = AstBuilder::new();
    let x_ty = b.ty("X");
    let x = b.field(x_ty, "x");
    let foo_class = b.class("Foo", &["X"], vec![], vec![x]);
    let int_ty = b.ty("Int");
    let five = b.int(5);
    let make = b.generic_call("Foo", vec![int_ty], vec![five]);
    let make_node = make.id;
    let foo_ty = b.infer();
    let foo = b.local(foo_ty, "foo", Some(make));
    let foo_node = foo.id;
    let main = b.procedure("main", vec![], None, vec![foo]);
    let module = b.module(vec![foo_class, main]);

    let typed = check(&module).unwrap();
    assert_eq!(declared_type(&typed, foo_node), "Foo<Int>");
    assert_eq!(type_args(&typed, make_node), vec!["Int"]);
}

#[test]
fn test_duplicate_overload() {
    let mut b = AstBuilder::new();
    let first = native(&mut b, "f", "Int");
    let second = native(&mut b, "f", "Int");
    let module = b.module(vec![first, second]);

    let err = check(&module).unwrap_err();
    assert!(matches!(&err, TypeError::DuplicateOverload { name, .. } if name == "f"));
    assert_eq!(err.kind(), ErrorKind::Redeclaration);
}

#[test]
fn test_override_hides_inherited_method() {
    // class A { Int f(Int n) { return n; } }
    // class B : A { Char f(Int n) { return 'c'; } }
    // main() { B b = B(); ? r = b.f(1); A a = A(); ? s = a.f(1); }
    let mut b = AstBuilder::new();
    let int_ty = b.ty("Int");
    let n = b.param("n", int_ty);
    let n_ref = b.ident("n");
    let ret = b.ret(n_ref);
    let int_ty = b.ty("Int");
    let f_a = b.procedure("f", vec![n], Some(int_ty), vec![ret]);
    let a_class = b.class("A", &[], vec![], vec![f_a]);

    let int_ty = b.ty("Int");
    let n = b.param("n", int_ty);
    let c = b.char('c');
    let ret = b.ret(c);
    let char_ty = b.ty("Char");
    let f_b = b.procedure("f", vec![n], Some(char_ty), vec![ret]);
    let f_b_node = f_b.id;
    let a_ty = b.ty("A");
    let b_class = b.class("B", &[], vec![a_ty], vec![f_b]);

    let make_b = b.call("B", vec![]);
    let b_ty = b.ty("B");
    let bee = b.local(b_ty, "b", Some(make_b));
    let object = b.ident("b");
    let one = b.int(1);
    let call = b.call("f", vec![one]);
    let call_node = call.id;
    let access = b.member(object, call);
    let r_ty = b.infer();
    let r = b.local(r_ty, "r", Some(access));
    let r_node = r.id;

    let make_a = b.call("A", vec![]);
    let a_ty = b.ty("A");
    let a = b.local(a_ty, "a", Some(make_a));
    let object = b.ident("a");
    let one = b.int(1);
    let call = b.call("f", vec![one]);
    let access = b.member(object, call);
    let s_ty = b.infer();
    let s = b.local(s_ty, "s", Some(access));
    let s_node = s.id;
    let main = b.procedure("main", vec![], None, vec![bee, r, a, s]);
    let module = b.module(vec![a_class, b_class, main]);

    let typed = check(&module).unwrap();
    assert_eq!(declared_type(&typed, r_node), "Char");
    assert_eq!(declared_type(&typed, s_node), "Int");
    assert_eq!(typed.call(call_node).unwrap().target, typed.decl_of(f_b_node).unwrap());
}

#[test]
fn test_native_overloads_pick_by_argument() {
    let mut b = AstBuilder::new();
    let print_int = native(&mut b, "print", "Int");
    let print_string = native(&mut b, "print", "String");
    let print_string_node = print_string.id;
    let s = b.string("hello");
    let call = b.call("print", vec![s]);
    let call_node = call.id;
    let stmt = b.expr_stmt(call);
    let main = b.procedure("main", vec![], None, vec![stmt]);
    let module = b.module(vec![print_int, print_string, main]);

    let typed = check(&module).unwrap();
    assert_eq!(typed.call(call_node).unwrap().target, typed.decl_of(print_string_node).unwrap());
    assert_eq!(typed.type_of(call_node).unwrap().to_string(), "void");
}

#[test]
fn test_no_matching_overload() {
    let mut b = AstBuilder::new();
    let print = native(&mut b, "print", "Int");
    let c = b.char('c');
    let call = b.call("print", vec![c]);
    let stmt = b.expr_stmt(call);
    let main = b.procedure("main", vec![], None, vec![stmt]);
    let module = b.module(vec![print, main]);

    let err = check(&module).unwrap_err();
    assert_eq!(err.to_string(), "no overload of `print` accepts (Char)");
}

#[test]
fn procedure_as_value() {
    // Int twice(Int n) { return n; }  ? g = twice;
    let mut b = AstBuilder::new();
    let int_ty = b.ty("Int");
    let n = b.param("n", int_ty);
    let n_ref = b.ident("n");
    let ret = b.ret(n_ref);
    let int_ty = b.ty("Int");
    let twice = b.procedure("twice", vec![n], Some(int_ty), vec![ret]);
    let value = b.ident("twice");
    let g_ty = b.infer();
    let g = b.global(g_ty, "g", Some(value));
    let g_node = g.id;
    let module = b.module(vec![twice, g]);

    let typed = check(&module).unwrap();
    assert_eq!(declared_type(&typed, g_node), "twice(Int) -> Int");
}
