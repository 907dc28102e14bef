mod common;
use common::*;

use goflat::monomorphize::Instance;
use goflat::types::{BasicKind, Field, Signature};

#[test]
fn each_instantiation_is_a_distinct_instance() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let x = go.env().new_type_param(Some(p), "X", 0, None);
    let under = go.env().struct_type(vec![Field::new("v", x)]);
    let (t, t_ty) = go.named(p, "T", vec![x], under);
    let int = go.basic(BasicKind::Int);
    let string = go.basic(BasicKind::String);
    go.use_type(p, "a", t, &[int]);
    go.use_type(p, "b", t, &[string]);
    go.use_type(p, "c", t, &[int]);
    let t_int = go.env().instantiate(t_ty, &[int]);
    let t_string = go.env().instantiate(t_ty, &[string]);

    let analysis = go.analyze();
    let set = analysis.instances().get("example.com/p").unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&Instance::with_args(t, vec![int])));
    assert!(set.contains(&Instance::with_args(t, vec![string])));

    let env = analysis.env();
    assert_eq!(env.type_string(env.underlying(t_int)), "struct{v int}");
    assert_eq!(env.type_string(env.underlying(t_string)), "struct{v string}");
    assert_eq!(analysis.instances().render(env), "example.com/p:\n\tp.T<int>\n\tp.T<string>\n");
}

#[test]
fn instance_ids_follow_discovery_order() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let x = go.env().new_type_param(Some(p), "X", 0, None);
    let under = go.env().slice(x);
    let (t, _) = go.named(p, "List", vec![x], under);
    let int = go.basic(BasicKind::Int);
    let boolean = go.basic(BasicKind::Bool);
    go.use_type(p, "a", t, &[boolean]);
    go.use_type(p, "b", t, &[int]);

    let analysis = go.analyze();
    assert_eq!(analysis.instance_id(&Instance::with_args(t, vec![boolean])), 0);
    assert_eq!(analysis.instance_id(&Instance::with_args(t, vec![int])), 1);
}

#[test]
fn generic_function_blocks_per_instance() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");
    let c = go.chan_var(q, "c");
    let recv = go.recv_stmt(q, c);
    let (sig, _) = go.generic_sig(q, "T");
    let wait = go.b.func(q, "Wait", sig, Some(vec![recv]));

    let int = go.basic(BasicKind::Int);
    let string = go.basic(BasicKind::String);
    let call = go.call_inst_stmt(p, wait, &[int]);
    let main = go.func(p, "main", vec![call]);

    let analysis = go.analyze();
    assert!(analysis.is_blocking(&Instance::with_args(wait, vec![int])));
    assert!(blocking(&analysis, main));
    // Never instantiated with string, so never analyzed.
    assert!(analysis.func_info(&Instance::with_args(wait, vec![string])).is_none());
}

#[test]
fn nested_generic_calls_are_discovered_and_propagated() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let c = go.chan_var(p, "c");

    // func Inner[U any]() { <-c }
    let recv = go.recv_stmt(p, c);
    let (inner_sig, _) = go.generic_sig(p, "U");
    let inner = go.b.func(p, "Inner", inner_sig, Some(vec![recv]));

    // func Outer[T any]() { Inner[T]() }
    let (outer_sig, t) = go.generic_sig(p, "T");
    let call_inner = go.call_inst_stmt(p, inner, &[t]);
    let outer = go.b.func(p, "Outer", outer_sig, Some(vec![call_inner]));

    // func main() { Outer[string]() }
    let string = go.basic(BasicKind::String);
    let call_outer = go.call_inst_stmt(p, outer, &[string]);
    let main = go.func(p, "main", vec![call_outer]);

    let analysis = go.analyze();
    let set = analysis.instances().get("example.com/p").unwrap();
    assert!(set.contains(&Instance::with_args(inner, vec![string])));
    assert!(analysis.is_blocking(&Instance::with_args(inner, vec![string])));
    assert!(analysis.is_blocking(&Instance::with_args(outer, vec![string])));
    assert!(blocking(&analysis, main));
}

#[test]
fn methods_of_generic_types_are_instantiated_with_the_type() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");

    // type Box[T any] struct{ v T }
    let t = go.env().new_type_param(Some(q), "T", 0, None);
    let under = go.env().struct_type(vec![Field::new("v", t)]);
    let (box_obj, box_ty) = go.named(q, "Box", vec![t], under);

    // func (b *Box[T]) Get() { <-c }
    let recv_t = go.env().new_type_param(Some(q), "T", 0, None);
    let box_recv = go.env().instantiate(box_ty, &[recv_t]);
    let ptr = go.env().pointer(box_recv);
    let sig = go.env().signature(Signature { recv: Some(ptr), recv_type_params: vec![recv_t], ..Signature::default() });
    let c = go.chan_var(q, "c");
    let recv = go.recv_stmt(q, c);
    let get = go.b.method(q, box_ty, "Get", sig, Some(vec![recv]));

    // var b = Box[int]{}; func main() { (&b).Get() }
    let int = go.basic(BasicKind::Int);
    let b = go.use_type(p, "b", box_obj, &[int]);
    let box_int = go.env().instantiate(box_ty, &[int]);
    let box_int_ptr = go.env().pointer(box_int);
    let x = go.b.use_obj(p, b);
    let addr = go.b.addr(x);
    let sel = go.b.method_value(p, addr, get, box_int_ptr);
    let call = go.b.call(sel, Vec::new());
    let stmt = go.b.expr_stmt(call);
    let main = go.func(p, "main", vec![stmt]);

    let analysis = go.analyze();
    let get_int = Instance::with_args(get, vec![int]);
    assert!(analysis.instances().get("example.com/q").unwrap().contains(&get_int));
    assert!(analysis.is_blocking(&get_int));
    assert!(blocking(&analysis, main));
    assert!(analysis.package_info("example.com/p").unwrap().has_pointer(b));
}
