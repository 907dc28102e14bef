mod common;
use common::*;

use goflat::ast::{Expr, LitKind, Stmt};
use goflat::config::AnalysisConfig;
use goflat::monomorphize::Instance;
use goflat::span::Spanned;
use goflat::types::{BasicKind, Field, IfaceMethod, ObjId, PkgId, Signature, TypeId};

// ── Direct operations ─────────────────────────────────────────────────

#[test]
fn direct_receive_blocks() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let c = go.chan_var(p, "c");
    let recv = go.recv_stmt(p, c);
    let recv_id = recv.id;
    let f = go.func(p, "f", vec![recv]);
    let idle = go.func(p, "idle", Vec::new());

    let analysis = go.analyze();
    assert!(blocking(&analysis, f));
    assert!(!blocking(&analysis, idle));
    assert!(analysis.is_flattened(recv_id));
}

#[test]
fn select_with_default_never_blocks() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let c = go.chan_var(p, "c");
    let first = go.recv_stmt(p, c);
    let second = go.recv_stmt(p, c);
    let with_default = go.b.select(vec![(Some(first), Vec::new()), (None, Vec::new())]);
    let f = go.func(p, "f", vec![with_default]);
    let without_default = go.b.select(vec![(Some(second), Vec::new())]);
    let g = go.func(p, "g", vec![without_default]);

    let analysis = go.analyze();
    assert!(!blocking(&analysis, f));
    assert!(blocking(&analysis, g));
}

#[test]
fn send_inside_goroutine_literal_does_not_block_spawner() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let c = go.chan_var(p, "c");
    let chan = go.b.use_obj(p, c);
    let int = go.basic(BasicKind::Int);
    let one = go.b.typed(p, Expr::BasicLit { kind: LitKind::Int, value: "1".to_string() }, int);
    let send = go.b.send(chan, one);
    let lit = go.b.func_lit(vec![send]);
    let call = go.b.call(lit, Vec::new());
    let spawn = go.b.go(call);
    let spawner = go.func(p, "spawner", vec![spawn]);

    let analysis = go.analyze();
    assert!(!blocking(&analysis, spawner));
}

// ── Propagation ───────────────────────────────────────────────────────

#[test]
fn blocking_propagates_across_packages() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");

    let c = go.chan_var(q, "c");
    let recv = go.recv_stmt(q, c);
    let wait = go.func(q, "Wait", vec![recv]);

    let call_wait = go.call_stmt(p, wait);
    let call_id = call_wait.id;
    let middle = go.func(p, "middle", vec![call_wait]);
    let call_middle = go.call_stmt(p, middle);
    let top = go.func(p, "top", vec![call_middle]);

    let analysis = go.analyze();
    assert!(blocking(&analysis, wait));
    assert!(blocking(&analysis, middle));
    assert!(blocking(&analysis, top));
    assert!(analysis.is_flattened(call_id));
}

#[test]
fn calls_to_non_blocking_package_stay_plain() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");
    let helper = go.func(q, "Helper", Vec::new());
    let call = go.call_stmt(p, helper);
    let call_id = call.id;
    let user = go.func(p, "user", vec![call]);

    let analysis = go.analyze();
    assert!(!blocking(&analysis, helper));
    assert!(!blocking(&analysis, user));
    assert!(!analysis.is_flattened(call_id));
}

#[test]
fn mutual_recursion_across_packages_reaches_fixed_point() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");
    let sig = go.void_sig();

    let ping = go.env().new_func(p, "ping", sig, goflat::span::Span::dummy());
    let pong = go.env().new_func(q, "Pong", sig, goflat::span::Span::dummy());
    let c = go.chan_var(q, "c");

    let call_pong = go.call_stmt(p, pong);
    go.b.declare_func(p, ping, Some(vec![call_pong]));
    let call_ping = go.call_stmt(q, ping);
    let recv = go.recv_stmt(q, c);
    go.b.declare_func(q, pong, Some(vec![call_ping, recv]));

    let analysis = go.analyze();
    assert!(blocking(&analysis, ping));
    assert!(blocking(&analysis, pong));
}

#[test]
fn interface_calls_block_unless_receiver_is_configured() {
    let build = || {
        let mut go = Go::new();
        let js = go.package("example.com/js", "js");
        let p = go.package("example.com/p", "p");
        let void = go.void_sig();
        let iface = go.env().interface(vec![IfaceMethod { name: "Call".to_string(), sig: void }], Vec::new());
        let (_, object) = go.named(js, "Object", Vec::new(), iface);
        let method_sig = go.env().signature(Signature { recv: Some(object), ..Signature::default() });
        let method = go.env().new_func(js, "Call", method_sig, goflat::span::Span::dummy());

        let o = go.env().new_var(Some(p), "o", object, None);
        let x = go.b.use_obj(p, o);
        let sel = go.b.method_value(p, x, method, object);
        let call = go.b.call(sel, Vec::new());
        let stmt = go.b.expr_stmt(call);
        let f = go.func(p, "f", vec![stmt]);
        (go, f)
    };

    let (go, f) = build();
    let analysis = go.analyze();
    assert!(blocking(&analysis, f));

    let (go, f) = build();
    let config = AnalysisConfig {
        nonblocking_receivers: vec!["js.Object".to_string()],
        ..AnalysisConfig::default()
    };
    let analysis = go.analyze_with(&config).unwrap();
    assert!(!blocking(&analysis, f));
}

#[test]
fn method_on_concrete_type_from_other_package() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");
    let int = go.basic(BasicKind::Int);
    let (_, mutex) = go.struct_type(q, "Mutex", vec![Field::new("state", int)]);
    let ptr = go.env().pointer(mutex);
    let sig = go.env().signature(Signature { recv: Some(ptr), ..Signature::default() });
    let c = go.chan_var(q, "sema");
    let recv = go.recv_stmt(q, c);
    let lock = go.b.method(q, mutex, "Lock", sig, Some(vec![recv]));

    let m = go.env().new_var(Some(p), "mu", ptr, None);
    let x = go.b.use_obj(p, m);
    let sel = go.b.method_value(p, x, lock, ptr);
    let call = go.b.call(sel, Vec::new());
    let stmt = go.b.expr_stmt(call);
    let f = go.func(p, "f", vec![stmt]);

    let analysis = go.analyze();
    assert!(blocking(&analysis, lock));
    assert!(blocking(&analysis, f));
}

// ── Call forms ────────────────────────────────────────────────────────

#[test]
fn call_through_indexed_function_value_blocks() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let sig = go.void_sig();
    let funcs = go.env().slice(sig);
    let fns = go.b.package_var(p, "fns", funcs, None);

    // fns[0]()
    let x = go.b.use_obj(p, fns);
    let int = go.basic(BasicKind::Int);
    let zero = go.b.typed(p, Expr::BasicLit { kind: LitKind::Int, value: "0".to_string() }, int);
    let fun = go.b.typed(p, Expr::Index { x: Box::new(x), indices: vec![zero] }, sig);
    let call = go.b.call(fun, Vec::new());
    let stmt = go.b.expr_stmt(call);
    let f = go.func(p, "f", vec![stmt]);

    let analysis = go.analyze();
    assert!(blocking(&analysis, f));
}

/// `name[arg]()` with the instantiation written out as an index expression.
fn explicit_inst_call(go: &mut Go, pkg: PkgId, func: ObjId, arg: TypeId) -> Spanned<Stmt> {
    let x = go.b.use_inst(pkg, func, &[arg]);
    let sig = go.b.info(pkg).type_of(x.id).unwrap();
    let name = go.env().type_string(arg);
    let index = go.b.type_expr(pkg, Expr::Ident(name), arg);
    let fun = go.b.typed(pkg, Expr::Index { x: Box::new(x), indices: vec![index] }, sig);
    let call = go.b.call(fun, Vec::new());
    go.b.expr_stmt(call)
}

#[test]
fn explicit_instantiation_calls_follow_the_instance() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let int = go.basic(BasicKind::Int);

    // func Idle[T any]() {}
    let (idle_sig, _) = go.generic_sig(p, "T");
    let idle = go.b.func(p, "Idle", idle_sig, Some(Vec::new()));
    // func Wait[T any]() { <-c }
    let c = go.chan_var(p, "c");
    let recv = go.recv_stmt(p, c);
    let (wait_sig, _) = go.generic_sig(p, "T");
    let wait = go.b.func(p, "Wait", wait_sig, Some(vec![recv]));

    let call_idle = explicit_inst_call(&mut go, p, idle, int);
    let plain = go.func(p, "plain", vec![call_idle]);
    let call_wait = explicit_inst_call(&mut go, p, wait, int);
    let waits = go.func(p, "waits", vec![call_wait]);

    let analysis = go.analyze();
    assert!(!analysis.is_blocking(&Instance::with_args(idle, vec![int])));
    assert!(analysis.is_blocking(&Instance::with_args(wait, vec![int])));
    assert!(!blocking(&analysis, plain));
    assert!(blocking(&analysis, waits));
}

#[test]
fn bodiless_functions_follow_configuration() {
    let build = || {
        let mut go = Go::new();
        let p = go.package("example.com/p", "p");
        let sig = go.void_sig();
        let external = go.b.func(p, "external", sig, None);
        let call = go.call_stmt(p, external);
        let caller = go.func(p, "caller", vec![call]);
        (go, caller)
    };

    let (go, caller) = build();
    assert!(blocking(&go.analyze(), caller));

    let (go, caller) = build();
    let config = AnalysisConfig { bodiless_funcs_block: false, ..AnalysisConfig::default() };
    assert!(!blocking(&go.analyze_with(&config).unwrap(), caller));
}

#[test]
#[should_panic(expected = "info did not have function declaration instance")]
fn querying_undeclared_function_panics() {
    let mut go = Go::new();
    let p = go.package("example.com/p", "p");
    let sig = go.void_sig();
    let ghost = go.env().new_func(p, "ghost", sig, goflat::span::Span::dummy());
    let analysis = go.analyze();
    blocking(&analysis, ghost);
}
