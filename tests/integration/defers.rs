mod common;
use common::*;

use goflat::ast::BranchKind;
use goflat::types::{BasicKind, ObjId, PkgId};

/// A package `q` exporting a blocking `Wait` and a plain `Noop`.
fn with_helpers(go: &mut Go) -> (PkgId, ObjId, ObjId) {
    let q = go.package("example.com/q", "q");
    let c = go.chan_var(q, "c");
    let recv = go.recv_stmt(q, c);
    let wait = go.func(q, "Wait", vec![recv]);
    let noop = go.func(q, "Noop", Vec::new());
    (q, wait, noop)
}

fn flag(go: &mut Go, pkg: PkgId) -> ObjId {
    let bool_ty = go.basic(BasicKind::Bool);
    go.b.package_var(pkg, "done", bool_ty, None)
}

#[test]
fn return_after_blocking_defer_is_flattened() {
    let mut go = Go::new();
    let (_, wait, _) = with_helpers(&mut go);
    let p = go.package("example.com/p", "p");
    let deferred = go.defer_stmt(p, wait);
    let ret = go.b.ret();
    let ret_id = ret.id;
    let f = go.func(p, "f", vec![deferred, ret]);

    let analysis = go.analyze();
    assert!(blocking(&analysis, f));
    assert!(analysis.is_flattened(ret_id));
    assert!(analysis.func_info(&goflat::monomorphize::Instance::new(f)).unwrap().has_defer);
}

#[test]
fn return_after_plain_defer_stays_plain() {
    let mut go = Go::new();
    let (_, _, noop) = with_helpers(&mut go);
    let p = go.package("example.com/p", "p");
    let deferred = go.defer_stmt(p, noop);
    let ret = go.b.ret();
    let ret_id = ret.id;
    let f = go.func(p, "f", vec![deferred, ret]);

    let analysis = go.analyze();
    assert!(!blocking(&analysis, f));
    assert!(!analysis.is_flattened(ret_id));
}

#[test]
fn return_before_blocking_defer_in_same_loop_blocks() {
    let mut go = Go::new();
    let (_, wait, _) = with_helpers(&mut go);
    let p = go.package("example.com/p", "p");
    let done = flag(&mut go, p);

    // for { if done { return }; defer q.Wait() }
    let cond = go.b.use_obj(p, done);
    let ret = go.b.ret();
    let ret_id = ret.id;
    let early = go.b.if_stmt(cond, vec![ret]);
    let deferred = go.defer_stmt(p, wait);
    let body = go.b.for_loop(None, vec![early, deferred]);
    let f = go.func(p, "f", vec![body]);

    let analysis = go.analyze();
    assert!(blocking(&analysis, f));
    assert!(analysis.is_flattened(ret_id));
}

#[test]
fn return_before_defer_outside_loop_stays_plain() {
    let mut go = Go::new();
    let (_, wait, _) = with_helpers(&mut go);
    let p = go.package("example.com/p", "p");
    let done = flag(&mut go, p);

    // if done { return }; defer q.Wait()
    let cond = go.b.use_obj(p, done);
    let ret = go.b.ret();
    let ret_id = ret.id;
    let early = go.b.if_stmt(cond, vec![ret]);
    let deferred = go.defer_stmt(p, wait);
    let f = go.func(p, "f", vec![early, deferred]);

    let analysis = go.analyze();
    assert!(!analysis.is_flattened(ret_id));
    // The defer statement itself only registers the call.
    assert!(!blocking(&analysis, f));
}

#[test]
fn goto_widens_defers_to_every_return() {
    let mut go = Go::new();
    let (_, wait, _) = with_helpers(&mut go);
    let p = go.package("example.com/p", "p");
    let done = flag(&mut go, p);
    let sig = go.void_sig();
    let f = go.env().new_func(p, "f", sig, goflat::span::Span::dummy());
    let again = go.env().new_label(p, "again", Some(f));

    // again: if done { return }; defer q.Wait(); goto again
    let cond = go.b.use_obj(p, done);
    let ret = go.b.ret();
    let ret_id = ret.id;
    let early = go.b.if_stmt(cond, vec![ret]);
    let labeled = go.b.labeled(p, again, early);
    let deferred = go.defer_stmt(p, wait);
    let jump = go.b.branch(p, BranchKind::Goto, Some(again));
    go.b.declare_func(p, f, Some(vec![labeled, deferred, jump]));

    let analysis = go.analyze();
    assert!(blocking(&analysis, f));
    assert!(analysis.is_flattened(ret_id));
    let info = analysis.func_info(&goflat::monomorphize::Instance::new(f)).unwrap();
    assert!(info.is_goto_label(again));
}

#[test]
fn deferred_literal_inherits_blocking_of_its_body() {
    let mut go = Go::new();
    let (_, wait, _) = with_helpers(&mut go);
    let p = go.package("example.com/p", "p");

    // defer func() { q.Wait() }(); return
    let inner = go.call_stmt(p, wait);
    let lit = go.b.func_lit(vec![inner]);
    let call = go.b.call(lit, Vec::new());
    let deferred = go.b.defer(call);
    let ret = go.b.ret();
    let ret_id = ret.id;
    let f = go.func(p, "f", vec![deferred, ret]);

    let analysis = go.analyze();
    assert!(blocking(&analysis, f));
    assert!(analysis.is_flattened(ret_id));
}
