mod common;
use common::*;

use goflat::ast::Expr;
use goflat::config::{AnalysisConfig, GraphFormat};
use goflat::diagnostics::AnalysisError;
use goflat::monomorphize::Instance;
use goflat::span::Span;
use goflat::types::{BasicKind, Field};
use goflat::TypeDecl;

#[test]
fn types_are_grouped_after_their_dependencies() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");
    let (base, base_ty) = go.struct_type(q, "Base", Vec::new());
    let slice = go.env().slice(base_ty);
    let (wrap, _) = go.named(p, "Wrap", Vec::new(), slice);
    let int = go.basic(BasicKind::Int);
    let (plain, _) = go.named(p, "Plain", Vec::new(), int);

    let analysis = go.analyze();
    assert_eq!(analysis.group_count(), 2);
    assert_eq!(analysis.group(&Instance::new(base)), Some(0));
    assert_eq!(analysis.group(&Instance::new(wrap)), Some(1));
    assert_eq!(analysis.group(&Instance::new(plain)), Some(0));
}

#[test]
fn struct_fields_do_not_order_types() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");
    let (_, base_ty) = go.struct_type(q, "Base", Vec::new());
    let (holder, _) = go.struct_type(p, "Holder", vec![Field::new("b", base_ty)]);

    let analysis = go.analyze();
    assert_eq!(analysis.group_count(), 1);
    assert_eq!(analysis.group(&Instance::new(holder)), Some(0));
}

#[test]
fn generic_instances_are_grouped_individually() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let r = go.package("example.com/r", "r");
    let p = go.package("example.com/p", "p");

    // package r: type Item struct{}
    let (_, item_ty) = go.struct_type(r, "Item", Vec::new());
    // package q: type Box[T any] []T
    let t = go.env().new_type_param(Some(q), "T", 0, None);
    let under = go.env().slice(t);
    let (box_obj, _) = go.named(q, "Box", vec![t], under);
    // package p: type List []q.Box[r.Item]
    let elem = go.b.use_inst(p, box_obj, &[item_ty]);
    let box_item = go.b.info(p).type_of(elem.id).unwrap();
    let list_under = go.env().slice(box_item);
    let list_expr = go.b.type_expr(p, Expr::ArrayType { len: None, elem: Box::new(elem) }, list_under);
    let list_obj = go.env().new_type_name(Some(p), "List", Span::dummy(), None);
    go.env().new_named(list_obj, Some(list_under), Vec::new());
    go.b.type_decl(p, list_obj, list_expr);

    let analysis = go.analyze();
    let env = analysis.env();
    assert_eq!(analysis.group(&Instance::with_args(box_obj, vec![item_ty])), Some(1));
    assert_eq!(analysis.group(&Instance::new(list_obj)), Some(2));
    assert_eq!(analysis.group_count(), 3);
    let labels: Vec<String> = analysis.type_decls().iter().map(|d| d.inst.type_string(env)).collect();
    assert_eq!(labels, vec!["q.Box[r.Item]", "r.Item", "p.List"]);
}

#[test]
fn local_type_arguments_of_foreign_generics_are_grouped() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");

    // package q: type Box[T any] []T
    let t = go.env().new_type_param(Some(q), "T", 0, None);
    let under = go.env().slice(t);
    let (box_obj, _) = go.named(q, "Box", vec![t], under);

    // package p: func main() { type L struct{}; _ = q.Box[L]{} }
    let sig = go.void_sig();
    let main = go.env().new_func(p, "main", sig, Span::dummy());
    let (l, l_ty, decl) = go.local_struct(p, main, "L", Vec::new());
    let assign = go.discard_lit(p, box_obj, &[l_ty]);
    go.b.declare_func(p, main, Some(vec![decl, assign]));

    let analysis = go.analyze();
    assert_eq!(analysis.group(&Instance::new(l)), Some(0));
    assert_eq!(analysis.group(&Instance::with_args(box_obj, vec![l_ty])), Some(1));
    assert_eq!(analysis.group_count(), 2);
}

#[test]
fn local_types_of_generic_functions_are_grouped_per_instance() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");

    // package q: type Box[T any] []T
    let t = go.env().new_type_param(Some(q), "T", 0, None);
    let under = go.env().slice(t);
    let (box_obj, _) = go.named(q, "Box", vec![t], under);

    // package p: func F[U any]() { type L struct{ v U }; _ = q.Box[L]{} }
    let (sig, u) = go.generic_sig(p, "U");
    let f = go.env().new_func(p, "F", sig, Span::dummy());
    let (l, _, decl) = go.local_struct(p, f, "L", vec![Field::new("v", u)]);
    let l_ty = go.env().object(l).ty;
    let assign = go.discard_lit(p, box_obj, &[l_ty]);
    go.b.declare_func(p, f, Some(vec![decl, assign]));

    // func main() { F[int]() }
    let int = go.basic(BasicKind::Int);
    let call = go.call_inst_stmt(p, f, &[int]);
    go.func(p, "main", vec![call]);

    let analysis = go.analyze();
    let env = analysis.env();
    let l_int = Instance::nested(l, vec![int], Vec::new());
    assert_eq!(analysis.group(&l_int), Some(0));
    assert_eq!(analysis.group_count(), 2);
    let boxes: Vec<&TypeDecl> = analysis.type_decls().iter().filter(|d| d.inst.object == box_obj).collect();
    assert_eq!(boxes.len(), 1);
    assert_eq!(analysis.group(&boxes[0].inst), Some(1));
    // Instantiated with the copy of L made for F[int].
    assert_eq!(env.type_string(env.underlying(boxes[0].inst.type_args[0])), "struct{v int}");
}

#[test]
fn cross_package_cycle_is_reported() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");

    let ping_obj = go.env().new_type_name(Some(p), "Ping", Span::dummy(), None);
    let ping = go.env().new_named(ping_obj, None, Vec::new());
    let pong_obj = go.env().new_type_name(Some(q), "Pong", Span::dummy(), None);
    let pong = go.env().new_named(pong_obj, None, Vec::new());
    let to_pong = go.env().pointer(pong);
    let to_ping = go.env().pointer(ping);
    go.env().set_underlying(ping, to_pong);
    go.env().set_underlying(pong, to_ping);
    for (pkg, obj, under) in [(p, ping_obj, to_pong), (q, pong_obj, to_ping)] {
        let name = go.env().object(obj).name.clone();
        let ty = go.b.type_expr(pkg, Expr::Ident(name), under);
        go.b.type_decl(pkg, obj, ty);
    }

    match go.analyze_with(&AnalysisConfig::default()) {
        Err(AnalysisError::Cycle { mut members, spans }) => {
            members.sort();
            assert_eq!(members, vec!["p.Ping", "q.Pong"]);
            assert_eq!(spans.len(), 2);
        }
        Err(other) => panic!("expected a cycle, got {other}"),
        Ok(_) => panic!("expected a cycle"),
    }
}

#[test]
fn skipped_packages_do_not_take_part() {
    let mut go = Go::new();
    let js = go.package("example.com/js", "js");
    let p = go.package("example.com/p", "p");
    let (_, object) = go.struct_type(js, "Object", Vec::new());
    let ptr = go.env().pointer(object);
    let (wrapper, _) = go.named(p, "Wrapper", Vec::new(), ptr);

    let config = AnalysisConfig { skip_packages: vec!["example.com/js".to_string()], ..AnalysisConfig::default() };
    let analysis = go.analyze_with(&config).unwrap();
    assert_eq!(analysis.group(&Instance::new(wrapper)), Some(0));
    assert_eq!(analysis.group_count(), 1);
}

#[test]
fn dependency_graph_renders_groups() {
    let mut go = Go::new();
    let q = go.package("example.com/q", "q");
    let p = go.package("example.com/p", "p");
    let (_, base_ty) = go.struct_type(q, "Base", Vec::new());
    let slice = go.env().slice(base_ty);
    go.named(p, "Wrap", Vec::new(), slice);

    let config = AnalysisConfig { graph_format: GraphFormat::Mermaid, ..AnalysisConfig::default() };
    let analysis = go.analyze_with(&config).unwrap();
    insta::assert_snapshot!(analysis.graph(), @r#"
    flowchart TB
      v0["p.Wrap [1]"] --> v1
      v1["q.Base [0]"]
      subgraph Depth 1
        v0
      end
      subgraph Depth 0
        v1
      end
    "#);
}
