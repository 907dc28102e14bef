// Property-based tests for type substitution.
//
// Types are generated from a small recursive shape grammar over two basic
// types, one type parameter and one generic named type.

use proptest::prelude::*;

use goflat::monomorphize::{Resolver, Subster};
use goflat::span::Span;
use goflat::types::{BasicKind, ChanDir, Field, Signature, TypeEnv, TypeId};

#[derive(Debug, Clone)]
enum Shape {
    Int,
    Str,
    Param,
    Pointer(Box<Shape>),
    Slice(Box<Shape>),
    Chan(Box<Shape>),
    Map(Box<Shape>, Box<Shape>),
    Func(Vec<Shape>, Vec<Shape>),
    Boxed(Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![Just(Shape::Int), Just(Shape::Str), Just(Shape::Param)];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Shape::Pointer(Box::new(s))),
            inner.clone().prop_map(|s| Shape::Slice(Box::new(s))),
            inner.clone().prop_map(|s| Shape::Chan(Box::new(s))),
            (inner.clone(), inner.clone()).prop_map(|(k, v)| Shape::Map(Box::new(k), Box::new(v))),
            (prop::collection::vec(inner.clone(), 0..3), prop::collection::vec(inner.clone(), 0..2))
                .prop_map(|(p, r)| Shape::Func(p, r)),
            inner.prop_map(|s| Shape::Boxed(Box::new(s))),
        ]
    })
}

struct World {
    env: TypeEnv,
    /// `T`, the parameter shapes refer to.
    param: TypeId,
    /// `U`, never referred to.
    other: TypeId,
    /// `type Box[X any] struct{ v X }`
    generic: TypeId,
}

fn world() -> World {
    let mut env = TypeEnv::new();
    let pkg = env.add_package("example.com/p", "p");
    let param = env.new_type_param(Some(pkg), "T", 0, None);
    let other = env.new_type_param(Some(pkg), "U", 1, None);
    let x = env.new_type_param(Some(pkg), "X", 0, None);
    let obj = env.new_type_name(Some(pkg), "Box", Span::dummy(), None);
    let under = env.struct_type(vec![Field::new("v", x)]);
    let generic = env.new_named(obj, Some(under), vec![x]);
    World { env, param, other, generic }
}

impl World {
    fn build(&mut self, shape: &Shape) -> TypeId {
        match shape {
            Shape::Int => self.env.basic(BasicKind::Int),
            Shape::Str => self.env.basic(BasicKind::String),
            Shape::Param => self.param,
            Shape::Pointer(s) => {
                let elem = self.build(s);
                self.env.pointer(elem)
            }
            Shape::Slice(s) => {
                let elem = self.build(s);
                self.env.slice(elem)
            }
            Shape::Chan(s) => {
                let elem = self.build(s);
                self.env.chan(ChanDir::Both, elem)
            }
            Shape::Map(k, v) => {
                let key = self.build(k);
                let value = self.build(v);
                self.env.map(key, value)
            }
            Shape::Func(params, results) => {
                let params = params.iter().map(|s| self.build(s)).collect();
                let results = results.iter().map(|s| self.build(s)).collect();
                self.env.signature(Signature::func(params, results))
            }
            Shape::Boxed(s) => {
                let arg = self.build(s);
                self.env.instantiate(self.generic, &[arg])
            }
        }
    }
}

#[test]
fn prop_empty_substitution_is_identity() {
    proptest!(|(s in shape())| {
        let mut w = world();
        let ty = w.build(&s);
        prop_assert_eq!(Subster::new(&[], &[], None).subst(&mut w.env, ty), ty);
        prop_assert_eq!(Resolver::identity().substitute(&mut w.env, ty), ty);
    });
}

#[test]
fn prop_unrelated_binding_is_identity() {
    proptest!(|(s in shape())| {
        let mut w = world();
        let ty = w.build(&s);
        let int = w.env.basic(BasicKind::Int);
        let mut subster = Subster::new(&[w.other], &[int], None);
        prop_assert_eq!(subster.subst(&mut w.env, ty), ty);
    });
}

#[test]
fn prop_substitution_removes_the_parameter() {
    proptest!(|(s in shape())| {
        let mut w = world();
        let ty = w.build(&s);
        let int = w.env.basic(BasicKind::Int);
        let string = w.env.basic(BasicKind::String);
        let once = Subster::new(&[w.param], &[int], None).subst(&mut w.env, ty);
        // Nothing is left to replace.
        let twice = Subster::new(&[w.param], &[string], None).subst(&mut w.env, once);
        prop_assert_eq!(once, twice);
        prop_assert!(!w.env.type_string(once).contains('T'));
    });
}
