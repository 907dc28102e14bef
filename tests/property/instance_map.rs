// Property-based tests for InstanceMap.
//
// The map is checked against a plain HashMap model for arbitrary
// set/delete sequences, and its cursor is checked while entries are being
// deleted mid-iteration.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use goflat::monomorphize::{Instance, InstanceMap};
use goflat::span::Span;
use goflat::types::{BasicKind, ObjId, Signature, TypeEnv, TypeId};

struct Keys {
    objects: Vec<ObjId>,
    types: Vec<TypeId>,
}

fn keys() -> Keys {
    let mut env = TypeEnv::new();
    let pkg = env.add_package("example.com/p", "p");
    let sig = env.signature(Signature::default());
    let objects = ["A", "B", "C"].iter().map(|name| env.new_func(pkg, name, sig, Span::dummy())).collect();
    let types = [BasicKind::Int, BasicKind::String, BasicKind::Bool].iter().map(|k| env.basic(*k)).collect();
    Keys { objects, types }
}

/// (object index, type argument indices)
type KeySpec = (usize, Vec<usize>);

fn key_spec() -> impl Strategy<Value = KeySpec> {
    (0..3usize, prop::collection::vec(0..3usize, 0..3))
}

impl Keys {
    fn instance(&self, (obj, args): &KeySpec) -> Instance {
        Instance::with_args(self.objects[*obj], args.iter().map(|&a| self.types[a]).collect())
    }
}

#[derive(Debug, Clone)]
enum Op {
    Set(KeySpec, u32),
    Delete(KeySpec),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (key_spec(), any::<u32>()).prop_map(|(k, v)| Op::Set(k, v)),
        key_spec().prop_map(Op::Delete),
    ]
}

// =============================================================================
// Model equivalence
// =============================================================================

#[test]
fn prop_map_matches_model() {
    let keys = keys();
    proptest!(|(ops in prop::collection::vec(op(), 0..60))| {
        let mut map = InstanceMap::new();
        let mut model: HashMap<KeySpec, u32> = HashMap::new();
        for op in &ops {
            match op {
                Op::Set(k, v) => {
                    prop_assert_eq!(map.set(keys.instance(k), *v), model.insert(k.clone(), *v));
                }
                Op::Delete(k) => {
                    prop_assert_eq!(map.delete(&keys.instance(k)), model.remove(k));
                }
            }
            prop_assert_eq!(map.len(), model.len());
            prop_assert_eq!(map.is_empty(), model.is_empty());
        }
        for (k, v) in &model {
            prop_assert_eq!(map.get(&keys.instance(k)), Some(v));
        }
        prop_assert_eq!(map.iter().count(), model.len());
    });
}

// =============================================================================
// Iteration under deletion
// =============================================================================

#[test]
fn prop_cursor_survives_deletion() {
    let keys = keys();
    proptest!(|(
        specs in prop::collection::vec(key_spec(), 1..30),
        doomed in prop::collection::vec(prop::collection::vec(key_spec(), 0..3), 0..30),
    )| {
        let mut map = InstanceMap::new();
        for (i, k) in specs.iter().enumerate() {
            map.set(keys.instance(k), i);
        }
        let live: HashSet<Instance> = specs.iter().map(|k| keys.instance(k)).collect();

        let mut deleted = HashSet::new();
        let mut visited = HashSet::new();
        let mut cursor = map.cursor();
        let mut step = 0;
        while let Some(key) = cursor.next(&map) {
            prop_assert!(!deleted.contains(&key), "visited a deleted key");
            prop_assert!(visited.insert(key), "visited a key twice");
            if let Some(batch) = doomed.get(step) {
                for k in batch {
                    let inst = keys.instance(k);
                    map.delete(&inst);
                    deleted.insert(inst);
                }
            }
            step += 1;
        }

        for key in &live {
            if !deleted.contains(key) {
                prop_assert!(visited.contains(key), "skipped a live key");
            }
        }
        prop_assert_eq!(map.len(), live.len() - live.intersection(&deleted).count());
    });
}
