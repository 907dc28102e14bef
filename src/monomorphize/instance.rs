use std::collections::{BTreeMap, HashMap};

use crate::types::{ObjId, TypeEnv, TypeId};

use super::map::InstanceMap;

/// A generic (or trivial) object together with the type arguments it is
/// used with.
///
/// Type handles are canonical, so structural identity of argument lists is
/// plain equality and `Instance` can be hashed directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    pub object: ObjId,
    pub type_args: Vec<TypeId>,
    /// Type arguments of the generic function `object` is declared in.
    /// For `func A[X any]() { type B[Y any] struct{} }`, `B[X; Y]`.
    pub nest_args: Vec<TypeId>,
}

impl Instance {
    /// The trivial instance of a non-generic object.
    pub fn new(object: ObjId) -> Self {
        Self { object, type_args: Vec::new(), nest_args: Vec::new() }
    }

    pub fn with_args(object: ObjId, type_args: Vec<TypeId>) -> Self {
        Self { object, type_args, nest_args: Vec::new() }
    }

    pub fn nested(object: ObjId, nest_args: Vec<TypeId>, type_args: Vec<TypeId>) -> Self {
        Self { object, type_args, nest_args }
    }

    /// Not generic and not nested in a generic function.
    pub fn is_trivial(&self) -> bool {
        self.type_args.is_empty() && self.nest_args.is_empty()
    }

    /// The receiver type instance of a method instance.
    pub fn recv(&self, env: &TypeEnv) -> Option<Instance> {
        let sig = env.object(self.object).ty;
        let recv = env.recv_named(sig)?;
        let obj = env.named(recv)?.obj;
        Some(Instance::with_args(obj, self.type_args.clone()))
    }

    /// `pkg.Name<nest; args>` with receivers shown for methods.
    pub fn display(&self, env: &TypeEnv) -> String {
        format!("{}{}", env.symbol_name(self.object), self.type_params_string(env, "<", ">"))
    }

    /// Source-like type string, `pkg.Name[nest; args]`.
    pub fn type_string(&self, env: &TypeEnv) -> String {
        format!("{}{}", env.qualified_name(self.object), self.type_params_string(env, "[", "]"))
    }

    pub fn type_params_string(&self, env: &TypeEnv, open: &str, close: &str) -> String {
        if self.is_trivial() {
            return String::new();
        }
        let mut buf = String::from(open);
        if !self.nest_args.is_empty() {
            buf.push_str(&env.type_list_string(&self.nest_args));
            buf.push(';');
            if !self.type_args.is_empty() {
                buf.push(' ');
            }
        }
        buf.push_str(&env.type_list_string(&self.type_args));
        buf.push_str(close);
        buf
    }
}

/// Deduplicating work queue of instances belonging to one package.
///
/// An instance may be added any number of times but is handed out for
/// processing exactly once.
#[derive(Debug, Clone, Default)]
pub struct InstanceSet {
    values: Vec<Instance>,
    /// Index into `values` of the next unprocessed instance.
    unprocessed: usize,
    /// Instance to numeric id.
    seen: InstanceMap<usize>,
}

impl InstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance unless it was added before, processed or not.
    pub fn add(&mut self, inst: Instance) -> &mut Self {
        if !self.seen.has(&inst) {
            self.seen.set(inst.clone(), self.seen.len());
            self.values.push(inst);
        }
        self
    }

    pub fn contains(&self, inst: &Instance) -> bool {
        self.seen.has(inst)
    }

    /// Numeric id of an added instance, stable as long as instances are
    /// added in the same order.
    ///
    /// Panics if the instance was never added.
    pub fn id(&self, inst: &Instance) -> usize {
        match self.seen.get(inst) {
            Some(id) => *id,
            None => panic!("requesting id of instance {inst:?} that hasn't been added to the set"),
        }
    }

    /// The next instance to process, if any.
    pub fn next(&mut self) -> Option<Instance> {
        let next = self.values.get(self.unprocessed)?.clone();
        self.unprocessed += 1;
        Some(next)
    }

    pub fn exhausted(&self) -> bool {
        self.unprocessed >= self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All instances in insertion order.
    pub fn values(&self) -> &[Instance] {
        &self.values
    }

    pub fn by_obj(&self) -> HashMap<ObjId, Vec<Instance>> {
        let mut result: HashMap<ObjId, Vec<Instance>> = HashMap::new();
        for inst in &self.values {
            result.entry(inst.object).or_default().push(inst.clone());
        }
        result
    }

    pub fn for_obj(&self, obj: ObjId) -> Vec<Instance> {
        self.values.iter().filter(|i| i.object == obj).cloned().collect()
    }

    pub fn obj_has_instances(&self, obj: ObjId) -> bool {
        self.values.iter().any(|i| i.object == obj)
    }
}

/// One [`InstanceSet`] per package, keyed by import path.
#[derive(Debug, Clone, Default)]
pub struct PackageInstanceSets {
    sets: BTreeMap<String, InstanceSet>,
}

impl PackageInstanceSets {
    pub fn new() -> Self {
        Self::default()
    }

    fn path_of(env: &TypeEnv, inst: &Instance) -> String {
        match env.object(inst.object).pkg {
            Some(pkg) => env.package(pkg).path.clone(),
            None => String::new(),
        }
    }

    /// The set for a package, created on first use.
    pub fn pkg(&mut self, path: &str) -> &mut InstanceSet {
        self.sets.entry(path.to_string()).or_default()
    }

    pub fn get(&self, path: &str) -> Option<&InstanceSet> {
        self.sets.get(path)
    }

    /// Add an instance to the set of the package declaring its object.
    pub fn add(&mut self, env: &TypeEnv, inst: Instance) {
        let path = Self::path_of(env, &inst);
        self.pkg(&path).add(inst);
    }

    pub fn id(&self, env: &TypeEnv, inst: &Instance) -> usize {
        let path = Self::path_of(env, inst);
        match self.sets.get(&path) {
            Some(set) => set.id(inst),
            None => panic!("no instances recorded for package {path:?}"),
        }
    }

    pub fn contains(&self, env: &TypeEnv, inst: &Instance) -> bool {
        self.sets.get(&Self::path_of(env, inst)).is_some_and(|s| s.contains(inst))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InstanceSet)> {
        self.sets.iter()
    }

    pub fn all_exhausted(&self) -> bool {
        self.sets.values().all(InstanceSet::exhausted)
    }

    /// Packages sorted by path, each followed by its instances.
    pub fn render(&self, env: &TypeEnv) -> String {
        let mut buf = String::new();
        for (path, set) in &self.sets {
            buf.push_str(path);
            buf.push_str(":\n");
            for inst in set.values() {
                buf.push('\t');
                buf.push_str(&inst.display(env));
                buf.push('\n');
            }
        }
        buf
    }
}
