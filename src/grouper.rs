//! Initialization grouping.
//!
//! Declarations whose types depend on named types from other packages must
//! be initialized after those types. Each declaration gets a group number
//! greater than that of everything it depends on, so declarations sharing a
//! group can be initialized together.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::config::{AnalysisConfig, GraphFormat};
use crate::depgraph::{GraphOptions, Sequencer};
use crate::diagnostics::AnalysisError;
use crate::monomorphize::{instance_type, Instance};
use crate::span::Span;
use crate::types::{ObjKind, PkgId, TypeEnv, TypeId, TypeKind};

/// Grouping facts attached to one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupInfo {
    /// Initialization group; valid after [`group`] ran.
    pub group: usize,
    /// Concrete named type the declaration introduces, if it takes part in
    /// ordering.
    ty: Option<TypeId>,
    /// Named types from other packages the declaration depends on.
    deps: BTreeSet<TypeId>,
}

impl GroupInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the type and dependencies of the declaration of `inst`.
    pub fn set_instance(&mut self, env: &mut TypeEnv, inst: &Instance, config: &AnalysisConfig) {
        self.set_type(env, inst, config);
        let pkg = env.object(inst.object).pkg;
        self.add_all_deps(env, inst, pkg, config);
    }

    pub fn ty(&self) -> Option<TypeId> {
        self.ty
    }

    pub fn deps(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.deps.iter().copied()
    }

    /// `Info(group, name, [deps])` with sorted dependencies.
    pub fn render(&self, env: &TypeEnv) -> String {
        let name = self.ty.map_or_else(|| "<unnamed>".to_string(), |t| env.type_string(t));
        let mut deps: Vec<String> = self.deps.iter().map(|d| env.type_string(*d)).collect();
        deps.sort();
        format!("Info({}, {name}, [{}])", self.group, deps.join(", "))
    }

    fn set_type(&mut self, env: &mut TypeEnv, inst: &Instance, config: &AnalysisConfig) {
        let object_ty = env.object(inst.object).ty;
        if env.named(object_ty).is_none() {
            return;
        }
        let ty = resolve(env, inst);
        if env.named(ty).is_some() && !skip_type(env, ty, config) {
            self.ty = Some(ty);
        }
    }

    fn add_all_deps(&mut self, env: &mut TypeEnv, inst: &Instance, pkg: Option<PkgId>, config: &AnalysisConfig) {
        let mut pending = DedupStack::default();
        pending.extend(&inst.nest_args);
        pending.extend(&inst.type_args);

        let object = env.object(inst.object).clone();
        match object.kind {
            ObjKind::TypeName if env.named(object.ty).is_some() => {
                let ty = resolve(env, inst);
                let args = env.type_args(ty).to_vec();
                pending.extend(args.iter().rev());
                pending.push(env.underlying(ty));
            }
            // Functions and methods contribute their receiver, parameter and
            // result types.
            ObjKind::Func => pending.push(resolve(env, inst)),
            _ => pending.push(object.ty),
        }

        while let Some(t) = pending.pop() {
            match env.kind(t).clone() {
                TypeKind::Named(named) => {
                    if skip_type(env, t, config) {
                        continue;
                    }
                    if pkg.is_some() && env.object(named.obj).pkg == pkg {
                        // Walk through same-package types to their
                        // dependencies instead of ordering against them.
                        pending.extend(named.type_args.iter().rev());
                        pending.push(env.underlying(t));
                        continue;
                    }
                    self.deps.insert(t);
                }
                TypeKind::Signature(sig) => {
                    pending.extend(sig.recv.iter());
                    pending.extend(sig.params.iter().rev());
                    pending.extend(sig.results.iter().rev());
                }
                TypeKind::Map(key, value) => {
                    pending.push(key);
                    pending.push(value);
                }
                TypeKind::Pointer(elem)
                | TypeKind::Slice(elem)
                | TypeKind::Array(elem, _)
                | TypeKind::Chan(_, elem) => pending.push(elem),
                // Struct fields are initialized lazily and interfaces only
                // hold references.
                TypeKind::Basic(_)
                | TypeKind::Struct(_)
                | TypeKind::Interface(_)
                | TypeKind::Union(_)
                | TypeKind::TypeParam(_) => {}
            }
        }
    }
}

/// The concrete type of `inst`: the instantiated named type, the substituted
/// signature, or the declared type of a variable.
fn resolve(env: &mut TypeEnv, inst: &Instance) -> TypeId {
    match env.object(inst.object).kind {
        ObjKind::TypeName | ObjKind::Func => instance_type(env, inst),
        _ => env.object(inst.object).ty,
    }
}

/// Universe types (`error`) and types of configured packages never take
/// part in ordering.
fn skip_type(env: &TypeEnv, ty: TypeId, config: &AnalysisConfig) -> bool {
    let Some(named) = env.named(ty) else {
        return true;
    };
    match env.object(named.obj).pkg {
        Some(pkg) => config.is_skipped_package(&env.package(pkg).path),
        None => true,
    }
}

#[derive(Default)]
struct DedupStack {
    stack: Vec<TypeId>,
    seen: HashSet<TypeId>,
}

impl DedupStack {
    fn push(&mut self, t: TypeId) {
        if t != TypeId::INVALID && self.seen.insert(t) {
            self.stack.push(t);
        }
    }

    fn extend<'a>(&mut self, types: impl IntoIterator<Item = &'a TypeId>) {
        for t in types {
            self.push(*t);
        }
    }

    fn pop(&mut self) -> Option<TypeId> {
        self.stack.pop()
    }
}

// ── Grouping ────────────────────────────────────────────────────────

/// A declaration that takes part in initialization grouping.
pub trait Grouped {
    fn grouper(&self) -> &GroupInfo;
    fn grouper_mut(&mut self) -> &mut GroupInfo;
    /// Name used in cycle diagnostics.
    fn label(&self, env: &TypeEnv) -> String;
    fn span(&self) -> Span {
        Span::dummy()
    }
}

/// Assign a group to every declaration and return the number of groups.
/// Every group number is below the returned count; declarations without an
/// associated type get group 0.
///
/// Fails when the declarations' types depend on each other in a cycle.
/// Panics if a declaration depends on a type no declaration provides.
pub fn group<D: Grouped>(env: &TypeEnv, decls: &mut [D]) -> Result<usize, AnalysisError> {
    for decl in decls.iter_mut() {
        let info = decl.grouper_mut();
        if info.ty.is_none() {
            info.group = 0;
        }
    }
    let mut seq = sequence(env, decls);
    let count = match seq.depth_count() {
        Ok(0) if !decls.is_empty() => 1,
        Ok(count) => count,
        Err(_) => {
            let members = seq.cycles();
            let names = members.iter().map(|&i| decls[i].label(env)).collect();
            let spans = members.iter().map(|&i| decls[i].span()).collect();
            return Err(AnalysisError::cycle(names, spans));
        }
    };
    for (index, decl) in decls.iter_mut().enumerate() {
        if let Ok(Some(depth)) = seq.depth(&index) {
            decl.grouper_mut().group = depth;
        }
    }
    debug!(decls = decls.len(), groups = count, "grouped declarations");
    Ok(count)
}

/// Render the dependency graph of the declarations for diagnostics.
/// Declarations on or behind a cycle are highlighted.
pub fn graph<D: Grouped>(env: &TypeEnv, decls: &[D], format: GraphFormat) -> String {
    let mut seq = sequence(env, decls);
    let label = |&i: &usize| decls[i].label(env);
    seq.to_graph(&GraphOptions {
        item_to_string: Some(&label),
        format,
        label_items_with_group_number: true,
        ..GraphOptions::default()
    })
}

/// Sequencer over declaration indices; only declarations with a type take
/// part.
fn sequence<D: Grouped>(env: &TypeEnv, decls: &[D]) -> Sequencer<usize> {
    let mut providers: HashMap<TypeId, Vec<usize>> = HashMap::new();
    let mut seq = Sequencer::new();
    for (index, decl) in decls.iter().enumerate() {
        if let Some(ty) = decl.grouper().ty {
            providers.entry(ty).or_default().push(index);
            seq.add(index, []);
        }
    }
    for (index, decl) in decls.iter().enumerate() {
        let info = decl.grouper();
        if info.ty.is_none() {
            continue;
        }
        for dep in &info.deps {
            match providers.get(dep) {
                Some(found) => seq.add(index, found.iter().copied()),
                None => panic!(
                    "missing dependency id for {} from {}",
                    env.type_string(*dep),
                    decl.label(env)
                ),
            }
        }
    }
    seq
}
