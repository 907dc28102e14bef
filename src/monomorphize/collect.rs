//! Discovery of every concrete instantiation used by the program.
//!
//! Collection runs in two phases:
//!
//! 1. **Seeding** walks each package's non-generic code and records every
//!    identifier the type checker resolved to an instantiation. Generic
//!    declarations are only remembered, together with any types declared
//!    locally inside generic functions.
//! 2. **Propagation** takes unprocessed instances off the per-package queues
//!    and walks the remembered declaration with a [`Resolver`] bound to the
//!    instance's arguments, which may discover more instances. This repeats
//!    until every queue is exhausted.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{FuncDecl, TypeSpec};
use crate::program::PackageUnit;
use crate::span::{NodeId, Spanned};
use crate::types::{ObjId, TypeEnv, TypeId, TypeInfo, TypeKind};
use crate::visit::{walk_file, walk_func_decl, walk_type_spec, Visitor};

use super::instance::{Instance, PackageInstanceSets};
use super::resolver::Resolver;

/// A declaration that is walked once per instance.
#[derive(Debug, Clone, Copy)]
pub enum DeclNode<'p> {
    Func(&'p Spanned<FuncDecl>),
    Type(&'p Spanned<TypeSpec>),
}

#[derive(Debug, Clone, Copy)]
struct GenericDecl<'p> {
    /// Index of the declaring package in the program.
    pkg: usize,
    node: DeclNode<'p>,
}

/// Collects the instances of every package of a program.
pub struct Collector<'p> {
    packages: &'p [PackageUnit],
    decls: HashMap<ObjId, GenericDecl<'p>>,
    instances: PackageInstanceSets,
}

impl<'p> Collector<'p> {
    pub fn new(packages: &'p [PackageUnit]) -> Self {
        Self { packages, decls: HashMap::new(), instances: PackageInstanceSets::new() }
    }

    /// Seed the queues from the non-generic code of every package.
    pub fn scan_all(&mut self, env: &mut TypeEnv) {
        for index in 0..self.packages.len() {
            self.scan(env, index);
        }
    }

    /// Seed the queues from package `index`.
    pub fn scan(&mut self, env: &mut TypeEnv, index: usize) {
        let packages = self.packages;
        let unit = &packages[index];
        let mut resolver = Resolver::identity();
        let mut seed = SeedVisitor {
            walker: InstanceVisitor {
                env,
                info: &unit.info,
                resolver: &mut resolver,
                instances: &mut self.instances,
            },
            decls: &mut self.decls,
            pkg: index,
            map_only: false,
        };
        for file in &unit.files {
            walk_file(&mut seed, file);
        }
        debug!(
            package = %unit.path(seed.walker.env),
            generic_decls = seed.decls.len(),
            "seeded instances"
        );
    }

    /// Process queued instances until no package has unprocessed ones.
    pub fn finish(&mut self, env: &mut TypeEnv) {
        let mut round = 0;
        while !self.instances.all_exhausted() {
            round += 1;
            let paths: Vec<String> = self.instances.iter().map(|(path, _)| path.clone()).collect();
            let mut processed = 0;
            for path in paths {
                while let Some(inst) = self.instances.pkg(&path).next() {
                    processed += 1;
                    self.process(env, &inst);
                }
            }
            debug!(round, processed, "instance propagation round");
        }
    }

    fn process(&mut self, env: &mut TypeEnv, inst: &Instance) {
        let Some(decl) = self.decls.get(&inst.object).copied() else {
            trace!(instance = %inst.display(env), "no declaration to specialize");
            return;
        };
        trace!(instance = %inst.display(env), "specializing");
        let packages = self.packages;
        let mut resolver = Resolver::for_instance(env, inst);
        let mut visitor = InstanceVisitor {
            env,
            info: &packages[decl.pkg].info,
            resolver: &mut resolver,
            instances: &mut self.instances,
        };
        // The root declaration is walked directly; its own visit hook would
        // treat it as a nested declaration.
        match decl.node {
            DeclNode::Func(func) => walk_func_decl(&mut visitor, func),
            DeclNode::Type(spec) => walk_type_spec(&mut visitor, spec),
        }
    }

    pub fn instances(&self) -> &PackageInstanceSets {
        &self.instances
    }

    pub fn into_instances(self) -> PackageInstanceSets {
        self.instances
    }
}

/// Collect the instances of all packages.
pub fn collect_instances(env: &mut TypeEnv, packages: &[PackageUnit]) -> PackageInstanceSets {
    let mut collector = Collector::new(packages);
    collector.scan_all(env);
    collector.finish(env);
    collector.into_instances()
}

// ── Instance discovery ──────────────────────────────────────────────

/// Records the instances referenced by the code it walks, translated by
/// `resolver`.
struct InstanceVisitor<'a> {
    env: &'a mut TypeEnv,
    info: &'a TypeInfo,
    resolver: &'a mut Resolver,
    instances: &'a mut PackageInstanceSets,
}

impl InstanceVisitor<'_> {
    fn ident(&mut self, id: NodeId) {
        let Some(recorded) = self.info.instances.get(&id) else { return };
        let Some(obj) = self.info.object_of(id) else { return };
        let obj = self.instantiated_object(obj);
        let type_args = self.resolver.substitute_all(self.env, &recorded.type_args);
        let nest_args = self.nest_args(obj);
        self.add(Instance::nested(obj, nest_args, type_args));
    }

    /// An embedded field identifier stands for its (named) type.
    fn instantiated_object(&self, obj: ObjId) -> ObjId {
        let object = self.env.object(obj);
        if !object.is_var() {
            return obj;
        }
        let base = self.env.origin(self.env.deref(object.ty));
        self.env.named(base).map(|n| n.obj).unwrap_or(obj)
    }

    fn nest_args(&self, obj: ObjId) -> Vec<TypeId> {
        match self.resolver.nest() {
            Some(nest) if self.env.declared_within(obj, nest) => {
                self.resolver.context_args().to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// Queue `inst`; an instantiated type also queues its methods.
    fn add(&mut self, inst: Instance) {
        let object = self.env.object(inst.object);
        let methods: Vec<ObjId> = match self.env.kind(object.ty) {
            TypeKind::Named(_) if object.is_type_name() => self
                .env
                .methods(object.ty)
                .iter()
                .copied()
                .filter(|m| {
                    // Methods with parameters of their own are only reachable
                    // through an explicit instantiation.
                    let sig = self.env.signature_of(self.env.object(*m).ty);
                    sig.is_none_or(|s| s.type_params.is_empty())
                })
                .collect(),
            _ => Vec::new(),
        };
        let type_args = inst.type_args.clone();
        self.instances.add(self.env, inst);
        for method in methods {
            self.instances.add(self.env, Instance::with_args(method, type_args.clone()));
        }
    }
}

impl<'ast> Visitor<'ast> for InstanceVisitor<'_> {
    fn visit_type_spec(&mut self, spec: &'ast Spanned<TypeSpec>) {
        if let Some(nest) = self.resolver.nest()
            && let Some(obj) = self.info.defs.get(&spec.node.name.id).copied()
            && self.env.declared_within(obj, nest)
        {
            if !spec.node.type_params.is_empty() {
                // Specialized on its own once an instantiation is seen.
                return;
            }
            let inst = Instance::nested(obj, self.resolver.context_args().to_vec(), Vec::new());
            self.add(inst);
        }
        walk_type_spec(self, spec);
    }

    fn visit_ident(&mut self, id: NodeId, _name: &'ast str) {
        self.ident(id);
    }
}

// ── Seeding ─────────────────────────────────────────────────────────

/// Walks non-generic code for instances and remembers generic declarations
/// (plus the types declared inside generic functions) for propagation.
struct SeedVisitor<'a, 'p> {
    walker: InstanceVisitor<'a>,
    decls: &'a mut HashMap<ObjId, GenericDecl<'p>>,
    pkg: usize,
    /// Inside a generic function: only record declarations.
    map_only: bool,
}

impl SeedVisitor<'_, '_> {
    fn defined(&self, name: NodeId) -> Option<ObjId> {
        self.walker.info.defs.get(&name).copied()
    }
}

impl<'p> Visitor<'p> for SeedVisitor<'_, 'p> {
    fn visit_func_decl(&mut self, func: &'p Spanned<FuncDecl>) {
        if func.node.is_generic()
            && let Some(obj) = self.defined(func.node.name.id)
        {
            self.decls.insert(obj, GenericDecl { pkg: self.pkg, node: DeclNode::Func(func) });
            let outer = std::mem::replace(&mut self.map_only, true);
            walk_func_decl(self, func);
            self.map_only = outer;
            return;
        }
        walk_func_decl(self, func);
    }

    fn visit_type_spec(&mut self, spec: &'p Spanned<TypeSpec>) {
        let obj = self.defined(spec.node.name.id);
        if self.map_only || !spec.node.type_params.is_empty() {
            if let Some(obj) = obj {
                self.decls.insert(obj, GenericDecl { pkg: self.pkg, node: DeclNode::Type(spec) });
            }
            return;
        }
        walk_type_spec(self, spec);
    }

    fn visit_ident(&mut self, id: NodeId, _name: &'p str) {
        if !self.map_only {
            self.walker.ident(id);
        }
    }
}
