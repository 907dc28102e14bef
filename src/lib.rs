//! Whole-program analyses for compiling Go to a single-threaded target:
//! generic instance collection, blocking analysis for goroutine
//! flattening, and initialization grouping of type declarations.

pub mod span;
pub mod diagnostics;
pub mod config;
pub mod types;
pub mod ast;
pub mod visit;
pub mod program;
pub mod builder;
pub mod monomorphize;
pub mod concurrency;
pub mod depgraph;
pub mod grouper;

use serde::Serialize;
use tracing::{debug, info};

use crate::ast::TypeSpec;
use crate::concurrency::{FuncInfo, Info};
use crate::config::{AnalysisConfig, GraphFormat};
use crate::diagnostics::AnalysisError;
use crate::grouper::{GroupInfo, Grouped};
use crate::monomorphize::{collect_instances, Instance, PackageInstanceSets};
use crate::program::{PackageUnit, Program};
use crate::span::{NodeId, Span, Spanned};
use crate::types::{ObjId, Signature, TypeEnv};
use crate::visit::{walk_type_spec, Visitor};

/// Run every analysis over `program`:
/// collect instances → per-package blocking analysis → propagation →
/// grouping of type declarations.
///
/// Fails only when type declarations depend on each other across packages
/// in a cycle.
pub fn analyze_program(program: Program, config: &AnalysisConfig) -> Result<ProgramAnalysis, AnalysisError> {
    let Program { mut env, packages } = program;

    let instances = collect_instances(&mut env, &packages);
    debug!(packages = packages.len(), "collected instances");

    let mut infos: Vec<Info> = packages
        .iter()
        .map(|unit| concurrency::analyze_package(&mut env, unit, &instances, config))
        .collect();
    concurrency::propagate_analysis(&env, &mut infos);

    let mut decls = type_decls(&mut env, &packages, &instances, config);
    let group_count = grouper::group(&env, &mut decls)?;
    info!(packages = packages.len(), types = decls.len(), groups = group_count, "analysis complete");

    Ok(ProgramAnalysis { env, instances, infos, decls, group_count, graph_format: config.graph_format })
}

/// Type declarations to order, package-level and local alike: one per
/// instance for generic types and for types declared in generic functions.
fn type_decls(
    env: &mut TypeEnv,
    packages: &[PackageUnit],
    instances: &PackageInstanceSets,
    config: &AnalysisConfig,
) -> Vec<TypeDecl> {
    let mut decls = Vec::new();
    for unit in packages {
        let set = instances.get(unit.path(env));
        let mut specs = TypeSpecs::default();
        for file in &unit.files {
            specs.visit_file(file);
        }
        for spec in specs.0 {
            let Some(obj) = unit.info.object_of(spec.node.name.id) else {
                continue;
            };
            let insts = if spec.node.type_params.is_empty() && !in_generic_func(env, obj) {
                vec![Instance::new(obj)]
            } else {
                set.map(|s| s.for_obj(obj)).unwrap_or_default()
            };
            for inst in insts {
                let mut info = GroupInfo::new();
                info.set_instance(env, &inst, config);
                decls.push(TypeDecl { inst, span: spec.span, info });
            }
        }
    }
    decls
}

/// Non-alias type specs in source order, including those in function bodies.
#[derive(Default)]
struct TypeSpecs<'p>(Vec<&'p Spanned<TypeSpec>>);

impl<'p> Visitor<'p> for TypeSpecs<'p> {
    fn visit_type_spec(&mut self, spec: &'p Spanned<TypeSpec>) {
        if !spec.node.alias {
            self.0.push(spec);
        }
        walk_type_spec(self, spec);
    }
}

fn in_generic_func(env: &TypeEnv, obj: ObjId) -> bool {
    env.object(obj)
        .parent_func
        .and_then(|f| env.signature_of(env.object(f).ty))
        .is_some_and(Signature::is_generic)
}

/// A type declaration, or one instance of a generic one, taking part in
/// grouping.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub inst: Instance,
    pub span: Span,
    info: GroupInfo,
}

impl Grouped for TypeDecl {
    fn grouper(&self) -> &GroupInfo {
        &self.info
    }

    fn grouper_mut(&mut self) -> &mut GroupInfo {
        &mut self.info
    }

    fn label(&self, env: &TypeEnv) -> String {
        self.inst.type_string(env)
    }

    fn span(&self) -> Span {
        self.span
    }
}

/// Results of [`analyze_program`], queried by code generation.
#[derive(Debug)]
pub struct ProgramAnalysis {
    env: TypeEnv,
    instances: PackageInstanceSets,
    infos: Vec<Info>,
    decls: Vec<TypeDecl>,
    group_count: usize,
    graph_format: GraphFormat,
}

impl ProgramAnalysis {
    pub fn env(&self) -> &TypeEnv {
        &self.env
    }

    pub fn instances(&self) -> &PackageInstanceSets {
        &self.instances
    }

    /// Stable id of `inst` within its package's instance list.
    pub fn instance_id(&self, inst: &Instance) -> usize {
        self.instances.id(&self.env, inst)
    }

    /// Blocking facts of the package with import path `path`.
    pub fn package_info(&self, path: &str) -> Option<&Info> {
        self.infos.iter().find(|info| info.path() == path)
    }

    pub fn func_info(&self, inst: &Instance) -> Option<&FuncInfo> {
        self.infos.iter().find_map(|info| info.func_info(inst))
    }

    /// Whether calling the function instance may block.
    ///
    /// Panics if the instance belongs to no analyzed package or was never
    /// analyzed.
    pub fn is_blocking(&self, inst: &Instance) -> bool {
        let object = self.env.object(inst.object);
        let Some(pkg) = object.pkg else {
            panic!("no package for {}", object.name);
        };
        let path = &self.env.package(pkg).path;
        match self.package_info(path) {
            Some(info) => info.is_blocking(&self.env, inst),
            None => panic!("missing info for package {path}"),
        }
    }

    /// Whether `node` must be compiled into a resumable state machine.
    pub fn is_flattened(&self, node: NodeId) -> bool {
        self.infos.iter().flat_map(Info::funcs).any(|f| f.is_flattened(node))
    }

    /// Group of the type declaration instance `inst`, if it was grouped.
    pub fn group(&self, inst: &Instance) -> Option<usize> {
        self.decls.iter().find(|d| &d.inst == inst).map(|d| d.info.group)
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn type_decls(&self) -> &[TypeDecl] {
        &self.decls
    }

    /// Dependency graph of the grouped declarations in the configured
    /// format.
    pub fn graph(&self) -> String {
        grouper::graph(&self.env, &self.decls, self.graph_format)
    }

    pub fn report(&self) -> Report {
        let mut packages: Vec<PackageReport> = self
            .infos
            .iter()
            .map(|info| {
                let instances = self
                    .instances
                    .get(info.path())
                    .map(|set| {
                        set.values()
                            .iter()
                            .map(|inst| InstanceReport { id: set.id(inst), name: inst.display(&self.env) })
                            .collect()
                    })
                    .unwrap_or_default();
                let mut blocking: Vec<String> = info
                    .instances()
                    .filter(|(_, fi)| fi.is_blocking())
                    .map(|(inst, _)| inst.display(&self.env))
                    .collect();
                blocking.sort();
                PackageReport { path: info.path().to_string(), instances, blocking, groups: Vec::new() }
            })
            .collect();

        for decl in &self.decls {
            let Some(pkg) = self.env.object(decl.inst.object).pkg else {
                continue;
            };
            let path = &self.env.package(pkg).path;
            if let Some(report) = packages.iter_mut().find(|p| &p.path == path) {
                report.groups.push(GroupReport { name: decl.label(&self.env), group: decl.info.group });
            }
        }
        for report in &mut packages {
            report.groups.sort_by(|a, b| (a.group, &a.name).cmp(&(b.group, &b.name)));
        }
        Report { group_count: self.group_count, packages }
    }
}

// ── Report ──────────────────────────────────────────────────────────

/// Serializable summary of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub group_count: usize,
    pub packages: Vec<PackageReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub path: String,
    pub instances: Vec<InstanceReport>,
    /// Blocking function instances.
    pub blocking: Vec<String>,
    pub groups: Vec<GroupReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceReport {
    pub id: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub group: usize,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
