//! Blocking analysis.
//!
//! The target runs goroutines as cooperatively scheduled tasks, so every
//! function that may suspend (channel operations, `select`, calls to other
//! such functions) is compiled into a resumable state machine. This module
//! finds those functions, per generic instance, and the nodes inside them
//! that need the treatment.
//!
//! Analysis runs in three steps:
//!
//! 1. [`analyze_package`] walks every function instance of a package and
//!    records local facts together with call sites whose callee status is
//!    not yet known.
//! 2. [`propagate_analysis`] resolves pending call sites across all packages
//!    until nothing changes.
//! 3. Still inside [`propagate_analysis`], returns reached by blocking defers
//!    and continues through blocking post statements are marked, once.

pub mod flow;
mod info;
mod walk;

pub use flow::{ContinueStmt, DeferStmt, NodePath, ReturnStmt};
pub use info::{FuncInfo, Info};

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{Decl, FuncDecl};
use crate::config::AnalysisConfig;
use crate::monomorphize::{Instance, InstanceSet, PackageInstanceSets, Resolver};
use crate::program::PackageUnit;
use crate::span::{NodeId, Spanned};
use crate::types::TypeEnv;

use info::INIT_FUNC;
use walk::FuncWalker;

/// Compute the local blocking facts of one package.
///
/// Generic functions are analyzed once per instance found by the collector;
/// generic functions that are never instantiated are skipped.
pub fn analyze_package(
    env: &mut TypeEnv,
    unit: &PackageUnit,
    instances: &PackageInstanceSets,
    config: &AnalysisConfig,
) -> Info {
    let path = unit.path(env).to_string();
    let mut info = Info::new(&path);
    let set = instances.get(&path);

    for file in &unit.files {
        for decl in &file.decls {
            match decl {
                Decl::Func(func) => analyze_func_decl(env, unit, set, config, &mut info, func),
                Decl::Var(spec) | Decl::Const(spec) => {
                    FuncWalker::new(env, &unit.info, config, &mut info, Resolver::identity(), INIT_FUNC)
                        .value_spec(spec);
                }
                Decl::Type(_) => {}
            }
        }
    }

    debug!(package = %path, funcs = info.funcs().len(), "analyzed package");
    info
}

fn analyze_func_decl(
    env: &mut TypeEnv,
    unit: &PackageUnit,
    set: Option<&InstanceSet>,
    config: &AnalysisConfig,
    info: &mut Info,
    func: &Spanned<FuncDecl>,
) {
    let Some(&obj) = unit.info.defs.get(&func.node.name.id) else {
        return;
    };
    let mut instances = set.map(|s| s.for_obj(obj)).unwrap_or_default();
    if instances.is_empty() {
        if func.node.is_generic() {
            trace!(func = %env.symbol_name(obj), "generic function is never instantiated");
            return;
        }
        instances.push(Instance::new(obj));
    }

    for inst in instances {
        let resolver = if inst.is_trivial() { Resolver::identity() } else { Resolver::for_instance(env, &inst) };
        let index = info.add_instance(inst);
        match &func.node.body {
            Some(body) => FuncWalker::new(env, &unit.info, config, info, resolver, index).body(body),
            None if config.bodiless_funcs_block => info.func_mut(index).mark_node_blocking(func.id),
            None => {}
        }
    }
}

// ── Propagation ─────────────────────────────────────────────────────

/// Read-only view over every package's [`Info`].
struct Infos<'a> {
    env: &'a TypeEnv,
    infos: &'a [Info],
    by_path: &'a HashMap<String, usize>,
}

impl Infos<'_> {
    fn package_of(&self, inst: &Instance) -> &Info {
        let path = self
            .env
            .object(inst.object)
            .pkg
            .map(|p| self.env.package(p).path.as_str())
            .unwrap_or_default();
        match self.by_path.get(path) {
            Some(&index) => &self.infos[index],
            None => panic!("no analysis info for package {path:?} of {}", inst.display(self.env)),
        }
    }

    fn is_blocking(&self, inst: &Instance) -> bool {
        self.package_of(inst).is_blocking(self.env, inst)
    }

    fn is_defer_blocking(&self, home: &Info, defer: &DeferStmt) -> bool {
        match defer {
            DeferStmt::Blocking => true,
            DeferStmt::Instance(inst) => self.is_blocking(inst),
            DeferStmt::Lit { lit, type_args } => home.is_lit_blocking(*lit, type_args),
        }
    }
}

enum Resolved {
    Instance(usize, Instance),
    Lit(usize, NodeId),
}

/// Propagate blocking through call sites of all packages until no package
/// changes, then mark control-flow statements affected by blocking defers
/// and post statements.
///
/// Panics if a call site refers to a function instance that no package
/// analyzed.
pub fn propagate_analysis(env: &TypeEnv, infos: &mut [Info]) {
    let by_path: HashMap<String, usize> =
        infos.iter().enumerate().map(|(i, info)| (info.path().to_string(), i)).collect();

    let mut round = 0;
    loop {
        round += 1;
        let mut changed = 0;
        for index in 0..infos.len() {
            let resolved = {
                let view = Infos { env, infos, by_path: &by_path };
                resolve_call_sites(&view, index)
            };
            changed += resolved.len();
            apply_resolved(&mut infos[index], resolved);
        }
        debug!(round, resolved = changed, "blocking propagation round");
        if changed == 0 {
            break;
        }
    }

    for index in 0..infos.len() {
        let marks = {
            let view = Infos { env, infos, by_path: &by_path };
            control_flow_marks(&view, &view.infos[index])
        };
        let funcs = infos[index].funcs_mut();
        for (func, path) in marks {
            funcs[func].mark_blocking(&path);
        }
    }
}

/// Pending call sites of package `index` whose callee is now known to block.
fn resolve_call_sites(view: &Infos<'_>, index: usize) -> Vec<Resolved> {
    let home = &view.infos[index];
    let mut resolved = Vec::new();
    for (func_index, func) in home.funcs().iter().enumerate() {
        let mut cursor = func.inst_callees.cursor();
        while let Some(callee) = cursor.next(&func.inst_callees) {
            if view.is_blocking(&callee) {
                resolved.push(Resolved::Instance(func_index, callee));
            }
        }
        for (&lit, _) in &func.lit_callees {
            if home.is_lit_blocking(lit, func.type_args()) {
                resolved.push(Resolved::Lit(func_index, lit));
            }
        }
    }
    resolved
}

fn apply_resolved(info: &mut Info, resolved: Vec<Resolved>) {
    let funcs = info.funcs_mut();
    for r in resolved {
        let (func, sites) = match r {
            Resolved::Instance(func, callee) => (func, funcs[func].inst_callees.delete(&callee)),
            Resolved::Lit(func, lit) => (func, funcs[func].lit_callees.remove(&lit)),
        };
        for path in sites.into_iter().flatten() {
            funcs[func].mark_blocking(&path);
        }
    }
    for func in funcs.iter_mut() {
        func.inst_callees.compact();
    }
}

/// Paths of returns and continues that end up blocking, per function index.
fn control_flow_marks(view: &Infos<'_>, home: &Info) -> Vec<(usize, NodePath)> {
    let mut marks = Vec::new();
    for (index, func) in home.funcs().iter().enumerate() {
        let blocking_defers: Vec<bool> =
            func.defer_stmts.iter().map(|d| view.is_defer_blocking(home, d)).collect();
        if func.has_goto() {
            if blocking_defers.contains(&true) {
                marks.extend(func.return_stmts.iter().map(|r| (index, r.path.clone())));
            }
        } else {
            for ret in &func.return_stmts {
                if blocking_defers[..ret.defers].contains(&true) {
                    marks.push((index, ret.path.clone()));
                }
            }
        }
        for cont in &func.continue_stmts {
            if func.is_blocking_node(cont.post) {
                marks.push((index, cont.path.clone()));
            }
        }
    }
    marks
}
