use std::collections::{HashMap, HashSet};

use crate::monomorphize::{Instance, InstanceMap};
use crate::span::NodeId;
use crate::types::{ObjId, TypeEnv, TypeId};

use super::flow::{ContinueStmt, DeferStmt, NodePath, ReturnStmt};

/// Blocking facts for one function instance, function literal or the
/// package initializer.
#[derive(Debug, Clone, Default)]
pub struct FuncInfo {
    pub has_defer: bool,
    /// Nodes that must be compiled into a resumable state machine.
    flattened: HashSet<NodeId>,
    /// Nodes that are, or contain, a possibly blocking operation.
    blocking: HashSet<NodeId>,
    /// Labels targeted by `goto` (as opposed to loop labels).
    goto_labels: HashSet<ObjId>,
    pub(super) continue_stmts: Vec<ContinueStmt>,
    pub(super) return_stmts: Vec<ReturnStmt>,
    /// In registration order.
    pub(super) defer_stmts: Vec<DeferStmt>,
    /// Calls to function instances whose status is not known yet.
    pub(super) inst_callees: InstanceMap<Vec<NodePath>>,
    /// Direct calls to function literals, keyed by literal node.
    pub(super) lit_callees: HashMap<NodeId, Vec<NodePath>>,
    type_args: Vec<TypeId>,
}

impl FuncInfo {
    pub(super) fn new(type_args: Vec<TypeId>) -> Self {
        Self { type_args, ..Self::default() }
    }

    /// Whether the function may block the calling goroutine.
    pub fn is_blocking(&self) -> bool {
        !self.blocking.is_empty()
    }

    pub fn is_blocking_node(&self, node: NodeId) -> bool {
        self.blocking.contains(&node)
    }

    pub fn is_flattened(&self, node: NodeId) -> bool {
        self.flattened.contains(&node)
    }

    pub fn is_goto_label(&self, label: ObjId) -> bool {
        self.goto_labels.contains(&label)
    }

    pub fn type_args(&self) -> &[TypeId] {
        &self.type_args
    }

    pub fn blocking_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.blocking.iter().copied()
    }

    pub(super) fn mark_node_blocking(&mut self, node: NodeId) {
        self.blocking.insert(node);
        self.flattened.insert(node);
    }

    /// Mark every node on `path` as blocking and flattened.
    pub(super) fn mark_blocking(&mut self, path: &[NodeId]) {
        for node in path {
            self.mark_node_blocking(*node);
        }
    }

    pub(super) fn mark_flattened(&mut self, path: &[NodeId]) {
        self.flattened.extend(path.iter().copied());
    }

    pub(super) fn add_goto_label(&mut self, label: ObjId) {
        self.goto_labels.insert(label);
    }

    pub(super) fn has_goto(&self) -> bool {
        !self.goto_labels.is_empty()
    }

    pub(super) fn add_inst_callee(&mut self, callee: Instance, path: NodePath) {
        match self.inst_callees.get_mut(&callee) {
            Some(sites) => sites.push(path),
            None => {
                self.inst_callees.set(callee, vec![path]);
            }
        }
    }

    pub(super) fn add_lit_callee(&mut self, lit: NodeId, path: NodePath) {
        self.lit_callees.entry(lit).or_default().push(path);
    }

    /// Re-stamp the returns added since `first` with every defer registered
    /// so far.
    pub(super) fn resume_loop(&mut self, first: usize) {
        let defers = self.defer_stmts.len();
        for ret in &mut self.return_stmts[first..] {
            ret.defers = defers;
        }
    }
}

/// Index of the package initializer in [`Info::funcs`].
pub(super) const INIT_FUNC: usize = 0;

/// Blocking facts for one package.
#[derive(Debug, Clone)]
pub struct Info {
    path: String,
    funcs: Vec<FuncInfo>,
    by_instance: InstanceMap<usize>,
    by_lit: HashMap<(NodeId, Vec<TypeId>), usize>,
    /// Variables whose address is taken.
    has_pointer: HashSet<ObjId>,
}

impl Info {
    pub(super) fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            // Context for package variable initialization.
            funcs: vec![FuncInfo::new(Vec::new())],
            by_instance: InstanceMap::new(),
            by_lit: HashMap::new(),
            has_pointer: HashSet::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(super) fn add_instance(&mut self, inst: Instance) -> usize {
        let index = self.funcs.len();
        self.funcs.push(FuncInfo::new(inst.type_args.clone()));
        self.by_instance.set(inst, index);
        index
    }

    pub(super) fn add_lit(&mut self, lit: NodeId, type_args: Vec<TypeId>) -> usize {
        let index = self.funcs.len();
        self.funcs.push(FuncInfo::new(type_args.clone()));
        self.by_lit.insert((lit, type_args), index);
        index
    }

    pub(super) fn func_mut(&mut self, index: usize) -> &mut FuncInfo {
        &mut self.funcs[index]
    }

    pub(super) fn funcs_mut(&mut self) -> &mut [FuncInfo] {
        &mut self.funcs
    }

    pub(super) fn add_pointer(&mut self, var: ObjId) {
        self.has_pointer.insert(var);
    }

    /// Every analyzed function of the package, the initializer first.
    pub fn funcs(&self) -> &[FuncInfo] {
        &self.funcs
    }

    pub fn init_func_info(&self) -> &FuncInfo {
        &self.funcs[INIT_FUNC]
    }

    pub fn func_info(&self, inst: &Instance) -> Option<&FuncInfo> {
        self.by_instance.get(inst).map(|&i| &self.funcs[i])
    }

    /// Info for a function literal analyzed with the given enclosing type
    /// arguments.
    pub fn func_lit_info(&self, lit: NodeId, type_args: &[TypeId]) -> Option<&FuncInfo> {
        self.by_lit.get(&(lit, type_args.to_vec())).map(|&i| &self.funcs[i])
    }

    /// A literal that was never analyzed counts as blocking.
    pub fn is_lit_blocking(&self, lit: NodeId, type_args: &[TypeId]) -> bool {
        self.func_lit_info(lit, type_args).is_none_or(FuncInfo::is_blocking)
    }

    /// Whether the function instance may block.
    ///
    /// Panics if the instance was not analyzed in this package.
    pub fn is_blocking(&self, env: &TypeEnv, inst: &Instance) -> bool {
        match self.func_info(inst) {
            Some(fi) => fi.is_blocking(),
            None => panic!(
                "info did not have function declaration instance for {}",
                inst.type_string(env)
            ),
        }
    }

    pub fn has_pointer(&self, var: ObjId) -> bool {
        self.has_pointer.contains(&var)
    }

    /// Analyzed function instances, in analysis order.
    pub fn instances(&self) -> impl Iterator<Item = (&Instance, &FuncInfo)> {
        self.by_instance.iter().map(|(inst, &i)| (inst, &self.funcs[i]))
    }
}
