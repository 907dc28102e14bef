use tracing::trace;

use crate::ast::*;
use crate::config::AnalysisConfig;
use crate::monomorphize::{Instance, Resolver};
use crate::span::{NodeId, Spanned};
use crate::types::{ObjId, ObjKind, Selection, SelectionKind, TypeEnv, TypeId, TypeInfo, TypeKind};

use super::flow::{ContinueStmt, DeferStmt, NodePath, ReturnStmt};
use super::info::{FuncInfo, Info};

// ── Ancestor chain ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct LoopFrame<'ast> {
    label: Option<&'ast str>,
    /// Post statement of a `for` loop.
    post: Option<NodeId>,
}

/// One node on the path from the function body to the node being analyzed.
#[derive(Debug, Clone, Copy)]
pub(super) struct Ctx<'c, 'ast> {
    node: NodeId,
    /// Set for `for` and `range` statements.
    frame: Option<LoopFrame<'ast>>,
    parent: Option<&'c Ctx<'c, 'ast>>,
}

impl<'c, 'ast> Ctx<'c, 'ast> {
    pub(super) fn root(node: NodeId) -> Self {
        Self { node, frame: None, parent: None }
    }

    fn child<'d>(&'d self, node: NodeId) -> Ctx<'d, 'ast> {
        Ctx { node, frame: None, parent: Some(self) }
    }

    fn loop_child<'d>(&'d self, node: NodeId, frame: LoopFrame<'ast>) -> Ctx<'d, 'ast> {
        Ctx { node, frame: Some(frame), parent: Some(self) }
    }

    fn ancestors(&self) -> impl Iterator<Item = &Ctx<'c, 'ast>> {
        std::iter::successors(Some(self), |c| c.parent)
    }

    fn path(&self) -> NodePath {
        let mut path: NodePath = self.ancestors().map(|c| c.node).collect();
        path.reverse();
        path
    }

    /// Innermost enclosing loop, or the loop carrying `label`.
    fn find_loop(&self, label: Option<&str>) -> Option<LoopFrame<'ast>> {
        self.ancestors()
            .filter_map(|c| c.frame)
            .find(|frame| label.is_none() || frame.label == label)
    }
}

// ── Call targets ────────────────────────────────────────────────────

/// What a call expression invokes, as far as blocking is concerned.
#[derive(Debug, Clone)]
enum Target {
    Instance(Instance),
    Lit(NodeId),
    /// Dynamic call; already marked.
    Blocking,
    /// Builtins, conversions and configured receivers.
    NonBlocking,
}

// ── Walker ──────────────────────────────────────────────────────────

/// Walks one function body (or package initializer) and records its local
/// blocking facts into [`Info`].
pub(super) struct FuncWalker<'a, 'ast> {
    env: &'a mut TypeEnv,
    types: &'ast TypeInfo,
    config: &'a AnalysisConfig,
    info: &'a mut Info,
    resolver: Resolver,
    current: usize,
    /// Index of the first return recorded inside the outermost loop.
    loop_return_index: Option<usize>,
}

impl<'a, 'ast> FuncWalker<'a, 'ast> {
    pub(super) fn new(
        env: &'a mut TypeEnv,
        types: &'ast TypeInfo,
        config: &'a AnalysisConfig,
        info: &'a mut Info,
        resolver: Resolver,
        current: usize,
    ) -> Self {
        Self { env, types, config, info, resolver, current, loop_return_index: None }
    }

    fn func(&mut self) -> &mut FuncInfo {
        self.info.func_mut(self.current)
    }

    fn mark_blocking(&mut self, ctx: &Ctx<'_, 'ast>) {
        let path = ctx.path();
        self.func().mark_blocking(&path);
    }

    pub(super) fn body(&mut self, body: &'ast Spanned<Block>) {
        let root = Ctx::root(body.id);
        self.stmts(&body.node.stmts, &root);
    }

    /// Initializer expressions of a package-level `var` or `const`.
    pub(super) fn value_spec(&mut self, spec: &'ast Spanned<ValueSpec>) {
        let root = Ctx::root(spec.id);
        self.exprs(&spec.node.values, &root);
    }

    // ── Statements ──────────────────────────────────────────────────

    fn stmts(&mut self, stmts: &'ast [Spanned<Stmt>], ctx: &Ctx<'_, 'ast>) {
        for stmt in stmts {
            self.stmt(stmt, None, ctx);
        }
    }

    fn block(&mut self, block: &'ast Spanned<Block>, parent: &Ctx<'_, 'ast>) {
        let ctx = parent.child(block.id);
        self.stmts(&block.node.stmts, &ctx);
    }

    fn stmt(&mut self, stmt: &'ast Spanned<Stmt>, label: Option<&'ast str>, parent: &Ctx<'_, 'ast>) {
        let ctx = match &stmt.node {
            Stmt::For { post, .. } => {
                let post = post.as_ref().map(|p| p.id);
                parent.loop_child(stmt.id, LoopFrame { label, post })
            }
            Stmt::Range { .. } => parent.loop_child(stmt.id, LoopFrame { label, post: None }),
            _ => parent.child(stmt.id),
        };
        let ctx = &ctx;

        match &stmt.node {
            Stmt::Expr(e) => self.expr(e, ctx),
            Stmt::Send { chan, value } => {
                self.mark_blocking(ctx);
                self.expr(chan, ctx);
                self.expr(value, ctx);
            }
            Stmt::IncDec { target, .. } => self.expr(target, ctx),
            Stmt::Assign { lhs, rhs, .. } => {
                self.exprs(lhs, ctx);
                self.exprs(rhs, ctx);
            }
            Stmt::Go(call) => self.go_stmt(call, ctx),
            Stmt::Defer(call) => self.defer_stmt(call, ctx),
            Stmt::Return(results) => {
                let ret = ReturnStmt { path: ctx.path(), defers: self.func().defer_stmts.len() };
                self.func().return_stmts.push(ret);
                self.exprs(results, ctx);
            }
            Stmt::Branch { kind, label } => self.branch(*kind, label.as_ref(), ctx),
            Stmt::Block(block) => self.block(block, ctx),
            Stmt::If { init, cond, then_block, else_branch } => {
                if let Some(init) = init {
                    self.stmt(init, None, ctx);
                }
                self.expr(cond, ctx);
                self.block(then_block, ctx);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch, None, ctx);
                }
            }
            Stmt::Switch { init, tag, clauses } => {
                if let Some(init) = init {
                    self.stmt(init, None, ctx);
                }
                if let Some(tag) = tag {
                    self.expr(tag, ctx);
                }
                self.case_clauses(clauses, ctx);
            }
            Stmt::TypeSwitch { init, assign, clauses } => {
                if let Some(init) = init {
                    self.stmt(init, None, ctx);
                }
                self.stmt(assign, None, ctx);
                self.case_clauses(clauses, ctx);
            }
            Stmt::Select { clauses } => self.select(clauses, ctx),
            Stmt::For { init, cond, post, body } => {
                let outermost = self.enter_loop();
                if let Some(init) = init {
                    self.stmt(init, None, ctx);
                }
                if let Some(cond) = cond {
                    self.expr(cond, ctx);
                }
                if let Some(post) = post {
                    self.stmt(post, None, ctx);
                }
                self.block(body, ctx);
                self.leave_loop(outermost);
            }
            Stmt::Range { key, value, x, body, .. } => {
                if self.is_chan(x) {
                    self.mark_blocking(ctx);
                }
                let outermost = self.enter_loop();
                for e in [key, value].into_iter().flatten() {
                    self.expr(e, ctx);
                }
                self.expr(x, ctx);
                self.block(body, ctx);
                self.leave_loop(outermost);
            }
            Stmt::Labeled { label, stmt } => self.stmt(stmt, Some(label.node.as_str()), ctx),
            Stmt::Decl(Decl::Var(spec) | Decl::Const(spec)) => self.exprs(&spec.node.values, ctx),
            Stmt::Decl(_) | Stmt::Empty => {}
        }
    }

    /// Start tracking returns if this is the outermost loop.
    fn enter_loop(&mut self) -> bool {
        if self.loop_return_index.is_some() {
            return false;
        }
        self.loop_return_index = Some(self.func().return_stmts.len());
        true
    }

    fn leave_loop(&mut self, outermost: bool) {
        if !outermost {
            return;
        }
        if let Some(first) = self.loop_return_index.take() {
            self.func().resume_loop(first);
        }
    }

    fn branch(&mut self, kind: BranchKind, label: Option<&'ast Ident>, ctx: &Ctx<'_, 'ast>) {
        match kind {
            BranchKind::Goto => {
                let path = ctx.path();
                self.func().mark_flattened(&path);
                if let Some(label) = label
                    && let Some(&obj) = self.types.uses.get(&label.id)
                {
                    self.func().add_goto_label(obj);
                }
            }
            BranchKind::Continue => {
                let target = ctx.find_loop(label.map(|l| l.node.as_str()));
                if let Some(post) = target.and_then(|frame| frame.post) {
                    let cont = ContinueStmt { post, path: ctx.path() };
                    self.func().continue_stmts.push(cont);
                }
            }
            BranchKind::Break | BranchKind::Fallthrough => {}
        }
    }

    fn case_clauses(&mut self, clauses: &'ast [Spanned<CaseClause>], ctx: &Ctx<'_, 'ast>) {
        for clause in clauses {
            let cctx = ctx.child(clause.id);
            self.exprs(&clause.node.exprs, &cctx);
            self.stmts(&clause.node.body, &cctx);
        }
    }

    fn select(&mut self, clauses: &'ast [Spanned<CommClause>], ctx: &Ctx<'_, 'ast>) {
        // Without a default clause the select waits for a communication.
        if clauses.iter().all(|c| c.node.comm.is_some()) {
            self.mark_blocking(ctx);
        }
        for clause in clauses {
            let cctx = ctx.child(clause.id);
            if let Some(comm) = &clause.node.comm {
                self.comm(comm, &cctx);
            }
            self.stmts(&clause.node.body, &cctx);
        }
    }

    /// Only the operands of a select case are evaluated outside the select.
    fn comm(&mut self, comm: &'ast Spanned<Stmt>, ctx: &Ctx<'_, 'ast>) {
        match &comm.node {
            Stmt::Send { chan, value } => {
                self.expr(chan, ctx);
                self.expr(value, ctx);
            }
            Stmt::Expr(e) => {
                if let Some(chan) = recv_operand(e) {
                    self.expr(chan, ctx);
                }
            }
            Stmt::Assign { rhs, .. } => {
                if let Some(chan) = rhs.first().and_then(recv_operand) {
                    self.expr(chan, ctx);
                }
            }
            _ => {}
        }
    }

    /// The goroutine body runs elsewhere; only the operands are evaluated
    /// here.
    fn go_stmt(&mut self, call: &'ast Spanned<Expr>, ctx: &Ctx<'_, 'ast>) {
        match &call.node {
            Expr::Call { fun, args, .. } => {
                self.expr(fun, ctx);
                self.exprs(args, ctx);
            }
            _ => self.expr(call, ctx),
        }
    }

    fn defer_stmt(&mut self, call: &'ast Spanned<Expr>, ctx: &Ctx<'_, 'ast>) {
        self.func().has_defer = true;
        let Expr::Call { fun, args, .. } = &call.node else {
            self.expr(call, ctx);
            return;
        };
        let call_ctx = ctx.child(call.id);
        let deferred = match self.call(fun, args, &call_ctx) {
            Target::Blocking => DeferStmt::Blocking,
            Target::Instance(inst) => DeferStmt::Instance(inst),
            Target::Lit(lit) => {
                let type_args = self.func().type_args().to_vec();
                DeferStmt::Lit { lit, type_args }
            }
            Target::NonBlocking => return,
        };
        self.func().defer_stmts.push(deferred);
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn exprs(&mut self, exprs: &'ast [Spanned<Expr>], ctx: &Ctx<'_, 'ast>) {
        for e in exprs {
            self.expr(e, ctx);
        }
    }

    fn expr(&mut self, e: &'ast Spanned<Expr>, parent: &Ctx<'_, 'ast>) {
        let ctx = &parent.child(e.id);
        match &e.node {
            Expr::FuncLit { body, .. } => self.func_lit(e.id, body),
            Expr::Call { fun, args, .. } => {
                self.call(fun, args, ctx);
            }
            Expr::Unary { op: UnaryOp::Recv, operand } => {
                self.mark_blocking(ctx);
                self.expr(operand, ctx);
            }
            Expr::Unary { op: UnaryOp::Addr, operand } => {
                if let Some(var) = self.addressed_var(operand) {
                    self.info.add_pointer(var);
                }
                self.expr(operand, ctx);
            }
            Expr::Unary { operand, .. } => self.expr(operand, ctx),
            Expr::CompositeLit { elts, .. } => self.exprs(elts, ctx),
            Expr::Paren(x) | Expr::Star(x) | Expr::Selector { x, .. } | Expr::TypeAssert { x, .. } => {
                self.expr(x, ctx)
            }
            Expr::Index { x, indices } => {
                self.expr(x, ctx);
                self.exprs(indices, ctx);
            }
            Expr::Slice { x, low, high, max } => {
                self.expr(x, ctx);
                for bound in [low, high, max].into_iter().flatten() {
                    self.expr(bound, ctx);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs, ctx);
                self.expr(rhs, ctx);
            }
            Expr::KeyValue { key, value } => {
                self.expr(key, ctx);
                self.expr(value, ctx);
            }
            Expr::Ident(_)
            | Expr::BasicLit { .. }
            | Expr::ArrayType { .. }
            | Expr::StructType(_)
            | Expr::FuncType(_)
            | Expr::InterfaceType(_)
            | Expr::MapType { .. }
            | Expr::ChanType { .. }
            | Expr::Ellipsis(_) => {}
        }
    }

    fn addressed_var(&self, operand: &Spanned<Expr>) -> Option<ObjId> {
        let operand = unparen(operand);
        if !matches!(operand.node, Expr::Ident(_)) {
            return None;
        }
        let obj = *self.types.uses.get(&operand.id)?;
        self.env.object(obj).is_var().then_some(obj)
    }

    fn is_chan(&self, e: &Spanned<Expr>) -> bool {
        self.types
            .type_of(e.id)
            .is_some_and(|ty| matches!(self.env.kind(self.env.underlying(ty)), TypeKind::Chan(..)))
    }

    /// Analyze a function literal as its own function, under the type
    /// arguments of the enclosing function.
    fn func_lit(&mut self, lit: NodeId, body: &'ast Spanned<Block>) {
        let type_args = self.func().type_args().to_vec();
        let index = self.info.add_lit(lit, type_args);
        let outer = std::mem::replace(&mut self.current, index);
        let outer_loop = self.loop_return_index.take();
        self.body(body);
        self.current = outer;
        self.loop_return_index = outer_loop;
    }

    // ── Calls ───────────────────────────────────────────────────────

    /// Record the call site of `fun(args)` and walk its operands. `ctx` is
    /// the frame of the call expression itself.
    fn call(&mut self, fun: &'ast Spanned<Expr>, args: &'ast [Spanned<Expr>], ctx: &Ctx<'_, 'ast>) -> Target {
        let types = self.types;
        let callee = unparen(fun);
        let target = match &callee.node {
            Expr::FuncLit { body, .. } => {
                self.func_lit(callee.id, body);
                self.exprs(args, ctx);
                let path = ctx.path();
                self.func().add_lit_callee(callee.id, path);
                return Target::Lit(callee.id);
            }
            Expr::Ident(_) => self.named_call(callee.id, ctx),
            Expr::Selector { sel, .. } => match types.selections.get(&callee.id) {
                Some(selection) => self.method_call(callee.id, selection, ctx),
                // Qualified identifier.
                None => self.named_call(sel.id, ctx),
            },
            Expr::Index { x, indices } => {
                if types.is_type_expr(callee.id) {
                    // Conversion to a generic type instance.
                    Target::NonBlocking
                } else if indices.first().is_some_and(|i| types.is_type_expr(i.id)) {
                    match callee_ident(x) {
                        Some(ident) => self.named_call(ident, ctx),
                        None => self.dynamic_call(ctx),
                    }
                } else {
                    // Function value from a slice or map.
                    self.dynamic_call(ctx)
                }
            }
            _ if types.is_type_expr(callee.id) || callee.node.is_type_literal() => Target::NonBlocking,
            _ => self.dynamic_call(ctx),
        };
        self.expr(fun, ctx);
        self.exprs(args, ctx);
        target
    }

    fn dynamic_call(&mut self, ctx: &Ctx<'_, 'ast>) -> Target {
        self.mark_blocking(ctx);
        Target::Blocking
    }

    /// Call through an identifier denoting a function, variable, builtin or
    /// type.
    fn named_call(&mut self, ident: NodeId, ctx: &Ctx<'_, 'ast>) -> Target {
        let types = self.types;
        let Some(&obj) = types.uses.get(&ident) else {
            return Target::NonBlocking;
        };
        let args: Vec<TypeId> = types.instances.get(&ident).map(|i| i.type_args.clone()).unwrap_or_default();
        let args = self.resolver.substitute_all(self.env, &args);
        self.call_to_named(Instance::with_args(obj, args), ctx)
    }

    fn method_call(&mut self, node: NodeId, selection: &Selection, ctx: &Ctx<'_, 'ast>) -> Target {
        if self.is_nonblocking_receiver(selection.recv) {
            return Target::NonBlocking;
        }
        if selection.kind == SelectionKind::FieldVal {
            // Function-typed struct field.
            return self.dynamic_call(ctx);
        }
        let concrete = self.resolver.substitute_selection(self.env, node, selection);
        let recv = self.env.deref(concrete.recv);
        if self.env.is_interface(recv) {
            return self.dynamic_call(ctx);
        }
        let inst = match self.env.named(recv) {
            Some(named) => {
                let recv_args = named.type_args.clone();
                let name = &self.env.object(concrete.obj).name;
                match self.env.lookup_method(recv, name) {
                    Some(method) => Instance::with_args(method, recv_args),
                    None => Instance::new(concrete.obj),
                }
            }
            None => Instance::new(concrete.obj),
        };
        self.call_to_named(inst, ctx)
    }

    fn is_nonblocking_receiver(&self, recv: TypeId) -> bool {
        let base = self.env.deref(recv);
        self.env
            .named(base)
            .is_some_and(|n| self.config.is_nonblocking_receiver(&self.env.qualified_name(n.obj)))
    }

    fn call_to_named(&mut self, inst: Instance, ctx: &Ctx<'_, 'ast>) -> Target {
        let object = self.env.object(inst.object);
        match object.kind {
            ObjKind::Func => {
                let iface_recv = self
                    .env
                    .signature_of(object.ty)
                    .and_then(|sig| sig.recv)
                    .is_some_and(|recv| self.env.is_interface(recv));
                if iface_recv {
                    // Method expression on an interface type.
                    return self.dynamic_call(ctx);
                }
                trace!(callee = %inst.display(self.env), "call site");
                let path = ctx.path();
                self.func().add_inst_callee(inst.clone(), path);
                Target::Instance(inst)
            }
            ObjKind::Var { .. } => self.dynamic_call(ctx),
            _ => Target::NonBlocking,
        }
    }
}

fn recv_operand(e: &Spanned<Expr>) -> Option<&Spanned<Expr>> {
    match &unparen(e).node {
        Expr::Unary { op: UnaryOp::Recv, operand } => Some(operand),
        _ => None,
    }
}

fn callee_ident(x: &Spanned<Expr>) -> Option<NodeId> {
    let x = unparen(x);
    match &x.node {
        Expr::Ident(_) => Some(x.id),
        Expr::Selector { sel, .. } => Some(sel.id),
        _ => None,
    }
}
