//! Programmatic construction of typed programs.
//!
//! Front ends (and tests) use [`ProgramBuilder`] to emit AST nodes with fresh
//! node ids while recording the matching type checker side tables.

use crate::ast::*;
use crate::monomorphize::{instance_type, Instance};
use crate::program::{PackageUnit, Program};
use crate::span::{NodeIdGen, Span, Spanned};
use crate::types::*;

pub struct ProgramBuilder {
    env: TypeEnv,
    ids: NodeIdGen,
    units: Vec<PackageUnit>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self { env: TypeEnv::new(), ids: NodeIdGen::new(), units: Vec::new() }
    }

    pub fn env(&mut self) -> &mut TypeEnv {
        &mut self.env
    }

    /// Register a package with a single, initially empty file.
    pub fn package(&mut self, path: &str, name: &str) -> PkgId {
        let pkg = self.env.add_package(path, name);
        let file = File { name: format!("{name}.go"), decls: Vec::new() };
        self.units.push(PackageUnit::new(pkg, vec![file], TypeInfo::new()));
        pkg
    }

    fn unit(&mut self, pkg: PkgId) -> &mut PackageUnit {
        match self.units.iter_mut().find(|u| u.pkg == pkg) {
            Some(unit) => unit,
            None => panic!("package {pkg:?} was not registered with the builder"),
        }
    }

    pub fn info(&mut self, pkg: PkgId) -> &mut TypeInfo {
        &mut self.unit(pkg).info
    }

    /// Append a top-level declaration to the package's file.
    pub fn decl(&mut self, pkg: PkgId, decl: Decl) {
        self.unit(pkg).files[0].decls.push(decl);
    }

    pub fn spanned<T>(&mut self, node: T) -> Spanned<T> {
        Spanned::new(self.ids.fresh(), node, Span::dummy())
    }

    pub fn ident(&mut self, name: &str) -> Ident {
        self.spanned(name.to_string())
    }

    pub fn finish(self) -> Program {
        Program { env: self.env, packages: self.units }
    }

    // ── Expressions ─────────────────────────────────────────────────

    /// An expression with a recorded value type.
    pub fn typed(&mut self, pkg: PkgId, node: Expr, ty: TypeId) -> Spanned<Expr> {
        let e = self.spanned(node);
        self.info(pkg).record_type(e.id, ty);
        e
    }

    /// An expression denoting the type `ty`.
    pub fn type_expr(&mut self, pkg: PkgId, node: Expr, ty: TypeId) -> Spanned<Expr> {
        let e = self.spanned(node);
        self.info(pkg).record_type_expr(e.id, ty);
        e
    }

    /// An identifier referring to `obj`.
    pub fn use_obj(&mut self, pkg: PkgId, obj: ObjId) -> Spanned<Expr> {
        let object = self.env.object(obj).clone();
        let e = self.spanned(Expr::Ident(object.name));
        let info = self.info(pkg);
        info.uses.insert(e.id, obj);
        if object.kind == ObjKind::TypeName {
            info.record_type_expr(e.id, object.ty);
        } else if object.ty != TypeId::INVALID {
            info.record_type(e.id, object.ty);
        }
        e
    }

    /// An identifier referring to generic `obj` instantiated with `args`.
    pub fn use_inst(&mut self, pkg: PkgId, obj: ObjId, args: &[TypeId]) -> Spanned<Expr> {
        let ty = instance_type(&mut self.env, &Instance::with_args(obj, args.to_vec()));
        self.use_inst_typed(pkg, obj, args, ty)
    }

    /// Like [`use_inst`](Self::use_inst) with an explicitly given instance
    /// type.
    pub fn use_inst_typed(&mut self, pkg: PkgId, obj: ObjId, args: &[TypeId], ty: TypeId) -> Spanned<Expr> {
        let object = self.env.object(obj).clone();
        let e = self.spanned(Expr::Ident(object.name));
        let info = self.info(pkg);
        info.uses.insert(e.id, obj);
        info.instances.insert(e.id, InstanceInfo { type_args: args.to_vec(), ty });
        if object.kind == ObjKind::TypeName {
            info.record_type_expr(e.id, ty);
        } else {
            info.record_type(e.id, ty);
        }
        e
    }

    pub fn call(&mut self, fun: Spanned<Expr>, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
        self.spanned(Expr::Call { fun: Box::new(fun), args, ellipsis: false })
    }

    /// Call the function object `obj` with no arguments.
    pub fn call_obj(&mut self, pkg: PkgId, obj: ObjId) -> Spanned<Expr> {
        let fun = self.use_obj(pkg, obj);
        self.call(fun, Vec::new())
    }

    /// `<-chan`
    pub fn recv(&mut self, chan: Spanned<Expr>) -> Spanned<Expr> {
        self.spanned(Expr::Unary { op: UnaryOp::Recv, operand: Box::new(chan) })
    }

    /// `&x`
    pub fn addr(&mut self, x: Spanned<Expr>) -> Spanned<Expr> {
        self.spanned(Expr::Unary { op: UnaryOp::Addr, operand: Box::new(x) })
    }

    /// `x.name` selecting a method of `recv`.
    pub fn method_value(&mut self, pkg: PkgId, x: Spanned<Expr>, method: ObjId, recv: TypeId) -> Spanned<Expr> {
        let ty = self.env.object(method).ty;
        self.selection(pkg, x, method, Selection { kind: SelectionKind::MethodVal, recv, obj: method, ty })
    }

    /// `x.name` selecting a struct field of `recv`.
    pub fn field_value(&mut self, pkg: PkgId, x: Spanned<Expr>, field: ObjId, recv: TypeId) -> Spanned<Expr> {
        let ty = self.env.object(field).ty;
        self.selection(pkg, x, field, Selection { kind: SelectionKind::FieldVal, recv, obj: field, ty })
    }

    fn selection(&mut self, pkg: PkgId, x: Spanned<Expr>, obj: ObjId, selection: Selection) -> Spanned<Expr> {
        let name = self.env.object(obj).name.clone();
        let sel = self.ident(&name);
        let ty = selection.ty;
        let e = self.spanned(Expr::Selector { x: Box::new(x), sel });
        let info = self.info(pkg);
        if let Expr::Selector { sel, .. } = &e.node {
            info.uses.insert(sel.id, obj);
        }
        info.selections.insert(e.id, selection);
        info.record_type(e.id, ty);
        e
    }

    /// `func() { stmts }`
    pub fn func_lit(&mut self, stmts: Vec<Spanned<Stmt>>) -> Spanned<Expr> {
        let body = self.block(stmts);
        self.spanned(Expr::FuncLit { ty: FuncType::default(), body })
    }

    // ── Statements ──────────────────────────────────────────────────

    pub fn stmt(&mut self, stmt: Stmt) -> Spanned<Stmt> {
        self.spanned(stmt)
    }

    pub fn expr_stmt(&mut self, e: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Expr(e))
    }

    pub fn send(&mut self, chan: Spanned<Expr>, value: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Send { chan, value })
    }

    pub fn ret(&mut self) -> Spanned<Stmt> {
        self.stmt(Stmt::Return(Vec::new()))
    }

    pub fn defer(&mut self, call: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Defer(call))
    }

    pub fn go(&mut self, call: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Go(call))
    }

    pub fn block(&mut self, stmts: Vec<Spanned<Stmt>>) -> Spanned<Block> {
        self.spanned(Block { stmts })
    }

    pub fn if_stmt(&mut self, cond: Spanned<Expr>, then: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
        let then_block = self.block(then);
        self.stmt(Stmt::If { init: None, cond, then_block, else_branch: None })
    }

    /// `for ; ; post { body }`
    pub fn for_loop(&mut self, post: Option<Spanned<Stmt>>, body: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
        let body = self.block(body);
        self.stmt(Stmt::For { init: None, cond: None, post: post.map(Box::new), body })
    }

    /// `for range x { body }`
    pub fn range(&mut self, x: Spanned<Expr>, body: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
        let body = self.block(body);
        self.stmt(Stmt::Range { key: None, value: None, define: false, x, body })
    }

    /// A `select` statement; a clause without a communication is `default`.
    pub fn select(&mut self, clauses: Vec<(Option<Spanned<Stmt>>, Vec<Spanned<Stmt>>)>) -> Spanned<Stmt> {
        let clauses = clauses
            .into_iter()
            .map(|(comm, body)| self.spanned(CommClause { comm: comm.map(Box::new), body }))
            .collect();
        self.stmt(Stmt::Select { clauses })
    }

    /// `break`, `continue` or `goto`, optionally to `label`.
    pub fn branch(&mut self, pkg: PkgId, kind: BranchKind, label: Option<ObjId>) -> Spanned<Stmt> {
        let label = label.map(|obj| {
            let name = self.env.object(obj).name.clone();
            let ident = self.ident(&name);
            self.info(pkg).uses.insert(ident.id, obj);
            ident
        });
        self.stmt(Stmt::Branch { kind, label })
    }

    pub fn labeled(&mut self, pkg: PkgId, label: ObjId, stmt: Spanned<Stmt>) -> Spanned<Stmt> {
        let name = self.env.object(label).name.clone();
        let ident = self.ident(&name);
        self.info(pkg).defs.insert(ident.id, label);
        self.stmt(Stmt::Labeled { label: ident, stmt: Box::new(stmt) })
    }

    // ── Declarations ────────────────────────────────────────────────

    /// Declare a package-level function with signature `sig`.
    pub fn func(&mut self, pkg: PkgId, name: &str, sig: TypeId, body: Option<Vec<Spanned<Stmt>>>) -> ObjId {
        let obj = self.env.new_func(pkg, name, sig, Span::dummy());
        self.declare_func(pkg, obj, body);
        obj
    }

    /// Declare a method on the origin named type `named`.
    pub fn method(
        &mut self,
        pkg: PkgId,
        named: TypeId,
        name: &str,
        sig: TypeId,
        body: Option<Vec<Spanned<Stmt>>>,
    ) -> ObjId {
        let obj = self.env.new_method(pkg, named, name, sig, Span::dummy());
        self.declare_func(pkg, obj, body);
        obj
    }

    /// Emit the declaration of an existing function or method object.
    pub fn declare_func(&mut self, pkg: PkgId, obj: ObjId, body: Option<Vec<Spanned<Stmt>>>) {
        let decl = self.func_decl(pkg, obj, body);
        self.decl(pkg, Decl::Func(decl));
    }

    pub fn func_decl(&mut self, pkg: PkgId, obj: ObjId, body: Option<Vec<Spanned<Stmt>>>) -> Spanned<FuncDecl> {
        let object = self.env.object(obj).clone();
        let sig = self.env.signature_of(object.ty).cloned().unwrap_or_default();
        let name = self.ident(&object.name);
        self.info(pkg).defs.insert(name.id, obj);
        let recv = match sig.recv {
            Some(recv) => {
                let ty = self.recv_type_expr(pkg, recv, &sig.recv_type_params);
                let names = vec![self.ident("r")];
                Some(FieldDecl { names, ty })
            }
            None => None,
        };
        let type_params = self.type_param_decls(pkg, &sig.type_params);
        let body = body.map(|stmts| self.block(stmts));
        let ty = FuncType { type_params, params: Vec::new(), results: Vec::new() };
        self.spanned(FuncDecl { name, recv, ty, body })
    }

    fn recv_type_expr(&mut self, pkg: PkgId, recv: TypeId, type_params: &[TypeId]) -> Spanned<Expr> {
        let base = self.env.deref(recv);
        let named = self.env.named(base).map(|n| n.obj);
        let mut ty = match named {
            Some(obj) => self.use_obj(pkg, obj),
            None => self.type_expr(pkg, Expr::Ident("_".to_string()), base),
        };
        if !type_params.is_empty() {
            let indices = type_params
                .iter()
                .map(|tp| {
                    let name = self.type_param_name(*tp);
                    self.type_expr(pkg, Expr::Ident(name), *tp)
                })
                .collect();
            ty = self.type_expr(pkg, Expr::Index { x: Box::new(ty), indices }, base);
        }
        if base != recv {
            ty = self.type_expr(pkg, Expr::Star(Box::new(ty)), recv);
        }
        ty
    }

    fn type_param_name(&self, tp: TypeId) -> String {
        match self.env.type_param(tp) {
            Some(p) => self.env.object(p.obj).name.clone(),
            None => "_".to_string(),
        }
    }

    fn type_param_decls(&mut self, pkg: PkgId, type_params: &[TypeId]) -> Vec<FieldDecl> {
        type_params
            .iter()
            .map(|tp| {
                let name = self.type_param_name(*tp);
                let ident = self.ident(&name);
                if let Some(p) = self.env.type_param(*tp) {
                    let obj = p.obj;
                    self.info(pkg).defs.insert(ident.id, obj);
                }
                let any = self.spanned(Expr::Ident("any".to_string()));
                FieldDecl { names: vec![ident], ty: any }
            })
            .collect()
    }

    /// The declaration of type name `obj`; type parameters are taken from its
    /// named type.
    pub fn type_spec(&mut self, pkg: PkgId, obj: ObjId, ty: Spanned<Expr>) -> Spanned<TypeSpec> {
        let object = self.env.object(obj).clone();
        let type_params = self.env.named(object.ty).map(|n| n.type_params.clone()).unwrap_or_default();
        let name = self.ident(&object.name);
        self.info(pkg).defs.insert(name.id, obj);
        let type_params = self.type_param_decls(pkg, &type_params);
        self.spanned(TypeSpec { name, type_params, alias: false, ty })
    }

    pub fn type_decl(&mut self, pkg: PkgId, obj: ObjId, ty: Spanned<Expr>) {
        let spec = self.type_spec(pkg, obj, ty);
        self.decl(pkg, Decl::Type(spec));
    }

    /// Declare a package-level variable, optionally initialized.
    pub fn package_var(&mut self, pkg: PkgId, name: &str, ty: TypeId, value: Option<Spanned<Expr>>) -> ObjId {
        let obj = self.env.new_var(Some(pkg), name, ty, None);
        let ident = self.ident(name);
        self.info(pkg).defs.insert(ident.id, obj);
        let spec = self.spanned(ValueSpec { names: vec![ident], ty: None, values: value.into_iter().collect() });
        self.decl(pkg, Decl::Var(spec));
        obj
    }
}
