#![allow(dead_code)]

use goflat::ast::{AssignOp, Decl, Expr, Stmt};
use goflat::builder::ProgramBuilder;
use goflat::config::AnalysisConfig;
use goflat::diagnostics::AnalysisError;
use goflat::monomorphize::Instance;
use goflat::span::Spanned;
use goflat::types::{BasicKind, ChanDir, Field, ObjId, PkgId, Signature, TypeEnv, TypeId};
use goflat::{analyze_program, ProgramAnalysis};

/// Builds small typed Go programs for end-to-end analysis.
pub struct Go {
    pub b: ProgramBuilder,
}

impl Go {
    pub fn new() -> Self {
        Self { b: ProgramBuilder::new() }
    }

    pub fn package(&mut self, path: &str, name: &str) -> PkgId {
        self.b.package(path, name)
    }

    pub fn env(&mut self) -> &mut TypeEnv {
        self.b.env()
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        self.b.env().basic(kind)
    }

    pub fn void_sig(&mut self) -> TypeId {
        self.b.env().signature(Signature::default())
    }

    /// Signature of `func[T any]()` with a fresh `T` owned by `pkg`.
    pub fn generic_sig(&mut self, pkg: PkgId, name: &str) -> (TypeId, TypeId) {
        let env = self.b.env();
        let t = env.new_type_param(Some(pkg), name, 0, None);
        let sig = env.signature(Signature { type_params: vec![t], ..Signature::default() });
        (sig, t)
    }

    /// A package-level `chan int` variable.
    pub fn chan_var(&mut self, pkg: PkgId, name: &str) -> ObjId {
        let env = self.b.env();
        let int = env.basic(BasicKind::Int);
        let ch = env.chan(ChanDir::Both, int);
        self.b.package_var(pkg, name, ch, None)
    }

    /// `<-c`
    pub fn recv_stmt(&mut self, pkg: PkgId, chan: ObjId) -> Spanned<Stmt> {
        let c = self.b.use_obj(pkg, chan);
        let r = self.b.recv(c);
        self.b.expr_stmt(r)
    }

    /// `f()`
    pub fn call_stmt(&mut self, pkg: PkgId, func: ObjId) -> Spanned<Stmt> {
        let call = self.b.call_obj(pkg, func);
        self.b.expr_stmt(call)
    }

    /// `f[args...]()`
    pub fn call_inst_stmt(&mut self, pkg: PkgId, func: ObjId, args: &[TypeId]) -> Spanned<Stmt> {
        let fun = self.b.use_inst(pkg, func, args);
        let call = self.b.call(fun, Vec::new());
        self.b.expr_stmt(call)
    }

    /// `defer f()`
    pub fn defer_stmt(&mut self, pkg: PkgId, func: ObjId) -> Spanned<Stmt> {
        let call = self.b.call_obj(pkg, func);
        self.b.defer(call)
    }

    /// `func name() { body }`
    pub fn func(&mut self, pkg: PkgId, name: &str, body: Vec<Spanned<Stmt>>) -> ObjId {
        let sig = self.void_sig();
        self.b.func(pkg, name, sig, Some(body))
    }

    /// Declare `type name struct{...}` with the given fields.
    pub fn struct_type(&mut self, pkg: PkgId, name: &str, fields: Vec<Field>) -> (ObjId, TypeId) {
        let env = self.b.env();
        let under = env.struct_type(fields);
        self.named(pkg, name, Vec::new(), under)
    }

    /// Declare `type name[params] under`.
    pub fn named(&mut self, pkg: PkgId, name: &str, params: Vec<TypeId>, under: TypeId) -> (ObjId, TypeId) {
        let env = self.b.env();
        let obj = env.new_type_name(Some(pkg), name, goflat::span::Span::dummy(), None);
        let ty = env.new_named(obj, Some(under), params);
        let ty_expr = self.b.type_expr(pkg, Expr::Ident(name.to_string()), under);
        self.b.type_decl(pkg, obj, ty_expr);
        (obj, ty)
    }

    /// `var name = T[args]{}` at package level, which instantiates `T`.
    pub fn use_type(&mut self, pkg: PkgId, name: &str, ty: ObjId, args: &[TypeId]) -> ObjId {
        let fun = self.b.use_inst(pkg, ty, args);
        let inst_ty = self.b.info(pkg).type_of(fun.id).unwrap_or(TypeId::INVALID);
        let lit = self.b.spanned(Expr::CompositeLit { ty: Some(Box::new(fun)), elts: Vec::new() });
        self.b.info(pkg).record_type(lit.id, inst_ty);
        self.b.package_var(pkg, name, inst_ty, Some(lit))
    }

    /// `type name struct{...}` declared inside function `func`.
    pub fn local_struct(
        &mut self,
        pkg: PkgId,
        func: ObjId,
        name: &str,
        fields: Vec<Field>,
    ) -> (ObjId, TypeId, Spanned<Stmt>) {
        let env = self.b.env();
        let under = env.struct_type(fields);
        let obj = env.new_type_name(Some(pkg), name, goflat::span::Span::dummy(), Some(func));
        let ty = env.new_named(obj, Some(under), Vec::new());
        let ty_expr = self.b.type_expr(pkg, Expr::Ident(name.to_string()), under);
        let spec = self.b.type_spec(pkg, obj, ty_expr);
        (obj, ty, self.b.stmt(Stmt::Decl(Decl::Type(spec))))
    }

    /// `_ = T[args]{}`
    pub fn discard_lit(&mut self, pkg: PkgId, ty: ObjId, args: &[TypeId]) -> Spanned<Stmt> {
        let fun = self.b.use_inst(pkg, ty, args);
        let inst_ty = self.b.info(pkg).type_of(fun.id).unwrap_or(TypeId::INVALID);
        let lit = self.b.spanned(Expr::CompositeLit { ty: Some(Box::new(fun)), elts: Vec::new() });
        self.b.info(pkg).record_type(lit.id, inst_ty);
        let blank = self.b.spanned(Expr::Ident("_".to_string()));
        self.b.stmt(Stmt::Assign { lhs: vec![blank], op: AssignOp::Assign, rhs: vec![lit] })
    }

    pub fn analyze(self) -> ProgramAnalysis {
        self.analyze_with(&AnalysisConfig::default()).unwrap()
    }

    pub fn analyze_with(self, config: &AnalysisConfig) -> Result<ProgramAnalysis, AnalysisError> {
        analyze_program(self.b.finish(), config)
    }
}

pub fn blocking(analysis: &ProgramAnalysis, func: ObjId) -> bool {
    analysis.is_blocking(&Instance::new(func))
}
