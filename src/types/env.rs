use std::collections::HashMap;

use crate::monomorphize::subst::Subster;
use crate::span::Span;

use super::ty::*;

/// Arena owning every type, object and package of a program.
///
/// Composite types are interned so identity is handle equality. Named types
/// and type parameters are nominal: each declaration gets its own node.
/// Instantiated named types are deduplicated through the instantiation cache.
#[derive(Debug, Clone)]
pub struct TypeEnv {
    types: Vec<TypeKind>,
    interned: HashMap<TypeKind, TypeId>,
    objects: Vec<Object>,
    packages: Vec<Package>,
    instantiations: HashMap<(TypeId, Vec<TypeId>), TypeId>,
    /// Copies of types declared inside generic functions, keyed by the local
    /// declaration and the enclosing function's type arguments.
    local_copies: HashMap<(TypeId, Vec<TypeId>), TypeId>,
    /// Instances whose origin was still a placeholder when requested.
    pending_expansions: Vec<TypeId>,
    builtins: HashMap<String, ObjId>,
    error_type: TypeId,
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeEnv {
    pub fn new() -> Self {
        let mut env = Self {
            types: Vec::new(),
            interned: HashMap::new(),
            objects: Vec::new(),
            packages: Vec::new(),
            instantiations: HashMap::new(),
            local_copies: HashMap::new(),
            pending_expansions: Vec::new(),
            builtins: HashMap::new(),
            error_type: TypeId::INVALID,
        };
        // Invalid must land on index 0.
        for kind in BasicKind::ALL {
            env.intern(TypeKind::Basic(kind));
        }
        let string = env.basic(BasicKind::String);
        let error_sig = env.signature(Signature::func(vec![], vec![string]));
        let error_iface = env.interface(
            vec![IfaceMethod { name: "Error".to_string(), sig: error_sig }],
            vec![],
        );
        let error_obj = env.new_type_name(None, "error", Span::dummy(), None);
        env.error_type = env.new_named(error_obj, Some(error_iface), vec![]);
        env
    }

    // ── Arena access ────────────────────────────────────────────────

    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.types[ty.0 as usize]
    }

    pub fn object(&self, obj: ObjId) -> &Object {
        &self.objects[obj.0 as usize]
    }

    pub fn package(&self, pkg: PkgId) -> &Package {
        &self.packages[pkg.0 as usize]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn named(&self, ty: TypeId) -> Option<&NamedType> {
        match self.kind(ty) {
            TypeKind::Named(n) => Some(n),
            _ => None,
        }
    }

    pub fn type_param(&self, ty: TypeId) -> Option<&TypeParam> {
        match self.kind(ty) {
            TypeKind::TypeParam(tp) => Some(tp),
            _ => None,
        }
    }

    pub fn signature_of(&self, ty: TypeId) -> Option<&Signature> {
        match self.kind(ty) {
            TypeKind::Signature(sig) => Some(sig),
            _ => None,
        }
    }

    fn push(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        id
    }

    /// Return the canonical handle for a composite type, creating it if
    /// needed. Nominal kinds always get a fresh node.
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if kind.is_nominal() {
            return self.push(kind);
        }
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = self.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    // ── Type constructors ───────────────────────────────────────────

    pub fn basic(&self, kind: BasicKind) -> TypeId {
        // Basics are interned first, in declaration order.
        TypeId(BasicKind::ALL.iter().position(|k| *k == kind).unwrap_or(0) as u32)
    }

    pub fn error_type(&self) -> TypeId {
        self.error_type
    }

    pub fn empty_interface(&mut self) -> TypeId {
        self.interface(vec![], vec![])
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Slice(elem))
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.intern(TypeKind::Array(elem, len))
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(TypeKind::Map(key, value))
    }

    pub fn chan(&mut self, dir: ChanDir, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Chan(dir, elem))
    }

    pub fn struct_type(&mut self, fields: Vec<Field>) -> TypeId {
        self.intern(TypeKind::Struct(fields))
    }

    pub fn signature(&mut self, sig: Signature) -> TypeId {
        self.intern(TypeKind::Signature(sig))
    }

    /// Build an interface type. Methods are sorted by name.
    pub fn interface(&mut self, mut methods: Vec<IfaceMethod>, embeddeds: Vec<TypeId>) -> TypeId {
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        self.intern(TypeKind::Interface(Interface { methods, embeddeds }))
    }

    pub fn union(&mut self, terms: Vec<Term>) -> TypeId {
        self.intern(TypeKind::Union(terms))
    }

    /// Create a named type for `obj`. Passing `None` for the underlying type
    /// creates a placeholder to be completed with [`TypeEnv::set_underlying`].
    pub fn new_named(
        &mut self,
        obj: ObjId,
        underlying: Option<TypeId>,
        type_params: Vec<TypeId>,
    ) -> TypeId {
        let id = self.push(TypeKind::Named(NamedType {
            obj,
            origin: None,
            type_params,
            type_args: Vec::new(),
            underlying,
            methods: Vec::new(),
        }));
        self.objects[obj.0 as usize].ty = id;
        id
    }

    /// Complete a placeholder named type and expand any instantiation of it
    /// that was requested in the meantime.
    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        match &mut self.types[named.0 as usize] {
            TypeKind::Named(n) => n.underlying = Some(underlying),
            other => panic!("set_underlying on non-named type {other:?}"),
        }
        let (ready, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending_expansions).into_iter().partition(|inst| {
                self.named(*inst).and_then(|n| n.origin) == Some(named)
            });
        self.pending_expansions = waiting;
        for inst in ready {
            self.expand(inst);
        }
    }

    pub fn set_type_params(&mut self, named: TypeId, type_params: Vec<TypeId>) {
        if let TypeKind::Named(n) = &mut self.types[named.0 as usize] {
            n.type_params = type_params;
        }
    }

    /// Create a type parameter together with its type name object.
    pub fn new_type_param(
        &mut self,
        pkg: Option<PkgId>,
        name: &str,
        index: usize,
        constraint: Option<TypeId>,
    ) -> TypeId {
        let obj = self.new_type_name(pkg, name, Span::dummy(), None);
        let id = self.push(TypeKind::TypeParam(TypeParam { obj, index, constraint }));
        self.objects[obj.0 as usize].ty = id;
        id
    }

    pub fn set_constraint(&mut self, type_param: TypeId, constraint: TypeId) {
        if let TypeKind::TypeParam(tp) = &mut self.types[type_param.0 as usize] {
            tp.constraint = Some(constraint);
        }
    }

    pub(crate) fn local_copy(&self, local: TypeId, context_args: &[TypeId]) -> Option<TypeId> {
        self.local_copies.get(&(local, context_args.to_vec())).copied()
    }

    pub(crate) fn register_local_copy(&mut self, local: TypeId, context_args: &[TypeId], copy: TypeId) {
        self.local_copies.insert((local, context_args.to_vec()), copy);
    }

    /// Return the instance of generic named type `origin` for `args`.
    ///
    /// Repeated requests for the same pair yield the same handle. The
    /// instance is registered before its underlying type is computed, so
    /// self-referential definitions terminate.
    pub fn instantiate(&mut self, origin: TypeId, args: &[TypeId]) -> TypeId {
        let origin = self.origin(origin);
        let key = (origin, args.to_vec());
        if let Some(&id) = self.instantiations.get(&key) {
            return id;
        }
        let Some(generic) = self.named(origin).cloned() else {
            panic!("cannot instantiate non-named type {}", self.type_string(origin));
        };
        assert_eq!(
            generic.type_params.len(),
            args.len(),
            "wrong number of type arguments for {}",
            self.type_string(origin)
        );
        let id = self.push(TypeKind::Named(NamedType {
            obj: generic.obj,
            origin: Some(origin),
            type_params: Vec::new(),
            type_args: args.to_vec(),
            underlying: None,
            methods: Vec::new(),
        }));
        self.instantiations.insert(key, id);
        if generic.underlying.is_some() {
            self.expand(id);
        } else {
            self.pending_expansions.push(id);
        }
        id
    }

    fn expand(&mut self, inst: TypeId) {
        let Some(named) = self.named(inst).cloned() else { return };
        let Some(origin) = named.origin else { return };
        let Some(generic) = self.named(origin).cloned() else { return };
        let Some(underlying) = generic.underlying else { return };
        let mut subster = Subster::new(&generic.type_params, &named.type_args, None);
        let expanded = subster.subst(self, underlying);
        if let TypeKind::Named(n) = &mut self.types[inst.0 as usize] {
            n.underlying = Some(expanded);
        }
    }

    // ── Objects and packages ────────────────────────────────────────

    pub fn add_package(&mut self, path: &str, name: &str) -> PkgId {
        let id = PkgId(self.packages.len() as u32);
        self.packages.push(Package { path: path.to_string(), name: name.to_string() });
        id
    }

    pub fn new_object(&mut self, object: Object) -> ObjId {
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn new_type_name(
        &mut self,
        pkg: Option<PkgId>,
        name: &str,
        span: Span,
        parent_func: Option<ObjId>,
    ) -> ObjId {
        self.new_object(Object {
            name: name.to_string(),
            pkg,
            kind: ObjKind::TypeName,
            ty: TypeId::INVALID,
            span,
            parent_func,
        })
    }

    pub fn new_func(&mut self, pkg: PkgId, name: &str, sig: TypeId, span: Span) -> ObjId {
        self.new_object(Object {
            name: name.to_string(),
            pkg: Some(pkg),
            kind: ObjKind::Func,
            ty: sig,
            span,
            parent_func: None,
        })
    }

    /// Declare a method on the origin named type `named`.
    pub fn new_method(
        &mut self,
        pkg: PkgId,
        named: TypeId,
        name: &str,
        sig: TypeId,
        span: Span,
    ) -> ObjId {
        let obj = self.new_func(pkg, name, sig, span);
        if let TypeKind::Named(n) = &mut self.types[named.0 as usize] {
            n.methods.push(obj);
        }
        obj
    }

    pub fn new_var(
        &mut self,
        pkg: Option<PkgId>,
        name: &str,
        ty: TypeId,
        parent_func: Option<ObjId>,
    ) -> ObjId {
        self.new_object(Object {
            name: name.to_string(),
            pkg,
            kind: ObjKind::Var { is_field: false, embedded: false },
            ty,
            span: Span::dummy(),
            parent_func,
        })
    }

    pub fn new_field(&mut self, pkg: Option<PkgId>, name: &str, ty: TypeId, embedded: bool) -> ObjId {
        self.new_object(Object {
            name: name.to_string(),
            pkg,
            kind: ObjKind::Var { is_field: true, embedded },
            ty,
            span: Span::dummy(),
            parent_func: None,
        })
    }

    pub fn new_const(&mut self, pkg: PkgId, name: &str, ty: TypeId) -> ObjId {
        self.new_object(Object {
            name: name.to_string(),
            pkg: Some(pkg),
            kind: ObjKind::Const,
            ty,
            span: Span::dummy(),
            parent_func: None,
        })
    }

    pub fn new_label(&mut self, pkg: PkgId, name: &str, parent_func: Option<ObjId>) -> ObjId {
        self.new_object(Object {
            name: name.to_string(),
            pkg: Some(pkg),
            kind: ObjKind::Label,
            ty: TypeId::INVALID,
            span: Span::dummy(),
            parent_func,
        })
    }

    pub fn new_pkg_name(&mut self, pkg: PkgId, name: &str) -> ObjId {
        self.new_object(Object {
            name: name.to_string(),
            pkg: Some(pkg),
            kind: ObjKind::PkgName,
            ty: TypeId::INVALID,
            span: Span::dummy(),
            parent_func: None,
        })
    }

    /// Universe-scope builtin function (`len`, `make`, `panic`, ...).
    pub fn builtin(&mut self, name: &str) -> ObjId {
        if let Some(&obj) = self.builtins.get(name) {
            return obj;
        }
        let obj = self.new_object(Object {
            name: name.to_string(),
            pkg: None,
            kind: ObjKind::Builtin,
            ty: TypeId::INVALID,
            span: Span::dummy(),
            parent_func: None,
        });
        self.builtins.insert(name.to_string(), obj);
        obj
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn underlying(&self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Named(n) => n.underlying.unwrap_or(TypeId::INVALID),
            TypeKind::TypeParam(tp) => match tp.constraint {
                Some(c) => self.underlying(c),
                None => ty,
            },
            _ => ty,
        }
    }

    pub fn is_interface(&self, ty: TypeId) -> bool {
        let under = self.underlying(ty);
        matches!(self.kind(under), TypeKind::Interface(_))
            && !matches!(self.kind(ty), TypeKind::TypeParam(_))
    }

    /// Strip one level of pointer indirection.
    pub fn deref(&self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Pointer(elem) => *elem,
            _ => ty,
        }
    }

    /// The generic declaration an instance came from, or the type itself.
    pub fn origin(&self, ty: TypeId) -> TypeId {
        self.named(ty).and_then(|n| n.origin).unwrap_or(ty)
    }

    pub fn type_args(&self, ty: TypeId) -> &[TypeId] {
        self.named(ty).map(|n| n.type_args.as_slice()).unwrap_or(&[])
    }

    /// Methods of a named type (those of the origin for instances).
    pub fn methods(&self, ty: TypeId) -> &[ObjId] {
        let origin = self.origin(ty);
        self.named(origin).map(|n| n.methods.as_slice()).unwrap_or(&[])
    }

    /// Find a declared method by name on `ty` or `*ty`.
    pub fn lookup_method(&self, ty: TypeId, name: &str) -> Option<ObjId> {
        let base = self.deref(ty);
        self.methods(base).iter().copied().find(|m| self.object(*m).name == name)
    }

    /// The named receiver type of a method signature, with pointers removed.
    pub fn recv_named(&self, sig: TypeId) -> Option<TypeId> {
        let recv = self.signature_of(sig)?.recv?;
        let base = self.deref(recv);
        self.named(base).map(|_| base)
    }

    /// Whether `obj` was declared locally inside function `func`.
    pub fn declared_within(&self, obj: ObjId, func: ObjId) -> bool {
        self.object(obj).parent_func == Some(func)
    }

    pub fn is_method(&self, obj: ObjId) -> bool {
        let o = self.object(obj);
        o.is_func() && self.signature_of(o.ty).is_some_and(|s| s.recv.is_some())
    }

    /// `pkgname.Name`, or just `Name` for universe objects.
    pub fn qualified_name(&self, obj: ObjId) -> String {
        let o = self.object(obj);
        match o.pkg {
            Some(pkg) => format!("{}.{}", self.package(pkg).name, o.name),
            None => o.name.clone(),
        }
    }

    /// Symbol name including the receiver for methods, e.g. `pkg.(*T).M`.
    pub fn symbol_name(&self, obj: ObjId) -> String {
        let o = self.object(obj);
        let Some(recv) = self.signature_of(o.ty).and_then(|s| s.recv) else {
            return self.qualified_name(obj);
        };
        let (is_ptr, base) = match self.kind(recv) {
            TypeKind::Pointer(elem) => (true, *elem),
            _ => (false, recv),
        };
        let recv_name = match self.named(base) {
            Some(n) => self.object(n.obj).name.clone(),
            None => self.type_string(base),
        };
        let pkg = o.pkg.map(|p| format!("{}.", self.package(p).name)).unwrap_or_default();
        if is_ptr {
            format!("{pkg}(*{recv_name}).{}", o.name)
        } else {
            format!("{pkg}{recv_name}.{}", o.name)
        }
    }

    pub fn type_list_string(&self, types: &[TypeId]) -> String {
        types.iter().map(|t| self.type_string(*t)).collect::<Vec<_>>().join(", ")
    }

    /// Render a type the way it would be written in source.
    pub fn type_string(&self, ty: TypeId) -> String {
        match self.kind(ty) {
            TypeKind::Basic(b) => b.name().to_string(),
            TypeKind::Named(n) => {
                let name = self.qualified_name(n.obj);
                if n.type_args.is_empty() {
                    name
                } else {
                    format!("{name}[{}]", self.type_list_string(&n.type_args))
                }
            }
            TypeKind::TypeParam(tp) => self.object(tp.obj).name.clone(),
            TypeKind::Pointer(elem) => format!("*{}", self.type_string(*elem)),
            TypeKind::Slice(elem) => format!("[]{}", self.type_string(*elem)),
            TypeKind::Array(elem, len) => format!("[{len}]{}", self.type_string(*elem)),
            TypeKind::Map(k, v) => {
                format!("map[{}]{}", self.type_string(*k), self.type_string(*v))
            }
            TypeKind::Chan(dir, elem) => {
                let prefix = match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                };
                format!("{prefix}{}", self.type_string(*elem))
            }
            TypeKind::Struct(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        if f.embedded {
                            self.type_string(f.ty)
                        } else {
                            format!("{} {}", f.name, self.type_string(f.ty))
                        }
                    })
                    .collect();
                format!("struct{{{}}}", parts.join("; "))
            }
            TypeKind::Signature(sig) => format!("func{}", self.signature_tail(sig)),
            TypeKind::Interface(iface) => {
                let mut parts: Vec<String> =
                    iface.embeddeds.iter().map(|e| self.type_string(*e)).collect();
                for m in &iface.methods {
                    let tail = self
                        .signature_of(m.sig)
                        .map(|s| self.signature_tail(s))
                        .unwrap_or_default();
                    parts.push(format!("{}{tail}", m.name));
                }
                if parts.is_empty() {
                    "interface{}".to_string()
                } else {
                    format!("interface{{{}}}", parts.join("; "))
                }
            }
            TypeKind::Union(terms) => terms
                .iter()
                .map(|t| {
                    let s = self.type_string(t.ty);
                    if t.tilde { format!("~{s}") } else { s }
                })
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    fn signature_tail(&self, sig: &Signature) -> String {
        let mut params: Vec<String> = sig.params.iter().map(|p| self.type_string(*p)).collect();
        if sig.variadic
            && let Some(last) = params.last_mut()
            && let Some(stripped) = last.strip_prefix("[]")
        {
            *last = format!("...{stripped}");
        }
        let results: Vec<String> = sig.results.iter().map(|r| self.type_string(*r)).collect();
        let results = match results.len() {
            0 => String::new(),
            1 => format!(" {}", results[0]),
            _ => format!(" ({})", results.join(", ")),
        };
        format!("({}){results}", params.join(", "))
    }
}
