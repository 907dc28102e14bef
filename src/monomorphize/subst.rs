//! Type substitution: replace type parameters with type arguments throughout
//! a type, producing a parameter-free copy.

use std::collections::HashMap;

use crate::types::*;

/// A substitution of a set of type parameters within the context of one
/// (possibly generic) function.
///
/// Named types declared inside `origin` are unique to each set of type
/// arguments: substituting a local type yields a fresh declaration per
/// binding, shared program-wide through the [`TypeEnv`] local copy cache.
#[derive(Debug, Clone, Default)]
pub struct Subster {
    replacements: HashMap<TypeId, TypeId>,
    /// Replacement targets in parameter order; identifies the binding.
    context_args: Vec<TypeId>,
    cache: HashMap<TypeId, TypeId>,
    origin: Option<ObjId>,
}

impl Subster {
    /// Replace `params[i]` with `args[i]`. `origin` is the generic function
    /// whose body the substituted types come from, if any. Later entries win
    /// when a parameter is listed twice.
    pub fn new(params: &[TypeId], args: &[TypeId], origin: Option<ObjId>) -> Self {
        assert_eq!(params.len(), args.len(), "substitution argument count must match");
        Self {
            replacements: params.iter().copied().zip(args.iter().copied()).collect(),
            context_args: args.to_vec(),
            cache: HashMap::new(),
            origin,
        }
    }

    /// Override the arguments identifying this binding for local type
    /// copies. Defaults to all replacement targets.
    pub fn with_context_args(mut self, context_args: Vec<TypeId>) -> Self {
        self.context_args = context_args;
        self
    }

    pub fn context_args(&self) -> &[TypeId] {
        &self.context_args
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn origin(&self) -> Option<ObjId> {
        self.origin
    }

    pub fn replacement(&self, param: TypeId) -> Option<TypeId> {
        self.replacements.get(&param).copied()
    }

    pub fn subst_list(&mut self, env: &mut TypeEnv, types: &[TypeId]) -> Vec<TypeId> {
        types.iter().map(|t| self.subst(env, *t)).collect()
    }

    /// Substitute within `ty`. Returns `ty` itself when nothing changes.
    pub fn subst(&mut self, env: &mut TypeEnv, ty: TypeId) -> TypeId {
        if self.replacements.is_empty() {
            return ty;
        }
        if let Some(&r) = self.cache.get(&ty) {
            return r;
        }
        let result = self.subst_uncached(env, ty);
        self.cache.insert(ty, result);
        result
    }

    fn subst_uncached(&mut self, env: &mut TypeEnv, ty: TypeId) -> TypeId {
        match env.kind(ty).clone() {
            TypeKind::Basic(_) => ty,
            TypeKind::TypeParam(_) => self.replacements.get(&ty).copied().unwrap_or(ty),
            TypeKind::Pointer(elem) => {
                let r = self.subst(env, elem);
                if r == elem { ty } else { env.pointer(r) }
            }
            TypeKind::Slice(elem) => {
                let r = self.subst(env, elem);
                if r == elem { ty } else { env.slice(r) }
            }
            TypeKind::Array(elem, len) => {
                let r = self.subst(env, elem);
                if r == elem { ty } else { env.array(r, len) }
            }
            TypeKind::Chan(dir, elem) => {
                let r = self.subst(env, elem);
                if r == elem { ty } else { env.chan(dir, r) }
            }
            TypeKind::Map(key, value) => {
                let k = self.subst(env, key);
                let v = self.subst(env, value);
                if k == key && v == value { ty } else { env.map(k, v) }
            }
            TypeKind::Struct(fields) => {
                let mut changed = false;
                let new_fields: Vec<Field> = fields
                    .iter()
                    .map(|f| {
                        let r = self.subst(env, f.ty);
                        changed |= r != f.ty;
                        Field { ty: r, ..f.clone() }
                    })
                    .collect();
                if changed { env.struct_type(new_fields) } else { ty }
            }
            TypeKind::Union(terms) => {
                let mut changed = false;
                let new_terms: Vec<Term> = terms
                    .iter()
                    .map(|t| {
                        let r = self.subst(env, t.ty);
                        changed |= r != t.ty;
                        Term { tilde: t.tilde, ty: r }
                    })
                    .collect();
                if changed { env.union(new_terms) } else { ty }
            }
            TypeKind::Signature(sig) => self.signature(env, ty, &sig),
            TypeKind::Interface(iface) => self.interface(env, ty, &iface),
            TypeKind::Named(named) => self.named(env, ty, &named),
        }
    }

    fn signature(&mut self, env: &mut TypeEnv, ty: TypeId, sig: &Signature) -> TypeId {
        let rebuilt = self.subst_signature(env, sig);
        if rebuilt == *sig { ty } else { env.signature(rebuilt) }
    }

    fn subst_signature(&mut self, env: &mut TypeEnv, sig: &Signature) -> Signature {
        let recv = sig.recv.map(|r| self.subst(env, r));
        let params = self.subst_list(env, &sig.params);
        let results = self.subst_list(env, &sig.results);
        // Bound parameters disappear from the substituted signature.
        let unbound = |tps: &[TypeId]| -> Vec<TypeId> {
            tps.iter().copied().filter(|tp| !self.replacements.contains_key(tp)).collect()
        };
        Signature {
            recv,
            recv_type_params: unbound(&sig.recv_type_params),
            type_params: unbound(&sig.type_params),
            params,
            results,
            variadic: sig.variadic,
        }
    }

    /// Substitute an interface method signature. A rebuilt signature drops
    /// its receiver; an untouched one is returned as is.
    fn method_signature(&mut self, env: &mut TypeEnv, sig: TypeId) -> TypeId {
        match env.signature_of(sig).cloned() {
            Some(s) if s.recv.is_some() => {
                let stripped = Signature { recv: None, ..s };
                let rebuilt = self.subst_signature(env, &stripped);
                if rebuilt == stripped { sig } else { env.signature(rebuilt) }
            }
            _ => self.subst(env, sig),
        }
    }

    fn interface(&mut self, env: &mut TypeEnv, ty: TypeId, iface: &Interface) -> TypeId {
        let mut changed = false;
        let mut methods = Vec::with_capacity(iface.methods.len());
        for m in &iface.methods {
            let sig = self.method_signature(env, m.sig);
            changed |= sig != m.sig;
            methods.push(IfaceMethod { name: m.name.clone(), sig });
        }
        let embeddeds: Vec<TypeId> = iface
            .embeddeds
            .iter()
            .map(|e| {
                let r = self.subst(env, *e);
                changed |= r != *e;
                r
            })
            .collect();
        if changed { env.interface(methods, embeddeds) } else { ty }
    }

    fn named(&mut self, env: &mut TypeEnv, ty: TypeId, named: &NamedType) -> TypeId {
        let local = self.origin.is_some_and(|f| env.declared_within(named.obj, f));

        if !local {
            // The underlying type cannot mention our parameters; only the
            // type arguments can.
            if named.type_args.is_empty() {
                return ty;
            }
            let args = self.subst_list(env, &named.type_args);
            if args == named.type_args {
                return ty;
            }
            return env.instantiate(named.origin.unwrap_or(ty), &args);
        }

        if named.type_args.is_empty() {
            return self.local_copy(env, ty, named);
        }

        let origin = self.subst(env, named.origin.unwrap_or(ty));
        let args = self.subst_list(env, &named.type_args);
        env.instantiate(origin, &args)
    }

    /// Copy a type declared inside the generic function being substituted.
    ///
    /// The copy is registered before its underlying type is substituted, so
    /// references to the type from its own definition resolve to the copy.
    fn local_copy(&mut self, env: &mut TypeEnv, ty: TypeId, named: &NamedType) -> TypeId {
        if let Some(copy) = env.local_copy(ty, &self.context_args) {
            self.cache.insert(ty, copy);
            return copy;
        }
        let decl = env.object(named.obj).clone();
        // The copy is concrete for this binding and never localized again.
        let obj = env.new_object(Object { ty: TypeId::INVALID, parent_func: None, ..decl });
        let fresh = env.new_named(obj, None, Vec::new());
        env.register_local_copy(ty, &self.context_args, fresh);
        self.cache.insert(ty, fresh);
        self.cache.insert(fresh, fresh);

        let mut fresh_params = Vec::with_capacity(named.type_params.len());
        for (index, tp) in named.type_params.iter().enumerate() {
            let tp_obj = env.type_param(*tp).map(|p| p.obj);
            let (pkg, name) = match tp_obj {
                Some(o) => (env.object(o).pkg, env.object(o).name.clone()),
                None => (decl_pkg(env, obj), format!("T{index}")),
            };
            fresh_params.push(env.new_type_param(pkg, &name, index, None));
        }
        env.set_type_params(fresh, fresh_params.clone());

        // The copy stays generic over its own parameters even when this
        // substitution binds them.
        let mut inner = Subster {
            replacements: self.replacements.clone(),
            context_args: self.context_args.clone(),
            cache: HashMap::new(),
            origin: self.origin,
        };
        inner.replacements.extend(named.type_params.iter().copied().zip(fresh_params.iter().copied()));
        inner.cache.insert(ty, fresh);

        let underlying = named.underlying.unwrap_or(TypeId::INVALID);
        let substituted = inner.subst(env, underlying);
        env.set_underlying(fresh, substituted);

        for (old, new) in named.type_params.iter().zip(&fresh_params) {
            if let Some(bound) = env.type_param(*old).and_then(|p| p.constraint) {
                let bound = inner.subst(env, bound);
                env.set_constraint(*new, bound);
            }
        }
        fresh
    }
}

fn decl_pkg(env: &TypeEnv, obj: ObjId) -> Option<PkgId> {
    env.object(obj).pkg
}
