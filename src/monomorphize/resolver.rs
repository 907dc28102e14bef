use std::collections::HashMap;

use crate::span::NodeId;
use crate::types::{ObjId, Selection, SelectionKind, Signature, TypeEnv, TypeId, TypeKind};

use super::instance::Instance;
use super::subst::Subster;

/// Translates types written in terms of type parameters into concrete types
/// for one root instance.
///
/// A resolver created with [`Resolver::nested`] consults its own bindings
/// first and falls back to its parent's for the parameters it does not own.
/// A resolver without bindings is the identity.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    type_params: Vec<TypeId>,
    type_args: Vec<TypeId>,
    nest: Option<ObjId>,
    nest_type_params: Vec<TypeId>,
    nest_type_args: Vec<TypeId>,
    /// Parent bindings first, own bindings last.
    replacements: Vec<(TypeId, TypeId)>,
    subster: Subster,
    sel_memo: HashMap<NodeId, Selection>,
}

/// Type parameters of a function or method, receiver parameters first.
pub fn signature_type_params(sig: &Signature) -> Vec<TypeId> {
    sig.recv_type_params.iter().chain(&sig.type_params).copied().collect()
}

impl Resolver {
    /// The no-op resolver.
    pub fn identity() -> Self {
        Self::default()
    }

    fn build(
        type_params: Vec<TypeId>,
        type_args: Vec<TypeId>,
        nest: Option<ObjId>,
        nest_type_params: Vec<TypeId>,
        nest_type_args: Vec<TypeId>,
        replacements: Vec<(TypeId, TypeId)>,
        context_args: Vec<TypeId>,
    ) -> Self {
        let (params, args): (Vec<TypeId>, Vec<TypeId>) = replacements.iter().copied().unzip();
        let subster = Subster::new(&params, &args, nest).with_context_args(context_args);
        Self {
            type_params,
            type_args,
            nest,
            nest_type_params,
            nest_type_args,
            replacements,
            subster,
            sel_memo: HashMap::new(),
        }
    }

    /// Resolver binding `type_params` to `type_args` inside function `nest`
    /// (the generic function whose body is being specialized), if any.
    pub fn new(type_params: Vec<TypeId>, type_args: Vec<TypeId>, nest: Option<ObjId>) -> Self {
        check_arity(&type_params, &type_args, "type");
        let replacements = type_params.iter().copied().zip(type_args.iter().copied()).collect();
        let context = type_args.clone();
        Self::build(type_params, type_args, nest, Vec::new(), Vec::new(), replacements, context)
    }

    /// A child resolver adding bindings on top of `parent`'s.
    pub fn nested(parent: &Resolver, type_params: Vec<TypeId>, type_args: Vec<TypeId>) -> Self {
        check_arity(&type_params, &type_args, "type");
        let mut replacements = parent.replacements.clone();
        replacements.extend(type_params.iter().copied().zip(type_args.iter().copied()));
        let mut context = parent.subster.context_args().to_vec();
        context.extend(type_args.iter().copied());
        Self::build(
            type_params,
            type_args,
            parent.nest,
            parent.nest_type_params.clone(),
            parent.nest_type_args.clone(),
            replacements,
            context,
        )
    }

    /// Resolver mapping the type parameters of `inst.object` (and of the
    /// function it is nested in) to the instance's arguments.
    ///
    /// Panics if the argument counts do not match the declaration.
    pub fn for_instance(env: &TypeEnv, inst: &Instance) -> Self {
        let obj = env.object(inst.object);
        match env.kind(obj.ty) {
            TypeKind::Signature(sig) => {
                check_arity(&[], &inst.nest_args, "nesting");
                let all = signature_type_params(sig);
                check_arity(&all, &inst.type_args, "type");
                if !sig.recv_type_params.is_empty() && !sig.type_params.is_empty() {
                    // Receiver bindings first, the method's own on top.
                    let split = sig.recv_type_params.len();
                    let recv = Resolver::new(
                        sig.recv_type_params.clone(),
                        inst.type_args[..split].to_vec(),
                        Some(inst.object),
                    );
                    return Resolver::nested(
                        &recv,
                        sig.type_params.clone(),
                        inst.type_args[split..].to_vec(),
                    );
                }
                Resolver::new(all, inst.type_args.clone(), Some(inst.object))
            }
            TypeKind::Named(named) => {
                let nest = obj.parent_func;
                let nest_type_params = nest
                    .and_then(|f| env.signature_of(env.object(f).ty))
                    .map(signature_type_params)
                    .unwrap_or_default();
                check_arity(&nest_type_params, &inst.nest_args, "nesting");
                check_arity(&named.type_params, &inst.type_args, "type");
                let replacements: Vec<(TypeId, TypeId)> = nest_type_params
                    .iter()
                    .copied()
                    .zip(inst.nest_args.iter().copied())
                    .chain(named.type_params.iter().copied().zip(inst.type_args.iter().copied()))
                    .collect();
                Self::build(
                    named.type_params.clone(),
                    inst.type_args.clone(),
                    nest,
                    nest_type_params,
                    inst.nest_args.clone(),
                    replacements,
                    inst.nest_args.clone(),
                )
            }
            other => panic!(
                "unexpected type {other:?} for instance object {}",
                env.qualified_name(inst.object)
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn type_params(&self) -> &[TypeId] {
        &self.type_params
    }

    pub fn type_args(&self) -> &[TypeId] {
        &self.type_args
    }

    /// The generic function whose local declarations are unique per binding.
    pub fn nest(&self) -> Option<ObjId> {
        self.nest
    }

    pub fn nest_type_params(&self) -> &[TypeId] {
        &self.nest_type_params
    }

    pub fn nest_type_args(&self) -> &[TypeId] {
        &self.nest_type_args
    }

    /// Arguments bound to the parameters of the nesting function: for a
    /// function resolver its own arguments, for a local type its nest args.
    pub fn context_args(&self) -> &[TypeId] {
        self.subster.context_args()
    }

    pub fn substitute(&mut self, env: &mut TypeEnv, ty: TypeId) -> TypeId {
        self.subster.subst(env, ty)
    }

    pub fn substitute_all(&mut self, env: &mut TypeEnv, types: &[TypeId]) -> Vec<TypeId> {
        self.subster.subst_list(env, types)
    }

    /// Rewrite a field or method selection on a generic receiver into the
    /// selection on the concrete receiver.
    pub fn substitute_selection(
        &mut self,
        env: &mut TypeEnv,
        node: NodeId,
        sel: &Selection,
    ) -> Selection {
        if self.is_empty() {
            return sel.clone();
        }
        if let Some(concrete) = self.sel_memo.get(&node) {
            return concrete.clone();
        }
        let recv = self.substitute(env, sel.recv);
        if recv == sel.recv {
            return sel.clone();
        }
        let obj = match sel.kind {
            SelectionKind::MethodVal | SelectionKind::MethodExpr => {
                let name = env.object(sel.obj).name.clone();
                env.lookup_method(recv, &name).unwrap_or(sel.obj)
            }
            SelectionKind::FieldVal => sel.obj,
        };
        let ty = self.substitute(env, sel.ty);
        let concrete = Selection { kind: sel.kind, recv, obj, ty };
        self.sel_memo.insert(node, concrete.clone());
        concrete
    }

    /// `{T->int, U->string}`, sorted.
    pub fn render(&self, env: &TypeEnv) -> String {
        let effective: HashMap<TypeId, TypeId> = self.replacements.iter().copied().collect();
        let mut parts: Vec<String> = effective
            .iter()
            .map(|(tp, ta)| format!("{}->{}", env.type_string(*tp), env.type_string(*ta)))
            .collect();
        parts.sort();
        format!("{{{}}}", parts.join(", "))
    }
}

fn check_arity(params: &[TypeId], args: &[TypeId], what: &str) {
    if params.len() != args.len() {
        panic!(
            "number of {what} parameters and arguments must match: {} => {}",
            params.len(),
            args.len()
        );
    }
}
