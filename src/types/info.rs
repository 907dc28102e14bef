use std::collections::HashMap;

use crate::span::NodeId;

use super::ty::{ObjId, TypeId};

/// How a typed expression may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprMode {
    Value,
    /// The expression denotes a type.
    Type,
    Builtin,
    NoValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAndValue {
    pub ty: TypeId,
    pub mode: ExprMode,
}

impl TypeAndValue {
    pub fn is_type(&self) -> bool {
        self.mode == ExprMode::Type
    }
}

/// Instantiation recorded for an identifier denoting a generic object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub type_args: Vec<TypeId>,
    /// The instantiated type (a named instance or a concrete signature).
    pub ty: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// `x.f` selecting a struct field.
    FieldVal,
    /// `x.m` selecting a method bound to a value.
    MethodVal,
    /// `T.m` method expression.
    MethodExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: SelectionKind,
    pub recv: TypeId,
    pub obj: ObjId,
    /// Type of the selector expression.
    pub ty: TypeId,
}

/// Side tables produced by the type checker for one package, keyed by the
/// node ids of the package's AST.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub defs: HashMap<NodeId, ObjId>,
    pub uses: HashMap<NodeId, ObjId>,
    pub instances: HashMap<NodeId, InstanceInfo>,
    pub selections: HashMap<NodeId, Selection>,
    pub types: HashMap<NodeId, TypeAndValue>,
}

impl TypeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object an identifier defines or refers to.
    pub fn object_of(&self, ident: NodeId) -> Option<ObjId> {
        self.defs.get(&ident).or_else(|| self.uses.get(&ident)).copied()
    }

    pub fn type_of(&self, expr: NodeId) -> Option<TypeId> {
        self.types.get(&expr).map(|tv| tv.ty)
    }

    pub fn is_type_expr(&self, expr: NodeId) -> bool {
        self.types.get(&expr).is_some_and(TypeAndValue::is_type)
    }

    pub fn record_type(&mut self, expr: NodeId, ty: TypeId) {
        self.types.insert(expr, TypeAndValue { ty, mode: ExprMode::Value });
    }

    pub fn record_type_expr(&mut self, expr: NodeId, ty: TypeId) {
        self.types.insert(expr, TypeAndValue { ty, mode: ExprMode::Type });
    }
}
