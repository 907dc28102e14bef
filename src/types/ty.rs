use serde::Serialize;

use crate::span::Span;

/// Handle to a type node in the [`TypeEnv`](super::TypeEnv) arena.
///
/// Composite types are hash-consed, so two handles are equal exactly when the
/// types are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The invalid type, reserved at index 0.
    pub const INVALID: TypeId = TypeId(0);

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Handle to a declared object (type name, function, variable, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ObjId(pub(crate) u32);

impl ObjId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PkgId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedNil,
}

impl BasicKind {
    pub const ALL: [BasicKind; 20] = [
        BasicKind::Invalid,
        BasicKind::Bool,
        BasicKind::Int,
        BasicKind::Int8,
        BasicKind::Int16,
        BasicKind::Int32,
        BasicKind::Int64,
        BasicKind::Uint,
        BasicKind::Uint8,
        BasicKind::Uint16,
        BasicKind::Uint32,
        BasicKind::Uint64,
        BasicKind::Uintptr,
        BasicKind::Float32,
        BasicKind::Float64,
        BasicKind::Complex64,
        BasicKind::Complex128,
        BasicKind::String,
        BasicKind::UnsafePointer,
        BasicKind::UntypedNil,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedNil => "untyped nil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub embedded: bool,
    pub tag: String,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self { name: name.into(), ty, embedded: false, tag: String::new() }
    }

    pub fn embedded(name: impl Into<String>, ty: TypeId) -> Self {
        Self { name: name.into(), ty, embedded: true, tag: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    /// Receiver type for methods.
    pub recv: Option<TypeId>,
    /// Type parameters declared on the receiver (`func (l *List[T]) ...`).
    pub recv_type_params: Vec<TypeId>,
    /// Type parameters declared on the function or method itself.
    pub type_params: Vec<TypeId>,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
    pub variadic: bool,
}

impl Signature {
    pub fn func(params: Vec<TypeId>, results: Vec<TypeId>) -> Self {
        Self { params, results, ..Self::default() }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty() || !self.recv_type_params.is_empty()
    }
}

/// Interface method. Signatures are stored without a receiver so that an
/// interface never refers back to itself through its methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IfaceMethod {
    pub name: String,
    pub sig: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Interface {
    /// Sorted by name.
    pub methods: Vec<IfaceMethod>,
    pub embeddeds: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    pub tilde: bool,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    /// The type name object declaring this type.
    pub obj: ObjId,
    /// The generic type this one was instantiated from, if any.
    pub origin: Option<TypeId>,
    pub type_params: Vec<TypeId>,
    pub type_args: Vec<TypeId>,
    /// `None` while the type is a placeholder under construction.
    pub underlying: Option<TypeId>,
    /// Method objects, always those of the origin declaration.
    pub methods: Vec<ObjId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParam {
    pub obj: ObjId,
    pub index: usize,
    pub constraint: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Basic(BasicKind),
    Named(NamedType),
    Pointer(TypeId),
    Slice(TypeId),
    Array(TypeId, u64),
    Map(TypeId, TypeId),
    Chan(ChanDir, TypeId),
    Struct(Vec<Field>),
    Signature(Signature),
    Interface(Interface),
    Union(Vec<Term>),
    TypeParam(TypeParam),
}

impl TypeKind {
    /// Nominal kinds get a fresh node per declaration; everything else is
    /// interned by structure.
    pub fn is_nominal(&self) -> bool {
        matches!(self, TypeKind::Named(_) | TypeKind::TypeParam(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    TypeName,
    Func,
    Var { is_field: bool, embedded: bool },
    Const,
    Builtin,
    Label,
    PkgName,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    /// `None` for objects of the universe scope (builtins, `error`, ...).
    pub pkg: Option<PkgId>,
    pub kind: ObjKind,
    pub ty: TypeId,
    pub span: Span,
    /// Nearest enclosing package-level function for locally declared objects.
    pub parent_func: Option<ObjId>,
}

impl Object {
    pub fn is_type_name(&self) -> bool {
        self.kind == ObjKind::TypeName
    }

    pub fn is_func(&self) -> bool {
        self.kind == ObjKind::Func
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjKind::Var { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    pub name: String,
}
