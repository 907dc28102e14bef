//! Type universe consumed by the analyses: the type/object arena and the
//! per-package side tables the type checker attaches to the AST.

pub mod env;
pub mod info;
pub mod ty;

pub use env::TypeEnv;
pub use info::{ExprMode, InstanceInfo, Selection, SelectionKind, TypeAndValue, TypeInfo};
pub use ty::*;
