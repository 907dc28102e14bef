//! Control-flow statements whose blocking status depends on other code.
//!
//! A deferred call runs when the function returns, so a `return` is blocking
//! when any defer that may have been registered before it is blocking. No
//! control-flow graph is built, which makes the tracking conservative:
//!
//! - Branches are assumed to rejoin, so a defer registered inside an `if`
//!   body reaches every return that textually follows it.
//! - Anywhere inside a loop may jump back to the loop start. Every defer
//!   registered inside the outermost loop reaches every return inside that
//!   loop.
//! - With any `goto` in the function, ordering is abandoned: all returns are
//!   blocking as soon as any defer is.

use crate::monomorphize::Instance;
use crate::span::NodeId;
use crate::types::TypeId;

/// Path from the function body down to a node, outermost first.
pub type NodePath = Vec<NodeId>;

/// What a `defer` statement calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferStmt {
    /// Dynamic or interface call; assumed to block.
    Blocking,
    /// A function or method instance, looked up once its status is known.
    Instance(Instance),
    /// A function literal, analyzed with the enclosing type arguments.
    Lit { lit: NodeId, type_args: Vec<TypeId> },
}

/// A `return` and the defers that may run when it is taken.
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub path: NodePath,
    /// Number of the function's defers (in registration order) that reach
    /// this return.
    pub defers: usize,
}

/// A `continue` that re-enters a `for` loop through its post statement.
#[derive(Debug, Clone)]
pub struct ContinueStmt {
    pub post: NodeId,
    pub path: NodePath,
}
