//! Generic instantiation discovery and type substitution.
//!
//! The target has no generics, so every concrete use of a generic type,
//! function or method becomes an [`Instance`] and is later emitted as its own
//! specialized declaration.

pub mod collect;
pub mod instance;
pub mod map;
pub mod resolver;
pub mod subst;

pub use collect::{collect_instances, Collector};
pub use instance::{Instance, InstanceSet, PackageInstanceSets};
pub use map::{Cursor, InstanceMap};
pub use resolver::Resolver;
pub use subst::Subster;

use crate::types::{TypeEnv, TypeId, TypeKind};

/// The parameter-free type of an instance: the instantiated named type, or
/// the substituted signature of a function or method.
pub fn instance_type(env: &mut TypeEnv, inst: &Instance) -> TypeId {
    let ty = env.object(inst.object).ty;
    let generic = match env.kind(ty) {
        TypeKind::Named(named) if !named.type_params.is_empty() => {
            let params = named.type_params.clone();
            env.instantiate(ty, &params)
        }
        _ => ty,
    };
    let mut resolver = Resolver::for_instance(env, inst);
    resolver.substitute(env, generic)
}
