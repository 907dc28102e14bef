//! The typed whole program handed over by the front end.

use crate::ast::File;
use crate::types::{PkgId, TypeEnv, TypeInfo};

/// One type-checked package: its files and the type checker's side tables.
#[derive(Debug, Clone)]
pub struct PackageUnit {
    pub pkg: PkgId,
    pub files: Vec<File>,
    pub info: TypeInfo,
}

impl PackageUnit {
    pub fn new(pkg: PkgId, files: Vec<File>, info: TypeInfo) -> Self {
        Self { pkg, files, info }
    }

    pub fn path<'e>(&self, env: &'e TypeEnv) -> &'e str {
        &env.package(self.pkg).path
    }
}

/// Every package of the program together with the shared type arena.
///
/// Packages are listed in dependency order, imports first.
#[derive(Debug, Clone)]
pub struct Program {
    pub env: TypeEnv,
    pub packages: Vec<PackageUnit>,
}

impl Program {
    pub fn new(env: TypeEnv) -> Self {
        Self { env, packages: Vec::new() }
    }

    pub fn add_package(&mut self, unit: PackageUnit) {
        self.packages.push(unit);
    }

    /// Index of the package with import path `path`.
    pub fn package_index(&self, path: &str) -> Option<usize> {
        self.packages.iter().position(|p| p.path(&self.env) == path)
    }
}
