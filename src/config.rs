use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::AnalysisError;

/// Output flavor for dependency graph renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    #[default]
    Dot,
    Mermaid,
}

/// Knobs for the blocking analysis and the initialization grouper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Qualified named types (`pkg.Name`) whose methods never block.
    pub nonblocking_receivers: Vec<String>,
    /// Treat declarations without a body as blocking.
    pub bodiless_funcs_block: bool,
    /// Packages whose named types never take part in initialization ordering.
    pub skip_packages: Vec<String>,
    pub graph_format: GraphFormat,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            nonblocking_receivers: Vec::new(),
            bodiless_funcs_block: true,
            skip_packages: Vec::new(),
            graph_format: GraphFormat::Dot,
        }
    }
}

impl AnalysisConfig {
    pub fn is_nonblocking_receiver(&self, qualified: &str) -> bool {
        self.nonblocking_receivers.iter().any(|r| r == qualified)
    }

    pub fn is_skipped_package(&self, path: &str) -> bool {
        self.skip_packages.iter().any(|p| p == path)
    }

    /// Parse a configuration document.
    pub fn from_toml_str(source: &str, path: Option<&Path>) -> Result<Self, AnalysisError> {
        let doc: TomlConfig = toml::from_str(source)
            .map_err(|e| AnalysisError::config(e.to_string(), path.map(Path::to_path_buf)))?;
        let defaults = Self::default();
        let analysis = doc.analysis.unwrap_or_default();
        let grouper = doc.grouper.unwrap_or_default();
        Ok(Self {
            nonblocking_receivers: analysis.nonblocking_receivers,
            bodiless_funcs_block: analysis.bodiless_funcs_block.unwrap_or(defaults.bodiless_funcs_block),
            skip_packages: grouper.skip_packages,
            graph_format: grouper.graph_format.unwrap_or(defaults.graph_format),
        })
    }

    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::config(format!("failed to read config: {e}"), Some(path.to_path_buf()))
        })?;
        Self::from_toml_str(&source, Some(path))
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    analysis: Option<TomlAnalysis>,
    grouper: Option<TomlGrouper>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlAnalysis {
    #[serde(default)]
    nonblocking_receivers: Vec<String>,
    bodiless_funcs_block: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlGrouper {
    #[serde(default)]
    skip_packages: Vec<String>,
    graph_format: Option<GraphFormat>,
}
