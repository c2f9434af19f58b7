//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - modelc.toml (default configuration)
//! - modelc.local.toml (git-ignored local overrides)
//! - Environment variables (MODELC_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # modelc.toml
//! [compiler]
//! stdlib_root = "/usr/share/modelc/stdlib"
//! max_fixpoint_iterations = 100
//!
//! [solver]
//! max_pass_d_iterations = 10
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! MODELC_COMPILER__STDLIB_ROOT=/custom/path
//! MODELC_SOLVER__MAX_PASS_D_ITERATIONS=20
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the C1-C8 compilation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Directory the module-import resolver searches for library modules
    /// referenced by bare name (e.g. `import("Atmospheric", library("basic_math"))`).
    pub stdlib_root: PathBuf,

    /// Cap on C4's fixed-point loop over dissolved-quantity and
    /// aggregate-discovery passes, in case a malformed model cycles
    /// without converging.
    #[serde(default = "default_max_fixpoint_iterations")]
    pub max_fixpoint_iterations: u32,

    /// Emit a Graphviz DOT file of the dependency graph alongside
    /// compilation (requires the `graphviz` feature).
    #[serde(default)]
    pub emit_dependency_graph: bool,
}

fn default_max_fixpoint_iterations() -> u32 {
    100
}

/// Settings governing C6's solver-equation propagation (spec.md §6,
/// "Pass D").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Cap on Pass D's iterate-to-fixed-point loop that propagates solver
    /// assignment across aggregates and dissolved variables.
    #[serde(default = "default_max_pass_d_iterations")]
    pub max_pass_d_iterations: u32,

    /// Default solver kind for compartments that declare a quantity
    /// without an explicit `solve()` call.
    #[serde(default)]
    pub default_solver: DefaultSolverKind,
}

fn default_max_pass_d_iterations() -> u32 {
    10
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultSolverKind {
    #[default]
    Euler,
    Rk4,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. modelc.toml (base configuration)
    /// 2. modelc.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (MODELC_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file("modelc.toml"))
            .merge(Toml::file("modelc.local.toml"))
            .merge(Env::prefixed("MODELC_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MODELC_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compiler: CompilerConfig {
                stdlib_root: PathBuf::from("./stdlib"),
                max_fixpoint_iterations: default_max_fixpoint_iterations(),
                emit_dependency_graph: false,
            },
            solver: SolverConfig {
                max_pass_d_iterations: default_max_pass_d_iterations(),
                default_solver: DefaultSolverKind::default(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.compiler.max_fixpoint_iterations, 100);
        assert_eq!(config.solver.max_pass_d_iterations, 10);
        assert!(matches!(
            config.solver.default_solver,
            DefaultSolverKind::Euler
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[compiler]"));
        assert!(toml_str.contains("[solver]"));
    }
}
