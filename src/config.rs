//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/sibtree/sibtree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `SIBTREE_*` prefix
//!
//! Command line flags are applied on top by the CLI layer.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, Options, DEFAULT_MAX_NODES};
use crate::domain::{CycleCheck, RemovePolicy, DEFAULT_INDENT};

/// Unified configuration for sibtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Also reject attaching a node below its own descendant
    pub strict_cycles: bool,
    /// What REMOVE does with the children of the removed node
    pub remove_policy: RemovePolicy,
    /// Largest node count accepted at startup
    pub max_nodes: usize,
    /// Indentation marker per level for structured tree output
    pub indent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_cycles: false,
            remove_policy: RemovePolicy::Promote,
            max_nodes: DEFAULT_MAX_NODES,
            indent: DEFAULT_INDENT.to_string(),
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub strict_cycles: Option<bool>,
    pub remove_policy: Option<RemovePolicy>,
    pub max_nodes: Option<usize>,
    pub indent: Option<String>,
}

/// Get the XDG config directory for sibtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sibtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("sibtree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            strict_cycles: overlay.strict_cycles.unwrap_or(self.strict_cycles),
            remove_policy: overlay.remove_policy.unwrap_or(self.remove_policy),
            max_nodes: overlay.max_nodes.unwrap_or(self.max_nodes),
            indent: overlay
                .indent
                .clone()
                .unwrap_or_else(|| self.indent.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = config_file {
            current = current.merge_with(&load_raw_settings(path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    /// Defaults plus a single file, ignoring global config and environment.
    pub fn load_file(path: &Path) -> Result<Self, ApplicationError> {
        let settings = Self::default().merge_with(&load_raw_settings(path)?);
        settings.validate()?;
        Ok(settings)
    }

    /// Apply SIBTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("SIBTREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("strict_cycles") {
            settings.strict_cycles = val;
        }
        if let Ok(val) = config.get_string("remove_policy") {
            settings.remove_policy = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_int("max_nodes") {
            settings.max_nodes = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("max_nodes must not be negative: {val}"),
            })?;
        }
        if let Ok(val) = config.get_string("indent") {
            settings.indent = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.max_nodes == 0 {
            return Err(ApplicationError::Config {
                message: "max_nodes must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn cycle_check(&self) -> CycleCheck {
        if self.strict_cycles {
            CycleCheck::Ancestry
        } else {
            CycleCheck::SiblingChain
        }
    }

    pub fn interpreter_options(&self) -> Options {
        Options {
            cycle_check: self.cycle_check(),
            remove_policy: self.remove_policy,
            max_nodes: self.max_nodes,
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# sibtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/sibtree/sibtree.toml
#   File:   --config <FILE>
#   Env:    SIBTREE_* environment variables (e.g. SIBTREE_STRICT_CYCLES=true)

# Also reject attaching a node below one of its own descendants.
# The default only scans the sibling chain starting at the parent.
# strict_cycles = false

# Children of a removed node: "promote" (re-attach to the root) or "drop"
# remove_policy = "promote"

# Largest node count accepted at startup
# max_nodes = 1000000

# Indentation marker per level for structured tree output
# indent = "  "
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
