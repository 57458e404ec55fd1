//! Store configuration loaded once at the embedding boundary.
//!
//! The configuration is plain TOML. Missing keys take their defaults, so an
//! empty document is valid:
//!
//! ```toml
//! project_root = "/work/app"
//! planning_dir = ".trellis"
//! auto_complete_parents = true
//! ```

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default directory, relative to the project root, holding planning files.
pub const DEFAULT_PLANNING_DIR: &str = ".trellis";

/// Errors returned while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be decoded.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The project root is empty.
    #[error("project_root must not be empty")]
    EmptyProjectRoot,

    /// The planning directory is empty, absolute, or leaves the project root.
    #[error("planning_dir '{0}' must be a relative path inside the project root")]
    InvalidPlanningDir(String),
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    /// Root of the project whose work is being planned.
    pub project_root: Utf8PathBuf,
    /// Planning directory, relative to `project_root`.
    pub planning_dir: Utf8PathBuf,
    /// Mark ancestors `done` once all of their children are terminal.
    pub auto_complete_parents: bool,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            project_root: Utf8PathBuf::from("."),
            planning_dir: Utf8PathBuf::from(DEFAULT_PLANNING_DIR),
            auto_complete_parents: true,
        }
    }
}

impl TrellisConfig {
    /// Creates a default configuration for `project_root`.
    #[must_use]
    pub fn new(project_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Sets the planning directory.
    #[must_use]
    pub fn with_planning_dir(mut self, planning_dir: impl Into<Utf8PathBuf>) -> Self {
        self.planning_dir = planning_dir.into();
        self
    }

    /// Enables or disables automatic parent completion.
    #[must_use]
    pub const fn with_auto_complete_parents(mut self, enabled: bool) -> Self {
        self.auto_complete_parents = enabled;
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or fails
    /// [`Self::validate`].
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would place planning files outside the
    /// project root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyProjectRoot`] or
    /// [`ConfigError::InvalidPlanningDir`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_root.as_str().trim().is_empty() {
            return Err(ConfigError::EmptyProjectRoot);
        }
        if !is_contained(&self.planning_dir) {
            return Err(ConfigError::InvalidPlanningDir(
                self.planning_dir.to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the directory holding planning files.
    #[must_use]
    pub fn planning_root(&self) -> Utf8PathBuf {
        self.project_root.join(&self.planning_dir)
    }
}

fn is_contained(path: &Utf8Path) -> bool {
    let mut has_normal = false;
    for component in path.components() {
        match component {
            Utf8Component::Normal(_) => has_normal = true,
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return false;
            }
        }
    }
    has_normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn empty_document_uses_defaults() {
        let config = TrellisConfig::from_toml_str("").expect("valid config");
        assert_eq!(config, TrellisConfig::default());
        assert_eq!(config.planning_root(), Utf8PathBuf::from("./.trellis"));
    }

    #[rstest]
    fn document_overrides_defaults() {
        let config = TrellisConfig::from_toml_str(
            "project_root = \"/work/app\"\nplanning_dir = \"plans\"\nauto_complete_parents = false\n",
        )
        .expect("valid config");

        assert_eq!(config.planning_root(), Utf8PathBuf::from("/work/app/plans"));
        assert!(!config.auto_complete_parents);
    }

    #[rstest]
    #[case("../outside")]
    #[case("/etc")]
    #[case("")]
    #[case("./")]
    fn planning_dir_must_stay_inside_project(#[case] planning_dir: &str) {
        let config = TrellisConfig::new("/work/app").with_planning_dir(planning_dir);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPlanningDir(_))
        ));
    }

    #[rstest]
    fn unknown_value_types_are_rejected() {
        let result = TrellisConfig::from_toml_str("auto_complete_parents = \"yes\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
