//! Engine configuration.
//!
//! # Responsibility
//! - Describe database, logging, page-size and matrix settings.
//! - Load them from TOML and turn matrix rules into a `RelationshipMatrix`.
//!
//! # Invariants
//! - Every field has a default, so an empty document is a valid config.
//! - Unknown kind tags in matrix rules are rejected, never skipped.

use crate::error::{ModelError, ModelResult};
use crate::logging::default_log_level;
use crate::model::kind::{EntityKind, RelationshipKind};
use crate::model::matrix::RelationshipMatrix;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Page sizes for `list_nodes` when no config overrides them.
pub const DEFAULT_LIST_LIMITS: PageLimits = PageLimits::new(50, 200);
/// Page sizes for audit history when no config overrides them.
pub const DEFAULT_AUDIT_LIMITS: PageLimits = PageLimits::new(50, 500);

/// Default and ceiling for one paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default: u32,
    pub max: u32,
}

impl PageLimits {
    pub const fn new(default: u32, max: u32) -> Self {
        Self { default, max }
    }

    /// `None` and `Some(0)` use the default; larger values clamp to `max`.
    pub fn resolve(self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.default,
            Some(value) if value > self.max => self.max,
            Some(value) => value,
        }
    }
}

/// One matrix row as written in configuration, using string tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRuleConfig {
    pub source: String,
    pub target: String,
    pub kinds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// `None` leaves file logging off.
    pub log_dir: Option<PathBuf>,
    pub list_limits: PageLimits,
    pub audit_limits: PageLimits,
    /// Replaces the built-in matrix when present.
    pub relationship_matrix: Option<Vec<MatrixRuleConfig>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            list_limits: DEFAULT_LIST_LIMITS,
            audit_limits: DEFAULT_AUDIT_LIMITS,
            relationship_matrix: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid relationship matrix: {0}")]
    Matrix(#[from] ModelError),
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.relationship_matrix()?;
        Ok(config)
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Builds the matrix these settings describe.
    pub fn relationship_matrix(&self) -> ModelResult<RelationshipMatrix> {
        let Some(rules) = &self.relationship_matrix else {
            return Ok(RelationshipMatrix::enterprise_default());
        };

        let mut matrix = RelationshipMatrix::empty();
        for rule in rules {
            let source: EntityKind = rule.source.parse()?;
            let target: EntityKind = rule.target.parse()?;
            let kinds = rule
                .kinds
                .iter()
                .map(|kind| kind.parse::<RelationshipKind>())
                .collect::<ModelResult<Vec<_>>>()?;
            matrix.insert(source, target, kinds);
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig, PageLimits};
    use crate::error::ModelError;
    use crate::model::kind::{EntityKind, RelationshipKind};

    #[test]
    fn page_limits_default_and_clamp() {
        let limits = PageLimits::new(10, 50);
        assert_eq!(limits.resolve(None), 10);
        assert_eq!(limits.resolve(Some(0)), 10);
        assert_eq!(limits.resolve(Some(25)), 25);
        assert_eq!(limits.resolve(Some(500)), 50);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.database_path.is_none());
        assert_eq!(config.list_limits.default, 50);
    }

    #[test]
    fn matrix_rules_replace_builtin_matrix() {
        let config = EngineConfig::from_toml_str(
            r#"
            database_path = "/tmp/model.sqlite3"

            [list_limits]
            default = 20
            max = 100

            [[relationship_matrix]]
            source = "capability"
            target = "application"
            kinds = ["REALIZES"]
            "#,
        )
        .unwrap();

        assert_eq!(config.list_limits.resolve(None), 20);
        let matrix = config.relationship_matrix().unwrap();
        assert_eq!(matrix.triple_count(), 1);
        assert!(matrix.is_allowed(
            EntityKind::Capability,
            EntityKind::Application,
            RelationshipKind::Realizes
        ));
        assert!(!matrix.is_allowed(
            EntityKind::Application,
            EntityKind::Capability,
            RelationshipKind::Supports
        ));
    }

    #[test]
    fn unknown_kind_in_matrix_rule_is_rejected() {
        let err = EngineConfig::from_toml_str(
            r#"
            [[relationship_matrix]]
            source = "server"
            target = "application"
            kinds = ["hosts"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Matrix(ModelError::InvalidEntityType(tag)) if tag == "server"
        ));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archmodel.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "warn");

        let missing = EngineConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
