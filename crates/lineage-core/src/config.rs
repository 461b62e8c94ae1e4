//! Project configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::path::ContainmentPolicy;

pub const DEFAULT_BASE_URL: &str = "https://localhost";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project-relative directory holding all lineage metadata.
    pub metadata_dir: String,

    /// Raw execution records, relative to `metadata_dir`.
    pub workflow_dir: String,

    /// Persisted graph documents, relative to `metadata_dir`.
    pub graphs_dir: String,

    /// Base for plan/activity/entity URIs in persisted documents.
    pub base_url: String,

    pub containment: ContainmentPolicy,

    /// Continue past records whose root references cannot be resolved.
    pub skip_on_error: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            metadata_dir: ".lineage".to_string(),
            workflow_dir: "workflow".to_string(),
            graphs_dir: "graphs".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            containment: ContainmentPolicy::Ancestor,
            skip_on_error: false,
        }
    }
}

impl ProjectConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `LINEAGE_METADATA_DIR`: metadata directory
    /// - `LINEAGE_BASE_URL`: base URL for document URIs
    /// - `LINEAGE_CONTAINMENT`: `ancestor` or `exact`
    /// - `LINEAGE_SKIP_ON_ERROR`: `1`/`true` to skip unresolvable records
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("LINEAGE_METADATA_DIR") {
            cfg.metadata_dir = s;
        }

        if let Ok(s) = std::env::var("LINEAGE_BASE_URL") {
            cfg.base_url = s;
        }

        if let Ok(s) = std::env::var("LINEAGE_CONTAINMENT") {
            cfg.containment = s.parse()?;
        }

        if let Ok(s) = std::env::var("LINEAGE_SKIP_ON_ERROR") {
            cfg.skip_on_error = parse_flag(&s)?;
        }

        Ok(cfg)
    }

    /// Project-relative prefix of raw execution records, e.g. `.lineage/workflow`.
    pub fn workflow_prefix(&self) -> String {
        crate::path::normalize(&format!("{}/{}", self.metadata_dir, self.workflow_dir))
    }

    /// Whether a project-relative path is a raw execution record.
    pub fn is_record_path(&self, path: &str) -> bool {
        let prefix = self.workflow_prefix();
        path.strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|name| !name.contains('/') && (name.ends_with(".yaml") || name.ends_with(".yml")))
            .unwrap_or(false)
    }

    pub fn graphs_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.metadata_dir).join(&self.graphs_dir)
    }
}

fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("expected a boolean, got '{other}'"))),
    }
}
