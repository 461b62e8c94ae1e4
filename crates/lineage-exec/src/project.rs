//! A project on disk: its root, configuration and graph store.

use std::path::{Path, PathBuf};

use lineage_core::config::ProjectConfig;
use lineage_core::uri::UriBuilder;
use lineage_io::GraphStore;

use crate::error::ExecError;

#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
    uris: UriBuilder,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, config: ProjectConfig) -> Result<Self, ExecError> {
        let uris = UriBuilder::new(&config.base_url)?;
        Ok(Self {
            root: root.into(),
            config,
            uris,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn uris(&self) -> &UriBuilder {
        &self.uris
    }

    /// Open the graph store, repairing an interrupted save.
    pub fn store(&self) -> Result<GraphStore, ExecError> {
        Ok(GraphStore::open(
            self.config.graphs_path(&self.root),
            self.uris.clone(),
            self.config.containment,
        )?)
    }
}
