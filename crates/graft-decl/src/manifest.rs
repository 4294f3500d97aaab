//! JSON declaration manifests exported by a front end.

use std::fs;
use std::path::{Path, PathBuf};

use graft_diag::DiagnosticError;
use serde::{Deserialize, Serialize};

use crate::{DeclIndex, TypeDecl};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid manifest: {0}")]
    Index(#[from] DiagnosticError),
}

/// Every declaration visible to one generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn into_index(self) -> Result<DeclIndex, ManifestError> {
        Ok(DeclIndex::new(self.types)?)
    }
}
