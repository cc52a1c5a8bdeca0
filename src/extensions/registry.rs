//! Filesystem extension registry.
//!
//! Each extension lives in `<extensions-dir>/<id>/` with an `extension.json`
//! manifest holding at least `id` and `version`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MANIFEST: &str = "extension.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub version: String,
}

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid extension id '{0}'")]
    InvalidId(String),

    #[error("extension '{0}' is not installed")]
    NotInstalled(String),

    #[error("extension '{0}' not found; install from a local directory containing extension.json")]
    NotFound(String),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExtensionError + '_ {
    move |source| ExtensionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub struct ExtensionRegistry {
    dir: PathBuf,
}

impl ExtensionRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Installed extensions sorted by id. A missing directory means none.
    pub fn list(&self) -> Result<Vec<Manifest>, ExtensionError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir)(e)),
        };

        let mut installed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error(&self.dir))?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let manifest_path = entry.path().join(MANIFEST);
            if !manifest_path.is_file() {
                continue;
            }
            match read_manifest(&entry.path()) {
                Ok(manifest) => installed.push(manifest),
                Err(e) => tracing::warn!(error = %e, "Skipping extension"),
            }
        }
        installed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(installed)
    }

    /// Install from a local directory. Ids that are not local paths are
    /// reported as not found.
    pub fn install(&self, source: &str) -> Result<Manifest, ExtensionError> {
        let source_dir = Path::new(source);
        if !source_dir.join(MANIFEST).is_file() {
            return Err(ExtensionError::NotFound(source.to_string()));
        }
        let manifest = read_manifest(source_dir)?;
        validate_id(&manifest.id)?;

        let target = self.dir.join(&manifest.id);
        let staging = self.scratch_path(&manifest.id, "tmp");
        if let Err(e) = copy_dir(source_dir, &staging) {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }
        self.swap_in(&staging, &target)?;
        tracing::debug!(id = %manifest.id, target = %target.display(), "Extension installed");
        Ok(manifest)
    }

    /// Hidden sibling used while installing; `list` skips it.
    fn scratch_path(&self, id: &str, kind: &str) -> PathBuf {
        self.dir.join(format!(".{}.{}-{}", id, kind, Uuid::new_v4()))
    }

    /// Move a fully copied `staging` directory to `target`, replacing any
    /// previous install only once the new copy is in place.
    fn swap_in(&self, staging: &Path, target: &Path) -> Result<(), ExtensionError> {
        let previous = match target.file_name().and_then(|n| n.to_str()) {
            Some(id) if target.exists() => {
                let backup = self.scratch_path(id, "old");
                if let Err(e) = std::fs::rename(target, &backup) {
                    let _ = std::fs::remove_dir_all(staging);
                    return Err(io_error(target)(e));
                }
                Some(backup)
            }
            _ => None,
        };

        if let Err(e) = std::fs::rename(staging, target) {
            if let Some(backup) = &previous {
                let _ = std::fs::rename(backup, target);
            }
            let _ = std::fs::remove_dir_all(staging);
            return Err(io_error(target)(e));
        }
        if let Some(backup) = previous {
            if let Err(e) = std::fs::remove_dir_all(&backup) {
                tracing::warn!(error = %e, path = %backup.display(), "Failed to remove previous install");
            }
        }
        Ok(())
    }

    pub fn uninstall(&self, id: &str) -> Result<(), ExtensionError> {
        validate_id(id)?;
        let target = self.dir.join(id);
        if !target.join(MANIFEST).is_file() {
            return Err(ExtensionError::NotInstalled(id.to_string()));
        }
        std::fs::remove_dir_all(&target).map_err(io_error(&target))?;
        tracing::debug!(id, "Extension uninstalled");
        Ok(())
    }
}

fn validate_id(id: &str) -> Result<(), ExtensionError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(ExtensionError::InvalidId(id.to_string()))
    }
}

fn read_manifest(dir: &Path) -> Result<Manifest, ExtensionError> {
    let path = dir.join(MANIFEST);
    let raw = std::fs::read_to_string(&path).map_err(io_error(&path))?;
    serde_json::from_str(&raw).map_err(|source| ExtensionError::Manifest { path, source })
}

fn copy_dir(from: &Path, to: &Path) -> Result<(), ExtensionError> {
    std::fs::create_dir_all(to).map_err(io_error(to))?;
    for entry in std::fs::read_dir(from).map_err(io_error(from))? {
        let entry = entry.map_err(io_error(from))?;
        let path = entry.path();
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(io_error(&path))?;
        if file_type.is_dir() {
            copy_dir(&path, &target)?;
        } else if file_type.is_file() {
            std::fs::copy(&path, &target).map_err(io_error(&path))?;
        }
    }
    Ok(())
}
