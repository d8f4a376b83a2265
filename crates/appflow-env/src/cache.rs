//! Cache manifest for dev-dependency builds.
//!
//! The manifest records the source fingerprint of the last successful
//! scripted build together with the files it produced. It is the one
//! piece of cross-call state in the driver lifecycle and lives in the
//! application's cache directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use appflow_core::constants::DEV_DEP_MANIFEST;
use appflow_core::{DevDep, DriverError, DriverResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevDepManifest {
    pub fingerprint: String,
    pub files: Vec<String>,
}

impl DevDepManifest {
    pub fn new(fingerprint: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            files,
        }
    }

    pub fn dev_dep(&self) -> DevDep {
        DevDep {
            files: self.files.clone(),
        }
    }
}

fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(DEV_DEP_MANIFEST)
}

/// Loads the manifest from the cache directory.
///
/// An absent manifest means no build has succeeded yet. A manifest
/// that fails to parse is treated the same way (the expensive build
/// simply reruns) rather than blocking the operation.
pub fn load(cache_dir: &Path) -> DriverResult<Option<DevDepManifest>> {
    let path = manifest_path(cache_dir);
    if !path.is_file() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(&path).map_err(|e| DriverError::io(&path, e))?;
    match serde_json::from_str(&text) {
        Ok(manifest) => Ok(Some(manifest)),
        Err(e) => {
            warn!("discarding unreadable dev-dep manifest {:?}: {}", path, e);
            Ok(None)
        }
    }
}

/// Persists the manifest, creating the cache directory if needed.
pub fn store(cache_dir: &Path, manifest: &DevDepManifest) -> DriverResult<()> {
    std::fs::create_dir_all(cache_dir).map_err(|e| DriverError::io(cache_dir, e))?;

    let path = manifest_path(cache_dir);
    let text = serde_json::to_string_pretty(manifest)
        .expect("manifest serialization cannot fail");
    std::fs::write(&path, text).map_err(|e| DriverError::io(&path, e))?;
    debug!("stored dev-dep manifest at {:?}", path);
    Ok(())
}
