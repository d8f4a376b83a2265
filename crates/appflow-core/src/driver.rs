//! The application driver lifecycle and driver registry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::AppContext;
use crate::error::{DriverError, DriverResult};

/// Output of the Compile phase.
///
/// Downstream applications read the fragment file at this path when
/// compiling their own development environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub dev_dep_fragment_path: PathBuf,
}

/// Output of the DevDep phase: the relative file names the build
/// produced, to be copied into a dependent application's environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevDep {
    pub files: Vec<String>,
}

/// A contract for all application drivers connecting to Appflow.
///
/// The four operations are invoked synchronously, one at a time, by
/// the external orchestrator; each must also be independently
/// callable. Implementations hold no per-invocation state.
pub trait AppDriver: std::fmt::Debug + Send + Sync {
    /// Application kind this driver handles (e.g. "script").
    fn kind(&self) -> &str;

    /// Materializes build templates into the context's output
    /// directory and returns the fragment hand-off path.
    fn compile(&self, ctx: &AppContext) -> DriverResult<CompileResult>;

    /// Gates on infrastructure readiness, then drives the external
    /// provisioning tool against the compiled directory.
    fn build(&self, ctx: &AppContext) -> DriverResult<()>;

    /// Brings up the interactive development environment. Blocks for
    /// the lifetime of the session.
    fn dev(&self, ctx: &AppContext) -> DriverResult<()>;

    /// Builds (or returns the cached) dev dependency of `src` for use
    /// by `dst`.
    fn dev_dep(&self, dst: &AppContext, src: &AppContext) -> DriverResult<DevDep>;
}

/// A registry of driver implementations keyed by application kind.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn AppDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver under its `kind()` identifier, replacing any
    /// existing driver for that kind.
    pub fn register(&mut self, driver: Arc<dyn AppDriver>) {
        let kind = driver.kind().to_string();
        debug!("registering driver for application kind: {}", kind);
        self.drivers.insert(kind, driver);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn AppDriver>> {
        self.drivers.get(kind).cloned()
    }

    /// Gets a driver by kind, returning an error if none is registered.
    pub fn get_required(&self, kind: &str) -> DriverResult<Arc<dyn AppDriver>> {
        self.get(kind)
            .ok_or_else(|| DriverError::DriverNotFound(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.drivers.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}
