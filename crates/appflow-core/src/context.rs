//! Per-invocation context handed to driver operations.

use std::path::PathBuf;
use std::sync::Arc;

use crate::appfile::Appfile;
use crate::infra::{Directory, InfraId};
use crate::ui::Ui;

/// Identifies a deployment target: provisioning backend plus topology
/// variant (e.g. `("aws", "vpc")`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraTuple {
    pub infra: String,
    pub flavor: String,
}

impl InfraTuple {
    pub fn new(infra: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self {
            infra: infra.into(),
            flavor: flavor.into(),
        }
    }

    /// The logical asset tree holding templates for this target.
    pub fn asset_prefix(&self) -> String {
        format!("{}-{}", self.infra, self.flavor)
    }
}

/// Immutable bundle of everything a driver operation needs.
///
/// Created once per invocation by the calling orchestrator and never
/// mutated by the driver; the driver itself is stateless between
/// calls.
#[derive(Debug)]
pub struct AppContext {
    /// Parsed application descriptor.
    pub appfile: Appfile,
    /// Deployment target for this invocation.
    pub tuple: InfraTuple,
    /// Per-application cache directory (dev-dep manifest lives here).
    pub cache_dir: PathBuf,
    /// Compiled build output directory, exclusively owned by this
    /// invocation.
    pub dir: PathBuf,
    /// Dev-dependency fragment paths already resolved by the caller.
    pub dev_dep_fragments: Vec<PathBuf>,
    /// Infrastructure directory lookup handle.
    pub directory: Arc<dyn Directory>,
    /// User-interaction sink.
    pub ui: Arc<dyn Ui>,
}

impl AppContext {
    pub fn new(
        appfile: Appfile,
        tuple: InfraTuple,
        cache_dir: PathBuf,
        dir: PathBuf,
        directory: Arc<dyn Directory>,
        ui: Arc<dyn Ui>,
    ) -> Self {
        Self {
            appfile,
            tuple,
            cache_dir,
            dir,
            dev_dep_fragments: Vec::new(),
            directory,
            ui,
        }
    }

    /// Attach caller-resolved dev-dependency fragments.
    pub fn with_dev_dep_fragments(mut self, fragments: Vec<PathBuf>) -> Self {
        self.dev_dep_fragments = fragments;
        self
    }

    /// Directory the Appfile lives in; templates treat it as the
    /// application's working path.
    pub fn working_dir(&self) -> PathBuf {
        self.appfile.working_dir()
    }

    /// Directory lookup key for the active infrastructure target.
    pub fn active_infra_id(&self) -> Option<InfraId> {
        self.appfile
            .active_infrastructure()
            .map(|infra| InfraId::new(infra.name.clone()))
    }
}
