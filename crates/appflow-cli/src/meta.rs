//! Shared environment resolution for every subcommand: where the
//! Appfile lives, where output goes, and how the driver context is
//! assembled.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use appflow_core::constants::{
    DEFAULT_APPFILE, DEFAULT_OUTPUT_DIR, DEV_DEP_FRAGMENT, DIRECTORY_FILE,
};
use appflow_core::{AppContext, Appfile, InfraTuple, Ui};
use appflow_directory::JsonDirectory;

use crate::ui::ConsoleUi;

/// Resolved invocation environment.
pub struct Meta {
    pub appfile: Appfile,
    pub output_dir: PathBuf,
    pub asset_root: PathBuf,
    ui: Arc<dyn Ui>,
}

impl Meta {
    /// Loads the Appfile and resolves the directory layout.
    ///
    /// `appfile_arg` may name the descriptor file itself or a
    /// directory containing one. Output defaults to `.appflow` beside
    /// the Appfile; the asset root defaults to `assets` beside it.
    pub fn load(
        appfile_arg: &str,
        output_arg: Option<&str>,
        assets_arg: Option<&str>,
    ) -> Result<Self> {
        let appfile_path = resolve_appfile_path(Path::new(appfile_arg));
        let appfile = Appfile::load_from_file(&appfile_path)
            .with_context(|| format!("unable to load '{}'", appfile_path.display()))?;

        let output_dir = match output_arg {
            Some(output) => PathBuf::from(output),
            None => appfile.working_dir().join(DEFAULT_OUTPUT_DIR),
        };
        let asset_root = match assets_arg {
            Some(assets) => PathBuf::from(assets),
            None => appfile.working_dir().join("assets"),
        };
        debug!(
            "resolved environment: appfile={:?} output={:?} assets={:?}",
            appfile.path, output_dir, asset_root
        );

        Ok(Self {
            appfile,
            output_dir,
            asset_root,
            ui: Arc::new(ConsoleUi::new()),
        })
    }

    pub fn compiled_dir(&self) -> PathBuf {
        self.output_dir.join("compiled")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.output_dir.join("cache")
    }

    pub fn directory(&self) -> JsonDirectory {
        JsonDirectory::new(self.output_dir.join(DIRECTORY_FILE))
    }

    /// The deployment target for this invocation. Falls back to a
    /// local tuple when the Appfile declares no infrastructure, which
    /// lets compile and dev work before any target exists.
    pub fn infra_tuple(&self) -> InfraTuple {
        match self.appfile.active_infrastructure() {
            Some(infra) => InfraTuple::new(infra.kind.clone(), infra.flavor.clone()),
            None => InfraTuple::new("local", "dev"),
        }
    }

    /// Assembles the context handed to driver operations.
    pub fn app_context(&self) -> Result<AppContext> {
        Ok(AppContext::new(
            self.appfile.clone(),
            self.infra_tuple(),
            self.cache_dir(),
            self.compiled_dir(),
            Arc::new(self.directory()),
            self.ui.clone(),
        )
        .with_dev_dep_fragments(self.dev_dep_fragments()))
    }

    /// Assembles a context for a dependency application rooted at
    /// `source`, with its own output and cache layout.
    pub fn source_context(&self, source: &str) -> Result<AppContext> {
        let meta = Meta::load(source, None, None)?;
        meta.app_context()
    }

    /// Fragment paths of already-compiled dependencies. A dependency
    /// that has not been compiled yet simply contributes nothing.
    pub fn dev_dep_fragments(&self) -> Vec<PathBuf> {
        self.appfile
            .application
            .dependencies
            .iter()
            .filter_map(|dep| {
                let fragment = self
                    .appfile
                    .working_dir()
                    .join(dep)
                    .join(DEFAULT_OUTPUT_DIR)
                    .join("compiled")
                    .join(DEV_DEP_FRAGMENT);
                if fragment.is_file() {
                    Some(fragment)
                } else {
                    debug!("dependency fragment {:?} not compiled yet, skipping", fragment);
                    None
                }
            })
            .collect()
    }
}

fn resolve_appfile_path(arg: &Path) -> PathBuf {
    if arg.is_dir() {
        arg.join(DEFAULT_APPFILE)
    } else {
        arg.to_path_buf()
    }
}
