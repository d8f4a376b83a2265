//! The builtin "script" application driver.
//!
//! Materializes templates for a generic scripted application, gates
//! builds on infrastructure readiness, and produces a single
//! `dev-dep-output` artifact when built as another application's dev
//! dependency.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use appflow_build::{Packer, VERIFY_ARG};
use appflow_core::constants::{
    ASSET_TREE_COMMON, DEV_DEP_BUILD_DIR, DEV_DEP_BUILD_SCRIPT, DEV_DEP_FRAGMENT, DEV_DEP_OUTPUT,
};
use appflow_core::{
    AppContext, AppDriver, AssetSource, CompileResult, DevDep, DriverError, DriverResult,
    TemplateContext, TemplateValue,
};
use appflow_directory::gate;
use appflow_env::{BuildOptions, DevOptions, Vagrant};

/// Driver for the "script" application kind.
#[derive(Debug)]
pub struct ScriptDriver {
    assets: AssetSource,
    packer_program: Option<String>,
    vagrant: Vagrant,
}

impl ScriptDriver {
    /// Creates a driver reading templates from `asset_root`.
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            assets: AssetSource::new(asset_root),
            packer_program: None,
            vagrant: Vagrant::new(),
        }
    }

    /// Overrides the provisioning tool binary. Tests use this.
    pub fn with_packer_program(mut self, program: impl Into<String>) -> Self {
        self.packer_program = Some(program.into());
        self
    }

    /// Overrides the environment tool binary. Tests use this.
    pub fn with_vagrant_program(mut self, program: impl Into<String>) -> Self {
        self.vagrant = Vagrant::new().with_program(program);
        self
    }

    /// Substitution context shared by every template in this driver:
    /// the application name, the caller-resolved dev-dependency
    /// fragments, and the cache/compiled/working path triad.
    fn template_context(&self, ctx: &AppContext) -> TemplateContext {
        let paths = BTreeMap::from([
            (
                "cache".to_string(),
                TemplateValue::Text(ctx.cache_dir.display().to_string()),
            ),
            (
                "compiled".to_string(),
                TemplateValue::Text(ctx.dir.display().to_string()),
            ),
            (
                "working".to_string(),
                TemplateValue::Text(ctx.working_dir().display().to_string()),
            ),
        ]);

        TemplateContext::new()
            .with_text("name", ctx.appfile.application.name.clone())
            .with_list(
                "dev_fragments",
                ctx.dev_dep_fragments
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
            )
            .with_map("path", paths)
    }
}

impl AppDriver for ScriptDriver {
    fn kind(&self) -> &str {
        "script"
    }

    fn compile(&self, ctx: &AppContext) -> DriverResult<CompileResult> {
        let template_ctx = self.template_context(ctx);

        self.assets
            .copy_tree(&ctx.dir, ASSET_TREE_COMMON, &template_ctx)?;

        // Infrastructure-flavor templates are optional; only a tree
        // that exists but fails to copy is an error.
        let flavor_tree = ctx.tuple.asset_prefix();
        match self.assets.copy_tree(&ctx.dir, &flavor_tree, &template_ctx) {
            Err(DriverError::AssetNotFound { .. }) => {
                debug!("no '{}' asset tree for this driver, skipping", flavor_tree);
            }
            other => other?,
        }

        Ok(CompileResult {
            dev_dep_fragment_path: ctx.dir.join(DEV_DEP_FRAGMENT),
        })
    }

    fn build(&self, ctx: &AppContext) -> DriverResult<()> {
        let infra_id = ctx.active_infra_id().ok_or_else(|| {
            DriverError::PreconditionNotMet {
                message: format!(
                    "Application '{}' declares no infrastructure to build against.\n\
                     Add an [[infrastructure]] block to the Appfile and re-run.",
                    ctx.appfile.application.name
                ),
            }
        })?;

        // Hard stop before any tool invocation.
        let record = gate::check_ready(ctx.directory.as_ref(), &infra_id)?;
        ctx.ui
            .message(&format!("Building against infrastructure: {record:?}"));

        let mut packer = Packer::new(&ctx.dir, ctx.ui.clone());
        if let Some(program) = &self.packer_program {
            packer = packer.with_program(program);
        }
        packer.execute(&[VERIFY_ARG])
    }

    fn dev(&self, ctx: &AppContext) -> DriverResult<()> {
        self.vagrant.dev(
            ctx,
            &DevOptions {
                instructions: DEV_INSTRUCTIONS.trim().to_string(),
            },
        )
    }

    fn dev_dep(&self, _dst: &AppContext, src: &AppContext) -> DriverResult<DevDep> {
        src.ui.header(&format!(
            "Building the dev dependency for '{}'",
            src.appfile.application.name
        ));
        src.ui.message(
            "To ensure cross-platform compatibility, the application is built\n\
             inside a virtualized environment. This is slow, and in a lot of\n\
             cases something faster is possible; future versions will detect\n\
             and do that. As long as the application doesn't change, the\n\
             result of this build is cached.",
        );

        self.vagrant.build_dev_dependency(
            src,
            &BuildOptions {
                dir: src.dir.join(DEV_DEP_BUILD_DIR),
                script: DEV_DEP_BUILD_SCRIPT.to_string(),
                output_files: vec![DEV_DEP_OUTPUT.to_string()],
            },
        )
    }
}

const DEV_INSTRUCTIONS: &str = "
A development environment has been created for this application. Edit
files locally on your own machine and the changes will be synced into
the environment.

When you're ready to build, run 'appflow dev ssh' to enter the
environment. You'll be placed directly into the working directory,
with the dependencies declared by this application already available.
";
