//! Dev environment controller.
//!
//! Drives the external environment-virtualization tool (vagrant)
//! either interactively, for a developer session, or scripted, to
//! compile a dev dependency inside a fresh environment so the
//! produced artifacts are cross-platform safe.

pub mod cache;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, instrument, warn};

use appflow_core::fingerprint::compute_fingerprint;
use appflow_core::ui::forward_lines;
use appflow_core::{AppContext, DevDep, DriverError, DriverResult, Ui};

use crate::cache::DevDepManifest;

/// The environment virtualization tool invoked by default.
pub const DEFAULT_PROGRAM: &str = "vagrant";

/// Options for an interactive dev session.
#[derive(Debug, Clone)]
pub struct DevOptions {
    /// Instructional text surfaced once the environment is up.
    pub instructions: String,
}

/// Options for a scripted dev-dependency build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory holding the environment definition to build in.
    pub dir: PathBuf,
    /// Entry script executed inside the environment.
    pub script: String,
    /// Relative names of the files the build produces.
    pub output_files: Vec<String>,
}

/// Handle on the environment virtualization tool.
#[derive(Debug, Clone)]
pub struct Vagrant {
    program: String,
}

impl Default for Vagrant {
    fn default() -> Self {
        Self::new()
    }
}

impl Vagrant {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Overrides the tool binary. Tests point this at a mock script.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Brings up (or syncs) the interactive development environment in
    /// the compiled directory, then surfaces the instructions.
    ///
    /// Stdio is inherited and the call blocks until the tool returns;
    /// interrupting the session is the orchestrator's concern.
    pub fn dev(&self, ctx: &AppContext, opts: &DevOptions) -> DriverResult<()> {
        info!("starting dev environment in {:?}", ctx.dir);

        let status = Command::new(&self.program)
            .arg("up")
            .current_dir(&ctx.dir)
            .status()
            .map_err(|e| DriverError::EnvironmentFailure {
                reason: format!("failed to start '{}': {e}", self.program),
                output: String::new(),
            })?;

        if !status.success() {
            return Err(DriverError::EnvironmentFailure {
                reason: format!("'{} up' exited with {status}", self.program),
                output: String::new(),
            });
        }

        ctx.ui.header("Development environment ready!");
        ctx.ui.message(opts.instructions.trim());
        Ok(())
    }

    /// Runs a scripted build inside a fresh environment and returns
    /// the produced dev dependency.
    ///
    /// When the source application's content fingerprint is unchanged
    /// since the last successful build, the expensive environment
    /// build is skipped and the cached result is returned. On a fresh
    /// build the environment is torn down afterwards, the cache
    /// manifest is persisted, and partial state from failures is left
    /// in place for a safe re-invocation.
    #[instrument(skip(self, src, opts))]
    pub fn build_dev_dependency(
        &self,
        src: &AppContext,
        opts: &BuildOptions,
    ) -> DriverResult<DevDep> {
        let fingerprint =
            compute_fingerprint(&src.working_dir(), &[src.appfile.file_name()])?;

        if let Some(manifest) = cache::load(&src.cache_dir)? {
            if manifest.fingerprint == fingerprint {
                debug!(
                    "dev dependency for '{}' is unchanged, skipping environment build",
                    src.appfile.application.name
                );
                src.ui
                    .message("Application is unchanged, reusing the cached build result.");
                return Ok(manifest.dev_dep());
            }
        }

        fs::create_dir_all(&opts.dir).map_err(|e| DriverError::io(&opts.dir, e))?;

        self.run(&opts.dir, &["up"], &src.ui)?;
        let script_result = self.run(&opts.dir, &["ssh", "-c", &opts.script], &src.ui);

        // Tear the throwaway environment down on both outcomes; a
        // failed teardown is reported but does not mask the build
        // result.
        if let Err(e) = self.run(&opts.dir, &["destroy", "-f"], &src.ui) {
            warn!("failed to tear down build environment: {}", e);
        }
        script_result?;

        let manifest = DevDepManifest::new(fingerprint, opts.output_files.clone());
        cache::store(&src.cache_dir, &manifest)?;
        Ok(manifest.dev_dep())
    }

    fn run(&self, dir: &Path, args: &[&str], ui: &std::sync::Arc<dyn Ui>) -> DriverResult<()> {
        debug!("running {} {} in {:?}", self.program, args.join(" "), dir);

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DriverError::EnvironmentFailure {
                reason: format!("failed to start '{}': {e}", self.program),
                output: String::new(),
            })?;

        let stderr = child.stderr.take().expect("stderr was requested as piped");
        let forwarder = forward_lines(stderr, ui.clone());

        let output = child
            .wait_with_output()
            .map_err(|e| DriverError::EnvironmentFailure {
                reason: format!("failed to wait for '{}': {e}", self.program),
                output: String::new(),
            })?;
        let stderr_text = forwarder.join().unwrap_or_default();

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&stderr_text);
            return Err(DriverError::EnvironmentFailure {
                reason: format!(
                    "'{} {}' exited with {}",
                    self.program,
                    args.join(" "),
                    output.status
                ),
                output: combined,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appflow_core::ui::BufferUi;
    use appflow_core::{Appfile, Directory, InfraId, InfraTuple, InfrastructureRecord};
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;

    #[derive(Debug)]
    struct EmptyDirectory;

    impl Directory for EmptyDirectory {
        fn get_infra(&self, _id: &InfraId) -> DriverResult<Option<InfrastructureRecord>> {
            Ok(None)
        }
    }

    /// Mock vagrant: appends each invocation to a log and fails the
    /// `ssh` step when a `fail-ssh` marker file exists beside the log.
    fn create_mock_vagrant(dir: &Path) -> String {
        let path = dir.join("mock-vagrant");
        let script = format!(
            r#"#!/usr/bin/env sh
echo "args: $@" >> "{0}/invocations.log"
if [ "$1" = "ssh" ] && [ -f "{0}/fail-ssh" ]; then
    echo "provision failed" >&2
    exit 1
fi
exit 0
"#,
            dir.display()
        );
        fs::write(&path, script).unwrap();

        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();

        path.to_string_lossy().to_string()
    }

    fn invocations(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("invocations.log"))
            .map(|t| t.lines().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }

    fn source_context(root: &Path, ui: Arc<BufferUi>) -> AppContext {
        let appfile_path = root.join("app/Appfile.toml");
        fs::create_dir_all(appfile_path.parent().unwrap()).unwrap();
        fs::write(
            &appfile_path,
            "[application]\nname = \"api\"\ntype = \"script\"\n",
        )
        .unwrap();

        let appfile = Appfile::load_from_file(&appfile_path).unwrap();
        AppContext::new(
            appfile,
            InfraTuple::new("aws", "vpc"),
            root.join("cache"),
            root.join("out"),
            Arc::new(EmptyDirectory),
            ui,
        )
    }

    fn build_options(root: &Path) -> BuildOptions {
        BuildOptions {
            dir: root.join("out/dev-dep/build"),
            script: "/appflow/build.sh".to_string(),
            output_files: vec!["dev-dep-output".to_string()],
        }
    }

    #[test]
    fn scripted_build_runs_up_script_and_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let tool = create_mock_vagrant(dir.path());
        let ui = Arc::new(BufferUi::new());
        let src = source_context(dir.path(), ui);

        let vagrant = Vagrant::new().with_program(&tool);
        let dev_dep = vagrant
            .build_dev_dependency(&src, &build_options(dir.path()))
            .expect("build should pass");

        assert_eq!(dev_dep.files, vec!["dev-dep-output"]);
        assert_eq!(
            invocations(dir.path()),
            vec![
                "args: up",
                "args: ssh -c /appflow/build.sh",
                "args: destroy -f"
            ]
        );
    }

    #[test]
    fn unchanged_source_reuses_cached_result() {
        let dir = tempfile::tempdir().unwrap();
        let tool = create_mock_vagrant(dir.path());
        let ui = Arc::new(BufferUi::new());
        let src = source_context(dir.path(), ui.clone());

        let vagrant = Vagrant::new().with_program(&tool);
        let opts = build_options(dir.path());

        vagrant.build_dev_dependency(&src, &opts).unwrap();
        let after_first = invocations(dir.path()).len();

        let cached = vagrant.build_dev_dependency(&src, &opts).unwrap();
        assert_eq!(cached.files, vec!["dev-dep-output"]);
        assert_eq!(
            invocations(dir.path()).len(),
            after_first,
            "cached call must not touch the environment tool"
        );
        assert!(ui.contains("reusing the cached build result"));
    }

    #[test]
    fn changed_fingerprint_triggers_fresh_build() {
        let dir = tempfile::tempdir().unwrap();
        let tool = create_mock_vagrant(dir.path());
        let ui = Arc::new(BufferUi::new());
        let src = source_context(dir.path(), ui.clone());

        let vagrant = Vagrant::new().with_program(&tool);
        let opts = build_options(dir.path());

        vagrant.build_dev_dependency(&src, &opts).unwrap();
        let after_first = invocations(dir.path()).len();

        // Rewrite the descriptor so the content fingerprint changes.
        fs::write(
            &src.appfile.path,
            "[application]\nname = \"api-v2\"\ntype = \"script\"\n",
        )
        .unwrap();

        vagrant.build_dev_dependency(&src, &opts).unwrap();
        assert!(invocations(dir.path()).len() > after_first);
    }

    #[test]
    fn failed_script_is_fatal_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let tool = create_mock_vagrant(dir.path());
        fs::write(dir.path().join("fail-ssh"), "").unwrap();
        let ui = Arc::new(BufferUi::new());
        let src = source_context(dir.path(), ui);

        let vagrant = Vagrant::new().with_program(&tool);
        let err = vagrant
            .build_dev_dependency(&src, &build_options(dir.path()))
            .expect_err("must fail");

        assert!(matches!(err, DriverError::EnvironmentFailure { ref output, .. }
            if output.contains("provision failed")));
        // Teardown still ran, nothing was cached.
        assert!(invocations(dir.path()).contains(&"args: destroy -f".to_string()));
        assert_eq!(cache::load(&src.cache_dir).unwrap(), None);
    }
}
