//! Build delegate: invokes the external provisioning tool against a
//! compiled build directory.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use appflow_core::ui::forward_lines;
use appflow_core::{DriverError, DriverResult, Ui};

/// The provisioning tool invoked by default.
pub const DEFAULT_PROGRAM: &str = "packer";

/// Fixed verification argument run as a build's first (and, at this
/// stage of the driver, only) tool invocation, so a missing or broken
/// install fails fast with a clear diagnostic instead of a confusing
/// mid-build error.
pub const VERIFY_ARG: &str = "version";

/// Handle on the external provisioning tool, bound to the compiled
/// directory it operates on.
#[derive(Debug)]
pub struct Packer {
    program: String,
    dir: PathBuf,
    ui: Arc<dyn Ui>,
}

impl Packer {
    pub fn new(dir: impl Into<PathBuf>, ui: Arc<dyn Ui>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            dir: dir.into(),
            ui,
        }
    }

    /// Overrides the tool binary. Tests point this at a mock script.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Runs the tool once with `args` against the build directory.
    ///
    /// Stdout is captured; stderr is streamed to the UI line by line
    /// while the tool runs. Any spawn failure or non-zero exit is
    /// surfaced verbatim with the captured output attached. No
    /// automatic retry.
    #[instrument(skip(self))]
    pub fn execute(&self, args: &[&str]) -> DriverResult<()> {
        info!("running {} {} in {:?}", self.program, args.join(" "), self.dir);

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DriverError::ToolInvocationFailure {
                program: self.program.clone(),
                reason: format!("failed to start: {e}"),
                output: String::new(),
            })?;

        let stderr = child
            .stderr
            .take()
            .expect("stderr was requested as piped");
        let forwarder = forward_lines(stderr, self.ui.clone());

        // Reaping the child closes the stderr write side on every exit
        // path, which lets the forwarder drain and terminate.
        let output = child
            .wait_with_output()
            .map_err(|e| DriverError::ToolInvocationFailure {
                program: self.program.clone(),
                reason: format!("failed to wait for completion: {e}"),
                output: String::new(),
            })?;
        let stderr_text = forwarder.join().unwrap_or_default();

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&stderr_text);
            return Err(DriverError::ToolInvocationFailure {
                program: self.program.clone(),
                reason: format!("exited with {}", output.status),
                output: combined,
            });
        }

        debug!("{} completed successfully", self.program);
        Ok(())
    }
}
