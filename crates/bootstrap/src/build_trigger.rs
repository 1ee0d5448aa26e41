//! Final pipeline stage: run the project build command once the local
//! environment is ready.
//!
//! The build runs as a child process with captured output and a hard
//! timeout, so a wedged build cannot hang the bootstrap run.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// A build invocation. `force` appends `--force` so incremental state
/// from a previous environment is discarded.
#[derive(Debug, Clone)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
    pub force: bool,
    pub timeout: Duration,
}

impl BuildCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            force: false,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to spawn build command '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("build failed with exit code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("build did not finish within {0:?}")]
    Timeout(Duration),
}

/// Run the build to completion, bounded by its timeout. Stdout is
/// discarded; stderr is captured for the failure report.
pub async fn run(command: &BuildCommand) -> Result<(), BuildError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args);
    if command.force {
        cmd.arg("--force");
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::info!(
        program = %command.program,
        args = ?command.args,
        force = command.force,
        "Starting build",
    );

    let child = cmd.spawn().map_err(|source| BuildError::Spawn {
        program: command.program.clone(),
        source,
    })?;

    let output = tokio::time::timeout(command.timeout, child.wait_with_output())
        .await
        .map_err(|_| BuildError::Timeout(command.timeout))?
        .map_err(|source| BuildError::Spawn {
            program: command.program.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(BuildError::Failed {
            exit_code: output.status.code(),
            stderr,
        });
    }

    tracing::info!(program = %command.program, "Build finished");
    Ok(())
}
