//! Search tool trait and the `hmmsearch` subprocess implementation

use crate::catalog::Model;
use crate::error::ToolError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Default name of the search binary, resolved through `PATH`
pub const DEFAULT_BINARY: &str = "hmmsearch";

/// A homology search tool run once per model
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Tool name used in log messages
    fn name(&self) -> &str;

    /// Search `input` with `model`, returning the raw tabular output lines
    async fn search(&self, model: &Model, input: &Path, cpu: usize)
        -> Result<Vec<String>, ToolError>;
}

/// Runs the external `hmmsearch` binary
#[derive(Debug, Clone)]
pub struct HmmSearch {
    binary: PathBuf,
    binary_name: String,
}

impl HmmSearch {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let binary = binary.into();
        let binary_name = binary.display().to_string();
        Self {
            binary,
            binary_name,
        }
    }

    /// Build the command line for one invocation
    pub fn command(&self, model: &Model, input: &Path, cpu: usize, tblout: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--cpu")
            .arg(cpu.to_string())
            .arg("--tblout")
            .arg(tblout)
            .arg(&model.path)
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for HmmSearch {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

#[async_trait]
impl SearchTool for HmmSearch {
    fn name(&self) -> &str {
        &self.binary_name
    }

    async fn search(
        &self,
        model: &Model,
        input: &Path,
        cpu: usize,
    ) -> Result<Vec<String>, ToolError> {
        // Unique per task; removed when `tblout` is dropped
        let tblout = tempfile::Builder::new()
            .prefix("cas-typer-")
            .suffix(".tblout")
            .tempfile()
            .map_err(ToolError::TempFile)?
            .into_temp_path();

        debug!(
            "Running {} --cpu {} --tblout {} {} {}",
            self.binary_name,
            cpu,
            tblout.display(),
            model.path.display(),
            input.display()
        );

        let output = self
            .command(model, input, cpu, &tblout)
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                binary: self.binary_name.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                binary: self.binary_name.clone(),
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // Target descriptions are copied verbatim and may not be UTF-8
        let content = match tokio::fs::read(&tblout).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::MissingOutput(tblout.to_path_buf()));
            }
            Err(e) => return Err(ToolError::TempFile(e)),
        };

        if let Err(e) = tblout.close() {
            debug!("Could not remove temporary output: {}", e);
        }

        Ok(content.lines().map(str::to_string).collect())
    }
}
