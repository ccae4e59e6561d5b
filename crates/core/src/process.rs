//! External process execution
//!
//! Every external tool (java, keytool, jarsigner, bundletool) runs through
//! [`ToolCommand`]: output is captured, the child is killed when the timeout
//! elapses, and secret arguments never reach the logs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{CoreError, Result};

const MASK: &str = "****";

#[derive(Debug, Clone)]
struct ToolArg {
    value: String,
    secret: bool,
}

/// A single invocation of an external tool
#[derive(Debug, Clone)]
pub struct ToolCommand {
    label: String,
    program: PathBuf,
    args: Vec<ToolArg>,
    timeout: Duration,
}

impl ToolCommand {
    /// `label` names the tool in logs and errors
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn arg(mut self, value: impl AsRef<str>) -> Self {
        self.args.push(ToolArg {
            value: value.as_ref().to_string(),
            secret: false,
        });
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in values {
            self = self.arg(value);
        }
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Argument that is passed to the process but masked in logs
    pub fn secret_arg(mut self, value: impl AsRef<str>) -> Self {
        self.args.push(ToolArg {
            value: value.as_ref().to_string(),
            secret: true,
        });
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Raw argument values, secrets included
    pub fn arg_values(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.value.as_str()).collect()
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// Run to completion and capture output.
    ///
    /// A non-zero exit is not an error here; see [`ToolOutput::ensure_success`].
    pub async fn run(&self) -> Result<ToolOutput> {
        debug!("{}", self);

        let child = Command::new(&self.program)
            .args(self.args.iter().map(|a| a.value.as_str()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CoreError::Spawn {
                tool: self.label.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CoreError::Timeout {
                tool: self.label.clone(),
                secs: self.timeout.as_secs(),
            })??;

        Ok(ToolOutput {
            tool: self.label.clone(),
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.secret {
                write!(f, " {}", MASK)?;
            } else if arg.value.contains(' ') {
                write!(f, " \"{}\"", arg.value)?;
            } else {
                write!(f, " {}", arg.value)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool: String,
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Turn a non-zero exit into [`CoreError::ToolFailed`]
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let status = match self.code {
            Some(code) => format!("status {}", code),
            None => "a signal".to_string(),
        };
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            self.stderr.trim().to_string()
        };
        Err(CoreError::ToolFailed {
            tool: self.tool,
            status,
            stderr: detail,
        })
    }
}
