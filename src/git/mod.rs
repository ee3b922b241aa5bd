use std::ffi::OsStr;
use std::io;
use std::process::Output;
use std::time::Duration;

use spdlog::trace;
use thiserror::Error;
use tokio::process::Command;

use crate::config::GitSettings;

pub mod materialize;
pub mod timestamp;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("could not run {binary}: {source}")]
    Spawn {
        binary: String,
        source: io::Error,
    },

    #[error("git {command} timed out after {timeout:?}")]
    Timeout {
        command: String,
        timeout: Duration,
    },

    #[error("git {command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Runs the git command line tool. Every invocation is bounded by a timeout and
/// the child is killed when the timeout fires.
#[derive(Debug, Clone)]
pub struct Git {
    binary: String,
    clone_timeout: Duration,
    log_timeout: Duration,
}

impl Git {
    pub fn new(settings: &GitSettings) -> Self {
        Git {
            binary: settings.binary.clone(),
            clone_timeout: Duration::from_secs(settings.clone_timeout_secs),
            log_timeout: Duration::from_secs(settings.log_timeout_secs),
        }
    }

    pub fn clone_timeout(&self) -> Duration {
        self.clone_timeout
    }

    pub fn log_timeout(&self) -> Duration {
        self.log_timeout
    }

    pub async fn run<I, S>(&self, args: I, timeout: Duration) -> Result<Output, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = args.iter()
            .map(|arg| arg.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        trace!("Running {} {}", self.binary, command);

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(GitError::Spawn { binary: self.binary.clone(), source }),
            Err(_elapsed) => return Err(GitError::Timeout { command, timeout }),
        };

        if !output.status.success() {
            return Err(GitError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}
