use std::ffi::OsStr;
use std::path::Path;

use spdlog::debug;
use thiserror::Error;

use crate::git::{Git, GitError};
use crate::post::Timestamp;

#[derive(Debug, Error)]
enum TimestampError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("repository has no history")]
    NoHistory,

    #[error("unexpected date {0:?}")]
    Unparsable(String),
}

async fn last_commit_date(git: &Git, repo: &Path) -> Result<Timestamp, TimestampError> {
    let output = git.run(
        [
            OsStr::new("-C"),
            repo.as_os_str(),
            OsStr::new("log"),
            OsStr::new("-1"),
            OsStr::new("--format=%cd"),
            OsStr::new("--date=format-local:%Y-%m-%d %H:%M:%S"),
        ],
        git.log_timeout(),
    ).await?;

    let text = String::from_utf8_lossy(&output.stdout);
    let text = text.trim();
    if text.is_empty() {
        return Err(TimestampError::NoHistory);
    }

    Timestamp::parse(text).map_err(|_| TimestampError::Unparsable(text.to_string()))
}

/// Time of the most recent commit in `repo`, in local time like the fallback.
/// Falls back to the current time
/// when the history cannot be read for any reason, so a post always gets a date.
pub async fn resolve_timestamp(git: &Git, repo: &Path) -> Timestamp {
    match last_commit_date(git, repo).await {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Using current time for {}: {}", repo.display(), e);
            Timestamp::now()
        }
    }
}
