use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::git::GitError;

/// A post's working copy could not be produced or read. Always local to one post.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("backing repository {0} does not exist")]
    MissingRepository(PathBuf),

    #[error("could not remove previous working copy {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: io::Error,
    },

    #[error("could not snapshot {repo} into {path}: {source}")]
    Snapshot {
        repo: PathBuf,
        path: PathBuf,
        source: GitError,
    },

    #[error("could not strip version control metadata from {path}: {source}")]
    StripMetadata {
        path: PathBuf,
        source: io::Error,
    },

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: io::Error,
    },

    #[error("could not render {path}: {source}")]
    Render {
        path: PathBuf,
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid post id {0:?}")]
    InvalidId(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("could not list {path}: {source}")]
    Enumerate {
        path: PathBuf,
        source: io::Error,
    },

    #[error("could not persist index to {path}: {source}")]
    Persistence {
        path: PathBuf,
        source: io::Error,
    },

    #[error("could not load index from {path}: {reason}")]
    Load {
        path: PathBuf,
        reason: String,
    },

    #[error("index worker stopped")]
    WorkerStopped,
}
