use std::ffi::OsStr;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use spdlog::{debug, error};

use crate::config::Paths;
use crate::error::ExtractionError;
use crate::git::Git;

pub fn working_copy_path(paths: &Paths, id: &str) -> PathBuf {
    paths.content_dir.join(id)
}

pub fn repository_path(paths: &Paths, id: &str) -> PathBuf {
    paths.repo_dir.join(id)
}

async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Replaces the working copy of `id` with a fresh clone of its backing
/// repository and strips the `.git` directory from it.
pub async fn materialize(git: &Git, paths: &Paths, id: &str) -> Result<PathBuf, ExtractionError> {
    let repo = repository_path(paths, id);
    let target = working_copy_path(paths, id);

    if !tokio::fs::metadata(&repo).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(ExtractionError::MissingRepository(repo));
    }

    remove_dir_if_exists(&target).await
        .map_err(|source| ExtractionError::Cleanup { path: target.clone(), source })?;

    tokio::fs::create_dir_all(&paths.content_dir).await
        .map_err(|source| ExtractionError::Cleanup { path: paths.content_dir.clone(), source })?;

    let clone = git.run(
        [OsStr::new("clone"), OsStr::new("--quiet"), repo.as_os_str(), target.as_os_str()],
        git.clone_timeout(),
    ).await;

    if let Err(source) = clone {
        // A killed clone can leave a partial checkout behind
        if let Err(e) = remove_dir_if_exists(&target).await {
            error!("Could not remove partial working copy {}: {}", target.display(), e);
        }
        return Err(ExtractionError::Snapshot { repo, path: target, source });
    }

    let git_dir = target.join(".git");
    remove_dir_if_exists(&git_dir).await
        .map_err(|source| ExtractionError::StripMetadata { path: git_dir, source })?;

    debug!("Materialized {} into {}", repo.display(), target.display());
    Ok(target)
}

/// Removes the working copy and the backing repository of `id`.
/// Missing directories are fine, so this can be repeated after a crash.
pub async fn destroy(paths: &Paths, id: &str) {
    for path in [working_copy_path(paths, id), repository_path(paths, id)] {
        if let Err(e) = remove_dir_if_exists(&path).await {
            error!("Could not remove {}: {}", path.display(), e);
        }
    }
}
