use std::sync::Arc;

use arc_swap::ArcSwap;
use spdlog::{error, info, trace};
use tokio::sync::mpsc::Sender;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::BootMode;
use crate::content::renderer::MarkdownRenderer;
use crate::error::IndexError;
use crate::index::store::PostIndex;
use crate::index::synchronizer::{RebuildReport, Synchronizer, UpdateOutcome};

enum IndexCommand {
    Update {
        id: String,
        reply: oneshot::Sender<Result<UpdateOutcome, IndexError>>,
    },
    Rebuild {
        reply: oneshot::Sender<Result<RebuildReport, IndexError>>,
    },
    LoadCache {
        reply: oneshot::Sender<usize>,
    },
}

/// Runs the synchronizer on its own task. Mutations queue up and are applied
/// one at a time; after each one the new index is published for readers.
pub struct IndexWorker {
    _worker_task: JoinHandle<()>,
    handle: IndexHandle,
}

impl IndexWorker {
    pub fn new<R>(mut synchronizer: Synchronizer<R>) -> Self
    where
        R: MarkdownRenderer + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<IndexCommand>(64);
        let snapshot = Arc::new(ArcSwap::from_pointee(synchronizer.index().clone()));
        let published = snapshot.clone();

        let worker_task = tokio::spawn(async move {
            info!("Starting index worker");
            while let Some(command) = rx.recv().await {
                match command {
                    IndexCommand::Update { id, reply } => {
                        trace!("Updating post {}", id);
                        let res = synchronizer.update_post(&id).await;
                        published.store(Arc::new(synchronizer.index().clone()));
                        let _ = reply.send(res);
                    }
                    IndexCommand::Rebuild { reply } => {
                        let res = synchronizer.rebuild().await;
                        published.store(Arc::new(synchronizer.index().clone()));
                        let _ = reply.send(res);
                    }
                    IndexCommand::LoadCache { reply } => {
                        let count = synchronizer.load_cache().await;
                        published.store(Arc::new(synchronizer.index().clone()));
                        let _ = reply.send(count);
                    }
                }
            }
            info!("Index worker stopped");
        });

        Self {
            _worker_task: worker_task,
            handle: IndexHandle { sender: tx, snapshot },
        }
    }

    pub fn new_handle(&self) -> IndexHandle {
        self.handle.clone()
    }
}

/// Cheap to clone. Reads never wait for a running mutation.
#[derive(Clone)]
pub struct IndexHandle {
    sender: Sender<IndexCommand>,
    snapshot: Arc<ArcSwap<PostIndex>>,
}

impl IndexHandle {
    /// The index as of the last finished mutation.
    pub fn snapshot(&self) -> Arc<PostIndex> {
        self.snapshot.load_full()
    }

    pub async fn update(&self, id: &str) -> Result<UpdateOutcome, IndexError> {
        let (reply, response) = oneshot::channel();
        self.send(IndexCommand::Update { id: id.to_string(), reply }).await?;
        response.await.map_err(|_| IndexError::WorkerStopped)?
    }

    pub async fn rebuild(&self) -> Result<RebuildReport, IndexError> {
        let (reply, response) = oneshot::channel();
        self.send(IndexCommand::Rebuild { reply }).await?;
        response.await.map_err(|_| IndexError::WorkerStopped)?
    }

    pub async fn load_cache(&self) -> Result<usize, IndexError> {
        let (reply, response) = oneshot::channel();
        self.send(IndexCommand::LoadCache { reply }).await?;
        response.await.map_err(|_| IndexError::WorkerStopped)
    }

    /// Fills the index at startup. A failed rebuild still leaves whatever it
    /// managed to index in place.
    pub async fn boot(&self, mode: BootMode) -> Result<(), IndexError> {
        match mode {
            BootMode::Rebuild => {
                let report = self.rebuild().await?;
                info!("Boot rebuild indexed {} posts", report.indexed.len());
            }
            BootMode::LoadCache => {
                let count = self.load_cache().await?;
                info!("Boot loaded {} posts from cache", count);
            }
        }
        Ok(())
    }

    async fn send(&self, command: IndexCommand) -> Result<(), IndexError> {
        self.sender.send(command).await.map_err(|e| {
            error!("Index worker is gone: {}", e);
            IndexError::WorkerStopped
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use crate::config::parse_config;
    use crate::content::renderer::GfmRenderer;
    use crate::index::synchronizer::RemovalReason;
    use crate::post::PostState;
    use crate::test_data::{commit_file, post_repo, test_paths};

    use super::*;

    fn worker(root: &Path) -> IndexWorker {
        let mut config = parse_config(r#"
[paths]
content_dir = "data"
repo_dir = "git"
index_file = "data/.pages/postsList.json"

[posts]

[server]
address = "127.0.0.1"
port = 8080
"#).unwrap();
        config.paths = test_paths(root);
        IndexWorker::new(Synchronizer::new(&config, GfmRenderer::default()))
    }

    #[tokio::test]
    async fn test_update_publishes_snapshot() {
        let root = TempDir::new().unwrap();
        let paths = test_paths(root.path());
        let repo = post_repo(&paths, "post", "<!-- public -->\n# Post\n", "2024-01-01T00:00:00+00:00");

        let handle = worker(root.path()).new_handle();
        let before = handle.snapshot();
        assert!(before.is_empty());

        handle.update("post").await.unwrap();
        let after = handle.snapshot();
        assert_eq!(after.public_posts().len(), 1);
        // Snapshots taken earlier are not affected
        assert!(before.is_empty());

        commit_file(&repo, "README.md", "<!-- delete -->\n", "2024-02-01T00:00:00+00:00");
        let outcome = handle.update("post").await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Removed { reason: RemovalReason::Deleted, .. }));
        assert!(handle.snapshot().is_empty());
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let root = TempDir::new().unwrap();
        let paths = test_paths(root.path());
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            post_repo(&paths, id, &format!("<!-- public -->\n# {}\n", id), &format!("2024-01-0{}T00:00:00+00:00", i + 1));
        }

        let handle = worker(root.path()).new_handle();
        let updates = ["a", "b", "c", "d", "a", "c"].map(|id| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.update(id).await })
        });
        for update in updates {
            assert!(update.await.unwrap().is_ok());
        }

        let snapshot = handle.snapshot();
        let ids: Vec<&str> = snapshot.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["d", "c", "b", "a"]);
        assert!(snapshot.posts().iter().all(|p| p.state == PostState::Public));
        assert_eq!(PostIndex::load(&paths.index_file).unwrap(), *snapshot);
    }

    #[tokio::test]
    async fn test_boot_modes() {
        let root = TempDir::new().unwrap();
        let paths = test_paths(root.path());
        post_repo(&paths, "post", "<!-- public -->\n# Post\n", "2024-01-01T00:00:00+00:00");

        let handle = worker(root.path()).new_handle();
        handle.boot(BootMode::Rebuild).await.unwrap();
        assert!(handle.snapshot().contains("post"));

        let cached = worker(root.path()).new_handle();
        cached.boot(BootMode::LoadCache).await.unwrap();
        assert_eq!(*cached.snapshot(), *handle.snapshot());
    }

    #[tokio::test]
    async fn test_invalid_id_is_rejected() {
        let root = TempDir::new().unwrap();
        let handle = worker(root.path()).new_handle();
        assert!(matches!(handle.update("a/b").await, Err(IndexError::InvalidId(_))));
    }
}
