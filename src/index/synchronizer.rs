use std::collections::{BTreeSet, HashSet};
use std::io;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use spdlog::{error, info, warn};

use crate::config::{Config, Paths};
use crate::content::metadata::extract;
use crate::content::renderer::MarkdownRenderer;
use crate::content::state::classify;
use crate::error::{ExtractionError, IndexError};
use crate::git::materialize::{destroy, materialize, repository_path};
use crate::git::timestamp::resolve_timestamp;
use crate::git::Git;
use crate::index::store::PostIndex;
use crate::post::{is_valid_id, Post, PostState, Visibility};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Deleted,
    ExtractionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Indexed { post: Post },
    Removed { id: String, reason: RemovalReason },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub indexed: Vec<String>,
    /// Classified as deleted, or gone from both roots
    pub removed: Vec<String>,
    /// Could not be extracted and were dropped
    pub failed: Vec<String>,
}

impl RebuildReport {
    fn record(&mut self, outcome: UpdateOutcome) {
        match outcome {
            UpdateOutcome::Indexed { post } => self.indexed.push(post.id),
            UpdateOutcome::Removed { id, reason: RemovalReason::Deleted } => self.removed.push(id),
            UpdateOutcome::Removed { id, reason: RemovalReason::ExtractionFailed(_) } => self.failed.push(id),
        }
    }
}

/// Owns the post index and keeps it in line with the post repositories.
///
/// Nothing here is synchronised: the caller makes sure a single task drives it
/// (see [`crate::index::worker`]).
pub struct Synchronizer<R: MarkdownRenderer> {
    paths: Paths,
    post_file: String,
    default_state: PostState,
    git: Git,
    renderer: R,
    index: PostIndex,
}

impl<R: MarkdownRenderer> Synchronizer<R> {
    pub fn new(config: &Config, renderer: R) -> Self {
        Synchronizer {
            paths: config.paths.clone(),
            post_file: config.posts.post_file.clone(),
            default_state: config.posts.default_state,
            git: Git::new(&config.git),
            renderer,
            index: PostIndex::new(),
        }
    }

    pub fn index(&self) -> &PostIndex {
        &self.index
    }

    /// Replaces the in-memory index with the persisted one, without checking it
    /// against the repositories. A missing or broken file gives an empty index.
    pub async fn load_cache(&mut self) -> usize {
        let path = self.paths.index_file.clone();
        self.index = match tokio::task::spawn_blocking(move || PostIndex::load(&path)).await {
            Ok(Ok(index)) => index,
            Ok(Err(e)) => {
                warn!("Starting with an empty index: {}", e);
                PostIndex::new()
            }
            Err(join_error) => {
                warn!("Starting with an empty index: index load task failed: {}", join_error);
                PostIndex::new()
            }
        };
        info!("Loaded {} posts ({} public) from {}",
            self.index.len(), self.index.public_posts().len(), self.paths.index_file.display());
        self.index.len()
    }

    /// Re-reads one post after its repository changed.
    pub async fn update_post(&mut self, id: &str) -> Result<UpdateOutcome, IndexError> {
        if !is_valid_id(id) {
            return Err(IndexError::InvalidId(id.to_string()));
        }

        let outcome = self.process(id).await;
        self.persist().await?;
        Ok(outcome)
    }

    /// Reconciles every post that already has an entry, drops entries whose
    /// directories are gone, then indexes directories seen for the first time.
    pub async fn rebuild(&mut self) -> Result<RebuildReport, IndexError> {
        let mut candidates = list_post_dirs(&self.paths.content_dir).await?;
        candidates.extend(list_post_dirs(&self.paths.repo_dir).await?);

        let mut report = RebuildReport::default();

        for id in self.index.ids() {
            if !candidates.contains(&id) {
                info!("Dropping {}: no working copy or repository left", id);
                self.index.remove(&id);
                report.removed.push(id);
            }
        }

        let mut processed = HashSet::new();
        for id in candidates.iter().filter(|id| self.index.contains(id)).cloned().collect::<Vec<_>>() {
            let outcome = self.process(&id).await;
            report.record(outcome);
            processed.insert(id);
        }

        for id in candidates.iter().filter(|id| !processed.contains(*id)) {
            let outcome = self.process(id).await;
            report.record(outcome);
        }

        info!("Rebuild finished: {} indexed, {} removed, {} failed",
            report.indexed.len(), report.removed.len(), report.failed.len());
        for id in report.failed.iter() {
            warn!("Post {} could not be extracted and is not listed", id);
        }

        self.persist().await?;
        Ok(report)
    }

    async fn process(&mut self, id: &str) -> UpdateOutcome {
        match self.inspect(id).await {
            Ok(Some(post)) => {
                info!("Indexed {}", post);
                self.index.upsert(post.clone());
                UpdateOutcome::Indexed { post }
            }
            Ok(None) => {
                info!("Removing {}: marked for deletion", id);
                self.remove(id).await;
                UpdateOutcome::Removed { id: id.to_string(), reason: RemovalReason::Deleted }
            }
            Err(e) => {
                warn!("Removing {}: {}", id, e);
                self.remove(id).await;
                UpdateOutcome::Removed { id: id.to_string(), reason: RemovalReason::ExtractionFailed(e.to_string()) }
            }
        }
    }

    /// Materializes `id` and builds its record. `None` means the post asked to be deleted.
    async fn inspect(&self, id: &str) -> Result<Option<Post>, ExtractionError> {
        let working_copy = materialize(&self.git, &self.paths, id).await?;
        let repo = repository_path(&self.paths, id);

        let post_path = working_copy.join(&self.post_file);
        let raw = match tokio::fs::read(&post_path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let last_modified = resolve_timestamp(&self.git, &repo).await;
                return Ok(Some(Post::stub(id, last_modified)));
            }
            Err(source) => return Err(ExtractionError::Read { path: post_path, source }),
        };

        let state = match classify(&raw, self.default_state) {
            Visibility::Delete => return Ok(None),
            Visibility::Public => PostState::Public,
            Visibility::Private => PostState::Private,
        };

        let html = self.renderer.render(&raw)
            .map_err(|source| ExtractionError::Render { path: post_path.clone(), source })?;
        let meta = extract(&html);
        let last_modified = resolve_timestamp(&self.git, &repo).await;

        Ok(Some(Post {
            id: id.to_string(),
            title: meta.title,
            excerpt_html: meta.excerpt_html,
            banner_path: meta.banner_path,
            last_modified,
            state,
        }))
    }

    // Storage first, entry second: a crash in between leaves an entry that the
    // next update or rebuild of the same id removes again.
    async fn remove(&mut self, id: &str) {
        destroy(&self.paths, id).await;
        self.index.remove(id);
    }

    async fn persist(&self) -> Result<(), IndexError> {
        let index = self.index.clone();
        let path = self.paths.index_file.clone();
        match tokio::task::spawn_blocking(move || index.persist(&path)).await {
            Ok(res) => res.inspect_err(|e| error!("{}", e)),
            Err(join_error) => {
                error!("Index persistence task failed: {}", join_error);
                Err(IndexError::Persistence {
                    path: self.paths.index_file.clone(),
                    source: io::Error::other(join_error.to_string()),
                })
            }
        }
    }
}

/// Names of the directories under `root` that can be post ids. A missing root has none.
async fn list_post_dirs(root: &Path) -> Result<BTreeSet<String>, IndexError> {
    let to_error = |source: io::Error| IndexError::Enumerate { path: root.to_path_buf(), source };

    let mut ids = BTreeSet::new();
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
        Err(e) => return Err(to_error(e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(to_error)? {
        if !entry.file_type().await.map_err(to_error)?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_valid_id(name) {
                ids.insert(name.to_string());
            }
        }
    }

    Ok(ids)
}
