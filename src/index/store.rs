use std::fs;
use std::io;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::IndexError;
use crate::post::Post;

/// Every indexed post, newest first, plus the public posts in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostIndex {
    posts: Vec<Post>,
    public: Vec<Post>,
}

impl PostIndex {
    pub fn new() -> Self {
        PostIndex::default()
    }

    /// Builds an index from records in any order. Later duplicates of an id replace earlier ones.
    pub fn from_posts(posts: Vec<Post>) -> Self {
        let mut index = PostIndex::new();
        for post in posts {
            index.replace_or_push(post);
        }
        index.reindex();
        index
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn public_posts(&self) -> &[Post] {
        &self.public
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.posts.iter().map(|p| p.id.clone()).collect()
    }

    /// Replaces the entry with the same id in place, or appends a new one.
    pub fn upsert(&mut self, post: Post) {
        self.replace_or_push(post);
        self.reindex();
    }

    pub fn remove(&mut self, id: &str) -> Option<Post> {
        let pos = self.posts.iter().position(|p| p.id == id)?;
        let post = self.posts.remove(pos);
        self.reindex();
        Some(post)
    }

    fn replace_or_push(&mut self, post: Post) {
        match self.posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post,
            None => self.posts.push(post),
        }
    }

    // sort_by is stable: equal timestamps keep their insertion order
    fn reindex(&mut self) {
        self.posts.sort_by(|a, b| a.cmp_recency(b));
        self.public = self.posts.iter()
            .filter(|p| p.is_public())
            .cloned()
            .collect();
    }

    /// Writes the index as JSON next to `path` and renames it into place,
    /// so readers never see a half written file.
    pub fn persist(&self, path: &Path) -> Result<(), IndexError> {
        let to_error = |source: io::Error| IndexError::Persistence { path: path.to_path_buf(), source };

        let json = serde_json::to_vec_pretty(&self.posts)
            .map_err(|e| to_error(io::Error::new(ErrorKind::InvalidData, e)))?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(to_error)?;

        let file_name = path.file_name()
            .ok_or_else(|| to_error(io::Error::new(ErrorKind::InvalidInput, "index path has no file name")))?;
        let temp_path = parent.join(format!(".{}.{}.tmp", file_name.to_string_lossy(), uuid::Uuid::new_v4()));

        let written = (|| -> io::Result<()> {
            let mut temp_file = fs::File::create(&temp_path)?;
            temp_file.write_all(&json)?;
            temp_file.sync_all()?;
            drop(temp_file);
            fs::rename(&temp_path, path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(to_error(e));
        }

        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }

        Ok(())
    }

    pub fn load(path: &Path) -> Result<PostIndex, IndexError> {
        let to_error = |reason: String| IndexError::Load { path: path.to_path_buf(), reason };

        let content = fs::read(path).map_err(|e| to_error(e.to_string()))?;
        let posts: Vec<Post> = serde_json::from_slice(&content).map_err(|e| to_error(e.to_string()))?;
        Ok(PostIndex::from_posts(posts))
    }
}
