use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Paths;

pub const POST_DATA_MD: &str = "<!-- public -->
# What I learned after 20+ years of software development

![cover](cover.png)

How to be a great software engineer?

Someone asked me this question today and I didn’t have an answer.

![second](second.png)

## Non technical
";

pub const SIMPLE_POST_MD: &str = "# Title\n\n![img](a.png)\n\nFirst real paragraph.";

pub fn test_paths(root: &Path) -> Paths {
    Paths {
        content_dir: root.join("data"),
        repo_dir: root.join("git"),
        index_file: root.join("data").join(".pages").join("postsList.json"),
    }
}

fn git(repo: &Path, args: &[&str], date: Option<&str>) {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo)
        .args(["-c", "user.name=gitblog", "-c", "user.email=gitblog@localhost", "-c", "commit.gpgsign=false"])
        .args(args);
    if let Some(date) = date {
        cmd.env("GIT_AUTHOR_DATE", date).env("GIT_COMMITTER_DATE", date);
    }
    let output = cmd.output().expect("git must be installed to run these tests");
    assert!(output.status.success(), "git {:?} failed: {}", args, String::from_utf8_lossy(&output.stderr));
}

pub fn init_repo(paths: &Paths, id: &str) -> PathBuf {
    let repo = paths.repo_dir.join(id);
    fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "-q"], None);
    repo
}

/// Writes `name` into the repository and commits it with `date` as author and committer date.
pub fn commit_file(repo: &Path, name: &str, content: &str, date: &str) {
    fs::write(repo.join(name), content).unwrap();
    git(repo, &["add", name], None);
    git(repo, &["commit", "-q", "-m", &format!("update {}", name)], Some(date));
}

/// Repository with a single commit of the primary document.
pub fn post_repo(paths: &Paths, id: &str, readme: &str, date: &str) -> PathBuf {
    let repo = init_repo(paths, id);
    commit_file(&repo, "README.md", readme, date);
    repo
}

/// Writes an executable shell script standing in for the git binary.
pub fn fake_git(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("fake-git");
    fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// `date` (RFC 3339) as the local wall-clock time git reports for it.
pub fn local_time(date: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(date).unwrap()
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
