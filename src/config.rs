use std::io::ErrorKind;
use std::path::PathBuf;
use std::{env, fs, io};

use serde::Deserialize;

use crate::post::PostState;

#[derive(Deserialize, Debug, Clone)]
pub struct Paths {
    /// One working copy per post id
    pub content_dir: PathBuf,
    /// One backing repository per post id
    pub repo_dir: PathBuf,
    pub index_file: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Posts {
    #[serde(default = "default_post_file")]
    pub post_file: String,
    #[serde(default = "default_state")]
    pub default_state: PostState,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BootMode {
    /// Re-materialize and re-index every post
    #[default]
    Rebuild,
    /// Trust the persisted index file
    LoadCache,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Boot {
    #[serde(default)]
    pub mode: BootMode,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GitSettings {
    #[serde(default = "default_git_binary")]
    pub binary: String,
    #[serde(default = "default_clone_timeout")]
    pub clone_timeout_secs: u64,
    #[serde(default = "default_log_timeout")]
    pub log_timeout_secs: u64,
}

impl Default for GitSettings {
    fn default() -> Self {
        GitSettings {
            binary: default_git_binary(),
            clone_timeout_secs: default_clone_timeout(),
            log_timeout_secs: default_log_timeout(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Server {
    pub address: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub paths: Paths,
    pub posts: Posts,
    #[serde(default)]
    pub boot: Boot,
    #[serde(default)]
    pub git: GitSettings,
    pub server: Server,
    pub log: Option<Log>,
}

fn default_post_file() -> String {
    "README.md".to_string()
}

fn default_state() -> PostState {
    PostState::Private
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_clone_timeout() -> u64 {
    60
}

fn default_log_timeout() -> u64 {
    5
}

fn parse_path(path: PathBuf) -> io::Result<PathBuf> {
    if !path.starts_with("${exe_dir}") {
        return Ok(path);
    }

    let cur_exe = env::current_exe()?;
    let exe_dir = cur_exe.parent()
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "Executable has no parent directory"))?;
    let rest = path.strip_prefix("${exe_dir}")
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e.to_string()))?;
    Ok(exe_dir.join(rest))
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    let mut cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    cfg.paths = Paths {
        content_dir: parse_path(cfg.paths.content_dir)?,
        repo_dir: parse_path(cfg.paths.repo_dir)?,
        index_file: parse_path(cfg.paths.index_file)?,
    };

    if cfg.git.log_timeout_secs == 0 || cfg.git.clone_timeout_secs == 0 {
        return Err(io::Error::new(ErrorKind::InvalidData, "git timeouts must be greater than zero"));
    }

    Ok(cfg)
}

pub fn read_config(cfg_path: &PathBuf) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}
