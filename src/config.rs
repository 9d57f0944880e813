//! Configuration for mmrag.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MMRAG_HOME, MMRAG_CHUNK_SIZE, MMRAG_EXTRACT_TIMEOUT,
//!    MMRAG_MAX_UPLOAD_BYTES, WHISPER_PATH, WHISPER_MODEL, FFPROBE_PATH)
//! 2. Config file (.mmrag/config.yaml)
//! 3. Defaults (./data)
//!
//! Config file discovery:
//! - Searches current directory and parents for .mmrag/config.yaml
//! - Paths in config file are relative to the project root (the parent of .mmrag/)

pub mod paths;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub use paths::StorageLayout;

const DEFAULT_ROOT: &str = "./data";
const DEFAULT_CHUNK_SIZE: usize = 500;
const DEFAULT_PREVIEW_CHARS: usize = 1000;
const DEFAULT_SNIPPET_CONTEXT: usize = 100;
const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;
const DEFAULT_WHISPER_MODEL: &str = "base";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub indexing: Option<IndexingConfig>,
    #[serde(default)]
    pub extraction: Option<ExtractionConfig>,
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Data root (relative to the project root)
    pub root: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    pub chunk_size: Option<usize>,
    pub preview_chars: Option<usize>,
    pub snippet_context: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub timeout_seconds: Option<u64>,
    pub whisper_path: Option<String>,
    pub whisper_model: Option<String>,
    pub ffprobe_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Data root holding blobs and the snapshot
    pub root: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Indexing settings
    pub indexing: IndexingSettings,
    /// Extractor settings
    pub extraction: ExtractionSettings,
    /// Largest accepted upload
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct IndexingSettings {
    /// Character budget per chunk
    pub chunk_size: usize,
    /// Characters of extracted text kept as the searchable preview
    pub preview_chars: usize,
    /// Snippet window around a match
    pub snippet_context: usize,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            snippet_context: DEFAULT_SNIPPET_CONTEXT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    /// Upper bound on a single extraction call
    pub timeout_seconds: u64,
    /// Explicit whisper binary; PATH lookup when unset
    pub whisper_path: Option<PathBuf>,
    pub whisper_model: String,
    /// Explicit ffprobe binary; PATH lookup when unset
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_EXTRACT_TIMEOUT_SECS,
            whisper_path: None,
            whisper_model: DEFAULT_WHISPER_MODEL.to_string(),
            ffprobe_path: None,
        }
    }
}

impl ExtractionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ResolvedConfig {
    /// Defaults rooted at `root`, ignoring env and config files
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config_file: None,
            indexing: IndexingSettings::default(),
            extraction: ExtractionSettings::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let config_file = match find_config_file() {
            Some(path) => {
                let parsed = load_config_file(&path)?;
                Some((path, parsed))
            }
            None => None,
        };

        resolve(config_file, |key| std::env::var(key).ok())
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.root)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".mmrag").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn parse_env<T: std::str::FromStr>(value: Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", key, raw, e))
        })
        .transpose()
}

/// Merge env, config file and defaults
fn resolve<F>(config_file: Option<(PathBuf, ConfigFile)>, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ResolvedConfig::with_root(DEFAULT_ROOT);

    if let Some((ref config_path, ref file)) = config_file {
        // Base directory is the parent of .mmrag/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .parent() // .mmrag/
            .and_then(|p| p.parent()) // project root
            .unwrap_or(Path::new("."));

        config.root = match file.paths.root {
            Some(ref root) => resolve_path(base_dir, root),
            None => base_dir.join("data"),
        };

        if let Some(ref indexing) = file.indexing {
            let defaults = IndexingSettings::default();
            config.indexing = IndexingSettings {
                chunk_size: indexing.chunk_size.unwrap_or(defaults.chunk_size),
                preview_chars: indexing.preview_chars.unwrap_or(defaults.preview_chars),
                snippet_context: indexing.snippet_context.unwrap_or(defaults.snippet_context),
            };
        }

        if let Some(ref extraction) = file.extraction {
            config.extraction = ExtractionSettings {
                timeout_seconds: extraction
                    .timeout_seconds
                    .unwrap_or(DEFAULT_EXTRACT_TIMEOUT_SECS),
                whisper_path: extraction
                    .whisper_path
                    .as_deref()
                    .map(|p| resolve_path(base_dir, p)),
                whisper_model: extraction
                    .whisper_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_WHISPER_MODEL.to_string()),
                ffprobe_path: extraction
                    .ffprobe_path
                    .as_deref()
                    .map(|p| resolve_path(base_dir, p)),
            };
        }

        if let Some(max) = file.limits.as_ref().and_then(|l| l.max_upload_bytes) {
            config.max_upload_bytes = max;
        }
    }

    // Environment overrides everything
    if let Some(home) = env("MMRAG_HOME") {
        config.root = PathBuf::from(home);
    }
    if let Some(size) = parse_env(env("MMRAG_CHUNK_SIZE"), "MMRAG_CHUNK_SIZE")? {
        config.indexing.chunk_size = size;
    }
    if let Some(secs) = parse_env(env("MMRAG_EXTRACT_TIMEOUT"), "MMRAG_EXTRACT_TIMEOUT")? {
        config.extraction.timeout_seconds = secs;
    }
    if let Some(max) = parse_env(env("MMRAG_MAX_UPLOAD_BYTES"), "MMRAG_MAX_UPLOAD_BYTES")? {
        config.max_upload_bytes = max;
    }
    if let Some(path) = env("WHISPER_PATH") {
        config.extraction.whisper_path = Some(PathBuf::from(path));
    }
    if let Some(model) = env("WHISPER_MODEL") {
        config.extraction.whisper_model = model;
    }
    if let Some(path) = env("FFPROBE_PATH") {
        config.extraction.ffprobe_path = Some(PathBuf::from(path));
    }

    config.config_file = config_file.map(|(path, _)| path);
    Ok(config)
}
