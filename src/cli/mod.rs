//! Command-line interface for mmrag.
//!
//! Provides commands for ingesting files, searching the index, listing and
//! inspecting records, and showing the resolved configuration. Every command
//! prints pretty JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;

use crate::config::ResolvedConfig;
use crate::core::Engine;
use crate::domain::{ContentHash, FileKind};
use crate::library::file_extension;

/// mmrag - content-addressed multimodal ingestion and keyword search
#[derive(Parser, Debug)]
#[command(name = "mmrag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a local file
    Ingest {
        /// File to ingest
        path: PathBuf,

        /// Declared kind (inferred from the extension if not specified)
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Search indexed files by keyword
    Search {
        /// Search query (case-insensitive substring)
        query: String,

        /// Restrict to these kinds (comma-separated, e.g. "document,audio")
        #[arg(short, long)]
        types: Option<String>,
    },

    /// List indexed files
    Files,

    /// Show the full record for a content hash
    Show {
        /// Content hash (hex)
        hash: String,
    },

    /// Show resolved configuration and extractor capabilities
    Config,
}

/// Kind for CLI (maps to FileKind)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Document,
    Video,
    Audio,
}

impl From<KindArg> for FileKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Document => FileKind::Document,
            KindArg::Video => FileKind::Video,
            KindArg::Audio => FileKind::Audio,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<ExitCode> {
        let config = ResolvedConfig::load().context("Failed to load configuration")?;

        match self.command {
            Commands::Ingest { path, kind } => ingest_file(config, &path, kind).await,
            Commands::Search { query, types } => search_files(config, &query, types).await,
            Commands::Files => list_files(config).await,
            Commands::Show { hash } => show_file(config, &hash).await,
            Commands::Config => show_config(config).await,
        }
    }
}

async fn open_engine(config: ResolvedConfig) -> Result<Engine> {
    let root = config.root.clone();
    Engine::open(config)
        .await
        .with_context(|| format!("Failed to open data root: {}", root.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Print a request error the way an API would report it
fn reject(detail: impl std::fmt::Display) -> Result<ExitCode> {
    print_json(&json!({ "detail": detail.to_string() }))?;
    Ok(ExitCode::FAILURE)
}

/// Kind implied by a filename's extension
fn infer_kind(path: &Path) -> Option<FileKind> {
    let name = path.file_name()?.to_string_lossy();
    FileKind::from_extension(&file_extension(&name))
}

/// Ingest a local file
async fn ingest_file(config: ResolvedConfig, path: &Path, kind: Option<KindArg>) -> Result<ExitCode> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let kind = match kind.map(FileKind::from).or_else(|| infer_kind(path)) {
        Some(kind) => kind,
        None => {
            return reject(format!(
                "Cannot infer file type of {:?}; pass --kind",
                filename
            ))
        }
    };

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let engine = open_engine(config).await?;
    match engine.ingest(&bytes, &filename, kind).await {
        Ok(receipt) => {
            print_json(&receipt)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_validation() => reject(e),
        Err(e) => Err(e).with_context(|| format!("Failed to ingest {}", path.display())),
    }
}

/// Search the index
async fn search_files(config: ResolvedConfig, query: &str, types: Option<String>) -> Result<ExitCode> {
    let engine = open_engine(config).await?;
    match engine.search_types(query, types.as_deref()).await {
        Ok(response) => {
            print_json(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_validation() => reject(e),
        Err(e) => Err(e.into()),
    }
}

/// List every indexed file
async fn list_files(config: ResolvedConfig) -> Result<ExitCode> {
    let engine = open_engine(config).await?;
    print_json(&engine.list().await)?;
    Ok(ExitCode::SUCCESS)
}

/// Show one record
async fn show_file(config: ResolvedConfig, hash: &str) -> Result<ExitCode> {
    let engine = open_engine(config).await?;
    match engine.file_info(&ContentHash::from_hex(hash)).await {
        Some(record) => {
            print_json(&record)?;
            Ok(ExitCode::SUCCESS)
        }
        None => reject("File not found"),
    }
}

/// Show the resolved configuration (for debugging)
async fn show_config(config: ResolvedConfig) -> Result<ExitCode> {
    let engine = open_engine(config).await?;
    let config = engine.config();
    let layout = engine.layout();

    print_json(&json!({
        "config_file": config.config_file,
        "root": layout.root(),
        "metadata": layout.metadata_path(),
        "directories": layout.directories(),
        "indexing": {
            "chunk_size": config.indexing.chunk_size,
            "preview_chars": config.indexing.preview_chars,
            "snippet_context": config.indexing.snippet_context,
        },
        "max_upload_bytes": config.max_upload_bytes,
        "extractors": engine.capabilities(),
    }))?;
    Ok(ExitCode::SUCCESS)
}
