//! Whisper transcription backend.
//!
//! Shells out to a local whisper binary for transcription.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::extract::{ExtractError, TranscriptResult, Transcriber};

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    end: f64,
}

/// Transcribes with the `whisper` CLI
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    binary: PathBuf,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(binary: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
        }
    }

    fn tool_error(&self, message: impl Into<String>) -> ExtractError {
        ExtractError::Tool {
            tool: "whisper".to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult, ExtractError> {
        // Create temp dir for output
        let temp_dir = tempfile::tempdir()
            .map_err(|e| self.tool_error(format!("failed to create temp dir: {}", e)))?;

        debug!(path = %audio_path.display(), model = %self.model, "Running whisper");

        let output = Command::new(&self.binary)
            .arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(temp_dir.path())
            .arg("--output_format")
            .arg("json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.tool_error(format!("failed to run: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.tool_error(stderr.trim().to_string()));
        }

        // Find and parse JSON output
        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = temp_dir.path().join(format!("{}.json", stem));

        let json_content = tokio::fs::read_to_string(&json_path)
            .await
            .map_err(|e| self.tool_error(format!("failed to read output: {}", e)))?;

        parse_whisper_output(&json_content).map_err(|e| self.tool_error(e))
    }
}

fn parse_whisper_output(json: &str) -> Result<TranscriptResult, String> {
    let whisper: WhisperOutput =
        serde_json::from_str(json).map_err(|e| format!("failed to parse output: {}", e))?;

    let duration = whisper.segments.last().map(|s| s.end).unwrap_or(0.0);

    Ok(TranscriptResult {
        text: whisper.text.trim().to_string(),
        language: whisper.language,
        duration_seconds: duration,
    })
}
