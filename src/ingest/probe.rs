//! ffprobe-based media metadata.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::extract::{ExtractError, MediaInfo, MediaProbe};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    sample_rate: Option<String>,
    duration: Option<String>,
}

/// Reads duration and sample rate with `ffprobe`
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ExtractError> {
        let tool_error = |message: String| ExtractError::Tool {
            tool: "ffprobe".to_string(),
            message,
        };

        let output = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| tool_error(format!("failed to run: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(tool_error(stderr.trim().to_string()));
        }

        parse_probe_output(&output.stdout).map_err(tool_error)
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<MediaInfo, String> {
    let probe: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("failed to parse output: {}", e))?;

    // "N/A", "nan" and "inf" are all unknown
    let parse_secs = |s: &Option<String>| {
        s.as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
    };

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| parse_secs(&f.duration))
        .or_else(|| probe.streams.iter().find_map(|s| parse_secs(&s.duration)))
        .unwrap_or(0.0);

    let sample_rate = audio
        .and_then(|s| s.sample_rate.as_deref())
        .and_then(|r| r.trim().parse::<u32>().ok());

    Ok(MediaInfo {
        duration_seconds: duration,
        sample_rate,
    })
}
