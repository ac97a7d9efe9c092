//! Audio, video and image extraction through external tools
//!
//! Speech-to-text and OCR sit behind [`Transcriber`] and [`OcrEngine`] so
//! tests and alternative engines can be plugged in. The default engines shell
//! out to the `whisper` and `tesseract` command-line tools.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use crate::config::{OcrConfig, TranscriptionConfig};
use crate::error::ExtractionError;
use crate::types::TextUnit;

use super::extractor::{ExtractionResult, Extractor};

/// Speech-to-text capability: media file in, transcript segments out
pub trait Transcriber: Send + Sync {
    /// Transcribe a media file into ordered segments
    fn transcribe(&self, path: &Path) -> Result<Vec<String>, ExtractionError>;
}

/// OCR capability: image in, recognized text fragments out
pub trait OcrEngine: Send + Sync {
    /// Recognize text fragments in an image
    fn recognize(&self, path: &Path) -> Result<Vec<String>, ExtractionError>;
}

/// Runs the `whisper` CLI and reads its plain-text transcript
#[derive(Debug, Clone)]
pub struct WhisperCli {
    command: String,
    model: String,
}

impl WhisperCli {
    /// Create from transcription config
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            command: config.command.clone(),
            model: config.model.clone(),
        }
    }
}

impl Transcriber for WhisperCli {
    fn transcribe(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let output_dir = tempfile::tempdir()
            .map_err(|e| ExtractionError::corrupt(path, format!("Failed to create temp dir: {}", e)))?;

        let output = Command::new(&self.command)
            .arg(path)
            .args(["--model", &self.model, "--output_format", "txt", "--output_dir"])
            .arg(output_dir.path())
            .output()
            .map_err(|e| ExtractionError::tool_unavailable(path, &self.command, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::corrupt(
                path,
                format!("{} error: {}", self.command, stderr.trim()),
            ));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let transcript_path = output_dir.path().join(format!("{}.txt", stem));
        let transcript = std::fs::read_to_string(&transcript_path).map_err(|e| {
            ExtractionError::corrupt(path, format!("Missing transcript: {}", e))
        })?;

        let segments = non_empty_lines(&transcript);
        tracing::info!(
            "Transcribed {} into {} segments",
            path.display(),
            segments.len()
        );
        Ok(segments)
    }
}

/// Runs the `tesseract` CLI with output on stdout
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
}

impl TesseractOcr {
    /// Create from OCR config
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let output = Command::new(&self.command)
            .arg(path)
            .args(["stdout", "-l", "eng"])
            .output()
            .map_err(|e| ExtractionError::tool_unavailable(path, &self.command, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::corrupt(
                path,
                format!("{} error: {}", self.command, stderr.trim()),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let fragments = non_empty_lines(&text);
        tracing::info!(
            "OCR recognized {} fragments in {}",
            fragments.len(),
            path.display()
        );
        Ok(fragments)
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// One unit per transcript segment, no position
#[derive(Clone)]
pub struct MediaExtractor {
    transcriber: Arc<dyn Transcriber>,
}

impl MediaExtractor {
    /// Create with a speech-to-text engine
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }
}

impl Extractor for MediaExtractor {
    fn extract(&self, path: &Path) -> ExtractionResult {
        let segments = self.transcriber.transcribe(path)?;
        Ok(segments
            .into_iter()
            .map(|segment| TextUnit::new(segment, 0))
            .collect())
    }
}

/// A single unit of OCR fragments joined with ", ", no position
#[derive(Clone)]
pub struct ImageExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl ImageExtractor {
    /// Create with an OCR engine
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

impl Extractor for ImageExtractor {
    fn extract(&self, path: &Path) -> ExtractionResult {
        let fragments = self.ocr.recognize(path)?;
        if fragments.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TextUnit::new(fragments.join(", "), 0)])
    }
}
