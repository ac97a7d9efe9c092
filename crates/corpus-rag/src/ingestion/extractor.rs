//! Per-format text extraction
//!
//! Every supported format implements [`Extractor`]. [`Extractors`] maps a
//! [`FileType`] to its extractor, so call sites never branch on format.

use std::path::Path;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::ExtractionError;
use crate::types::{FileType, TextUnit};

use super::external::{ImageExtractor, MediaExtractor, OcrEngine, TesseractOcr, Transcriber, WhisperCli};
use super::slides::PptxExtractor;

/// Result of extracting one file
pub type ExtractionResult = std::result::Result<Vec<TextUnit>, ExtractionError>;

/// Converts one file into ordered text units
pub trait Extractor: Send + Sync {
    /// Extract text units in the file's physical order
    fn extract(&self, path: &Path) -> ExtractionResult;
}

/// One unit per PDF page, 1-based page numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, path: &Path) -> ExtractionResult {
        let doc = lopdf::Document::load(path)
            .map_err(|e| ExtractionError::corrupt(path, e.to_string()))?;

        let pages = doc.get_pages();
        let mut units = Vec::with_capacity(pages.len());

        for &page_number in pages.keys() {
            let text = match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        "No text extracted from {} page {}: {}",
                        path.display(),
                        page_number,
                        e
                    );
                    String::new()
                }
            };
            units.push(TextUnit::new(text, page_number));
        }

        Ok(units)
    }
}

/// The whole file as a single unit on page 1
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn extract(&self, path: &Path) -> ExtractionResult {
        let data = std::fs::read(path).map_err(|e| ExtractionError::corrupt(path, e.to_string()))?;
        let content = String::from_utf8_lossy(&data).to_string();
        Ok(vec![TextUnit::new(content, 1)])
    }
}

/// One unit per CSV row, non-empty cells joined with a comma
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExtractor;

impl Extractor for CsvExtractor {
    fn extract(&self, path: &Path) -> ExtractionResult {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ExtractionError::corrupt(path, e.to_string()))?;

        let mut units = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ExtractionError::corrupt(path, e.to_string()))?;
            let joined = record
                .iter()
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(",");

            if !joined.is_empty() {
                units.push(TextUnit::new(joined, row as u32 + 1));
            }
        }

        Ok(units)
    }
}

/// Format-to-extractor mapping
#[derive(Clone)]
pub struct Extractors {
    pdf: PdfExtractor,
    text: TextExtractor,
    media: MediaExtractor,
    image: ImageExtractor,
    slides: PptxExtractor,
    table: CsvExtractor,
}

impl Extractors {
    /// Build extractors with the given speech-to-text and OCR capabilities
    pub fn new(transcriber: Arc<dyn Transcriber>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            pdf: PdfExtractor,
            text: TextExtractor,
            media: MediaExtractor::new(transcriber),
            image: ImageExtractor::new(ocr),
            slides: PptxExtractor,
            table: CsvExtractor,
        }
    }

    /// Build extractors backed by the configured command-line tools
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(
            Arc::new(WhisperCli::new(&config.transcription)),
            Arc::new(TesseractOcr::new(&config.ocr)),
        )
    }

    /// Extractor for a file type, `None` when the type is unsupported
    pub fn get(&self, file_type: FileType) -> Option<&dyn Extractor> {
        match file_type {
            FileType::Pdf => Some(&self.pdf),
            FileType::Txt => Some(&self.text),
            FileType::Audio | FileType::Video => Some(&self.media),
            FileType::Image => Some(&self.image),
            FileType::Pptx => Some(&self.slides),
            FileType::Csv => Some(&self.table),
            FileType::Unknown => None,
        }
    }

    /// Extract a file, dispatching on its extension
    pub fn extract(&self, path: &Path) -> ExtractionResult {
        let file_type = FileType::from_path(path);
        match self.get(file_type) {
            Some(extractor) => extractor.extract(path),
            None => Err(ExtractionError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: path
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_string())
                    .unwrap_or_default(),
            }),
        }
    }
}
