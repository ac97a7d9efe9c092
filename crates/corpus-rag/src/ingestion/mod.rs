//! Corpus ingestion: per-format extraction, loading, cleaning and chunking

mod chunker;
mod cleaner;
pub mod external;
pub mod extractor;
mod loader;
pub mod slides;

pub use chunker::SentenceChunker;
pub use cleaner::DocumentCleaner;
pub use external::{ImageExtractor, MediaExtractor, OcrEngine, TesseractOcr, Transcriber, WhisperCli};
pub use extractor::{CsvExtractor, ExtractionResult, Extractor, Extractors, PdfExtractor, TextExtractor};
pub use loader::{DocumentLoader, LoadReport};
pub use slides::PptxExtractor;
