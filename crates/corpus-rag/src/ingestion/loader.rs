//! Corpus directory loading
//!
//! Walks the corpus, extracts every supported file on a rayon pool and turns
//! each text unit into a [`Document`]. Per-file failures are collected, not
//! fatal.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::RagConfig;
use crate::crawl::report::{url_map, REPORT_FILE_NAME};
use crate::error::{Error, ExtractionError, Result};
use crate::types::{Document, DocumentMeta, FileType};

use super::extractor::Extractors;

/// Outcome of loading a corpus directory
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Documents in sorted path order, extractor order within a file
    pub documents: Vec<Document>,
    /// Files that failed to extract
    pub errors: Vec<ExtractionError>,
    /// Files with unsupported extensions
    pub skipped: Vec<PathBuf>,
}

/// Loads a corpus directory into documents
#[derive(Clone)]
pub struct DocumentLoader {
    extractors: Extractors,
    workers: usize,
}

impl DocumentLoader {
    /// Create a loader using `workers` extraction threads
    pub fn new(extractors: Extractors, workers: usize) -> Self {
        Self {
            extractors,
            workers: workers.max(1),
        }
    }

    /// Create a loader from configuration
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(
            Extractors::from_config(config),
            config.processing.file_workers(),
        )
    }

    /// Load every supported file under `dir`
    pub fn load(&self, dir: &Path) -> Result<LoadReport> {
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Corpus directory not found: {}", dir.display()),
            )));
        }

        let urls = url_map(dir);
        let mut report = LoadReport::default();
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || entry.file_name() == REPORT_FILE_NAME {
                continue;
            }

            let path = entry.into_path();
            if FileType::from_path(&path).is_supported() {
                files.push(path);
            } else {
                tracing::debug!("Skipping unsupported file {}", path.display());
                report.skipped.push(path);
            }
        }
        files.sort();

        tracing::info!(
            "Extracting {} files from {} with {} workers",
            files.len(),
            dir.display(),
            self.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build extraction pool: {}", e)))?;

        let results: Vec<_> = pool.install(|| {
            files
                .par_iter()
                .map(|path| (path, self.extractors.extract(path)))
                .collect()
        });

        for (path, result) in results {
            match result {
                Ok(units) => {
                    let file_type = FileType::from_path(path);
                    let file_path = path.display().to_string();
                    let url = path
                        .file_name()
                        .and_then(|name| urls.get(&*name.to_string_lossy()))
                        .cloned();

                    tracing::debug!("Extracted {} units from {}", units.len(), file_path);

                    for (unit_index, unit) in units.into_iter().enumerate() {
                        let meta = DocumentMeta {
                            file_type,
                            file_path: file_path.clone(),
                            page: unit.position,
                            url: url.clone(),
                        };
                        report.documents.push(Document::new(unit.text, meta, unit_index));
                    }
                }
                Err(e) => {
                    tracing::warn!("Extraction failed: {}", e);
                    report.errors.push(e);
                }
            }
        }

        tracing::info!(
            "Loaded {} documents ({} failed, {} skipped)",
            report.documents.len(),
            report.errors.len(),
            report.skipped.len()
        );

        Ok(report)
    }
}
