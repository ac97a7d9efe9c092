//! Document text normalization

use std::collections::{HashMap, HashSet};

use crate::types::{Document, FileType};

/// Files need at least this many pages before repeated lines count as boilerplate
const MIN_PAGES_FOR_BOILERPLATE: usize = 3;

/// Normalizes whitespace and, when enabled, strips page headers/footers
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCleaner {
    remove_boilerplate: bool,
}

impl DocumentCleaner {
    /// Create a cleaner
    pub fn new(remove_boilerplate: bool) -> Self {
        Self { remove_boilerplate }
    }

    /// Clean documents, dropping those left empty. Order is preserved.
    pub fn clean(&self, documents: &[Document]) -> Vec<Document> {
        let mut cleaned: Vec<Document> = documents
            .iter()
            .map(|doc| Document {
                content: normalize(&doc.content),
                ..doc.clone()
            })
            .collect();

        if self.remove_boilerplate {
            strip_repeated_lines(&mut cleaned);
        }

        let before = cleaned.len();
        cleaned.retain(|doc| !doc.content.is_empty());
        if cleaned.len() < before {
            tracing::debug!("Dropped {} empty documents", before - cleaned.len());
        }
        cleaned
    }
}

/// Drop empty lines, collapse spaces and tabs, trim
fn normalize(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove lines that appear on more than half the pages of a paged file
fn strip_repeated_lines(documents: &mut [Document]) {
    let mut pages_per_file: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, doc) in documents.iter().enumerate() {
        if matches!(doc.meta.file_type, FileType::Pdf | FileType::Pptx) {
            pages_per_file
                .entry(doc.meta.file_path.as_str())
                .or_default()
                .push(i);
        }
    }

    let mut removals: Vec<(Vec<usize>, HashSet<String>)> = Vec::new();
    for (file_path, pages) in &pages_per_file {
        if pages.len() < MIN_PAGES_FOR_BOILERPLATE {
            continue;
        }

        let mut line_counts: HashMap<&str, usize> = HashMap::new();
        for &i in pages {
            let distinct: HashSet<&str> = documents[i].content.lines().collect();
            for line in distinct {
                *line_counts.entry(line).or_default() += 1;
            }
        }

        let repeated: HashSet<String> = line_counts
            .into_iter()
            .filter(|(_, count)| count * 2 > pages.len())
            .map(|(line, _)| line.to_string())
            .collect();

        if !repeated.is_empty() {
            tracing::debug!(
                "Removing {} repeated lines from {}",
                repeated.len(),
                file_path
            );
            removals.push((pages.clone(), repeated));
        }
    }

    for (pages, repeated) in removals {
        for i in pages {
            let doc = &mut documents[i];
            doc.content = doc
                .content
                .lines()
                .filter(|line| !repeated.contains(*line))
                .collect::<Vec<_>>()
                .join("\n");
        }
    }
}
