//! `scrape_report.csv`: which web page or asset each corpus file came from

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// File name of the crawl report inside a corpus directory
pub const REPORT_FILE_NAME: &str = "scrape_report.csv";

/// One saved file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Page the file was found on
    pub page_url: String,
    /// Asset address, empty for files derived from the page itself
    pub asset_url: String,
    /// File name inside the corpus directory
    pub local_filename: String,
}

impl ReportRow {
    /// Asset address if present, else the page address
    pub fn source_url(&self) -> &str {
        if self.asset_url.is_empty() {
            &self.page_url
        } else {
            &self.asset_url
        }
    }
}

/// Write report rows with a header line
pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read report rows
pub fn read_report(path: &Path) -> Result<Vec<ReportRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// `local_filename -> url` for a corpus directory; empty when it has no report
pub fn url_map(corpus_dir: &Path) -> HashMap<String, String> {
    let path = corpus_dir.join(REPORT_FILE_NAME);
    if !path.is_file() {
        return HashMap::new();
    }

    match read_report(&path) {
        Ok(rows) => rows
            .into_iter()
            .map(|row| {
                let url = row.source_url().to_string();
                (row.local_filename, url)
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Ignoring unreadable crawl report {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}
