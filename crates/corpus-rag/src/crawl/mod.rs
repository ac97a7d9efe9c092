//! Website crawling into a corpus directory

mod crawler;
pub mod report;

pub use crawler::{sanitize_filename, CrawlState, Crawler};
pub use report::{read_report, url_map, write_report, ReportRow, REPORT_FILE_NAME};
