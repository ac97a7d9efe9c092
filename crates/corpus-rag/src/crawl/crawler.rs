//! Breadth-first website crawler that fills a corpus directory
//!
//! Pages on the start URL's host are visited in FIFO order up to a page
//! budget. Each page contributes its visible text, its code blocks and any
//! linked documents or images; every saved file is recorded in the crawl
//! report so ingestion can attach the source URL.

use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::CrawlConfig;
use crate::error::{Error, Result};

use super::report::{write_report, ReportRow, REPORT_FILE_NAME};

/// Linked files downloaded into the corpus
const ASSET_EXTENSIONS: &[&str] = &[".pdf", ".csv", ".txt", ".png", ".jpg", ".jpeg"];

/// Everything a crawl has seen and saved so far
#[derive(Debug, Default)]
pub struct CrawlState {
    /// URLs already dequeued, including skipped fragment URLs
    pub visited: HashSet<String>,
    /// One row per saved file
    pub report: Vec<ReportRow>,
    /// Pages fetched successfully
    pub pages_fetched: usize,
    /// Page or asset requests that failed
    pub failures: usize,
}

/// Owned result of parsing one page; holds no DOM so it can cross awaits
#[derive(Debug, Default)]
struct ParsedPage {
    text: String,
    code_blocks: Vec<String>,
    links: Vec<Url>,
    assets: Vec<Url>,
}

struct PageSelectors {
    body: Selector,
    code: Selector,
    links: Selector,
    images: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| Error::internal(format!("Invalid selector '{}': {}", css, e)))
        };
        Ok(Self {
            body: parse("body")?,
            code: parse("code, pre")?,
            links: parse("a[href]")?,
            images: parse("img[src]")?,
        })
    }
}

/// Website crawler
pub struct Crawler {
    client: reqwest::Client,
    base: Url,
    output_dir: PathBuf,
    max_pages: usize,
    selectors: PageSelectors,
}

impl Crawler {
    /// Create a crawler for `config.base_url`
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("Invalid crawl.base_url '{}': {}", config.base_url, e)))?;
        if base.host_str().is_none() {
            return Err(Error::config(format!("crawl.base_url '{}' has no host", config.base_url)));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base,
            output_dir: config.output_dir.clone(),
            max_pages: config.max_pages,
            selectors: PageSelectors::new()?,
        })
    }

    /// Crawl from the base URL and write the report; per-URL failures are counted, not fatal
    pub async fn crawl(&self) -> Result<CrawlState> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut state = CrawlState::default();
        let mut queue = VecDeque::from([self.base.clone()]);

        while let Some(url) = queue.pop_front() {
            if state.pages_fetched >= self.max_pages {
                tracing::info!("Page budget of {} reached", self.max_pages);
                break;
            }
            if !state.visited.insert(url.to_string()) {
                continue;
            }
            if url.fragment().is_some() {
                tracing::debug!("Skipping fragment URL {}", url);
                continue;
            }

            for link in self.process_page(&url, &mut state).await {
                if !state.visited.contains(link.as_str()) {
                    queue.push_back(link);
                }
            }
        }

        let report_path = self.output_dir.join(REPORT_FILE_NAME);
        write_report(&report_path, &state.report)?;
        tracing::info!(
            "Crawled {} pages, saved {} files, {} failures; report at {}",
            state.pages_fetched,
            state.report.len(),
            state.failures,
            report_path.display()
        );

        Ok(state)
    }

    /// Save one page's text, code blocks and assets; returns its internal links
    async fn process_page(&self, url: &Url, state: &mut CrawlState) -> Vec<Url> {
        tracing::info!("Scraping page: {}", url);

        let html = match self.fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to fetch page {}: {}", url, e);
                state.failures += 1;
                return Vec::new();
            }
        };
        state.pages_fetched += 1;

        let page = parse_page(&html, url, &self.base, &self.selectors);
        let stem = page_stem(url);

        if !page.text.is_empty() {
            let name = sanitize_filename(&format!("{}.txt", stem));
            self.save_derived(url, &name, &page.text, state);
        }

        for (i, block) in page.code_blocks.iter().enumerate() {
            let name = sanitize_filename(&format!("{}_code_{}.txt", stem, i + 1));
            self.save_derived(url, &name, &format!("# CODE BLOCK\n{}", block), state);
        }

        for asset in &page.assets {
            if let Err(e) = self.save_asset(asset, url, state).await {
                tracing::warn!("Failed to download {}: {}", asset, e);
                state.failures += 1;
            }
        }

        page.links
    }

    async fn fetch_text(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Write a file derived from the page itself
    fn save_derived(&self, page_url: &Url, name: &str, content: &str, state: &mut CrawlState) {
        match std::fs::write(self.output_dir.join(name), content) {
            Ok(()) => state.report.push(ReportRow {
                page_url: page_url.to_string(),
                asset_url: String::new(),
                local_filename: name.to_string(),
            }),
            Err(e) => {
                tracing::warn!("Failed to write {}: {}", name, e);
                state.failures += 1;
            }
        }
    }

    async fn save_asset(&self, asset: &Url, page_url: &Url, state: &mut CrawlState) -> Result<()> {
        let response = self.client.get(asset.clone()).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response.bytes().await?;

        let name = asset_filename(asset, &content_type);
        std::fs::write(self.output_dir.join(&name), &bytes)?;
        tracing::debug!("Saved {} ({} bytes)", name, bytes.len());

        state.report.push(ReportRow {
            page_url: page_url.to_string(),
            asset_url: asset.to_string(),
            local_filename: name,
        });
        Ok(())
    }
}

/// Same host as the crawl root
fn is_internal(base: &Url, url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str() == base.host_str()
}

fn is_asset(url: &Url) -> bool {
    let lower = url.as_str().to_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Replace everything but letters, digits and `._-` with `_`. Non-ASCII
/// letters and digits are kept.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File stem for a page: its path with slashes flattened, `index` for the root
fn page_stem(url: &Url) -> String {
    let path = url.path().trim_matches('/');
    if path.is_empty() {
        "index".to_string()
    } else {
        path.replace('/', "_")
    }
}

/// Local name for a downloaded asset; the URL's extension wins when the content type allows it
fn asset_filename(asset: &Url, content_type: &str) -> String {
    let base_name = asset
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("file");
    let path = Path::new(base_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let url_ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mime = content_type.split(';').next().unwrap_or("").trim();
    let guessed = mime_guess::get_mime_extensions_str(mime).unwrap_or(&[]);
    let ext = if url_ext.is_empty() || (!guessed.is_empty() && !guessed.contains(&url_ext.as_str())) {
        guessed.first().map(|e| e.to_string()).unwrap_or(url_ext)
    } else {
        url_ext
    };

    if ext.is_empty() {
        sanitize_filename(&stem)
    } else {
        sanitize_filename(&format!("{}.{}", stem, ext))
    }
}

fn parse_page(html: &str, page_url: &Url, base: &Url, selectors: &PageSelectors) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    if let Some(body) = document.select(&selectors.body).next() {
        let mut lines = Vec::new();
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name()))
                .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
            let trimmed = text.trim();
            if !hidden && !trimmed.is_empty() {
                lines.push(trimmed);
            }
        }
        page.text = lines.join("\n");
    }

    page.code_blocks = document
        .select(&selectors.code)
        .map(|block| block.text().collect::<String>().trim().to_string())
        .filter(|code| !code.is_empty())
        .collect();

    let mut seen_assets = HashSet::new();
    let hrefs = document
        .select(&selectors.links)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| (href, true));
    let srcs = document
        .select(&selectors.images)
        .filter_map(|img| img.value().attr("src"))
        .map(|src| (src, false));

    for (reference, is_link) in hrefs.chain(srcs) {
        let Ok(url) = page_url.join(reference) else {
            continue;
        };
        if !is_internal(base, &url) {
            continue;
        }
        if is_asset(&url) {
            if seen_assets.insert(url.to_string()) {
                page.assets.push(url);
            }
        } else if is_link {
            page.links.push(url);
        }
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("apprenticeship_faq.txt"), "apprenticeship_faq.txt");
        assert_eq!(sanitize_filename("a b/c?d=1.txt"), "a_b_c_d_1.txt");
        assert_eq!(sanitize_filename("ünï-code"), "ünï-code");
        assert_eq!(sanitize_filename("café menu (2).pdf"), "café_menu__2_.pdf");
    }

    #[test]
    fn test_page_stem() {
        assert_eq!(page_stem(&url("https://example.com/")), "index");
        assert_eq!(page_stem(&url("https://example.com/apprenticeship/faq/")), "apprenticeship_faq");
    }

    #[test]
    fn test_internal_links_only() {
        let base = url("https://example.com/start/");
        assert!(is_internal(&base, &url("https://example.com/other")));
        assert!(!is_internal(&base, &url("https://elsewhere.org/start/")));
        assert!(!is_internal(&base, &url("mailto:someone@example.com")));
    }

    #[test]
    fn test_parse_page_splits_links_assets_and_code() {
        let html = r#"
            <html><head><style>body { color: red; }</style></head>
            <body>
              <h1>Edge AI</h1>
              <p>Models run on devices.</p>
              <script>var x = 1;</script>
              <pre>pip install edge</pre>
              <code>   </code>
              <a href="/docs/guide">Guide</a>
              <a href="/files/deck.PDF">Deck</a>
              <a href="https://elsewhere.org/page">External</a>
              <a href="/docs/guide#install">Anchor</a>
              <img src="diagram.png">
            </body></html>
        "#;
        let page_url = url("https://example.com/edge/");
        let selectors = PageSelectors::new().unwrap();
        let page = parse_page(html, &page_url, &page_url, &selectors);

        assert!(page.text.contains("Edge AI\nModels run on devices."));
        assert!(!page.text.contains("var x"));
        assert!(!page.text.contains("color: red"));
        assert_eq!(page.code_blocks, vec!["pip install edge"]);
        assert_eq!(
            page.links.iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["https://example.com/docs/guide", "https://example.com/docs/guide#install"]
        );
        assert_eq!(
            page.assets.iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["https://example.com/files/deck.PDF", "https://example.com/edge/diagram.png"]
        );
    }

    #[test]
    fn test_asset_filename() {
        let asset = url("https://example.com/files/Course%20Deck.pdf");
        assert_eq!(asset_filename(&asset, "application/pdf"), "Course_20Deck.pdf");
        assert_eq!(asset_filename(&asset, ""), "Course_20Deck.pdf");

        let photo = url("https://example.com/img/photo.jpg");
        assert_eq!(asset_filename(&photo, "image/jpeg; charset=binary"), "photo.jpg");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = CrawlConfig {
            base_url: "not a url".to_string(),
            ..CrawlConfig::default()
        };
        assert!(matches!(Crawler::new(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_site_counts_failure_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrawlConfig {
            base_url: "http://127.0.0.1:1/".to_string(),
            output_dir: dir.path().to_path_buf(),
            max_pages: 5,
            request_timeout_secs: 2,
        };

        let state = Crawler::new(&config).unwrap().crawl().await.unwrap();
        assert_eq!(state.pages_fetched, 0);
        assert_eq!(state.failures, 1);
        assert!(state.visited.contains("http://127.0.0.1:1/"));
        assert!(dir.path().join(REPORT_FILE_NAME).is_file());
    }
}
