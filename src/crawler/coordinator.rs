//! Crawler coordinator - worker pool and per-URL pipeline
//!
//! This module contains the crawl loop that coordinates:
//! - Seeding the frontier
//! - Running a fixed pool of workers against the shared frontier
//! - Fetching, content dispatch, extraction, embedding and persistence
//! - Feeding discovered links back into the frontier
//!
//! No per-URL failure stops a worker. Each URL produces a [`PageOutcome`]
//! that is logged and tallied; the URL is never retried.

use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::embedder::Embedder;
use crate::extract::{parse_html, parse_pdf, stage_pdf, staged_pdf_name, ContentKind};
use crate::storage::{DocumentStore, NewDocument, SharedStore};
use crate::url::strip_fragment;
use crate::KumoError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Why a URL produced no stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Network failure or timeout
    Fetch(String),

    /// Response status outside 2xx
    HttpStatus(u16),

    /// Neither HTML nor PDF
    UnsupportedContent(String),

    /// Extraction produced no text
    EmptyText,

    /// PDF could not be written to the download directory
    Staging(String),

    /// Document or embedding write failed
    Storage(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {}", e),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::UnsupportedContent(ct) => write!(f, "unsupported content type '{}'", ct),
            Self::EmptyText => write!(f, "no extractable text"),
            Self::Staging(e) => write!(f, "PDF staging failed: {}", e),
            Self::Storage(e) => write!(f, "storage failed: {}", e),
        }
    }
}

/// Result of processing one admitted URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// A document and its embedding were stored
    Indexed { doc_id: i64, links_admitted: usize },

    /// Nothing was stored. Links may still have been admitted (an HTML
    /// page with no visible text still contributes its links).
    Skipped {
        reason: SkipReason,
        links_admitted: usize,
    },
}

impl PageOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self::Skipped {
            reason,
            links_admitted: 0,
        }
    }

    pub fn links_admitted(&self) -> usize {
        match self {
            Self::Indexed { links_admitted, .. } | Self::Skipped { links_admitted, .. } => {
                *links_admitted
            }
        }
    }
}

/// Totals for one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Distinct URLs admitted to the frontier (the crawl's return value)
    pub pages_admitted: usize,

    /// URLs that produced a stored document
    pub documents_stored: usize,

    /// URLs that were skipped
    pub pages_skipped: usize,
}

/// Collaborators shared by every worker
pub struct CrawlContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub embedder: Arc<dyn Embedder>,
    pub store: SharedStore,
    pub download_dir: PathBuf,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    frontier: Arc<Frontier>,
    workers: usize,
}

impl Coordinator {
    /// Creates a coordinator with a fresh frontier
    ///
    /// # Arguments
    ///
    /// * `ctx` - Fetcher, embedder, store and staging directory
    /// * `page_budget` - Maximum number of distinct URLs to admit
    /// * `workers` - Number of concurrent workers (at least one is used)
    pub fn new(ctx: CrawlContext, page_budget: usize, workers: usize) -> Self {
        Self {
            ctx: Arc::new(ctx),
            frontier: Arc::new(Frontier::new(page_budget)),
            workers: workers.max(1),
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Admits seed URLs as-is; a seed carrying a fragment is rejected
    ///
    /// Returns the number of seeds admitted.
    pub fn seed<S: AsRef<str>>(&self, seeds: &[S]) -> usize {
        let mut admitted = 0;
        for seed in seeds {
            if self.frontier.admit(seed.as_ref()) {
                admitted += 1;
            } else {
                tracing::warn!("Seed not admitted: {}", seed.as_ref());
            }
        }
        admitted
    }

    /// Runs the worker pool until the frontier drains
    ///
    /// Returns once every worker has observed an empty frontier with no work
    /// in flight. The only error is a worker task that panicked.
    pub async fn run(&self) -> Result<CrawlReport, KumoError> {
        tracing::info!(
            "Starting crawl with {} workers, page budget {}",
            self.workers,
            self.frontier.page_budget()
        );
        let start_time = std::time::Instant::now();

        let mut set = JoinSet::new();
        for id in 0..self.workers {
            let ctx = Arc::clone(&self.ctx);
            let frontier = Arc::clone(&self.frontier);
            set.spawn(worker(id, ctx, frontier));
        }

        let mut report = CrawlReport::default();
        while let Some(joined) = set.join_next().await {
            let tally = joined?;
            report.documents_stored += tally.documents_stored;
            report.pages_skipped += tally.pages_skipped;
        }
        report.pages_admitted = self.frontier.admitted();

        tracing::info!(
            "Crawl completed: {} admitted, {} stored, {} skipped in {:?}",
            report.pages_admitted,
            report.documents_stored,
            report.pages_skipped,
            start_time.elapsed()
        );

        Ok(report)
    }
}

async fn worker(id: usize, ctx: Arc<CrawlContext>, frontier: Arc<Frontier>) -> CrawlReport {
    let mut tally = CrawlReport::default();

    while let Some(url) = frontier.next().await {
        tracing::debug!("[worker {}] Processing URL: {}", id, url);

        match process_url(&ctx, &frontier, &url).await {
            PageOutcome::Indexed {
                doc_id,
                links_admitted,
            } => {
                tracing::info!(
                    "Indexed {} as document {} ({} new links)",
                    url,
                    doc_id,
                    links_admitted
                );
                tally.documents_stored += 1;
            }
            PageOutcome::Skipped { reason, .. } => {
                tracing::warn!("Skipped {}: {}", url, reason);
                tally.pages_skipped += 1;
            }
        }

        let finished = frontier.done();
        if finished % 10 == 0 {
            tracing::info!(
                "Progress: {} pages processed, {} in frontier",
                finished,
                frontier.queued()
            );
        }
    }

    tracing::debug!("[worker {}] Frontier drained, exiting", id);
    tally
}

/// Runs one URL through fetch, dispatch, extraction, embedding and storage
///
/// Discovered HTML links are admitted to `frontier` (fragment-stripped)
/// before the document itself is considered, so an HTML page with no
/// visible text still contributes its links.
pub async fn process_url(ctx: &CrawlContext, frontier: &Frontier, url: &str) -> PageOutcome {
    let page = match ctx.fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => return PageOutcome::skipped(SkipReason::Fetch(e.to_string())),
    };

    // Error pages are neither indexed nor mined for links
    if !page.is_success() {
        return PageOutcome::skipped(SkipReason::HttpStatus(page.status_code));
    }

    let (title, text, file_path, links_admitted) =
        match ContentKind::classify(&page.content_type, url) {
            ContentKind::Html => {
                let (title, text, links_admitted) = handle_html(url, &page, frontier);
                (title, text, None, links_admitted)
            }
            ContentKind::Pdf => match handle_pdf(&ctx.download_dir, url, &page).await {
                Ok((title, text, path)) => (title, text, Some(path), 0),
                Err(reason) => return PageOutcome::skipped(reason),
            },
            ContentKind::Other => {
                return PageOutcome::skipped(SkipReason::UnsupportedContent(
                    page.content_type.clone(),
                ))
            }
        };

    if text.trim().is_empty() {
        return PageOutcome::Skipped {
            reason: SkipReason::EmptyText,
            links_admitted,
        };
    }

    let vector = ctx.embedder.embed(&text).await;

    let file_path = file_path.map(|p| p.to_string_lossy().into_owned());
    let doc = NewDocument {
        url,
        title: &title,
        text: &text,
        file_path: file_path.as_deref(),
    };

    let stored = {
        let mut store = ctx.store.lock();
        store.store_document(&doc, &vector)
    };

    match stored {
        Ok(doc_id) => PageOutcome::Indexed {
            doc_id,
            links_admitted,
        },
        Err(e) => PageOutcome::Skipped {
            reason: SkipReason::Storage(e.to_string()),
            links_admitted,
        },
    }
}

fn handle_html(url: &str, page: &FetchedPage, frontier: &Frontier) -> (String, String, usize) {
    let html = String::from_utf8_lossy(&page.body);
    // Resolve relative links against where the redirect chain ended
    let base = Url::parse(&page.final_url).or_else(|_| Url::parse(url));

    let parsed = match base {
        Ok(base) => parse_html(&base, &html),
        Err(e) => {
            tracing::debug!("Cannot resolve links for {}: {}", url, e);
            return (url.to_string(), String::new(), 0);
        }
    };

    let links_admitted = parsed
        .links
        .iter()
        .filter(|link| frontier.admit(strip_fragment(link)))
        .count();

    (parsed.title, parsed.text, links_admitted)
}

async fn handle_pdf(
    download_dir: &Path,
    url: &str,
    page: &FetchedPage,
) -> Result<(String, String, PathBuf), SkipReason> {
    let path = stage_pdf(download_dir, url, &page.body)
        .await
        .map_err(|e| SkipReason::Staging(e.to_string()))?;

    let parse_path = path.clone();
    let text = match tokio::task::spawn_blocking(move || parse_pdf(&parse_path)).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("PDF parse task failed for {}: {}", url, e);
            String::new()
        }
    };

    Ok((pdf_title(url), text, path))
}

/// Last path segment of the URL, or the staged file name when there is none
fn pdf_title(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| staged_pdf_name(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchError;
    use crate::embedder::{EmbedError, ZeroEmbedder};
    use crate::storage::SqliteStorage;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Serves canned pages from memory
    #[derive(Default)]
    struct FakeFetcher {
        pages: HashMap<String, FetchedPage>,
    }

    impl FakeFetcher {
        fn page(mut self, url: &str, status: u16, content_type: &str, body: &[u8]) -> Self {
            self.pages.insert(
                url.to_string(),
                FetchedPage {
                    final_url: url.to_string(),
                    status_code: status,
                    content_type: content_type.to_string(),
                    body: body.to_vec(),
                },
            );
            self
        }

        fn html(self, url: &str, body: &str) -> Self {
            self.page(url, 200, "text/html", body.as_bytes())
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Connect(format!("no route to {}", url)))
        }
    }

    /// Length-and-vowel embedding, enough to tell documents apart
    struct CountingEmbedder;

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32])
        }
    }

    struct Harness {
        _temp: TempDir,
        store: SharedStore,
        coordinator: Coordinator,
    }

    fn harness(fetcher: FakeFetcher, budget: usize, workers: usize) -> Harness {
        let temp = TempDir::new().unwrap();
        let store: SharedStore = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let ctx = CrawlContext {
            fetcher: Arc::new(fetcher),
            embedder: Arc::new(CountingEmbedder),
            store: Arc::clone(&store),
            download_dir: temp.path().join("downloads"),
        };
        Harness {
            _temp: temp,
            store,
            coordinator: Coordinator::new(ctx, budget, workers),
        }
    }

    #[tokio::test]
    async fn test_fragment_links_admit_once() {
        let fetcher = FakeFetcher::default()
            .html(
                "http://a.test/",
                r#"<html><head><title>Home</title></head><body>welcome
                   <a href="/x">x</a><a href="/x#frag">x again</a></body></html>"#,
            )
            .html("http://a.test/x", "<html><body>page x</body></html>");

        let h = harness(fetcher, 10, 3);
        assert_eq!(h.coordinator.seed(&["http://a.test"]), 1);
        let report = h.coordinator.run().await.unwrap();

        assert_eq!(report.pages_admitted, 2);
        assert_eq!(report.documents_stored, 2);
        assert_eq!(report.pages_skipped, 0);
        assert_eq!(h.store.lock().count_documents().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_budget_bounds_admissions() {
        let links: String = (0..20)
            .map(|i| format!(r#"<a href="/p{}">p</a>"#, i))
            .collect();
        let mut fetcher = FakeFetcher::default().html(
            "http://a.test/",
            &format!("<html><body>hub {}</body></html>", links),
        );
        for i in 0..20 {
            fetcher = fetcher.html(
                &format!("http://a.test/p{}", i),
                &format!("<html><body>leaf {}</body></html>", i),
            );
        }

        let h = harness(fetcher, 5, 4);
        h.coordinator.seed(&["http://a.test/"]);
        let report = h.coordinator.run().await.unwrap();

        assert_eq!(report.pages_admitted, 5);
        assert_eq!(report.documents_stored + report.pages_skipped, 5);
    }

    #[tokio::test]
    async fn test_failures_are_skipped_not_fatal() {
        let fetcher = FakeFetcher::default()
            .html(
                "http://a.test/",
                r#"<html><body>root
                   <a href="/missing">404</a>
                   <a href="/image.png">img</a>
                   <a href="/unreachable">down</a>
                   <a href="/blank">blank</a>
                   <a href="/ok">ok</a></body></html>"#,
            )
            .page("http://a.test/missing", 404, "text/html", b"not found")
            .page("http://a.test/image.png", 200, "image/png", b"\x89PNG")
            .html("http://a.test/blank", "<html><body><script>x()</script></body></html>")
            .html("http://a.test/ok", "<html><body>fine</body></html>");

        let h = harness(fetcher, 10, 2);
        h.coordinator.seed(&["http://a.test/"]);
        let report = h.coordinator.run().await.unwrap();

        assert_eq!(report.pages_admitted, 6);
        assert_eq!(report.documents_stored, 2);
        assert_eq!(report.pages_skipped, 4);
    }

    #[tokio::test]
    async fn test_process_url_skip_reasons() {
        let fetcher = FakeFetcher::default()
            .page("http://a.test/missing", 404, "text/html", b"")
            .page("http://a.test/data.json", 200, "application/json", b"{}")
            .html(
                "http://a.test/empty",
                r#"<html><body><script>x()</script><a href="/next">n</a></body></html>"#,
            );
        let h = harness(fetcher, 10, 1);
        let ctx = &h.coordinator.ctx;
        let frontier = h.coordinator.frontier();

        assert_eq!(
            process_url(ctx, frontier, "http://a.test/missing").await,
            PageOutcome::skipped(SkipReason::HttpStatus(404))
        );
        assert_eq!(
            process_url(ctx, frontier, "http://a.test/data.json").await,
            PageOutcome::skipped(SkipReason::UnsupportedContent(
                "application/json".to_string()
            ))
        );
        assert!(matches!(
            process_url(ctx, frontier, "http://a.test/nowhere").await,
            PageOutcome::Skipped {
                reason: SkipReason::Fetch(_),
                ..
            }
        ));

        // Empty pages still contribute their links
        assert_eq!(
            process_url(ctx, frontier, "http://a.test/empty").await,
            PageOutcome::Skipped {
                reason: SkipReason::EmptyText,
                links_admitted: 1
            }
        );
        assert_eq!(frontier.take().as_deref(), Some("http://a.test/next"));
    }

    #[tokio::test]
    async fn test_recrawl_resolves_existing_document() {
        let fetcher = FakeFetcher::default().html("http://a.test/", "<html><body>same</body></html>");
        let h = harness(fetcher, 10, 1);
        let ctx = &h.coordinator.ctx;
        let frontier = h.coordinator.frontier();

        let first = process_url(ctx, frontier, "http://a.test/").await;
        let second = process_url(ctx, frontier, "http://a.test/").await;

        assert_eq!(first, second);
        assert_eq!(h.store.lock().count_documents().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_pdf_is_skipped_as_empty() {
        let fetcher = FakeFetcher::default().page(
            "http://a.test/report.pdf",
            200,
            "application/octet-stream",
            b"not really a pdf",
        );
        let h = harness(fetcher, 10, 1);

        let outcome = process_url(&h.coordinator.ctx, h.coordinator.frontier(), "http://a.test/report.pdf").await;

        assert_eq!(outcome, PageOutcome::skipped(SkipReason::EmptyText));
        // Staged under a hashed name even though parsing failed
        let staged = h
            .coordinator
            .ctx
            .download_dir
            .join(staged_pdf_name("http://a.test/report.pdf"));
        assert!(staged.exists());
    }

    #[tokio::test]
    async fn test_zero_embedder_still_stores() {
        let temp = TempDir::new().unwrap();
        let store: SharedStore = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let ctx = CrawlContext {
            fetcher: Arc::new(
                FakeFetcher::default().html("http://a.test/", "<html><body>text</body></html>"),
            ),
            embedder: Arc::new(ZeroEmbedder::new(4)),
            store: Arc::clone(&store),
            download_dir: temp.path().to_path_buf(),
        };
        let coordinator = Coordinator::new(ctx, 10, 2);
        coordinator.seed(&["http://a.test/"]);
        coordinator.run().await.unwrap();

        let entries = store.lock().list_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.vector, vec![0.0; 4]);
    }

    #[test]
    fn test_pdf_title() {
        assert_eq!(pdf_title("https://a.test/docs/annual.pdf"), "annual.pdf");
        assert_eq!(
            pdf_title("https://a.test/"),
            staged_pdf_name("https://a.test/")
        );
    }
}
