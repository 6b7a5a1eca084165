//! Integration tests for the crawler and search engine
//!
//! These tests use wiremock to create mock HTTP servers (sites and the
//! embedding service) and test the full crawl and search cycle end-to-end.

use async_trait::async_trait;
use kumo_index::config::{
    Config, CrawlerConfig, EmbedderConfig, OutputConfig, SearchConfig, UserAgentConfig,
};
use kumo_index::crawler::{
    crawl, Coordinator, CrawlContext, FetchError, FetchedPage, Fetcher,
};
use kumo_index::embedder::{build_embedder, EmbedError, Embedder, ZeroEmbedder};
use kumo_index::search::Searcher;
use kumo_index::storage::{
    DocumentStore, NewDocument, RunStatus, SharedStore, SqliteStorage,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted in `dir`
fn create_test_config(seeds: Vec<String>, dir: &Path, api_key_env: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            seeds,
            max_pages: 20,
            workers: 3,
            request_timeout_secs: 5,
            accept_invalid_certs: true,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
        },
        output: OutputConfig {
            database_path: dir.join("kumo.db").to_string_lossy().into_owned(),
            download_dir: dir.join("downloads").to_string_lossy().into_owned(),
        },
        embedder: EmbedderConfig {
            api_key_env: api_key_env.to_string(),
            dimensions: 3,
            ..EmbedderConfig::default()
        },
        search: SearchConfig::default(),
    }
}

fn html_page(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

/// Mounts a small site: an index linking to one page (twice, once with a
/// fragment), a PDF, a dead link and a mailto link
async fn mount_site(server: &MockServer) {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(format!(
            r##"<html><head><title>Home</title></head><body>
            <p>Welcome to the index</p>
            <a href="{0}/page1">first</a>
            <a href="/page1#top">first again</a>
            <a href="/report.pdf">report</a>
            <a href="/missing">gone</a>
            <a href="mailto:webmaster@example.com">mail</a>
            <a href="#main">skip</a>
            </body></html>"##,
            base_url
        )))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_page(
            r#"<html><head><title>Page 1</title></head><body>
            <p>Bus routes and timetables</p><a href="/">home</a>
            </body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(b"not a real pdf".to_vec()),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let temp = TempDir::new().unwrap();
    let config = create_test_config(
        vec![mock_server.uri()],
        temp.path(),
        "KUMO_INDEX_IT_UNSET_KEY",
    );

    let report = crawl(&config, "test-hash").await.unwrap();

    // /, /page1, /report.pdf, /missing
    assert_eq!(report.pages_admitted, 4);
    assert_eq!(report.documents_stored, 2);
    assert_eq!(report.pages_skipped, 2);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(storage.count_documents().unwrap(), 2);
    assert_eq!(storage.count_vectors().unwrap(), 2);

    let home = storage
        .get_document_by_url(&format!("{}/", mock_server.uri()))
        .unwrap()
        .expect("Home page should be stored");
    assert_eq!(home.title, "Home");
    assert!(home.text.contains("Welcome to the index"));

    let page1 = storage
        .get_document_by_url(&format!("{}/page1", mock_server.uri()))
        .unwrap()
        .expect("Page 1 should be stored");
    assert_eq!(page1.title, "Page 1");

    // No API key: embeddings are zero vectors of the configured width
    let embedding = storage.get_embedding(page1.id).unwrap().unwrap();
    assert_eq!(embedding.vector, vec![0.0; 3]);

    // The unparseable PDF was still staged
    let downloads: Vec<_> = std::fs::read_dir(&config.output.download_dir)
        .unwrap()
        .collect();
    assert_eq!(downloads.len(), 1);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.pages_admitted, Some(4));
    assert_eq!(run.documents_stored, Some(2));
}

#[tokio::test]
async fn test_recrawl_does_not_duplicate_documents() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(format!(
            r#"<html><body>index <a href="{}/a">a</a></body></html>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("<html><body>page a</body></html>".to_string()))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = create_test_config(vec![base_url], temp.path(), "KUMO_INDEX_IT_UNSET_KEY");

    let first = crawl(&config, "hash").await.unwrap();
    let second = crawl(&config, "hash").await.unwrap();

    // Each run starts with a fresh frontier
    assert_eq!(first.pages_admitted, 2);
    assert_eq!(second.pages_admitted, 2);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(storage.count_documents().unwrap(), 2);
    assert_eq!(storage.count_vectors().unwrap(), 2);
    assert_eq!(storage.get_latest_run().unwrap().unwrap().id, 2);
}

#[tokio::test]
async fn test_unreachable_seed_completes_empty() {
    let temp = TempDir::new().unwrap();
    let mut config = create_test_config(
        vec!["http://127.0.0.1:9/".to_string()],
        temp.path(),
        "KUMO_INDEX_IT_UNSET_KEY",
    );
    config.crawler.request_timeout_secs = 2;

    let report = crawl(&config, "hash").await.unwrap();

    assert_eq!(report.pages_admitted, 1);
    assert_eq!(report.documents_stored, 0);
    assert_eq!(report.pages_skipped, 1);
}

#[tokio::test]
async fn test_crawl_and_search_with_embedding_service() {
    let site = MockServer::start().await;
    let base_url = site.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{0}/alpha">first</a><a href="{0}/beta">second</a>
            </body></html>"#,
            base_url
        )))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/alpha"))
        .respond_with(html_page(
            "<html><head><title>Alpha</title></head><body>all about alpha</body></html>"
                .to_string(),
        ))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/beta"))
        .respond_with(html_page(
            "<html><head><title>Beta</title></head><body>all about beta</body></html>"
                .to_string(),
        ))
        .mount(&site)
        .await;

    // Each input matches exactly one of these
    let embeddings = MockServer::start().await;
    for (needle, vector) in [
        ("alpha", json!([1.0, 0.0, 0.0])),
        ("beta", json!([0.0, 1.0, 0.0])),
        ("Home", json!([0.0, 0.0, 1.0])),
    ] {
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_string_contains(needle))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": vector}]
            })))
            .mount(&embeddings)
            .await;
    }

    let temp = TempDir::new().unwrap();
    let key_env = "KUMO_INDEX_IT_EMBED_KEY";
    std::env::set_var(key_env, "sk-test");
    let mut config = create_test_config(vec![base_url.clone()], temp.path(), key_env);
    config.embedder.base_url = embeddings.uri();

    let report = crawl(&config, "hash").await.unwrap();
    assert_eq!(report.documents_stored, 3);

    let store: SharedStore = Arc::new(Mutex::new(
        SqliteStorage::new(Path::new(&config.output.database_path)).unwrap(),
    ));
    let searcher = Searcher::new(store, build_embedder(&config.embedder), 300);

    let hits = searcher.search("beta", 3).await;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].url, format!("{}/beta", base_url));
    assert_eq!(hits[0].title, "Beta");
    assert_eq!(hits[0].score, 1.0);
    assert_eq!(hits[0].snippet, "Beta all about beta");
    assert_eq!(hits[1].score, 0.0);

    let hits = searcher.search("alpha", 1).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, format!("{}/alpha", base_url));
}

/// Serves canned HTML from memory
struct FakeFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let body = self
            .pages
            .get(url)
            .ok_or_else(|| FetchError::Connect(format!("no route to {}", url)))?;
        Ok(FetchedPage {
            final_url: url.to_string(),
            status_code: 200,
            content_type: "text/html".to_string(),
            body: body.clone().into_bytes(),
        })
    }
}

#[tokio::test]
async fn test_fragment_link_scenario() {
    let mut pages = HashMap::new();
    pages.insert(
        "http://a.test/".to_string(),
        r#"<html><body>root <a href="/x">x</a> <a href="/x#frag">x again</a></body></html>"#
            .to_string(),
    );
    pages.insert(
        "http://a.test/x".to_string(),
        "<html><body>leaf</body></html>".to_string(),
    );

    let temp = TempDir::new().unwrap();
    let ctx = CrawlContext {
        fetcher: Arc::new(FakeFetcher { pages }),
        embedder: Arc::new(ZeroEmbedder::new(2)),
        store: Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap())),
        download_dir: temp.path().to_path_buf(),
    };

    let coordinator = Coordinator::new(ctx, 10, 4);
    coordinator.seed(&["http://a.test"]);
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.pages_admitted, 2);
    assert!(coordinator.frontier().is_drained());
}

/// Returns a fixed vector regardless of input
struct FixedEmbedder(Vec<f32>);

#[async_trait]
impl Embedder for FixedEmbedder {
    fn dimension(&self) -> usize {
        self.0.len()
    }

    async fn try_embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_ranking_scenario() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut ids = Vec::new();
    for (i, vector) in [[1.0f32, 0.0], [0.0, 1.0], [0.9, 0.1]].iter().enumerate() {
        let url = format!("https://a.test/doc{}", i + 1);
        let id = storage
            .store_document(
                &NewDocument {
                    url: &url,
                    title: "doc",
                    text: "text",
                    file_path: None,
                },
                vector,
            )
            .unwrap();
        ids.push(id);
    }

    let store: SharedStore = Arc::new(Mutex::new(storage));
    let searcher = Searcher::new(store, Arc::new(FixedEmbedder(vec![1.0, 0.0])), 300);

    let ranked = searcher.search_vector(&[1.0, 0.0], 2).unwrap();
    let ranked_ids: Vec<i64> = ranked.iter().map(|(doc, _)| doc.id).collect();
    assert_eq!(ranked_ids, vec![ids[0], ids[2]]);

    let hits = searcher.search("anything", 2).await;
    assert_eq!(hits[0].url, "https://a.test/doc1");
    assert_eq!(hits[1].url, "https://a.test/doc3");
}
