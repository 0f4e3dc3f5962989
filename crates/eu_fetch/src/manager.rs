use std::sync::Arc;

use eu_core::{ArticleCache, ArticleRecord, Error, FetchOutcome, Origin};

use crate::client::SearchApi;
use crate::logging::Logger;

/// Serves a query from the cache when it holds enough rows, otherwise from
/// the live search API, persisting what the API returned.
pub struct FetchManager {
    search: Arc<dyn SearchApi>,
    cache: Arc<dyn ArticleCache>,
    logger: Logger,
}

impl FetchManager {
    pub fn new(search: Arc<dyn SearchApi>, cache: Arc<dyn ArticleCache>) -> Self {
        Self {
            search,
            cache,
            logger: Logger::new().with_prefix("[fetch]".to_string()),
        }
    }

    pub fn cache(&self) -> &Arc<dyn ArticleCache> {
        &self.cache
    }

    /// Never fails: API problems come back as [`FetchOutcome::Message`].
    pub async fn fetch_or_retrieve(&self, query: &str, result_size: usize) -> FetchOutcome {
        let log = self.logger.clone().with_prefix(format!("[{}]", query));

        match self.cache.cached_for(query, result_size).await {
            Ok(Some(rows)) => {
                log.info(&format!("💾 Serving {} rows from {} cache", rows.len(), self.cache.name()));
                return FetchOutcome::Articles {
                    rows,
                    origin: Origin::Cache,
                };
            }
            Ok(None) => log.debug("Cache miss or not enough rows"),
            Err(e) => log.warn(&format!("⚠️ Cache read failed, fetching live instead: {}", e)),
        }

        log.info(&format!("🌐 Requesting {} results from search API", result_size));
        let mut rows = match self.search.search(query, result_size).await {
            Ok(rows) => rows,
            Err(e) => {
                log.error(&format!("Search failed: {}", e));
                return FetchOutcome::Message(describe_error(&e));
            }
        };

        if rows.is_empty() {
            return FetchOutcome::Message(format!(
                "No articles retrieved for query: '{}'. Please try a different query or check the API status.",
                query
            ));
        }

        stamp_query(&mut rows, query);
        if let Err(e) = self.cache.append(&rows).await {
            log.warn(&format!("⚠️ Could not persist {} rows: {}", rows.len(), e));
        } else {
            log.info(&format!("✨ Cached {} new rows", rows.len()));
        }

        FetchOutcome::Articles {
            rows,
            origin: Origin::Live,
        }
    }
}

fn stamp_query(rows: &mut [ArticleRecord], query: &str) {
    for row in rows {
        row.query = query.to_string();
    }
}

/// The inline message shown in place of articles when a fetch fails.
pub fn describe_error(err: &Error) -> String {
    match err {
        Error::Timeout => "API request timed out. No articles retrieved.".to_string(),
        Error::MalformedBody(_) => {
            "Could not decode JSON from API response. Response was not valid JSON.".to_string()
        }
        Error::MissingField { field, payload } => format!(
            "Live API call failed: '{}' key not found in response. Response: {}",
            field, payload
        ),
        Error::Transport(e) => format!("Error retrieving data: {}. No articles retrieved.", e),
        other => format!("Error retrieving data: {}. No articles retrieved.", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SearchClient, SearchConfig};
    use async_trait::async_trait;
    use eu_core::Result;
    use eu_storage::{CsvCache, MemoryCache};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Reply {
        Rows(usize),
        Fail(fn() -> Error),
    }

    struct StubSearch {
        calls: AtomicUsize,
        reply: Reply,
        seen: Mutex<Vec<(String, usize)>>,
    }

    impl StubSearch {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchApi for StubSearch {
        async fn search(&self, query: &str, result_size: usize) -> Result<Vec<ArticleRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((query.to_string(), result_size));
            match &self.reply {
                Reply::Rows(n) => Ok((0..*n)
                    .map(|i| ArticleRecord {
                        id: format!("live-{}", i),
                        title: format!("Live {}", i),
                        timestamp: format!("2025-06-0{}T10:00:00Z", i + 1),
                        ..Default::default()
                    })
                    .collect()),
                Reply::Fail(make) => Err(make()),
            }
        }
    }

    fn cached(id: &str, query: &str) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            query: query.to_string(),
            timestamp: "2025-05-01T10:00:00Z".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_once_and_persists() {
        let search = StubSearch::new(Reply::Rows(3));
        let cache = Arc::new(MemoryCache::new());
        let manager = FetchManager::new(search.clone(), cache.clone());

        let outcome = manager.fetch_or_retrieve("AI Regulation", 3).await;

        assert_eq!(search.calls(), 1);
        assert_eq!(search.seen.lock().unwrap()[0], ("AI Regulation".to_string(), 3));
        match &outcome {
            FetchOutcome::Articles { rows, origin } => {
                assert_eq!(*origin, Origin::Live);
                assert_eq!(rows.len(), 3);
            }
            other => panic!("unexpected: {:?}", other),
        }
        let stored = cache.load_all().await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|r| r.query == "AI Regulation"));
    }

    #[tokio::test]
    async fn test_sufficient_cache_skips_network() {
        let search = StubSearch::new(Reply::Rows(5));
        let cache = Arc::new(MemoryCache::with_rows(vec![
            cached("a", "AI Regulation"),
            cached("b", "AI Regulation"),
            cached("c", "Other"),
        ]));
        let manager = FetchManager::new(search.clone(), cache);

        let outcome = manager.fetch_or_retrieve("AI Regulation", 2).await;
        assert_eq!(search.calls(), 0);
        assert!(matches!(outcome, FetchOutcome::Articles { origin: Origin::Cache, .. }));
        assert_eq!(outcome.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_cache_goes_live() {
        let search = StubSearch::new(Reply::Rows(2));
        let cache = Arc::new(MemoryCache::with_rows(vec![cached("a", "AI Regulation")]));
        let manager = FetchManager::new(search.clone(), cache.clone());

        let outcome = manager.fetch_or_retrieve("AI Regulation", 2).await;
        assert_eq!(search.calls(), 1);
        assert_eq!(outcome.rows().len(), 2);
        // the old row stays, duplicates are not reconciled
        assert_eq!(cache.load_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_errors_become_messages() {
        fn timeout() -> Error {
            Error::Timeout
        }
        fn malformed() -> Error {
            Error::MalformedBody("eof".into())
        }
        fn missing() -> Error {
            Error::MissingField {
                field: "results",
                payload: json!({"message": "Forbidden"}),
            }
        }

        let cases: [(fn() -> Error, &str); 3] = [
            (timeout, "API request timed out. No articles retrieved."),
            (malformed, "Could not decode JSON from API response. Response was not valid JSON."),
            (
                missing,
                "Live API call failed: 'results' key not found in response. Response: {\"message\":\"Forbidden\"}",
            ),
        ];

        for (make, expected) in cases {
            let search = StubSearch::new(Reply::Fail(make));
            let cache = Arc::new(MemoryCache::new());
            let manager = FetchManager::new(search.clone(), cache.clone());
            let outcome = manager.fetch_or_retrieve("q", 1).await;
            assert_eq!(outcome.message(), Some(expected));
            assert!(cache.load_all().await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_csv_cache_serves_second_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cached_data.csv");

        let first = StubSearch::new(Reply::Rows(3));
        let manager = FetchManager::new(first.clone(), Arc::new(CsvCache::new(&path)));
        assert_eq!(manager.fetch_or_retrieve("AI Regulation", 3).await.rows().len(), 3);
        assert_eq!(first.calls(), 1);

        let second = StubSearch::new(Reply::Rows(3));
        let manager = FetchManager::new(second.clone(), Arc::new(CsvCache::new(&path)));
        let outcome = manager.fetch_or_retrieve("AI Regulation", 3).await;
        assert_eq!(second.calls(), 0);
        assert!(matches!(outcome, FetchOutcome::Articles { origin: Origin::Cache, .. }));
        // newest first
        assert_eq!(outcome.rows()[0].id, "live-2");
    }

    #[tokio::test]
    async fn test_empty_result_is_a_message() {
        let search = StubSearch::new(Reply::Rows(0));
        let manager = FetchManager::new(search, Arc::new(MemoryCache::new()));
        let outcome = manager.fetch_or_retrieve("nothing", 5).await;
        assert!(outcome.message().unwrap().starts_with("No articles retrieved for query: 'nothing'"));
    }

    struct BrokenCache {
        appends: AtomicUsize,
    }

    #[async_trait]
    impl ArticleCache for BrokenCache {
        fn name(&self) -> &str {
            "broken"
        }

        async fn load_all(&self) -> Result<Vec<ArticleRecord>> {
            Err(Error::Storage("disk unreadable".into()))
        }

        async fn append(&self, _rows: &[ArticleRecord]) -> Result<()> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            Err(Error::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_broken_cache_still_serves_live_rows() {
        let search = StubSearch::new(Reply::Rows(2));
        let cache = Arc::new(BrokenCache {
            appends: AtomicUsize::new(0),
        });
        let manager = FetchManager::new(search.clone(), cache.clone());

        let outcome = manager.fetch_or_retrieve("AI Regulation", 2).await;

        assert_eq!(search.calls(), 1);
        assert_eq!(cache.appends.load(Ordering::SeqCst), 1);
        match &outcome {
            FetchOutcome::Articles { rows, origin } => {
                assert_eq!(*origin, Origin::Live);
                assert_eq!(rows.len(), 2);
                assert!(rows.iter().all(|r| r.query == "AI Regulation"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_message() {
        // bind then drop to get a port nothing listens on
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let config = SearchConfig::new(&format!("http://{}/api/search", addr)).unwrap();
        let client = SearchClient::new(config).unwrap();
        let cache = Arc::new(MemoryCache::new());
        let manager = FetchManager::new(Arc::new(client), cache.clone());

        let outcome = manager.fetch_or_retrieve("AI", 1).await;
        let message = outcome.message().unwrap();
        assert!(message.starts_with("Error retrieving data: "), "{}", message);
        assert!(message.ends_with(". No articles retrieved."), "{}", message);
        assert!(cache.load_all().await.unwrap().is_empty());
    }
}
