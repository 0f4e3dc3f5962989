use async_trait::async_trait;
use crate::types::ArticleRecord;
use crate::Result;

#[async_trait]
pub trait ArticleCache: Send + Sync {
    /// Human readable name of the backend, used in logs
    fn name(&self) -> &str;

    /// Load every persisted row. A cache that does not exist yet is empty.
    async fn load_all(&self) -> Result<Vec<ArticleRecord>>;

    /// Append rows as they are, without deduplication
    async fn append(&self, rows: &[ArticleRecord]) -> Result<()>;

    /// Return the `limit` most recent rows stored for `query`, or `None` when
    /// fewer than `limit` rows match.
    async fn cached_for(&self, query: &str, limit: usize) -> Result<Option<Vec<ArticleRecord>>> {
        let rows = self.load_all().await?;
        Ok(select_cached(rows, query, limit))
    }
}

/// Exact, case-sensitive query match followed by a "most recent first" cut.
/// Rows whose timestamp does not parse sort after every parseable one.
pub fn select_cached(rows: Vec<ArticleRecord>, query: &str, limit: usize) -> Option<Vec<ArticleRecord>> {
    let mut matching: Vec<_> = rows
        .into_iter()
        .filter(|row| row.query == query)
        .map(|row| (crate::clean::parse_timestamp(&row.timestamp), row))
        .collect();

    if matching.is_empty() || matching.len() < limit {
        return None;
    }

    matching.sort_by(|(a, _), (b, _)| b.cmp(a));
    Some(matching.into_iter().take(limit).map(|(_, row)| row).collect())
}
