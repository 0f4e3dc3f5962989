use async_trait::async_trait;
use eu_core::{ArticleCache, ArticleRecord, Result};
use tokio::sync::RwLock;

/// Keeps rows for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryCache {
    rows: RwLock<Vec<ArticleRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<ArticleRecord>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl ArticleCache for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_all(&self) -> Result<Vec<ArticleRecord>> {
        Ok(self.rows.read().await.clone())
    }

    async fn append(&self, rows: &[ArticleRecord]) -> Result<()> {
        self.rows.write().await.extend_from_slice(rows);
        Ok(())
    }
}
