use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eu_core::{ArticleCache, ArticleRecord, Error, Result};
use ::csv::StringRecord;
use tokio::sync::Mutex;

/// Header written to a fresh cache file.
const CACHE_COLUMNS: [&str; 7] = ["id", "title", "summary", "timestamp", "url", "highlights", "query"];

/// One line of the cache file.
#[derive(Debug, Default)]
struct CacheRow {
    id: String,
    title: String,
    summary: String,
    timestamp: String,
    url: String,
    /// JSON array in a single cell
    highlights: String,
    query: String,
}

impl CacheRow {
    /// Cell for a header name; unknown columns are left empty.
    fn cell(&self, column: &str) -> &str {
        match column.trim() {
            "id" => &self.id,
            "title" => &self.title,
            "summary" => &self.summary,
            "timestamp" => &self.timestamp,
            "url" => &self.url,
            "highlights" => &self.highlights,
            "query" | "query_text" => &self.query,
            _ => "",
        }
    }
}

/// Positions of the known columns in whatever header the file carries.
struct Columns {
    id: Option<usize>,
    title: Option<usize>,
    summary: Option<usize>,
    timestamp: Option<usize>,
    url: Option<usize>,
    highlights: Option<usize>,
    query: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| headers.iter().position(|h| h.trim() == *name))
        };
        Self {
            id: find(&["id"]),
            title: find(&["title"]),
            summary: find(&["summary"]),
            timestamp: find(&["timestamp"]),
            url: find(&["url"]),
            highlights: find(&["highlights"]),
            query: find(&["query", "query_text"]),
        }
    }

    fn row(&self, record: &StringRecord) -> CacheRow {
        let get = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or_default().to_string();
        CacheRow {
            id: get(self.id),
            title: get(self.title),
            summary: get(self.summary),
            timestamp: get(self.timestamp),
            url: get(self.url),
            highlights: get(self.highlights),
            query: get(self.query),
        }
    }
}

impl From<&ArticleRecord> for CacheRow {
    fn from(record: &ArticleRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            summary: record.summary.clone(),
            timestamp: record.timestamp.clone(),
            url: record.url.clone(),
            highlights: serde_json::to_string(&record.highlights).unwrap_or_default(),
            query: record.query.clone(),
        }
    }
}

impl From<CacheRow> for ArticleRecord {
    fn from(row: CacheRow) -> Self {
        let highlights = match row.highlights.trim() {
            "" => Vec::new(),
            cell => serde_json::from_str::<Vec<String>>(cell).unwrap_or_else(|_| vec![cell.to_string()]),
        };
        Self {
            id: row.id,
            title: row.title,
            summary: row.summary,
            timestamp: row.timestamp,
            url: row.url,
            highlights,
            query: row.query,
        }
    }
}

/// Append-only CSV cache, read wholesale on every lookup.
///
/// Access from one process is serialized; separate processes sharing the
/// file are not coordinated.
pub struct CsvCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_rows(path: &Path) -> Result<Vec<ArticleRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reader = ::csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let columns = Columns::from_headers(reader.headers()?);
    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(columns.row(&record).into()),
            Err(e) => tracing::warn!(path = %path.display(), record = line + 1, error = %e, "skipping unreadable cache row"),
        }
    }
    Ok(rows)
}

/// Header of a non-empty cache file, `None` when there is nothing to follow yet.
fn existing_header(path: &Path) -> Result<Option<StringRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    let mut reader = ::csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers()?.clone();
    Ok(Some(headers).filter(|h| !h.is_empty()))
}

fn append_rows(path: &Path, rows: &[ArticleRecord]) -> Result<()> {
    let header = existing_header(path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = ::csv::WriterBuilder::new().has_headers(false).from_writer(file);
    // rows follow the column order the file already has
    let columns: Vec<String> = match header {
        Some(header) => header.iter().map(str::to_string).collect(),
        None => {
            writer.write_record(CACHE_COLUMNS)?;
            CACHE_COLUMNS.iter().map(|c| c.to_string()).collect()
        }
    };
    for row in rows {
        let row = CacheRow::from(row);
        writer.write_record(columns.iter().map(|c| row.cell(c)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Runs file work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Storage(format!("cache task failed: {}", e)))?
}

#[async_trait]
impl ArticleCache for CsvCache {
    fn name(&self) -> &str {
        "csv"
    }

    async fn load_all(&self) -> Result<Vec<ArticleRecord>> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        blocking(move || read_rows(&path)).await
    }

    async fn append(&self, rows: &[ArticleRecord]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let owned = rows.to_vec();
        blocking(move || append_rows(&path, &owned)).await?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "appended rows to cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, query: &str, ts: &str) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            title: format!("Title, with \"quotes\" {}", id),
            summary: "Line one\nline two".to_string(),
            timestamp: ts.to_string(),
            url: format!("https://news.example/{}", id),
            highlights: vec!["first".to_string(), "second, quoted \"bit\"".to_string()],
            query: query.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let cache = CsvCache::new(dir.path().join("absent.csv"));
        assert!(cache.load_all().await.unwrap().is_empty());
        assert!(cache.cached_for("AI", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_then_load() {
        let dir = tempdir().unwrap();
        let cache = CsvCache::new(dir.path().join("nested/cache.csv"));
        let rows = vec![record("1", "AI", "2025-06-01T10:00:00Z"), record("2", "AI", "2025-06-02T10:00:00Z")];

        cache.append(&rows).await.unwrap();
        cache.append(&[record("3", "Other", "2025-06-03T10:00:00Z")]).await.unwrap();

        let loaded = cache.load_all().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], rows[0]);

        let text = fs::read_to_string(cache.path()).unwrap();
        let headers = text.lines().filter(|l| l.starts_with("id,title,")).count();
        assert_eq!(headers, 1, "header must be written exactly once");
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let dir = tempdir().unwrap();
        let cache = CsvCache::new(dir.path().join("cache.csv"));
        let row = record("1", "AI", "2025-06-01T10:00:00Z");
        cache.append(&[row.clone()]).await.unwrap();
        cache.append(&[row]).await.unwrap();
        assert_eq!(cache.load_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_for_threshold() {
        let dir = tempdir().unwrap();
        let cache = CsvCache::new(dir.path().join("cache.csv"));
        cache
            .append(&[
                record("1", "AI", "2025-06-01T10:00:00Z"),
                record("2", "AI", "2025-06-03T10:00:00Z"),
                record("3", "AI", "2025-06-02T10:00:00Z"),
            ])
            .await
            .unwrap();

        assert!(cache.cached_for("AI", 4).await.unwrap().is_none());
        let hit = cache.cached_for("AI", 2).await.unwrap().unwrap();
        assert_eq!(hit.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["2", "3"]);
        assert!(cache.cached_for("ai", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tolerates_foreign_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.csv");
        fs::write(
            &path,
            "id,title,timestamp,score,query_text\n\
             a,Hello,2025-06-01T10:00:00Z,0.9,AI Regulation\n\
             b,Short row\n",
        )
        .unwrap();

        let cache = CsvCache::new(&path);
        let loaded = cache.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].query, "AI Regulation");
        assert_eq!(loaded[0].summary, "");
        assert!(loaded[0].highlights.is_empty());
        assert_eq!(loaded[1].title, "Short row");
        assert_eq!(loaded[1].query, "");
    }

    #[tokio::test]
    async fn test_append_follows_existing_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cached_data.csv");
        fs::write(
            &path,
            "id,timestamp,title,score,query_text\n\
             old,2025-05-01T10:00:00Z,Old,0.4,AI\n",
        )
        .unwrap();

        let cache = CsvCache::new(&path);
        let new = ArticleRecord {
            id: "new".to_string(),
            title: "New".to_string(),
            timestamp: "2025-06-01T10:00:00Z".to_string(),
            query: "AI".to_string(),
            ..Default::default()
        };
        cache.append(&[new.clone()]).await.unwrap();

        let loaded = cache.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1], new);

        let hit = cache.cached_for("AI", 2).await.unwrap().unwrap();
        assert_eq!(hit[0].id, "new");

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().nth(2), Some("new,2025-06-01T10:00:00Z,New,,AI"));
        assert_eq!(text.lines().filter(|l| l.starts_with("id,")).count(), 1);
    }
}
