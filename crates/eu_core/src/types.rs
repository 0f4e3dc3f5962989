use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A row as delivered by the search API, before any cleaning.
///
/// Every field is lenient: missing keys fall back to defaults and scalar
/// values of any JSON type are accepted where a string is expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_highlights")]
    pub highlights: Vec<String>,
    #[serde(default, alias = "query_text", deserialize_with = "lenient_string")]
    pub query: String,
}

impl From<&Article> for ArticleRecord {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            summary: article.summary.clone(),
            timestamp: article.timestamp.to_rfc3339(),
            url: article.url.clone(),
            highlights: article.highlights.clone(),
            query: article.query.clone(),
        }
    }
}

/// A cleaned row: the timestamp has been parsed into a timezone-aware value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub timestamp: DateTime<FixedOffset>,
    pub url: String,
    pub highlights: Vec<String>,
    pub query: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl Article {
    pub fn from_record(record: ArticleRecord, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            summary: record.summary,
            timestamp,
            url: record.url,
            highlights: record.highlights,
            query: record.query,
            annotation: None,
        }
    }

    pub fn people(&self) -> impl Iterator<Item = &String> {
        self.annotation.iter().flat_map(|a| a.people.iter())
    }

    pub fn organizations(&self) -> impl Iterator<Item = &String> {
        self.annotation.iter().flat_map(|a| a.organizations.iter())
    }
}

/// Per-session enrichment of an article. Never written back to the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub sentiment: f64,
    pub sentiment_category: SentimentCategory,
    pub people: BTreeSet<String>,
    pub organizations: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaning: Option<LeaningScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SentimentCategory {
    #[serde(rename = "very negative")]
    VeryNegative,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "very positive")]
    VeryPositive,
}

impl SentimentCategory {
    /// Buckets a compound score. Both outer thresholds are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score <= -0.6 {
            Self::VeryNegative
        } else if score < -0.2 {
            Self::Negative
        } else if score <= 0.2 {
            Self::Neutral
        } else if score < 0.6 {
            Self::Positive
        } else {
            Self::VeryPositive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryNegative => "very negative",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
            Self::VeryPositive => "very positive",
        }
    }
}

impl fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leaning {
    Left,
    Center,
    Right,
}

impl Leaning {
    pub const ALL: [Leaning; 3] = [Leaning::Left, Leaning::Center, Leaning::Right];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Accepts either a plain name or a `LABEL_<n>` classifier label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Some(n) = label.strip_prefix("LABEL_") {
            return n.parse().ok().and_then(Self::from_index);
        }
        match label.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "center" | "centre" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Leaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Leaning::Left => "Left",
            Leaning::Center => "Center",
            Leaning::Right => "Right",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeaningScore {
    pub leaning: Leaning,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Cache,
    Live,
}

/// Result of asking for a query's articles.
///
/// Failures are carried as a single descriptive message instead of an error
/// so that front-ends can render them inline.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Articles {
        rows: Vec<ArticleRecord>,
        origin: Origin,
    },
    Message(String),
}

impl FetchOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            FetchOutcome::Message(m) => Some(m),
            FetchOutcome::Articles { .. } => None,
        }
    }

    pub fn rows(&self) -> &[ArticleRecord] {
        match self {
            FetchOutcome::Articles { rows, .. } => rows,
            FetchOutcome::Message(_) => &[],
        }
    }

    pub fn into_rows(self) -> Vec<ArticleRecord> {
        match self {
            FetchOutcome::Articles { rows, .. } => rows,
            FetchOutcome::Message(_) => Vec::new(),
        }
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(scalar_to_string).unwrap_or_default())
}

fn lenient_highlights<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().map(scalar_to_string).collect(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(other) => vec![scalar_to_string(other)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_thresholds() {
        assert_eq!(SentimentCategory::from_score(-0.6), SentimentCategory::VeryNegative);
        assert_eq!(SentimentCategory::from_score(-0.59), SentimentCategory::Negative);
        assert_eq!(SentimentCategory::from_score(-0.2), SentimentCategory::Neutral);
        assert_eq!(SentimentCategory::from_score(0.0), SentimentCategory::Neutral);
        assert_eq!(SentimentCategory::from_score(0.2), SentimentCategory::Neutral);
        assert_eq!(SentimentCategory::from_score(0.21), SentimentCategory::Positive);
        assert_eq!(SentimentCategory::from_score(0.6), SentimentCategory::VeryPositive);
        assert!(SentimentCategory::VeryNegative < SentimentCategory::VeryPositive);
    }

    #[test]
    fn test_record_is_lenient() {
        let json = r#"{"id": 42, "title": null, "timestamp": "2025-06-01T10:00:00Z",
                       "highlights": ["a", 1], "extra": {"nested": true}}"#;
        let record: ArticleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.title, "");
        assert_eq!(record.summary, "");
        assert_eq!(record.highlights, vec!["a".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_query_text_alias() {
        let record: ArticleRecord =
            serde_json::from_str(r#"{"id": "a", "query_text": "AI Regulation"}"#).unwrap();
        assert_eq!(record.query, "AI Regulation");
    }

    #[test]
    fn test_leaning_labels() {
        assert_eq!(Leaning::from_label("LABEL_2"), Some(Leaning::Right));
        assert_eq!(Leaning::from_label("left"), Some(Leaning::Left));
        assert_eq!(Leaning::from_label("LABEL_7"), None);
    }

    #[test]
    fn test_annotation_is_flattened() {
        let record = ArticleRecord { id: "1".into(), ..Default::default() };
        let ts = DateTime::parse_from_rfc3339("2025-06-01T10:00:00+00:00").unwrap();
        let mut article = Article::from_record(record, ts);
        article.annotation = Some(Annotation {
            sentiment: 0.7,
            sentiment_category: SentimentCategory::VeryPositive,
            people: BTreeSet::from(["Ada".to_string()]),
            organizations: BTreeSet::new(),
            leaning: None,
        });
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["sentiment_category"], "very positive");
        assert_eq!(json["people"][0], "Ada");
    }
}
