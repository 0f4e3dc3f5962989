pub mod clean;
pub mod entities;
pub mod error;
pub mod keywords;
pub mod models;
pub mod storage;
pub mod types;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use clean::{clean_articles, filter_articles_by_time, Cutoff, Window, WindowUnit, DEFAULT_TIMEZONE};
pub use entities::{entity_options, filter_by_entities, EntityOptions};
pub use keywords::{extract_keywords, keyword_index, KeywordHit};
pub use models::{Entities, EntityRecognizer, LeaningClassifier, SentimentScorer, Summarizer};
pub use storage::ArticleCache;
pub use types::{
    Annotation, Article, ArticleRecord, FetchOutcome, Leaning, LeaningScore, Origin, SentimentCategory,
};
