use std::collections::BTreeSet;

use async_trait::async_trait;
use crate::types::{Article, LeaningScore};
use crate::Result;

/// Lexicon or model based polarity scoring
pub trait SentimentScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Compound polarity in [-1, 1]
    fn compound(&self, text: &str) -> f64;
}

/// People and organizations mentioned in a piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub people: BTreeSet<String>,
    pub organizations: BTreeSet<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.organizations.is_empty()
    }
}

#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Blank text yields no entities
    async fn recognize(&self, text: &str) -> Result<Entities>;
}

#[async_trait]
pub trait LeaningClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// One prediction per input text, in input order
    async fn classify(&self, texts: &[String]) -> Result<Vec<LeaningScore>>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    /// Summarize how the story told by `articles` unfolds for `query`
    async fn summarize(&self, query: &str, articles: &[Article]) -> Result<String>;
}
