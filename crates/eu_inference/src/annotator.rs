use std::sync::Arc;

use eu_core::{
    Annotation, Article, Entities, EntityRecognizer, Error, LeaningClassifier, LeaningScore, Result, SentimentCategory,
    SentimentScorer,
};
use futures::future::join_all;
use tokio::sync::Semaphore;

/// Concurrent recognizer calls allowed per batch
const DEFAULT_CONCURRENCY: usize = 10;

/// Adds sentiment, entities and optionally political leaning to articles.
pub struct Annotator {
    scorer: Arc<dyn SentimentScorer>,
    recognizer: Arc<dyn EntityRecognizer>,
    leaning: Option<Arc<dyn LeaningClassifier>>,
    semaphore: Arc<Semaphore>,
}

impl Annotator {
    pub fn new(scorer: Arc<dyn SentimentScorer>, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self {
            scorer,
            recognizer,
            leaning: None,
            semaphore: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
        }
    }

    pub fn with_leaning(mut self, classifier: Option<Arc<dyn LeaningClassifier>>) -> Self {
        self.leaning = classifier;
        self
    }

    pub fn has_leaning(&self) -> bool {
        self.leaning.is_some()
    }

    async fn entities(&self, text: &str) -> Result<Entities> {
        if text.trim().is_empty() {
            return Ok(Entities::default());
        }
        let _permit = self.semaphore.acquire().await.map_err(|e| Error::External(e.into()))?;
        self.recognizer.recognize(text).await
    }

    /// Annotates every article in place.
    ///
    /// Sentiment is scored on the title and entities are taken from the
    /// summary. A recognizer failure aborts the whole batch and leaves the
    /// articles untouched; a leaning failure is logged and leaves `leaning`
    /// unset.
    pub async fn annotate(&self, articles: &mut [Article]) -> Result<()> {
        if articles.is_empty() {
            return Ok(());
        }
        tracing::info!("🧠 Annotating {} articles (entities via {})", articles.len(), self.recognizer.name());

        let entities = join_all(articles.iter().map(|a| self.entities(&a.summary)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let leanings: Vec<Option<LeaningScore>> = match &self.leaning {
            Some(classifier) => {
                let titles: Vec<String> = articles.iter().map(|a| a.title.clone()).collect();
                match classifier.classify(&titles).await {
                    Ok(scores) if scores.len() == articles.len() => scores.into_iter().map(Some).collect(),
                    Ok(scores) => {
                        tracing::warn!("⚠️ Got {} leanings for {} articles, ignoring", scores.len(), articles.len());
                        vec![None; articles.len()]
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Leaning classification failed: {}", e);
                        vec![None; articles.len()]
                    }
                }
            }
            None => vec![None; articles.len()],
        };

        for ((article, found), leaning) in articles.iter_mut().zip(entities).zip(leanings) {
            let sentiment = self.scorer.compound(&article.title);
            article.annotation = Some(Annotation {
                sentiment,
                sentiment_category: SentimentCategory::from_score(sentiment),
                people: found.people,
                organizations: found.organizations,
                leaning,
            });
        }
        Ok(())
    }
}
