use std::path::PathBuf;
use std::sync::Arc;

use eu_core::{EntityRecognizer, LeaningClassifier, Result, SentimentScorer, Summarizer};

pub mod chat;
pub mod gazetteer;
pub mod lexicon;
pub mod remote;

pub use chat::{ChatSummarizer, SummarizerConfig};
pub use gazetteer::GazetteerRecognizer;
pub use lexicon::LexiconScorer;
pub use remote::{RemoteLeaningClassifier, RemoteModelConfig, RemoteRecognizer};

/// Where each model comes from. Anything left unset falls back to the
/// built-in lexicon and gazetteer, or is simply not available.
#[derive(Debug, Clone, Default)]
pub struct InferenceConfig {
    pub lexicon_path: Option<PathBuf>,
    pub entities_path: Option<PathBuf>,
    pub ner_url: Option<String>,
    pub lean_url: Option<String>,
    /// Bearer token for the NER and leaning endpoints
    pub model_api_key: Option<String>,
    pub summarizer_url: Option<String>,
    pub summarizer_key: Option<String>,
    pub summarizer_model: Option<String>,
}

pub fn create_scorer(config: &InferenceConfig) -> Result<Arc<dyn SentimentScorer>> {
    let scorer = match &config.lexicon_path {
        Some(path) => LexiconScorer::with_overrides(path)?,
        None => LexiconScorer::new(),
    };
    Ok(Arc::new(scorer))
}

pub fn create_recognizer(config: &InferenceConfig) -> Result<Arc<dyn EntityRecognizer>> {
    let recognizer: Arc<dyn EntityRecognizer> = match (&config.ner_url, &config.entities_path) {
        (Some(url), _) => {
            let remote = RemoteModelConfig::new(url)?.with_api_key(config.model_api_key.clone());
            Arc::new(RemoteRecognizer::new(remote)?)
        }
        (None, Some(path)) => Arc::new(GazetteerRecognizer::from_path(path)?),
        (None, None) => Arc::new(GazetteerRecognizer::builtin()?),
    };
    tracing::debug!(recognizer = recognizer.name(), "entity recognizer ready");
    Ok(recognizer)
}

pub fn create_leaning_classifier(config: &InferenceConfig) -> Result<Option<Arc<dyn LeaningClassifier>>> {
    let Some(url) = &config.lean_url else {
        return Ok(None);
    };
    let remote = RemoteModelConfig::new(url)?.with_api_key(config.model_api_key.clone());
    Ok(Some(Arc::new(RemoteLeaningClassifier::new(remote)?)))
}

pub fn create_summarizer(config: &InferenceConfig) -> Result<Option<Arc<dyn Summarizer>>> {
    let Some(url) = &config.summarizer_url else {
        return Ok(None);
    };
    let mut summarizer = SummarizerConfig::new(url.clone()).with_api_key(config.summarizer_key.clone());
    if let Some(model) = &config.summarizer_model {
        summarizer = summarizer.with_model(model.clone());
    }
    Ok(Some(Arc::new(ChatSummarizer::new(summarizer)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InferenceConfig::default();
        assert_eq!(create_scorer(&config).unwrap().name(), "lexicon");
        assert_eq!(create_recognizer(&config).unwrap().name(), "gazetteer");
        assert!(create_leaning_classifier(&config).unwrap().is_none());
        assert!(create_summarizer(&config).unwrap().is_none());
    }

    #[test]
    fn test_remote_selection() {
        let config = InferenceConfig {
            ner_url: Some("http://localhost:8080/ner".to_string()),
            lean_url: Some("http://localhost:8080/lean".to_string()),
            summarizer_url: Some("http://localhost:8080/v1".to_string()),
            summarizer_model: Some("local-model".to_string()),
            ..Default::default()
        };
        assert_eq!(create_recognizer(&config).unwrap().name(), "remote-ner");
        assert_eq!(create_leaning_classifier(&config).unwrap().unwrap().name(), "remote-leaning");
        assert_eq!(create_summarizer(&config).unwrap().unwrap().name(), "local-model");

        let bad = InferenceConfig {
            ner_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(create_recognizer(&bad).is_err());
    }
}
