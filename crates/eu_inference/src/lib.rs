pub mod annotator;
pub mod models;

pub use annotator::Annotator;
pub use models::{
    create_leaning_classifier, create_recognizer, create_scorer, create_summarizer, InferenceConfig,
};

/// Annotator built from `config`: lexicon sentiment, the configured
/// recognizer and the leaning classifier when one is set.
pub fn create_annotator(config: &InferenceConfig) -> eu_core::Result<Annotator> {
    let annotator = Annotator::new(create_scorer(config)?, create_recognizer(config)?)
        .with_leaning(create_leaning_classifier(config)?);
    Ok(annotator)
}

pub mod prelude {
    pub use super::models::{
        ChatSummarizer, GazetteerRecognizer, LexiconScorer, RemoteLeaningClassifier, RemoteModelConfig,
        RemoteRecognizer, SummarizerConfig,
    };
    pub use super::{create_annotator, Annotator, InferenceConfig};
    pub use eu_core::{Article, Error, Result};
}
