use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use eu_core::{Entities, EntityRecognizer, Error, Leaning, LeaningClassifier, LeaningScore, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

/// Endpoint of a hosted model speaking the Hugging Face inference protocol.
#[derive(Clone)]
pub struct RemoteModelConfig {
    pub url: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl RemoteModelConfig {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self {
            url,
            api_key: None,
            timeout: Duration::from_secs(60),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn client(&self) -> Result<Client> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }

    async fn post<T: Serialize + ?Sized>(&self, client: &Client, body: &T) -> Result<Value> {
        let mut request = client.post(self.url.clone()).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(Error::from_request)?
            .error_for_status()
            .map_err(Error::from_request)?;
        let body = response.text().await.map_err(Error::from_request)?;
        serde_json::from_str(&body).map_err(|e| Error::MalformedBody(e.to_string()))
    }
}

impl fmt::Debug for RemoteModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteModelConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenEntity {
    #[serde(alias = "entity")]
    entity_group: String,
    word: String,
}

/// Token-classification endpoint returning `[{entity_group, word, ...}]`.
#[derive(Debug)]
pub struct RemoteRecognizer {
    client: Client,
    config: RemoteModelConfig,
}

impl RemoteRecognizer {
    pub fn new(config: RemoteModelConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

fn entity_label(group: &str) -> &str {
    group.trim_start_matches("B-").trim_start_matches("I-")
}

#[async_trait]
impl EntityRecognizer for RemoteRecognizer {
    fn name(&self) -> &str {
        "remote-ner"
    }

    async fn recognize(&self, text: &str) -> Result<Entities> {
        if text.trim().is_empty() {
            return Ok(Entities::default());
        }
        let body = json!({
            "inputs": text,
            "parameters": {"aggregation_strategy": "simple"},
        });
        let payload = self.config.post(&self.client, &body).await?;
        let tokens: Vec<TokenEntity> =
            serde_json::from_value(payload).map_err(|e| Error::Inference(format!("Unexpected NER response: {}", e)))?;

        let mut people = BTreeSet::new();
        let mut organizations = BTreeSet::new();
        for token in tokens {
            let word = token.word.trim().to_string();
            if word.is_empty() {
                continue;
            }
            match entity_label(&token.entity_group) {
                "PER" | "PERSON" => {
                    people.insert(word);
                }
                "ORG" => {
                    organizations.insert(word);
                }
                _ => {}
            }
        }
        Ok(Entities { people, organizations })
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Text-classification endpoint with one label per leaning.
#[derive(Debug)]
pub struct RemoteLeaningClassifier {
    client: Client,
    config: RemoteModelConfig,
}

impl RemoteLeaningClassifier {
    pub fn new(config: RemoteModelConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

fn best_label(scores: Vec<LabelScore>) -> Result<LeaningScore> {
    let best = scores
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| Error::Inference("Classifier returned no labels".to_string()))?;
    let leaning = Leaning::from_label(&best.label)
        .ok_or_else(|| Error::Inference(format!("Unknown leaning label: {}", best.label)))?;
    Ok(LeaningScore {
        leaning,
        score: best.score,
    })
}

/// Batched inputs come back as one label list per text; a single input may
/// come back as a flat list.
fn parse_predictions(payload: Value, expected: usize) -> Result<Vec<LeaningScore>> {
    let nested = matches!(&payload, Value::Array(items) if items.first().map_or(true, Value::is_array));
    let batches: Vec<Vec<LabelScore>> = if nested {
        serde_json::from_value(payload)
    } else {
        serde_json::from_value(payload).map(|single| vec![single])
    }
    .map_err(|e| Error::Inference(format!("Unexpected classifier response: {}", e)))?;

    if batches.len() != expected {
        return Err(Error::Inference(format!(
            "Classifier returned {} predictions for {} texts",
            batches.len(),
            expected
        )));
    }
    batches.into_iter().map(best_label).collect()
}

#[async_trait]
impl LeaningClassifier for RemoteLeaningClassifier {
    fn name(&self) -> &str {
        "remote-leaning"
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<LeaningScore>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({
            "inputs": texts,
            "parameters": {"top_k": Leaning::ALL.len()},
            "options": {"wait_for_model": true},
        });
        let payload = self.config.post(&self.client, &body).await?;
        parse_predictions(payload, texts.len())
    }
}
