use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use eu_core::{Article, Error, Result, Summarizer};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_MODEL: &str = "deepseek-chat";

#[derive(Clone)]
pub struct SummarizerConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl SummarizerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

/// Asks an OpenAI-compatible chat endpoint how a story developed.
pub struct ChatSummarizer {
    client: Client,
    config: SummarizerConfig,
}

impl fmt::Debug for ChatSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSummarizer")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl ChatSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

/// Headlines oldest first, one per line, with the date and the summary.
pub fn build_prompt(query: &str, articles: &[Article]) -> String {
    let mut ordered: Vec<&Article> = articles.iter().collect();
    ordered.sort_by_key(|a| a.timestamp);

    let mut prompt = format!(
        "The following news articles about \"{}\" are listed from oldest to newest.\n\
         Describe how the story unfolded over time in a few short paragraphs, \
         noting turning points and shifts in tone.\n\n",
        query
    );
    for article in ordered {
        prompt.push_str(&format!("- {}: {}", article.timestamp.format("%Y-%m-%d"), article.title));
        if !article.summary.trim().is_empty() {
            prompt.push_str(&format!(". {}", article.summary.trim()));
        }
        prompt.push('\n');
    }
    prompt.push_str("\nSummary:");
    prompt
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn summarize(&self, query: &str, articles: &[Article]) -> Result<String> {
        if articles.is_empty() {
            return Err(Error::Inference(format!("No articles to summarize for '{}'", query)));
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(query, articles),
            }],
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(Error::from_request)?
            .error_for_status()
            .map_err(Error::from_request)?
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::MalformedBody(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| Error::Inference("Chat endpoint returned no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use chrono::DateTime;
    use eu_core::ArticleRecord;
    use serde_json::{json, Value};

    fn article(id: &str, title: &str, ts: &str) -> Article {
        let record = ArticleRecord {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        };
        Article::from_record(record, DateTime::parse_from_rfc3339(ts).unwrap())
    }

    #[test]
    fn test_prompt_orders_oldest_first() {
        let articles = vec![
            article("2", "Act passes", "2025-06-02T10:00:00Z"),
            article("1", "Act proposed", "2025-06-01T10:00:00Z"),
        ];
        let prompt = build_prompt("AI Act", &articles);
        assert!(prompt.contains("\"AI Act\""));
        let first = prompt.find("Act proposed").unwrap();
        let second = prompt.find("Act passes").unwrap();
        assert!(first < second);
        assert!(prompt.contains("- 2025-06-01: Act proposed\n"));
    }

    #[tokio::test]
    async fn test_summarize() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
                assert_eq!(body["model"], DEFAULT_CHAT_MODEL);
                assert_eq!(body["messages"][0]["role"], "user");
                Json(json!({"choices": [{"message": {"role": "assistant", "content": " It escalated. "}}]}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = SummarizerConfig::new(format!("http://{}/v1/", addr)).with_api_key(Some("sk-test".into()));
        let summarizer = ChatSummarizer::new(config).unwrap();
        let text = summarizer
            .summarize("AI Act", &[article("1", "Act proposed", "2025-06-01T10:00:00Z")])
            .await
            .unwrap();
        assert_eq!(text, "It escalated.");
        assert!(summarizer.summarize("AI Act", &[]).await.is_err());
    }
}
