use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use eu_core::{
    clean_articles, entity_options, filter_articles_by_time, filter_by_entities, keyword_index, Article, Cutoff,
    EntityOptions, Error, FetchOutcome, KeywordHit, Origin, Window,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::{AppState, DEFAULT_LIMIT};

/// Library errors as JSON `{"error": ...}` with a matching status.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::Config(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Config(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("request failed: {}", self.0);
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ArticleParams {
    pub query: String,
    pub limit: Option<usize>,
    /// Absolute lower bound; a value without an offset is read in the server's zone
    pub since: Option<String>,
    /// Relative lower bound, `window` units back from now
    pub window: Option<u32>,
    pub unit: Option<String>,
    /// Comma separated
    pub people: Option<String>,
    pub orgs: Option<String>,
}

impl ArticleParams {
    fn cutoff(&self) -> eu_core::Result<Option<Cutoff>> {
        if let Some(since) = self.since.as_deref().filter(|s| !s.trim().is_empty()) {
            return since.parse().map(Some);
        }
        let Some(amount) = self.window else {
            return Ok(None);
        };
        let unit = self.unit.as_deref().unwrap_or("days").parse()?;
        let window = Window::new(amount, unit);
        window
            .cutoff_from(Utc::now())
            .map(|ts| Some(Cutoff::from(ts)))
            .ok_or_else(|| Error::Config(format!("Window out of range: {:?}", window)))
    }
}

fn split_list(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    pub query: String,
    pub origin: Origin,
    pub count: usize,
    pub articles: Vec<Article>,
}

#[derive(Debug, Serialize)]
pub struct KeywordsResponse {
    pub query: String,
    pub keywords: Vec<KeywordHit>,
}

#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub query: String,
    #[serde(flatten)]
    pub options: EntityOptions,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub query: String,
    pub model: String,
    pub summary: String,
}

/// Either cleaned rows or the message to show instead.
async fn fetch_clean(state: &AppState, query: &str, limit: Option<usize>) -> Result<(Vec<Article>, Origin), Response> {
    match state.manager.fetch_or_retrieve(query, limit.unwrap_or(DEFAULT_LIMIT)).await {
        FetchOutcome::Message(message) => Err(Json(json!({ "message": message })).into_response()),
        FetchOutcome::Articles { rows, origin } => Ok((clean_articles(rows), origin)),
    }
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ArticleParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let cutoff = params.cutoff()?;
    let (articles, origin) = match fetch_clean(&state, &params.query, params.limit).await {
        Ok(fetched) => fetched,
        Err(message) => return Ok(message),
    };

    let mut articles = match cutoff {
        Some(cutoff) => filter_articles_by_time(&articles, cutoff, state.timezone),
        None => articles,
    };
    state.annotator.annotate(&mut articles).await?;
    let articles = filter_by_entities(articles, &split_list(&params.people), &split_list(&params.orgs));

    Ok(Json(ArticlesResponse {
        query: params.query,
        origin,
        count: articles.len(),
        articles,
    })
    .into_response())
}

pub async fn list_keywords(
    State(state): State<Arc<AppState>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let (articles, _) = match fetch_clean(&state, &params.query, params.limit).await {
        Ok(fetched) => fetched,
        Err(message) => return Ok(message),
    };
    Ok(Json(KeywordsResponse {
        keywords: keyword_index(&articles),
        query: params.query,
    })
    .into_response())
}

pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let (mut articles, _) = match fetch_clean(&state, &params.query, params.limit).await {
        Ok(fetched) => fetched,
        Err(message) => return Ok(message),
    };
    state.annotator.annotate(&mut articles).await?;
    Ok(Json(EntitiesResponse {
        options: entity_options(&articles),
        query: params.query,
    })
    .into_response())
}

pub async fn summarize(
    State(state): State<Arc<AppState>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let Some(summarizer) = state.summarizer.clone() else {
        let body = Json(json!({"error": "No summarizer configured"}));
        return Ok((StatusCode::NOT_IMPLEMENTED, body).into_response());
    };
    let (articles, _) = match fetch_clean(&state, &params.query, params.limit).await {
        Ok(fetched) => fetched,
        Err(message) => return Ok(message),
    };
    let summary = summarizer.summarize(&params.query, &articles).await?;
    Ok(Json(SummaryResponse {
        model: summarizer.name().to_string(),
        query: params.query,
        summary,
    })
    .into_response())
}
