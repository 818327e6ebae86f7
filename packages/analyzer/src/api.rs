//! HTTP surface of the analyzer service.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use papersift_fetcher::{ArticleSource, FetchRequest, FetchedArticle};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::analysis::Analyzer;
use crate::error::{AnalyzerError, ErrorKind};
use crate::models::{
    AnalysisResult, AnalyzeOptions, Article, BatchOptions, BatchResult, HealthStatus,
};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub fetcher: Arc<dyn ArticleSource>,
}

/// Error response: `{error, kind}` with a status derived from the kind.
#[derive(Debug)]
pub struct ApiError(pub AnalyzerError);

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AnalyzerError::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AnalyzerError::InvalidInput(rejection.body_text()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Fatal | ErrorKind::Parse => StatusCode::BAD_GATEWAY,
        ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, ?kind, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string(), "kind": kind }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub articles: Vec<Article>,
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub status: &'static str,
    pub cleared_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct FetchAndAnalyzeResponse {
    pub articles: Vec<FetchedArticle>,
    pub analysis: BatchResult,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/batch-analyze", post(batch_analyze))
        .route("/fetch-and-analyze", post(fetch_and_analyze))
        .route("/health", get(health))
        .route("/cache", delete(clear_cache))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn analyze(
    State(state): State<AppState>,
    options: Result<Query<AnalyzeOptions>, QueryRejection>,
    article: Result<Json<Article>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Query(options) = options?;
    let Json(article) = article?;

    let result = state
        .analyzer
        .analyze(&article, options)
        .await
        .map_err(|failure| ApiError(failure.error))?;
    Ok(Json(result))
}

async fn batch_analyze(
    State(state): State<AppState>,
    request: Result<Json<BatchAnalyzeRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(request) = request?;

    if request.articles.is_empty() {
        return Err(AnalyzerError::InvalidInput("no articles provided for analysis".into()).into());
    }
    if request.max_concurrent == Some(0) {
        return Err(AnalyzerError::InvalidInput("max_concurrent must be at least 1".into()).into());
    }

    let options = BatchOptions {
        max_concurrent: request.max_concurrent,
        analyze: AnalyzeOptions {
            force_refresh: request.force_refresh,
        },
    };
    Ok(Json(state.analyzer.analyze_batch(&request.articles, options).await))
}

async fn fetch_and_analyze(
    State(state): State<AppState>,
    request: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Json<FetchAndAnalyzeResponse>, ApiError> {
    let Json(request) = request?;

    let fetched = state
        .fetcher
        .fetch(&request)
        .await
        .map_err(AnalyzerError::from)?;

    let articles: Vec<Article> = fetched
        .articles
        .iter()
        .cloned()
        .filter_map(|record| {
            let arxiv_id = record.arxiv_id.clone();
            Article::try_from(record)
                .map_err(|e| tracing::warn!(arxiv_id = %arxiv_id, error = %e, "skipping unusable article"))
                .ok()
        })
        .collect();

    let analysis = state
        .analyzer
        .analyze_batch(&articles, BatchOptions::default())
        .await;

    Ok(Json(FetchAndAnalyzeResponse {
        articles: fetched.articles,
        analysis,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.analyzer.health())
}

async fn clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    Json(ClearCacheResponse {
        status: "success",
        cleared_entries: state.analyzer.cache_clear(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::VALID_COMPLETION;
    use crate::analysis::MockLlmClient;
    use crate::config::AnalyzerConfig;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use papersift_fetcher::{FetchResponse, FetcherError};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    struct StaticSource(Vec<FetchedArticle>);

    #[async_trait]
    impl ArticleSource for StaticSource {
        async fn fetch(&self, _request: &FetchRequest) -> papersift_fetcher::Result<FetchResponse> {
            if self.0.is_empty() {
                return Err(FetcherError::NotFound("no articles".into()));
            }
            Ok(FetchResponse::from(self.0.clone()))
        }
    }

    fn fetched(id: &str) -> FetchedArticle {
        FetchedArticle {
            arxiv_id: id.into(),
            title: "Verifiable FHE".into(),
            authors: vec!["A. Viand".into()],
            abstract_text: "Fully Homomorphic Encryption".into(),
            categories: vec!["cs.CR".into()],
            published: None,
            pdf_url: format!("https://arxiv.org/pdf/{id}.pdf"),
            full_text: None,
            text_length: None,
        }
    }

    fn app(mock: MockLlmClient, source: Vec<FetchedArticle>) -> Router {
        let config = AnalyzerConfig::builder("test-key").build();
        router(AppState {
            analyzer: Arc::new(Analyzer::new(Arc::new(mock), config)),
            fetcher: Arc::new(StaticSource(source)),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn test_analyze_then_health_and_clear() {
        let app = app(MockLlmClient::repeating(VALID_COMPLETION), vec![]);

        let (status, body) = send(
            &app,
            post_json(
                "/analyze",
                json!({"arxiv_id": "2301.07041", "title": "Verifiable FHE", "abstract": "Fully Homomorphic Encryption..."}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["arxiv_id"], "2301.07041");
        assert_eq!(body["confidence"], 0.85);
        assert_eq!(body["analysis"]["category"]["domain"], "Computer Science");

        let (status, body) = send(&app, Request::get("/health").body(Body::empty()).expect("req")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "healthy", "service": "analyzer-service", "cache_size": 1})
        );

        let (status, body) =
            send(&app, Request::delete("/cache").body(Body::empty()).expect("req")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "cleared_entries": 1}));
    }

    #[tokio::test]
    async fn test_analyze_rejects_missing_abstract() {
        let app = app(MockLlmClient::repeating(VALID_COMPLETION), vec![]);
        let (status, body) = send(
            &app,
            post_json("/analyze", json!({"arxiv_id": "1", "title": "T", "abstract": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_analyze_maps_llm_failures() {
        let app = app(
            MockLlmClient::failing(AnalyzerError::fatal(Some(401), "invalid key")),
            vec![],
        );
        let (status, body) = send(
            &app,
            post_json("/analyze", json!({"arxiv_id": "1", "title": "T", "abstract": "A"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "fatal");
    }

    #[tokio::test]
    async fn test_batch_validation() {
        let app = app(MockLlmClient::repeating(VALID_COMPLETION), vec![]);

        let (status, _) = send(&app, post_json("/batch-analyze", json!({"articles": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json(
                "/batch-analyze",
                json!({"articles": [{"arxiv_id": "1", "title": "T", "abstract": "A"}], "max_concurrent": 0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch_reports_partial_failure() {
        let app = app(
            MockLlmClient::new(vec![
                Ok(crate::analysis::LlmResponse::text(VALID_COMPLETION)),
                Err(AnalyzerError::fatal(Some(400), "bad request")),
            ]),
            vec![],
        );
        let (status, body) = send(
            &app,
            post_json(
                "/batch-analyze",
                json!({
                    "articles": [
                        {"arxiv_id": "a", "title": "T", "abstract": "A"},
                        {"arxiv_id": "b", "title": "T", "abstract": "B"}
                    ],
                    "max_concurrent": 1
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["successful"], 1);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["results"][0]["status"], "analyzed");
        assert_eq!(body["results"][1]["status"], "failed");
        assert_eq!(body["results"][1]["arxiv_id"], "b");
        assert_eq!(body["results"][1]["kind"], "fatal");
    }

    #[tokio::test]
    async fn test_fetch_and_analyze() {
        let app = app(
            MockLlmClient::repeating(VALID_COMPLETION),
            vec![fetched("2301.07041"), fetched("1910.07125")],
        );
        let (status, body) = send(
            &app,
            post_json("/fetch-and-analyze", json!({"query": "cat:cs.CR", "max_results": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["articles"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["analysis"]["successful"], 2);
        assert_eq!(body["analysis"]["results"][1]["arxiv_id"], "1910.07125");
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_404() {
        let app = app(MockLlmClient::repeating(VALID_COMPLETION), vec![]);
        let (status, body) = send(
            &app,
            post_json("/fetch-and-analyze", json!({"arxiv_id": "2301.99999"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }
}
