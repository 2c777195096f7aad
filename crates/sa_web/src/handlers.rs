use axum::{extract::State, Json};
use chrono::{SubsecRound, Utc};
use sa_core::{classify, ArticleRecord, Error, NewArticle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::extract::AnalysisForm;
use crate::{ApiError, AppState};

/// One record as rendered to clients; every value is text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleEntry {
    pub file_uri: String,
    pub timestamp: String,
    pub sentiment: String,
}

impl From<&ArticleRecord> for ArticleEntry {
    fn from(record: &ArticleRecord) -> Self {
        Self {
            file_uri: record.file_uri.clone(),
            timestamp: record
                .timestamp
                .map(|timestamp| timestamp.to_rfc3339())
                .unwrap_or_default(),
            sentiment: record.sentiment.to_string(),
        }
    }
}

/// Records keyed by their store id.
pub type ArticleMap = BTreeMap<String, ArticleEntry>;

fn to_map<'a>(records: impl IntoIterator<Item = &'a ArticleRecord>) -> ArticleMap {
    records
        .into_iter()
        .map(|record| (record.id.to_string(), ArticleEntry::from(record)))
        .collect()
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ArticleMap>, ApiError> {
    let records = state.store.list_all().await?;
    tracing::debug!("Listing {} articles", records.len());
    Ok(Json(to_map(&records)))
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    AnalysisForm(request): AnalysisForm,
) -> Result<Json<ArticleMap>, ApiError> {
    let file_uri = request
        .source_reference()
        .ok_or_else(|| Error::Validation("file_uri is required".to_string()))?;
    let language_code = request.language_code();

    let sentiment = state.analyzer.analyze(file_uri, language_code).await?;
    let label = classify(sentiment.score);
    tracing::info!(
        "Analyzed {} ({}): score={} magnitude={} -> {}",
        file_uri,
        language_code,
        sentiment.score,
        sentiment.magnitude,
        label
    );

    let record = state
        .store
        .save(NewArticle {
            file_uri: file_uri.to_string(),
            timestamp: Utc::now().trunc_subsecs(6),
            sentiment: label,
        })
        .await?;

    Ok(Json(to_map([&record])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_app;
    use crate::error::INTERNAL_ERROR_MESSAGE;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use sa_core::{Label, RecordId, RecordStore, Result, SentimentAnalyzer, SentimentResult};
    use sa_inference::DummyModel;
    use sa_storage::MemoryStorage;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct FixedAnalyzer {
        score: f32,
        magnitude: f32,
        calls: AtomicUsize,
        received: Mutex<Vec<(String, String)>>,
    }

    impl FixedAnalyzer {
        fn new(score: f32, magnitude: f32) -> Arc<Self> {
            Arc::new(Self {
                score,
                magnitude,
                calls: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            })
        }

        fn received(&self) -> Vec<(String, String)> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SentimentAnalyzer for FixedAnalyzer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn analyze(&self, source_reference: &str, language_code: &str) -> Result<SentimentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.received
                .lock()
                .unwrap()
                .push((source_reference.to_string(), language_code.to_string()));
            Ok(SentimentResult {
                source: source_reference.to_string(),
                score: self.score,
                magnitude: self.magnitude,
                language: None,
                sentences: Vec::new(),
            })
        }

        async fn analyze_inline(&self, text: &str) -> Result<SentimentResult> {
            self.analyze(text, "").await
        }
    }

    struct FailingAnalyzer;

    #[async_trait]
    impl SentimentAnalyzer for FailingAnalyzer {
        fn name(&self) -> &str {
            "failing"
        }

        async fn analyze(&self, _source_reference: &str, _language_code: &str) -> Result<SentimentResult> {
            Err(Error::ExternalService("quota exceeded".to_string()))
        }

        async fn analyze_inline(&self, _text: &str) -> Result<SentimentResult> {
            Err(Error::ExternalService("quota exceeded".to_string()))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        fn name(&self) -> &str {
            "failing"
        }

        async fn list_all(&self) -> Result<Vec<ArticleRecord>> {
            Err(Error::StoreUnavailable("connection refused".to_string()))
        }

        async fn save(&self, _article: NewArticle) -> Result<ArticleRecord> {
            Err(Error::StoreUnavailable("connection refused".to_string()))
        }
    }

    /// Returns records as an older writer left them: one without a timestamp.
    struct LegacyStore;

    #[async_trait]
    impl RecordStore for LegacyStore {
        fn name(&self) -> &str {
            "legacy"
        }

        async fn list_all(&self) -> Result<Vec<ArticleRecord>> {
            Ok(vec![ArticleRecord {
                id: RecordId::from(9u64),
                file_uri: "gs://bucket/old.txt".to_string(),
                timestamp: None,
                sentiment: Label::Negative,
            }])
        }

        async fn save(&self, _article: NewArticle) -> Result<ArticleRecord> {
            Err(Error::StoreUnavailable("read only".to_string()))
        }
    }

    fn post_form(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/text")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_list() -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri("/api/text")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn post_with_score(score: f32) -> (Value, MemoryStorage) {
        let store = MemoryStorage::new();
        let app = create_app(AppState::new(
            FixedAnalyzer::new(score, 0.5),
            Arc::new(store.clone()),
        ));
        let response = app
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fdoc.txt&language_code=en"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        (body_json(response).await, store)
    }

    fn only_entry(body: &Value) -> (&String, &Value) {
        let map = body.as_object().unwrap();
        assert_eq!(map.len(), 1);
        map.iter().next().unwrap()
    }

    #[tokio::test]
    async fn test_list_on_empty_store() {
        let app = create_app(AppState::new(
            FixedAnalyzer::new(0.0, 0.0),
            Arc::new(MemoryStorage::new()),
        ));
        let response = app.oneshot(get_list()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_post_positive_document() {
        let store = MemoryStorage::new();
        let app = create_app(AppState::new(
            FixedAnalyzer::new(0.8, 0.9),
            Arc::new(store.clone()),
        ));

        let response = app
            .oneshot(post_form(
                "file_uri=gs%3A%2F%2Fbucket%2Fpositive.txt&language_code=en",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let (id, entry) = only_entry(&body);
        assert_eq!(entry["file_uri"], "gs://bucket/positive.txt");
        assert_eq!(entry["sentiment"], "positive");
        assert!(entry["timestamp"].is_string());

        let stored = store.list_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(&stored[0].id.to_string(), id);
        assert_eq!(stored[0].sentiment, Label::Positive);
        assert_eq!(stored[0].file_uri, "gs://bucket/positive.txt");
    }

    #[tokio::test]
    async fn test_post_zero_score_is_neutral() {
        let (body, _) = post_with_score(0.0).await;
        let (_, entry) = only_entry(&body);
        assert_eq!(entry["sentiment"], "neutral");
    }

    #[tokio::test]
    async fn test_post_negative_score_is_negative() {
        let (body, store) = post_with_score(-0.5).await;
        let (_, entry) = only_entry(&body);
        assert_eq!(entry["sentiment"], "negative");
        assert_eq!(store.list_all().await.unwrap()[0].sentiment, Label::Negative);
    }

    #[tokio::test]
    async fn test_same_uri_twice_creates_two_records() {
        let store = MemoryStorage::new();
        let app = create_app(AppState::new(
            FixedAnalyzer::new(0.3, 0.3),
            Arc::new(store.clone()),
        ));

        let first = app
            .clone()
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fsame.txt"))
            .await
            .unwrap();
        let second = app
            .clone()
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fsame.txt"))
            .await
            .unwrap();
        let first = body_json(first).await;
        let second = body_json(second).await;
        let (first_id, _) = only_entry(&first);
        let (second_id, _) = only_entry(&second);
        assert_ne!(first_id, second_id);

        let listed = body_json(app.oneshot(get_list()).await.unwrap()).await;
        let listed = listed.as_object().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains_key(first_id));
        assert!(listed.contains_key(second_id));
        for entry in listed.values() {
            assert_eq!(entry["file_uri"], "gs://bucket/same.txt");
            assert_eq!(entry["sentiment"], "positive");
        }
    }

    #[tokio::test]
    async fn test_analyzer_failure_persists_nothing() {
        let store = MemoryStorage::new();
        let app = create_app(AppState::new(Arc::new(FailingAnalyzer), Arc::new(store.clone())));

        let response = app
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fa.txt&language_code=en"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await;
        assert_eq!(text, INTERNAL_ERROR_MESSAGE);
        assert!(!text.contains("quota"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_on_save_is_500() {
        let analyzer = FixedAnalyzer::new(0.4, 0.4);
        let app = create_app(AppState::new(analyzer.clone(), Arc::new(FailingStore)));

        let response = app
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fa.txt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_failure_on_list_is_500() {
        let app = create_app(AppState::new(FixedAnalyzer::new(0.0, 0.0), Arc::new(FailingStore)));
        let response = app.oneshot(get_list()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_file_uri_is_500_without_analysis() {
        let analyzer = FixedAnalyzer::new(0.8, 0.8);
        let store = MemoryStorage::new();
        let app = create_app(AppState::new(analyzer.clone(), Arc::new(store.clone())));

        let response = app.oneshot(post_form("language_code=en")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_non_form_body_is_500() {
        let app = create_app(AppState::new(
            FixedAnalyzer::new(0.8, 0.8),
            Arc::new(MemoryStorage::new()),
        ));
        let request = Request::builder()
            .method("POST")
            .uri("/api/text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"file_uri":"gs://bucket/a.txt"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_post_with_dummy_model() {
        let app = create_app(AppState::new(
            Arc::new(DummyModel::new()),
            Arc::new(MemoryStorage::new()),
        ));
        let response = app
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fterrible-review.txt"))
            .await
            .unwrap();

        let body = body_json(response).await;
        let (_, entry) = only_entry(&body);
        assert_eq!(entry["sentiment"], "negative");
    }

    fn post_multipart(fields: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--XYZ\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                name, value
            ));
        }
        body.push_str("--XYZ--\r\n");

        Request::builder()
            .method("POST")
            .uri("/api/text")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_multipart_form() {
        let analyzer = FixedAnalyzer::new(0.6, 0.6);
        let store = MemoryStorage::new();
        let app = create_app(AppState::new(analyzer.clone(), Arc::new(store.clone())));

        let response = app
            .oneshot(post_multipart(&[
                ("file_uri", "gs://bucket/great.txt"),
                ("language_code", "de"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let (_, entry) = only_entry(&body);
        assert_eq!(entry["file_uri"], "gs://bucket/great.txt");
        assert_eq!(entry["sentiment"], "positive");
        assert_eq!(
            analyzer.received(),
            vec![("gs://bucket/great.txt".to_string(), "de".to_string())]
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_multipart_without_file_uri_is_500() {
        let analyzer = FixedAnalyzer::new(0.6, 0.6);
        let app = create_app(AppState::new(analyzer.clone(), Arc::new(MemoryStorage::new())));

        let response = app
            .oneshot(post_multipart(&[("language_code", "en")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_language_code_defaults_and_passes_through() {
        let analyzer = FixedAnalyzer::new(0.1, 0.1);
        let app = create_app(AppState::new(analyzer.clone(), Arc::new(MemoryStorage::new())));

        let response = app
            .clone()
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fa.txt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app
            .oneshot(post_form("file_uri=gs%3A%2F%2Fbucket%2Fb.txt&language_code=xx"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            analyzer.received(),
            vec![
                ("gs://bucket/a.txt".to_string(), "en".to_string()),
                ("gs://bucket/b.txt".to_string(), "xx".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_file_uri_is_passed_through_verbatim() {
        let analyzer = FixedAnalyzer::new(0.2, 0.2);
        let store = MemoryStorage::new();
        let app = create_app(AppState::new(analyzer.clone(), Arc::new(store.clone())));

        let response = app
            .oneshot(post_form("file_uri=+gs%3A%2F%2Fb%2Fa.txt+"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let (_, entry) = only_entry(&body);
        assert_eq!(entry["file_uri"], " gs://b/a.txt ");
        assert_eq!(analyzer.received()[0].0, " gs://b/a.txt ");
        assert_eq!(store.list_all().await.unwrap()[0].file_uri, " gs://b/a.txt ");
    }

    #[tokio::test]
    async fn test_record_without_timestamp_lists_with_empty_text() {
        let app = create_app(AppState::new(
            FixedAnalyzer::new(0.0, 0.0),
            Arc::new(LegacyStore),
        ));
        let response = app.oneshot(get_list()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "9": {
                    "file_uri": "gs://bucket/old.txt",
                    "timestamp": "",
                    "sentiment": "negative"
                }
            })
        );
    }
}
