use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response};
use sa_core::auth::{resolve_token_source, DATASTORE_SCOPES};
use sa_core::{
    ArticleRecord, Error, Label, NewArticle, RecordId, RecordStore, Result, TokenSource,
    ARTICLE_KIND,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;
use crate::StorageConfig;

pub const DEFAULT_BASE_URL: &str = "https://datastore.googleapis.com";

const NOT_FINISHED: &str = "NOT_FINISHED";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionId {
    project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PathElement {
    kind: String,
    // int64 ids travel as JSON strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Key {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partition_id: Option<PartitionId>,
    #[serde(default)]
    path: Vec<PathElement>,
}

impl Key {
    fn record_id(&self) -> Option<RecordId> {
        let element = self.path.last()?;
        element
            .id
            .clone()
            .or_else(|| element.name.clone())
            .map(RecordId::from)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp_value: Option<String>,
}

impl Value {
    fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            ..Default::default()
        }
    }

    fn timestamp(value: &DateTime<Utc>) -> Self {
        Self {
            timestamp_value: Some(value.to_rfc3339_opts(SecondsFormat::Micros, true)),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<Key>,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

impl Entity {
    fn string_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name)?.string_value.as_deref()
    }

    fn timestamp_property(&self, name: &str) -> Option<DateTime<Utc>> {
        let value = self.properties.get(name)?;
        let raw = value
            .timestamp_value
            .as_deref()
            .or(value.string_value.as_deref())?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// `None` when the entity has no usable key. Missing properties read as empty.
    fn into_record(self) -> Option<ArticleRecord> {
        let id = self.key.as_ref()?.record_id()?;
        let timestamp = self.timestamp_property("timestamp");
        let file_uri = self.string_property("file_uri").unwrap_or_default().to_string();
        let sentiment = self
            .string_property("sentiment")
            .and_then(|s| s.parse::<Label>().ok())
            .unwrap_or_default();

        Some(ArticleRecord {
            id,
            file_uri,
            timestamp,
            sentiment,
        })
    }
}

#[derive(Serialize)]
struct Mutation {
    insert: Entity,
}

#[derive(Serialize)]
struct CommitRequest {
    mode: &'static str,
    mutations: Vec<Mutation>,
}

#[derive(Deserialize)]
struct MutationResult {
    #[serde(default)]
    key: Option<Key>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    mutation_results: Vec<MutationResult>,
}

#[derive(Serialize)]
struct KindExpression {
    name: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Query {
    kind: Vec<KindExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest {
    partition_id: PartitionId,
    query: Query,
}

#[derive(Deserialize)]
struct EntityResult {
    entity: Entity,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct QueryResultBatch {
    #[serde(default)]
    entity_results: Vec<EntityResult>,
    #[serde(default)]
    end_cursor: Option<String>,
    #[serde(default)]
    more_results: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryResponse {
    #[serde(default)]
    batch: QueryResultBatch,
}

/// Cloud Datastore (Firestore in Datastore mode) over its REST API.
///
/// Without a token source no `Authorization` header is sent, which is what
/// the local emulator expects.
pub struct DatastoreStorage {
    client: Client,
    partition: PartitionId,
    tokens: Option<Arc<dyn TokenSource>>,
    project_url: String,
}

impl DatastoreStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let project_id = config
            .project_id
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Config("Datastore requires a project id".to_string()))?;

        let base_url = normalize_base_url(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let project_url = format!("{}/v1/projects/{}", base_url, project_id);

        Ok(Self {
            client: Client::new(),
            partition: PartitionId {
                project_id,
                namespace_id: config.namespace.clone().filter(|n| !n.is_empty()),
            },
            tokens: resolve_token_source(config.access_token.as_deref(), config.token_source.as_ref()),
            project_url,
        })
    }

    async fn call<B: Serialize, R: DeserializeOwned>(&self, method: &str, body: &B) -> Result<R> {
        let mut request = self
            .client
            .post(format!("{}:{}", self.project_url, method))
            .json(body);
        if let Some(tokens) = &self.tokens {
            let token = tokens.access_token(DATASTORE_SCOPES).await.map_err(|e| {
                Error::StoreUnavailable(format!("Datastore credentials unavailable: {}", e))
            })?;
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Datastore {} failed: {}", method, e)))?;
        let response = check_status(method, response).await?;

        response
            .json::<R>()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("Invalid Datastore {} response: {}", method, e)))
    }
}

// The emulator variable is a bare `host:port`.
fn normalize_base_url(raw: &str) -> Result<String> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| Error::Config(format!("Invalid datastore url {}: {}", raw, e)))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

async fn check_status(method: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::StoreUnavailable(format!(
        "Datastore {} returned {}: {}",
        method,
        status,
        body.trim()
    )))
}

impl fmt::Debug for DatastoreStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatastoreStorage")
            .field("partition", &self.partition)
            .field("tokens", &self.tokens.as_ref().map(|_| "<token source>"))
            .field("project_url", &self.project_url)
            .finish()
    }
}

#[async_trait]
impl RecordStore for DatastoreStorage {
    fn name(&self) -> &str {
        "datastore"
    }

    async fn list_all(&self) -> Result<Vec<ArticleRecord>> {
        let mut records = Vec::new();
        let mut cursor = None;

        loop {
            let request = RunQueryRequest {
                partition_id: self.partition.clone(),
                query: Query {
                    kind: vec![KindExpression { name: ARTICLE_KIND }],
                    start_cursor: cursor.take(),
                },
            };
            let response: RunQueryResponse = self.call("runQuery", &request).await?;
            let batch = response.batch;

            for result in batch.entity_results {
                match result.entity.into_record() {
                    Some(record) => records.push(record),
                    None => tracing::warn!("Skipping {} entity without key", ARTICLE_KIND),
                }
            }

            match (batch.more_results.as_deref(), batch.end_cursor) {
                (Some(NOT_FINISHED), Some(end_cursor)) => cursor = Some(end_cursor),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} {} entities", records.len(), ARTICLE_KIND);
        Ok(records)
    }

    async fn save(&self, article: NewArticle) -> Result<ArticleRecord> {
        let mut properties = HashMap::new();
        properties.insert("file_uri".to_string(), Value::string(article.file_uri.clone()));
        properties.insert("timestamp".to_string(), Value::timestamp(&article.timestamp));
        properties.insert("sentiment".to_string(), Value::string(article.sentiment.as_str()));

        let entity = Entity {
            key: Some(Key {
                partition_id: Some(self.partition.clone()),
                path: vec![PathElement {
                    kind: ARTICLE_KIND.to_string(),
                    ..Default::default()
                }],
            }),
            properties,
        };
        let request = CommitRequest {
            mode: "NON_TRANSACTIONAL",
            mutations: vec![Mutation { insert: entity }],
        };

        let response: CommitResponse = self.call("commit", &request).await?;
        let id = response
            .mutation_results
            .first()
            .and_then(|result| result.key.as_ref())
            .and_then(Key::record_id)
            .ok_or_else(|| {
                Error::StoreUnavailable("Datastore commit returned no allocated key".to_string())
            })?;

        tracing::debug!("Stored {} entity {}", ARTICLE_KIND, id);
        Ok(ArticleRecord::from_new(id, article))
    }
}
