use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use sa_core::auth::{resolve_token_source, LANGUAGE_SCOPES};
use sa_core::{Error, Result, SentenceSentiment, SentimentAnalyzer, SentimentResult, TokenSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;
use crate::Config;

pub const DEFAULT_BASE_URL: &str = "https://language.googleapis.com";

const PLAIN_TEXT: &str = "PLAIN_TEXT";
const UTF8: &str = "UTF8";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    #[serde(rename = "type")]
    doc_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gcs_content_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

// Zero-valued fields are left out of the API's JSON, hence the defaults.
#[derive(Deserialize, Default)]
struct Sentiment {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    magnitude: f32,
}

#[derive(Deserialize, Default)]
struct TextSpan {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Sentence {
    #[serde(default)]
    text: TextSpan,
    #[serde(default)]
    sentiment: Sentiment,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentResponse {
    #[serde(default)]
    document_sentiment: Sentiment,
    language: Option<String>,
    #[serde(default)]
    sentences: Vec<Sentence>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Cloud Natural Language `documents:analyzeSentiment` method.
///
/// Authenticates with an API key, a bearer token from a [`TokenSource`], or both.
pub struct GoogleLanguageModel {
    client: Client,
    api_key: Option<String>,
    tokens: Option<Arc<dyn TokenSource>>,
    endpoint: String,
}

impl GoogleLanguageModel {
    pub fn new(config: &Config) -> Result<Self> {
        let tokens = resolve_token_source(config.access_token.as_deref(), config.token_source.as_ref());
        if config.api_key.is_none() && tokens.is_none() {
            return Err(Error::Config(
                "Google API key, access token or credentials are required".to_string(),
            ));
        }

        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid language API url {}: {}", base_url, e)))?;
        let endpoint = format!(
            "{}/v1/documents:analyzeSentiment",
            base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            tokens,
            endpoint,
        })
    }

    async fn authorize(&self, mut request: RequestBuilder) -> Result<RequestBuilder> {
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        if let Some(tokens) = &self.tokens {
            let token = tokens.access_token(LANGUAGE_SCOPES).await.map_err(|e| {
                Error::ExternalService(format!("Natural Language credentials unavailable: {}", e))
            })?;
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn analyze_sentiment(&self, document: Document<'_>) -> Result<AnalyzeSentimentResponse> {
        let request = AnalyzeSentimentRequest {
            document,
            encoding_type: UTF8,
        };

        let response = self
            .authorize(self.client.post(&self.endpoint))
            .await?
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Natural Language request failed: {}", e)))?;

        let response = check_status(response).await?;
        response
            .json::<AnalyzeSentimentResponse>()
            .await
            .map_err(|e| Error::ExternalService(format!("Invalid Natural Language response: {}", e)))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(parsed) => format!("{} {}", parsed.error.status, parsed.error.message),
        Err(_) => body,
    };
    Err(Error::ExternalService(format!(
        "Natural Language API returned {}: {}",
        status,
        detail.trim()
    )))
}

impl fmt::Debug for GoogleLanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleLanguageModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("tokens", &self.tokens.as_ref().map(|_| "<token source>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl SentimentAnalyzer for GoogleLanguageModel {
    fn name(&self) -> &str {
        "Google Natural Language"
    }

    async fn analyze(&self, source_reference: &str, language_code: &str) -> Result<SentimentResult> {
        let language = Some(language_code).filter(|code| !code.is_empty());
        let response = self
            .analyze_sentiment(Document {
                doc_type: PLAIN_TEXT,
                gcs_content_uri: Some(source_reference),
                content: None,
                language,
            })
            .await?;

        tracing::debug!(
            "Sentiment for {}: score={} magnitude={}",
            source_reference,
            response.document_sentiment.score,
            response.document_sentiment.magnitude
        );

        Ok(SentimentResult {
            source: source_reference.to_string(),
            score: response.document_sentiment.score,
            magnitude: response.document_sentiment.magnitude,
            language: response.language,
            sentences: Vec::new(),
        })
    }

    async fn analyze_inline(&self, text: &str) -> Result<SentimentResult> {
        let response = self
            .analyze_sentiment(Document {
                doc_type: PLAIN_TEXT,
                gcs_content_uri: None,
                content: Some(text),
                language: None,
            })
            .await?;

        let sentences = response
            .sentences
            .into_iter()
            .map(|sentence| SentenceSentiment {
                text: sentence.text.content,
                score: sentence.sentiment.score,
                magnitude: sentence.sentiment.magnitude,
            })
            .collect();

        Ok(SentimentResult {
            source: text.to_string(),
            score: response.document_sentiment.score,
            magnitude: response.document_sentiment.magnitude,
            language: response.language,
            sentences,
        })
    }
}
