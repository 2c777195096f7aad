use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document-store kind under which every record is kept.
pub const ARTICLE_KIND: &str = "Articles";

pub const DEFAULT_LANGUAGE_CODE: &str = "en";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    pub file_uri: Option<String>,
    pub language_code: Option<String>,
}

impl AnalysisRequest {
    /// The source reference exactly as submitted, if one was supplied and is non-empty.
    pub fn source_reference(&self) -> Option<&str> {
        self.file_uri.as_deref().filter(|s| !s.is_empty())
    }

    pub fn language_code(&self) -> &str {
        self.language_code
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE_CODE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceSentiment {
    pub text: String,
    pub score: f32,
    pub magnitude: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub source: String,
    pub score: f32,
    pub magnitude: f32,
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sentences: Vec<SentenceSentiment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Positive,
    Negative,
    Neutral,
    #[default]
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "positive",
            Label::Negative => "negative",
            Label::Neutral => "neutral",
            Label::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = std::convert::Infallible;

    /// Anything unrecognised reads back as `Unknown`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "positive" => Label::Positive,
            "negative" => Label::Negative,
            "neutral" => Label::Neutral,
            _ => Label::Unknown,
        })
    }
}

/// Store-assigned identifier. Opaque to everything but the backend that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub file_uri: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment: Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: RecordId,
    pub file_uri: String,
    /// `None` for records written without a readable timestamp.
    pub timestamp: Option<DateTime<Utc>>,
    pub sentiment: Label,
}

impl ArticleRecord {
    pub fn from_new(id: RecordId, article: NewArticle) -> Self {
        Self {
            id,
            file_uri: article.file_uri,
            timestamp: Some(article.timestamp),
            sentiment: article.sentiment,
        }
    }
}
