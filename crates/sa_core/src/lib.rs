pub mod auth;
pub mod classify;
pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use auth::{AdcTokenSource, StaticToken, TokenSource};
pub use classify::classify;
pub use error::Error;
pub use models::SentimentAnalyzer;
pub use storage::RecordStore;
pub use types::{
    AnalysisRequest, ArticleRecord, Label, NewArticle, RecordId, SentenceSentiment,
    SentimentResult, ARTICLE_KIND, DEFAULT_LANGUAGE_CODE,
};

pub type Result<T> = std::result::Result<T, Error>;
