use async_trait::async_trait;
use crate::types::{ArticleRecord, NewArticle};
use crate::Result;

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;

    /// Every stored record, in whatever order the store returns them.
    async fn list_all(&self) -> Result<Vec<ArticleRecord>>;

    /// Persist a new record. The store assigns the id; duplicate sources are allowed.
    async fn save(&self, article: NewArticle) -> Result<ArticleRecord>;
}
