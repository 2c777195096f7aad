use async_trait::async_trait;
use sa_core::{ArticleRecord, NewArticle, RecordId, RecordStore, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct MemoryStore {
    next_id: u64,
    records: Vec<ArticleRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }

    pub fn insert(&mut self, article: NewArticle) -> ArticleRecord {
        let id = RecordId::from(self.next_id);
        self.next_id += 1;
        let record = ArticleRecord::from_new(id, article);
        self.records.push(record.clone());
        record
    }

    pub fn all(&self) -> Vec<ArticleRecord> {
        self.records.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-local record store. Contents are lost on restart.
#[derive(Clone)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_all(&self) -> Result<Vec<ArticleRecord>> {
        let store = self.store.read().await;
        Ok(store.all())
    }

    async fn save(&self, article: NewArticle) -> Result<ArticleRecord> {
        let mut store = self.store.write().await;
        Ok(store.insert(article))
    }
}
