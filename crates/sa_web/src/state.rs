use std::sync::Arc;
use sa_core::{RecordStore, SentimentAnalyzer};

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn SentimentAnalyzer>,
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn SentimentAnalyzer>, store: Arc<dyn RecordStore>) -> Self {
        Self { analyzer, store }
    }
}
