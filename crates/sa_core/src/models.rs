use async_trait::async_trait;
use crate::types::SentimentResult;
use crate::Result;

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Analyze content held by an external content store, e.g. `gs://bucket/file.txt`.
    ///
    /// Only the document-level score and magnitude are returned; per-sentence
    /// data is dropped.
    async fn analyze(&self, source_reference: &str, language_code: &str) -> Result<SentimentResult>;

    /// Analyze text supplied directly. Not used by the HTTP surface.
    async fn analyze_inline(&self, text: &str) -> Result<SentimentResult>;
}
