use async_trait::async_trait;
use sa_core::{Result, SentenceSentiment, SentimentAnalyzer, SentimentResult};
use std::fmt;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "happy", "love", "positive", "wonderful", "best", "enjoy",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "sad", "hate", "negative", "worst", "poor", "angry",
];

/// Offline analyzer that scores text by counting polarity keywords.
///
/// By-reference analysis has no content store to read from, so the reference
/// string itself is scored.
pub struct DummyModel;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    fn score_text(text: &str) -> (f32, f32) {
        let mut positive = 0u32;
        let mut negative = 0u32;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if POSITIVE_WORDS.contains(&word.as_str()) {
                positive += 1;
            } else if NEGATIVE_WORDS.contains(&word.as_str()) {
                negative += 1;
            }
        }

        let hits = positive + negative;
        if hits == 0 {
            return (0.0, 0.0);
        }
        let score = (positive as f32 - negative as f32) / hits as f32;
        let magnitude = hits as f32 * 0.5;
        (score, magnitude)
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

#[async_trait]
impl SentimentAnalyzer for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn analyze(&self, source_reference: &str, language_code: &str) -> Result<SentimentResult> {
        let (score, magnitude) = Self::score_text(source_reference);
        Ok(SentimentResult {
            source: source_reference.to_string(),
            score,
            magnitude,
            language: Some(language_code.to_string()),
            sentences: Vec::new(),
        })
    }

    async fn analyze_inline(&self, text: &str) -> Result<SentimentResult> {
        let sentences = text
            .split_inclusive(|c: char| c == '.' || c == '!' || c == '?')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|sentence| {
                let (score, magnitude) = Self::score_text(sentence);
                SentenceSentiment {
                    text: sentence.to_string(),
                    score,
                    magnitude,
                }
            })
            .collect();

        let (score, magnitude) = Self::score_text(text);
        Ok(SentimentResult {
            source: text.to_string(),
            score,
            magnitude,
            language: None,
            sentences,
        })
    }
}
