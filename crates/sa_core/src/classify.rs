use crate::types::Label;

/// Map a document sentiment score to its label.
///
/// Zero (either sign) is neutral. A NaN score cannot be ordered and keeps the
/// `Unknown` sentinel.
pub fn classify(score: f32) -> Label {
    let mut label = Label::default();
    if score > 0.0 {
        label = Label::Positive;
    } else if score < 0.0 {
        label = Label::Negative;
    } else if score == 0.0 {
        label = Label::Neutral;
    }
    label
}
