//! Offline inference adapters used when no model runtime is configured.

use super::{InferenceError, SummaryBounds, Summarizer, Translator};
use async_trait::async_trait;

/// Identity translator: returns each chunk unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str) -> Result<String, InferenceError> {
        Ok(text.to_string())
    }
}

/// Deterministic extractive summarizer bounded by a word budget.
///
/// Text shorter than `min_length` words is returned as is. Longer text keeps its leading
/// sentences until `max_length` words are used.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveSummarizer;

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, InferenceError> {
        Ok(build_extractive_summary(text, bounds))
    }
}

pub(crate) fn build_extractive_summary(text: &str, bounds: SummaryBounds) -> String {
    let text = text.trim();
    if count_words(text) < bounds.min_length {
        return text.to_string();
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut used_words = 0usize;
    for sentence in sentences(text) {
        let words = count_words(sentence);
        if words == 0 {
            continue;
        }
        if !kept.is_empty() && used_words + words > bounds.max_length {
            break;
        }
        used_words += words;
        kept.push(sentence);
        if used_words >= bounds.max_length {
            break;
        }
    }

    let summary = kept.join(" ");
    if count_words(&summary) > bounds.max_length {
        return truncate_words(&summary, bounds.max_length);
    }
    summary
}

/// Split after terminal punctuation, keeping the punctuation with its sentence.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_returned_unchanged() {
        let text = "A.\n\nB.\n\nC.";
        assert_eq!(
            build_extractive_summary(text, SummaryBounds::new(250, 100)),
            text
        );
    }

    #[test]
    fn long_text_keeps_leading_sentences_within_budget() {
        let text = "One two three. Four five six. Seven eight nine. Ten eleven.";
        let summary = build_extractive_summary(text, SummaryBounds::new(6, 2));
        assert_eq!(summary, "One two three. Four five six.");
    }

    #[test]
    fn oversized_first_sentence_is_truncated() {
        let text = "one two three four five six seven eight";
        let summary = build_extractive_summary(text, SummaryBounds::new(4, 1));
        assert_eq!(summary, "one two three four");
    }

    #[tokio::test]
    async fn passthrough_translator_is_identity() {
        let translated = PassthroughTranslator
            .translate("unchanged text")
            .await
            .expect("identity");
        assert_eq!(translated, "unchanged text");
    }
}
