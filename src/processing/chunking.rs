//! Length-bounded chunking for model inputs.
//!
//! Text is tokenized into atomic units (words or sentences) which are packed greedily into
//! chunks. A chunk is measured in characters as its units joined by single spaces and is closed
//! as soon as the next unit would push it past `max_length`. Sentence chunks also count the
//! separator that follows their last sentence, so `". "` boundaries stay inside the budget. Units are
//! never split: a unit longer than the budget becomes its own oversized chunk rather than being
//! cut mid-word.
//!
//! Joining the chunks with a single space reproduces the input up to whitespace normalization.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::types::ChunkingError;

const SENTENCE_BOUNDARY: &str = ". ";

/// Atomic unit used when packing chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Whitespace-delimited words. Robust for text without sentence punctuation.
    #[default]
    Words,
    /// Sentences delimited by `". "`.
    Sentences,
}

impl FromStr for SplitPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "words" | "word" => Ok(Self::Words),
            "sentences" | "sentence" => Ok(Self::Sentences),
            _ => Err(()),
        }
    }
}

/// Split `text` into ordered chunks of at most `max_length` characters.
///
/// Returns an empty vector for empty or whitespace-only input. A single unit longer than
/// `max_length` is emitted verbatim as its own chunk.
pub fn split_text(
    text: &str,
    max_length: usize,
    policy: SplitPolicy,
) -> Result<Vec<String>, ChunkingError> {
    if max_length == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunks = match policy {
        SplitPolicy::Words => pack_units(text.split_whitespace(), max_length, 0),
        SplitPolicy::Sentences => pack_units(sentence_units(text), max_length, 1),
    };
    Ok(chunks)
}

/// Sentence units with the period consumed by the `". "` delimiter restored.
fn sentence_units(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut segments = text.split(SENTENCE_BOUNDARY).peekable();
    std::iter::from_fn(move || {
        let segment = segments.next()?;
        let restored = if segments.peek().is_some() {
            format!("{}.", segment.trim())
        } else {
            segment.trim().to_string()
        };
        Some(restored)
    })
    .filter(|unit| !unit.is_empty() && unit != ".")
}

/// Greedy packer. `trailing` extra characters are charged after the last unit of a chunk.
fn pack_units<I, S>(units: I, max_length: usize, trailing: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for unit in units {
        let unit = unit.as_ref();
        let unit_len = unit.chars().count();
        if current_len > 0 && current_len + 1 + unit_len + trailing > max_length {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(unit);
        current_len += unit_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length(chunk: &str) -> usize {
        chunk.chars().count()
    }

    #[test]
    fn sentence_policy_splits_short_sentences() {
        let chunks = split_text("A. B. C.", 5, SplitPolicy::Sentences).expect("chunks");
        assert_eq!(chunks, vec!["A.", "B.", "C."]);
    }

    #[test]
    fn sentence_policy_packs_until_budget() {
        let text = "First one. Second one. Third one.";
        let chunks = split_text(text, 24, SplitPolicy::Sentences).expect("chunks");
        assert_eq!(chunks, vec!["First one. Second one.", "Third one."]);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn word_policy_respects_budget() {
        let text = "one two three four five";
        let chunks = split_text(text, 10, SplitPolicy::Words).expect("chunks");
        assert_eq!(chunks, vec!["one two", "three four", "five"]);
        for chunk in &chunks {
            assert!(length(chunk) <= 10);
        }
    }

    #[test]
    fn word_chunk_may_fill_the_budget_exactly() {
        let chunks = split_text("ab cd", 5, SplitPolicy::Words).expect("chunks");
        assert_eq!(chunks, vec!["ab cd"]);

        let chunks = split_text("ab cd ef", 5, SplitPolicy::Words).expect("chunks");
        assert_eq!(chunks, vec!["ab cd", "ef"]);
    }

    #[test]
    fn empty_and_blank_input_yield_no_chunks() {
        assert!(split_text("", 8, SplitPolicy::Words).expect("ok").is_empty());
        assert!(
            split_text("  \n\t ", 8, SplitPolicy::Sentences)
                .expect("ok")
                .is_empty()
        );
    }

    #[test]
    fn oversized_unit_is_emitted_whole() {
        let chunks =
            split_text("hi supercalifragilistic yo", 6, SplitPolicy::Words).expect("chunks");
        assert_eq!(chunks, vec!["hi", "supercalifragilistic", "yo"]);
    }

    #[test]
    fn zero_budget_is_rejected() {
        let error = split_text("text", 0, SplitPolicy::Words).expect_err("invalid");
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn length_is_counted_in_characters() {
        let chunks = split_text("žluťoučký kůň úpěl", 10, SplitPolicy::Words).expect("chunks");
        assert_eq!(chunks, vec!["žluťoučký", "kůň úpěl"]);
    }

    #[test]
    fn chunks_stay_bounded_and_reconstruct_words() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\nSed do eiusmod \
                    tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
                    quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo.";
        for max_length in [1, 7, 16, 40, 1024] {
            for policy in [SplitPolicy::Words, SplitPolicy::Sentences] {
                let chunks = split_text(text, max_length, policy).expect("chunks");
                for chunk in &chunks {
                    let single_unit = match policy {
                        SplitPolicy::Words => !chunk.contains(char::is_whitespace),
                        SplitPolicy::Sentences => !chunk.contains(SENTENCE_BOUNDARY),
                    };
                    assert!(length(chunk) <= max_length || single_unit, "{chunk:?}");
                }
                let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
                let original: Vec<&str> = text.split_whitespace().collect();
                assert_eq!(rebuilt, original);
            }
        }
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("Sentences".parse(), Ok(SplitPolicy::Sentences));
        assert_eq!("words".parse(), Ok(SplitPolicy::Words));
        assert!("paragraphs".parse::<SplitPolicy>().is_err());
    }
}
