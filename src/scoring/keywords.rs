//! Keyword extraction for semantic matching

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for",
        "of", "with", "by", "from", "as", "is", "was", "are", "were", "been",
        "be", "have", "has", "had", "do", "does", "did", "will", "would", "could",
        "should", "may", "might", "must", "shall", "can", "need", "needs",
        "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they",
        "what", "which", "who", "whom", "whose", "where", "when", "why", "how",
        "all", "each", "every", "both", "few", "more", "most", "other", "some", "such",
        "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very",
        "just", "also", "now", "any", "our", "your", "their", "its", "my",
    ]
    .into_iter()
    .collect();
}

/// Punctuation that separates words (underscore is not one of them,
/// so capability-style ids like `contract_review` survive intact)
const SEPARATORS: &str = ",.;:!?'\"()[]{}<>/\\|@#$%^&*+=~`-";

fn is_separator(c: char) -> bool {
    c.is_whitespace() || SEPARATORS.contains(c)
}

/// Lower-cased keywords longer than two characters, stop words removed,
/// de-duplicated in first-seen order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();

    lowered
        .split(is_separator)
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .filter(|w| seen.insert(*w))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords() {
        let kws = extract_keywords("We need a Website redesign, and website hosting!");
        assert_eq!(kws, vec!["website", "redesign", "hosting"]);
    }

    #[test]
    fn test_short_and_stop_words_dropped() {
        assert!(extract_keywords("it is an ox").is_empty());
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn test_punctuation_splits_but_underscore_does_not() {
        let kws = extract_keywords("contract_review/legal-advice (urgent)");
        assert_eq!(kws, vec!["contract_review", "legal", "advice", "urgent"]);
    }
}
