use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Terms must be longer than this many characters to be indexed.
pub const MIN_TERM_CHARS: usize = 3;

lazy_static! {
    // ASCII word characters only; anything else separates terms
    static ref WORD: Regex = Regex::new(r"(?-u:\w)+").expect("valid regex");
}

/// Tokenize text into index terms: lowercase, split on every non-word
/// character, drop tokens shorter than [`MIN_TERM_CHARS`].
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| is_term(token))
        .map(str::to_string)
        .collect()
}

/// Distinct terms of `text` with their in-text frequency, in order of first
/// appearance.
pub fn term_frequencies(text: &str) -> Vec<(String, u32)> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, u32)> = Vec::new();
    for term in tokenize(text) {
        match slots.get(&term) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(term.clone(), counts.len());
                counts.push((term, 1));
            }
        }
    }
    counts
}

/// Whitespace-delimited token count of raw text. Unlike [`tokenize`] this
/// keeps short words and punctuation; it is the figure shown next to a
/// document name.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn is_term(token: &str) -> bool {
    token.chars().count() >= MIN_TERM_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_short_tokens_and_punctuation() {
        assert_eq!(tokenize("Hi, a cat-nap!"), vec!["cat", "nap"]);
    }

    #[test]
    fn keeps_digits_and_underscores() {
        assert_eq!(tokenize("snake_case v2 2024"), vec!["snake_case", "2024"]);
    }

    #[test]
    fn non_ascii_letters_separate_terms() {
        assert_eq!(tokenize("é ça né café naïve"), vec!["caf"]);
        assert_eq!(tokenize("Überall straße"), vec!["berall", "stra"]);
    }

    #[test]
    fn frequencies_follow_first_appearance() {
        let freq = term_frequencies("the cat saw the other cat");
        assert_eq!(
            freq,
            vec![
                ("the".to_string(), 2),
                ("cat".to_string(), 2),
                ("saw".to_string(), 1),
                ("other".to_string(), 1),
            ]
        );
    }

    #[test]
    fn word_count_is_whitespace_based() {
        assert_eq!(count_words("  Hi, a cat-nap!\n\tok "), 4);
        assert_eq!(count_words(""), 0);
    }
}
