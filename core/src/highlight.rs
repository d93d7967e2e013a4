//! Marks prefix matches of a search term inside document content.

use regex::{Regex, RegexBuilder};

/// Markup used by [`Highlighter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Inserted before every match.
    pub open: String,
    /// Inserted after every match.
    pub close: String,
    /// Replacement for each `\n` in the content.
    pub line_break: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            open: r#"<span class="highlight">"#.to_string(),
            close: "</span>".to_string(),
            line_break: "<br>".to_string(),
        }
    }
}

impl HighlightConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap matches in `<tag>`/`</tag>`.
    pub fn tag(mut self, tag: &str) -> Self {
        self.open = format!("<{tag}>");
        self.close = format!("</{tag}>");
        self
    }

    pub fn line_break(mut self, line_break: &str) -> Self {
        self.line_break = line_break.to_string();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    config: HighlightConfig,
}

impl Highlighter {
    pub fn new(config: HighlightConfig) -> Self {
        Highlighter { config }
    }

    /// Wrap every case-insensitive occurrence of `term` plus the word
    /// characters following it, the same prefix semantics the index uses.
    /// An empty term only normalizes line breaks.
    pub fn highlight(&self, content: &str, term: &str) -> String {
        let marked = match prefix_pattern(term) {
            Some(re) => {
                let HighlightConfig { open, close, .. } = &self.config;
                re.replace_all(content, |caps: &regex::Captures| format!("{open}{}{close}", &caps[0]))
                    .into_owned()
            }
            None => content.to_string(),
        };
        marked.replace('\n', &self.config.line_break)
    }
}

/// Case-insensitive occurrences of `term` in `content`, the figure shown
/// next to each search result.
pub fn count_occurrences(content: &str, term: &str) -> usize {
    if term.is_empty() {
        return 0;
    }
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .map(|re| re.find_iter(content).count())
        .unwrap_or(0)
}

fn prefix_pattern(term: &str) -> Option<Regex> {
    if term.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"{}(?-u:\w)*", regex::escape(term)))
        .case_insensitive(true)
        .build()
        .ok()
}
