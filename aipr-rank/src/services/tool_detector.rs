//! Tool mention detection for incoming articles

use aipr_common::models::Tool;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Terms shorter than this are too ambiguous to match on
const MIN_TERM_LEN: usize = 2;

struct ToolPattern {
    tool_id: String,
    pattern: Regex,
}

/// Matches tool names, slugs and aliases as whole words, ignoring case
pub struct ToolDetector {
    patterns: Vec<ToolPattern>,
}

impl ToolDetector {
    pub fn new(tools: &[Tool]) -> Self {
        let patterns = tools
            .iter()
            .filter_map(|tool| {
                let mut terms: Vec<String> = std::iter::once(tool.name.as_str())
                    .chain(std::iter::once(tool.slug.as_str()))
                    .chain(tool.aliases.iter().map(String::as_str))
                    .map(str::trim)
                    .filter(|t| t.chars().count() >= MIN_TERM_LEN)
                    .map(regex::escape)
                    .collect();
                if terms.is_empty() {
                    return None;
                }
                // Longest first so "claude code" is preferred over "claude"
                terms.sort_by(|a, b| b.len().cmp(&a.len()));
                terms.dedup();

                // No look-around in `regex`: consume the boundary character instead
                let source = format!(r"(?:^|\W)(?:{})(?:\W|$)", terms.join("|"));
                match RegexBuilder::new(&source).case_insensitive(true).build() {
                    Ok(pattern) => Some(ToolPattern {
                        tool_id: tool.id.clone(),
                        pattern,
                    }),
                    Err(e) => {
                        warn!(tool = %tool.slug, "Skipping tool in mention detection: {}", e);
                        None
                    }
                }
            })
            .collect();

        Self { patterns }
    }

    /// Ids of every tool mentioned in the title or content
    pub fn detect(&self, title: &str, content: &str) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|p| p.pattern.is_match(title) || p.pattern.is_match(content))
            .map(|p| p.tool_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::tool;

    fn detector() -> ToolDetector {
        let mut claude = tool("claude-code", "Claude Code");
        claude.aliases = vec!["Claude CLI".to_string()];
        let cursor = tool("cursor", "Cursor");
        let bolt = tool("bolt-new", "Bolt.new");
        ToolDetector::new(&[claude, cursor, bolt])
    }

    #[test]
    fn test_matches_name_case_insensitively() {
        let found = detector().detect("CURSOR ships agents", "");
        assert_eq!(found, vec!["cursor".to_string()]);
    }

    #[test]
    fn test_requires_word_boundaries() {
        let found = detector().detect("", "The cursorial bird runs fast. Precursor tools.");
        assert!(found.is_empty());
    }

    #[test]
    fn test_matches_alias_slug_and_punctuated_names() {
        let found = detector().detect(
            "Hands on with the Claude CLI",
            "We compared it with bolt.new and (cursor).",
        );
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let found = detector().detect("", "bolt-new");
        assert_eq!(found, vec!["bolt-new".to_string()]);
        let found = detector().detect("", "boltXnew");
        assert!(found.is_empty());
    }
}
