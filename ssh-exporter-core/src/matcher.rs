use regex::Regex;
use tracing::warn;

use crate::error::InvalidPattern;

/// A pattern compiled once and tested against script names or script output.
///
/// Matching is unanchored: `foo` matches `xfooy`.
#[derive(Debug, Clone)]
pub struct Matcher {
    source: String,
    regex: Option<Regex>,
}

impl Matcher {
    pub fn compile(pattern: &str) -> Result<Self, InvalidPattern> {
        let regex = Regex::new(pattern).map_err(|source| InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { source: pattern.to_string(), regex: Some(regex) })
    }

    /// A matcher that rejects everything.
    pub fn never(pattern: &str) -> Self {
        Self { source: pattern.to_string(), regex: None }
    }

    /// Compiles `pattern`, logging and degrading to [`Matcher::never`] on error.
    pub fn compile_or_never(pattern: &str) -> Self {
        Self::compile(pattern).unwrap_or_else(|err| {
            warn!(error = %err, "pattern will never match");
            Self::never(pattern)
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanchored_match() {
        let m = Matcher::compile("foo").unwrap();
        assert!(m.is_match("xfooy"));
        assert!(!m.is_match("bar"));
        assert_eq!(m.as_str(), "foo");
    }

    #[test]
    fn test_name_filter() {
        let m = Matcher::compile(".*logs").unwrap();
        assert!(m.is_match("chef_logs"));
        assert!(!m.is_match("proc_status"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Matcher::compile("(unclosed").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let m = Matcher::compile_or_never("(unclosed");
        assert!(!m.is_match(""));
        assert!(!m.is_match("(unclosed"));
        assert_eq!(m.as_str(), "(unclosed");
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let m = Matcher::compile("").unwrap();
        assert!(m.is_match(""));
        assert!(m.is_match("anything"));
    }
}
