//! Role name pattern matching
//!
//! Rule patterns come in three forms:
//!
//! 1. **Literal** - exact string equality (`"dev-infra"`)
//! 2. **Glob** - `*` matches any substring (`"dev-*"`)
//! 3. **Regex** - anchored regular expression (`"^dev-(infra|db)$"`)
//!
//! A pattern is treated as a regular expression when it carries an explicit
//! `^` or `$` anchor, as a glob when it contains `*`, and as a literal
//! otherwise. Matchers are immutable and reusable across calls.

use crate::error::{AccessError, Result};
use regex::Regex;

/// Compiled role name matcher
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact string comparison
    Literal(String),
    /// Compiled glob or regular expression, always fully anchored
    Expression(Regex),
}

impl Matcher {
    /// Compile a rule pattern into a matcher
    ///
    /// # Errors
    ///
    /// Returns `BadParameter` if the pattern is a malformed regular
    /// expression.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.starts_with('^') || pattern.ends_with('$') {
            let expr = format!(
                "^{}$",
                pattern.trim_start_matches('^').trim_end_matches('$')
            );
            let re = Regex::new(&expr).map_err(|e| {
                AccessError::bad_parameter(format!("invalid role pattern {:?}: {}", pattern, e))
            })?;
            return Ok(Self::Expression(re));
        }

        if pattern.contains('*') {
            let expr: String = pattern
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            let re = Regex::new(&format!("^{}$", expr)).map_err(|e| {
                AccessError::bad_parameter(format!("invalid role pattern {:?}: {}", pattern, e))
            })?;
            return Ok(Self::Expression(re));
        }

        Ok(Self::Literal(pattern.to_string()))
    }

    /// Check whether a role name matches this pattern
    pub fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == name,
            Self::Expression(re) => re.is_match(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let m = Matcher::new("dev-infra").unwrap();
        assert!(m.is_match("dev-infra"));
        assert!(!m.is_match("dev-infra2"));
        assert!(!m.is_match("dev"));
    }

    #[test]
    fn test_glob_match() {
        let m = Matcher::new("dev-*").unwrap();
        assert!(m.is_match("dev-infra"));
        assert!(m.is_match("dev-"));
        assert!(!m.is_match("prod-infra"));
        // Glob is anchored at both ends
        assert!(!m.is_match("my-dev-infra"));
    }

    #[test]
    fn test_bare_wildcard_matches_everything() {
        let m = Matcher::new("*").unwrap();
        assert!(m.is_match("anything"));
        assert!(m.is_match(""));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let m = Matcher::new("team.*").unwrap();
        assert!(m.is_match("team.infra"));
        assert!(!m.is_match("teamXinfra"));
    }

    #[test]
    fn test_regex_match_is_anchored() {
        let m = Matcher::new("^dev-(infra|db)$").unwrap();
        assert!(m.is_match("dev-infra"));
        assert!(m.is_match("dev-db"));
        assert!(!m.is_match("dev-web"));
        assert!(!m.is_match("xdev-infra"));

        // Missing anchors are supplied during compilation
        let m = Matcher::new("^dev-.+").unwrap();
        assert!(m.is_match("dev-infra"));
        assert!(!m.is_match("a dev-infra"));
    }

    #[test]
    fn test_malformed_regex_is_rejected() {
        let err = Matcher::new("^dev-(infra$").unwrap_err();
        assert!(err.is_bad_parameter());
    }
}
