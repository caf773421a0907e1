//! Anchored allow-list matching for user identifiers.

use regex::Regex;

use crate::config::ConfigError;

/// A compiled allow-list pattern.
///
/// An identifier is allowed only when the pattern matches the whole string,
/// whether or not the configured pattern carries its own `^`/`$` anchors.
#[derive(Debug, Clone)]
pub struct AllowList {
    source: String,
    regex: Regex,
}

impl AllowList {
    /// Compile a pattern.
    ///
    /// The pattern is checked as written first, so wrapping it in an anchored
    /// group can never turn an invalid pattern into a valid one.
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let pattern_error = |source| ConfigError::Pattern {
            pattern: pattern.to_string(),
            source,
        };

        Regex::new(pattern).map_err(pattern_error)?;
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(pattern_error)?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if `user_id` is fully matched by the pattern.
    pub fn allows(&self, user_id: &str) -> bool {
        self.regex.is_match(user_id)
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
