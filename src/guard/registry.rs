//! Compiled detection rules.
//!
//! A [`PatternRegistry`] is built once at startup from an ordered list of
//! pattern strings. Every pattern is compiled case-insensitively; if any one
//! of them fails to compile the whole build fails, so a partially populated
//! registry can never be handed to the scanner.

use regex::{Regex, RegexBuilder};

use crate::error::{GuardError, Result};

/// Built-in SQL-injection signatures, in reporting order.
pub const DEFAULT_PATTERNS: &[&str] = &[
    // ;DELETE ...
    r";\s*delete\s",
    // ;DROP ...
    r";\s*drop\s",
    // ;UPDATE ...
    r";\s*update\s",
    // SQL line comment
    r"--",
    // ' OR 1=1
    r"'\s*or\s+1=1",
];

/// One compiled, case-insensitive pattern.
#[derive(Debug, Clone)]
pub struct DetectionRule {
    pattern: String,
    regex: Regex,
}

impl DetectionRule {
    fn compile(index: usize, pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| GuardError::InvalidPattern {
                index,
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text this rule was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True if the pattern occurs anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Immutable, ordered set of detection rules shared by every request.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    rules: Vec<DetectionRule>,
}

impl PatternRegistry {
    /// Compile `patterns` in order.
    ///
    /// Fails with [`GuardError::InvalidPattern`] on the first pattern that
    /// does not compile, and with [`GuardError::EmptyRegistry`] when no
    /// patterns are given.
    pub fn initialize<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .enumerate()
            .map(|(index, pattern)| DetectionRule::compile(index, pattern.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        if rules.is_empty() {
            return Err(GuardError::EmptyRegistry);
        }
        Ok(Self { rules })
    }

    /// Registry built from [`DEFAULT_PATTERNS`].
    pub fn with_defaults() -> Result<Self> {
        Self::initialize(DEFAULT_PATTERNS)
    }

    /// Rules in the order they were configured.
    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always false for a successfully initialized registry.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
