//! Inclusion pattern matching for archive entries

use crate::error::ExtractError;

/// A compiled set of inclusion patterns
///
/// An empty set matches everything. `**` alone matches everything, and a
/// trailing `/**` matches every entry under that directory prefix; anything
/// else is an ordinary glob matched against the full entry name.
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug)]
enum CompiledPattern {
    All,
    Prefix(String),
    Glob(glob::Pattern),
}

impl PatternSet {
    /// Compile the raw pattern strings, rejecting malformed globs
    pub fn compile(raw: &[String]) -> Result<Self, ExtractError> {
        let mut patterns = Vec::with_capacity(raw.len());

        for pattern in raw {
            let trimmed = pattern.trim().trim_start_matches("./");
            if trimmed.is_empty() {
                continue;
            }

            if trimmed == "**" || trimmed == "*" {
                patterns.push(CompiledPattern::All);
            } else if let Some(prefix) = trimmed.strip_suffix("/**") {
                patterns.push(CompiledPattern::Prefix(format!("{prefix}/")));
            } else {
                let compiled =
                    glob::Pattern::new(trimmed).map_err(|e| ExtractError::InvalidPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
                patterns.push(CompiledPattern::Glob(compiled));
            }
        }

        Ok(Self { patterns })
    }

    /// Whether a (normalized, forward-slash) entry name is included
    pub fn matches(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        self.patterns.iter().any(|p| match p {
            CompiledPattern::All => true,
            CompiledPattern::Prefix(prefix) => name.starts_with(prefix),
            CompiledPattern::Glob(pattern) => pattern.matches_with(
                name,
                glob::MatchOptions {
                    require_literal_separator: false,
                    ..Default::default()
                },
            ),
        })
    }
}
