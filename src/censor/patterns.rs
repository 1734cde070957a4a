//! PatternTable - ordered word substitutions via Regex
//!
//! Patterns are compiled once, case-insensitively with ASCII word
//! boundaries, and applied in table order. Each pass only scans text that no
//! earlier pattern has censored, so the first pattern to claim a word wins
//! and replacement literals are never rematched.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use super::config::{CensorConfig, PatternSpec};
use super::error::CensorError;
use super::fragment::{Fragment, Piece};
use super::occurrences::OccurrenceMap;

// ==================== TYPE DEFINITIONS ====================

/// A compiled (matcher, replacement) pair
#[derive(Debug, Clone)]
pub struct CensorPattern {
    matcher: Regex,
    replacement: String,
}

impl CensorPattern {
    pub fn compile(spec: &PatternSpec) -> Result<Self, CensorError> {
        if spec.replacement.is_empty() {
            return Err(CensorError::EmptyReplacement(spec.pattern.clone()));
        }
        // ASCII classes first, so `\b` and `\w` treat accented and CJK
        // letters as non-word characters. Patterns that need Unicode mode
        // (e.g. `.` or negated classes) fall back to it.
        let matcher = match build(&spec.pattern, false) {
            Ok(matcher) => matcher,
            Err(_) => build(&spec.pattern, true).map_err(|source| {
                CensorError::InvalidPattern {
                    pattern: spec.pattern.clone(),
                    source,
                }
            })?,
        };
        Ok(Self {
            matcher,
            replacement: spec.replacement.clone(),
        })
    }

    pub fn source(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Split one uncensored run into pieces, recording every match
    fn split_into(&self, text: String, out: &mut Vec<Piece>, occurrences: &mut OccurrenceMap) {
        let mut last = 0;
        for m in self.matcher.find_iter(&text) {
            if m.as_str().is_empty() {
                continue;
            }
            if m.start() > last {
                out.push(Piece::Text(text[last..m.start()].to_string()));
            }
            occurrences.record(m.as_str());
            out.push(Piece::Censored(self.replacement.clone()));
            last = m.end();
        }

        if last == 0 {
            out.push(Piece::Text(text));
        } else if last < text.len() {
            out.push(Piece::Text(text[last..].to_string()));
        }
    }
}

fn build(pattern: &str, unicode: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(unicode)
        .build()
}

/// Lower-cased tag names whose descendant text is never visited
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet(HashSet<String>);

impl ExclusionSet {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(tags.into_iter().map(|t| t.as_ref().to_ascii_lowercase()).collect())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&tag.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of [`PatternTable::apply`]
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub fragment: Fragment,
    pub occurrences: OccurrenceMap,
}

impl Rewrite {
    pub fn is_unchanged(&self) -> bool {
        self.fragment.is_unchanged()
    }
}

// ==================== MAIN IMPLEMENTATION ====================

#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: Vec<CensorPattern>,
    exclusions: ExclusionSet,
}

impl Default for PatternTable {
    fn default() -> Self {
        // Built-in patterns always compile
        Self::from_config(&CensorConfig::default()).unwrap_or_else(|_| Self {
            patterns: Vec::new(),
            exclusions: ExclusionSet::default(),
        })
    }
}

impl PatternTable {
    /// Compile every pattern, failing on the first invalid one
    pub fn new(specs: &[PatternSpec], skip_elements: &[String]) -> Result<Self, CensorError> {
        let patterns = specs
            .iter()
            .map(CensorPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            exclusions: ExclusionSet::new(skip_elements),
        })
    }

    pub fn from_config(config: &CensorConfig) -> Result<Self, CensorError> {
        Self::new(&config.patterns, &config.skip_elements)
    }

    /// Apply all patterns in order to `text`
    pub fn apply(&self, text: &str) -> Rewrite {
        let mut fragment = Fragment::plain(text);
        let mut occurrences = OccurrenceMap::new();

        for pattern in &self.patterns {
            let pieces = std::mem::take(fragment.pieces_mut());
            let mut next = Vec::with_capacity(pieces.len());
            for piece in pieces {
                match piece {
                    Piece::Text(s) => pattern.split_into(s, &mut next, &mut occurrences),
                    censored @ Piece::Censored(_) => next.push(censored),
                }
            }
            *fragment.pieces_mut() = next;
        }

        Rewrite {
            fragment,
            occurrences,
        }
    }

    /// Is `tag` in the exclusion set?
    pub fn is_excluded(&self, tag: &str) -> bool {
        self.exclusions.contains(tag)
    }

    pub fn patterns(&self) -> &[CensorPattern] {
        &self.patterns
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// ==================== TESTS ====================
