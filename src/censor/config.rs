//! Configuration types and defaults for the censoring engine
//!
//! Every field has a serde default, so a host may pass `{}` (or nothing) and
//! override only what it needs.

use serde::{Deserialize, Serialize};

/// Storage key of the enable toggle
pub const PROTECTION_KEY: &str = "job_censor_protection_enabled";
/// Storage key of the aggregated metrics
pub const METRICS_KEY: &str = "job_censor_metrics";
/// Storage key of the last metrics write timestamp
pub const LAST_UPDATED_KEY: &str = "job_censor_last_updated";

/// Class carried by every generated container
pub const PROCESSED_CLASS: &str = "job-censor-processed";
/// Class carried by each censored word
pub const CENSORED_CLASS: &str = "job-censor-anim";
/// Id of the injected stylesheet
pub const STYLE_ID: &str = "job-censor-anim-style";

const CENSORED_CSS: &str = r#"
.job-censor-anim {
  display: inline-block;
  background: linear-gradient(90deg, #a855f7 0%, #38bdf8 100%);
  color: transparent;
  background-clip: text;
  -webkit-background-clip: text;
  animation: job-censor-shimmer 1.5s infinite linear;
  border-radius: 4px;
  position: relative;
}
@keyframes job-censor-shimmer {
  0% { filter: brightness(1.2) drop-shadow(0 0 2px #a855f7); }
  50% { filter: brightness(2) drop-shadow(0 0 8px #38bdf8); }
  100% { filter: brightness(1.2) drop-shadow(0 0 2px #a855f7); }
}
"#;

// =============================================================================
// PatternSpec
// =============================================================================

/// One (matcher, replacement) pair as written in configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PatternSpec {
    /// Regex source, compiled case-insensitively
    pub pattern: String,
    /// Literal inserted for every match
    pub replacement: String,
}

impl PatternSpec {
    pub fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }

    /// Word-bounded alternation over `words`
    pub fn words(words: &[&str], replacement: &str) -> Self {
        Self::new(&format!(r"\b({})\b", words.join("|")), replacement)
    }
}

// =============================================================================
// CensorConfig
// =============================================================================

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CensorConfig {
    /// Applied in order; the first pattern to match a word wins
    #[serde(default = "default_patterns")]
    pub patterns: Vec<PatternSpec>,
    /// Tags whose descendant text is never touched
    #[serde(default = "default_skip_elements")]
    pub skip_elements: Vec<String>,
    #[serde(default = "default_processed_class")]
    pub processed_class: String,
    #[serde(default = "default_censored_class")]
    pub censored_class: String,
    #[serde(default = "default_style_id")]
    pub style_id: String,
    #[serde(default = "default_style_css")]
    pub style_css: String,
    #[serde(default = "default_protection_key")]
    pub protection_key: String,
    #[serde(default = "default_metrics_key")]
    pub metrics_key: String,
    #[serde(default = "default_last_updated_key")]
    pub last_updated_key: String,
}

fn default_patterns() -> Vec<PatternSpec> {
    vec![
        PatternSpec::new(r"\b(jobs?|employment|work)\b", "j*b"),
        PatternSpec::new(
            r"\b(applications?|applicants?|hiring|recruitment)\b",
            "appl*c*nt",
        ),
        PatternSpec::new(r"\b(career|cv|resume|position|role)\b", "c*r**r"),
        PatternSpec::new(r"\b(interview|interviewing|interviews)\b", "int*rv*w"),
        PatternSpec::new(r"\b(salary|compensation|pay|wage)\b", "s*l*ry"),
        PatternSpec::new(
            r"\b(company|employer|organization|corporation)\b",
            "c*mp*ny",
        ),
    ]
}

fn default_skip_elements() -> Vec<String> {
    [
        "script", "style", "code", "pre", "select", "option", "meta", "link", "noscript",
        "iframe",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_processed_class() -> String { PROCESSED_CLASS.to_string() }
fn default_censored_class() -> String { CENSORED_CLASS.to_string() }
fn default_style_id() -> String { STYLE_ID.to_string() }
fn default_style_css() -> String { CENSORED_CSS.to_string() }
fn default_protection_key() -> String { PROTECTION_KEY.to_string() }
fn default_metrics_key() -> String { METRICS_KEY.to_string() }
fn default_last_updated_key() -> String { LAST_UPDATED_KEY.to_string() }

impl Default for CensorConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            skip_elements: default_skip_elements(),
            processed_class: default_processed_class(),
            censored_class: default_censored_class(),
            style_id: default_style_id(),
            style_css: default_style_css(),
            protection_key: default_protection_key(),
            metrics_key: default_metrics_key(),
            last_updated_key: default_last_updated_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CensorConfig::default();
        assert_eq!(config.patterns.len(), 6);
        assert_eq!(config.patterns[0].replacement, "j*b");
        assert!(config.skip_elements.iter().any(|t| t == "script"));
        assert_eq!(config.processed_class, PROCESSED_CLASS);
        assert_eq!(config.protection_key, PROTECTION_KEY);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: CensorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.patterns, CensorConfig::default().patterns);
        assert_eq!(config.style_id, STYLE_ID);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{"patterns": [{"pattern": "\\bboss\\b", "replacement": "b*ss"}], "skip_elements": ["textarea"]}"#;
        let config: CensorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.patterns, vec![PatternSpec::new(r"\bboss\b", "b*ss")]);
        assert_eq!(config.skip_elements, vec!["textarea".to_string()]);
        assert_eq!(config.metrics_key, METRICS_KEY);
    }

    #[test]
    fn test_words_helper_builds_bounded_alternation() {
        let spec = PatternSpec::words(&["boss", "manager"], "b*ss");
        assert_eq!(spec.pattern, r"\b(boss|manager)\b");
    }
}
