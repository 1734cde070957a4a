//! Metrics: folding occurrence maps into running totals
//!
//! The aggregate is stored as JSON under the metrics key using the camelCase
//! layout the popup reads. Every write also stamps the last-updated key with
//! an RFC 3339 timestamp.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::store::KeyValueStore;

use super::config::CensorConfig;
use super::error::CensorError;
use super::occurrences::OccurrenceMap;

// =============================================================================
// Types
// =============================================================================

/// What produced a batch of replacements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Full-document pass; counts as one processed page
    PageLoad,
    /// Incremental mutation batch; never counts as a page
    Mutation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordContext {
    pub url: String,
    pub elapsed_ms: f64,
    pub pass: PassKind,
}

/// Aggregate counters for the page's lifetime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default)]
    pub total_replacements: u64,
    #[serde(default)]
    pub words_replaced: HashMap<String, u64>,
    #[serde(default)]
    pub pages_processed: u64,
    #[serde(default)]
    pub last_processed_url: String,
    /// Duration of the last recorded pass (last write wins)
    #[serde(default, rename = "processingTime")]
    pub processing_time_ms: f64,
}

impl Metrics {
    /// Fold one invocation's occurrences into the aggregate
    pub fn fold(&mut self, occurrences: &OccurrenceMap, context: &RecordContext) {
        self.total_replacements += occurrences.total();
        if context.pass == PassKind::PageLoad {
            self.pages_processed += 1;
        }
        self.last_processed_url = context.url.clone();
        self.processing_time_ms = context.elapsed_ms;

        for (word, count) in occurrences.iter() {
            *self.words_replaced.entry(word.to_string()).or_insert(0) += count;
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary::from(self)
    }
}

// =============================================================================
// Summary (display surface)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// Read-side view of [`Metrics`] for the popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_words: u64,
    pub unique_words: usize,
    pub pages_processed: u64,
    pub last_processed_url: String,
    /// Highest count; ties go to the alphabetically first word
    pub most_blocked: Option<WordCount>,
    /// Every word, highest count first
    pub ranked: Vec<WordCount>,
}

impl From<&Metrics> for MetricsSummary {
    fn from(metrics: &Metrics) -> Self {
        let mut ranked: Vec<WordCount> = metrics
            .words_replaced
            .iter()
            .map(|(word, count)| WordCount {
                word: word.clone(),
                count: *count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));

        Self {
            total_words: metrics.total_replacements,
            unique_words: metrics.words_replaced.len(),
            pages_processed: metrics.pages_processed,
            last_processed_url: metrics.last_processed_url.clone(),
            most_blocked: ranked.first().cloned(),
            ranked,
        }
    }
}

// =============================================================================
// MetricsSink
// =============================================================================

/// Receives one merged occurrence map per page pass or mutation batch
pub trait MetricsSink {
    fn record(
        &mut self,
        occurrences: &OccurrenceMap,
        context: &RecordContext,
    ) -> Result<(), CensorError>;
}

/// Read-modify-write sink over a [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct StoreSink<S: KeyValueStore> {
    store: S,
    metrics_key: String,
    last_updated_key: String,
}

impl<S: KeyValueStore> StoreSink<S> {
    pub fn new(store: S, config: &CensorConfig) -> Self {
        Self {
            store,
            metrics_key: config.metrics_key.clone(),
            last_updated_key: config.last_updated_key.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Current aggregate; zeroed when nothing is stored yet
    pub fn load(&self) -> Result<Metrics, CensorError> {
        match self.store.get(&self.metrics_key)? {
            Some(Value::Null) | None => Ok(Metrics::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Write a zeroed aggregate if none exists. Returns true if it wrote.
    pub fn ensure_initialized(&mut self) -> Result<bool, CensorError> {
        if self.store.get(&self.metrics_key)?.is_some() {
            return Ok(false);
        }
        self.store
            .set(&self.metrics_key, serde_json::to_value(Metrics::default())?)?;
        Ok(true)
    }
}

impl<S: KeyValueStore> MetricsSink for StoreSink<S> {
    fn record(
        &mut self,
        occurrences: &OccurrenceMap,
        context: &RecordContext,
    ) -> Result<(), CensorError> {
        let mut metrics = self.load()?;
        metrics.fold(occurrences, context);

        self.store
            .set(&self.metrics_key, serde_json::to_value(&metrics)?)?;
        self.store
            .set(&self.last_updated_key, Value::String(Utc::now().to_rfc3339()))?;

        debug!(
            total = metrics.total_replacements,
            pages = metrics.pages_processed,
            "[Metrics] aggregate updated"
        );
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx(pass: PassKind) -> RecordContext {
        RecordContext {
            url: "https://example.com/careers".into(),
            elapsed_ms: 4.5,
            pass,
        }
    }

    #[test]
    fn test_fold_adds_to_prior_aggregate() {
        let mut metrics = Metrics {
            total_replacements: 5,
            words_replaced: HashMap::from([("job".to_string(), 5)]),
            ..Default::default()
        };
        let occ: OccurrenceMap = [("job", 2), ("salary", 1)].into_iter().collect();
        metrics.fold(&occ, &ctx(PassKind::Mutation));

        assert_eq!(metrics.total_replacements, 8);
        assert_eq!(
            metrics.words_replaced,
            HashMap::from([("job".to_string(), 7), ("salary".to_string(), 1)])
        );
    }

    #[test]
    fn test_only_page_loads_count_as_pages() {
        let mut metrics = Metrics::default();
        let occ: OccurrenceMap = [("job", 1)].into_iter().collect();

        metrics.fold(&occ, &ctx(PassKind::PageLoad));
        metrics.fold(&occ, &ctx(PassKind::Mutation));
        metrics.fold(&occ, &ctx(PassKind::Mutation));

        assert_eq!(metrics.pages_processed, 1);
        assert_eq!(metrics.total_replacements, 3);
    }

    #[test]
    fn test_url_and_time_are_last_write() {
        let mut metrics = Metrics::default();
        let occ = OccurrenceMap::new();
        metrics.fold(&occ, &ctx(PassKind::PageLoad));
        metrics.fold(
            &occ,
            &RecordContext {
                url: "https://other.test/".into(),
                elapsed_ms: 1.0,
                pass: PassKind::Mutation,
            },
        );
        assert_eq!(metrics.last_processed_url, "https://other.test/");
        assert_eq!(metrics.processing_time_ms, 1.0);
    }

    #[test]
    fn test_stored_layout_matches_popup() {
        let metrics = Metrics {
            total_replacements: 3,
            words_replaced: HashMap::from([("job".to_string(), 3)]),
            pages_processed: 1,
            last_processed_url: "u".into(),
            processing_time_ms: 2.0,
        };
        assert_eq!(
            serde_json::to_value(&metrics).unwrap(),
            json!({
                "totalReplacements": 3,
                "wordsReplaced": {"job": 3},
                "pagesProcessed": 1,
                "lastProcessedUrl": "u",
                "processingTime": 2.0
            })
        );
    }

    #[test]
    fn test_sink_records_and_stamps() {
        let store = MemoryStore::new();
        let config = CensorConfig::default();
        let mut sink = StoreSink::new(store.clone(), &config);

        let occ: OccurrenceMap = [("job", 2)].into_iter().collect();
        sink.record(&occ, &ctx(PassKind::PageLoad)).unwrap();
        sink.record(&occ, &ctx(PassKind::Mutation)).unwrap();

        let metrics = sink.load().unwrap();
        assert_eq!(metrics.total_replacements, 4);
        assert_eq!(metrics.pages_processed, 1);

        let stamp = store.get(&config.last_updated_key).unwrap().unwrap();
        let stamp = stamp.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_sink_propagates_store_failure() {
        let store = MemoryStore::new();
        let mut sink = StoreSink::new(store.clone(), &CensorConfig::default());
        store.fail_writes(true);

        let occ: OccurrenceMap = [("job", 1)].into_iter().collect();
        assert!(matches!(
            sink.record(&occ, &ctx(PassKind::PageLoad)),
            Err(CensorError::Store(_))
        ));
    }

    #[test]
    fn test_ensure_initialized_writes_once() {
        let store = MemoryStore::new();
        let mut sink = StoreSink::new(store.clone(), &CensorConfig::default());
        assert!(sink.ensure_initialized().unwrap());
        assert!(!sink.ensure_initialized().unwrap());
        assert_eq!(sink.load().unwrap(), Metrics::default());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_load_tolerates_partial_records() {
        let mut store = MemoryStore::new();
        let config = CensorConfig::default();
        store
            .set(&config.metrics_key, json!({"totalReplacements": 9}))
            .unwrap();
        let sink = StoreSink::new(store, &config);
        let metrics = sink.load().unwrap();
        assert_eq!(metrics.total_replacements, 9);
        assert!(metrics.words_replaced.is_empty());
    }

    #[test]
    fn test_summary_ranks_words() {
        let metrics = Metrics {
            total_replacements: 9,
            words_replaced: HashMap::from([
                ("salary".to_string(), 2),
                ("job".to_string(), 5),
                ("career".to_string(), 2),
            ]),
            pages_processed: 3,
            ..Default::default()
        };
        let summary = metrics.summary();

        assert_eq!(summary.total_words, 9);
        assert_eq!(summary.unique_words, 3);
        assert_eq!(
            summary.most_blocked,
            Some(WordCount {
                word: "job".into(),
                count: 5
            })
        );
        let order: Vec<&str> = summary.ranked.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(order, vec!["job", "career", "salary"]);
    }

    #[test]
    fn test_summary_of_empty_metrics() {
        let summary = Metrics::default().summary();
        assert_eq!(summary.most_blocked, None);
        assert!(summary.ranked.is_empty());
    }
}
