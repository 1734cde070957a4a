//! OccurrenceMap: per-invocation tally of matched words

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lower-cased matched word -> number of replacements.
///
/// Produced fresh for every rewrite invocation (one segment, one page pass,
/// one mutation batch) and merged upwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccurrenceMap(HashMap<String, u64>);

impl OccurrenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `word` (stored lower-cased)
    pub fn record(&mut self, word: &str) {
        self.add(&word.to_lowercase(), 1);
    }

    fn add(&mut self, word: &str, count: u64) {
        *self.0.entry(word.to_string()).or_insert(0) += count;
    }

    /// Fold another map into this one
    pub fn merge(&mut self, other: &OccurrenceMap) {
        for (word, count) in &other.0 {
            self.add(word, *count);
        }
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn get(&self, word: &str) -> u64 {
        self.0.get(word).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(w, c)| (w.as_str(), *c))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for OccurrenceMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (word, count) in iter {
            map.add(&word.into(), count);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lowercases() {
        let mut map = OccurrenceMap::new();
        map.record("Job");
        map.record("JOB");
        map.record("job");
        assert_eq!(map.get("job"), 3);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut a: OccurrenceMap = [("job", 2)].into_iter().collect();
        let b: OccurrenceMap = [("job", 1), ("salary", 4)].into_iter().collect();
        a.merge(&b);

        assert_eq!(a.get("job"), 3);
        assert_eq!(a.get("salary"), 4);
        assert_eq!(a.total(), 7);
    }

    #[test]
    fn test_empty_map() {
        let map = OccurrenceMap::new();
        assert!(map.is_empty());
        assert_eq!(map.total(), 0);
        assert_eq!(map.get("anything"), 0);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let map: OccurrenceMap = [("job", 2)].into_iter().collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"job":2}"#);
    }
}
