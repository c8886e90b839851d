// core/src/resolver.rs
//
// Candidate resolution: phonetic input -> bounded, deduplicated candidate list,
// backed by a bounded cache in front of an external completion service.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::cache::{BoundedCache, EvictionPolicy};
use crate::candidate::{CandidateList, Direction};
use crate::service::CompletionService;
use crate::{utils, Config};

/// Resolves phonetic input into candidates and tracks the current selection.
///
/// All state here belongs to the foreground context; the resolver is never
/// shared across threads.
pub struct CandidateResolver<C> {
    service: C,
    locale: String,
    max_candidates: usize,
    cache: BoundedCache<String, Vec<String>>,
    current: CandidateList,
    cache_hits: usize,
    cache_misses: usize,
}

impl<C: CompletionService> CandidateResolver<C> {
    /// Create a resolver using the candidate limits and cache settings of `config`.
    pub fn new(service: C, config: &Config) -> Self {
        Self::with_limits(
            service,
            &config.completion_locale,
            config.max_candidates,
            config.candidate_cache_size,
            config.candidate_eviction,
        )
    }

    /// Create a resolver with explicit limits.
    pub fn with_limits(
        service: C,
        locale: &str,
        max_candidates: usize,
        cache_size: usize,
        eviction: EvictionPolicy,
    ) -> Self {
        Self {
            service,
            locale: locale.to_string(),
            max_candidates: max_candidates.max(1),
            cache: BoundedCache::new(cache_size, eviction),
            current: CandidateList::new(),
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Resolve `input` into at most `max_candidates` distinct candidates.
    ///
    /// 1. Empty input yields an empty list without touching the cache.
    /// 2. A cached list for the exact input is returned verbatim.
    /// 3. Otherwise the completion service is asked; "no result" is an empty
    ///    list, results are normalized, deduplicated and truncated, then cached.
    ///
    /// An unreachable service yields an empty list that is not cached.
    /// The returned list also becomes the current list, selection reset.
    pub fn generate_candidates(&mut self, input: &str) -> Vec<String> {
        let candidates = self.resolve(input);
        self.current.set_candidates(candidates.clone());
        candidates
    }

    fn resolve(&mut self, input: &str) -> Vec<String> {
        if input.is_empty() {
            return Vec::new();
        }

        if let Some(cached) = self.cache.get(input) {
            self.cache_hits += 1;
            debug!(input, count = cached.len(), "candidate cache hit");
            return cached.clone();
        }
        self.cache_misses += 1;

        let raw = match self.service.complete(input, &self.locale) {
            Ok(found) => found.unwrap_or_default(),
            Err(err) => {
                warn!(input, error = %err, "completion service failed; no candidates");
                return Vec::new();
            }
        };

        let candidates = self.dedup_truncate(raw);
        let evicted = self.cache.insert(input.to_string(), candidates.clone());
        if evicted > 0 {
            debug!(evicted, "candidate cache evicted entries");
        }
        candidates
    }

    /// Normalize, drop blanks and duplicates, keep at most `max_candidates`.
    fn dedup_truncate(&self, raw: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .map(|s| utils::normalize(&s))
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .take(self.max_candidates)
            .collect()
    }

    /// Select the candidate at `index` of the current list.
    ///
    /// Out-of-range indices return `None` and leave the selection unchanged.
    pub fn select_candidate(&mut self, index: usize) -> Option<String> {
        self.current.select(index).map(str::to_string)
    }

    /// Move the selection cursor, clamped to the current list.
    pub fn move_selection(&mut self, direction: Direction) -> bool {
        self.current.move_selection(direction)
    }

    /// The current candidate list.
    pub fn candidates(&self) -> &CandidateList {
        &self.current
    }

    pub fn selected_candidate(&self) -> Option<&str> {
        self.current.selected()
    }

    /// Forget the current list (the cache is untouched).
    pub fn clear_candidates(&mut self) {
        self.current.clear();
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Get cache statistics for monitoring.
    ///
    /// Returns (hits, misses) tuple.
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache_hits, self.cache_misses)
    }

    /// Get cache hit rate as a percentage (0.0 to 100.0).
    ///
    /// Returns None if no cache accesses have been made yet.
    pub fn cache_hit_rate(&self) -> Option<f32> {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            None
        } else {
            Some((self.cache_hits as f32 / total as f32) * 100.0)
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Clear the cache and its statistics (used under memory pressure).
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.cache_hits = 0;
        self.cache_misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::CompletionError;
    use std::cell::Cell;
    use std::collections::HashMap;

    struct Table {
        entries: HashMap<&'static str, Vec<&'static str>>,
        calls: Cell<usize>,
        reachable: Cell<bool>,
    }

    impl Table {
        fn new(entries: &[(&'static str, &[&'static str])]) -> Self {
            Self {
                entries: entries.iter().map(|(k, v)| (*k, v.to_vec())).collect(),
                calls: Cell::new(0),
                reachable: Cell::new(true),
            }
        }
    }

    impl CompletionService for &Table {
        fn complete(&self, input: &str, locale: &str) -> Result<Option<Vec<String>>, CompletionError> {
            assert_eq!(locale, "zh-Hans");
            self.calls.set(self.calls.get() + 1);
            if !self.reachable.get() {
                return Err(CompletionError::Unreachable("offline".into()));
            }
            Ok(self
                .entries
                .get(input)
                .map(|v| v.iter().map(|s| s.to_string()).collect()))
        }
    }

    fn resolver(table: &Table) -> CandidateResolver<&Table> {
        CandidateResolver::new(table, &Config::default())
    }

    #[test]
    fn test_empty_input_skips_service_and_cache() {
        let table = Table::new(&[]);
        let mut r = resolver(&table);
        assert!(r.generate_candidates("").is_empty());
        assert_eq!(table.calls.get(), 0);
        assert_eq!(r.cache_stats(), (0, 0));
        assert_eq!(r.cache_len(), 0);
    }

    #[test]
    fn test_miss_then_hit() {
        let table = Table::new(&[("ni", &["你", "尼"])]);
        let mut r = resolver(&table);

        assert_eq!(r.generate_candidates("ni"), vec!["你", "尼"]);
        assert_eq!(r.generate_candidates("ni"), vec!["你", "尼"]);
        assert_eq!(table.calls.get(), 1);
        assert_eq!(r.cache_stats(), (1, 1));
        assert_eq!(r.cache_hit_rate(), Some(50.0));
    }

    #[test]
    fn test_no_result_is_cached_as_empty() {
        let table = Table::new(&[]);
        let mut r = resolver(&table);
        assert!(r.generate_candidates("zzz").is_empty());
        assert!(r.generate_candidates("zzz").is_empty());
        assert_eq!(table.calls.get(), 1);
        assert_eq!(r.cache_len(), 1);
    }

    #[test]
    fn test_unreachable_service_fails_empty_and_is_retried() {
        let table = Table::new(&[("hao", &["好"])]);
        table.reachable.set(false);
        let mut r = resolver(&table);

        assert!(r.generate_candidates("hao").is_empty());
        assert_eq!(r.cache_len(), 0);

        table.reachable.set(true);
        assert_eq!(r.generate_candidates("hao"), vec!["好"]);
        assert_eq!(table.calls.get(), 2);
    }

    #[test]
    fn test_dedup_and_truncate() {
        let table = Table::new(&[(
            "shi",
            &["是", "是", "事", " 事 ", "", "市", "十", "时", "使", "式", "室", "世", "试"],
        )]);
        let mut r = resolver(&table);
        let out = r.generate_candidates("shi");

        assert_eq!(out.len(), 8);
        let unique: HashSet<_> = out.iter().collect();
        assert_eq!(unique.len(), out.len());
        assert_eq!(out[0], "是");
        assert_eq!(out[1], "事");
    }

    #[test]
    fn test_selection_on_current_list() {
        let table = Table::new(&[("ni", &["你", "尼", "泥"])]);
        let mut r = resolver(&table);
        r.generate_candidates("ni");

        assert_eq!(r.select_candidate(1), Some("尼".to_string()));
        assert_eq!(r.select_candidate(3), None);
        assert_eq!(r.candidates().selected_index(), 1);

        assert!(r.move_selection(Direction::Next));
        assert!(!r.move_selection(Direction::Next));
        assert_eq!(r.selected_candidate(), Some("泥"));
    }

    #[test]
    fn test_new_resolution_resets_selection() {
        let table = Table::new(&[("ni", &["你", "尼"]), ("nih", &["你好"])]);
        let mut r = resolver(&table);
        r.generate_candidates("ni");
        r.select_candidate(1);
        r.generate_candidates("nih");
        assert_eq!(r.candidates().selected_index(), 0);
        assert_eq!(r.selected_candidate(), Some("你好"));
    }

    #[test]
    fn test_clear_cache_resets_stats() {
        let table = Table::new(&[("ni", &["你"])]);
        let mut r = resolver(&table);
        r.generate_candidates("ni");
        r.generate_candidates("ni");
        r.clear_cache();
        assert_eq!(r.cache_len(), 0);
        assert_eq!(r.cache_stats(), (0, 0));
        assert_eq!(r.cache_hit_rate(), None);
        // The presented list survives a cache purge.
        assert_eq!(r.candidates().len(), 1);
    }

    #[test]
    fn test_cache_respects_capacity_with_batch_eviction() {
        let table = Table::new(&[]);
        let mut r = CandidateResolver::with_limits(
            &table,
            "zh-Hans",
            8,
            100,
            EvictionPolicy::InsertionOrder { batch: 10 },
        );
        for i in 0..250 {
            r.generate_candidates(&format!("k{}", i));
            assert!(r.cache_len() <= r.cache_capacity());
        }
    }
}
