//! transkey-core
//!
//! Composition and translation core of a phonetic soft keyboard: raw key
//! events become a pending phonetic buffer, the buffer resolves into ranked
//! candidates, and a selected candidate is either committed directly or routed
//! through an asynchronous translation pipeline first.
//!
//! Public API:
//! - `CompositionBuffer` - pending phonetic input state machine
//! - `CandidateResolver` - phonetic input -> bounded, cached candidate list
//! - `TranslationPipeline` - cached, persisted, fail-open background translation
//! - `Keyboard` - orchestrator owning the mode flag and the commit protocol
//! - `Config` - limits, locales and feature flags (TOML)
//!
//! External services (completion, translator, durable store, host document)
//! are traits in `service`; the core never talks to the outside world itself.
use serde::{Deserialize, Serialize};

pub mod cache;
pub use cache::{BoundedCache, EvictionPolicy};

pub mod candidate;
pub use candidate::{CandidateList, Direction};

pub mod composition;
pub use composition::{CompositionBuffer, CompositionState, DeleteOutcome};

pub mod keyboard;
pub use keyboard::{InputMode, KeyEvent, KeyResult, Keyboard, KeyboardContext, TranslationChoice};

pub mod resolver;
pub use resolver::CandidateResolver;

pub mod service;
pub use service::{
    CacheStore, CompletionError, CompletionService, DownloadConditions, HostSink, StoreError,
    TranslateError, Translator,
};

pub mod translation;
pub use translation::{
    JsonFileStore, LogObserver, MemoryStore, NullStore, OutcomeStatus, PipelineError, Task,
    TranslationObserver, TranslationOutcome, TranslationPipeline,
};

/// Keyboard configuration.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // Candidate resolution
    /// Maximum number of candidates presented per input
    pub max_candidates: usize,
    /// Locale passed to the completion service
    pub completion_locale: String,
    /// Maximum number of inputs kept in the candidate cache
    pub candidate_cache_size: usize,
    /// How the candidate cache makes room when full
    pub candidate_eviction: EvictionPolicy,

    // Translation
    /// Maximum number of entries in the translation cache
    pub translation_cache_size: usize,
    /// Language of the candidates being translated
    pub source_locale: String,
    /// Language translations are produced in
    pub target_locale: String,
    /// When the translator may download what it needs to become ready
    pub download: DownloadConditions,
    /// Upper bound on translations running at the same time
    pub translation_workers: usize,
    /// How long teardown waits for the final cache flush (milliseconds)
    pub flush_timeout_ms: u64,
    /// Seed the translation cache with everyday phrases at startup
    pub preload_common_phrases: bool,

    // Keyboard
    /// Start in translate-then-choose mode instead of direct insert
    pub start_in_translate_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_candidates: 8,
            completion_locale: "zh-Hans".to_string(),
            candidate_cache_size: 100,
            // Drop a batch of the oldest inputs at once rather than one at a time.
            candidate_eviction: EvictionPolicy::InsertionOrder { batch: 10 },
            translation_cache_size: 1000,
            source_locale: "zh".to_string(),
            target_locale: "en".to_string(),
            download: DownloadConditions::default(),
            translation_workers: 2,
            flush_timeout_ms: 2000,
            preload_common_phrases: false,
            start_in_translate_mode: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path.display(), e))?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// The mode a new keyboard starts in.
    pub fn initial_mode(&self) -> InputMode {
        if self.start_in_translate_mode {
            InputMode::TranslateThenChoose
        } else {
            InputMode::DirectInsert
        }
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.max_candidates, 8);
        assert_eq!(cfg.candidate_cache_size, 100);
        assert_eq!(cfg.candidate_eviction, EvictionPolicy::InsertionOrder { batch: 10 });
        assert_eq!(cfg.translation_cache_size, 1000);
        assert_eq!(cfg.initial_mode(), InputMode::TranslateThenChoose);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            max_candidates = 5
            start_in_translate_mode = false

            [candidate_eviction]
            kind = "least_recently_used"

            [download]
            allow_metered_network = true
            "#,
        )
        .unwrap();

        assert_eq!(cfg.max_candidates, 5);
        assert_eq!(cfg.candidate_eviction, EvictionPolicy::LeastRecentlyUsed);
        assert!(cfg.download.allow_metered_network);
        assert!(cfg.download.allow_background);
        assert_eq!(cfg.translation_cache_size, 1000);
        assert_eq!(cfg.initial_mode(), InputMode::DirectInsert);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut cfg = Config::default();
        cfg.target_locale = "ja".to_string();
        cfg.candidate_eviction = EvictionPolicy::InsertionOrder { batch: 3 };

        let text = cfg.to_toml_string().unwrap();
        let back = Config::from_toml_str(&text).unwrap();
        assert_eq!(back.target_locale, "ja");
        assert_eq!(back.candidate_eviction, EvictionPolicy::InsertionOrder { batch: 3 });
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transkey.toml");
        let mut cfg = Config::default();
        cfg.flush_timeout_ms = 50;
        cfg.save_toml(&path).unwrap();

        assert_eq!(Config::load_toml(&path).unwrap().flush_timeout_ms, 50);
        assert!(Config::load_toml(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(utils::normalize("  你好 "), "你好");
        // e + combining acute -> precomposed é
        assert_eq!(utils::normalize("e\u{301}"), "\u{e9}");
    }
}
