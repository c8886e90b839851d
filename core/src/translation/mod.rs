//! Translation pipeline: selected candidate -> translated text.
//!
//! The pipeline sits between the keyboard and an external `Translator`:
//!
//! - **cache**: bounded, read-mostly map of source -> translation, guarded by
//!   a reader/writer lock so background jobs and foreground lookups can share it
//! - **store**: durable backing for the cache, loaded at construction and
//!   flushed at teardown, both best-effort
//! - **task**: handle through which background results come back to the
//!   foreground context
//! - **pipeline**: the background runtime, readiness gate and fail-open policy
//!
//! Failures never reach the commit path. A translation that cannot be produced
//! completes with the original text and status `FailedOpen`.

pub mod cache;
pub mod pipeline;
pub mod store;
pub mod task;

pub use cache::TranslationCache;
pub use pipeline::{PipelineBuilder, PipelineError, TranslationPipeline};
pub use store::{JsonFileStore, MemoryStore, NullStore};
pub use task::Task;

use tracing::{info, warn};

use crate::service::TranslateError;

/// How a translation request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Served from the cache without leaving the caller's context.
    Cached,
    /// Produced by the translator on the background context.
    Translated,
    /// The translator failed; `text` is the original input.
    FailedOpen,
}

/// Result of one translation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    /// The text that was submitted.
    pub original: String,
    /// The translation, or the original text when the request failed open.
    pub text: String,
    pub status: OutcomeStatus,
}

impl TranslationOutcome {
    pub(crate) fn cached(original: &str, text: String) -> Self {
        Self {
            original: original.to_string(),
            text,
            status: OutcomeStatus::Cached,
        }
    }

    pub(crate) fn failed_open(original: String) -> Self {
        Self {
            text: original.clone(),
            original,
            status: OutcomeStatus::FailedOpen,
        }
    }

    /// True unless the request failed open.
    pub fn is_translated(&self) -> bool {
        self.status != OutcomeStatus::FailedOpen
    }
}

/// Telemetry hook notified of every background translation.
///
/// Called from the background context; implementations must not touch
/// foreground state. Results for the commit path travel through `Task`.
pub trait TranslationObserver: Send + Sync {
    fn translation_completed(&self, _original: &str, _translated: &str) {}
    fn translation_failed(&self, _original: &str, _error: &TranslateError) {}
}

/// Default observer: reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TranslationObserver for LogObserver {
    fn translation_completed(&self, original: &str, translated: &str) {
        info!(original, translated, "translation completed");
    }

    fn translation_failed(&self, original: &str, error: &TranslateError) {
        warn!(original, %error, "translation failed");
    }
}

/// Everyday phrases seeded into the cache when `preload_common_phrases` is on.
pub const COMMON_PHRASES: &[(&str, &str)] = &[
    ("你好", "Hello"),
    ("谢谢", "Thank you"),
    ("不客气", "You're welcome"),
    ("再见", "Goodbye"),
    ("早安", "Good morning"),
    ("晚安", "Good night"),
    ("对不起", "Sorry"),
    ("没关系", "It's okay"),
    ("请", "Please"),
    ("是的", "Yes"),
    ("不是", "No"),
    ("可以", "Can"),
    ("不可以", "Cannot"),
    ("好的", "Okay"),
    ("明白", "Understand"),
];
