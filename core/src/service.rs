//! External collaborators the keyboard core depends on.
//!
//! Only the interfaces live here. Concrete implementations (tables, HTTP
//! clients, file stores) are supplied by the embedding application; the
//! `transkey` crate ships a few.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phonetic completion failed to produce an answer at all.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service unreachable: {0}")]
    Unreachable(String),
    #[error("completion service rejected the request: {0}")]
    Rejected(String),
}

/// Turns a partial phonetic input into words or phrases.
pub trait CompletionService {
    /// Complete `input` for `locale`.
    ///
    /// `Ok(None)` means the service answered but has nothing to offer.
    fn complete(&self, input: &str, locale: &str) -> Result<Option<Vec<String>>, CompletionError>;
}

impl<T: CompletionService + ?Sized> CompletionService for Box<T> {
    fn complete(&self, input: &str, locale: &str) -> Result<Option<Vec<String>>, CompletionError> {
        (**self).complete(input, locale)
    }
}

/// Conditions under which the translator may fetch whatever it needs
/// (typically a language model) to become ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConditions {
    /// Allow downloads over metered (cellular) networks.
    pub allow_metered_network: bool,
    /// Allow downloads to continue while the host is in the background.
    pub allow_background: bool,
}

impl Default for DownloadConditions {
    fn default() -> Self {
        Self {
            allow_metered_network: false,
            allow_background: true,
        }
    }
}

/// Why a translation could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("translator is not ready: {0}")]
    NotReady(String),
    #[error("translator unavailable: {0}")]
    Unavailable(String),
    #[error("translator returned no result")]
    EmptyResult,
    #[error("translator error: {0}")]
    Service(String),
}

/// Text-to-text translator, called from the background context only.
pub trait Translator: Send + Sync {
    /// Make the translator usable. Must be idempotent and safe to retry
    /// after a failure.
    fn ensure_ready(&self, conditions: &DownloadConditions) -> Result<(), TranslateError>;

    /// Translate `text`. `Ok(None)` means the call succeeded without a result.
    fn translate(&self, text: &str, source: &str, target: &str)
        -> Result<Option<String>, TranslateError>;
}

/// Failure talking to durable storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage format error: {0}")]
    Format(String),
}

/// Durable string-to-string mapping backing the translation cache.
pub trait CacheStore: Send + Sync {
    /// Load every stored entry, oldest first. Absent storage is an empty map.
    fn load(&self) -> Result<IndexMap<String, String>, StoreError>;

    /// Replace the stored mapping with `entries`.
    fn save(&self, entries: &IndexMap<String, String>) -> Result<(), StoreError>;
}

/// The document the keyboard types into.
///
/// Calls are fire-and-forget; the sink is assumed available for as long as
/// the keyboard session is alive.
pub trait HostSink {
    fn insert_text(&mut self, text: &str);
    fn delete_backward(&mut self);
}
