// core/src/translation/pipeline.rs
//
// Asynchronous translation with a bounded, persisted cache.
//
// Foreground callers only ever do a read-locked cache lookup; everything else
// (readiness, translator calls, cache writes, disk I/O) runs on a dedicated
// background runtime owned by the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::{
    LogObserver, NullStore, OutcomeStatus, Task, TranslationCache, TranslationObserver,
    TranslationOutcome, COMMON_PHRASES,
};
use crate::service::{CacheStore, DownloadConditions, TranslateError, Translator};
use crate::Config;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start translation runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Runs the translator's readiness step at most once at a time and
/// remembers success; failures are retried on the next request.
struct Readiness {
    ready: AtomicBool,
    gate: Mutex<()>,
}

impl Readiness {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            gate: Mutex::new(()),
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn ensure(
        &self,
        translator: &dyn Translator,
        conditions: &DownloadConditions,
    ) -> Result<(), TranslateError> {
        if self.is_ready() {
            return Ok(());
        }
        let _gate = self.gate.lock();
        if self.is_ready() {
            return Ok(());
        }
        translator.ensure_ready(conditions)?;
        self.ready.store(true, Ordering::Release);
        info!("translator ready");
        Ok(())
    }
}

/// State shared between the pipeline handle and its background jobs.
struct Shared {
    cache: TranslationCache,
    translator: Arc<dyn Translator>,
    store: Arc<dyn CacheStore>,
    observer: Arc<dyn TranslationObserver>,
    readiness: Readiness,
    conditions: DownloadConditions,
    source_locale: String,
    target_locale: String,
    /// Set once the construction-time load has been attempted. A teardown
    /// flush before that point would overwrite the store with a partial cache.
    warm: AtomicBool,
}

impl Shared {
    fn warm_up(&self, preload: bool) -> usize {
        let loaded = match self.store.load() {
            Ok(entries) => {
                let added = self.cache.merge(entries);
                debug!(added, "translation cache loaded");
                added
            }
            Err(err) => {
                warn!(error = %err, "failed to load translation cache; starting empty");
                0
            }
        };
        if preload {
            self.preload(common_phrases());
        }
        self.warm.store(true, Ordering::Release);
        loaded
    }

    fn preload(&self, entries: Vec<(String, String)>) -> usize {
        let count = entries.len();
        for (text, translation) in entries {
            self.cache.insert(text, translation);
        }
        count
    }

    fn save(&self) -> bool {
        let entries = self.cache.snapshot();
        match self.store.save(&entries) {
            Ok(()) => {
                debug!(count = entries.len(), "translation cache saved");
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to save translation cache");
                false
            }
        }
    }

    fn fetch(&self, text: &str) -> Result<String, TranslateError> {
        self.readiness.ensure(self.translator.as_ref(), &self.conditions)?;
        self.translator
            .translate(text, &self.source_locale, &self.target_locale)?
            .ok_or(TranslateError::EmptyResult)
    }

    /// Translate on the background context, failing open.
    fn perform(&self, text: String) -> TranslationOutcome {
        match self.fetch(&text) {
            Ok(translated) => {
                let evicted = self.cache.insert(text.clone(), translated.clone());
                if evicted > 0 {
                    debug!(evicted, "translation cache evicted entries");
                }
                self.observer.translation_completed(&text, &translated);
                TranslationOutcome {
                    original: text,
                    text: translated,
                    status: OutcomeStatus::Translated,
                }
            }
            Err(err) => {
                warn!(text = %text, error = %err, "translation failed; keeping original text");
                self.observer.translation_failed(&text, &err);
                TranslationOutcome::failed_open(text)
            }
        }
    }
}

fn common_phrases() -> Vec<(String, String)> {
    COMMON_PHRASES
        .iter()
        .map(|(zh, en)| (zh.to_string(), en.to_string()))
        .collect()
}

/// Builder for `TranslationPipeline`.
pub struct PipelineBuilder {
    translator: Arc<dyn Translator>,
    store: Arc<dyn CacheStore>,
    observer: Arc<dyn TranslationObserver>,
    config: Config,
}

impl PipelineBuilder {
    /// Take cache size, locales, readiness conditions, worker count and
    /// flush timeout from `config`.
    pub fn config(mut self, config: &Config) -> Self {
        self.config = config.clone();
        self
    }

    /// Durable store for the cache (default: `NullStore`).
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = store;
        self
    }

    /// Telemetry observer (default: `LogObserver`).
    pub fn observer(mut self, observer: Arc<dyn TranslationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Start the background runtime and schedule the cache load.
    pub fn build(self) -> Result<TranslationPipeline, PipelineError> {
        let config = self.config;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.translation_workers.max(1))
            .thread_name("transkey-translate")
            .enable_time()
            .build()?;

        let shared = Arc::new(Shared {
            cache: TranslationCache::new(config.translation_cache_size),
            translator: self.translator,
            store: self.store,
            observer: self.observer,
            readiness: Readiness::new(),
            conditions: config.download,
            source_locale: config.source_locale.clone(),
            target_locale: config.target_locale.clone(),
            warm: AtomicBool::new(false),
        });

        let warmup = {
            let shared = Arc::clone(&shared);
            let preload = config.preload_common_phrases;
            Task::spawn_blocking(&runtime, move || shared.warm_up(preload))
        };

        Ok(TranslationPipeline {
            shared,
            runtime: Some(runtime),
            warmup: Mutex::new(Some(warmup)),
            flush_timeout: Duration::from_millis(config.flush_timeout_ms),
        })
    }
}

/// Text -> translated text, off the caller's context, through a bounded cache.
///
/// Dropping the pipeline flushes the cache to its store, waiting at most the
/// configured flush timeout; a save still running after that is left to
/// finish on its own. Do not drop it from inside an async runtime.
pub struct TranslationPipeline {
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
    warmup: Mutex<Option<Task<usize>>>,
    flush_timeout: Duration,
}

impl TranslationPipeline {
    /// Start building a pipeline around `translator`.
    pub fn builder(translator: Arc<dyn Translator>) -> PipelineBuilder {
        PipelineBuilder {
            translator,
            store: Arc::new(NullStore),
            observer: Arc::new(LogObserver),
            config: Config::default(),
        }
    }

    /// Translate `text`.
    ///
    /// A cache hit completes immediately with status `Cached` and no external
    /// call. A miss runs on the background context: readiness, translation,
    /// cache insert, observer notification. Failures complete with the
    /// original text (`FailedOpen`) and leave the cache untouched.
    ///
    /// Concurrent requests for the same text are not coalesced.
    pub fn translate(&self, text: &str) -> Task<TranslationOutcome> {
        if let Some(hit) = self.shared.cache.get(text) {
            debug!(text, "translation cache hit");
            return Task::ready(TranslationOutcome::cached(text, hit));
        }
        let Some(runtime) = &self.runtime else {
            return Task::ready(TranslationOutcome::failed_open(text.to_string()));
        };
        let shared = Arc::clone(&self.shared);
        let text = text.to_string();
        Task::spawn_blocking(runtime, move || shared.perform(text))
    }

    /// Cached translation of `text`, if any. Never leaves the caller's context.
    pub fn get_cached_translation(&self, text: &str) -> Option<String> {
        self.shared.cache.get(text)
    }

    /// Run the translator's readiness step in the background ahead of the
    /// first request. Resolves to whether the translator is ready.
    pub fn prepare(&self) -> Task<bool> {
        self.spawn(|shared| {
            match shared
                .readiness
                .ensure(shared.translator.as_ref(), &shared.conditions)
            {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, "translator readiness failed");
                    false
                }
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        self.shared.readiness.is_ready()
    }

    /// Seed the cache with known translations, overwriting existing entries.
    pub fn preload<I>(&self, entries: I) -> Task<usize>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        self.spawn(move |shared| shared.preload(entries))
    }

    /// Seed the cache with `COMMON_PHRASES`.
    pub fn preload_common_phrases(&self) -> Task<usize> {
        self.preload(common_phrases())
    }

    /// Empty the cache in the background.
    pub fn clear_cache(&self) -> Task<()> {
        self.spawn(|shared| shared.cache.clear())
    }

    /// Save the cache to the store now. Resolves to whether the save worked.
    pub fn flush(&self) -> Task<bool> {
        self.spawn(|shared| shared.save())
    }

    /// Block until the construction-time load has finished.
    /// Returns the number of entries loaded (0 on later calls).
    pub fn wait_for_warmup(&self) -> usize {
        let task = self.warmup.lock().take();
        task.and_then(Task::wait).unwrap_or(0)
    }

    pub fn cache_len(&self) -> usize {
        self.shared.cache.len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.shared.cache.capacity()
    }

    fn spawn<T, F>(&self, job: F) -> Task<T>
    where
        F: FnOnce(&Shared) -> T + Send + 'static,
        T: Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        match &self.runtime {
            Some(runtime) => Task::spawn_blocking(runtime, move || job(&shared)),
            None => Task::ready(job(&shared)),
        }
    }
}

impl Drop for TranslationPipeline {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        if !self.shared.warm.load(Ordering::Acquire) {
            debug!("translation cache never loaded; skipping teardown flush");
            runtime.shutdown_background();
            return;
        }

        // Shutdown cancels blocking jobs that have not started yet, so the
        // save must be running or done before the runtime goes down.
        let shared = Arc::clone(&self.shared);
        let save = runtime.spawn_blocking(move || shared.save());
        let timeout = self.flush_timeout;
        match runtime.block_on(tokio::time::timeout(timeout, save)) {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(error = %err, "teardown flush did not run"),
            Err(_) => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "teardown flush timed out"
            ),
        }
        runtime.shutdown_background();
    }
}
