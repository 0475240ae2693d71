use crate::config::Config;
use crate::error::BackendError;
use crate::i18n::{Locale, TranslationMetrics, TranslationValidator};
use crate::translation::store::{CacheStore, FileStore};
use crate::translation::translator::{EdgeFunctionTranslator, TranslationRequest, Translator};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// source text -> target locale -> translated text
type Entries = HashMap<String, HashMap<String, String>>;

type PendingTranslation = Shared<BoxFuture<'static, String>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingKey {
    text: String,
    source: String,
    target: String,
}

/// Cached translations and in-flight requests.
///
/// Both live under one lock so a pair being translated is always visible
/// either in `entries` or in `pending`.
#[derive(Default)]
struct CacheState {
    entries: Entries,
    pending: HashMap<PendingKey, PendingTranslation>,
}

struct Inner {
    translator: Arc<dyn Translator>,
    store: Arc<dyn CacheStore>,
    state: Mutex<CacheState>,
    /// Serializes writes to the store; each write carries the latest snapshot
    persist_lock: Mutex<()>,
    metrics: TranslationMetrics,
    default_source: Locale,
}

/// Memoizing, request-coalescing translation cache.
///
/// Cloning is cheap and every clone shares the same cache, so one instance
/// built at startup can be handed to every part of the application that
/// needs localized text.
///
/// Translation never fails from the caller's point of view: any backend or
/// storage problem is logged and the source text is returned instead.
#[derive(Clone)]
pub struct TranslationCache {
    inner: Arc<Inner>,
}

impl TranslationCache {
    /// Build a cache translating from English by default.
    ///
    /// Previously persisted translations are loaded from `store`; missing or
    /// unreadable data starts an empty cache.
    pub fn new(translator: Arc<dyn Translator>, store: Arc<dyn CacheStore>) -> Self {
        Self::with_default_source(translator, store, Locale::canonical())
    }

    pub fn with_default_source(
        translator: Arc<dyn Translator>,
        store: Arc<dyn CacheStore>,
        default_source: Locale,
    ) -> Self {
        let entries = load_entries(store.as_ref());
        Self {
            inner: Arc::new(Inner {
                translator,
                store,
                state: Mutex::new(CacheState {
                    entries,
                    pending: HashMap::new(),
                }),
                persist_lock: Mutex::new(()),
                metrics: TranslationMetrics::new(),
                default_source,
            }),
        }
    }

    /// Edge-function translator, file store under `config.cache_dir`.
    pub fn from_config(config: &Config) -> Self {
        let default_source = Locale::parse(&config.default_source_locale).unwrap_or_else(|e| {
            warn!("{:#}, falling back to the canonical locale", e);
            Locale::canonical()
        });

        Self::with_default_source(
            Arc::new(EdgeFunctionTranslator::from_config(config)),
            Arc::new(FileStore::in_dir(&config.cache_dir)),
            default_source,
        )
    }

    /// Translate `text` into `target`.
    ///
    /// `source` defaults to the cache's default source locale. Cached pairs
    /// are answered without a backend call; identical concurrent requests
    /// share a single call. On any failure the original `text` is returned.
    pub async fn translate(&self, text: &str, target: &str, source: Option<&str>) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let target = match Locale::parse(target) {
            Ok(locale) => locale,
            Err(e) => {
                warn!("Not translating: {:#}", e);
                return text.to_string();
            }
        };
        let source = match source {
            Some(code) => match Locale::parse(code) {
                Ok(locale) => locale,
                Err(e) => {
                    warn!("Not translating: {:#}", e);
                    return text.to_string();
                }
            },
            None => self.inner.default_source.clone(),
        };

        if source == target {
            return text.to_string();
        }

        let pending = {
            let mut state = self.inner.lock_state();

            if let Some(hit) = state
                .entries
                .get(text)
                .and_then(|locales| locales.get(target.as_str()))
            {
                self.inner.metrics.record_cache_hit();
                return hit.clone();
            }
            self.inner.metrics.record_cache_miss();

            let key = PendingKey {
                text: text.to_string(),
                source: source.to_string(),
                target: target.to_string(),
            };

            match state.pending.get(&key) {
                Some(in_flight) => {
                    debug!("Joining in-flight translation to {}", key.target);
                    self.inner.metrics.record_coalesced();
                    in_flight.clone()
                }
                None => {
                    let request = self.start_request(key.clone());
                    state.pending.insert(key, request.clone());
                    request
                }
            }
        };

        pending.await
    }

    /// Spawn the backend call for `key` and return a shareable handle to its result.
    ///
    /// The call runs on its own task, so it completes even if every caller
    /// stops waiting for it.
    fn start_request(&self, key: PendingKey) -> PendingTranslation {
        let inner = Arc::clone(&self.inner);
        let registry = Arc::downgrade(&self.inner);
        let task_key = key.clone();

        let task = tokio::spawn(async move { inner.fetch(task_key).await });

        async move {
            match task.await {
                Ok(translated) => translated,
                Err(e) => {
                    warn!("Translation task for {} did not finish: {}", key.target, e);
                    if let Some(inner) = registry.upgrade() {
                        inner.lock_state().pending.remove(&key);
                    }
                    key.text
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Empty the cache and delete its persisted copy.
    ///
    /// Requests already in flight are left alone; if they succeed their
    /// result is cached and persisted again.
    pub fn clear_cache(&self) {
        let _persist = self
            .inner
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.inner.lock_state().entries.clear();
        if let Err(e) = self.inner.store.remove() {
            warn!("Failed to remove persisted translation cache: {:#}", e);
        }
        info!("Translation cache cleared");
    }

    /// Cached translation of `text` into `target`, without calling the backend.
    pub fn cached(&self, text: &str, target: &str) -> Option<String> {
        let target = Locale::parse(target).ok()?;
        self.inner
            .lock_state()
            .entries
            .get(text)
            .and_then(|locales| locales.get(target.as_str()))
            .cloned()
    }

    /// Number of cached (text, locale) pairs
    pub fn len(&self) -> usize {
        self.inner
            .lock_state()
            .entries
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests currently in flight
    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.inner.metrics
    }

    pub fn default_source(&self) -> &Locale {
        &self.inner.default_source
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, key: PendingKey) -> String {
        self.metrics.record_backend_call();
        let request = TranslationRequest {
            text: key.text.clone(),
            target_language: key.target.clone(),
            source_language: key.source.clone(),
        };

        let outcome = self.translator.translate(request).await;
        self.complete(&key, outcome)
    }

    /// Record the outcome of a backend call and release its pending entry.
    fn complete(&self, key: &PendingKey, outcome: Result<String, BackendError>) -> String {
        match outcome {
            Ok(translated) => {
                let report = TranslationValidator::validate(&key.text, &translated);
                if report.has_errors() {
                    warn!(
                        "Translation validation errors for {}: {:?}",
                        key.target, report.errors
                    );
                }
                if report.has_warnings() {
                    warn!(
                        "Translation validation warnings for {}: {:?}",
                        key.target, report.warnings
                    );
                }

                {
                    let mut state = self.lock_state();
                    state
                        .entries
                        .entry(key.text.clone())
                        .or_default()
                        .insert(key.target.clone(), translated.clone());
                    state.pending.remove(key);
                }
                self.persist();
                translated
            }
            Err(e) => {
                self.metrics.record_backend_failure();
                warn!(
                    "Translation {} -> {} failed, using source text: {}",
                    key.source, key.target, e
                );
                self.lock_state().pending.remove(key);
                key.text.clone()
            }
        }
    }

    /// Write the whole cache to the store. Failures are logged, never raised.
    fn persist(&self) {
        let _persist = self
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let snapshot = serde_json::to_string(&self.lock_state().entries);
        match snapshot {
            Ok(json) => {
                if let Err(e) = self.store.save(&json) {
                    warn!("Failed to persist translation cache: {:#}", e);
                }
            }
            Err(e) => warn!("Failed to serialize translation cache: {}", e),
        }
    }
}

fn load_entries(store: &dyn CacheStore) -> Entries {
    match store.load() {
        Ok(Some(data)) => match serde_json::from_str::<Entries>(&data) {
            Ok(entries) => {
                debug!("Loaded cached translations for {} texts", entries.len());
                entries
            }
            Err(e) => {
                warn!("Discarding unreadable translation cache: {}", e);
                Entries::new()
            }
        },
        Ok(None) => Entries::new(),
        Err(e) => {
            warn!("Failed to load translation cache: {:#}", e);
            Entries::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Translator that tags text with its target locale and counts calls
    struct FakeTranslator {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl FakeTranslator {
        fn new() -> Arc<Self> {
            Self::with_delay(Duration::ZERO)
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay,
            })
        }

        fn failing() -> Arc<Self> {
            let fake = Self::new();
            fake.fail.store(true, Ordering::SeqCst);
            fake
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Translator for FakeTranslator {
        fn translate(
            &self,
            request: TranslationRequest,
        ) -> BoxFuture<'_, Result<String, BackendError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail.load(Ordering::SeqCst);
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                if fail {
                    Err(BackendError::Network("connection reset".to_string()))
                } else {
                    Ok(format!("[{}] {}", request.target_language, request.text))
                }
            }
            .boxed()
        }
    }

    /// Store whose every operation fails
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn load(&self) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk unavailable")
        }

        fn save(&self, _data: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        fn remove(&self) -> anyhow::Result<()> {
            anyhow::bail!("read-only filesystem")
        }
    }

    fn cache_with(fake: &Arc<FakeTranslator>, store: Arc<dyn CacheStore>) -> TranslationCache {
        TranslationCache::new(fake.clone(), store)
    }

    // ==================== Lookup Tests ====================

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        assert_eq!(cache.translate("Hello", "fr", None).await, "[fr] Hello");
        assert_eq!(cache.translate("Hello", "fr", None).await, "[fr] Hello");

        assert_eq!(fake.calls(), 1);
        assert_eq!(cache.metrics().cache_hits(), 1);
        assert_eq!(cache.metrics().cache_misses(), 1);
    }

    #[tokio::test]
    async fn test_locales_are_cached_independently() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        cache.translate("Hello", "fr", None).await;
        assert_eq!(cache.cached("Hello", "de"), None);

        assert_eq!(cache.translate("Hello", "de", None).await, "[de] Hello");
        assert_eq!(fake.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_ignores_source_locale() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        cache.translate("Hello", "fr", Some("en")).await;
        assert_eq!(cache.translate("Hello", "fr", Some("de")).await, "[fr] Hello");
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_locale_case_is_normalized() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        cache.translate("Hello", "pt_br", None).await;
        assert_eq!(cache.translate("Hello", "PT-BR", None).await, "[pt-BR] Hello");
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_text_is_returned_unchanged() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        assert_eq!(cache.translate("", "fr", None).await, "");
        assert_eq!(cache.translate("   ", "fr", None).await, "   ");
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_same_source_and_target_skips_backend() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        assert_eq!(cache.translate("Hello", "en", None).await, "Hello");
        assert_eq!(cache.translate("Bonjour", "fr", Some("fr")).await, "Bonjour");
        assert_eq!(fake.calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_locale_degrades_to_source_text() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        assert_eq!(cache.translate("Hello", "not a locale", None).await, "Hello");
        assert_eq!(cache.translate("Hello", "fr", Some("??")).await, "Hello");
        assert_eq!(fake.calls(), 0);
    }

    // ==================== Coalescing Tests ====================

    #[tokio::test]
    async fn test_concurrent_requests_share_one_call() {
        let fake = FakeTranslator::with_delay(Duration::from_millis(50));
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        let (a, b, c) = tokio::join!(
            cache.translate("Invoice overdue", "fr", None),
            cache.translate("Invoice overdue", "fr", None),
            cache.translate("Invoice overdue", "fr", Some("en")),
        );

        assert_eq!(fake.calls(), 1);
        assert_eq!(a, "[fr] Invoice overdue");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(cache.metrics().coalesced(), 2);
        assert_eq!(cache.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_different_sources_are_not_coalesced() {
        let fake = FakeTranslator::with_delay(Duration::from_millis(20));
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        tokio::join!(
            cache.translate("Gift", "fr", Some("en")),
            cache.translate("Gift", "fr", Some("de")),
        );
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_request_still_completes() {
        let fake = FakeTranslator::with_delay(Duration::from_millis(20));
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        let result = tokio::time::timeout(
            Duration::from_millis(1),
            cache.translate("Hello", "fr", None),
        )
        .await;
        assert!(result.is_err(), "caller should have given up");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.cached("Hello", "fr").as_deref(), Some("[fr] Hello"));
        assert_eq!(cache.pending_len(), 0);
        assert_eq!(fake.calls(), 1);
    }

    // ==================== Failure Tests ====================

    #[tokio::test]
    async fn test_backend_failure_returns_source_text() {
        let fake = FakeTranslator::failing();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        assert_eq!(cache.translate("Hello", "fr", None).await, "Hello");
        assert!(cache.is_empty());
        assert_eq!(cache.pending_len(), 0);
        assert_eq!(cache.metrics().backend_failures(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached_and_next_call_retries() {
        let fake = FakeTranslator::failing();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));

        assert_eq!(cache.translate("Hello", "fr", None).await, "Hello");
        fake.fail.store(false, Ordering::SeqCst);
        assert_eq!(cache.translate("Hello", "fr", None).await, "[fr] Hello");
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_broken_store_keeps_working_in_memory() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(BrokenStore));

        assert_eq!(cache.translate("Hello", "fr", None).await, "[fr] Hello");
        assert_eq!(cache.translate("Hello", "fr", None).await, "[fr] Hello");
        assert_eq!(fake.calls(), 1);

        cache.clear_cache();
        assert!(cache.is_empty());
    }

    // ==================== Persistence Tests ====================

    #[tokio::test]
    async fn test_reload_serves_persisted_translations() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        let first = FakeTranslator::new();
        cache_with(&first, store.clone())
            .translate("Hello", "fr", None)
            .await;

        let second = FakeTranslator::new();
        let reloaded = cache_with(&second, store.clone());
        assert_eq!(reloaded.translate("Hello", "fr", None).await, "[fr] Hello");
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_persisted_format() {
        let store = Arc::new(MemoryStore::new());
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, store.clone());

        cache.translate("Hello", "fr", None).await;
        cache.translate("Hello", "de", None).await;

        let saved: Entries = serde_json::from_str(&store.load().unwrap().unwrap()).unwrap();
        assert_eq!(saved["Hello"]["fr"], "[fr] Hello");
        assert_eq!(saved["Hello"]["de"], "[de] Hello");
    }

    #[tokio::test]
    async fn test_unparsable_store_starts_empty() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::with_data("{not json")));

        assert!(cache.is_empty());
        assert_eq!(cache.translate("Hello", "fr", None).await, "[fr] Hello");
    }

    #[tokio::test]
    async fn test_clear_cache_forces_fresh_call_and_removes_copy() {
        let store = Arc::new(MemoryStore::new());
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, store.clone());

        cache.translate("Hello", "fr", None).await;
        assert!(store.load().unwrap().is_some());

        cache.clear_cache();
        assert!(cache.is_empty());
        assert_eq!(store.load().unwrap(), None);

        cache.translate("Hello", "fr", None).await;
        assert_eq!(fake.calls(), 2);

        cache.clear_cache();
        cache.clear_cache();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_request_finishing_after_clear_is_cached_again() {
        let store = Arc::new(MemoryStore::new());
        let fake = FakeTranslator::with_delay(Duration::from_millis(100));
        let cache = cache_with(&fake, store.clone());

        let in_flight = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.translate("Hello", "fr", None).await })
        };
        while cache.pending_len() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        cache.clear_cache();
        assert!(cache.is_empty());
        assert_eq!(store.load().unwrap(), None);

        assert_eq!(in_flight.await.unwrap(), "[fr] Hello");

        // The late result lands in memory and brings the persisted copy back
        assert_eq!(cache.cached("Hello", "fr").as_deref(), Some("[fr] Hello"));
        let persisted: serde_json::Value =
            serde_json::from_str(&store.load().unwrap().unwrap()).unwrap();
        assert_eq!(persisted, serde_json::json!({"Hello": {"fr": "[fr] Hello"}}));
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let fake = FakeTranslator::new();
        let cache = cache_with(&fake, Arc::new(MemoryStore::new()));
        let other = cache.clone();

        cache.translate("Hello", "fr", None).await;
        assert_eq!(other.translate("Hello", "fr", None).await, "[fr] Hello");
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_default_source() {
        let fake = FakeTranslator::new();
        let cache = TranslationCache::with_default_source(
            fake.clone(),
            Arc::new(MemoryStore::new()),
            Locale::parse("fr").unwrap(),
        );

        assert_eq!(cache.default_source().as_str(), "fr");
        assert_eq!(cache.translate("Bonjour", "fr", None).await, "Bonjour");
        assert_eq!(cache.translate("Bonjour", "en", None).await, "[en] Bonjour");
        assert_eq!(fake.calls(), 1);
    }
}
