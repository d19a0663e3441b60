//! Embedding generation with caching, retry, and provider fallback.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::services::providers::{EmbeddingBackend, GEMINI_NAME, GeminiBackend, OpenAiBackend};
use crate::utils::retry::{RetryPolicy, with_retry};
use crate::utils::truncate_chars;

/// Inputs are truncated to this many characters before every provider call.
pub const MAX_INPUT_CHARS: usize = 8000;
/// Fixed capacity of the (provider, text) cache.
pub const CACHE_CAPACITY: usize = 1000;
/// Batch inputs are embedded in fixed groups of this size.
const BATCH_GROUP_SIZE: usize = 10;
/// Pause between groups, to stay under provider rate limits.
const BATCH_PAUSE: Duration = Duration::from_millis(200);

/// One computed embedding with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub provider: String,
    pub model: String,
}

/// Fixed-capacity recency-ordered cache; overflow evicts the
/// least-recently-used entry.
struct EmbeddingCache {
    capacity: usize,
    entries: HashMap<String, Embedding>,
    order: VecDeque<String>,
}

impl EmbeddingCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&mut self, key: &str) -> Option<Embedding> {
        let hit = self.entries.get(key).cloned();
        if hit.is_some() {
            self.touch(key);
        }
        hit
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(k) = self.order.remove(pos)
        {
            self.order.push_back(k);
        }
    }

    fn insert(&mut self, key: String, value: Embedding) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        if self.entries.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.entries.remove(&oldest);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Text-to-vector service over two configured backends.
///
/// The preferred backend is tried first through the retry chain; on
/// exhaustion the other backend gets its own chain. Successes land in the
/// cache, keyed by the preferred provider and the input text.
pub struct EmbeddingService {
    primary: Arc<dyn EmbeddingBackend>,
    secondary: Arc<dyn EmbeddingBackend>,
    prefer_secondary: bool,
    retry: RetryPolicy,
    cache: Mutex<EmbeddingCache>,
}

impl EmbeddingService {
    pub fn new(
        primary: Arc<dyn EmbeddingBackend>,
        secondary: Arc<dyn EmbeddingBackend>,
        prefer_secondary: bool,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            primary,
            secondary,
            prefer_secondary,
            retry,
            cache: Mutex::new(EmbeddingCache::new(CACHE_CAPACITY)),
        }
    }

    /// Build the service from configuration; credentials come from
    /// `OPENAI_API_KEY` and `GEMINI_API_KEY`.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let openai = Arc::new(OpenAiBackend::new(
            &config.openai_model,
            std::env::var("OPENAI_API_KEY").ok(),
            timeout,
        )?);
        let gemini = Arc::new(GeminiBackend::new(
            &config.gemini_model,
            std::env::var("GEMINI_API_KEY").ok(),
            timeout,
        )?);
        let prefer_secondary = config.preferred.eq_ignore_ascii_case(GEMINI_NAME);
        Ok(Self::new(openai, gemini, prefer_secondary, RetryPolicy::default()))
    }

    /// Ordered attempt list: preferred backend first, the other as the
    /// last resort.
    fn attempt_order(&self) -> [&Arc<dyn EmbeddingBackend>; 2] {
        if self.prefer_secondary {
            [&self.secondary, &self.primary]
        } else {
            [&self.primary, &self.secondary]
        }
    }

    fn preferred(&self) -> &Arc<dyn EmbeddingBackend> {
        self.attempt_order()[0]
    }

    fn cache_key(&self, text: &str) -> String {
        format!("{}:{}", self.preferred().name(), text)
    }

    fn cache(&self) -> MutexGuard<'_, EmbeddingCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declared dimension of the preferred provider/model pair.
    pub fn dimension(&self) -> usize {
        self.preferred().dimension()
    }

    /// Human-readable label of the preferred backend, for status output.
    pub fn provider_label(&self) -> String {
        format!("{} ({})", self.preferred().name(), self.preferred().model())
    }

    /// Embed one text, consulting the cache first.
    pub async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let key = self.cache_key(text);
        if let Some(hit) = self.cache().get(&key) {
            return Ok(hit);
        }

        let input = truncate_chars(text, MAX_INPUT_CHARS);
        let mut last_error: Option<EmbeddingError> = None;

        for backend in self.attempt_order() {
            let backend = Arc::clone(backend);
            let outcome = with_retry(&self.retry, || {
                let backend = Arc::clone(&backend);
                let input = input.clone();
                async move { backend.embed(&input).await }
            })
            .await;

            match outcome.into_result() {
                Ok(vector) if !vector.is_empty() => {
                    let embedding = Embedding {
                        vector,
                        provider: backend.name().to_string(),
                        model: backend.model().to_string(),
                    };
                    self.cache().insert(key, embedding.clone());
                    return Ok(embedding);
                }
                Ok(_) => {
                    last_error = Some(EmbeddingError::InvalidResponse(
                        "provider returned an empty vector".to_string(),
                    ));
                }
                Err(error) => last_error = Some(error),
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "all providers failed".to_string());
        Err(EmbeddingError::NoProvider(detail))
    }

    /// Embed many texts, preserving input order.
    ///
    /// Inputs run in fixed groups of ten with a pause between groups; any
    /// single failure fails the whole batch.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut results = Vec::with_capacity(texts.len());

        for (group_index, group) in texts.chunks(BATCH_GROUP_SIZE).enumerate() {
            if group_index > 0 {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
            let futures: Vec<_> = group.iter().map(|text| self.embed(text)).collect();
            for outcome in join_all(futures).await {
                results.push(outcome?);
            }
        }

        Ok(results)
    }

    #[cfg(test)]
    fn cached_len(&self) -> usize {
        self.cache().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubBackend {
        name: &'static str,
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubBackend {
        fn working(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingBackend for StubBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbeddingError::Connection("stub down".to_string()));
            }
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3).with_delays(vec![Duration::from_millis(1)])
    }

    fn service(
        primary: Arc<StubBackend>,
        secondary: Arc<StubBackend>,
        prefer_secondary: bool,
    ) -> EmbeddingService {
        EmbeddingService::new(primary, secondary, prefer_secondary, fast_policy())
    }

    #[tokio::test]
    async fn test_preferred_backend_is_used() {
        let primary = StubBackend::working("alpha");
        let secondary = StubBackend::working("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), false);

        let embedding = svc.embed("hello").await.unwrap();
        assert_eq!(embedding.provider, "alpha");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_to_secondary_after_retries() {
        let primary = StubBackend::failing("alpha");
        let secondary = StubBackend::working("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), false);

        let embedding = svc.embed("hello").await.unwrap();
        assert_eq!(embedding.provider, "beta");
        // Retry chain exhausted on the preferred backend first
        assert_eq!(primary.calls(), 3);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_secondary_preferred_falls_back_to_primary() {
        let primary = StubBackend::working("alpha");
        let secondary = StubBackend::failing("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), true);

        let embedding = svc.embed("hello").await.unwrap();
        assert_eq!(embedding.provider, "alpha");
        assert_eq!(secondary.calls(), 3);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_backends_failing_yields_no_provider() {
        let primary = StubBackend::failing("alpha");
        let secondary = StubBackend::failing("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), false);

        let result = svc.embed("hello").await;
        assert!(matches!(result, Err(EmbeddingError::NoProvider(_))));
        assert_eq!(primary.calls(), 3);
        assert_eq!(secondary.calls(), 3);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let primary = StubBackend::working("alpha");
        let secondary = StubBackend::working("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), false);

        svc.embed("hello").await.unwrap();
        svc.embed("hello").await.unwrap();
        assert_eq!(primary.calls(), 1);
        assert_eq!(svc.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_input_truncated_before_call() {
        let primary = StubBackend::working("alpha");
        let secondary = StubBackend::working("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), false);

        let long = "x".repeat(MAX_INPUT_CHARS + 500);
        let embedding = svc.embed(&long).await.unwrap();
        // Stub encodes input length into the first component
        assert_eq!(embedding.vector[0], MAX_INPUT_CHARS as f32);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let primary = StubBackend::working("alpha");
        let secondary = StubBackend::working("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), false);

        let texts: Vec<String> = (1..=25).map(|i| "x".repeat(i)).collect();
        let embeddings = svc.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 25);
        for (i, embedding) in embeddings.iter().enumerate() {
            assert_eq!(embedding.vector[0], (i + 1) as f32);
        }
    }

    #[tokio::test]
    async fn test_batch_fails_when_any_input_fails() {
        let primary = StubBackend::failing("alpha");
        let secondary = StubBackend::failing("beta");
        let svc = service(Arc::clone(&primary), Arc::clone(&secondary), false);

        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(svc.embed_batch(&texts).await.is_err());
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache = EmbeddingCache::new(2);
        let entry = |p: &str| Embedding {
            vector: vec![1.0],
            provider: p.to_string(),
            model: "m".to_string(),
        };

        cache.insert("a".to_string(), entry("a"));
        cache.insert("b".to_string(), entry("b"));
        // Refresh "a" so "b" becomes the eviction candidate
        assert!(cache.get("a").is_some());
        cache.insert("c".to_string(), entry("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_cache_reinsert_updates_value() {
        let mut cache = EmbeddingCache::new(2);
        let entry = |v: f32| Embedding {
            vector: vec![v],
            provider: "p".to_string(),
            model: "m".to_string(),
        };

        cache.insert("a".to_string(), entry(1.0));
        cache.insert("a".to_string(), entry(2.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().vector, vec![2.0]);
    }
}
