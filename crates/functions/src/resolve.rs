//! Fetch-or-generate resolution over a persistent result cache.
//!
//! Every expensive generation in this service (image background removal,
//! recipe generation, blog imports) follows the same shape: the result is
//! keyed, generated at most once, persisted, and served from the cache
//! afterwards. [`resolve`] is that shape, parameterized over a
//! [`ResultCache`] so each feature brings its own table and types.
//!
//! # Lifecycle
//!
//! A key moves through three stored states: `processing` while a generation
//! holds the claim, then `completed` with a result or `failed` with an error.
//! Claiming is a single atomic insert-if-absent, so two concurrent requests
//! for the same key can never both generate; the loser observes the winner's
//! in-flight claim and backs off without doing any work.

use std::future::Future;

use thiserror::Error;
use tracing::instrument;

use crate::db::RepositoryError;

/// What to do when a key already has a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnExisting {
    /// Reclaim keys whose last generation failed; serve completed results
    /// and yield to in-flight claims as usual.
    RetryFailed,
    /// Never regenerate. Completed results are still served, but a failed
    /// row blocks the key instead of being retaken.
    Skip,
}

/// Outcome of attempting to claim a key for generation.
#[derive(Debug)]
pub enum ClaimOutcome<S> {
    /// The claim is ours. The caller must generate, then complete or fail.
    Claimed,
    /// Another request holds the claim right now.
    InFlight,
    /// A completed result already exists.
    Completed(S),
    /// A failed row exists and the policy is [`OnExisting::Skip`].
    Skipped,
}

/// How a key was ultimately resolved.
#[derive(Debug)]
pub enum Resolution<S> {
    /// The generator ran and its result is newly persisted.
    Fresh(S),
    /// A previously completed result was served.
    Cached(S),
    /// Another request is generating; nothing was started or waited on.
    InFlight,
    /// An existing row blocked generation under [`OnExisting::Skip`].
    Skipped,
}

impl<S> Resolution<S> {
    /// The resolved value, if this resolution produced one.
    pub fn into_value(self) -> Option<S> {
        match self {
            Self::Fresh(value) | Self::Cached(value) => Some(value),
            Self::InFlight | Self::Skipped => None,
        }
    }

    /// Whether the generator actually ran.
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Persistent claim-and-result storage for one kind of generated artifact.
///
/// `Draft` is what the generator produces; `Stored` is the canonical form
/// after persistence (typically the same thing, or the draft enriched with a
/// database id). [`ResultCache::claim`] MUST be atomic against concurrent
/// claims for the same key: at most one caller may ever see
/// [`ClaimOutcome::Claimed`] between completions. The `PostgreSQL`
/// implementations get this from `INSERT .. ON CONFLICT DO NOTHING`.
pub trait ResultCache: Send + Sync {
    /// Cache key. For URL-keyed caches this is `str`.
    type Key: ?Sized + Sync;
    /// What the generator produces.
    type Draft: Send;
    /// The canonical stored form served on cache hits.
    type Stored: Send;

    /// Atomically claim `key` for generation, or report why not.
    fn claim(
        &self,
        key: &Self::Key,
        policy: OnExisting,
    ) -> impl Future<Output = Result<ClaimOutcome<Self::Stored>, RepositoryError>> + Send;

    /// Persist a successful generation and return the stored form.
    fn complete(
        &self,
        key: &Self::Key,
        draft: Self::Draft,
    ) -> impl Future<Output = Result<Self::Stored, RepositoryError>> + Send;

    /// Record a failed generation so the claim is released into `failed`.
    fn fail(
        &self,
        key: &Self::Key,
        error: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Errors from [`resolve`].
#[derive(Debug, Error)]
pub enum ResolveError<E> {
    /// The cache itself failed.
    #[error("cache error: {0}")]
    Cache(#[from] RepositoryError),

    /// The generator failed. The key is marked `failed` in the cache.
    #[error("generation failed: {0}")]
    Generation(E),
}

/// Resolve `key`: serve the cached result, or claim the key and run
/// `generate` exactly once.
///
/// On generation failure the key is marked `failed` (best effort) and the
/// generator's error is returned; under [`OnExisting::RetryFailed`] a later
/// call will retake the key.
///
/// # Errors
///
/// [`ResolveError::Cache`] if the cache fails, [`ResolveError::Generation`]
/// if this call won the claim and the generator failed.
#[instrument(skip_all)]
pub async fn resolve<C, G, Fut, E>(
    cache: &C,
    key: &C::Key,
    policy: OnExisting,
    generate: G,
) -> Result<Resolution<C::Stored>, ResolveError<E>>
where
    C: ResultCache,
    G: FnOnce() -> Fut,
    Fut: Future<Output = Result<C::Draft, E>>,
    E: std::fmt::Display,
{
    match cache.claim(key, policy).await? {
        ClaimOutcome::Completed(stored) => Ok(Resolution::Cached(stored)),
        ClaimOutcome::InFlight => Ok(Resolution::InFlight),
        ClaimOutcome::Skipped => Ok(Resolution::Skipped),
        ClaimOutcome::Claimed => match generate().await {
            Ok(draft) => match cache.complete(key, draft).await {
                Ok(stored) => Ok(Resolution::Fresh(stored)),
                Err(error) => {
                    // Release the claim so the key isn't stuck in
                    // `processing` forever. Best effort, same as below.
                    if let Err(mark_error) = cache.fail(key, &error.to_string()).await {
                        tracing::warn!(error = %mark_error, "failed to release claim");
                    }
                    Err(ResolveError::Cache(error))
                }
            },
            Err(error) => {
                // Best effort: the generator's error is what the caller
                // needs to see, even if recording it fails too.
                if let Err(mark_error) = cache.fail(key, &error.to_string()).await {
                    tracing::warn!(error = %mark_error, "failed to record generation failure");
                }
                Err(ResolveError::Generation(error))
            }
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::Notify;

    use super::*;

    #[derive(Debug, Clone)]
    enum Entry {
        Processing,
        Completed(String),
        Failed(String),
    }

    /// In-memory cache with the same atomicity contract as the database
    /// implementations: claim decisions happen under one lock acquisition.
    #[derive(Clone, Default)]
    struct MemoryCache {
        entries: Arc<Mutex<HashMap<String, Entry>>>,
    }

    impl MemoryCache {
        fn entry(&self, key: &str) -> Option<Entry> {
            self.entries.lock().unwrap().get(key).cloned()
        }
    }

    impl ResultCache for MemoryCache {
        type Key = str;
        type Draft = String;
        type Stored = String;

        async fn claim(
            &self,
            key: &str,
            policy: OnExisting,
        ) -> Result<ClaimOutcome<String>, RepositoryError> {
            let mut entries = self.entries.lock().unwrap();
            match entries.get(key) {
                None => {
                    entries.insert(key.to_string(), Entry::Processing);
                    Ok(ClaimOutcome::Claimed)
                }
                Some(Entry::Completed(value)) => Ok(ClaimOutcome::Completed(value.clone())),
                Some(Entry::Processing) => Ok(ClaimOutcome::InFlight),
                Some(Entry::Failed(_)) => match policy {
                    OnExisting::RetryFailed => {
                        entries.insert(key.to_string(), Entry::Processing);
                        Ok(ClaimOutcome::Claimed)
                    }
                    OnExisting::Skip => Ok(ClaimOutcome::Skipped),
                },
            }
        }

        async fn complete(&self, key: &str, draft: String) -> Result<String, RepositoryError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), Entry::Completed(draft.clone()));
            Ok(draft)
        }

        async fn fail(&self, key: &str, error: &str) -> Result<(), RepositoryError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), Entry::Failed(error.to_string()));
            Ok(())
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("boom: {0}")]
    struct TestError(String);

    #[tokio::test]
    async fn test_fresh_key_generates_and_persists() {
        let cache = MemoryCache::default();
        let calls = AtomicUsize::new(0);

        let resolution = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>("value".to_string())
        })
        .await
        .expect("resolve should succeed");

        assert!(resolution.is_fresh());
        assert_eq!(resolution.into_value().as_deref(), Some("value"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(cache.entry("key-1"), Some(Entry::Completed(_))));
    }

    #[tokio::test]
    async fn test_second_resolve_serves_cached_without_generating() {
        let cache = MemoryCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let resolution = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>("value".to_string())
            })
            .await
            .expect("resolve should succeed");
            assert_eq!(resolution.into_value().as_deref(), Some("value"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1, "generator must run once");
    }

    #[tokio::test]
    async fn test_concurrent_resolve_yields_in_flight() {
        let cache = MemoryCache::default();
        let gate = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());

        let winner = {
            let cache = cache.clone();
            let gate = Arc::clone(&gate);
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                resolve(&cache, "key-1", OnExisting::RetryFailed, || async move {
                    started.notify_one();
                    gate.notified().await;
                    Ok::<_, TestError>("value".to_string())
                })
                .await
            })
        };

        // Wait until the winner holds the claim mid-generation.
        started.notified().await;

        let loser = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
            Err::<String, _>(TestError("loser must not generate".into()))
        })
        .await
        .expect("loser must not generate");
        assert!(matches!(loser, Resolution::InFlight));

        gate.notify_one();
        let won = winner.await.expect("no panic").expect("winner succeeds");
        assert!(won.is_fresh());

        // After completion the same key is a plain cache hit.
        let after = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
            Err::<String, _>(TestError("must not run".into()))
        })
        .await
        .expect("resolve should succeed");
        assert!(matches!(after, Resolution::Cached(_)));
    }

    #[tokio::test]
    async fn test_failure_marks_key_failed_and_surfaces_error() {
        let cache = MemoryCache::default();

        let err = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
            Err::<String, _>(TestError("upstream exploded".into()))
        })
        .await
        .expect_err("generation failure should surface");

        match err {
            ResolveError::Generation(e) => assert_eq!(e.to_string(), "boom: upstream exploded"),
            ResolveError::Cache(_) => panic!("expected a generation error"),
        }
        assert!(matches!(cache.entry("key-1"), Some(Entry::Failed(_))));
    }

    #[tokio::test]
    async fn test_retry_failed_retakes_a_failed_key() {
        let cache = MemoryCache::default();
        let calls = AtomicUsize::new(0);

        let _ = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(TestError("first try fails".into()))
        })
        .await;

        let resolution = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>("second try".to_string())
        })
        .await
        .expect("retry should succeed");

        assert!(resolution.is_fresh());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(cache.entry("key-1"), Some(Entry::Completed(_))));
    }

    #[tokio::test]
    async fn test_skip_policy_blocks_failed_keys() {
        let cache = MemoryCache::default();

        let _ = resolve(&cache, "key-1", OnExisting::Skip, || async {
            Err::<String, _>(TestError("fails once".into()))
        })
        .await;

        let resolution = resolve(&cache, "key-1", OnExisting::Skip, || async {
            Err::<String, _>(TestError("must not regenerate".into()))
        })
        .await
        .expect("skip policy must not regenerate");

        assert!(matches!(resolution, Resolution::Skipped));
        assert!(matches!(cache.entry("key-1"), Some(Entry::Failed(_))));
    }

    /// Delegates to [`MemoryCache`] but refuses to persist completions.
    #[derive(Clone, Default)]
    struct BrokenCompleteCache {
        inner: MemoryCache,
    }

    impl ResultCache for BrokenCompleteCache {
        type Key = str;
        type Draft = String;
        type Stored = String;

        async fn claim(
            &self,
            key: &str,
            policy: OnExisting,
        ) -> Result<ClaimOutcome<String>, RepositoryError> {
            self.inner.claim(key, policy).await
        }

        async fn complete(&self, _key: &str, _draft: String) -> Result<String, RepositoryError> {
            Err(RepositoryError::Conflict("slug taken".to_string()))
        }

        async fn fail(&self, key: &str, error: &str) -> Result<(), RepositoryError> {
            self.inner.fail(key, error).await
        }
    }

    #[tokio::test]
    async fn test_complete_failure_releases_the_claim() {
        let cache = BrokenCompleteCache::default();

        let err = resolve(&cache, "key-1", OnExisting::RetryFailed, || async {
            Ok::<_, TestError>("value".to_string())
        })
        .await
        .expect_err("persist failure should surface");

        assert!(matches!(
            err,
            ResolveError::Cache(RepositoryError::Conflict(_))
        ));
        // The key must not be stuck in `processing`.
        assert!(matches!(cache.inner.entry("key-1"), Some(Entry::Failed(_))));
    }

    #[tokio::test]
    async fn test_skip_policy_still_serves_completed_results() {
        let cache = MemoryCache::default();

        let _ = resolve(&cache, "key-1", OnExisting::Skip, || async {
            Ok::<_, TestError>("value".to_string())
        })
        .await
        .expect("first resolve");

        let resolution = resolve(&cache, "key-1", OnExisting::Skip, || async {
            Err::<String, _>(TestError("must not run".into()))
        })
        .await
        .expect("resolve should succeed");

        assert!(matches!(resolution, Resolution::Cached(_)));
    }
}
