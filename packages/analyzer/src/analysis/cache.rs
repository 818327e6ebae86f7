//! In-memory analysis cache with single-flight computation per key.
//!
//! Concurrent callers asking for the same key share one computation: the
//! first caller runs it, the others wait on a per-key `watch` channel and all
//! receive the same outcome. Failures are handed to every waiter but never
//! stored. A leader that is dropped mid-computation releases its marker, so
//! one of the waiters takes over instead of hanging.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::debug;

use crate::error::Result;
use crate::models::{AnalysisResult, Article};

type Outcome = Option<Result<AnalysisResult>>;

/// Cache key for an article: its identifier, or a content hash when the
/// article has none.
pub fn cache_key(article: &Article) -> String {
    if !article.arxiv_id().is_empty() {
        return article.arxiv_id().to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(article.title().as_bytes());
    hasher.update(b"\n");
    hasher.update(article.abstract_text().as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: AnalysisResult,
    pub inserted_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    in_flight: HashMap<String, watch::Receiver<Outcome>>,
}

impl CacheState {
    fn insert(&mut self, key: &str, result: AnalysisResult, capacity: Option<usize>) {
        if self.entries.contains_key(key) {
            self.order.retain(|k| k != key);
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
        self.order.push_back(key.to_string());

        if let Some(capacity) = capacity {
            while self.entries.len() > capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                debug!(key = %oldest, "evicted oldest cache entry");
            }
        }
    }
}

/// Explicitly constructed cache instance; owned by the analyzer.
pub struct AnalysisCache {
    capacity: Option<usize>,
    state: Mutex<CacheState>,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(None)
    }
}

enum Participant {
    Leader(watch::Sender<Outcome>),
    Waiter(watch::Receiver<Outcome>),
}

/// Removes the in-flight marker when the leader finishes or is dropped.
struct InFlightGuard<'a> {
    cache: &'a AnalysisCache,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.cache.lock().in_flight.remove(self.key);
    }
}

impl AnalysisCache {
    /// `capacity` of `None` means unbounded. When bounded, the oldest
    /// inserted entry is evicted first.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    // No code panics while holding the lock, so a poisoned state is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        self.lock().entries.get(key).map(|e| e.result.clone())
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    pub fn size(&self) -> usize {
        self.lock().entries.len()
    }

    /// Remove every stored entry and return how many there were.
    ///
    /// Computations already in flight are left alone and store their result
    /// when they finish.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let size = state.entries.len();
        state.entries.clear();
        state.order.clear();
        size
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Return the cached result for `key`, or run `compute` to produce it.
    ///
    /// At most one `compute` runs per key at any time; callers arriving while
    /// it runs await its outcome. With `force_refresh` a stored entry is
    /// ignored, but a computation already in flight is still joined.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        force_refresh: bool,
        compute: F,
    ) -> Result<AnalysisResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisResult>>,
    {
        let mut compute = Some(compute);

        loop {
            let role = {
                let mut state = self.lock();
                if !force_refresh {
                    if let Some(entry) = state.entries.get(key) {
                        debug!(key, "cache hit");
                        return Ok(entry.result.clone());
                    }
                }
                match state.in_flight.get(key) {
                    Some(rx) => Participant::Waiter(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        state.in_flight.insert(key.to_string(), rx);
                        Participant::Leader(tx)
                    }
                }
            };

            match role {
                Participant::Waiter(mut rx) => {
                    debug!(key, "awaiting in-flight analysis");
                    let shared = rx
                        .wait_for(|outcome| outcome.is_some())
                        .await
                        .ok()
                        .and_then(|outcome| (*outcome).clone());
                    match shared {
                        Some(outcome) => return outcome,
                        // Leader dropped without an outcome; try again.
                        None => continue,
                    }
                }
                Participant::Leader(tx) => {
                    let Some(compute) = compute.take() else {
                        continue;
                    };
                    let guard = InFlightGuard { cache: self, key };
                    let outcome = compute().await;

                    if let Ok(result) = &outcome {
                        self.lock().insert(key, result.clone(), self.capacity);
                    }
                    drop(guard);
                    // Waiters may all be gone already.
                    let _ = tx.send(Some(outcome.clone()));
                    return outcome;
                }
            }
        }
    }
}
