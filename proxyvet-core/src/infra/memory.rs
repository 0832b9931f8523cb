//! In-process adapters with the same semantics as the Redis ones, used by
//! the tests.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};

use crate::{
    domain::{CheckEntry, Endpoint, ScoreBounds},
    error::Result,
    store::{
        Clock, ProxyStore, RunLease, ScoreLedger, ScorePolicy, StepScorePolicy,
        SystemClock,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    queue: VecDeque<String>,
    pool: HashMap<Endpoint, i64>,
    details: HashMap<Endpoint, CheckEntry>,
    mutations: usize,
}

/// Pending queue, verified pool and score ledger held in one process.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    pushed: Arc<Notify>,
    bounds: ScoreBounds,
    policy: Arc<dyn ScorePolicy>,
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("InMemoryStore");
        debug.field("bounds", &self.bounds).field("policy", &self.policy);

        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("queued", &state.queue.len())
                    .field("pooled", &state.pool.len())
                    .field("mutations", &state.mutations);
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }

        debug.finish()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        let bounds = ScoreBounds::default();
        Self::new(bounds, Arc::new(StepScorePolicy::new(bounds.step)))
    }
}

impl InMemoryStore {
    pub fn new(bounds: ScoreBounds, policy: Arc<dyn ScorePolicy>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            pushed: Arc::new(Notify::new()),
            bounds,
            policy,
        }
    }

    /// Place endpoints straight into the verified pool. Not counted as a
    /// mutation.
    pub async fn seed_pool<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (Endpoint, i64)>,
    {
        let mut state = self.state.lock().await;
        for (endpoint, score) in entries {
            state.pool.insert(endpoint, score);
        }
    }

    /// Append a raw string to the pending queue without parsing it.
    pub async fn enqueue_raw(&self, raw: impl Into<String>) {
        self.state.lock().await.queue.push_back(raw.into());
        self.pushed.notify_waiters();
    }

    pub async fn queued(&self) -> Vec<String> {
        self.state.lock().await.queue.iter().cloned().collect()
    }

    pub async fn score(&self, endpoint: &Endpoint) -> Option<i64> {
        self.state.lock().await.pool.get(endpoint).copied()
    }

    pub async fn detail(&self, endpoint: &Endpoint) -> Option<CheckEntry> {
        self.state.lock().await.details.get(endpoint).cloned()
    }

    /// Number of write operations applied through the store and ledger
    /// ports.
    pub async fn mutation_count(&self) -> usize {
        self.state.lock().await.mutations
    }
}

#[async_trait]
impl ProxyStore for InMemoryStore {
    async fn pop_blocking(&self) -> Result<String> {
        loop {
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(raw) = self.state.lock().await.queue.pop_front() {
                return Ok(raw);
            }

            notified.await;
        }
    }

    async fn push_many(&self, endpoints: &[Endpoint]) -> Result<usize> {
        if endpoints.is_empty() {
            return Ok(0);
        }

        {
            let mut state = self.state.lock().await;
            state
                .queue
                .extend(endpoints.iter().map(|e| e.as_str().to_string()));
            state.mutations += 1;
        }
        self.pushed.notify_waiters();
        Ok(endpoints.len())
    }

    async fn queue_len(&self) -> Result<usize> {
        Ok(self.state.lock().await.queue.len())
    }

    async fn range_by_score(&self, lo: i64, hi: i64) -> Result<Vec<Endpoint>> {
        let state = self.state.lock().await;
        let mut hits: Vec<(i64, &Endpoint)> = state
            .pool
            .iter()
            .filter(|(_, score)| (lo..=hi).contains(*score))
            .map(|(endpoint, score)| (*score, endpoint))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));
        Ok(hits.into_iter().map(|(_, e)| e.clone()).collect())
    }

    async fn pool_count(&self) -> Result<usize> {
        Ok(self.state.lock().await.pool.len())
    }
}

#[async_trait]
impl ScoreLedger for InMemoryStore {
    async fn persist(&self, entry: &CheckEntry) -> Result<i64> {
        let delta = self.policy.delta(entry);
        let mut state = self.state.lock().await;

        let current = state.pool.get(&entry.endpoint).copied().unwrap_or(0);
        let score = self.bounds.clamp(current.saturating_add(delta));
        state.pool.insert(entry.endpoint.clone(), score);
        state.details.insert(entry.endpoint.clone(), entry.clone());
        state.mutations += 1;
        Ok(score)
    }

    async fn remove(&self, endpoints: &[Endpoint]) -> Result<usize> {
        if endpoints.is_empty() {
            return Ok(0);
        }

        let mut state = self.state.lock().await;
        let mut removed = 0;
        for endpoint in endpoints {
            if state.pool.remove(endpoint).is_some() {
                removed += 1;
            }
            state.details.remove(endpoint);
        }
        state.mutations += 1;
        Ok(removed)
    }
}

/// Lease map keyed by name, expiring against an injected clock.
pub struct InMemoryRunLease<C: Clock = SystemClock> {
    clock: Arc<C>,
    leases: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl<C: Clock> fmt::Debug for InMemoryRunLease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRunLease")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryRunLease<SystemClock> {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl<C: Clock> InMemoryRunLease<C> {
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            clock,
            leases: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> RunLease for InMemoryRunLease<C> {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = self.clock.now();
        let mut leases = self.leases.lock().await;

        if leases.get(key).is_some_and(|expires| *expires > now) {
            return Ok(false);
        }

        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        let expires = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        leases.insert(key.to_string(), expires);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManualClock;

    fn endpoint(raw: &str) -> Endpoint {
        Endpoint::parse(raw).expect("valid endpoint")
    }

    fn reachable(raw: &str, ok: bool) -> CheckEntry {
        let mut entry = CheckEntry::new(endpoint(raw));
        entry.http_ok = ok;
        entry
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let store = InMemoryStore::default();
        store
            .push_many(&[endpoint("a:1"), endpoint("b:2")])
            .await
            .expect("push");
        store.push_many(&[endpoint("c:3")]).await.expect("push");

        assert_eq!(store.queue_len().await.expect("len"), 3);
        assert_eq!(store.pop_blocking().await.expect("pop"), "a:1");
        assert_eq!(store.pop_blocking().await.expect("pop"), "b:2");
        assert_eq!(store.pop_blocking().await.expect("pop"), "c:3");
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let store = InMemoryStore::default();
        let popper = {
            let store = store.clone();
            tokio::spawn(async move { store.pop_blocking().await })
        };

        tokio::task::yield_now().await;
        assert!(!popper.is_finished());

        store.push_many(&[endpoint("late:80")]).await.expect("push");
        let popped = popper.await.expect("join").expect("pop");
        assert_eq!(popped, "late:80");
    }

    #[tokio::test]
    async fn ledger_clamps_scores_to_bounds() {
        let bounds = ScoreBounds::new(0, 30, 20).expect("bounds");
        let store = InMemoryStore::new(bounds, Arc::new(StepScorePolicy::new(20)));

        assert_eq!(store.persist(&reachable("p:1", true)).await.expect("persist"), 20);
        assert_eq!(store.persist(&reachable("p:1", true)).await.expect("persist"), 30);
        assert_eq!(store.persist(&reachable("p:1", false)).await.expect("persist"), 10);
        assert_eq!(store.persist(&reachable("p:1", false)).await.expect("persist"), 0);

        let detail = store.detail(&endpoint("p:1")).await.expect("detail stored");
        assert!(!detail.http_ok);
    }

    #[tokio::test]
    async fn range_and_remove() {
        let store = InMemoryStore::default();
        store
            .seed_pool([(endpoint("x:1"), 5), (endpoint("y:1"), -2), (endpoint("z:1"), 50)])
            .await;

        let low = store.range_by_score(-10, 5).await.expect("range");
        assert_eq!(low, vec![endpoint("y:1"), endpoint("x:1")]);

        let removed = store
            .remove(&[endpoint("y:1"), endpoint("missing:1")])
            .await
            .expect("remove");
        assert_eq!(removed, 1);
        assert_eq!(store.pool_count().await.expect("count"), 2);
        assert_eq!(store.mutation_count().await, 1);
    }

    #[tokio::test]
    async fn lease_expires_with_the_clock() {
        let clock = Arc::new(ManualClock::default());
        let lease = InMemoryRunLease::new(clock.clone());
        let ttl = Duration::from_secs(60);

        assert!(lease.try_acquire("rebalance", ttl).await.expect("acquire"));
        assert!(!lease.try_acquire("rebalance", ttl).await.expect("acquire"));
        assert!(lease.try_acquire("other", ttl).await.expect("acquire"));

        clock.advance(Duration::from_secs(59));
        assert!(!lease.try_acquire("rebalance", ttl).await.expect("acquire"));

        clock.advance(Duration::from_secs(1));
        assert!(lease.try_acquire("rebalance", ttl).await.expect("acquire"));
    }
}
