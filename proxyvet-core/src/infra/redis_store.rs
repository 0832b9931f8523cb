//! Redis adapters for the store, ledger and lease ports.
//!
//! The pending queue is a list (`RPUSH`/`BLPOP`), the verified pool a
//! sorted set keyed by endpoint, and the latest outcome of each endpoint a
//! JSON string under its detail key.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use redis::{
    AsyncCommands, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    domain::{CheckEntry, Endpoint, ScoreBounds},
    error::Result,
    store::{ProxyStore, RunLease, ScoreLedger, ScorePolicy, StoreKeys},
};

mod scripts {
    use redis::Script;

    /// Clamped `ZINCRBY` plus detail write.
    ///
    /// KEYS: pool, detail. ARGV: member, delta, min, max, detail json.
    pub(super) fn apply_delta() -> Script {
        Script::new(
            r#"
            local current = tonumber(redis.call('ZSCORE', KEYS[1], ARGV[1])) or 0
            local score = current + tonumber(ARGV[2])
            local lo = tonumber(ARGV[3])
            local hi = tonumber(ARGV[4])

            if score < lo then score = lo end
            if score > hi then score = hi end

            redis.call('ZADD', KEYS[1], score, ARGV[1])
            redis.call('SET', KEYS[2], ARGV[5])
            return score
            "#,
        )
    }
}

/// Opens the multiplexed connection shared by non-blocking commands.
pub async fn connect(redis_url: &str) -> Result<(redis::Client, ConnectionManager)> {
    let client = redis::Client::open(redis_url)?;
    let conn = ConnectionManager::new(client.clone()).await?;
    info!("Successfully connected to Redis store");
    Ok((client, conn))
}

/// Pending queue and verified pool on Redis.
///
/// `BLPOP` never shares a connection with other traffic: each blocking pop
/// borrows a dedicated connection without a response timeout from a small
/// free list and returns it afterwards.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
    blocking: Arc<Mutex<Vec<ConnectionManager>>>,
    keys: StoreKeys,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("connection", &"ConnectionManager")
            .field("keys", &self.keys)
            .finish()
    }
}

impl RedisStore {
    pub fn new(
        client: redis::Client,
        conn: ConnectionManager,
        keys: StoreKeys,
    ) -> Self {
        Self {
            client,
            conn,
            blocking: Arc::new(Mutex::new(Vec::new())),
            keys,
        }
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    async fn blocking_connection(&self) -> Result<ConnectionManager> {
        if let Some(conn) = self.blocking.lock().await.pop() {
            return Ok(conn);
        }

        debug!("Opening dedicated Redis connection for blocking pops");
        let config = ConnectionManagerConfig::new().set_response_timeout(None);
        let conn =
            ConnectionManager::new_with_config(self.client.clone(), config)
                .await?;
        Ok(conn)
    }
}

#[async_trait]
impl ProxyStore for RedisStore {
    async fn pop_blocking(&self) -> Result<String> {
        let mut conn = self.blocking_connection().await?;

        loop {
            let popped: Option<(String, String)> =
                conn.blpop(&self.keys.queue, 0.0).await?;
            if let Some((_, endpoint)) = popped {
                self.blocking.lock().await.push(conn);
                return Ok(endpoint);
            }
        }
    }

    async fn push_many(&self, endpoints: &[Endpoint]) -> Result<usize> {
        if endpoints.is_empty() {
            return Ok(0);
        }

        let members: Vec<&str> = endpoints.iter().map(Endpoint::as_str).collect();
        let mut conn = self.conn.clone();
        let _: usize = conn.rpush(&self.keys.queue, members).await?;
        Ok(endpoints.len())
    }

    async fn queue_len(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(&self.keys.queue).await?)
    }

    async fn range_by_score(&self, lo: i64, hi: i64) -> Result<Vec<Endpoint>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> =
            conn.zrangebyscore(&self.keys.pool, lo, hi).await?;

        let mut endpoints = Vec::with_capacity(members.len());
        let mut malformed = Vec::new();
        for member in members {
            match Endpoint::parse(&member) {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(err) => {
                    warn!(
                        member = %member,
                        error = %err,
                        "dropping malformed pool member; re-seed it in host:port form"
                    );
                    malformed.push(member);
                }
            }
        }

        // Unparsable members are never checked or swept.
        if !malformed.is_empty() {
            let _: usize = conn.zrem(&self.keys.pool, &malformed).await?;
        }

        Ok(endpoints)
    }

    async fn pool_count(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        Ok(conn.zcard(&self.keys.pool).await?)
    }
}

/// Score ledger writing into the verified pool sorted set.
#[derive(Clone)]
pub struct RedisScoreLedger {
    conn: ConnectionManager,
    keys: StoreKeys,
    bounds: ScoreBounds,
    policy: Arc<dyn ScorePolicy>,
    script: Arc<Script>,
}

impl fmt::Debug for RedisScoreLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisScoreLedger")
            .field("keys", &self.keys)
            .field("bounds", &self.bounds)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RedisScoreLedger {
    pub fn new(
        conn: ConnectionManager,
        keys: StoreKeys,
        bounds: ScoreBounds,
        policy: Arc<dyn ScorePolicy>,
    ) -> Self {
        Self {
            conn,
            keys,
            bounds,
            policy,
            script: Arc::new(scripts::apply_delta()),
        }
    }
}

#[async_trait]
impl ScoreLedger for RedisScoreLedger {
    async fn persist(&self, entry: &CheckEntry) -> Result<i64> {
        let delta = self.policy.delta(entry);
        let detail = serde_json::to_string(entry)?;
        let mut conn = self.conn.clone();

        let score: i64 = self
            .script
            .key(&self.keys.pool)
            .key(self.keys.detail(&entry.endpoint))
            .arg(entry.endpoint.as_str())
            .arg(delta)
            .arg(self.bounds.min)
            .arg(self.bounds.max)
            .arg(detail)
            .invoke_async(&mut conn)
            .await?;

        debug!(endpoint = %entry.endpoint, delta, score, "score persisted");
        Ok(score)
    }

    async fn remove(&self, endpoints: &[Endpoint]) -> Result<usize> {
        if endpoints.is_empty() {
            return Ok(0);
        }

        let members: Vec<&str> = endpoints.iter().map(Endpoint::as_str).collect();
        let details: Vec<String> =
            endpoints.iter().map(|e| self.keys.detail(e)).collect();
        let mut conn = self.conn.clone();

        let (removed, _): (usize, usize) = redis::pipe()
            .atomic()
            .cmd("ZREM")
            .arg(&self.keys.pool)
            .arg(&members)
            .cmd("DEL")
            .arg(&details)
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }
}

/// Run lease backed by `SET key value NX PX ttl`.
#[derive(Clone)]
pub struct RedisRunLease {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisRunLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRunLease")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisRunLease {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RunLease for RedisRunLease {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();

        let stamped: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(Utc::now().to_rfc3339())
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(stamped.is_some())
    }
}
