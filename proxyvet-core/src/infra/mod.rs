//! Store, ledger and lease adapters.

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::{InMemoryRunLease, InMemoryStore};
#[cfg(feature = "redis")]
pub use redis_store::{RedisRunLease, RedisScoreLedger, RedisStore, connect};
