//! # proxyvet core
//!
//! Keeps a pool of proxy endpoints honest. Endpoints wait in a pending
//! queue, a pool of check workers validates them one by one, and a score
//! ledger moves each endpoint's score up or down in the verified pool.
//!
//! ## Overview
//!
//! - **Validation**: echo over HTTP and HTTPS through the endpoint, then
//!   content rules against configured targets ([`validation`]).
//! - **Store ports**: queue, sorted-set, ledger and lease traits
//!   ([`store`]) with Redis and in-memory adapters ([`infra`]).
//! - **Loops**: check workers, the eviction sweeper and the rebalancer
//!   ([`checker`]).
//!
//! ## Feature Flags
//!
//! - `redis` (default): Redis-backed store, ledger and lease.

pub mod checker;
pub mod domain;
pub mod error;
pub mod infra;
pub mod store;
pub mod validation;

pub use checker::{CheckerConfig, CheckerRuntime, RunMode};
pub use domain::{CheckEntry, Endpoint, RuleSpec, ScoreBounds};
pub use error::{CheckerError, Result};
