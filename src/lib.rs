//! Rule Cache - A TTL cache for precomputed decision-support rules
//!
//! Stores opaque rule payloads keyed by `(rule_type, key)`, coalesces
//! concurrent misses into a single Producer call, and sweeps expired entries
//! in the background.

pub mod cache;
pub mod config;
pub mod error;
pub mod producer;
pub mod service;
pub mod tasks;

pub use cache::{EntryId, EntryStore, MemoryEntryStore, RuleCacheEntry};
pub use config::{ComputeMode, Config};
pub use error::{Result, RuleCacheError};
pub use producer::{Computed, FnProducer, Producer, StaticProducer};
pub use service::{ReapReport, RuleCacheService, ServiceOptions};
pub use tasks::spawn_reaper_task;
