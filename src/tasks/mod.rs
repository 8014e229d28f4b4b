//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Reaper: sweeps entries that expired more than the grace period ago

mod reaper;

pub use reaper::spawn_reaper_task;
