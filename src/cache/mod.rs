//! Cache Module
//!
//! Entry model, expiry index, and the storage contract behind the rule cache.

mod clock;
mod entry;
mod index;
mod memory;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{EntryId, RuleCacheEntry};
pub use index::ExpiryIndex;
pub use memory::MemoryEntryStore;
pub use stats::{CacheStats, StatsRecorder};
pub use store::{EntryStore, ExpiredEntry};

// == Public Constants ==
/// Maximum allowed rule type or key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024; // 1 MB
