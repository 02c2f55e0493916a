//! qscale-state — queue-size history shared by all alert watchers.
//!
//! # Architecture
//!
//! ```text
//! PreviousSizeStore (Clone, one per process)
//!   ├── RwLock<HashMap<key, size>>      fast path, reads dominate
//!   ├── CacheService::get               fall-through on local miss
//!   └── mpsc → CacheWriter task         write-through, TTL 900s
//! ```
//!
//! The cache copy lets a restarted process pick up where the previous
//! one left off. Entries are never deleted: the cache TTL expires them
//! once no process keeps refreshing the key.

pub mod memory;
pub mod store;

pub use memory::MemoryCache;
pub use store::{CACHE_TTL, CacheWriterHandle, PreviousSizeStore};
