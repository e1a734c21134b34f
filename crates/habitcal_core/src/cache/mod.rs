//! Calendar rendering caches.
//!
//! # Responsibility
//! - Hold read-only copies of one month's records for O(1) cell lookups.
//! - Offer a mutex-guarded variant for callers that render and refresh on
//!   different threads.

pub mod record_cache;
pub mod shared;
