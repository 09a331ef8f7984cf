//! Coordinate to zone-identifier resolution cache.
//!
//! Resolving a coordinate to an IANA zone identifier means a point-in-polygon
//! search over the time zone boundary data, which is far too expensive to
//! repeat for every timestamp that needs formatting. This module memoizes the
//! mapping per rounded coordinate and coalesces concurrent misses: when
//! multiple callers ask for the same uncached coordinate simultaneously, only
//! one lookup runs and every caller receives its result.
//!
//! # Architecture
//!
//! ```text
//! Caller A ─┐
//!           │                             Zone Identifier
//! Caller B ─┼──► ZoneResolver ──────────► Lookup (tzf)
//!           │        │                         │
//! Caller C ─┘        │                         │
//!                    ▼                         ▼
//!              [A, B, C all               [One lookup]
//!               receive same                   │
//!               zone id]◄─────────────────────┘
//! ```
//!
//! A cache entry moves through `Absent → Pending → Resolved`, except on
//! lookup failure, where the entry is removed again before the error reaches
//! any waiter. A failure is therefore never cached and the next call for the
//! same coordinate retries from scratch.
//!
//! # Implementation
//!
//! Uses `DashMap` for lock-free concurrent access to the key→entry mapping;
//! each pending entry carries a `tokio::sync::broadcast` channel that fans
//! the single outcome out to all waiters. Statistics use atomic counters.

mod cache;
mod lookup;
mod types;

pub use cache::ZoneResolver;
pub use lookup::{TzfLookup, ZoneLookup};
pub use types::{ResolveError, ResolverStats};
