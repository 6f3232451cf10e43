//! Search cache entry model.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::search_cache;

/// A cached search result set.
///
/// The fingerprint is a deterministic digest of the canonicalised search
/// parameters; the chunk id list is re-fetched fresh on every hit so cached
/// entries can never serve stale chunk bodies.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = search_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SearchCacheEntry {
    /// Deterministic request fingerprint.
    pub fingerprint: String,
    /// Canonicalised parameters for invalidation matching.
    pub params: serde_json::Value,
    /// Result chunk ids in rank order.
    pub chunk_ids: Vec<Uuid>,
    /// Number of results at population time.
    pub result_count: i32,
    /// When the entry was created.
    pub created_at: Timestamp,
    /// When the entry expires.
    pub expires_at: Timestamp,
    /// Number of hits served.
    pub hit_count: i32,
}

impl SearchCacheEntry {
    /// Returns whether the entry has expired at the given instant.
    pub fn is_expired_at(&self, now: jiff::Timestamp) -> bool {
        jiff::Timestamp::from(self.expires_at) <= now
    }
}

/// Data for inserting a cache entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = search_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSearchCacheEntry {
    /// Deterministic request fingerprint.
    pub fingerprint: String,
    /// Canonicalised parameters.
    pub params: serde_json::Value,
    /// Result chunk ids in rank order.
    pub chunk_ids: Vec<Uuid>,
    /// Number of results.
    pub result_count: i32,
    /// Expiry instant.
    pub expires_at: Timestamp,
}
