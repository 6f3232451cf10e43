//! Search cache with single-flight misses and conservative invalidation.

use std::collections::HashMap;
use std::sync::Arc;

use ink_postgres::model::NewSearchCacheEntry;
use ink_postgres::query::SearchCacheRepository;
use ink_postgres::types::VectorKind;
use ink_postgres::PgClient;
use jiff::{Span, Timestamp};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CacheConfig, EventBus, GatewayEvent, ServiceResult};
use crate::service::fingerprint;

/// Tracing target for cache operations.
const TRACING_TARGET: &str = "ink_server::service::cache";

/// Upper bound on tracked in-flight locks before stale ones are pruned.
const LOCK_MAP_PRUNE_THRESHOLD: usize = 1024;

/// The domain a write touches, for conservative cache invalidation.
///
/// Any cached search whose parameters intersect this domain is dropped;
/// a write carrying no domain information at all clears the whole cache.
#[derive(Debug, Clone, Default)]
pub struct WriteDomain {
    /// Tags attached to the written chunk.
    pub tags: Vec<Uuid>,
    /// The page the written chunk belongs to.
    pub page: Option<Uuid>,
    /// The written chunk's vector kind.
    pub kind: Option<VectorKind>,
}

impl WriteDomain {
    /// Returns whether the domain carries no information.
    fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.page.is_none() && self.kind.is_none()
    }
}

/// Fingerprinted search cache backed by the store's cache table.
///
/// Concurrent misses for the same fingerprint are serialised through
/// per-key async locks so exactly one backend ANN execution happens.
#[derive(Clone)]
pub struct SearchCache {
    pg: PgClient,
    config: CacheConfig,
    events: EventBus,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

/// A cached result set: ranked ids plus the result metadata stored with
/// the entry (scores, match types), keyed by the params document.
#[derive(Debug, Clone)]
pub struct CachedResults {
    /// Chunk ids in rank order.
    pub chunk_ids: Vec<Uuid>,
    /// Per-result metadata stored at population time.
    pub results_meta: Value,
}

impl SearchCache {
    /// Creates a new cache service.
    pub fn new(pg: PgClient, config: CacheConfig, events: EventBus) -> Self {
        Self {
            pg,
            config,
            events,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Computes the fingerprint of a canonicalised request document.
    pub fn fingerprint(params: &Value) -> String {
        fingerprint::fingerprint(params)
    }

    /// Returns the per-fingerprint single-flight lock.
    pub async fn lock_for(&self, fingerprint: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;

        if locks.len() > LOCK_MAP_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks
            .entry(fingerprint.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Looks up an unexpired entry.
    pub async fn lookup(&self, fingerprint: &str) -> ServiceResult<Option<CachedResults>> {
        let mut conn = self.pg.get_connection().await?;
        let Some(entry) = conn.find_cache_entry(fingerprint).await? else {
            return Ok(None);
        };

        tracing::debug!(
            target: TRACING_TARGET,
            fingerprint = %fingerprint,
            hits = entry.hit_count + 1,
            "cache hit"
        );

        let results_meta = entry
            .params
            .get("results")
            .cloned()
            .unwrap_or(Value::Array(vec![]));

        Ok(Some(CachedResults {
            chunk_ids: entry.chunk_ids,
            results_meta,
        }))
    }

    /// Stores a computed result set under its fingerprint.
    ///
    /// The params document persists both the canonical request (for
    /// invalidation matching) and the per-result metadata (so hits can
    /// reconstruct scores without re-running ANN).
    pub async fn store(
        &self,
        fingerprint: String,
        request: Value,
        chunk_ids: Vec<Uuid>,
        results_meta: Value,
    ) -> ServiceResult<()> {
        let result_count = chunk_ids.len() as i32;
        let expires_at = Timestamp::now()
            .checked_add(Span::new().seconds(self.config.ttl_default_secs as i64))
            .unwrap_or_else(|_| Timestamp::now());

        let entry = NewSearchCacheEntry {
            fingerprint,
            params: serde_json::json!({
                "request": request,
                "results": results_meta,
            }),
            chunk_ids,
            result_count,
            expires_at: expires_at.into(),
        };

        let mut conn = self.pg.get_connection().await?;
        conn.store_cache_entry(entry).await?;
        conn.evict_expired_cache_entries(Timestamp::now()).await?;

        Ok(())
    }

    /// Conservatively invalidates entries intersecting the write's domain.
    pub async fn invalidate_for_write(&self, domain: &WriteDomain) -> ServiceResult<usize> {
        let mut conn = self.pg.get_connection().await?;

        let removed = if domain.is_empty() {
            conn.clear_cache().await?
        } else {
            let entries = conn.list_cache_params().await?;
            let stale: Vec<String> = entries
                .into_iter()
                .filter(|(_, params)| domain_intersects(domain, params.get("request")))
                .map(|(fingerprint, _)| fingerprint)
                .collect();
            conn.delete_cache_entries(&stale).await?
        };

        if removed > 0 {
            tracing::debug!(
                target: TRACING_TARGET,
                entries = removed,
                "cache invalidated"
            );
            self.events.publish(GatewayEvent::CacheInvalidated { entries: removed });
        }

        Ok(removed)
    }
}

/// The conservative intersection rule.
///
/// An entry is stale when the write's tags overlap the request's tag
/// filters, the write's page appears in the request, or the request's
/// vector kind covers the write's kind. Requests without a recognisable
/// domain are always stale.
fn domain_intersects(domain: &WriteDomain, request: Option<&Value>) -> bool {
    let Some(request) = request.and_then(Value::as_object) else {
        return true;
    };

    let request_tags: Vec<String> = ["tags", "exclude_tags"]
        .iter()
        .filter_map(|key| request.get(*key))
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect();

    if !domain.tags.is_empty() {
        let written: Vec<String> = domain.tags.iter().map(Uuid::to_string).collect();
        if request_tags.iter().any(|t| written.contains(t)) {
            return true;
        }
    }

    if let Some(page) = domain.page {
        if request
            .get("page")
            .and_then(Value::as_str)
            .is_some_and(|p| p == page.to_string())
        {
            return true;
        }
    }

    let request_kind = request.get("vector_type").and_then(Value::as_str);
    match (domain.kind, request_kind) {
        // untyped requests and untyped writes both intersect everything
        (None, _) | (_, None) => true,
        (Some(kind), Some(requested)) => {
            requested == "all"
                || requested
                    == match kind {
                        VectorKind::Text => "text",
                        VectorKind::Image => "image",
                    }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tag_overlap_invalidates() {
        let tag = Uuid::now_v7();
        let domain = WriteDomain {
            tags: vec![tag],
            page: None,
            kind: Some(VectorKind::Text),
        };
        let request = json!({"tags": [tag.to_string()], "vector_type": "image"});

        assert!(domain_intersects(&domain, Some(&request)));
    }

    #[test]
    fn matching_kind_invalidates() {
        let domain = WriteDomain {
            tags: vec![],
            page: None,
            kind: Some(VectorKind::Image),
        };

        assert!(domain_intersects(&domain, Some(&json!({"vector_type": "image"}))));
        assert!(domain_intersects(&domain, Some(&json!({"vector_type": "all"}))));
        assert!(!domain_intersects(&domain, Some(&json!({"vector_type": "text"}))));
    }

    #[test]
    fn unrecognisable_requests_are_always_stale() {
        let domain = WriteDomain::default();
        assert!(domain_intersects(&domain, None));
        assert!(domain_intersects(&domain, Some(&json!("legacy"))));
    }

    #[test]
    fn page_match_invalidates() {
        let page = Uuid::now_v7();
        let domain = WriteDomain {
            tags: vec![],
            page: Some(page),
            kind: Some(VectorKind::Text),
        };
        let request = json!({"page": page.to_string(), "vector_type": "image"});

        assert!(domain_intersects(&domain, Some(&request)));
    }
}
