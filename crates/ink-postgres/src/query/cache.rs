//! Search cache repository.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use jiff::Timestamp;

use crate::model::{NewSearchCacheEntry, SearchCacheEntry};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for the fingerprinted search cache.
///
/// Entries are matched for invalidation in the service layer (the
/// conservative domain-intersection rule needs the deserialised params);
/// this trait provides the raw reads, upserts and deletions.
pub trait SearchCacheRepository {
    /// Finds an unexpired entry and bumps its hit count.
    fn find_cache_entry(
        &mut self,
        fingerprint: &str,
    ) -> impl Future<Output = PgResult<Option<SearchCacheEntry>>> + Send;

    /// Inserts or replaces a cache entry.
    fn store_cache_entry(
        &mut self,
        entry: NewSearchCacheEntry,
    ) -> impl Future<Output = PgResult<()>> + Send;

    /// Lists the fingerprint and params of every live entry.
    fn list_cache_params(
        &mut self,
    ) -> impl Future<Output = PgResult<Vec<(String, serde_json::Value)>>> + Send;

    /// Deletes the entries with the given fingerprints.
    fn delete_cache_entries(
        &mut self,
        fingerprints: &[String],
    ) -> impl Future<Output = PgResult<usize>> + Send;

    /// Deletes every entry.
    fn clear_cache(&mut self) -> impl Future<Output = PgResult<usize>> + Send;

    /// Deletes entries that expired at or before `now`.
    fn evict_expired_cache_entries(
        &mut self,
        now: Timestamp,
    ) -> impl Future<Output = PgResult<usize>> + Send;
}

impl SearchCacheRepository for PgConnection {
    async fn find_cache_entry(&mut self, fingerprint: &str) -> PgResult<Option<SearchCacheEntry>> {
        use schema::search_cache::{self, dsl};

        let now: jiff_diesel::Timestamp = Timestamp::now().into();

        let entry: Option<SearchCacheEntry> = search_cache::table
            .filter(dsl::fingerprint.eq(fingerprint))
            .filter(dsl::expires_at.gt(now))
            .select(SearchCacheEntry::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        if entry.is_some() {
            diesel::update(search_cache::table.filter(dsl::fingerprint.eq(fingerprint)))
                .set(dsl::hit_count.eq(dsl::hit_count + 1))
                .execute(self)
                .await
                .map_err(PgError::from)?;
        }

        Ok(entry)
    }

    async fn store_cache_entry(&mut self, entry: NewSearchCacheEntry) -> PgResult<()> {
        use schema::search_cache::{self, dsl};

        let now: jiff_diesel::Timestamp = Timestamp::now().into();

        diesel::insert_into(search_cache::table)
            .values(&entry)
            .on_conflict(dsl::fingerprint)
            .do_update()
            .set((
                dsl::params.eq(&entry.params),
                dsl::chunk_ids.eq(&entry.chunk_ids),
                dsl::result_count.eq(entry.result_count),
                dsl::created_at.eq(now),
                dsl::expires_at.eq(entry.expires_at),
                dsl::hit_count.eq(0),
            ))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(())
    }

    async fn list_cache_params(&mut self) -> PgResult<Vec<(String, serde_json::Value)>> {
        use schema::search_cache::{self, dsl};

        let rows = search_cache::table
            .select((dsl::fingerprint, dsl::params))
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(rows)
    }

    async fn delete_cache_entries(&mut self, fingerprints: &[String]) -> PgResult<usize> {
        use schema::search_cache::{self, dsl};

        if fingerprints.is_empty() {
            return Ok(0);
        }

        let affected =
            diesel::delete(search_cache::table.filter(dsl::fingerprint.eq_any(fingerprints)))
                .execute(self)
                .await
                .map_err(PgError::from)?;

        Ok(affected)
    }

    async fn clear_cache(&mut self) -> PgResult<usize> {
        use schema::search_cache;

        let affected = diesel::delete(search_cache::table)
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(affected)
    }

    async fn evict_expired_cache_entries(&mut self, now: Timestamp) -> PgResult<usize> {
        use schema::search_cache::{self, dsl};

        let now: jiff_diesel::Timestamp = now.into();
        let affected = diesel::delete(search_cache::table.filter(dsl::expires_at.le(now)))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(affected)
    }
}
