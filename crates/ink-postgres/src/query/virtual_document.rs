//! Virtual document repository.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use jiff::Timestamp;

use crate::model::{NewVirtualDocument, VirtualDocument};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for tool-synthesised documents.
pub trait VirtualDocumentRepository {
    /// Creates a virtual document, or refreshes its title and metadata
    /// when the composite id already exists.
    fn upsert_virtual_document(
        &mut self,
        document: NewVirtualDocument,
    ) -> impl Future<Output = PgResult<VirtualDocument>> + Send;

    /// Finds a virtual document by its composite id.
    fn find_virtual_document(
        &mut self,
        document_id: &str,
    ) -> impl Future<Output = PgResult<Option<VirtualDocument>>> + Send;

    /// Bumps the document's `updated_at` after membership changes.
    fn touch_virtual_document(
        &mut self,
        document_id: &str,
    ) -> impl Future<Output = PgResult<()>> + Send;
}

impl VirtualDocumentRepository for PgConnection {
    async fn upsert_virtual_document(
        &mut self,
        document: NewVirtualDocument,
    ) -> PgResult<VirtualDocument> {
        use schema::virtual_documents::{self, dsl};

        let now: jiff_diesel::Timestamp = Timestamp::now().into();

        let stored = diesel::insert_into(virtual_documents::table)
            .values(&document)
            .on_conflict(dsl::document_id)
            .do_update()
            .set((
                dsl::title.eq(&document.title),
                dsl::metadata.eq(&document.metadata),
                dsl::updated_at.eq(now),
            ))
            .returning(VirtualDocument::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(stored)
    }

    async fn find_virtual_document(
        &mut self,
        document_id: &str,
    ) -> PgResult<Option<VirtualDocument>> {
        use schema::virtual_documents::{self, dsl};

        let document = virtual_documents::table
            .filter(dsl::document_id.eq(document_id))
            .select(VirtualDocument::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(document)
    }

    async fn touch_virtual_document(&mut self, document_id: &str) -> PgResult<()> {
        use schema::virtual_documents::{self, dsl};

        let now: jiff_diesel::Timestamp = Timestamp::now().into();
        diesel::update(virtual_documents::table.filter(dsl::document_id.eq(document_id)))
            .set(dsl::updated_at.eq(now))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(())
    }
}
