//! Admin writes: create, update, delete, and lookup by id.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::listing::not_found;
use crate::error::{AppError, AppResult, StorageError};
use crate::storage::{
    CaseStudy, Inquiry, NewCaseStudy, NewInquiry, NewTestimonial, Record, RecordReader,
    RecordStore, SqliteStorage, Testimonial,
};

/// Authenticated admin identity, supplied by the auth layer and trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: String,
}

#[derive(Clone)]
pub struct MutationService {
    storage: SqliteStorage,
}

impl MutationService {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    /// Fetch one record of any kind.
    pub async fn get<R: Record>(&self, id: &str) -> AppResult<R> {
        self.storage
            .find_by_id::<R>(id)
            .await?
            .ok_or_else(|| not_found::<R>(id))
    }

    /// Apply the fields present in `patch` and return the updated record.
    pub async fn update<R: Record>(
        &self,
        principal: &Principal,
        id: &str,
        patch: &R::Patch,
    ) -> AppResult<R> {
        let updated = self
            .storage
            .update::<R>(id, patch)
            .await?
            .ok_or_else(|| not_found::<R>(id))?;

        info!(
            entity = R::ENTITY,
            id = %id,
            principal = %principal.id,
            role = %principal.role,
            "Record updated"
        );
        Ok(updated)
    }

    /// Delete one record.
    pub async fn delete<R: Record>(&self, principal: &Principal, id: &str) -> AppResult<()> {
        if !self.storage.delete::<R>(id).await? {
            return Err(not_found::<R>(id));
        }

        info!(
            entity = R::ENTITY,
            id = %id,
            principal = %principal.id,
            role = %principal.role,
            "Record deleted"
        );
        Ok(())
    }

    /// Store a public contact-form submission.
    pub async fn submit_inquiry(&self, inquiry: &NewInquiry) -> AppResult<Inquiry> {
        let created = self.storage.insert(inquiry).await?;
        info!(
            id = %created.id,
            project_type = %created.project_type,
            source = %created.source,
            "Inquiry submitted"
        );
        Ok(created)
    }

    pub async fn create_case_study(
        &self,
        principal: &Principal,
        study: &NewCaseStudy,
    ) -> AppResult<CaseStudy> {
        let created = self.storage.insert(study).await?;
        info!(
            id = %created.id,
            principal = %principal.id,
            "Case study created"
        );
        Ok(created)
    }

    /// Create a testimonial. A referenced case study must exist when the
    /// insert commits.
    pub async fn create_testimonial(
        &self,
        principal: &Principal,
        testimonial: &NewTestimonial,
    ) -> AppResult<Testimonial> {
        let created = match self.storage.insert(testimonial).await {
            Ok(created) => created,
            Err(StorageError::MissingReference { column, id }) => {
                return Err(AppError::invalid_value(
                    column,
                    format!("no case study with id {}", id),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            id = %created.id,
            rating = %created.rating,
            principal = %principal.id,
            "Testimonial created"
        );
        Ok(created)
    }
}
