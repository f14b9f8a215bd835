//! Pet and breed repositories backing the pet listing screen.

use std::sync::Arc;

use tracing::{debug, error};

use super::decode_all;
use crate::db::{DocumentStore, Predicate, StoreError, StoreResult};
use crate::models::{Breed, Pet, ValidationError};

pub const FIELD_RACA: &str = "raca";

/// Read access to the pets collection.
#[derive(Clone)]
pub struct PetRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl PetRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Every pet.
    pub async fn list_all(&self) -> StoreResult<Vec<Pet>> {
        self.query(&[]).await.inspect_err(|e| {
            error!(error = %e, "failed to list pets");
        })
    }

    /// Pets of the given breed (exact name match). A blank name is rejected.
    pub async fn by_breed(&self, raca: &str) -> StoreResult<Vec<Pet>> {
        if raca.trim().is_empty() {
            return Err(StoreError::InvalidInput(ValidationError::BlankBreed.to_string()));
        }

        debug!(raca, "filtering pets by breed");
        self.query(&[Predicate::eq(FIELD_RACA, raca)])
            .await
            .inspect_err(|e| error!(error = %e, raca, "failed to filter pets by breed"))
    }

    async fn query(&self, predicates: &[Predicate]) -> StoreResult<Vec<Pet>> {
        let docs = self.store.query(&self.collection, predicates).await?;
        Ok(decode_all(docs))
    }
}

/// Read access to the breeds collection.
#[derive(Clone)]
pub struct BreedRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl BreedRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Every breed.
    pub async fn list_all(&self) -> StoreResult<Vec<Breed>> {
        let docs = self
            .store
            .query(&self.collection, &[])
            .await
            .inspect_err(|e| error!(error = %e, "failed to list breeds"))?;
        Ok(decode_all(docs))
    }
}
