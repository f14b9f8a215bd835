//! Repositories translating admin-screen actions into document-store calls.
//!
//! - [`AppointmentRepository`]: appointment lookups, search and
//!   conflict-checked writes, answered with [`ResponseApi`](crate::models::ResponseApi)
//! - [`PetRepository`] / [`BreedRepository`]: read side of the pet listing

mod appointments;
mod pets;

pub use appointments::*;
pub use pets::*;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::db::{Document, StoreResult};

fn decode<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(doc.into_value())?)
}

/// Decode a listing, skipping documents that do not fit the read model.
///
/// Collections are schema-less and other writers may leave records without
/// the typed fields; one such record must not hide the rest.
fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            decode(doc)
                .inspect_err(|e| warn!(error = %e, id = %id, "skipping undecodable document"))
                .ok()
        })
        .collect()
}
