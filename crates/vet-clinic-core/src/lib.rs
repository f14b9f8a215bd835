//! Vet Clinic Core Library
//!
//! Data-access layer of the veterinary clinic admin: appointments
//! ("Consultas"), pets and breeds kept in a document store.
//!
//! # Architecture
//!
//! ```text
//!   Admin screens (list / filter / create / edit / delete)
//!                         │
//!                         ▼
//!                  ┌─────────────┐
//!                  │   Clinic    │  opens the store from ClinicConfig
//!                  └──────┬──────┘
//!           ┌─────────────┼──────────────┐
//!           ▼             ▼              ▼
//!     Appointment        Pet           Breed
//!     Repository      Repository     Repository
//!       │    ▲
//!       │    └── DayRange (day bounds for date filters)
//!       ▼
//!  ┌───────────────────────────────────────────┐
//!  │  DocumentStore: MemoryStore | SqliteStore │
//!  └───────────────────────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **A veterinarian has at most one appointment per instant.** Creates and
//! updates check the `(veterinario, data)` slot before writing; with the
//! default [`ConflictPolicy::Atomic`] the store performs check and write as
//! one step.
//!
//! # Modules
//!
//! - [`db`]: document-store boundary and the memory/SQLite stores
//! - [`models`]: domain types and the `ResponseApi` envelope
//! - [`day_range`]: calendar-day bounds for date filters
//! - [`repository`]: appointment, pet and breed repositories
//! - [`config`]: store backend, collection names, conflict policy

pub mod config;
pub mod day_range;
pub mod db;
pub mod models;
pub mod repository;

// Re-export commonly used types
pub use config::{ClinicConfig, ConflictConfig, ConflictPolicy, StoreConfig, UpdateScope};
pub use day_range::{DayRange, EndBound};
pub use db::{DocumentStore, MemoryStore, SqliteStore, StoreError, StoreResult};
pub use models::{
    Appointment, AppointmentBody, AppointmentFilter, Breed, CreatedId, NamedRef, Pet, ResponseApi,
};
pub use repository::{AppointmentRepository, BreedRepository, PetRepository};

use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Open the store described by `config`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, ClinicError> {
    let store: Arc<dyn DocumentStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
    };
    Ok(store)
}

/// Entry point for the admin screens: one store, one repository per collection.
#[derive(Clone)]
pub struct Clinic {
    store: Arc<dyn DocumentStore>,
    config: ClinicConfig,
}

impl Clinic {
    /// Open the configured store.
    pub fn open(config: ClinicConfig) -> Result<Self, ClinicError> {
        let store = open_store(&config.store)?;
        Ok(Self::with_store(store, config))
    }

    /// Load configuration from a JSON file and open its store.
    pub fn from_config_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ClinicError> {
        Self::open(ClinicConfig::load(path)?)
    }

    /// Use an already opened store.
    pub fn with_store(store: Arc<dyn DocumentStore>, config: ClinicConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    pub fn appointments(&self) -> AppointmentRepository {
        AppointmentRepository::new(
            self.store(),
            self.config.collections.appointments.clone(),
            self.config.conflicts,
        )
    }

    pub fn pets(&self) -> PetRepository {
        PetRepository::new(self.store(), self.config.collections.pets.clone())
    }

    pub fn breeds(&self) -> BreedRepository {
        BreedRepository::new(self.store(), self.config.collections.breeds.clone())
    }
}
