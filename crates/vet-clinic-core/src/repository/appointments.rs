//! Appointment repository.
//!
//! Every operation is a fresh call against the store; nothing is cached
//! between calls. Operations answering with a [`ResponseApi`] never return
//! errors: store failures are logged and folded into a 500 envelope.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use tracing::{debug, error, info, warn};

use super::{decode, decode_all};
use crate::config::{ConflictConfig, ConflictPolicy, UpdateScope};
use crate::day_range::DayRange;
use crate::db::{timestamp_value, DocumentStore, GuardedWrite, Predicate, StoreResult};
use crate::models::{
    Appointment, AppointmentBody, AppointmentFilter, CreatedId, NamedRef, ResponseApi,
    ValidationError, STATUS_BAD_REQUEST, STATUS_CREATED, STATUS_NOT_FOUND, STATUS_NO_CONTENT,
    STATUS_OK,
};

pub const FIELD_VETERINARIO: &str = "veterinario";
pub const FIELD_PET: &str = "pet";
pub const FIELD_DATA: &str = "data";

pub const MSG_FOUND: &str = "Consulta encontrada com sucesso!";
pub const MSG_NOT_FOUND: &str = "Consulta não encontrada!";
pub const MSG_FETCH_FAILED: &str = "Erro ao buscar consulta";
pub const MSG_DAY_FOUND: &str = "Consulta(s) encontrada(s) com sucesso!";
pub const MSG_DAY_NOT_FOUND: &str = "Nenhuma consulta encontrada para esse veterinário e data.";
pub const MSG_CREATED: &str = "Consulta adicionada com sucesso!";
pub const MSG_CREATE_FAILED: &str = "Erro ao adicionar consulta";
pub const MSG_UPDATED: &str = "Consulta alterada com sucesso!";
pub const MSG_UPDATE_FAILED: &str = "Erro ao alterar consulta";
pub const MSG_DELETED: &str = "Consulta excluída com sucesso!";
pub const MSG_DELETE_FAILED: &str = "Erro ao excluir consulta";
pub const MSG_CONFLICT: &str = "Já existe uma consulta agendada para esse veterinário nessa data.";
pub const MSG_INVALID: &str = "Dados da consulta inválidos";

/// Appointment data access over a [`DocumentStore`].
#[derive(Clone)]
pub struct AppointmentRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
    conflicts: ConflictConfig,
}

impl AppointmentRepository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        conflicts: ConflictConfig,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            conflicts,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// 200 with the appointment, 404 when absent, 500 on store failure.
    pub async fn get_by_id(&self, id: &str) -> ResponseApi<Appointment> {
        let result: StoreResult<Option<Appointment>> =
            match self.store.get_document(&self.collection, id).await {
                Ok(Some(doc)) => decode(doc).map(Some),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };

        match result {
            Ok(Some(appointment)) => ResponseApi::with_value(STATUS_OK, MSG_FOUND, appointment),
            Ok(None) => ResponseApi::without_data(STATUS_NOT_FOUND, MSG_NOT_FOUND),
            Err(e) => {
                error!(error = %e, id, "failed to fetch appointment");
                ResponseApi::failure(MSG_FETCH_FAILED, &e)
            }
        }
    }

    /// Appointments of one veterinarian within the calendar day of `data`,
    /// upper bound inclusive (23:59:59.999). 404 when there are none.
    pub async fn get_by_veterinarian_and_day<Tz: TimeZone>(
        &self,
        veterinario: &str,
        data: &DateTime<Tz>,
    ) -> ResponseApi<Vec<Appointment>> {
        let range = DayRange::inclusive(data);
        let mut predicates = vec![Predicate::eq(FIELD_VETERINARIO, veterinario)];
        predicates.extend(range.predicates(FIELD_DATA));
        debug!(veterinario, start = %range.start, end = %range.end, "querying appointments for day");

        match self.query(&predicates).await {
            Ok(appointments) if appointments.is_empty() => {
                ResponseApi::without_data(STATUS_NOT_FOUND, MSG_DAY_NOT_FOUND)
            }
            Ok(appointments) => ResponseApi::with_value(STATUS_OK, MSG_DAY_FOUND, appointments),
            Err(e) => {
                error!(error = %e, veterinario, "failed to fetch appointments for day");
                ResponseApi::failure(MSG_FETCH_FAILED, &e)
            }
        }
    }

    /// Appointments matching every criterion present in `filter`; the day
    /// criterion uses an exclusive upper bound. Empty criteria are ignored.
    pub async fn search<Tz: TimeZone>(
        &self,
        filter: &AppointmentFilter<Tz>,
    ) -> StoreResult<Vec<Appointment>> {
        let mut predicates = Vec::new();

        if let Some(veterinario) = filter.veterinario.as_deref().filter(|v| !v.is_empty()) {
            predicates.push(Predicate::eq(FIELD_VETERINARIO, veterinario));
        }
        if let Some(pet) = filter.pet.as_deref().filter(|p| !p.is_empty()) {
            predicates.push(Predicate::eq(FIELD_PET, pet));
        }
        if let Some(data) = &filter.data {
            predicates.extend(DayRange::exclusive(data).predicates(FIELD_DATA));
        }

        debug!(predicates = predicates.len(), "searching appointments");
        self.query(&predicates).await
    }

    /// Every appointment.
    pub async fn list_all(&self) -> StoreResult<Vec<Appointment>> {
        self.query(&[]).await.inspect_err(|e| {
            error!(error = %e, "failed to list appointments");
        })
    }

    /// `{id, nome}` of every appointment, for selection lists.
    pub async fn list_for_pet_view(&self) -> StoreResult<Vec<NamedRef>> {
        let docs = self
            .store
            .query(&self.collection, &[])
            .await
            .inspect_err(|e| error!(error = %e, "failed to list appointment names"))?;

        Ok(docs
            .into_iter()
            .map(|doc| NamedRef {
                nome: doc
                    .fields
                    .get("nome")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                id: doc.id,
            })
            .collect())
    }

    /// 201 with the new id; 400 when the veterinarian already has an
    /// appointment at exactly this instant or the body is invalid.
    pub async fn create(&self, body: &AppointmentBody) -> ResponseApi<CreatedId> {
        if let Err(e) = body.validate() {
            return invalid(e);
        }

        match self.try_create(body).await {
            Ok(GuardedWrite::Applied(id)) => {
                info!(id = %id, veterinario = %body.veterinario, "appointment created");
                ResponseApi::with_value(STATUS_CREATED, MSG_CREATED, CreatedId { id })
            }
            Ok(GuardedWrite::Conflict) => {
                warn!(veterinario = %body.veterinario, data = %body.data, "appointment slot taken");
                ResponseApi::without_data(STATUS_BAD_REQUEST, MSG_CONFLICT)
            }
            Err(e) => {
                error!(error = %e, "failed to create appointment");
                ResponseApi::failure(MSG_CREATE_FAILED, &e)
            }
        }
    }

    /// Merge `body` into appointment `id`. 400 when the slot is taken; with
    /// the default [`UpdateScope::IncludeSelf`] that includes the appointment
    /// itself, so re-saving an unchanged date is rejected.
    pub async fn update(&self, id: &str, body: &AppointmentBody) -> ResponseApi<()> {
        if let Err(e) = body.validate() {
            return invalid(e);
        }

        match self.try_update(id, body).await {
            Ok(GuardedWrite::Applied(())) => {
                info!(id, veterinario = %body.veterinario, "appointment updated");
                ResponseApi::without_data(STATUS_OK, MSG_UPDATED)
            }
            Ok(GuardedWrite::Conflict) => {
                warn!(id, veterinario = %body.veterinario, data = %body.data, "appointment slot taken");
                ResponseApi::without_data(STATUS_BAD_REQUEST, MSG_CONFLICT)
            }
            Err(e) => {
                error!(error = %e, id, "failed to update appointment");
                ResponseApi::failure(MSG_UPDATE_FAILED, &e)
            }
        }
    }

    /// 204, also when the id does not exist.
    pub async fn delete(&self, id: &str) -> ResponseApi<()> {
        match self.store.delete_document(&self.collection, id).await {
            Ok(()) => {
                info!(id, "appointment deleted");
                ResponseApi::without_data(STATUS_NO_CONTENT, MSG_DELETED)
            }
            Err(e) => {
                error!(error = %e, id, "failed to delete appointment");
                ResponseApi::failure(MSG_DELETE_FAILED, &e)
            }
        }
    }

    async fn query(&self, predicates: &[Predicate]) -> StoreResult<Vec<Appointment>> {
        let docs = self.store.query(&self.collection, predicates).await?;
        Ok(decode_all(docs))
    }

    async fn try_create(&self, body: &AppointmentBody) -> StoreResult<GuardedWrite<String>> {
        let fields = body.to_fields()?;
        let slot = slot_predicates(body);

        match self.conflicts.policy {
            ConflictPolicy::Atomic => self.store.insert_unique(&self.collection, fields, &slot).await,
            ConflictPolicy::Advisory => {
                if !self.store.query(&self.collection, &slot).await?.is_empty() {
                    return Ok(GuardedWrite::Conflict);
                }
                let id = self.store.insert_document(&self.collection, fields).await?;
                Ok(GuardedWrite::Applied(id))
            }
        }
    }

    async fn try_update(&self, id: &str, body: &AppointmentBody) -> StoreResult<GuardedWrite<()>> {
        let fields = body.to_fields()?;
        let slot = slot_predicates(body);
        let exclude_self = self.conflicts.update_scope == UpdateScope::ExcludeSelf;

        match self.conflicts.policy {
            ConflictPolicy::Atomic => {
                self.store
                    .update_unique(&self.collection, id, fields, &slot, exclude_self)
                    .await
            }
            ConflictPolicy::Advisory => {
                let taken = self
                    .store
                    .query(&self.collection, &slot)
                    .await?
                    .iter()
                    .any(|doc| !(exclude_self && doc.id == id));
                if taken {
                    return Ok(GuardedWrite::Conflict);
                }
                self.store.update_document(&self.collection, id, fields).await?;
                Ok(GuardedWrite::Applied(()))
            }
        }
    }
}

/// `veterinario == body.veterinario AND data == body.data`.
fn slot_predicates(body: &AppointmentBody) -> Vec<Predicate> {
    vec![
        Predicate::eq(FIELD_VETERINARIO, body.veterinario.as_str()),
        Predicate::eq(FIELD_DATA, timestamp_value(&body.data)),
    ]
}

fn invalid<T>(e: ValidationError) -> ResponseApi<T> {
    warn!(error = %e, "rejected appointment body");
    ResponseApi::without_data(STATUS_BAD_REQUEST, format!("{}: {}", MSG_INVALID, e))
}
