//! Appointment ("Consulta") models.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Keys owned by the typed part of an appointment; extra fields may not reuse them.
pub const RESERVED_FIELDS: [&str; 4] = ["id", "veterinario", "pet", "data"];

/// Rejections raised before a body reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("veterinarian is required")]
    BlankVeterinarian,

    #[error("field {0} is reserved")]
    ReservedField(String),

    #[error("breed name is required")]
    BlankBreed,
}

/// Writable content of an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentBody {
    /// Attending veterinarian
    pub veterinario: String,
    /// Patient reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet: Option<String>,
    /// When the appointment happens, stored as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub data: DateTime<Utc>,
    /// Free-form fields supplied by the admin screens
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppointmentBody {
    /// Create a body with the required fields.
    pub fn new(veterinario: impl Into<String>, data: DateTime<Utc>) -> Self {
        Self {
            veterinario: veterinario.into(),
            pet: None,
            data,
            extra: Map::new(),
        }
    }

    pub fn with_pet(mut self, pet: impl Into<String>) -> Self {
        self.pet = Some(pet.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Check required fields and reserved keys.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.veterinario.trim().is_empty() {
            return Err(ValidationError::BlankVeterinarian);
        }
        if let Some(key) = RESERVED_FIELDS.iter().find(|k| self.extra.contains_key(**k)) {
            return Err(ValidationError::ReservedField(key.to_string()));
        }
        Ok(())
    }

    /// Store representation of the body.
    pub fn to_fields(&self) -> serde_json::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(serde::ser::Error::custom("appointment body is not an object")),
        }
    }
}

/// A stored appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Store-assigned identifier
    pub id: String,
    #[serde(flatten)]
    pub body: AppointmentBody,
}

/// Criteria for the appointment search. Every criterion given must hold.
#[derive(Debug, Clone)]
pub struct AppointmentFilter<Tz: TimeZone = Local> {
    /// Attending veterinarian
    pub veterinario: Option<String>,
    /// Patient reference
    pub pet: Option<String>,
    /// Any instant within the wanted calendar day
    pub data: Option<DateTime<Tz>>,
}

impl<Tz: TimeZone> Default for AppointmentFilter<Tz> {
    fn default() -> Self {
        Self {
            veterinario: None,
            pet: None,
            data: None,
        }
    }
}

impl<Tz: TimeZone> AppointmentFilter<Tz> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn veterinario(mut self, veterinario: impl Into<String>) -> Self {
        self.veterinario = Some(veterinario.into());
        self
    }

    pub fn pet(mut self, pet: impl Into<String>) -> Self {
        self.pet = Some(pet.into());
        self
    }

    pub fn on_day(mut self, data: DateTime<Tz>) -> Self {
        self.data = Some(data);
        self
    }
}

/// `{id, nome}` projection used by selection lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedRef {
    pub id: String,
    #[serde(default)]
    pub nome: Option<String>,
}

/// Payload of a successful create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedId {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 13, 30, 0).unwrap()
    }

    #[test]
    fn test_body_serializes_flat_with_millis() {
        let body = AppointmentBody::new("Dra. Ana", sample_time())
            .with_pet("Rex")
            .with_field("motivo", "vacina");

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "veterinario": "Dra. Ana",
                "pet": "Rex",
                "data": 1_710_509_400_000i64,
                "motivo": "vacina"
            })
        );
    }

    #[test]
    fn test_appointment_deserializes_with_id_and_extras() {
        let appointment: Appointment = serde_json::from_value(json!({
            "id": "abc",
            "veterinario": "Dra. Ana",
            "data": 1_710_509_400_000i64,
            "observacoes": "retorno"
        }))
        .unwrap();

        assert_eq!(appointment.id, "abc");
        assert_eq!(appointment.body.pet, None);
        assert_eq!(appointment.body.data, sample_time());
        assert_eq!(appointment.body.extra.len(), 1);
        assert_eq!(appointment.body.extra["observacoes"], "retorno");
    }

    #[test]
    fn test_validate_requires_veterinarian() {
        let body = AppointmentBody::new("   ", sample_time());
        assert_eq!(body.validate(), Err(ValidationError::BlankVeterinarian));
    }

    #[test]
    fn test_validate_rejects_reserved_extra() {
        let body = AppointmentBody::new("Dra. Ana", sample_time()).with_field("id", "forged");
        assert_eq!(
            body.validate(),
            Err(ValidationError::ReservedField("id".into()))
        );
    }

    #[test]
    fn test_to_fields_omits_missing_pet() {
        let fields = AppointmentBody::new("Dra. Ana", sample_time())
            .to_fields()
            .unwrap();
        assert!(!fields.contains_key("pet"));
        assert_eq!(fields["data"], json!(1_710_509_400_000i64));
    }

    #[test]
    fn test_filter_builder() {
        let filter = AppointmentFilter::<Utc>::new()
            .veterinario("Dra. Ana")
            .on_day(sample_time());
        assert_eq!(filter.veterinario.as_deref(), Some("Dra. Ana"));
        assert!(filter.pet.is_none());
        assert_eq!(filter.data, Some(sample_time()));
    }
}
