//! Uniform response envelope returned by the appointment repository.

use serde::{Deserialize, Serialize};

use crate::db::StoreError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Store failure echoed back to the (trusted, internal) caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Stable error label, see [`StoreError::kind`]
    pub kind: String,
    /// Error message
    pub message: String,
}

impl From<&StoreError> for ErrorDetail {
    fn from(error: &StoreError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Content of [`ResponseApi::data`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Payload<T> {
    Value(T),
    Error(ErrorDetail),
}

/// `{status, mensagem, data?}`: HTTP-style status, a message for the user and
/// an optional payload. Built fresh for every call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseApi<T> {
    pub status: u16,
    pub mensagem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload<T>>,
}

impl<T> ResponseApi<T> {
    pub fn with_value(status: u16, mensagem: impl Into<String>, value: T) -> Self {
        Self {
            status,
            mensagem: mensagem.into(),
            data: Some(Payload::Value(value)),
        }
    }

    pub fn without_data(status: u16, mensagem: impl Into<String>) -> Self {
        Self {
            status,
            mensagem: mensagem.into(),
            data: None,
        }
    }

    /// 500 carrying the store error.
    pub fn failure(mensagem: impl Into<String>, error: &StoreError) -> Self {
        Self {
            status: STATUS_INTERNAL_ERROR,
            mensagem: mensagem.into(),
            data: Some(Payload::Error(error.into())),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Successful payload, if any.
    pub fn value(&self) -> Option<&T> {
        match &self.data {
            Some(Payload::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self.data {
            Some(Payload::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Error payload of a failed call, if any.
    pub fn error(&self) -> Option<&ErrorDetail> {
        match &self.data {
            Some(Payload::Error(detail)) => Some(detail),
            _ => None,
        }
    }
}
