//! Pet and breed models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A pet registered at the clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    /// Store-assigned identifier
    pub id: String,
    /// Pet name
    #[serde(default)]
    pub nome: String,
    /// Breed name, matching [`Breed::nome`]
    #[serde(default)]
    pub raca: Option<String>,
    /// Owner name
    #[serde(default)]
    pub dono: Option<String>,
    /// Photo URL
    #[serde(default)]
    pub foto: Option<String>,
    /// Any other stored fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pet {
    /// Photo to display, falling back to the given placeholder.
    pub fn photo_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.foto
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(placeholder)
    }
}

/// A breed ("raça") offered in the pet filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Breed {
    /// Store-assigned identifier
    pub id: String,
    /// Display name, also the value stored in [`Pet::raca`]
    pub nome: String,
}
