//! Field predicates for document queries.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Fields, StoreError, StoreResult};

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
}

impl Operator {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Lt => "<",
            Operator::Gt => ">",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Gt => ordering == Ordering::Greater,
        }
    }
}

/// `(field, operator, value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Reject field names and values the stores cannot evaluate.
    pub fn validate(&self) -> StoreResult<()> {
        if !is_valid_field_name(&self.field) {
            return Err(StoreError::InvalidField(self.field.clone()));
        }
        match &self.value {
            Value::Array(_) | Value::Object(_) => {
                Err(StoreError::UnsupportedValue(self.field.clone()))
            }
            Value::Null if self.op != Operator::Eq => {
                Err(StoreError::UnsupportedValue(self.field.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Evaluate against a document body.
    ///
    /// Missing fields never match. Values of different JSON types never match.
    pub fn matches(&self, fields: &Fields) -> bool {
        fields
            .get(&self.field)
            .and_then(|stored| compare_values(stored, &self.value))
            .map(|ordering| self.op.accepts(ordering))
            .unwrap_or(false)
    }
}

/// Validate every predicate of a query.
pub fn validate_all(predicates: &[Predicate]) -> StoreResult<()> {
    predicates.iter().try_for_each(Predicate::validate)
}

/// True when every predicate matches.
pub fn matches_all(predicates: &[Predicate], fields: &Fields) -> bool {
    predicates.iter().all(|p| p.matches(fields))
}

fn is_valid_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Same-type comparison; `None` when the types differ or are not comparable.
fn compare_values(stored: &Value, wanted: &Value) -> Option<Ordering> {
    match (stored, wanted) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equality_on_strings() {
        let doc = body(json!({"veterinario": "Dra. Ana"}));
        assert!(Predicate::eq("veterinario", "Dra. Ana").matches(&doc));
        assert!(!Predicate::eq("veterinario", "Dr. Bruno").matches(&doc));
    }

    #[test]
    fn test_range_operators_on_numbers() {
        let doc = body(json!({"data": 1000}));
        assert!(Predicate::new("data", Operator::Gte, 1000).matches(&doc));
        assert!(Predicate::new("data", Operator::Lte, 1000).matches(&doc));
        assert!(!Predicate::new("data", Operator::Lt, 1000).matches(&doc));
        assert!(Predicate::new("data", Operator::Lt, 1001).matches(&doc));
        assert!(!Predicate::new("data", Operator::Gt, 1000).matches(&doc));
        assert!(Predicate::new("data", Operator::Gt, 999.5).matches(&doc));
    }

    #[test]
    fn test_mixed_types_never_match() {
        let doc = body(json!({"data": "1000"}));
        assert!(!Predicate::new("data", Operator::Gte, 0).matches(&doc));
        assert!(!Predicate::eq("data", 1000).matches(&doc));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let doc = body(json!({"pet": "Rex"}));
        assert!(!Predicate::eq("veterinario", "Dra. Ana").matches(&doc));
    }

    #[test]
    fn test_null_equality() {
        let doc = body(json!({"foto": null}));
        assert!(Predicate::eq("foto", Value::Null).matches(&doc));
    }

    #[test]
    fn test_validate_rejects_bad_fields_and_values() {
        assert!(matches!(
            Predicate::eq("$.data", 1).validate(),
            Err(StoreError::InvalidField(_))
        ));
        assert!(matches!(
            Predicate::eq("1abc", 1).validate(),
            Err(StoreError::InvalidField(_))
        ));
        assert!(matches!(
            Predicate::eq("tags", json!(["a"])).validate(),
            Err(StoreError::UnsupportedValue(_))
        ));
        assert!(matches!(
            Predicate::new("foto", Operator::Gt, Value::Null).validate(),
            Err(StoreError::UnsupportedValue(_))
        ));
        assert!(Predicate::eq("_data_2", 1).validate().is_ok());
    }

    #[test]
    fn test_operator_serde_spelling() {
        assert_eq!(serde_json::to_string(&Operator::Gte).unwrap(), "\">=\"");
        let op: Operator = serde_json::from_str("\"<\"").unwrap();
        assert_eq!(op, Operator::Lt);
    }
}
