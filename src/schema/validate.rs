// Boundary validation against entity descriptors.
//
// Payloads are checked before anything touches the database: unknown fields
// are rejected outright, and every accepted value is known to bind cleanly
// to its column type.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{EntityKind, FieldSpec, FieldType};

/// One field-level validation failure, serialized into error `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Validates a create payload and returns the accepted fields.
///
/// Requires every `required` field, rejects unknown fields, and type-checks
/// everything else. Fields with database defaults may simply be absent.
pub fn validate_create(
    kind: EntityKind,
    payload: &Value,
) -> Result<Map<String, Value>, Vec<FieldError>> {
    let object = as_object(payload)?;
    let descriptor = kind.descriptor();
    let mut errors = Vec::new();
    let mut accepted = Map::new();

    for (name, value) in object {
        match descriptor.field(name) {
            None => errors.push(FieldError::new(name, "unknown field")),
            Some(spec) => match check_value(spec, value) {
                Ok(()) => {
                    accepted.insert(name.clone(), value.clone());
                }
                Err(error) => errors.push(error),
            },
        }
    }

    for spec in descriptor.fields {
        if spec.required && !object.contains_key(spec.name) {
            errors.push(FieldError::new(spec.name, "this field is required"));
        }
    }

    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(errors)
    }
}

/// Validates a partial-update payload and returns the accepted fields.
///
/// Only `updatable` fields pass; create-only fields are refused like any
/// other non-whitelisted name. An empty payload is an error, not a no-op.
pub fn validate_update(
    kind: EntityKind,
    payload: &Value,
) -> Result<Map<String, Value>, Vec<FieldError>> {
    let object = as_object(payload)?;
    if object.is_empty() {
        return Err(vec![FieldError::new("body", "no fields provided")]);
    }

    let descriptor = kind.descriptor();
    let mut errors = Vec::new();
    let mut accepted = Map::new();

    for (name, value) in object {
        match descriptor.field(name) {
            None => errors.push(FieldError::new(name, "unknown field")),
            Some(spec) if !spec.updatable => {
                errors.push(FieldError::new(name, "field cannot be updated"));
            }
            Some(spec) => match check_value(spec, value) {
                Ok(()) => {
                    accepted.insert(name.clone(), value.clone());
                }
                Err(error) => errors.push(error),
            },
        }
    }

    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(errors)
    }
}

/// Parses a path parameter that must be a UUID.
pub fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, FieldError> {
    Uuid::parse_str(raw).map_err(|_| FieldError::new(field, format!("invalid UUID '{raw}'")))
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, Vec<FieldError>> {
    payload
        .as_object()
        .ok_or_else(|| vec![FieldError::new("body", "expected a JSON object")])
}

fn check_value(spec: &FieldSpec, value: &Value) -> Result<(), FieldError> {
    if value.is_null() {
        if spec.nullable {
            return Ok(());
        }
        return Err(FieldError::new(spec.name, "must not be null"));
    }

    match spec.kind {
        FieldType::Text { min, max } => {
            let text = as_string(spec, value)?;
            let length = text.chars().count() as u32;
            if let Some(min) = min {
                if length < min {
                    return Err(FieldError::new(
                        spec.name,
                        format!("must be at least {min} characters"),
                    ));
                }
            }
            if let Some(max) = max {
                if length > max {
                    return Err(FieldError::new(
                        spec.name,
                        format!("must be at most {max} characters"),
                    ));
                }
            }
            Ok(())
        }
        FieldType::Email => {
            let text = as_string(spec, value)?;
            if valid_email(text) {
                Ok(())
            } else {
                Err(FieldError::new(spec.name, "must be a valid email address"))
            }
        }
        FieldType::Uuid => {
            let text = as_string(spec, value)?;
            Uuid::parse_str(text)
                .map(|_| ())
                .map_err(|_| FieldError::new(spec.name, "must be a valid UUID"))
        }
        FieldType::Date => {
            let text = as_string(spec, value)?;
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| FieldError::new(spec.name, "must be a date in YYYY-MM-DD form"))
        }
        FieldType::Enum(options) => {
            let text = as_string(spec, value)?;
            if options.contains(&text) {
                Ok(())
            } else {
                Err(FieldError::new(
                    spec.name,
                    format!("must be one of: {}", options.join(", ")),
                ))
            }
        }
    }
}

fn as_string<'v>(spec: &FieldSpec, value: &'v Value) -> Result<&'v str, FieldError> {
    value
        .as_str()
        .ok_or_else(|| FieldError::new(spec.name, "must be a string"))
}

fn valid_email(text: &str) -> bool {
    let mut parts = text.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}
