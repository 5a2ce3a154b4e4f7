//! User records and the deployment-declared attribute schema.
mod repository;

pub use repository::*;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, ServerError};

/// User as saved on database.
///
/// `id` is generated server-side at creation and never changes;
/// `attributes` is an open map whose keys are fixed per deployment
/// by [`Schema`]. Serialized flat: `{id, ...attributes}`.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct UserRecord {
    pub id: String,
    #[serde(flatten)]
    #[sqlx(json)]
    pub attributes: Map<String, Value>,
}

impl UserRecord {
    /// Read a string attribute, e.g. the one mirrored as the identity
    /// provider username.
    pub fn attribute_str(&self, field: &str) -> Result<&str, ServerError> {
        self.attributes
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ServerError::Schema(vec![FieldError::new(
                    field,
                    "Field must be a string.",
                )])
            })
    }
}

/// Fixed field set accepted for `attributes`, declared per deployment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<String>,
}

impl Schema {
    /// Check a submitted attribute map against the declared field set.
    ///
    /// Every declared field must be present and no undeclared key is
    /// accepted. Updates replace the whole document, so the same rule
    /// applies to creations and updates.
    pub fn validate(
        &self,
        attributes: &Map<String, Value>,
    ) -> Result<(), ServerError> {
        let mut errors = Vec::new();

        for field in &self.fields {
            if !attributes.contains_key(field) {
                errors.push(FieldError::new(field, "Missing required field."));
            }
        }

        for key in attributes.keys() {
            if !self.fields.iter().any(|field| field == key) {
                errors.push(FieldError::new(
                    key,
                    "Field is not declared in the deployment schema.",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Schema(errors))
        }
    }
}
