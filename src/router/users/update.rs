//! Replace the attributes of a user record.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AppState;
use crate::error::Result;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub message: String,
    pub updated_attributes: Map<String, Value>,
}

/// Handler to replace the whole attribute document.
///
/// Full-field replace, never a merge: whatever the caller submits is
/// what the record holds afterwards. `id` never changes.
pub async fn handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Response>> {
    let Json(attributes) = payload?;
    state.config.schema.validate(&attributes)?;

    state
        .users()
        .replace_attributes(&user_id, &attributes)
        .await?;

    Ok(Json(Response {
        message: "User updated successfully.".to_owned(),
        updated_attributes: attributes,
    }))
}
