//! List every user record.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::Result;
use crate::user::UserRecord;

/// Handler to scan the whole directory. No pagination.
pub async fn handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>> {
    let records = state.users().find_all().await?;
    Ok(Json(records))
}
