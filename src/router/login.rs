//! Login against the identity provider and issue tokens.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, message = "Username must not be empty."))]
    pub username: String,
    #[validate(length(min = 1, message = "Credential must not be empty."))]
    pub credential: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub message: String,
    pub access_token: String,
    pub id_token: String,
}

/// Handler to authenticate a user.
///
/// Credential verification is delegated entirely to the provider; the
/// directory store is never consulted here.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let Some(identity) = &state.identity else {
        return Err(ServerError::Internal {
            details: "identity provider is not configured".to_owned(),
        });
    };

    identity.authenticate(&body.username, &body.credential).await?;

    let access_token = state.token.create_access(&body.username)?;
    let id_token = state.token.create_id(&body.username)?;

    Ok(Json(Response {
        message: "Login successful.".to_owned(),
        access_token,
        id_token,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use crate::{app, make_request, router};

    #[sqlx::test]
    async fn test_login_without_identity_provider(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({"username": "a@x.com", "credential": "p"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[sqlx::test]
    async fn test_login_rejects_empty_username(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({"username": "", "credential": "p"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_login_rejects_missing_fields(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({"username": "a@x.com"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
