//! Trigger a notification event by hand.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, message = "Message must not be empty."))]
    pub message: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

/// Handler to publish a free-text event to the notification channel.
///
/// Unlike the publish on creation, a failure here is reported to the
/// caller.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    state.notifier.publish(&body.message).await?;

    Ok(Json(Response {
        message: "Notification published successfully.".to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use crate::{app, make_request, router};

    #[sqlx::test]
    async fn test_notify_handler(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/notifications",
            json!({"message": "maintenance at noon"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[sqlx::test]
    async fn test_notify_rejects_empty_message(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/notifications",
            json!({"message": ""}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
