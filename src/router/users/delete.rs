//! Delete a user record.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

/// Handler to delete a record. Unconditional: succeeds whether or not
/// the id existed.
pub async fn handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Response>> {
    state.users().delete(&user_id).await?;

    Ok(Json(Response {
        message: "User deleted successfully.".to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use sqlx::{Pool, Postgres};

    use crate::{app, make_request, router};

    const ID: &str = "0b7f3f6a-1c2d-4e5f-8a9b-0c1d2e3f4a5b";

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_delete_then_get_is_404(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let path = format!("/users/{ID}");
        let response = make_request(
            app.clone(),
            Method::DELETE,
            &path,
            String::default(),
            Some(router::TEST_SECRET),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app,
            Method::GET,
            &path,
            String::default(),
            Some(router::TEST_SECRET),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_delete_is_idempotent(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        // An id that never existed deletes fine.
        let response = make_request(
            app,
            Method::DELETE,
            "/users/ffffffff-ffff-ffff-ffff-ffffffffffff",
            String::default(),
            Some(router::TEST_SECRET),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_rejected_delete_mutates_nothing(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let path = format!("/users/{ID}");
        let response = make_request(
            app.clone(),
            Method::DELETE,
            &path,
            String::default(),
            Some("wrong-secret"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Record is still there.
        let response = make_request(
            app,
            Method::GET,
            &path,
            String::default(),
            Some(router::TEST_SECRET),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
