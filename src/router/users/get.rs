//! Get one user record by id.

use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::error::Result;
use crate::user::UserRecord;

/// Handler to fetch a record; absent id is a 404, not a failure.
pub async fn handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRecord>> {
    let record = state.users().find_by_id(&user_id).await?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use crate::{app, make_request, router};

    const ID: &str = "0b7f3f6a-1c2d-4e5f-8a9b-0c1d2e3f4a5b";

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_get_handler(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let path = format!("/users/{ID}");
        let response = make_request(
            app,
            Method::GET,
            &path,
            String::default(),
            Some(router::TEST_SECRET),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({
                "id": ID,
                "email": "admin@example.com",
                "password": "StrongPass1!",
            })
        );
    }

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_get_unknown_id_is_404(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::GET,
            "/users/ffffffff-ffff-ffff-ffff-ffffffffffff",
            String::default(),
            Some(router::TEST_SECRET),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_get_requires_credential(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let path = format!("/users/{ID}");
        let response = make_request(
            app.clone(),
            Method::GET,
            &path,
            String::default(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = make_request(
            app,
            Method::GET,
            &path,
            String::default(),
            Some("not-the-secret"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
