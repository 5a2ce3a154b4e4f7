//! Create a user record and mirror it on the identity provider.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::AppState;
use crate::error::Result;
use crate::user::UserRecord;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub message: String,
    pub user_id: String,
}

/// Handler to create user.
pub async fn handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Response>> {
    let Json(attributes) = payload?;
    state.config.schema.validate(&attributes)?;

    let record = UserRecord {
        id: Uuid::new_v4().to_string(),
        attributes,
    };

    let users = state.users();

    if let Some(identity) = &state.identity {
        // Resolve provider attributes before the first write so a bad
        // payload cannot leave a half-provisioned user.
        let username = record.attribute_str(identity.username_attribute())?;
        let credential =
            record.attribute_str(identity.credential_attribute())?;

        users.insert(&record).await?;

        // Directory record and provider account are two separate
        // writes; on provider rejection the fresh record is removed.
        match identity.provision(username, credential).await {
            Ok(dn) => {
                tracing::debug!(user_id = %record.id, %dn, "identity provisioned");
            },
            Err(err) => {
                tracing::error!(
                    user_id = %record.id,
                    error = %err,
                    "identity provisioning failed, removing directory record"
                );
                users.delete(&record.id).await?;
                return Err(err);
            },
        }
    } else {
        users.insert(&record).await?;
    }

    // Best-effort: creation succeeds or fails independently of
    // notification delivery.
    if let Err(err) = state
        .notifier
        .publish(&format!("user {} created", record.id))
        .await
    {
        tracing::warn!(
            user_id = %record.id,
            error = %err,
            "notification publish failed"
        );
    }

    Ok(Json(Response {
        message: "User created successfully. Please log in and change \
                  your temporary password."
            .to_owned(),
        user_id: record.id,
    }))
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};
    use uuid::Uuid;

    use super::*;
    use crate::user::UserRecord;
    use crate::{app, make_request, router};

    #[sqlx::test]
    async fn test_create_handler(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state.clone());

        let response = make_request(
            app.clone(),
            Method::POST,
            "/users",
            json!({"email": "a@x.com", "password": "p"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert!(Uuid::parse_str(&body.user_id).is_ok());
        assert!(!body.message.is_empty());

        // Submitted attributes are returned exactly on read.
        let path = format!("/users/{}", body.user_id);
        let response = make_request(
            app,
            Method::GET,
            &path,
            String::default(),
            Some(router::TEST_SECRET),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let record = response.into_body().collect().await.unwrap().to_bytes();
        let record: UserRecord = serde_json::from_slice(&record).unwrap();
        assert_eq!(record.id, body.user_id);
        assert_eq!(
            serde_json::to_value(&record.attributes).unwrap(),
            json!({"email": "a@x.com", "password": "p"})
        );
    }

    #[sqlx::test]
    async fn test_create_generates_fresh_ids(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let response = make_request(
                app.clone(),
                Method::POST,
                "/users",
                json!({"email": "a@x.com", "password": "p"}).to_string(),
                None,
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);

            let body =
                response.into_body().collect().await.unwrap().to_bytes();
            let body: Response = serde_json::from_slice(&body).unwrap();
            assert!(!ids.contains(&body.user_id));
            ids.push(body.user_id);
        }
    }

    #[sqlx::test]
    async fn test_create_rejects_undeclared_field(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/users",
            json!({"email": "a@x.com", "password": "p", "role": "admin"})
                .to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_create_rejects_missing_field(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/users",
            json!({"email": "a@x.com"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_create_rejects_malformed_json(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/users",
            "{not json".to_owned(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // The test state carries a disabled publisher: creation must
    // succeed regardless of notification delivery.
    #[sqlx::test]
    async fn test_create_unaffected_by_publisher_absence(
        pool: Pool<Postgres>,
    ) {
        let state = router::state(pool);
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/users",
            json!({"email": "b@x.com", "password": "p"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert!(Uuid::parse_str(&body.user_id).is_ok());
    }

    // A broker that rejects the publish must not fail the creation:
    // delivery is best-effort, the record is already persisted.
    #[sqlx::test]
    async fn test_create_survives_publish_failure(pool: Pool<Postgres>) {
        let mut state = router::state(pool);
        state.notifier = crate::notify::Notifier::failing();
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/users",
            json!({"email": "b@x.com", "password": "p"}).to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert!(Uuid::parse_str(&body.user_id).is_ok());
    }
}
