//! Request handlers, one per operation.

pub mod create;
pub mod login;
pub mod notify;
pub mod status;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

/// JSON extractor running `validator` checks on the payload.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
pub(crate) const TEST_SECRET: &str = "test-secret";

/// Build an [`crate::AppState`] for handler tests: in-memory config,
/// no identity bridge, disabled publisher.
#[cfg(test)]
pub(crate) fn state(pool: sqlx::Pool<sqlx::Postgres>) -> crate::AppState {
    use std::sync::Arc;

    use crate::auth::{Authorizer, Operation};
    use crate::config::Configuration;
    use crate::database::Database;
    use crate::notify::Notifier;
    use crate::token::TokenManager;
    use crate::user::Schema;

    let mut config = Configuration::default();
    config.name = "padron".to_owned();
    config.url = "https://directory.example.com".to_owned();
    config.schema = Schema {
        fields: vec!["email".to_owned(), "password".to_owned()],
    };

    crate::AppState {
        authorizer: Arc::new(Authorizer::new(
            TEST_SECRET,
            config.authorization.protected.iter().copied(),
        )),
        config: Arc::new(config),
        db: Database { postgres: pool },
        identity: None,
        notifier: Notifier::default(),
        token: TokenManager::new("padron", "test-signing-key"),
    }
}
