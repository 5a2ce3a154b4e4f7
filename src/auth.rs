//! Shared-secret authorization gate.

use std::collections::HashSet;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::AppState;

const BEARER: &str = "Bearer ";

/// Every operation exposed by the API.
///
/// Names match the `authorization.protected` entries on `config.yaml`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateUser,
    Login,
    ListUsers,
    GetUser,
    UpdateUser,
    DeleteUser,
    PublishNotification,
}

impl Operation {
    /// Resolve an operation from the request method and matched route.
    pub fn resolve(method: &Method, path: &str) -> Option<Self> {
        match (method.as_str(), path) {
            ("POST", "/users") => Some(Self::CreateUser),
            ("POST", "/login") => Some(Self::Login),
            ("GET", "/users") => Some(Self::ListUsers),
            ("GET", "/users/{user_id}") => Some(Self::GetUser),
            ("PUT", "/users/{user_id}") => Some(Self::UpdateUser),
            ("DELETE", "/users/{user_id}") => Some(Self::DeleteUser),
            ("POST", "/notifications") => Some(Self::PublishNotification),
            _ => None,
        }
    }
}

/// Compare a caller-supplied credential against the deployment secret.
///
/// One instance per deployment, built from injected configuration;
/// the secret is never mutated at runtime. Comparison is a plain
/// string match: the trusted value is a deployment secret, not a
/// cryptographic proof.
#[derive(Clone, Debug)]
pub struct Authorizer {
    secret: String,
    protected: HashSet<Operation>,
}

impl Authorizer {
    /// Create a new [`Authorizer`].
    pub fn new(
        secret: impl Into<String>,
        protected: impl IntoIterator<Item = Operation>,
    ) -> Self {
        Self {
            secret: secret.into(),
            protected: protected.into_iter().collect(),
        }
    }

    /// Whether `operation` is gated behind the credential.
    pub fn requires(&self, operation: Operation) -> bool {
        self.protected.contains(&operation)
    }

    /// Validate a caller-supplied credential. Pure, no side effects.
    pub fn authorize(&self, token: Option<&str>) -> Result<()> {
        match token {
            None => Err(ServerError::MissingCredential),
            Some(token) if token != self.secret => {
                Err(ServerError::InvalidCredential)
            },
            Some(_) => Ok(()),
        }
    }
}

/// Router middleware enforcing the configured protected set.
///
/// Runs before any handler, so a rejected request performs no store
/// mutation.
pub async fn guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    if let Some(operation) = Operation::resolve(req.method(), &path) {
        if state.authorizer.requires(operation) {
            let token = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok())
                .map(|token| token.strip_prefix(BEARER).unwrap_or(token));

            state.authorizer.authorize(token)?;
        }
    }

    Ok(next.run(req).await)
}
