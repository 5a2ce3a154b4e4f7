//! padron is a lightweight user directory and account management API.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
mod database;

pub mod auth;
pub mod config;
pub mod error;
mod identity;
mod notify;
mod router;
mod token;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
    token: Option<&str>,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder =
            builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(
        builder.body(axum::body::Body::from(body)).unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub authorizer: Arc<auth::Authorizer>,
    pub identity: Option<identity::Identity>,
    pub notifier: notify::Notifier,
    pub token: token::TokenManager,
}

impl AppState {
    /// Directory store handle.
    pub fn users(&self) -> user::UserRepository {
        user::UserRepository::new(self.db.postgres.clone())
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `POST /login` goes to `login`.
        .route("/login", post(router::login::handler))
        // `POST /notifications` goes to `notify`.
        .route("/notifications", post(router::notify::handler))
        // `/users` routes.
        .merge(router::users::router())
        // Enforce the configured protected-operation set before any
        // handler runs.
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            auth::guard,
        ))
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let db = match config.postgres {
        Some(ref config) => database::Database::connect(config).await?,
        None => {
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            std::process::exit(0);
        },
    };

    // execute migrations scripts on start.
    sqlx::migrate!().run(&db.postgres).await?;

    // shared-secret credential for protected operations.
    let secret = std::env::var("API_SECRET")
        .expect("missing `API_SECRET` environnement variable");
    let authorizer = Arc::new(auth::Authorizer::new(
        secret,
        config.authorization.protected.iter().copied(),
    ));

    // initialize the identity provider bridge.
    let identity = if let Some(cfg) = &config.ldap {
        let mut identity_config = identity::IdentityConfig::new(
            &cfg.address,
            &cfg.base_dn,
            &cfg.additional_users_dn,
        )?;
        identity_config.username_attribute = cfg.username_attribute.clone();
        identity_config.credential_attribute =
            cfg.credential_attribute.clone();

        Some(
            identity::Identity::connect(
                identity_config,
                cfg.user.as_deref(),
                cfg.password.as_deref(),
            )
            .await?,
        )
    } else {
        None
    };

    // handle the notification channel.
    let notifier = if let Some(cfg) = &config.amqp {
        notify::Notifier::new(cfg).await?
    } else {
        notify::Notifier::default()
    };

    // handle token issuing on login.
    let key = std::env::var("TOKEN_KEY")
        .expect("missing `TOKEN_KEY` environnement variable");
    let mut token = token::TokenManager::new(&config.name, &key);
    if let Some(audience) = config.token_audience() {
        token.audience(audience);
    }

    Ok(AppState {
        config,
        db,
        authorizer,
        identity,
        notifier,
        token,
    })
}
