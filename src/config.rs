//! Configuration manager for padron.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;
use crate::auth::Operation;
use crate::user::Schema;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance.
    pub url: String,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Declared attribute schema for user records.
    pub schema: Schema,
    /// Which operations require the shared-secret credential.
    #[serde(default)]
    pub authorization: Authorization,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to the AMQP notification channel.
    #[serde(skip_serializing)]
    pub amqp: Option<Amqp>,
    /// Related to the LDAP identity provider.
    #[serde(skip_serializing)]
    pub ldap: Option<Ldap>,
    /// Related to token issuing on login.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
}

/// Authorization scope configuration.
///
/// The protected set is declared per deployment rather than hard-coded
/// per handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    /// Operations gated behind the shared-secret credential.
    #[serde(default = "default_protected")]
    pub protected: Vec<Operation>,
}

fn default_protected() -> Vec<Operation> {
    vec![
        Operation::ListUsers,
        Operation::GetUser,
        Operation::UpdateUser,
        Operation::DeleteUser,
    ]
}

impl Default for Authorization {
    fn default() -> Self {
        Self {
            protected: default_protected(),
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// AMQP notification channel configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amqp {
    /// amqp(s)://hostname:(?port) for the broker.
    pub address: String,
    /// Default vhost.
    pub vhost: Option<String>,
    /// Username to access the queue.
    pub username: String,
    /// Password to access the queue.
    pub password: String,
    /// Max channel connections.
    pub pool: Option<u16>,
    /// Queue name to send notification events.
    pub queue: String,
}

/// LDAP identity provider configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ldap {
    /// Hostname:(?port) for LDAP instance.
    pub address: String,
    /// Admin DN credential to connect.
    pub user: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// DN for domain.
    pub base_dn: String,
    /// DN template for provisioned entries, with a `{uid}` placeholder.
    pub additional_users_dn: String,
    /// Record attribute used as the provider username.
    #[serde(default = "default_username_attribute")]
    pub username_attribute: String,
    /// Record attribute used as the temporary credential.
    #[serde(default = "default_credential_attribute")]
    pub credential_attribute: String,
}

fn default_username_attribute() -> String {
    "email".to_owned()
}

fn default_credential_attribute() -> String {
    "password".to_owned()
}

/// Token issuing configuration.
///
/// The signing key comes from the `TOKEN_KEY` environment variable,
/// never from this file.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Update token audience.
    pub audience: Option<String>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();

                // normalize URLs.
                config.url = self.normalize_url(&config.url)?;

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Audience claimed on issued tokens.
    ///
    /// Declared under `token.audience`; the normalized instance URL is
    /// the fallback.
    pub fn token_audience(&self) -> Option<&str> {
        self.token
            .as_ref()
            .and_then(|token| token.audience.as_deref())
            .or_else(|| (!self.url.is_empty()).then_some(self.url.as_str()))
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}
