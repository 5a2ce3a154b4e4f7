//! Best-effort notification events for external subscribers.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::uri::{
    AMQPAuthority, AMQPQueryString, AMQPScheme, AMQPUri, AMQPUserInfo,
};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use serde::Serialize;
use url::Url;

use crate::config::Amqp;
use crate::error::{Result, ServerError};

const DEFAULT_AMPQ_HOST: &str = "localhost";
const DEFAULT_AMPQ_PORT: u16 = 5672;
const DEFAULT_AMPQ_VHOST: &str = "/";

const CONTENT_ENCODING: &str = "utf8";
const CONTENT_TYPE: &str = "application/cloudevents+json";
const DATA_CONTENT_TYPE: &str = "application/json";
const CLOUDEVENT_VERSION: &str = "1.0";
const ID_LENGTH: usize = 12;

#[derive(Debug, Serialize)]
struct Cloudevent<'a> {
    specversion: &'static str,
    r#type: &'static str,
    source: &'static str,
    id: String,
    time: String,
    datacontenttype: &'static str,
    data: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    message: &'a str,
}

/// Notification channel manager.
///
/// Delivery is at most once with no ordering guarantee; consumers must
/// tolerate loss. An unconfigured publisher drops events silently.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    queue: String,
    conn: Option<Arc<Connection>>,
    #[cfg(test)]
    fail: bool,
}

impl Notifier {
    /// A publisher whose every publish fails, standing in for an
    /// unreachable broker.
    #[cfg(test)]
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Create a new [`Notifier`].
    pub async fn new(config: &Amqp) -> Result<Self> {
        let addr = Url::parse(&config.address)?;
        let uri = AMQPUri {
            scheme: AMQPScheme::from_str(addr.scheme())
                .map_err(|details| ServerError::Internal {
                    details: details.to_owned(),
                })?,
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: config.username.clone(),
                    password: config.password.clone(),
                },
                host: addr.host_str().unwrap_or(DEFAULT_AMPQ_HOST).into(),
                port: addr.port().unwrap_or(DEFAULT_AMPQ_PORT),
            },
            vhost: config
                .vhost
                .clone()
                .unwrap_or(DEFAULT_AMPQ_VHOST.to_string()),
            query: AMQPQueryString {
                channel_max: config.pool,
                ..Default::default()
            },
        };

        let conn_config = ConnectionProperties::default()
            .with_connection_name("padron_notifier".into());
        let conn = Connection::connect_uri(uri, conn_config).await?;

        tracing::info!(%addr, queue = config.queue, "amqp connected");

        Ok(Self {
            queue: config.queue.clone(),
            conn: Some(Arc::new(conn)),
            #[cfg(test)]
            fail: false,
        })
    }

    async fn create_channel(
        conn: Arc<Connection>,
        queue: &str,
    ) -> Result<Channel> {
        let channel = conn.create_channel().await?;
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(channel)
    }

    fn create_event(message: &str) -> Cloudevent<'_> {
        let id = Alphanumeric.sample_string(&mut OsRng, ID_LENGTH);
        Cloudevent {
            specversion: CLOUDEVENT_VERSION,
            r#type: "dev.padron.notification",
            source: "dev.padron.api",
            id,
            time: Utc::now().to_rfc3339(),
            datacontenttype: DATA_CONTENT_TYPE,
            data: Content { message },
        }
    }

    /// Publish a free-text state-change event.
    pub async fn publish(&self, message: &str) -> Result<()> {
        #[cfg(test)]
        if self.fail {
            return Err(ServerError::Internal {
                details: "notification channel unreachable".to_owned(),
            });
        }

        let Some(conn) = &self.conn else {
            tracing::debug!("notification channel disabled, event dropped");
            return Ok(());
        };
        let channel =
            Self::create_channel(Arc::clone(conn), &self.queue).await?;

        let payload = Self::create_event(message);
        let payload = serde_json::to_string(&payload).map_err(|err| {
            ServerError::Internal {
                details: err.to_string(),
            }
        })?;

        channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload.as_bytes(),
                BasicProperties::default()
                    .with_content_encoding(CONTENT_ENCODING.into())
                    .with_content_type(CONTENT_TYPE.into()),
            )
            .await?;

        tracing::trace!("notification event sent");

        Ok(())
    }
}
