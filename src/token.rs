//! Manage json web tokens issued after a successful login.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
#[cfg(test)]
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_AUDIENCE: &str = "padron";
pub const EXPIRATION_TIME: u64 = 60 * 15; // 15 minutes, in seconds.

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Provider username.
    pub sub: String,
    /// Set on id tokens only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    #[cfg(test)]
    decoding_key: DecodingKey,
    name: String,
    audience: String,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance keyed from a deployment
    /// secret.
    pub fn new(name: &str, key: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            #[cfg(test)]
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
            name: name.to_owned(),
            audience: DEFAULT_AUDIENCE.to_string(),
        }
    }

    /// Set `audience` field on JWT.
    pub fn audience(&mut self, audience: &str) {
        self.audience = audience.to_owned();
    }

    fn claims(&self, username: &str) -> Result<Claims> {
        let time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        Ok(Claims {
            aud: self.audience.clone(),
            exp: time + EXPIRATION_TIME,
            iat: time,
            iss: self.name.clone(),
            sub: username.to_owned(),
            preferred_username: None,
        })
    }

    /// Create a new access token.
    pub fn create_access(&self, username: &str) -> Result<String> {
        let header = Header::new(self.algorithm);
        let claims = self.claims(username)?;
        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Create a new id token carrying the username claim.
    pub fn create_id(&self, username: &str) -> Result<String> {
        let header = Header::new(self.algorithm);
        let mut claims = self.claims(username)?;
        claims.preferred_username = Some(username.to_owned());
        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Decode and check a token. Verification is the consumer's job at
    /// runtime, so the decoding half only exists for tests.
    #[cfg(test)]
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}
