//! Identity provider bridge over LDAP.
//!
//! Mirrors user creation and delegates credential verification to the
//! provider. Directory writes and provider writes are two separate
//! steps, never one transaction.

use ldap3::{Ldap as Ldap3, LdapConnAsync, LdapError, Scope, SearchEntry};

use crate::error::{Result, ServerError};

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub addr: String,
    pub base_dn: String,
    pub user_dn_template: String,
    /// Record attribute mirrored as the provider username.
    pub username_attribute: String,
    /// Record attribute used as the temporary credential.
    pub credential_attribute: String,
}

impl IdentityConfig {
    /// Create a new [`IdentityConfig`].
    pub fn new(
        addr: impl Into<String>,
        base_dn: impl Into<String>,
        user_dn_template: impl Into<String>,
    ) -> Result<Self> {
        let template = user_dn_template.into();

        if !template.contains("{uid}") {
            return Err(LdapError::FilterParsing.into());
        }

        Ok(Self {
            addr: addr.into(),
            base_dn: base_dn.into(),
            user_dn_template: template,
            username_attribute: "email".to_owned(),
            credential_attribute: "password".to_owned(),
        })
    }

    /// Configure LDAP `dn` for a provider username.
    pub fn user_dn(&self, uid: &str) -> String {
        self.user_dn_template.replace("{uid}", &escape_ldap(uid))
    }
}

/// Identity provider connection manager.
#[derive(Clone, Debug)]
pub struct Identity {
    conn: Ldap3,
    config: IdentityConfig,
}

impl Identity {
    /// Open the provider connection, binding as admin when configured.
    pub async fn connect(
        config: IdentityConfig,
        bind_dn: Option<&str>,
        bind_password: Option<&str>,
    ) -> Result<Self> {
        let (handle, mut conn) = LdapConnAsync::new(&config.addr).await?;
        ldap3::drive!(handle);

        if let Some(dn) = bind_dn {
            let password = bind_password.ok_or_else(|| {
                LdapError::InvalidScopeString("password".into())
            })?;

            conn.simple_bind(dn, password).await?.success()?;
        }

        Ok(Self { conn, config })
    }

    /// Record attribute mirrored as the provider username.
    pub fn username_attribute(&self) -> &str {
        &self.config.username_attribute
    }

    /// Record attribute used as the temporary credential.
    pub fn credential_attribute(&self) -> &str {
        &self.config.credential_attribute
    }

    /// Create the matching provider account for a new user.
    ///
    /// Returns the provider-side identifier (the entry DN). Any
    /// upstream rejection, duplicate username included, surfaces as an
    /// upstream failure.
    pub async fn provision(
        &self,
        username: &str,
        temporary_credential: &str,
    ) -> Result<String> {
        let mut conn = self.conn.clone();
        let dn = self.config.user_dn(username);

        let attrs = vec![
            (
                "objectClass",
                ["top", "person", "organizationalPerson", "inetOrgPerson"]
                    .into_iter()
                    .collect::<std::collections::HashSet<_>>(),
            ),
            ("uid", [username].into_iter().collect()),
            ("cn", [username].into_iter().collect()),
            ("sn", [username].into_iter().collect()),
            (
                "userPassword",
                [temporary_credential].into_iter().collect(),
            ),
        ];

        conn.add(&dn, attrs).await?.success()?;
        Ok(dn)
    }

    /// Delegate credential verification entirely to the provider.
    ///
    /// Unknown user and wrong password are indistinguishable to the
    /// caller: both surface as [`ServerError::AuthenticationFailed`].
    pub async fn authenticate(
        &self,
        username: &str,
        credential: &str,
    ) -> Result<()> {
        let (handle, mut conn) = LdapConnAsync::new(&self.config.addr).await?;
        ldap3::drive!(handle);

        let filter = format!("(uid={})", escape_ldap(username));
        let results = conn
            .search(&self.config.base_dn, Scope::Subtree, &filter, vec!["dn"])
            .await?
            .success()
            .map_err(|_| ServerError::AuthenticationFailed)?
            .0;

        if results.len() != 1 {
            return Err(ServerError::AuthenticationFailed);
        }

        let dn = SearchEntry::construct(results[0].clone()).dn;
        let bound = conn
            .simple_bind(&dn, credential)
            .await?
            .success()
            .map(|_| ())
            .map_err(|_| ServerError::AuthenticationFailed);
        conn.unbind().await?;
        bound
    }
}

fn escape_ldap(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.as_bytes() {
        match *b {
            b'*' => out.push_str(r"\2a"),
            b'(' => out.push_str(r"\28"),
            b')' => out.push_str(r"\29"),
            b'\\' => out.push_str(r"\5c"),
            0 => out.push_str(r"\00"),
            // UTF-8 continuation bytes must be hex-escaped, not cast.
            c if !c.is_ascii() => {
                out.push_str(&format!(r"\{c:02x}"));
            },
            c => out.push(c as char),
        }
    }
    out
}
