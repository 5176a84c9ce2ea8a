// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Decide which Kerberos directives a connection attempt receives.
// Author: Lukas Bower

//! Kerberos activation.
//!
//! | auth = kerberos | principal and keytab | krb5.conf | directives              |
//! |-----------------|----------------------|-----------|-------------------------|
//! | no              | any                  | any       | none                    |
//! | yes             | both present         | absent    | principal, keytab       |
//! | yes             | both present         | present   | principal, keytab, krb5 |
//! | yes             | either missing       | absent    | none, missing reported  |
//! | yes             | either missing       | present   | krb5, missing reported  |

use log::{error, info};

use crate::backend::HdfsBackend;
use crate::builder::ConnectionBuilder;
use crate::config::ConfigStore;
use crate::error::ConnectError;

/// Key selecting the authentication mode.
pub const AUTHENTICATION_KEY: &str = "hadoop.security.authentication";
/// Key holding the Kerberos principal.
pub const PRINCIPAL_KEY: &str = "hadoop.kerberos.principal";
/// Key holding the keytab path.
pub const KEYTAB_KEY: &str = "hadoop.kerberos.keytab";
/// Key holding the krb5.conf path.
pub const KRB5_CONF_KEY: &str = "hadoop.kerberos.krb5.conf";

const KERBEROS: &str = "kerberos";

/// Principal and keytab, only ever set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KerberosCredentials {
    /// Kerberos principal.
    pub principal: String,
    /// Keytab path.
    pub keytab: String,
}

/// Kerberos directives derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KerberosPlan {
    /// Authentication mode is not `kerberos`.
    Disabled,
    /// Authentication mode is `kerberos`.
    Enabled {
        /// Present only when both principal and keytab are configured.
        credentials: Option<KerberosCredentials>,
        /// krb5.conf path, independent of credentials.
        krb5_conf: Option<String>,
        /// Credential keys that were required but absent.
        missing: Vec<&'static str>,
    },
}

impl KerberosPlan {
    /// Evaluate the decision table against `config`.
    #[must_use]
    pub fn from_config(config: &ConfigStore) -> Self {
        if config.get_opt(AUTHENTICATION_KEY) != Some(KERBEROS) {
            return Self::Disabled;
        }
        let principal = config.get_opt(PRINCIPAL_KEY);
        let keytab = config.get_opt(KEYTAB_KEY);
        let missing = [(PRINCIPAL_KEY, principal), (KEYTAB_KEY, keytab)]
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key)
            .collect();
        let credentials = match (principal, keytab) {
            (Some(principal), Some(keytab)) => Some(KerberosCredentials {
                principal: principal.to_owned(),
                keytab: keytab.to_owned(),
            }),
            _ => None,
        };
        Self::Enabled {
            credentials,
            krb5_conf: config.get_opt(KRB5_CONF_KEY).map(str::to_owned),
            missing,
        }
    }

    /// Whether Kerberos authentication was requested.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Queue the planned directives on `builder`.
    ///
    /// Missing credentials are reported, not returned: the connect attempt
    /// proceeds and the service decides.
    pub fn apply<B: HdfsBackend>(
        &self,
        builder: &mut ConnectionBuilder<'_, B>,
    ) -> Result<(), ConnectError> {
        let Self::Enabled {
            credentials,
            krb5_conf,
            missing,
        } = self
        else {
            return Ok(());
        };
        info!("Kerberos authentication is enabled in configuration");
        match credentials {
            Some(creds) => {
                info!("using Kerberos principal: {}", creds.principal);
                info!("using Kerberos keytab file: {}", creds.keytab);
                builder
                    .set_principal(&creds.principal)?
                    .set_keytab_path(&creds.keytab)?;
            }
            None => error!(
                "Kerberos authentication is enabled, but {} missing in configuration",
                missing.join(" and ")
            ),
        }
        if let Some(path) = krb5_conf {
            info!("using Kerberos krb5.conf file: {path}");
            builder.set_krb5_config_path(path)?;
        }
        Ok(())
    }
}
