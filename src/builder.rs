// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Wrap a backend raw builder as a single-use, chainable connection accumulator.
// Author: Lukas Bower

//! Single-use connection builder.
//!
//! The raw builder lives in [`BuilderState::Pending`] until `connect`
//! hands it to the backend. The backend releases it as part of connecting,
//! so the state flips to [`BuilderState::Consumed`] before that call and
//! never flips back. A pending builder that is dropped is released through
//! [`HdfsBackend::free_builder`].

use std::mem;

use log::{debug, error, info};

use crate::backend::{HdfsBackend, RawBuilder};
use crate::config::ConfigStore;
use crate::error::ConnectError;

/// Configuration key carrying the Hadoop configuration directory.
pub const HADOOP_CONF_DIR_KEY: &str = "hadoop.conf.dir";

enum BuilderState<R> {
    Pending { raw: R, use_default: bool },
    Consumed,
}

/// Chainable accumulator exchanged for a connection exactly once.
pub struct ConnectionBuilder<'a, B: HdfsBackend> {
    backend: &'a B,
    state: BuilderState<B::Builder>,
}

impl<'a, B: HdfsBackend> ConnectionBuilder<'a, B> {
    /// Allocate a raw builder from `backend`.
    pub fn new(backend: &'a B) -> Result<Self, ConnectError> {
        let raw = backend.new_builder().ok_or_else(|| {
            error!("failed to create builder instance");
            ConnectError::BuilderNotInitialized
        })?;
        Ok(Self {
            backend,
            state: BuilderState::Pending {
                raw,
                use_default: false,
            },
        })
    }

    fn raw_mut(&mut self) -> Result<&mut B::Builder, ConnectError> {
        match &mut self.state {
            BuilderState::Pending { raw, .. } => Ok(raw),
            BuilderState::Consumed => {
                error!("builder not initialized");
                Err(ConnectError::BuilderNotInitialized)
            }
        }
    }

    /// Set the NameNode host or filesystem URI.
    pub fn set_host(&mut self, name_node: &str) -> Result<&mut Self, ConnectError> {
        debug!("builder: namenode {name_node}");
        self.raw_mut()?.set_name_node(name_node);
        Ok(self)
    }

    /// Set the NameNode port.
    pub fn set_port(&mut self, port: u16) -> Result<&mut Self, ConnectError> {
        debug!("builder: port {port}");
        self.raw_mut()?.set_name_node_port(port);
        Ok(self)
    }

    /// Set one configuration option.
    pub fn set_config_option(&mut self, key: &str, value: &str) -> Result<&mut Self, ConnectError> {
        debug!("builder: {key} = {value}");
        self.raw_mut()?.conf_set_str(key, value);
        Ok(self)
    }

    /// Point the service at a Hadoop configuration directory.
    pub fn set_config_dir(&mut self, dir: &str) -> Result<&mut Self, ConnectError> {
        self.set_config_option(HADOOP_CONF_DIR_KEY, dir)
    }

    /// Set the Kerberos principal.
    pub fn set_principal(&mut self, principal: &str) -> Result<&mut Self, ConnectError> {
        info!("setting Kerberos principal: {principal}");
        self.raw_mut()?.set_principal(principal);
        Ok(self)
    }

    /// Set the krb5.conf path.
    pub fn set_krb5_config_path(&mut self, path: &str) -> Result<&mut Self, ConnectError> {
        info!("setting Kerberos krb5.conf file: {path}");
        self.raw_mut()?.set_kerb5_conf(path);
        Ok(self)
    }

    /// Set the keytab path.
    pub fn set_keytab_path(&mut self, path: &str) -> Result<&mut Self, ConnectError> {
        info!("setting Kerberos keytab file: {path}");
        self.raw_mut()?.set_keytab_file(path);
        Ok(self)
    }

    /// Ask for the service's default configuration.
    pub fn use_default_configuration(&mut self) -> Result<&mut Self, ConnectError> {
        match &mut self.state {
            BuilderState::Pending { use_default, .. } => {
                *use_default = true;
                Ok(self)
            }
            BuilderState::Consumed => {
                error!("builder not initialized");
                Err(ConnectError::BuilderNotInitialized)
            }
        }
    }

    /// Apply every entry of `config` in key order.
    pub fn apply_all(&mut self, config: &ConfigStore) -> Result<&mut Self, ConnectError> {
        for (key, value) in config.entries() {
            debug!("applying configuration: {key} = {value}");
            self.set_config_option(key, value)?;
        }
        Ok(self)
    }

    /// Whether `connect` has already been called.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        matches!(self.state, BuilderState::Consumed)
    }

    /// Whether the default configuration was requested.
    #[must_use]
    pub fn uses_default_configuration(&self) -> bool {
        matches!(
            self.state,
            BuilderState::Pending {
                use_default: true,
                ..
            }
        )
    }

    /// Exchange the builder for a live connection.
    pub fn connect(&mut self) -> Result<B::Connection, ConnectError> {
        let (raw, use_default) = match mem::replace(&mut self.state, BuilderState::Consumed) {
            BuilderState::Pending { raw, use_default } => (raw, use_default),
            BuilderState::Consumed => {
                error!("builder not initialized");
                return Err(ConnectError::BuilderNotInitialized);
            }
        };
        if use_default {
            info!("using default HDFS configuration");
        }
        match self.backend.builder_connect(raw) {
            Ok(connection) => {
                info!("successfully connected to HDFS");
                Ok(connection)
            }
            Err(err) => {
                error!("failed to connect to HDFS: {err}");
                Err(ConnectError::ConnectRejected(err))
            }
        }
    }
}

impl<B: HdfsBackend> Drop for ConnectionBuilder<'_, B> {
    fn drop(&mut self) {
        if let BuilderState::Pending { raw, .. } = mem::replace(&mut self.state, BuilderState::Consumed)
        {
            info!("freeing unused builder");
            self.backend.free_builder(raw);
        }
    }
}
