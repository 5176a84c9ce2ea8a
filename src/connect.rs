// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Sequence config loading, environment inspection, and builder setup into one connect attempt.
// Author: Lukas Bower

//! Connection orchestration.
//!
//! Precedence, lowest first: baseline directives, `client.conf`, explicit
//! overrides. Only a missing `HDFS_DEFAULT_FS` and a rejected connect are
//! fatal; every configuration problem degrades with a warning.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::backend::HdfsBackend;
use crate::builder::ConnectionBuilder;
use crate::config::ConfigStore;
use crate::env::{EnvSource, HADOOP_CONF_DIR, HDFS_DEFAULT_FS};
use crate::error::ConnectError;
use crate::kerberos::KerberosPlan;

/// Name of the client config file inside a configuration directory.
pub const CLIENT_CONF_FILE: &str = "client.conf";
/// Config path used when neither an override nor `HADOOP_CONF_DIR` is set.
pub const DEFAULT_CONFIG_PATH: &str = "conf/client.conf";

/// Directives applied before any config file value.
pub const BASELINE_DIRECTIVES: [(&str, &str); 3] = [
    ("fs.hdfs.impl", "org.apache.hadoop.hdfs.DistributedFileSystem"),
    ("fs.AbstractFileSystem.hdfs.impl", "org.apache.hadoop.fs.Hdfs"),
    ("fs.hdfs.impl.disable.cache", "true"),
];

/// Explicit overrides for a connect attempt.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Config file path, bypassing `HADOOP_CONF_DIR`.
    pub config_path: Option<PathBuf>,
    /// NameNode port directive.
    pub port: Option<u16>,
    /// Key/value pairs applied after the config file.
    pub overrides: Vec<(String, String)>,
    /// Request the service's default configuration.
    pub use_default_configuration: bool,
    /// Hadoop configuration directory handed to the service.
    pub hadoop_conf_dir: Option<String>,
}

/// Resolve the client config path.
pub fn resolve_config_path(env: &impl EnvSource, options: &ConnectOptions) -> PathBuf {
    if let Some(path) = &options.config_path {
        return path.clone();
    }
    match env.var(HADOOP_CONF_DIR) {
        Some(dir) => Path::new(&dir).join(CLIENT_CONF_FILE),
        None => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

/// Load the client config, degrading to an empty store on any failure.
///
/// Returns `None` when the file could not be opened or a line failed to
/// parse; such a file contributes no directives.
pub fn load_client_config(path: &Path) -> Option<ConfigStore> {
    info!("loading client configuration from {}", path.display());
    match ConfigStore::load(path) {
        Ok(loaded) if loaded.is_clean() => {
            loaded.store.log_entries();
            Some(loaded.store)
        }
        Ok(loaded) => {
            warn!(
                "could not load client configuration from {}: {} malformed line(s)",
                path.display(),
                loaded.errors.len()
            );
            None
        }
        Err(err) => {
            warn!("could not load client configuration: {err}");
            None
        }
    }
}

/// Run one connection attempt against `backend`.
pub fn connect<B: HdfsBackend>(
    backend: &B,
    env: &impl EnvSource,
    options: &ConnectOptions,
) -> Result<B::Connection, ConnectError> {
    let config_path = resolve_config_path(env, options);
    let file_config = load_client_config(&config_path);

    let mut builder = ConnectionBuilder::new(backend)?;

    let default_fs = env
        .var(HDFS_DEFAULT_FS)
        .filter(|value| !value.is_empty())
        .ok_or(ConnectError::MissingEndpoint)?;
    info!("using {HDFS_DEFAULT_FS}: {default_fs}");
    builder.set_host(&default_fs)?;
    if let Some(port) = options.port {
        builder.set_port(port)?;
    }

    for (key, value) in BASELINE_DIRECTIVES {
        builder.set_config_option(key, value)?;
    }

    let mut effective = ConfigStore::new();
    if let Some(config) = &file_config {
        builder.apply_all(config)?;
        effective.merge(config);
    }

    if !options.overrides.is_empty() {
        let overrides: ConfigStore = options.overrides.iter().cloned().collect();
        builder.apply_all(&overrides)?;
        effective.merge(&overrides);
    }
    if let Some(dir) = &options.hadoop_conf_dir {
        builder.set_config_dir(dir)?;
    }
    if options.use_default_configuration {
        builder.use_default_configuration()?;
    }

    KerberosPlan::from_config(&effective).apply(&mut builder)?;

    builder.connect()
}
