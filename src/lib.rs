// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expose the HDFS client library used by the hdfs_client CLI.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! HDFS client library.
//!
//! A connection attempt layers the process environment, a `client.conf`
//! file, and explicit overrides onto a single-use [`ConnectionBuilder`],
//! optionally enabling Kerberos. The resulting connection is owned by a
//! [`FilesystemClient`] that offers bounded list/read/write/delete.

/// Remote filesystem service boundary and implementations.
pub mod backend;
/// Single-use connection builder.
pub mod builder;
/// Filesystem client with bounded I/O.
pub mod client;
/// `client.conf` parsing.
pub mod config;
/// Connection orchestration.
pub mod connect;
/// Environment lookup.
pub mod env;
/// Error taxonomy.
pub mod error;
/// Kerberos activation decisions.
pub mod kerberos;

pub use backend::{HdfsBackend, MemoryBackend, WebHdfsBackend};
pub use builder::ConnectionBuilder;
pub use client::{FilesystemClient, ReadOutcome, MAX_READ_BYTES};
pub use config::{ConfigLoad, ConfigStore};
pub use connect::ConnectOptions;
pub use env::{EnvSource, ProcessEnv};
pub use error::{ClientError, ConfigLoadError, ConfigParseError, ConnectError};
pub use kerberos::KerberosPlan;

/// Client version reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
