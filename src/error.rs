// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the error taxonomy shared by config, connect, and file operations.
// Author: Lukas Bower

//! Error types for the HDFS client.
//!
//! Configuration errors are absorbed by the connect sequence wherever a
//! fallback exists. Connection and I/O errors are surfaced to the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;

/// The client config file could not be read at all.
#[derive(Debug, Error)]
#[error("failed to open config file {path}: {source}")]
pub struct ConfigLoadError {
    /// Path that was attempted.
    pub path: PathBuf,
    /// Underlying I/O failure.
    #[source]
    pub source: io::Error,
}

/// A single config line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error parsing line {line}: {reason}: {text:?}")]
pub struct ConfigParseError {
    /// 1-based line number within the source.
    pub line: usize,
    /// Raw text of the rejected line.
    pub text: String,
    /// Why the line was rejected.
    pub reason: ParseFailure,
}

/// Reason a config line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// The line has no `=` separator.
    #[error("missing '=' separator")]
    MissingSeparator,
    /// The key is empty after trimming.
    #[error("empty key")]
    EmptyKey,
}

/// Fatal outcomes of a connection attempt.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// `HDFS_DEFAULT_FS` is unset or empty.
    #[error("HDFS_DEFAULT_FS is not set")]
    MissingEndpoint,
    /// The builder was already consumed or never allocated.
    #[error("builder not initialized")]
    BuilderNotInitialized,
    /// The remote service refused the connection.
    #[error("failed to connect to HDFS: {0}")]
    ConnectRejected(#[source] BackendError),
}

/// Per-operation failures reported by [`crate::FilesystemClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation attempted before connect or after disconnect.
    #[error("not connected to HDFS")]
    NotConnected,
    /// The remote directory could not be listed.
    #[error("failed to list directory {path}: {source}")]
    List {
        /// Directory path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The remote file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        /// File path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// Size metadata for the remote file could not be fetched.
    #[error("failed to get file info for {path}: {source}")]
    Stat {
        /// File path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The read call itself failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The read returned a different byte count than requested.
    #[error("short read from {path}: read {read} of {expected} bytes")]
    ShortRead {
        /// File path.
        path: String,
        /// Bytes requested.
        expected: usize,
        /// Bytes returned.
        read: usize,
    },
    /// The write call itself failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The write accepted a different byte count than supplied.
    #[error("short write to {path}: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// File path.
        path: String,
        /// Bytes supplied.
        expected: usize,
        /// Bytes accepted.
        written: usize,
    },
    /// Flushing written data failed.
    #[error("failed to flush {path}: {source}")]
    Flush {
        /// File path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// Closing the file failed after an otherwise complete operation.
    #[error("failed to close {path}: {source}")]
    Close {
        /// File path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The path could not be deleted.
    #[error("failed to delete {path}: {source}")]
    Delete {
        /// Path.
        path: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
}
