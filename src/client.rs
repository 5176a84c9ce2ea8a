// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Own a live HDFS connection and expose bounded list/read/write/delete operations.
// Author: Lukas Bower

//! Filesystem client.

use log::{info, warn};

use crate::backend::{HdfsBackend, HdfsConnection, OpenMode};
use crate::connect::{self, ConnectOptions};
use crate::env::EnvSource;
use crate::error::{ClientError, ConnectError};

/// Reads never fetch more than this many bytes.
pub const MAX_READ_BYTES: usize = 4096;

/// Result of a successful bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes read, at most [`MAX_READ_BYTES`].
    pub content: Vec<u8>,
    /// Size reported by the service.
    pub remote_size: u64,
    /// True when `remote_size` exceeds [`MAX_READ_BYTES`].
    pub truncated: bool,
}

/// Client owning at most one live connection.
///
/// Not synchronized: use one client per thread.
pub struct FilesystemClient<B: HdfsBackend> {
    backend: B,
    options: ConnectOptions,
    connection: Option<B::Connection>,
}

impl<B: HdfsBackend> FilesystemClient<B> {
    /// Create a disconnected client.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, ConnectOptions::default())
    }

    /// Create a disconnected client with explicit overrides.
    pub fn with_options(backend: B, options: ConnectOptions) -> Self {
        Self {
            backend,
            options,
            connection: None,
        }
    }

    /// Borrow the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether a live connection is held.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Run the connect sequence and keep the resulting connection.
    pub fn connect(&mut self, env: &impl EnvSource) -> Result<(), ConnectError> {
        if self.is_connected() {
            info!("replacing existing HDFS connection");
            self.disconnect();
        }
        let connection = connect::connect(&self.backend, env, &self.options)?;
        self.connection = Some(connection);
        Ok(())
    }

    /// Release the connection. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            info!("disconnecting from HDFS");
            self.backend.disconnect(connection);
        }
    }

    fn connection(&mut self) -> Result<&mut B::Connection, ClientError> {
        self.connection.as_mut().ok_or(ClientError::NotConnected)
    }

    /// List the entry paths of a directory.
    pub fn list_directory(&mut self, path: &str) -> Result<Vec<String>, ClientError> {
        let conn = self.connection()?;
        info!("listing directory: {path}");
        let entries = conn
            .list_directory(path)
            .map_err(|source| ClientError::List {
                path: path.to_owned(),
                source,
            })?;
        Ok(entries.into_iter().map(|status| status.path).collect())
    }

    /// Read at most [`MAX_READ_BYTES`] from the start of a file.
    pub fn read_file(&mut self, path: &str) -> Result<ReadOutcome, ClientError> {
        let conn = self.connection()?;
        info!("reading file: {path}");
        let mut file = conn
            .open_file(path, OpenMode::Read)
            .map_err(|source| ClientError::Open {
                path: path.to_owned(),
                source,
            })?;
        let remote_size = match conn.path_info(path) {
            Ok(status) => status.size,
            Err(source) => {
                close_after_read(conn, file, path);
                return Err(ClientError::Stat {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        let expected = usize::try_from(remote_size)
            .map_or(MAX_READ_BYTES, |size| size.min(MAX_READ_BYTES));
        let mut buffer = vec![0u8; expected];
        let read_result = conn.read(&mut file, &mut buffer);
        close_after_read(conn, file, path);
        let read = read_result.map_err(|source| ClientError::Read {
            path: path.to_owned(),
            source,
        })?;
        if read != expected {
            return Err(ClientError::ShortRead {
                path: path.to_owned(),
                expected,
                read,
            });
        }
        let truncated = remote_size > MAX_READ_BYTES as u64;
        if truncated {
            warn!(
                "file size ({remote_size} bytes) exceeds maximum read size; content truncated to {MAX_READ_BYTES} bytes"
            );
        }
        Ok(ReadOutcome {
            content: buffer,
            remote_size,
            truncated,
        })
    }

    /// Create or truncate a file and write `content` in one call.
    pub fn write_file(&mut self, path: &str, content: &[u8]) -> Result<usize, ClientError> {
        let conn = self.connection()?;
        info!("writing to file: {path}");
        let mut file = conn
            .open_file(path, OpenMode::WriteCreate)
            .map_err(|source| ClientError::Open {
                path: path.to_owned(),
                source,
            })?;
        let write_result = conn.write(&mut file, content);
        let flush_result = conn.flush(&mut file);
        let close_result = conn.close_file(file);

        let written = write_result.map_err(|source| ClientError::Write {
            path: path.to_owned(),
            source,
        })?;
        if written != content.len() {
            return Err(ClientError::ShortWrite {
                path: path.to_owned(),
                expected: content.len(),
                written,
            });
        }
        flush_result.map_err(|source| ClientError::Flush {
            path: path.to_owned(),
            source,
        })?;
        close_result.map_err(|source| ClientError::Close {
            path: path.to_owned(),
            source,
        })?;
        Ok(written)
    }

    /// Delete a file or empty directory. Never recursive.
    pub fn delete_file(&mut self, path: &str) -> Result<(), ClientError> {
        let conn = self.connection()?;
        info!("deleting file: {path}");
        conn.delete(path, false)
            .map_err(|source| ClientError::Delete {
                path: path.to_owned(),
                source,
            })
    }
}

fn close_after_read<C: HdfsConnection>(conn: &mut C, file: C::File, path: &str) {
    if let Err(err) = conn.close_file(file) {
        warn!("failed to close {path} after reading: {err}");
    }
}

impl<B: HdfsBackend> Drop for FilesystemClient<B> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
