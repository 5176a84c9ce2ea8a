// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Describe the remote filesystem service consumed by the client.
// Author: Lukas Bower

//! Boundary to the remote filesystem service.
//!
//! The client never speaks a wire protocol directly. A backend hands out raw
//! builders, turns a configured builder into a live connection, and exposes
//! primitive file operations on that connection.

/// In-process backend with fault injection.
pub mod memory;
/// WebHDFS REST backend.
pub mod webhdfs;

use thiserror::Error;

pub use memory::MemoryBackend;
pub use webhdfs::WebHdfsBackend;

/// Failure reported by a backend primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Build an error from a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Borrow the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// How a remote file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access.
    Read,
    /// Write access, creating the file or truncating an existing one.
    WriteCreate,
}

/// Kind of a remote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Metadata for a remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Absolute path of the entry.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Entry kind.
    pub kind: FileKind,
}

/// Raw builder resource allocated by a backend.
pub trait RawBuilder {
    /// Set the NameNode host or filesystem URI.
    fn set_name_node(&mut self, name_node: &str);
    /// Set the NameNode port.
    fn set_name_node_port(&mut self, port: u16);
    /// Set an arbitrary configuration string.
    fn conf_set_str(&mut self, key: &str, value: &str);
    /// Set the Kerberos principal.
    fn set_principal(&mut self, principal: &str);
    /// Set the krb5.conf path.
    fn set_kerb5_conf(&mut self, path: &str);
    /// Set the keytab path.
    fn set_keytab_file(&mut self, path: &str);
}

/// Primitive operations on a live connection.
pub trait HdfsConnection {
    /// Open file handle type.
    type File;

    /// List the entries of a directory.
    fn list_directory(&mut self, path: &str) -> Result<Vec<FileStatus>, BackendError>;
    /// Open a file.
    fn open_file(&mut self, path: &str, mode: OpenMode) -> Result<Self::File, BackendError>;
    /// Read up to `buf.len()` bytes, returning the count read.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, BackendError>;
    /// Write bytes, returning the count accepted.
    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> Result<usize, BackendError>;
    /// Flush buffered writes.
    fn flush(&mut self, file: &mut Self::File) -> Result<(), BackendError>;
    /// Close a file handle.
    fn close_file(&mut self, file: Self::File) -> Result<(), BackendError>;
    /// Fetch metadata for a path.
    fn path_info(&mut self, path: &str) -> Result<FileStatus, BackendError>;
    /// Delete a path.
    fn delete(&mut self, path: &str, recursive: bool) -> Result<(), BackendError>;
}

/// Factory for builders and connections.
pub trait HdfsBackend {
    /// Raw builder type.
    type Builder: RawBuilder;
    /// Live connection type.
    type Connection: HdfsConnection;

    /// Allocate a raw builder, or `None` if allocation failed.
    fn new_builder(&self) -> Option<Self::Builder>;
    /// Connect using a configured builder. The builder is released whatever
    /// the outcome.
    fn builder_connect(&self, builder: Self::Builder) -> Result<Self::Connection, BackendError>;
    /// Release a builder that was never connected.
    fn free_builder(&self, builder: Self::Builder);
    /// Release a live connection.
    fn disconnect(&self, connection: Self::Connection);
}
