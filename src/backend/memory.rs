// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide an in-process filesystem service with resource accounting and fault injection.
// Author: Lukas Bower

//! In-process backend.
//!
//! Every builder directive is recorded and every resource acquisition and
//! release is counted, so callers can assert exactly-once release. Faults
//! can be injected per primitive.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use super::{
    BackendError, FileKind, FileStatus, HdfsBackend, HdfsConnection, OpenMode, RawBuilder,
};

/// One configuration instruction received by a raw builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// NameNode host or URI.
    NameNode(String),
    /// NameNode port.
    Port(u16),
    /// Arbitrary configuration string.
    Config {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },
    /// Kerberos principal.
    Principal(String),
    /// krb5.conf path.
    Krb5Conf(String),
    /// Keytab path.
    Keytab(String),
}

/// Injected failures.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `new_builder` returns `None`.
    pub refuse_builder: bool,
    /// `builder_connect` fails with this message.
    pub reject_connect: Option<String>,
    /// `open_file` fails.
    pub fail_open: bool,
    /// `path_info` fails.
    pub fail_stat: bool,
    /// `list_directory` fails.
    pub fail_list: bool,
    /// `delete` fails.
    pub fail_delete: bool,
    /// `close_file` releases the handle but reports failure.
    pub fail_close: bool,
    /// `read` returns at most this many bytes.
    pub short_read: Option<usize>,
    /// `write` accepts at most this many bytes.
    pub short_write: Option<usize>,
}

/// Resource counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Raw builders handed out.
    pub builders_allocated: usize,
    /// Raw builders released without connecting.
    pub builders_freed: usize,
    /// Raw builders consumed by a connect attempt.
    pub builders_connected: usize,
    /// Connections established.
    pub connections_opened: usize,
    /// Connections released.
    pub disconnects: usize,
    /// Files opened.
    pub files_opened: usize,
    /// Files closed.
    pub files_closed: usize,
}

impl MemoryStats {
    /// Raw builders not yet released by either path.
    #[must_use]
    pub fn builders_outstanding(&self) -> usize {
        self.builders_allocated
            .saturating_sub(self.builders_freed)
            .saturating_sub(self.builders_connected)
    }

    /// Files currently open.
    #[must_use]
    pub fn files_outstanding(&self) -> usize {
        self.files_opened.saturating_sub(self.files_closed)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    faults: Faults,
    stats: MemoryStats,
    last_directives: Option<Vec<Directive>>,
}

/// Cloneable handle to an in-process filesystem service.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty service containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        state.dirs.insert("/".to_owned());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }

    /// Store a file, creating parent directories.
    pub fn put_file(&self, path: &str, content: impl Into<Vec<u8>>) {
        let path = normalize(path);
        let mut state = self.lock();
        add_parents(&mut state.dirs, &path);
        state.files.insert(path, content.into());
    }

    /// Create a directory and its parents.
    pub fn create_dir(&self, path: &str) {
        let path = normalize(path);
        let mut state = self.lock();
        add_parents(&mut state.dirs, &path);
        state.dirs.insert(path);
    }

    /// Contents of a stored file.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&normalize(path)).cloned()
    }

    /// Replace the injected faults.
    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    /// Snapshot of the resource counters.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        self.lock().stats
    }

    /// Directives carried by the most recent connect attempt.
    #[must_use]
    pub fn last_directives(&self) -> Option<Vec<Directive>> {
        self.lock().last_directives.clone()
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

fn add_parents(dirs: &mut BTreeSet<String>, path: &str) {
    let mut current = parent(path);
    while let Some(dir) = current {
        dirs.insert(dir.to_owned());
        current = parent(dir);
    }
}

/// Raw builder that records directives.
#[derive(Debug, Default)]
pub struct MemoryBuilder {
    directives: Vec<Directive>,
}

impl MemoryBuilder {
    fn has_name_node(&self) -> bool {
        self.directives
            .iter()
            .any(|directive| matches!(directive, Directive::NameNode(_)))
    }
}

impl RawBuilder for MemoryBuilder {
    fn set_name_node(&mut self, name_node: &str) {
        self.directives.push(Directive::NameNode(name_node.to_owned()));
    }

    fn set_name_node_port(&mut self, port: u16) {
        self.directives.push(Directive::Port(port));
    }

    fn conf_set_str(&mut self, key: &str, value: &str) {
        self.directives.push(Directive::Config {
            key: key.to_owned(),
            value: value.to_owned(),
        });
    }

    fn set_principal(&mut self, principal: &str) {
        self.directives.push(Directive::Principal(principal.to_owned()));
    }

    fn set_kerb5_conf(&mut self, path: &str) {
        self.directives.push(Directive::Krb5Conf(path.to_owned()));
    }

    fn set_keytab_file(&mut self, path: &str) {
        self.directives.push(Directive::Keytab(path.to_owned()));
    }
}

/// Live connection to a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

/// Open file on a [`MemoryConnection`].
#[derive(Debug)]
pub struct MemoryFile {
    path: String,
    mode: OpenMode,
    offset: usize,
}

impl HdfsBackend for MemoryBackend {
    type Builder = MemoryBuilder;
    type Connection = MemoryConnection;

    fn new_builder(&self) -> Option<MemoryBuilder> {
        let mut state = self.lock();
        if state.faults.refuse_builder {
            return None;
        }
        state.stats.builders_allocated += 1;
        Some(MemoryBuilder::default())
    }

    fn builder_connect(&self, builder: MemoryBuilder) -> Result<MemoryConnection, BackendError> {
        let mut state = self.lock();
        state.stats.builders_connected += 1;
        let has_name_node = builder.has_name_node();
        state.last_directives = Some(builder.directives);
        if let Some(reason) = state.faults.reject_connect.clone() {
            return Err(BackendError::new(reason));
        }
        if !has_name_node {
            return Err(BackendError::new("no NameNode configured"));
        }
        state.stats.connections_opened += 1;
        Ok(MemoryConnection {
            state: Arc::clone(&self.state),
        })
    }

    fn free_builder(&self, builder: MemoryBuilder) {
        debug!("releasing memory builder with {} directives", builder.directives.len());
        self.lock().stats.builders_freed += 1;
    }

    fn disconnect(&self, connection: MemoryConnection) {
        drop(connection);
        self.lock().stats.disconnects += 1;
    }
}

impl MemoryConnection {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }
}

impl HdfsConnection for MemoryConnection {
    type File = MemoryFile;

    fn list_directory(&mut self, path: &str) -> Result<Vec<FileStatus>, BackendError> {
        let state = self.lock();
        if state.faults.fail_list {
            return Err(BackendError::new(format!("listing {path} refused")));
        }
        let dir = normalize(path);
        if let Some(content) = state.files.get(&dir) {
            return Ok(vec![FileStatus {
                path: dir.clone(),
                size: content.len() as u64,
                kind: FileKind::File,
            }]);
        }
        if !state.dirs.contains(&dir) {
            return Err(BackendError::new(format!("{path}: no such file or directory")));
        }
        let mut entries: Vec<FileStatus> = state
            .dirs
            .iter()
            .filter(|candidate| parent(candidate) == Some(dir.as_str()))
            .map(|child| FileStatus {
                path: child.clone(),
                size: 0,
                kind: FileKind::Directory,
            })
            .collect();
        entries.extend(
            state
                .files
                .iter()
                .filter(|(candidate, _)| parent(candidate) == Some(dir.as_str()))
                .map(|(child, content)| FileStatus {
                    path: child.clone(),
                    size: content.len() as u64,
                    kind: FileKind::File,
                }),
        );
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn open_file(&mut self, path: &str, mode: OpenMode) -> Result<MemoryFile, BackendError> {
        let mut state = self.lock();
        if state.faults.fail_open {
            return Err(BackendError::new(format!("open {path} refused")));
        }
        let path = normalize(path);
        match mode {
            OpenMode::Read => {
                if !state.files.contains_key(&path) {
                    return Err(BackendError::new(format!("{path}: no such file")));
                }
            }
            OpenMode::WriteCreate => {
                if state.dirs.contains(&path) {
                    return Err(BackendError::new(format!("{path}: is a directory")));
                }
                add_parents(&mut state.dirs, &path);
                state.files.insert(path.clone(), Vec::new());
            }
        }
        state.stats.files_opened += 1;
        Ok(MemoryFile {
            path,
            mode,
            offset: 0,
        })
    }

    fn read(&mut self, file: &mut MemoryFile, buf: &mut [u8]) -> Result<usize, BackendError> {
        if file.mode != OpenMode::Read {
            return Err(BackendError::new(format!("{}: not open for reading", file.path)));
        }
        let state = self.lock();
        let content = state
            .files
            .get(&file.path)
            .ok_or_else(|| BackendError::new(format!("{}: no such file", file.path)))?;
        let start = file.offset.min(content.len());
        let mut count = (content.len() - start).min(buf.len());
        if let Some(cap) = state.faults.short_read {
            count = count.min(cap);
        }
        buf[..count].copy_from_slice(&content[start..start + count]);
        file.offset = start + count;
        Ok(count)
    }

    fn write(&mut self, file: &mut MemoryFile, data: &[u8]) -> Result<usize, BackendError> {
        if file.mode != OpenMode::WriteCreate {
            return Err(BackendError::new(format!("{}: not open for writing", file.path)));
        }
        let mut state = self.lock();
        let count = state
            .faults
            .short_write
            .map_or(data.len(), |cap| cap.min(data.len()));
        let content = state.files.entry(file.path.clone()).or_default();
        content.extend_from_slice(&data[..count]);
        file.offset += count;
        Ok(count)
    }

    fn flush(&mut self, _file: &mut MemoryFile) -> Result<(), BackendError> {
        Ok(())
    }

    fn close_file(&mut self, file: MemoryFile) -> Result<(), BackendError> {
        debug!("closing memory file {}", file.path);
        let mut state = self.lock();
        state.stats.files_closed += 1;
        if state.faults.fail_close {
            return Err(BackendError::new(format!("close {} refused", file.path)));
        }
        Ok(())
    }

    fn path_info(&mut self, path: &str) -> Result<FileStatus, BackendError> {
        let state = self.lock();
        if state.faults.fail_stat {
            return Err(BackendError::new(format!("stat {path} refused")));
        }
        let path = normalize(path);
        if let Some(content) = state.files.get(&path) {
            return Ok(FileStatus {
                path,
                size: content.len() as u64,
                kind: FileKind::File,
            });
        }
        if state.dirs.contains(&path) {
            return Ok(FileStatus {
                path,
                size: 0,
                kind: FileKind::Directory,
            });
        }
        Err(BackendError::new(format!("{path}: no such file or directory")))
    }

    fn delete(&mut self, path: &str, recursive: bool) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.faults.fail_delete {
            return Err(BackendError::new(format!("delete {path} refused")));
        }
        let path = normalize(path);
        if state.files.remove(&path).is_some() {
            return Ok(());
        }
        if path == "/" || !state.dirs.contains(&path) {
            return Err(BackendError::new(format!("{path}: no such file or directory")));
        }
        let prefix = format!("{path}/");
        let has_children = state.files.keys().any(|key| key.starts_with(&prefix))
            || state.dirs.iter().any(|key| key.starts_with(&prefix));
        if has_children && !recursive {
            return Err(BackendError::new(format!("{path}: directory is not empty")));
        }
        state.files.retain(|key, _| !key.starts_with(&prefix));
        state.dirs.retain(|key| !key.starts_with(&prefix));
        state.dirs.remove(&path);
        Ok(())
    }
}
