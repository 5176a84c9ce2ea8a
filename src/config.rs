// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Parse client.conf style key/value sources into an ordered entry set.
// Author: Lukas Bower

//! Flat `key = value` configuration store.
//!
//! Blank lines and lines starting with `#` or `;` are ignored. The first `=`
//! separates key from value and both sides are trimmed of spaces and tabs.
//! Malformed lines are rejected one at a time; the rest of the source still
//! loads.

use std::collections::btree_map::{self, BTreeMap};
use std::fs;
use std::path::Path;

use log::{debug, error, info};

use crate::error::{ConfigLoadError, ConfigParseError, ParseFailure};

/// Ordered configuration entries. Last write for a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    entries: BTreeMap<String, String>,
}

/// Result of parsing a configuration source.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoad {
    /// Entries from every line that parsed.
    pub store: ConfigStore,
    /// Lines that were rejected.
    pub errors: Vec<ConfigParseError>,
}

impl ConfigLoad {
    /// True when no line was rejected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a file.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD, so they only
    /// affect the line they appear on.
    pub fn load(path: &Path) -> Result<ConfigLoad, ConfigLoadError> {
        let bytes = fs::read(path).map_err(|source| ConfigLoadError {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = Self::parse(&String::from_utf8_lossy(&bytes));
        info!(
            "loaded {} configuration items from {}",
            loaded.store.len(),
            path.display()
        );
        Ok(loaded)
    }

    /// Parse configuration text.
    #[must_use]
    pub fn parse(text: &str) -> ConfigLoad {
        let mut loaded = ConfigLoad::default();
        for (index, line) in text.lines().enumerate() {
            let content = trim_blanks(line);
            if content.is_empty() || content.starts_with('#') || content.starts_with(';') {
                continue;
            }
            match parse_line(content) {
                Ok((key, value)) => loaded.store.insert(key, value),
                Err(reason) => {
                    let err = ConfigParseError {
                        line: index + 1,
                        text: line.to_owned(),
                        reason,
                    };
                    error!("{err}");
                    loaded.errors.push(err);
                }
            }
        }
        loaded
    }

    /// Insert an entry, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Copy every entry of `other` over this store.
    pub fn merge(&mut self, other: &ConfigStore) {
        for (key, value) in other.entries() {
            self.insert(key, value);
        }
    }

    /// Value for `key`, or `default` when absent.
    #[must_use]
    pub fn get<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_opt(key).unwrap_or(default)
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate entries in key order.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            inner: self.entries.iter(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit every entry at debug level.
    pub fn log_entries(&self) {
        debug!("current configurations:");
        for (key, value) in self.entries() {
            debug!("  {key} = {value}");
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.insert(key, value);
        }
        store
    }
}

/// Iterator over `(key, value)` pairs in key order.
pub struct Entries<'a> {
    inner: btree_map::Iter<'a, String, String>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

fn trim_blanks(text: &str) -> &str {
    text.trim_matches(|c| c == ' ' || c == '\t')
}

fn parse_line(line: &str) -> Result<(&str, &str), ParseFailure> {
    let (key, value) = line.split_once('=').ok_or(ParseFailure::MissingSeparator)?;
    let key = trim_blanks(key);
    if key.is_empty() {
        return Err(ParseFailure::EmptyKey);
    }
    Ok((key, trim_blanks(value)))
}
