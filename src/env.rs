// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Abstract environment variable lookup so connect logic can be driven deterministically.
// Author: Lukas Bower

//! Environment lookup.

use std::collections::HashMap;

/// Environment variable naming the default filesystem URI.
pub const HDFS_DEFAULT_FS: &str = "HDFS_DEFAULT_FS";
/// Environment variable naming the directory holding `client.conf`.
pub const HADOOP_CONF_DIR: &str = "HADOOP_CONF_DIR";
/// Environment variable naming the HDFS user to act as.
pub const HADOOP_USER_NAME: &str = "HADOOP_USER_NAME";
/// Login user, used when `HADOOP_USER_NAME` is unset.
pub const USER: &str = "USER";

/// Source of environment variables.
pub trait EnvSource {
    /// Value of `key`, if set and valid Unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}
