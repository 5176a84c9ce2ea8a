// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Reach an HDFS NameNode through the WebHDFS REST API.
// Author: Lukas Bower

//! WebHDFS backend.
//!
//! Uses the NameNode HTTP endpoint (`/webhdfs/v1`). Uploads follow the
//! two-step redirect protocol: the NameNode answers the first request with
//! a `Location` pointing at a DataNode, and the payload goes there.
//!
//! Only simple authentication (`user.name`) is available. The user is
//! `hadoop.user.name` from the builder configuration, else the user the
//! backend was created with. A builder that carries a Kerberos principal is
//! rejected at connect time.

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::env::{EnvSource, HADOOP_USER_NAME, USER};

use super::{
    BackendError, FileKind, FileStatus, HdfsBackend, HdfsConnection, OpenMode, RawBuilder,
};

/// Default NameNode HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 9870;
/// Default NameNode HTTPS port.
pub const DEFAULT_HTTPS_PORT: u16 = 9871;

const HTTP_ADDRESS_KEY: &str = "dfs.namenode.http-address";
const DEFAULT_FS_KEY: &str = "fs.defaultFS";
const USER_NAME_KEY: &str = "hadoop.user.name";
const CONNECT_TIMEOUT_KEY: &str = "dfs.webhdfs.socket.connect-timeout";
const READ_TIMEOUT_KEY: &str = "dfs.webhdfs.socket.read-timeout";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_REDIRECTS: usize = 4;

/// Backend talking to a WebHDFS endpoint.
#[derive(Debug, Clone, Default)]
pub struct WebHdfsBackend {
    user: Option<String>,
}

impl WebHdfsBackend {
    /// Create a backend with no default user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend acting as `user` unless the configuration names one.
    #[must_use]
    pub fn with_user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
        }
    }

    /// Take the default user from `HADOOP_USER_NAME`, else `USER`.
    pub fn from_env(env: &impl EnvSource) -> Self {
        let user = [HADOOP_USER_NAME, USER]
            .into_iter()
            .find_map(|key| env.var(key).filter(|value| !value.is_empty()));
        Self { user }
    }

    /// Default user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn effective_user(&self, conf: &BTreeMap<String, String>) -> Option<String> {
        conf.get(USER_NAME_KEY)
            .filter(|value| !value.is_empty())
            .cloned()
            .or_else(|| self.user.clone())
    }
}

/// Directives collected for a WebHDFS connection.
#[derive(Debug, Default)]
pub struct WebHdfsBuilder {
    name_node: Option<String>,
    port: Option<u16>,
    conf: BTreeMap<String, String>,
    principal: Option<String>,
    krb5_conf: Option<String>,
    keytab: Option<String>,
}

impl RawBuilder for WebHdfsBuilder {
    fn set_name_node(&mut self, name_node: &str) {
        self.name_node = Some(name_node.to_owned());
    }

    fn set_name_node_port(&mut self, port: u16) {
        self.port = Some(port);
    }

    fn conf_set_str(&mut self, key: &str, value: &str) {
        self.conf.insert(key.to_owned(), value.to_owned());
    }

    fn set_principal(&mut self, principal: &str) {
        self.principal = Some(principal.to_owned());
    }

    fn set_kerb5_conf(&mut self, path: &str) {
        self.krb5_conf = Some(path.to_owned());
    }

    fn set_keytab_file(&mut self, path: &str) {
        self.keytab = Some(path.to_owned());
    }
}

/// Live WebHDFS session.
pub struct WebHdfsConnection {
    agent: ureq::Agent,
    base_url: String,
    user: Option<String>,
    // Status fetched by the last read-mode open, handed to the next stat of the same path.
    opened_status: Option<FileStatus>,
}

/// Open WebHDFS file. Writes are buffered until flush or close.
#[derive(Debug)]
pub struct WebHdfsFile {
    path: String,
    mode: OpenMode,
    offset: u64,
    pending: Vec<u8>,
}

impl HdfsBackend for WebHdfsBackend {
    type Builder = WebHdfsBuilder;
    type Connection = WebHdfsConnection;

    fn new_builder(&self) -> Option<WebHdfsBuilder> {
        Some(WebHdfsBuilder::default())
    }

    fn builder_connect(&self, builder: WebHdfsBuilder) -> Result<WebHdfsConnection, BackendError> {
        if let Some(principal) = &builder.principal {
            return Err(BackendError::new(format!(
                "Kerberos principal {principal} requested, but SPNEGO authentication is not supported by the WebHDFS backend"
            )));
        }
        if builder.keytab.is_some() || builder.krb5_conf.is_some() {
            debug!(
                "ignoring keytab {:?} and krb5.conf {:?} without a principal",
                builder.keytab, builder.krb5_conf
            );
        }
        let name_node = builder
            .name_node
            .as_deref()
            .ok_or_else(|| BackendError::new("no NameNode configured"))?;
        let base_url = resolve_base_url(name_node, builder.port, &builder.conf)?;
        let agent = ureq::AgentBuilder::new()
            .redirects(0)
            .timeout_connect(timeout_from_conf(&builder.conf, CONNECT_TIMEOUT_KEY)?)
            .timeout_read(timeout_from_conf(&builder.conf, READ_TIMEOUT_KEY)?)
            .build();
        let mut connection = WebHdfsConnection {
            agent,
            base_url,
            user: self.effective_user(&builder.conf),
            opened_status: None,
        };
        info!(
            "probing WebHDFS endpoint {} as {}",
            connection.base_url,
            connection.user.as_deref().unwrap_or("<anonymous>")
        );
        connection.path_info("/").map_err(|err| {
            BackendError::new(format!(
                "WebHDFS endpoint {} is not reachable: {err}",
                connection.base_url
            ))
        })?;
        Ok(connection)
    }

    fn free_builder(&self, builder: WebHdfsBuilder) {
        debug!("releasing WebHDFS builder for {:?}", builder.name_node);
    }

    fn disconnect(&self, connection: WebHdfsConnection) {
        debug!("closing WebHDFS session to {}", connection.base_url);
    }
}

/// Map a filesystem URI or host to the NameNode HTTP base URL.
pub fn resolve_base_url(
    name_node: &str,
    port: Option<u16>,
    conf: &BTreeMap<String, String>,
) -> Result<String, BackendError> {
    let name_node = if name_node == "default" {
        conf.get(DEFAULT_FS_KEY)
            .map(String::as_str)
            .ok_or_else(|| BackendError::new("NameNode 'default' requires fs.defaultFS"))?
    } else {
        name_node
    };
    let (scheme, rest) = match name_node.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("hdfs".to_owned(), name_node),
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let (host, uri_port) = split_host_port(authority)?;
    if host.is_empty() {
        return Err(BackendError::new(format!("no host in NameNode address {name_node:?}")));
    }
    let (http_scheme, default_port) = match scheme.as_str() {
        "http" | "webhdfs" => ("http", uri_port.unwrap_or(DEFAULT_HTTP_PORT)),
        "https" | "swebhdfs" => ("https", uri_port.unwrap_or(DEFAULT_HTTPS_PORT)),
        "hdfs" => ("http", http_address_port(conf)?.unwrap_or(DEFAULT_HTTP_PORT)),
        other => {
            return Err(BackendError::new(format!(
                "unsupported filesystem scheme {other:?}"
            )))
        }
    };
    let port = port.unwrap_or(default_port);
    Ok(format!("{http_scheme}://{host}:{port}"))
}

fn split_host_port(authority: &str) -> Result<(&str, Option<u16>), BackendError> {
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    if let Some(stripped) = authority.strip_prefix('[') {
        let (host, tail) = stripped
            .split_once(']')
            .ok_or_else(|| BackendError::new(format!("malformed IPv6 address {authority:?}")))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => Some(parse_port(port)?),
            None => None,
        };
        return Ok((host, port));
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((authority, None)),
    }
}

fn parse_port(text: &str) -> Result<u16, BackendError> {
    text.parse()
        .map_err(|_| BackendError::new(format!("invalid port {text:?}")))
}

fn http_address_port(conf: &BTreeMap<String, String>) -> Result<Option<u16>, BackendError> {
    match conf.get(HTTP_ADDRESS_KEY) {
        Some(address) => Ok(split_host_port(address)?.1),
        None => Ok(None),
    }
}

/// Parse a Hadoop duration value: bare numbers are milliseconds.
pub fn parse_hadoop_duration(value: &str) -> Result<Duration, BackendError> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<u64>() {
        return Ok(Duration::from_millis(millis));
    }
    humantime::parse_duration(value)
        .map_err(|err| BackendError::new(format!("invalid duration {value:?}: {err}")))
}

fn timeout_from_conf(conf: &BTreeMap<String, String>, key: &str) -> Result<Duration, BackendError> {
    conf.get(key)
        .map_or(Ok(DEFAULT_TIMEOUT), |value| parse_hadoop_duration(value))
}

fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    if !path.starts_with('/') {
        out.push('/');
    }
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn join_path(dir: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        dir.to_owned()
    } else if dir.ends_with('/') {
        format!("{dir}{suffix}")
    } else {
        format!("{dir}/{suffix}")
    }
}

#[derive(Debug, Deserialize)]
struct WireFileStatus {
    #[serde(rename = "pathSuffix", default)]
    path_suffix: String,
    #[serde(default)]
    length: u64,
    #[serde(rename = "type")]
    kind: String,
}

impl WireFileStatus {
    fn into_status(self, dir: &str) -> FileStatus {
        FileStatus {
            path: join_path(dir, &self.path_suffix),
            size: self.length,
            kind: if self.kind == "DIRECTORY" {
                FileKind::Directory
            } else {
                FileKind::File
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    file_status: WireFileStatus,
}

#[derive(Debug, Deserialize)]
struct FileStatusesResponse {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatusList,
}

#[derive(Debug, Deserialize)]
struct FileStatusList {
    #[serde(rename = "FileStatus", default)]
    file_status: Vec<WireFileStatus>,
}

#[derive(Debug, Deserialize)]
struct BooleanResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    #[serde(default)]
    exception: String,
    #[serde(default)]
    message: String,
}

fn describe_status(code: u16, body: &str) -> BackendError {
    match serde_json::from_str::<RemoteExceptionResponse>(body) {
        Ok(parsed) => BackendError::new(format!(
            "{}: {}",
            parsed.remote_exception.exception, parsed.remote_exception.message
        )),
        Err(_) => BackendError::new(format!("HTTP status {code}")),
    }
}

fn map_ureq_error(err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            describe_status(code, &body)
        }
        ureq::Error::Transport(transport) => BackendError::new(transport.to_string()),
    }
}

fn parse_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, BackendError> {
    let body = response
        .into_string()
        .map_err(|err| BackendError::new(format!("failed to read response: {err}")))?;
    serde_json::from_str(&body)
        .map_err(|err| BackendError::new(format!("malformed WebHDFS response: {err}")))
}

impl WebHdfsConnection {
    fn operation_url(&self, path: &str) -> String {
        format!("{}/webhdfs/v1{}", self.base_url, encode_path(path))
    }

    fn request(
        &self,
        method: &str,
        path: &str,
        op: &str,
        params: &[(&str, String)],
        body: Option<&[u8]>,
    ) -> Result<ureq::Response, BackendError> {
        let mut request = self
            .agent
            .request(method, &self.operation_url(path))
            .query("op", op);
        if let Some(user) = &self.user {
            request = request.query("user.name", user);
        }
        for (key, value) in params {
            request = request.query(key, value);
        }
        debug!("WebHDFS {method} {op} {path}");
        let mut response = request.call().map_err(map_ureq_error)?;
        let mut hops = 0;
        while (300..400).contains(&response.status()) {
            let location = response
                .header("Location")
                .ok_or_else(|| BackendError::new(format!("{op} redirect without Location")))?
                .to_owned();
            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(BackendError::new(format!("{op} exceeded {MAX_REDIRECTS} redirects")));
            }
            let follow = self.agent.request(method, &location);
            response = match body {
                Some(data) => follow
                    .set("Content-Type", "application/octet-stream")
                    .send_bytes(data),
                None => follow.call(),
            }
            .map_err(map_ureq_error)?;
        }
        if hops == 0 && body.is_some_and(|data| !data.is_empty()) {
            return Err(BackendError::new(format!(
                "{op} on {path} was not redirected to a DataNode; payload not sent"
            )));
        }
        Ok(response)
    }

    fn upload(&mut self, file: &mut WebHdfsFile) -> Result<(), BackendError> {
        if file.pending.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut file.pending);
        self.request("POST", &file.path, "APPEND", &[], Some(&data))?;
        file.offset += data.len() as u64;
        Ok(())
    }
}

impl HdfsConnection for WebHdfsConnection {
    type File = WebHdfsFile;

    fn list_directory(&mut self, path: &str) -> Result<Vec<FileStatus>, BackendError> {
        let response = self.request("GET", path, "LISTSTATUS", &[], None)?;
        let parsed: FileStatusesResponse = parse_json(response)?;
        Ok(parsed
            .file_statuses
            .file_status
            .into_iter()
            .map(|status| status.into_status(path))
            .collect())
    }

    fn open_file(&mut self, path: &str, mode: OpenMode) -> Result<WebHdfsFile, BackendError> {
        match mode {
            OpenMode::Read => {
                let status = self.path_info(path)?;
                if status.kind == FileKind::Directory {
                    return Err(BackendError::new(format!("{path} is a directory")));
                }
                self.opened_status = Some(status);
            }
            OpenMode::WriteCreate => {
                self.request(
                    "PUT",
                    path,
                    "CREATE",
                    &[("overwrite", "true".to_owned())],
                    Some(&[][..]),
                )?;
            }
        }
        Ok(WebHdfsFile {
            path: path.to_owned(),
            mode,
            offset: 0,
            pending: Vec::new(),
        })
    }

    fn read(&mut self, file: &mut WebHdfsFile, buf: &mut [u8]) -> Result<usize, BackendError> {
        if file.mode != OpenMode::Read {
            return Err(BackendError::new(format!("{} is not open for reading", file.path)));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let params = [
            ("offset", file.offset.to_string()),
            ("length", buf.len().to_string()),
        ];
        let response = self.request("GET", &file.path, "OPEN", &params, None)?;
        let mut reader = response.into_reader();
        let mut filled = 0;
        while filled < buf.len() {
            let count = reader
                .read(&mut buf[filled..])
                .map_err(|err| BackendError::new(format!("read {} failed: {err}", file.path)))?;
            if count == 0 {
                break;
            }
            filled += count;
        }
        file.offset += filled as u64;
        Ok(filled)
    }

    fn write(&mut self, file: &mut WebHdfsFile, data: &[u8]) -> Result<usize, BackendError> {
        if file.mode != OpenMode::WriteCreate {
            return Err(BackendError::new(format!("{} is not open for writing", file.path)));
        }
        file.pending.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self, file: &mut WebHdfsFile) -> Result<(), BackendError> {
        self.upload(file)
    }

    fn close_file(&mut self, mut file: WebHdfsFile) -> Result<(), BackendError> {
        self.opened_status = None;
        self.upload(&mut file)
    }

    fn path_info(&mut self, path: &str) -> Result<FileStatus, BackendError> {
        if let Some(status) = self.opened_status.take() {
            if status.path == path {
                return Ok(status);
            }
        }
        let response = self.request("GET", path, "GETFILESTATUS", &[], None)?;
        let parsed: FileStatusResponse = parse_json(response)?;
        Ok(parsed.file_status.into_status(path))
    }

    fn delete(&mut self, path: &str, recursive: bool) -> Result<(), BackendError> {
        let params = [("recursive", recursive.to_string())];
        let response = self.request("DELETE", path, "DELETE", &params, None)?;
        let parsed: BooleanResponse = parse_json(response)?;
        if parsed.boolean {
            Ok(())
        } else {
            Err(BackendError::new(format!("{path} was not deleted")))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn conf(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn hdfs_uri_maps_to_default_http_port() {
        let url = resolve_base_url("hdfs://nn.example.com:8020", None, &conf(&[])).expect("url");
        assert_eq!(url, "http://nn.example.com:9870");
    }

    #[test]
    fn hdfs_uri_uses_configured_http_address_port() {
        let conf = conf(&[(HTTP_ADDRESS_KEY, "0.0.0.0:50070")]);
        let url = resolve_base_url("hdfs://nn:8020/", None, &conf).expect("url");
        assert_eq!(url, "http://nn:50070");
    }

    #[test]
    fn explicit_port_directive_wins() {
        let url = resolve_base_url("http://nn:9870", Some(14000), &conf(&[])).expect("url");
        assert_eq!(url, "http://nn:14000");
    }

    #[test]
    fn secure_scheme_and_default_alias() {
        let conf = conf(&[(DEFAULT_FS_KEY, "swebhdfs://nn")]);
        let url = resolve_base_url("default", None, &conf).expect("url");
        assert_eq!(url, "https://nn:9871");
    }

    #[test]
    fn rejects_unknown_scheme_and_bad_port() {
        assert!(resolve_base_url("s3://bucket", None, &conf(&[])).is_err());
        assert!(resolve_base_url("hdfs://nn:notaport", None, &conf(&[])).is_err());
    }

    #[test]
    fn kerberos_principal_is_rejected_before_any_request() {
        let backend = WebHdfsBackend::new();
        let mut builder = backend.new_builder().expect("builder");
        builder.set_name_node("hdfs://nn:8020");
        builder.set_principal("hdfs/nn@EXAMPLE.COM");
        let err = backend.builder_connect(builder).err().expect("rejected");
        assert!(err.message().contains("SPNEGO"));
    }

    #[test]
    fn configured_user_beats_environment_user() {
        let env: HashMap<String, String> = HashMap::from([
            (HADOOP_USER_NAME.to_owned(), "hdfs".to_owned()),
            (USER.to_owned(), "alice".to_owned()),
        ]);
        let backend = WebHdfsBackend::from_env(&env);
        assert_eq!(backend.user(), Some("hdfs"));
        assert_eq!(backend.effective_user(&conf(&[])).as_deref(), Some("hdfs"));
        assert_eq!(
            backend
                .effective_user(&conf(&[(USER_NAME_KEY, "etl")]))
                .as_deref(),
            Some("etl")
        );
        assert_eq!(
            backend.effective_user(&conf(&[(USER_NAME_KEY, "")])).as_deref(),
            Some("hdfs")
        );
    }

    #[test]
    fn login_user_is_the_fallback() {
        let env: HashMap<String, String> = HashMap::from([
            (HADOOP_USER_NAME.to_owned(), String::new()),
            (USER.to_owned(), "alice".to_owned()),
        ]);
        assert_eq!(WebHdfsBackend::from_env(&env).user(), Some("alice"));
        let empty: HashMap<String, String> = HashMap::new();
        assert_eq!(WebHdfsBackend::from_env(&empty).user(), None);
        assert_eq!(WebHdfsBackend::with_user("bob").user(), Some("bob"));
    }

    #[test]
    fn paths_are_percent_encoded() {
        assert_eq!(encode_path("/user/a b/ü"), "/user/a%20b/%C3%BC");
        assert_eq!(encode_path("relative"), "/relative");
    }

    #[test]
    fn hadoop_durations_accept_millis_and_units() {
        assert_eq!(parse_hadoop_duration("1500").expect("ms"), Duration::from_millis(1500));
        assert_eq!(parse_hadoop_duration("60s").expect("s"), Duration::from_secs(60));
        assert!(parse_hadoop_duration("soon").is_err());
    }

    #[test]
    fn remote_exception_bodies_are_described() {
        let body = r#"{"RemoteException":{"exception":"FileNotFoundException","javaClassName":"java.io.FileNotFoundException","message":"File does not exist: /missing"}}"#;
        let err = describe_status(404, body);
        assert_eq!(err.message(), "FileNotFoundException: File does not exist: /missing");
        assert_eq!(describe_status(500, "oops").message(), "HTTP status 500");
    }

    #[test]
    fn list_entries_join_suffixes() {
        let body = r#"{"FileStatuses":{"FileStatus":[
            {"pathSuffix":"a.txt","length":3,"type":"FILE"},
            {"pathSuffix":"sub","length":0,"type":"DIRECTORY"}
        ]}}"#;
        let parsed: FileStatusesResponse = serde_json::from_str(body).expect("parse");
        let statuses: Vec<FileStatus> = parsed
            .file_statuses
            .file_status
            .into_iter()
            .map(|status| status.into_status("/data"))
            .collect();
        assert_eq!(statuses[0].path, "/data/a.txt");
        assert_eq!(statuses[0].size, 3);
        assert_eq!(statuses[1].kind, FileKind::Directory);
    }
}
