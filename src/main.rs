// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the hdfs_client tool.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! CLI entry point for the HDFS client.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use hdfs_client::{ConnectOptions, FilesystemClient, ProcessEnv, WebHdfsBackend, VERSION};

const ENVIRONMENT_HELP: &str = "\
Environment Variables:
  HDFS_DEFAULT_FS        Default FileSystem URI (e.g. hdfs://namenode:8020)
  CLASSPATH              Java classpath for HDFS libraries
  HADOOP_CONF_DIR        Directory containing client.conf
  HADOOP_USER_NAME       HDFS user to act as (default: $USER)
  RUST_LOG               Log filter (default: info)

Authentication:
  Requests use simple authentication (user.name). Kerberos (SPNEGO) is not
  supported: a configuration that sets hadoop.security.authentication=kerberos
  with a principal is rejected at connect time.";

#[derive(Debug, Parser)]
#[command(
    name = "hdfs_client",
    version,
    about = "Client for interacting with Apache Hadoop HDFS",
    after_help = ENVIRONMENT_HELP
)]
struct Cli {
    /// Client config file (overrides HADOOP_CONF_DIR/client.conf).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Extra configuration applied after client.conf.
    #[arg(long = "conf", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    overrides: Vec<(String, String)>,

    /// NameNode port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Hadoop configuration directory handed to the service.
    #[arg(long, value_name = "DIR", global = true)]
    hadoop_conf_dir: Option<String>,

    /// Request the service's default configuration.
    #[arg(long, default_value_t = false, global = true)]
    use_default_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List files in a directory.
    List { path: String },
    /// Read file content.
    Read { path: String },
    /// Write content to a file.
    Write { path: String, content: String },
    /// Delete a file.
    Delete { path: String },
    /// Show version information.
    Version,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("configuration key must not be empty".to_owned());
    }
    Ok((key.to_owned(), value.trim().to_owned()))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = err.print();
            return code;
        }
    };
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_version() {
    println!("HDFS Client Version {VERSION}");
    println!("A Rust client for interacting with Apache Hadoop HDFS");
    println!("Using the WebHDFS REST interface");
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Version = cli.command {
        print_version();
        return Ok(());
    }

    let options = ConnectOptions {
        config_path: cli.config,
        port: cli.port,
        overrides: cli.overrides,
        use_default_configuration: cli.use_default_config,
        hadoop_conf_dir: cli.hadoop_conf_dir,
    };
    let backend = WebHdfsBackend::from_env(&ProcessEnv);
    let mut client = FilesystemClient::with_options(backend, options);
    client.connect(&ProcessEnv).context("failed to connect to HDFS")?;

    let result = match cli.command {
        Command::List { path } => {
            let entries = client.list_directory(&path)?;
            println!("Files in {path}:");
            for entry in entries {
                println!("  {entry}");
            }
            Ok(())
        }
        Command::Read { path } => {
            let outcome = client
                .read_file(&path)
                .with_context(|| format!("failed to read file: {path}"))?;
            println!(
                "Successfully read {} bytes from {path}",
                outcome.content.len()
            );
            if outcome.truncated {
                println!(
                    "Note: file size ({} bytes) exceeds maximum read size; content truncated",
                    outcome.remote_size
                );
            }
            Ok(())
        }
        Command::Write { path, content } => {
            let written = client
                .write_file(&path, content.as_bytes())
                .with_context(|| format!("failed to write to file: {path}"))?;
            println!("Successfully wrote {written} bytes to file: {path}");
            Ok(())
        }
        Command::Delete { path } => {
            client
                .delete_file(&path)
                .with_context(|| format!("failed to delete file: {path}"))?;
            println!("Successfully deleted file: {path}");
            Ok(())
        }
        Command::Version => Err(anyhow!("version does not require a connection")),
    };
    client.disconnect();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_overrides_are_trimmed() {
        assert_eq!(
            parse_key_value(" dfs.replication = 2 ").expect("pair"),
            ("dfs.replication".to_owned(), "2".to_owned())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn cli_parses_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hdfs_client",
            "read",
            "/tmp/a",
            "--conf",
            "a=b",
            "--port",
            "9870",
        ])
        .expect("parse");
        assert_eq!(cli.overrides, vec![("a".to_owned(), "b".to_owned())]);
        assert_eq!(cli.port, Some(9870));
        assert!(matches!(cli.command, Command::Read { ref path } if path == "/tmp/a"));
    }
}
