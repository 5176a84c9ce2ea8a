// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate bounded read/write, listing, deletion, and connection lifecycle of the client.
// Author: Lukas Bower

use std::collections::HashMap;

use hdfs_client::backend::memory::Faults;
use hdfs_client::env::HDFS_DEFAULT_FS;
use hdfs_client::{
    ClientError, ConnectOptions, FilesystemClient, MemoryBackend, MAX_READ_BYTES,
};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    client: FilesystemClient<MemoryBackend>,
    backend: MemoryBackend,
}

fn connected() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = MemoryBackend::new();
    let options = ConnectOptions {
        config_path: Some(dir.path().join("client.conf")),
        ..ConnectOptions::default()
    };
    let mut client = FilesystemClient::with_options(backend.clone(), options);
    let env: HashMap<String, String> =
        HashMap::from([(HDFS_DEFAULT_FS.to_owned(), "hdfs://nn:8020".to_owned())]);
    client.connect(&env).expect("connect");
    Harness {
        _dir: dir,
        client,
        backend,
    }
}

#[test]
fn operations_require_connection() {
    let mut client = FilesystemClient::new(MemoryBackend::new());
    assert!(matches!(
        client.list_directory("/"),
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(client.read_file("/f"), Err(ClientError::NotConnected)));
    assert!(matches!(
        client.write_file("/f", b"x"),
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(client.delete_file("/f"), Err(ClientError::NotConnected)));
}

#[test]
fn disconnect_is_idempotent() {
    let Harness {
        _dir,
        mut client,
        backend,
    } = connected();
    assert!(client.is_connected());
    client.disconnect();
    client.disconnect();
    assert!(!client.is_connected());
    assert_eq!(backend.stats().disconnects, 1);
    drop(client);
    assert_eq!(backend.stats().disconnects, 1);
}

#[test]
fn drop_releases_live_connection() {
    let Harness {
        _dir,
        client,
        backend,
    } = connected();
    drop(client);
    let stats = backend.stats();
    assert_eq!(stats.connections_opened, 1);
    assert_eq!(stats.disconnects, 1);
}

#[test]
fn reconnect_releases_previous_connection() {
    let mut harness = connected();
    let env: HashMap<String, String> =
        HashMap::from([(HDFS_DEFAULT_FS.to_owned(), "hdfs://nn:8020".to_owned())]);
    harness.client.connect(&env).expect("reconnect");
    let stats = harness.backend.stats();
    assert_eq!(stats.connections_opened, 2);
    assert_eq!(stats.disconnects, 1);
}

#[test]
fn small_file_reads_whole_content() {
    let mut harness = connected();
    harness.backend.put_file("/data/hello.txt", "hello, hdfs");
    let outcome = harness.client.read_file("/data/hello.txt").expect("read");
    assert_eq!(outcome.content, b"hello, hdfs");
    assert_eq!(outcome.remote_size, 11);
    assert!(!outcome.truncated);
    assert_eq!(harness.backend.stats().files_outstanding(), 0);
}

#[test]
fn large_file_is_truncated_to_read_cap() {
    let mut harness = connected();
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    harness.backend.put_file("/big.bin", content.clone());
    let outcome = harness.client.read_file("/big.bin").expect("read");
    assert_eq!(outcome.content.len(), MAX_READ_BYTES);
    assert_eq!(outcome.content, content[..MAX_READ_BYTES]);
    assert_eq!(outcome.remote_size, 10_000);
    assert!(outcome.truncated);
}

#[test]
fn empty_file_reads_nothing() {
    let mut harness = connected();
    harness.backend.put_file("/empty", Vec::new());
    let outcome = harness.client.read_file("/empty").expect("read");
    assert!(outcome.content.is_empty());
    assert!(!outcome.truncated);
}

#[test]
fn short_read_is_an_error_and_closes_file() {
    let mut harness = connected();
    harness.backend.put_file("/ten", vec![1u8; 10]);
    harness.backend.set_faults(Faults {
        short_read: Some(8),
        ..Faults::default()
    });
    match harness.client.read_file("/ten") {
        Err(ClientError::ShortRead { expected, read, .. }) => {
            assert_eq!(expected, 10);
            assert_eq!(read, 8);
        }
        other => panic!("expected short read, got {other:?}"),
    }
    assert_eq!(harness.backend.stats().files_outstanding(), 0);
}

#[test]
fn stat_failure_closes_opened_file() {
    let mut harness = connected();
    harness.backend.put_file("/f", "abc");
    harness.backend.set_faults(Faults {
        fail_stat: true,
        ..Faults::default()
    });
    assert!(matches!(
        harness.client.read_file("/f"),
        Err(ClientError::Stat { .. })
    ));
    let stats = harness.backend.stats();
    assert_eq!(stats.files_opened, 1);
    assert_eq!(stats.files_closed, 1);
}

#[test]
fn open_failure_opens_nothing() {
    let mut harness = connected();
    assert!(matches!(
        harness.client.read_file("/missing"),
        Err(ClientError::Open { .. })
    ));
    assert_eq!(harness.backend.stats().files_opened, 0);
}

#[test]
fn write_creates_and_truncates() {
    let mut harness = connected();
    harness.backend.put_file("/out.txt", "old content that is longer");
    let payload = vec![b'x'; 50];
    let written = harness.client.write_file("/out.txt", &payload).expect("write");
    assert_eq!(written, 50);
    assert_eq!(harness.backend.file("/out.txt").expect("stored"), payload);
    assert_eq!(harness.backend.stats().files_outstanding(), 0);
}

#[test]
fn short_write_is_an_error_and_closes_file() {
    let mut harness = connected();
    harness.backend.set_faults(Faults {
        short_write: Some(49),
        ..Faults::default()
    });
    match harness.client.write_file("/out.txt", &[0u8; 50]) {
        Err(ClientError::ShortWrite {
            expected, written, ..
        }) => {
            assert_eq!(expected, 50);
            assert_eq!(written, 49);
        }
        other => panic!("expected short write, got {other:?}"),
    }
    assert_eq!(harness.backend.stats().files_outstanding(), 0);
}

#[test]
fn listing_distinguishes_empty_from_failure() {
    let mut harness = connected();
    harness.backend.create_dir("/empty");
    harness.backend.put_file("/data/a", "a");
    harness.backend.put_file("/data/b", "b");
    assert!(harness.client.list_directory("/empty").expect("list").is_empty());
    assert_eq!(
        harness.client.list_directory("/data").expect("list"),
        vec!["/data/a".to_owned(), "/data/b".to_owned()]
    );
    assert!(matches!(
        harness.client.list_directory("/nope"),
        Err(ClientError::List { .. })
    ));
}

#[test]
fn delete_is_never_recursive() {
    let mut harness = connected();
    harness.backend.put_file("/data/a", "a");
    assert!(matches!(
        harness.client.delete_file("/data"),
        Err(ClientError::Delete { .. })
    ));
    harness.client.delete_file("/data/a").expect("delete file");
    assert!(harness.backend.file("/data/a").is_none());
    harness.client.delete_file("/data").expect("delete empty dir");
    assert!(matches!(
        harness.client.delete_file("/data"),
        Err(ClientError::Delete { .. })
    ));
}

#[test]
fn close_failure_after_read_keeps_content() {
    let mut harness = connected();
    harness.backend.put_file("/f", "abc");
    harness.backend.set_faults(Faults {
        fail_close: true,
        ..Faults::default()
    });
    let outcome = harness.client.read_file("/f").expect("read");
    assert_eq!(outcome.content, b"abc");
    assert_eq!(harness.backend.stats().files_outstanding(), 0);
}

#[test]
fn close_failure_after_write_is_reported() {
    let mut harness = connected();
    harness.backend.set_faults(Faults {
        fail_close: true,
        ..Faults::default()
    });
    assert!(matches!(
        harness.client.write_file("/out", b"abc"),
        Err(ClientError::Close { .. })
    ));
}
