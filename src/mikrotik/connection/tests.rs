// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Connection tests against an in-memory fake router

use std::time::Duration;

use secrecy::SecretString;
use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

use super::*;

async fn device_reads_sentence(stream: &mut DuplexStream) -> Vec<String> {
    read_sentence(stream).await.unwrap().words
}

async fn device_writes(stream: &mut DuplexStream, sentences: &[&[&str]]) {
    let mut buf = Vec::new();
    for sentence in sentences {
        for word in *sentence {
            buf.extend(encode_word(word));
        }
        buf.push(0);
    }
    stream.write_all(&buf).await.unwrap();
}

fn pair() -> (RouterOsConnection<DuplexStream>, DuplexStream) {
    let (client, device) = duplex(64 * 1024);
    (
        RouterOsConnection::from_stream(client, Duration::from_secs(5)),
        device,
    )
}

#[tokio::test]
async fn test_write_buffers_until_final_word() {
    let (mut conn, mut device) = pair();
    conn.write("/ppp/secret/print", false).await.unwrap();
    conn.write("?name=jdoe", true).await.unwrap();

    let words = device_reads_sentence(&mut device).await;
    assert_eq!(words, vec!["/ppp/secret/print", "?name=jdoe"]);
}

#[tokio::test]
async fn test_single_re_row_then_done() {
    let (mut conn, mut device) = pair();
    device_writes(
        &mut device,
        &[&["!re", "=.id=*A", "=name=jdoe", "=profile=10M"], &["!done"]],
    )
    .await;

    let rows = conn.read().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "jdoe");
    assert_eq!(rows[0][".id"], "*A");
}

#[tokio::test]
async fn test_trap_yields_rejected_command_with_message() {
    let (mut conn, mut device) = pair();
    conn.send("/ppp/secret/add", ["=name=jdoe"]).await.unwrap();
    device_writes(
        &mut device,
        &[
            &["!trap", "=message=failure: secret with the same name already exists"],
            &["!done"],
        ],
    )
    .await;

    match conn.read().await {
        Err(Error::DeviceRejectedCommand {
            command, message, ..
        }) => {
            assert_eq!(command, "/ppp/secret/add");
            assert_eq!(message, "failure: secret with the same name already exists");
        }
        other => panic!("expected trap, got {other:?}"),
    }
    // trailing !done was consumed; the connection stays usable
    assert!(conn.is_connected());
    device_writes(&mut device, &[&["!done"]]).await;
    assert!(conn.read().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_raw_returns_unparsed_sentences() {
    let (mut conn, mut device) = pair();
    device_writes(&mut device, &[&["!re", "=name=pool1"], &["!done"]]).await;

    let sentences = conn.read_raw().await.unwrap();
    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0].words, vec!["!re", "=name=pool1"]);
    assert_eq!(sentences[1].kind(), ReplyKind::Done);
}

#[tokio::test]
async fn test_empty_reply_marker() {
    let (mut conn, mut device) = pair();
    device_writes(&mut device, &[&["!empty"], &["!done"]]).await;
    assert!(conn.read().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fatal_closes_connection() {
    let (mut conn, mut device) = pair();
    device_writes(&mut device, &[&["!fatal", "session terminated on request"]]).await;

    assert!(matches!(conn.read().await, Err(Error::Connection(_))));
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_truncated_stream_is_decode_error() {
    let (mut conn, mut device) = pair();
    device.write_all(&[0x03, b'!', b'r']).await.unwrap();
    drop(device);

    assert!(matches!(conn.read().await, Err(Error::ProtocolDecode(_))));
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_reserved_length_byte_is_decode_error() {
    let (mut conn, mut device) = pair();
    device.write_all(&[0xF8, 0x00]).await.unwrap();

    assert!(matches!(conn.read().await, Err(Error::ProtocolDecode(_))));
}

#[tokio::test(start_paused = true)]
async fn test_read_timeout_is_connection_error() {
    let (mut conn, _device) = pair();
    assert!(matches!(conn.read().await, Err(Error::Connection(_))));
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (mut conn, _device) = pair();
    conn.disconnect().await;
    conn.disconnect().await;
    assert!(!conn.is_connected());
    assert!(matches!(
        conn.write("/system/resource/print", true).await,
        Err(Error::Connection(_))
    ));
}

#[tokio::test]
async fn test_plain_login() {
    let (mut conn, mut device) = pair();
    let router = tokio::spawn(async move {
        let words = device_reads_sentence(&mut device).await;
        device_writes(&mut device, &[&["!done"]]).await;
        words
    });

    conn.login("admin", &SecretString::from("secret".to_string()))
        .await
        .unwrap();
    let words = router.await.unwrap();
    assert_eq!(words, vec!["/login", "=name=admin", "=password=secret"]);
}

#[tokio::test]
async fn test_challenge_login() {
    let (mut conn, mut device) = pair();
    let router = tokio::spawn(async move {
        let _first = device_reads_sentence(&mut device).await;
        device_writes(&mut device, &[&["!done", "=ret=ebddd18a8e11a1c8a0d4d0e0a24bd2bd"]]).await;
        let second = device_reads_sentence(&mut device).await;
        device_writes(&mut device, &[&["!done"]]).await;
        second
    });

    conn.login("admin", &SecretString::from("secret".to_string()))
        .await
        .unwrap();
    let second = router.await.unwrap();
    assert_eq!(
        second,
        vec![
            "/login",
            "=name=admin",
            "=response=008a14fda631d7eb4bf6cd0b1edde7b2fe"
        ]
    );
}

#[tokio::test]
async fn test_rejected_login_is_authentication_error() {
    let (mut conn, mut device) = pair();
    tokio::spawn(async move {
        let _ = device_reads_sentence(&mut device).await;
        device_writes(
            &mut device,
            &[&["!trap", "=message=invalid user name or password (6)"], &["!done"]],
        )
        .await;
        // keep the pipe open until the client is done
        tokio::time::sleep(Duration::from_millis(100)).await;
    });

    match conn.login("admin", &SecretString::from("wrong".to_string())).await {
        Err(Error::Authentication { user, reason }) => {
            assert_eq!(user, "admin");
            assert!(reason.contains("invalid user name or password"));
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_refused_is_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let endpoint = DeviceEndpoint::new("127.0.0.1", port, "admin", "");
    let result = RouterOsConnection::connect(&endpoint, Timeouts::routeros()).await;
    assert!(matches!(result, Err(Error::Connection(_))));
}
