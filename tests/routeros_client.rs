// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use isp_provisioner::mikrotik::{PppProfile, PppSecret, RateLimit, encode_word};
use isp_provisioner::{Change, DeviceEndpoint, Error, MikroTikClient, decode_length};

async fn read_word(stream: &mut TcpStream) -> Option<String> {
    let first = stream.read_u8().await.ok()?;
    let size = match first {
        b if b & 0x80 == 0x00 => 1,
        b if b & 0xC0 == 0x80 => 2,
        b if b & 0xE0 == 0xC0 => 3,
        b if b & 0xF0 == 0xE0 => 4,
        _ => 5,
    };
    let mut prefix = vec![first; size];
    stream.read_exact(&mut prefix[1..]).await.ok()?;
    let (len, _) = decode_length(&prefix).ok()?;
    let mut body = vec![0; len];
    stream.read_exact(&mut body).await.ok()?;
    Some(String::from_utf8_lossy(&body).into_owned())
}

async fn read_sentence(stream: &mut TcpStream) -> Option<Vec<String>> {
    let mut words = Vec::new();
    loop {
        let word = read_word(stream).await?;
        if word.is_empty() {
            return Some(words);
        }
        words.push(word);
    }
}

/// Accepts one connection, answers the login and then one scripted reply
/// per sentence. Returns every sentence received after the login.
async fn fake_router(
    replies: Vec<Vec<Vec<&'static str>>>,
) -> (DeviceEndpoint, JoinHandle<Vec<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut replies = replies.into_iter();

        let login = read_sentence(&mut stream).await.unwrap();
        assert_eq!(login[0], "/login");
        stream.write_all(&[&encode_word("!done")[..], &[0]].concat()).await.unwrap();

        while let Some(sentence) = read_sentence(&mut stream).await {
            received.push(sentence);
            let Some(reply) = replies.next() else {
                break;
            };
            let mut buf = Vec::new();
            for sentence in reply {
                for word in sentence {
                    buf.extend(encode_word(word));
                }
                buf.push(0);
            }
            stream.write_all(&buf).await.unwrap();
        }
        received
    });

    (
        DeviceEndpoint::new("127.0.0.1", port, "admin", "secret"),
        handle,
    )
}

#[tokio::test]
async fn test_router_info_over_one_connection() {
    let (endpoint, router) = fake_router(vec![
        vec![
            vec![
                "!re",
                "=uptime=3d4h",
                "=cpu-load=7",
                "=free-memory=1000",
                "=total-memory=2000",
                "=version=7.15.2 (stable)",
                "=board-name=hAP ac^2",
                "=architecture-name=arm",
                "=cpu=ARMv7",
            ],
            vec!["!done"],
        ],
        vec![
            vec![
                "!re",
                "=model=RBD52G-5HacD2HnD",
                "=serial-number=ABC123",
                "=current-firmware=7.15.2",
            ],
            vec!["!done"],
        ],
    ])
    .await;

    let info = MikroTikClient::new(endpoint).router_info().await.unwrap();
    assert_eq!(info.model, "hAP ac^2");
    assert_eq!(info.board_name, "RBD52G-5HacD2HnD");
    assert_eq!(info.firmware_version, "7.15.2");
    assert_eq!(info.uptime, "3d4h");

    let received = router.await.unwrap();
    assert_eq!(received[0], vec!["/system/resource/print"]);
    assert_eq!(received[1], vec!["/system/routerboard/print"]);
}

#[tokio::test]
async fn test_upsert_profile_updates_existing() {
    let (endpoint, router) = fake_router(vec![
        vec![
            vec!["!re", "=.id=*3", "=name=10M", "=rate-limit=5M/10M"],
            vec!["!done"],
        ],
        vec![vec!["!done"]],
    ])
    .await;

    let profile = PppProfile::new("10M", RateLimit::new(10, 20));
    let change = MikroTikClient::new(endpoint)
        .upsert_profile(&profile)
        .await
        .unwrap();
    assert_eq!(change, Change::Updated);

    let received = router.await.unwrap();
    assert_eq!(received[0], vec!["/ppp/profile/print", "?name=10M"]);
    assert_eq!(received[1][0], "/ppp/profile/set");
    assert_eq!(received[1][1], "=.id=*3");
    assert!(received[1].contains(&"=rate-limit=10M/20M".to_string()));
}

#[tokio::test]
async fn test_ensure_pool_creates_missing() {
    let (endpoint, router) = fake_router(vec![vec![vec!["!done"]], vec![vec!["!done", "=ret=*9"]]]).await;

    let change = MikroTikClient::new(endpoint)
        .ensure_pool("pppoe-pool", "10.10.0.2-10.10.0.254")
        .await
        .unwrap();
    assert_eq!(change, Change::Created);

    let received = router.await.unwrap();
    assert_eq!(
        received[1],
        vec![
            "/ip/pool/add",
            "=name=pppoe-pool",
            "=ranges=10.10.0.2-10.10.0.254"
        ]
    );
}

#[tokio::test]
async fn test_trap_surfaces_device_message() {
    let (endpoint, _router) = fake_router(vec![vec![
        vec!["!trap", "=message=failure: secret with the same name already exists"],
        vec!["!done"],
    ]])
    .await;

    let secret = PppSecret::pppoe("jdoe", "pw", "10M");
    match MikroTikClient::new(endpoint).add_secret(&secret).await {
        Err(Error::DeviceRejectedCommand { command, message, .. }) => {
            assert_eq!(command, "/ppp/secret/add");
            assert!(message.contains("already exists"));
        }
        other => panic!("expected rejected command, got {other:?}"),
    }
}

#[tokio::test]
async fn test_remove_missing_pool_is_false() {
    let (endpoint, router) = fake_router(vec![vec![vec!["!done"]]]).await;

    let removed = MikroTikClient::new(endpoint)
        .remove_pool("gone")
        .await
        .unwrap();
    assert!(!removed);
    assert_eq!(router.await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_secret_sends_every_field() {
    let (endpoint, router) = fake_router(vec![vec![vec!["!done", "=ret=*1A"]]]).await;

    let secret = PppSecret::pppoe("jdoe", "s3cret", "10M").with_comment("Juan Perez, Av. 1");
    MikroTikClient::new(endpoint).add_secret(&secret).await.unwrap();

    let received = router.await.unwrap();
    assert_eq!(
        received[0],
        vec![
            "/ppp/secret/add",
            "=name=jdoe",
            "=password=s3cret",
            "=service=pppoe",
            "=profile=10M",
            "=comment=Juan Perez, Av. 1",
        ]
    );
}

#[tokio::test]
async fn test_find_secret_reads_row() {
    let (endpoint, router) = fake_router(vec![vec![
        vec![
            "!re",
            "=.id=*1A",
            "=name=jdoe",
            "=service=pppoe",
            "=profile=10M",
            "=comment=Juan Perez",
            "=disabled=false",
        ],
        vec!["!done"],
    ]])
    .await;

    let secret = MikroTikClient::new(endpoint)
        .find_secret("jdoe")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(secret.id.as_deref(), Some("*1A"));
    assert_eq!(secret.name, "jdoe");
    assert_eq!(secret.service, "pppoe");
    assert_eq!(secret.profile, "10M");
    assert_eq!(secret.comment.as_deref(), Some("Juan Perez"));
    assert!(!secret.disabled);

    let received = router.await.unwrap();
    assert_eq!(received[0], vec!["/ppp/secret/print", "?name=jdoe"]);
}

#[tokio::test]
async fn test_remove_secret_by_name() {
    let (endpoint, router) = fake_router(vec![vec![vec!["!done"]]]).await;

    MikroTikClient::new(endpoint).remove_secret("jdoe").await.unwrap();

    let received = router.await.unwrap();
    assert_eq!(received, vec![vec!["/ppp/secret/remove", "=numbers=jdoe"]]);
}

#[tokio::test]
async fn test_ensure_secret_creates_missing() {
    let (endpoint, router) =
        fake_router(vec![vec![vec!["!done"]], vec![vec!["!done", "=ret=*1B"]]]).await;

    let secret = PppSecret::pppoe("jdoe", "s3cret", "10M");
    let change = MikroTikClient::new(endpoint)
        .ensure_secret(&secret)
        .await
        .unwrap();
    assert_eq!(change, Change::Created);

    let received = router.await.unwrap();
    assert_eq!(received[0], vec!["/ppp/secret/print", "?name=jdoe"]);
    assert_eq!(received[1][0], "/ppp/secret/add");
    assert!(received[1].contains(&"=password=s3cret".to_string()));
}

#[tokio::test]
async fn test_ensure_secret_leaves_existing_alone() {
    let (endpoint, router) = fake_router(vec![vec![
        vec!["!re", "=.id=*1A", "=name=jdoe", "=service=pppoe", "=profile=5M"],
        vec!["!done"],
    ]])
    .await;

    let secret = PppSecret::pppoe("jdoe", "s3cret", "10M");
    let change = MikroTikClient::new(endpoint)
        .ensure_secret(&secret)
        .await
        .unwrap();
    assert_eq!(change, Change::Unchanged);
    assert_eq!(router.await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_profile_by_id() {
    let (endpoint, router) = fake_router(vec![
        vec![
            vec!["!re", "=.id=*3", "=name=10M", "=rate-limit=10M/20M"],
            vec!["!done"],
        ],
        vec![vec!["!done"]],
    ])
    .await;

    let removed = MikroTikClient::new(endpoint)
        .remove_profile("10M")
        .await
        .unwrap();
    assert!(removed);

    let received = router.await.unwrap();
    assert_eq!(received[0], vec!["/ppp/profile/print", "?name=10M"]);
    assert_eq!(received[1], vec!["/ppp/profile/remove", "=.id=*3"]);
}

#[tokio::test]
async fn test_set_pool_words() {
    let (endpoint, router) = fake_router(vec![vec![vec!["!done"]]]).await;

    MikroTikClient::new(endpoint)
        .set_pool("*9", "pppoe-pool", "10.20.0.2-10.20.0.254")
        .await
        .unwrap();

    let received = router.await.unwrap();
    assert_eq!(
        received[0],
        vec![
            "/ip/pool/set",
            "=.id=*9",
            "=name=pppoe-pool",
            "=ranges=10.20.0.2-10.20.0.254",
        ]
    );
}
