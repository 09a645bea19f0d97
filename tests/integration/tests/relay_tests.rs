//! Relay Integration Tests
//!
//! Each test starts its own relay on an ephemeral port and talks to it over
//! real WebSocket connections.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use integration_tests::{
    candidate_envelope, offer_envelope, register_envelope_with_url, signal_envelope,
    sized_offer_envelope, test_config, unique_device_id, TestClient, TestServer, SILENCE_WINDOW,
};
use reqwest::StatusCode;
use serde_json::json;
use signal_gateway::protocol::Identity;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_root_path_accepts_websocket() {
    let server = TestServer::start().await.expect("Failed to start server");

    let mut client = TestClient::connect(&format!("ws://{}/", server.addr))
        .await
        .expect("Failed to connect");
    client.register("root-client").await.unwrap();

    server
        .wait_until(|registry| registry.contains(&Identity::from("root-client")))
        .await
        .unwrap();
}

// ============================================================================
// Forwarding Tests
// ============================================================================

#[tokio::test]
async fn test_offer_reaches_only_recipient() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();
    let mut z = server.connect_as("Z").await.unwrap();

    let offer = r#"{"type":"offer","recipientId":"Y","sdp":"..."}"#;
    x.send_text(offer).await.unwrap();

    assert_eq!(y.recv_text().await.unwrap(), offer);
    y.expect_silence().await.unwrap();
    x.expect_silence().await.unwrap();
    z.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_forward_is_byte_identical() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();

    // Odd spacing, key order, escapes and nesting must all survive
    let offer = "{ \"sdp\": {\"type\":\"offer\", \"sdp\":\"v=0\\r\\na=group:BUNDLE 0\\r\\n\"},\n  \"recipientId\" : \"Y\", \"type\":\"offer\", \"note\":\"caf\\u00e9 ☕\", \"n\": 1.50 }";
    x.send_text(offer).await.unwrap();

    assert_eq!(y.recv_text().await.unwrap(), offer);
}

#[tokio::test]
async fn test_answer_and_candidates_flow_both_ways() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut caller = server.connect_as("caller").await.unwrap();
    let mut callee = server.connect_as("callee").await.unwrap();

    let offer = offer_envelope("callee", "caller");
    caller.send_text(offer.clone()).await.unwrap();
    assert_eq!(callee.recv_text().await.unwrap(), offer);

    let answer = signal_envelope(
        "answer",
        "caller",
        json!({ "senderId": "callee", "sdp": { "type": "answer", "sdp": "v=0\r\n" } }),
    );
    callee.send_text(answer.clone()).await.unwrap();
    assert_eq!(caller.recv_text().await.unwrap(), answer);

    let to_callee = candidate_envelope("callee", "caller", 0);
    let to_caller = candidate_envelope("caller", "callee", 0);
    caller.send_text(to_callee.clone()).await.unwrap();
    callee.send_text(to_caller.clone()).await.unwrap();

    assert_eq!(callee.recv_text().await.unwrap(), to_callee);
    assert_eq!(caller.recv_text().await.unwrap(), to_caller);
}

#[tokio::test]
async fn test_messages_from_one_sender_arrive_in_order() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();

    let messages: Vec<String> = (0..50).map(|seq| candidate_envelope("Y", "X", seq)).collect();
    for message in &messages {
        x.send_text(message.clone()).await.unwrap();
    }

    for expected in &messages {
        assert_eq!(&y.recv_text().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_sender_can_message_itself() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();

    let offer = offer_envelope("X", "X");
    x.send_text(offer.clone()).await.unwrap();

    assert_eq!(x.recv_text().await.unwrap(), offer);
}

// ============================================================================
// Drop Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_recipient_is_dropped_silently() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();

    x.send_text(offer_envelope("W", "X")).await.unwrap();

    x.expect_silence().await.unwrap();
    y.expect_silence().await.unwrap();

    // The sender's connection is still usable
    let offer = offer_envelope("Y", "X");
    x.send_text(offer.clone()).await.unwrap();
    assert_eq!(y.recv_text().await.unwrap(), offer);
}

#[tokio::test]
async fn test_malformed_input_keeps_connection_open() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();

    x.send_text("this is not json").await.unwrap();
    x.send_text(r#"["offer","Y"]"#).await.unwrap();
    x.send_text(r#"{"recipientId":"Y","sdp":"no type"}"#).await.unwrap();
    x.send_text(r#"{"type":"register"}"#).await.unwrap();
    x.send_text(r#"{"type":"offer","recipientId":["Y"]}"#).await.unwrap();
    x.send_binary(vec![0xde, 0xad, 0xbe, 0xef]).await.unwrap();

    y.expect_silence().await.unwrap();

    let offer = offer_envelope("Y", "X");
    x.send_text(offer.clone()).await.unwrap();
    assert_eq!(y.recv_text().await.unwrap(), offer);

    // Still registered as X after the bad register envelope
    assert!(server.registry().contains(&Identity::from("X")));
}

#[tokio::test]
async fn test_unknown_type_and_missing_recipient_are_dropped() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();

    x.send_text(signal_envelope("delete-post", "Y", json!({ "postId": "p1" })))
        .await
        .unwrap();
    x.send_text(r#"{"type":"candidate","candidate":"orphan"}"#)
        .await
        .unwrap();

    y.expect_silence().await.unwrap();
}

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_latest_registration_wins() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut sender = server.connect_as("sender").await.unwrap();
    let mut first = server.connect_as("A").await.unwrap();
    let mut second = server.connect_as("A").await.unwrap();

    let offer = offer_envelope("A", "sender");
    sender.send_text(offer.clone()).await.unwrap();

    assert_eq!(second.recv_text().await.unwrap(), offer);
    first.expect_silence().await.unwrap();
    assert_eq!(server.registry().len(), 2);
}

#[tokio::test]
async fn test_registration_keeps_url_metadata() {
    let server = TestServer::start().await.expect("Failed to start server");
    let device_id = unique_device_id("phone");
    let mut client = server.connect().await.unwrap();

    client
        .send_text(register_envelope_with_url(&device_id, "https://phone.example/cnc"))
        .await
        .unwrap();

    let identity = Identity::from(device_id.as_str());
    server
        .wait_until(|registry| registry.contains(&identity))
        .await
        .unwrap();

    let registration = server.registry().registration(&identity).unwrap();
    assert_eq!(
        registration.metadata.url.as_deref(),
        Some("https://phone.example/cnc")
    );
}

#[tokio::test]
async fn test_reregistering_under_new_identity_releases_old() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect_as("old-name").await.unwrap();

    client.register("new-name").await.unwrap();

    server
        .wait_until(|registry| {
            registry.contains(&Identity::from("new-name"))
                && !registry.contains(&Identity::from("old-name"))
        })
        .await
        .unwrap();
    assert_eq!(server.registry().len(), 1);
}

// ============================================================================
// Cleanup Tests
// ============================================================================

#[tokio::test]
async fn test_cleanup_on_close() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.connect_as("X").await.unwrap();

    client.close().await.unwrap();

    server
        .wait_until(|registry| !registry.contains(&Identity::from("X")))
        .await
        .unwrap();
    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_cleanup_on_abrupt_disconnect() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.connect_as("X").await.unwrap();

    client.abort();

    server
        .wait_until(|registry| !registry.contains(&Identity::from("X")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_identity_is_reusable_after_disconnect() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut sender = server.connect_as("sender").await.unwrap();

    let old = server.connect_as("X").await.unwrap();
    old.close().await.unwrap();
    server
        .wait_until(|registry| !registry.contains(&Identity::from("X")))
        .await
        .unwrap();

    let mut new = server.connect_as("X").await.unwrap();
    let offer = offer_envelope("X", "sender");
    sender.send_text(offer.clone()).await.unwrap();

    assert_eq!(new.recv_text().await.unwrap(), offer);
}

#[tokio::test]
async fn test_no_phantom_eviction() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut sender = server.connect_as("sender").await.unwrap();
    let c1 = server.connect_as("A").await.unwrap();
    let mut c2 = server.connect_as("A").await.unwrap();
    let c2_id = server
        .registry()
        .lookup(&Identity::from("A"))
        .unwrap()
        .id();

    // C1's termination is detected after C2 took over
    c1.close().await.unwrap();
    tokio::time::sleep(SILENCE_WINDOW).await;

    let current = server.registry().lookup(&Identity::from("A")).unwrap();
    assert_eq!(current.id(), c2_id);

    let offer = offer_envelope("A", "sender");
    sender.send_text(offer.clone()).await.unwrap();
    assert_eq!(c2.recv_text().await.unwrap(), offer);
}

#[tokio::test]
async fn test_forward_to_departed_recipient_does_not_hurt_sender() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let y = server.connect_as("Y").await.unwrap();
    let mut z = server.connect_as("Z").await.unwrap();

    y.abort();
    x.send_text(offer_envelope("Y", "X")).await.unwrap();

    let offer = offer_envelope("Z", "X");
    x.send_text(offer.clone()).await.unwrap();
    assert_eq!(z.recv_text().await.unwrap(), offer);

    server
        .wait_until(|registry| !registry.contains(&Identity::from("Y")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cleanup_under_concurrent_traffic() {
    const PAIRS: usize = 8;
    const MESSAGES: usize = 25;

    let server = TestServer::start().await.expect("Failed to start server");
    let url = server.ws_url();

    let mut senders = Vec::new();
    let mut receivers = Vec::new();
    for pair in 0..PAIRS {
        senders.push(server.connect_as(&format!("send-{pair}")).await.unwrap());
        receivers.push(server.connect_as(&format!("recv-{pair}")).await.unwrap());
    }

    let mut tasks = Vec::new();

    for (pair, mut sender) in senders.into_iter().enumerate() {
        tasks.push(tokio::spawn(async move {
            for seq in 0..MESSAGES {
                let message = candidate_envelope(&format!("recv-{pair}"), &format!("pair-{pair}"), seq);
                sender.send_text(message).await.unwrap();
            }
            sender
        }));
    }

    let mut churn_tasks = Vec::new();
    for churn in 0..PAIRS {
        let url = url.clone();
        churn_tasks.push(tokio::spawn(async move {
            for round in 0..5 {
                let mut client = TestClient::connect(&url).await.unwrap();
                client.register(&format!("churn-{churn}")).await.unwrap();
                // Also contend for the receivers' names without holding them
                client
                    .send_text(offer_envelope(&format!("recv-{churn}"), &format!("churn-{round}")))
                    .await
                    .unwrap();
                if round % 2 == 0 {
                    client.close().await.unwrap();
                } else {
                    client.abort();
                }
            }
        }));
    }

    for (pair, receiver) in receivers.iter_mut().enumerate() {
        let mut seq = 0;
        while seq < MESSAGES {
            let text = receiver.recv_text().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value["type"] == "offer" {
                // Churn traffic addressed to this receiver
                continue;
            }
            assert_eq!(value["recipientId"], format!("recv-{pair}"));
            assert_eq!(value["tag"], format!("pair-{pair}"));
            assert_eq!(value["seq"], seq);
            seq += 1;
        }
    }

    for task in churn_tasks {
        task.await.unwrap();
    }
    let _senders: Vec<TestClient> = futures_util::future::try_join_all(tasks).await.unwrap();

    server
        .wait_until(|registry| registry.len() == PAIRS * 2)
        .await
        .unwrap();
    for pair in 0..PAIRS {
        assert!(server.registry().contains(&Identity::from(format!("send-{pair}"))));
        assert!(server.registry().contains(&Identity::from(format!("recv-{pair}"))));
        assert!(!server.registry().contains(&Identity::from(format!("churn-{pair}"))));
    }
}

// ============================================================================
// Message Size Tests
// ============================================================================

#[tokio::test]
async fn test_large_offer_under_limit_is_forwarded() {
    let config = test_config();
    let limit = config.socket.max_message_size;
    let server = TestServer::start_with_config(config)
        .await
        .expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();

    // Real SDP with many candidates easily runs past 64 KiB
    let offer = sized_offer_envelope("Y", limit - 1024);
    x.send_text(offer.clone()).await.unwrap();

    assert_eq!(y.recv_text().await.unwrap(), offer);

    // The sender keeps its connection and registration
    assert!(server.registry().contains(&Identity::from("X")));
    let follow_up = signal_envelope("answer", "Y", json!({ "seq": 1 }));
    x.send_text(follow_up.clone()).await.unwrap();
    assert_eq!(y.recv_text().await.unwrap(), follow_up);
}

#[tokio::test]
async fn test_offer_over_limit_is_not_delivered() {
    let config = test_config();
    let limit = config.socket.max_message_size;
    let server = TestServer::start_with_config(config)
        .await
        .expect("Failed to start server");
    let mut x = server.connect_as("X").await.unwrap();
    let mut y = server.connect_as("Y").await.unwrap();

    // The relay may reset the socket before the whole frame is written
    x.send_text(sized_offer_envelope("Y", limit + 1024)).await.ok();

    y.expect_silence().await.unwrap();

    // An oversized frame closes the sending connection and releases its identity
    server
        .wait_until(|registry| !registry.contains(&Identity::from("X")))
        .await
        .unwrap();
    assert!(server.registry().contains(&Identity::from("Y")));
}
