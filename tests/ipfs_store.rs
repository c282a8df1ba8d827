use std::time::{Duration, Instant};

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

use dualcast::config::ContentStoreConfig;
use dualcast::domains::envelope::ContentId;
use dualcast::interfaces::content_store::ContentStore;
use dualcast::providers::ipfs::IpfsContentStore;

fn store_for(server: &MockServer) -> IpfsContentStore {
    IpfsContentStore::new(&ContentStoreConfig::new(server.base_url())).unwrap()
}

#[tokio::test]
async fn add_returns_hash_from_last_line() {
    let server = MockServer::start_async().await;
    let add_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v0/add")
                .query_param("pin", "true");
            then.status(200).body(
                "{\"Name\":\"message.json\",\"Bytes\":12}\n{\"Name\":\"message.json\",\"Hash\":\"bafkreitest\",\"Size\":\"20\"}\n",
            );
        })
        .await;

    let cid = store_for(&server)
        .add(b"{}".to_vec(), "message.json", true)
        .await
        .unwrap();
    assert_eq!(cid.as_str(), "bafkreitest");
    add_mock.assert_hits(1);
}

#[tokio::test]
async fn add_rejection_is_store_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/add");
            then.status(500)
                .json_body(json!({"Message": "merkledag: not allowed", "Code": 0, "Type": "error"}));
        })
        .await;

    let err = store_for(&server)
        .add(b"x".to_vec(), "x.json", false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "store_rejected");
    assert!(err.to_string().contains("merkledag: not allowed"));
}

#[tokio::test]
async fn wrong_endpoint_is_rejected_not_missing() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path_contains("/api/v0/");
            then.status(404).body("404 page not found");
        })
        .await;

    let store = store_for(&server);
    let err = store.add(b"x".to_vec(), "x.json", true).await.unwrap_err();
    assert_eq!(err.kind(), "store_rejected");
    let err = store.publish("chat-user-u1", b"x".to_vec()).await.unwrap_err();
    assert_eq!(err.kind(), "store_rejected");
    let err = store.node_info().await.unwrap_err();
    assert_eq!(err.kind(), "store_rejected");

    let err = store
        .fetch(&ContentId::new("bafyanything"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn unreachable_daemon_is_store_unavailable() {
    let store = IpfsContentStore::new(&ContentStoreConfig::new("http://127.0.0.1:1")).unwrap();
    let err = store.add(b"x".to_vec(), "x.json", true).await.unwrap_err();
    assert_eq!(err.kind(), "store_unavailable");
    let err = store.node_info().await.unwrap_err();
    assert_eq!(err.kind(), "store_unavailable");
}

#[tokio::test]
async fn slow_daemon_times_out_as_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/add");
            then.status(200)
                .delay(Duration::from_secs(5))
                .body("{\"Hash\":\"bafylate\"}");
        })
        .await;
    let mut config = ContentStoreConfig::new(server.base_url());
    config.timeout_seconds = Some(1);
    let store = IpfsContentStore::new(&config).unwrap();

    let started = Instant::now();
    let err = store.add(b"x".to_vec(), "x.json", true).await.unwrap_err();
    assert_eq!(err.kind(), "store_unavailable");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn fetch_maps_missing_content() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v0/cat")
                .query_param("arg", "bafymissing");
            then.status(500)
                .json_body(json!({"Message": "block was not found locally (offline)", "Code": 0}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v0/cat")
                .query_param("arg", "bafypresent");
            then.status(200).body("stored bytes");
        })
        .await;

    let store = store_for(&server);
    let err = store
        .fetch(&ContentId::new("bafymissing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
    let bytes = store.fetch(&ContentId::new("bafypresent")).await.unwrap();
    assert_eq!(bytes, b"stored bytes".to_vec());
}

#[tokio::test]
async fn publish_encodes_topic_and_tolerates_disabled_pubsub() {
    let server = MockServer::start_async().await;
    let pub_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v0/pubsub/pub")
                .query_param("arg", "uY2hhdC11c2VyLXUx");
            then.status(500).json_body(json!({
                "Message": "experimental pubsub feature not enabled, run daemon with --enable-pubsub-experiment to use",
                "Code": 0
            }));
        })
        .await;

    store_for(&server)
        .publish("chat-user-u1", b"payload".to_vec())
        .await
        .unwrap();
    pub_mock.assert_hits(1);
}

#[tokio::test]
async fn publish_propagates_other_failures() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/pubsub/pub");
            then.status(500)
                .json_body(json!({"Message": "context canceled", "Code": 0}));
        })
        .await;

    let err = store_for(&server)
        .publish("chat-user-u1", b"payload".to_vec())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "store_rejected");
}

#[tokio::test]
async fn publish_skipped_when_disabled_in_config() {
    let server = MockServer::start_async().await;
    let pub_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/pubsub/pub");
            then.status(200);
        })
        .await;
    let mut config = ContentStoreConfig::new(server.base_url());
    config.pubsub_enabled = Some(false);
    let store = IpfsContentStore::new(&config).unwrap();

    store.publish("chat-user-u1", b"x".to_vec()).await.unwrap();
    pub_mock.assert_hits(0);
}

#[tokio::test]
async fn node_info_and_peers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/id");
            then.status(200).json_body(json!({
                "ID": "12D3KooWnode",
                "AgentVersion": "kubo/0.29.0",
                "Addresses": ["/ip4/127.0.0.1/tcp/4001"],
                "Protocols": []
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/swarm/peers");
            then.status(200).json_body(json!({
                "Peers": [
                    {"Addr": "/ip4/10.0.0.2/tcp/4001", "Peer": "12D3KooWa"},
                    {"Addr": "/ip4/10.0.0.3/tcp/4001", "Peer": "12D3KooWb"}
                ]
            }));
        })
        .await;

    let store = store_for(&server);
    let info = store.node_info().await.unwrap();
    assert_eq!(info.id, "12D3KooWnode");
    assert_eq!(info.agent_version.as_deref(), Some("kubo/0.29.0"));
    assert_eq!(info.addresses.len(), 1);
    let peers = store.peers().await.unwrap();
    assert_eq!(peers, vec!["12D3KooWa".to_string(), "12D3KooWb".to_string()]);
}

#[tokio::test]
async fn null_peer_list_is_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/swarm/peers");
            then.status(200).json_body(json!({"Peers": null}));
        })
        .await;

    assert!(store_for(&server).peers().await.unwrap().is_empty());
}
