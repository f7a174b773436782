//! Integration tests for deluge-web
//!
//! These tests use wiremock to simulate a Deluge web UI endpoint and
//! exercise the full client stack: the authenticate/connect chain,
//! transparent session recovery, retry bounds, and the upload flow.

use deluge_web::{
    ClientError, ConnectionProfile, DelugeClient, SessionState, TorrentState, TransportConfig,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Install a log subscriber once so `RUST_LOG=deluge_web=debug` works
/// when debugging a failing test
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Profile pointing at a mock server
fn profile_for(server: &MockServer) -> ConnectionProfile {
    let addr = server.address();
    ConnectionProfile {
        nickname: "test".to_string(),
        host: addr.ip().to_string(),
        port: addr.port(),
        base_path: String::new(),
        password: "secret".to_string(),
        tls: false,
        accept_invalid_certs: false,
    }
}

/// Transport config with near-zero retry delays to keep tests fast
fn fast_config() -> TransportConfig {
    TransportConfig {
        retry_delay_ms: 1,
        max_retry_delay_ms: 5,
        ..TransportConfig::default()
    }
}

fn client_for(server: &MockServer) -> DelugeClient {
    init_tracing();
    DelugeClient::new(profile_for(server), &fast_config()).expect("Failed to build client")
}

/// Helper for `{"id": _, "result": ..., "error": null}` bodies
fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 1,
        "result": result,
        "error": null
    }))
}

/// Mock one RPC method on the shared `/json` endpoint
fn rpc_mock(rpc_method: &str, response: ResponseTemplate) -> Mock {
    Mock::given(method("POST"))
        .and(path("/json"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(response)
}

/// Mount the happy-path authenticate/connect chain
async fn mount_connect_chain(server: &MockServer) {
    // The login call must carry the profile password as its only param.
    Mock::given(method("POST"))
        .and(path("/json"))
        .and(body_partial_json(
            json!({"method": "auth.login", "params": ["secret"]}),
        ))
        .respond_with(rpc_result(json!(true)))
        .mount(server)
        .await;
    rpc_mock(
        "web.get_hosts",
        rpc_result(json!([["host1", "127.0.0.1", 58846, "Online", "2.0.3"]])),
    )
    .mount(server)
    .await;
    rpc_mock(
        "web.get_host_status",
        rpc_result(json!(["host1", "127.0.0.1", 58846, "Online", "2.0.3"])),
    )
    .mount(server)
    .await;
    rpc_mock("web.connect", rpc_result(json!(null)))
        .mount(server)
        .await;
}

// =============================================================================
// Connect chain
// =============================================================================

#[tokio::test]
async fn test_end_to_end_torrent_listing() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock(
        "core.get_torrents_status",
        rpc_result(json!({
            "bbb0": {
                "name": "big-buck-bunny",
                "state": "Seeding",
                "progress": 100.0,
                "download_payload_rate": 0,
                "upload_payload_rate": 2048,
                "ratio": 1.5,
                "total_size": 700_000_000u64,
                "tracker_host": "example.org",
                "eta": 0
            },
            "aaa1": {
                "name": "arch-linux.iso",
                "state": "Downloading",
                "progress": 42.5,
                "download_payload_rate": 1024,
                "upload_payload_rate": 0,
                "ratio": 0.1,
                "total_size": 900_000_000u64,
                "tracker_host": "archlinux.org",
                "eta": 3600
            }
        })),
    )
    .mount(&server)
    .await;

    let client = client_for(&server);
    let torrents = client.get_torrents().await.expect("listing failed");

    assert_eq!(torrents.len(), 2);
    // Sorted by name; identity comes from the wire map key
    assert_eq!(torrents[0].name, "arch-linux.iso");
    assert_eq!(torrents[0].hash, "aaa1");
    assert_eq!(torrents[0].state, TorrentState::Downloading);
    assert_eq!(torrents[1].hash, "bbb0");
    assert_eq!(torrents[1].state, TorrentState::Seeding);

    assert_eq!(
        client.session_state().await,
        SessionState::Connected("host1".to_string())
    );
}

#[tokio::test]
async fn test_incorrect_password() {
    let server = MockServer::start().await;
    rpc_mock("auth.login", rpc_result(json!(false)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.get_torrents().await {
        Err(ClientError::IncorrectPassword) => {}
        other => panic!("expected IncorrectPassword, got {:?}", other.map(|_| ())),
    }
    assert_eq!(client.session_state().await, SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_no_hosts_exist() {
    let server = MockServer::start().await;
    rpc_mock("auth.login", rpc_result(json!(true)))
        .mount(&server)
        .await;
    rpc_mock("web.get_hosts", rpc_result(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.get_torrents().await {
        Err(ClientError::NoHostsExist) => {}
        other => panic!("expected NoHostsExist, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_host_not_online() {
    let server = MockServer::start().await;
    rpc_mock("auth.login", rpc_result(json!(true)))
        .mount(&server)
        .await;
    rpc_mock(
        "web.get_hosts",
        rpc_result(json!([["host1", "127.0.0.1", 58846, "Offline", ""]])),
    )
    .mount(&server)
    .await;
    rpc_mock(
        "web.get_host_status",
        rpc_result(json!(["host1", "Offline", ""])),
    )
    .mount(&server)
    .await;

    let client = client_for(&server);
    match client.get_torrents().await {
        Err(ClientError::HostNotOnline(status)) => assert_eq!(status, "Offline"),
        other => panic!("expected HostNotOnline, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_already_connected_host_skips_connect() {
    let server = MockServer::start().await;
    rpc_mock("auth.login", rpc_result(json!(true)))
        .mount(&server)
        .await;
    rpc_mock(
        "web.get_hosts",
        rpc_result(json!([["host1", "127.0.0.1", 58846, "Connected", "2.0.3"]])),
    )
    .mount(&server)
    .await;
    rpc_mock(
        "web.get_host_status",
        rpc_result(json!(["host1", "Connected", "2.0.3"])),
    )
    .mount(&server)
    .await;
    // No web.connect mock mounted: issuing it would fail the test.
    rpc_mock("core.get_session_status", rpc_result(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get_session_stats().await.expect("stats failed");
    assert_eq!(
        client.session_state().await,
        SessionState::Connected("host1".to_string())
    );
}

// =============================================================================
// Session recovery and coalescing
// =============================================================================

#[tokio::test]
async fn test_transparent_reauth_after_session_expiry() {
    let server = MockServer::start().await;
    // Exactly two full logins: initial connect plus one recovery.
    rpc_mock("auth.login", rpc_result(json!(true)))
        .expect(2)
        .mount(&server)
        .await;
    rpc_mock(
        "web.get_hosts",
        rpc_result(json!([["host1", "127.0.0.1", 58846, "Online", "2.0.3"]])),
    )
    .mount(&server)
    .await;
    rpc_mock(
        "web.get_host_status",
        rpc_result(json!(["host1", "127.0.0.1", 58846, "Online", "2.0.3"])),
    )
    .mount(&server)
    .await;
    rpc_mock("web.connect", rpc_result(json!(null)))
        .mount(&server)
        .await;

    // First status call hits an expired session, the second succeeds.
    rpc_mock(
        "core.get_torrents_status",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "result": null,
            "error": {"message": "Not authenticated", "code": 1}
        })),
    )
    .up_to_n_times(1)
    .with_priority(1)
    .mount(&server)
    .await;
    rpc_mock("core.get_torrents_status", rpc_result(json!({})))
        .with_priority(10)
        .mount(&server)
        .await;

    let client = client_for(&server);
    // Establish the session, then trip the expiry on the next call.
    let torrents = client.get_torrents().await.expect("recovery failed");
    assert!(torrents.is_empty());
    assert_eq!(
        client.session_state().await,
        SessionState::Connected("host1".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_connects_coalesce_to_one_login() {
    let server = MockServer::start().await;
    rpc_mock("auth.login", rpc_result(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    rpc_mock(
        "web.get_hosts",
        rpc_result(json!([["host1", "127.0.0.1", 58846, "Online", "2.0.3"]])),
    )
    .expect(1)
    .mount(&server)
    .await;
    rpc_mock(
        "web.get_host_status",
        rpc_result(json!(["host1", "127.0.0.1", 58846, "Online", "2.0.3"])),
    )
    .expect(1)
    .mount(&server)
    .await;
    rpc_mock("web.connect", rpc_result(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    rpc_mock("core.get_torrents_status", rpc_result(json!({})))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (a, b, c, d) = tokio::join!(
        client.get_torrents(),
        client.get_torrents(),
        client.get_torrents(),
        client.get_torrents()
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();
    d.unwrap();
}

// =============================================================================
// Retry policy
// =============================================================================

#[tokio::test]
async fn test_idempotent_call_retries_up_to_bound() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    // Retryable status on an idempotent read: initial try + 3 retries.
    rpc_mock("core.get_session_status", ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.get_session_stats().await {
        Err(ClientError::Transport { retryable, .. }) => assert!(retryable),
        other => panic!("expected Transport error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_mutation_is_not_retried() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock("core.pause_torrent", ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.pause(&["aaa1"]).await.is_err());
}

#[tokio::test]
async fn test_non_retryable_status_surfaces_immediately() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock("core.get_session_status", ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.get_session_stats().await {
        Err(ClientError::Transport { retryable, .. }) => assert!(!retryable),
        other => panic!("expected Transport error, got {:?}", other.map(|_| ())),
    }
}

// =============================================================================
// Queries and mutations
// =============================================================================

#[tokio::test]
async fn test_get_torrent_files_builds_tree() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock(
        "web.get_torrent_files",
        rpc_result(json!({
            "type": "dir",
            "contents": {
                "linux": {
                    "type": "dir",
                    "size": 300,
                    "progress": [1.0, 0.2],
                    "contents": {
                        "kernel.tar": {"type": "file", "size": 200, "progress": 0.2, "index": 1, "offset": 100},
                        "README": {"type": "file", "size": 100, "progress": 1.0, "index": 0, "offset": 0}
                    }
                }
            }
        })),
    )
    .mount(&server)
    .await;

    let client = client_for(&server);
    let root = client.get_torrent_files("aaa1").await.expect("tree failed");
    assert_eq!(root.name, "linux");
    assert!(root.directory);
    assert!(root.progress.is_aggregate());
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].name, "README");
}

#[tokio::test]
async fn test_add_magnet_returns_hash() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock("core.add_torrent_magnet", rpc_result(json!("aaa1")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let hash = client
        .add_magnet("magnet:?xt=urn:btih:aaa1", &Default::default())
        .await
        .expect("add failed");
    assert_eq!(hash.as_deref(), Some("aaa1"));
}

#[tokio::test]
async fn test_add_magnet_duplicate_returns_none() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock("core.add_torrent_magnet", rpc_result(json!(null)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let hash = client
        .add_magnet("magnet:?xt=urn:btih:aaa1", &Default::default())
        .await
        .expect("add failed");
    assert_eq!(hash, None);
}

#[tokio::test]
async fn test_rpc_error_envelope_surfaces_as_daemon_error() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock(
        "core.remove_torrent",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "result": {"ignored": true},
            "error": {"message": "InvalidTorrentError", "code": 4}
        })),
    )
    .mount(&server)
    .await;

    let client = client_for(&server);
    match client.remove("aaa1", true).await {
        Err(ClientError::Rpc { code, message }) => {
            assert_eq!(code, Some(4));
            assert_eq!(message, "InvalidTorrentError");
        }
        other => panic!("expected Rpc error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_and_add_flow() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "files": ["/tmp/deluge-web/upload.torrent"]
        })))
        .mount(&server)
        .await;
    rpc_mock(
        "web.get_torrent_info",
        rpc_result(json!({
            "name": "big-buck-bunny",
            "info_hash": "bbb0",
            "files_tree": {
                "contents": {
                    "big-buck-bunny.mkv": {"type": "file", "size": 100, "progress": 0.0}
                }
            }
        })),
    )
    .mount(&server)
    .await;
    rpc_mock("web.add_torrents", rpc_result(json!([[true, "bbb0"]])))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let path = client
        .upload_torrent(b"d8:announce...".to_vec())
        .await
        .expect("upload failed");
    assert_eq!(path, "/tmp/deluge-web/upload.torrent");

    let info = client
        .get_uploaded_torrent_info(&path)
        .await
        .expect("info failed");
    assert_eq!(info.name, "big-buck-bunny");
    assert_eq!(info.info_hash, "bbb0");
    assert!(info.files.is_some());

    client
        .add_uploaded_torrent(&path, &Default::default())
        .await
        .expect("add failed");
}

#[tokio::test]
async fn test_upload_without_file_path_fails() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "files": []})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.upload_torrent(b"junk".to_vec()).await {
        Err(ClientError::UploadFailed(_)) => {}
        other => panic!("expected UploadFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_magnet_info_false_result() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    rpc_mock("web.get_magnet_info", rpc_result(json!(false)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.get_magnet_info("not-a-magnet").await {
        Err(ClientError::UnexpectedResponse(_)) => {}
        other => panic!("expected UnexpectedResponse, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_set_options_and_move_storage() {
    let server = MockServer::start().await;
    mount_connect_chain(&server).await;

    Mock::given(method("POST"))
        .and(path("/json"))
        .and(body_partial_json(json!({
            "method": "core.set_torrent_options",
            "params": [["aaa1"], {"max_download_speed": 512.0}]
        })))
        .respond_with(rpc_result(json!(null)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/json"))
        .and(body_partial_json(json!({
            "method": "core.move_storage",
            "params": [["aaa1"], "/downloads/finished"]
        })))
        .respond_with(rpc_result(json!(null)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let update = deluge_web::TorrentOptionsUpdate {
        max_download_speed: Some(512.0),
        ..Default::default()
    };
    client
        .set_torrent_options(&["aaa1"], &update)
        .await
        .expect("set options failed");
    client
        .move_storage(&["aaa1"], "/downloads/finished")
        .await
        .expect("move failed");
}
