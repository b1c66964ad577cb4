//! Dependency Gate Integration Tests
//!
//! Real sockets and a mock HTTP server against the full gate:
//! parse -> spawn probes -> join under timeout.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use podinit_core::{DependencyGate, PodinitError, WaitOptions};
use tokio::net::TcpListener;

fn options(timeout: Duration) -> WaitOptions {
    WaitOptions {
        timeout,
        retry_interval: Duration::from_millis(20),
    }
}

/// An address nothing is listening on
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Test: Closed port times out close to the configured timeout
#[tokio::test]
async fn test_closed_port_times_out_on_deadline() {
    let endpoint = format!("tcp://{}", closed_addr().await);
    let gate = DependencyGate::new(&[endpoint.clone()], options(Duration::from_millis(200))).unwrap();

    let started = Instant::now();
    let result = gate.wait_all().await;
    let elapsed = started.elapsed();

    match result {
        Err(PodinitError::Timeout { timeout, endpoints }) => {
            assert_eq!(timeout, Duration::from_millis(200));
            assert_eq!(endpoints, vec![endpoint]);
        }
        other => panic!("Expected Timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(200), "returned early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(250), "returned late: {:?}", elapsed);
}

/// Test: Bound listener opens the gate before the timeout
#[tokio::test]
async fn test_listener_opens_gate_before_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("tcp://{}", listener.local_addr().unwrap());
    let gate = DependencyGate::new(&[endpoint], options(Duration::from_secs(5))).unwrap();

    let started = Instant::now();
    gate.wait_all().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// Test: Listener appearing mid-wait is picked up by the retry loop
#[tokio::test]
async fn test_late_listener_is_detected() {
    let addr = closed_addr().await;
    let gate = DependencyGate::new(&[format!("tcp://{}", addr)], options(Duration::from_secs(5))).unwrap();

    let late_bind = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        TcpListener::bind(addr).await.unwrap()
    };

    let (result, _listener) = tokio::join!(gate.wait_all(), late_bind);
    result.unwrap();
}

/// Test: Timeout lists every endpoint, including those that were ready
#[tokio::test]
async fn test_timeout_enumerates_all_endpoints() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ready = format!("tcp://{}", listener.local_addr().unwrap());
    let missing = format!("tcp4://{}", closed_addr().await);

    let gate = DependencyGate::new(
        &[ready.clone(), missing.clone()],
        options(Duration::from_millis(150)),
    )
    .unwrap();

    match gate.wait_all().await {
        Err(PodinitError::Timeout { endpoints, .. }) => {
            assert_eq!(endpoints, vec![ready, missing]);
        }
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_endpoint_2xx_opens_gate() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .with_status(204)
        .expect_at_least(1)
        .create_async()
        .await;

    let endpoint = format!("{}/health", server.url());
    let gate = DependencyGate::new(&[endpoint], options(Duration::from_secs(2))).unwrap();

    gate.wait_all().await.unwrap();
    mock.assert_async().await;
}

/// Test: Non-2xx responses keep the gate closed
#[tokio::test]
async fn test_http_endpoint_5xx_times_out() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .with_status(503)
        .expect_at_least(2)
        .create_async()
        .await;

    let endpoint = format!("{}/health", server.url());
    let gate = DependencyGate::new(&[endpoint], options(Duration::from_millis(300))).unwrap();

    let result = gate.wait_all().await;
    assert!(matches!(result, Err(PodinitError::Timeout { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_mixed_tcp_and_http_endpoints() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("GET", "/").with_status(200).create_async().await;

    let gate = DependencyGate::new(
        &[
            format!("tcp://{}", listener.local_addr().unwrap()),
            format!("{}/", server.url()),
        ],
        options(Duration::from_secs(2)),
    )
    .unwrap();

    gate.wait_all().await.unwrap();
}
