//! Cluster Reporter Integration Tests
//!
//! The reporter against a mock control plane.

use mockito::Matcher;
use podinit_core::k8s::STRATEGIC_MERGE_PATCH;
use podinit_core::{ClusterReporter, PodIdentity, PodinitError, PortEnv};

fn port_env(pairs: &[(&str, &str)]) -> PortEnv {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Test: Exactly one PATCH to the pod path with the annotation body
#[tokio::test]
async fn test_report_sends_single_patch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/api/v1/namespaces/ns1/pods/pod1")
        .match_header("content-type", STRATEGIC_MERGE_PATCH)
        .match_body(Matcher::PartialJsonString(
            r#"{"metadata":{"annotations":{"AUTO_PORT0":"8080"}}}"#.to_string(),
        ))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let reporter = ClusterReporter::new(PodIdentity::new("ns1", "pod1"));
    reporter
        .report(&server.host_with_port(), &port_env(&[("AUTO_PORT0", "8080")]))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_report_body_contains_port() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/api/v1/namespaces/ns1/pods/pod1")
        .match_body(Matcher::Regex(r#""AUTO_PORT0":"8080""#.to_string()))
        .with_status(200)
        .create_async()
        .await;

    let reporter = ClusterReporter::new(PodIdentity::new("ns1", "pod1"));
    let env = port_env(&[("AUTO_PORT0", "8080"), ("AUTO_PORT1", "8080")]);
    reporter.report(&server.host_with_port(), &env).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_report_404_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/api/v1/namespaces/ns1/pods/pod1")
        .with_status(404)
        .create_async()
        .await;

    let reporter = ClusterReporter::new(PodIdentity::new("ns1", "pod1"));
    let result = reporter
        .report(&server.host_with_port(), &port_env(&[("AUTO_PORT0", "8080")]))
        .await;

    match result {
        Err(PodinitError::ReportRejected { status }) => assert_eq!(status, 404),
        other => panic!("Expected ReportRejected, got {:?}", other),
    }
}

/// Test: Only 200 counts as success
#[tokio::test]
async fn test_report_201_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/api/v1/namespaces/ns1/pods/pod1")
        .with_status(201)
        .create_async()
        .await;

    let reporter = ClusterReporter::new(PodIdentity::new("ns1", "pod1"));
    let result = reporter
        .report(&server.host_with_port(), &port_env(&[("AUTO_PORT0", "8080")]))
        .await;

    assert!(matches!(result, Err(PodinitError::ReportRejected { status: 201 })));
}

#[tokio::test]
async fn test_report_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let reporter = ClusterReporter::new(PodIdentity::new("ns1", "pod1"));
    let result = reporter
        .report(&addr.to_string(), &port_env(&[("AUTO_PORT0", "8080")]))
        .await;

    assert!(matches!(result, Err(PodinitError::ReportTransport(_))));
}

/// Test: Missing namespace never reaches the server
#[tokio::test]
async fn test_missing_namespace_sends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", Matcher::Any)
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let reporter = ClusterReporter::new(PodIdentity {
        namespace: None,
        name: Some("pod1".to_string()),
    });
    let result = reporter
        .report(&server.host_with_port(), &port_env(&[("AUTO_PORT0", "8080")]))
        .await;

    assert!(matches!(result, Err(PodinitError::Configuration(_))));
    mock.assert_async().await;
}
