use httpmock::{Method::GET, MockServer};
use std::net::TcpListener as StdTcpListener;

mod common;

use telemetry_demo::service::{
    Downstream, LatencyKind, LatencyStatus, ACTION_PATH, HEALTH_PATH, INTERNAL_PATH,
};

/// Returns a local port nothing is listening on.
fn closed_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
/// Health checks answer OK and aren't measured.
async fn health_check() {
    let service = common::start_service(common::service_settings("app1", vec![])).await;

    let response = reqwest::get(service.url(HEALTH_PATH)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
    assert_eq!(
        service.metrics.count(LatencyKind::Total, LatencyStatus::Ok),
        0
    );

    service.stop().await;
}

#[tokio::test]
/// Without downstream services an action always succeeds, and is measured
/// both as internal processing and as a whole.
async fn action_without_downstream() {
    let service = common::start_service(common::service_settings("app1", vec![])).await;

    for _ in 0..3 {
        let response = reqwest::get(service.url(ACTION_PATH)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "OK");
    }
    assert_eq!(
        service
            .metrics
            .count(LatencyKind::InternalOnly, LatencyStatus::Ok),
        3
    );
    assert_eq!(
        service.metrics.count(LatencyKind::Total, LatencyStatus::Ok),
        3
    );
    assert_eq!(
        service.metrics.count(LatencyKind::Total, LatencyStatus::Error),
        0
    );

    service.stop().await;
}

#[tokio::test]
/// Unknown paths, including the internal path downstream calls use, are 404.
async fn unknown_paths() {
    let service = common::start_service(common::service_settings("app1", vec![])).await;

    for path in ["/", "/api/other", INTERNAL_PATH] {
        let response = reqwest::get(service.url(path)).await.unwrap();
        assert_eq!(response.status(), 404, "{}", path);
    }

    service.stop().await;
}

#[tokio::test]
/// Downstream services receive the config parameter, form-encoded.
async fn downstream_receives_config() {
    let downstream = MockServer::start();
    let internal = downstream.mock(|when, then| {
        when.method(GET)
            .path(INTERNAL_PATH)
            .query_param("config", "app1:0,app2:5");
        then.status(200).body("OK");
    });

    let settings = common::service_settings(
        "app1",
        vec![Downstream::new("127.0.0.1", downstream.port())],
    );
    let service = common::start_service(settings).await;

    let response = reqwest::get(service.url("/api/action?config=app1:0,app2:5"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(internal.hits(), 1);

    service.stop().await;
}

#[tokio::test]
/// A downstream answering with an error status still counts as reached.
async fn downstream_error_status_is_not_a_failure() {
    let downstream = MockServer::start();
    let internal = downstream.mock(|when, then| {
        when.method(GET).path(INTERNAL_PATH);
        then.status(404);
    });

    let settings = common::service_settings(
        "app1",
        vec![Downstream::new("127.0.0.1", downstream.port())],
    );
    let service = common::start_service(settings).await;

    let response = reqwest::get(service.url(ACTION_PATH)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(internal.hits(), 1);

    service.stop().await;
}

#[tokio::test]
/// An unreachable downstream service turns the response into a 500, but the
/// internal processing still runs.
async fn unreachable_downstream() {
    let settings = common::service_settings(
        "app1",
        vec![Downstream::new("127.0.0.1", closed_port())],
    );
    let service = common::start_service(settings).await;

    let response = reqwest::get(service.url(ACTION_PATH)).await.unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "ERROR");
    assert_eq!(
        service
            .metrics
            .count(LatencyKind::InternalOnly, LatencyStatus::Ok),
        1
    );
    assert_eq!(
        service.metrics.count(LatencyKind::Total, LatencyStatus::Error),
        1
    );
    assert_eq!(
        service.metrics.count(LatencyKind::Total, LatencyStatus::Ok),
        0
    );

    service.stop().await;
}

#[tokio::test]
/// A service never calls itself, even when listed: the listed port is closed,
/// so calling it would fail the action.
async fn service_skips_itself() {
    let settings = common::service_settings(
        "localhost",
        vec![Downstream::new("localhost", closed_port())],
    );
    let service = common::start_service(settings).await;

    let response = reqwest::get(service.url(ACTION_PATH)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        service.metrics.count(LatencyKind::Total, LatencyStatus::Ok),
        1
    );

    service.stop().await;
}
