//! Host server with the inbound gate and the status surface, over real sockets.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use traffic_control::admin::setup_admin_router;
use traffic_control::config::{EndpointRoute, InboundOverride};
use traffic_control::{HttpServer, Shutdown, TrafficClient, TrafficController};

mod common;

#[tokio::test]
async fn test_gate_and_status_surface() {
    let mut config = common::fast_config();
    config.inbound.groups.insert(
        "chat".into(),
        InboundOverride {
            capacity: Some(3.0),
            refill_rate: Some(0.01),
        },
    );
    config.inbound.routes.push(EndpointRoute {
        prefix: "/api/v1/chat".into(),
        group: "chat".into(),
    });

    let controller = Arc::new(TrafficController::new(&config));
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, controller.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.signalled()));

    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = admin_listener.local_addr().unwrap();
    let admin = setup_admin_router(controller.clone());
    let stop = shutdown.signalled();
    let admin_task = tokio::spawn(async move {
        axum::serve(admin_listener, admin)
            .with_graceful_shutdown(stop)
            .await
    });

    let http = reqwest::Client::new();
    let chat = format!("http://{}/api/v1/chat/completions", addr);

    for _ in 0..3 {
        let res = http.post(&chat).send().await.unwrap();
        assert_eq!(res.status().as_u16(), 200);
    }

    let res = http.post(&chat).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 429);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after >= 1);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["scope"], "endpoint-group:chat");
    assert_eq!(body["reason"], "rate_limited");

    // Other groups keep their own budget.
    let res = http.get(format!("http://{}/other", addr)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let res = http.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);

    // An outbound client sharing the controller shows up next to the groups.
    let upstream = common::start_mock_backend(200).await;
    let client = TrafficClient::new(controller.clone(), "openai", &format!("http://{}", upstream)).unwrap();
    client.get("/").await.unwrap();

    let scopes: serde_json::Value = http
        .get(format!("http://{}/admin/traffic/scopes", admin_addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let keys: Vec<&str> = scopes
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["scope"].as_str().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec!["provider:openai", "endpoint-group:chat", "endpoint-group:default"]
    );

    let chat_scope: serde_json::Value = http
        .get(format!("http://{}/admin/traffic/scopes/endpoint-group:chat", admin_addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chat_scope["telemetry"]["total_2xx"], 3);
    assert_eq!(chat_scope["telemetry"]["total_rate_limited"], 1);

    let res = http
        .get(format!("http://{}/admin/traffic/scopes/provider:unknown", admin_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    drop(http);
    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), async {
        server_task.await.unwrap().unwrap();
        admin_task.await.unwrap().unwrap();
    })
    .await
    .unwrap();
}
