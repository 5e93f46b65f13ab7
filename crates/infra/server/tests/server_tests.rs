//! End-to-end tests wiring the server over an in-memory secret store and a
//! loopback transport.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hookrelay_adapter_memory::MemorySecretStore;
use hookrelay_core::MessageProvider;
use hookrelay_server::{RelayServer, ServerConfig, ServerError};
use tower::ServiceExt;

const DEFINITIONS: &str = r#"
messageProviders:
  - name: loopback
    providerType: memory
    timeout: 500ms
eventDestinations:
  - name: github
    topic: github.webhooks
    providerRef: loopback
eventSources:
  - name: github-source
    topic: github.webhooks
    providerRef: loopback
"#;

fn write_definitions(test: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "hookrelay-{}-{}-eventDefinitions.yaml",
        std::process::id(),
        test
    ));
    std::fs::write(&path, content).unwrap();
    path
}

fn server(test: &str) -> RelayServer {
    let config = ServerConfig {
        provider_config: write_definitions(test, DEFINITIONS).display().to_string(),
        ..Default::default()
    };
    RelayServer::new(config).with_secret_store(Arc::new(MemorySecretStore::new()))
}

#[tokio::test]
async fn test_webhook_reaches_event_source() {
    let server = server("reaches");
    let context = server.build_context().await.unwrap();
    let (source, provider) = context.source("github-source").unwrap();

    let response = server
        .router(context.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("x-github-event", "ping")
                .body(Body::from(r#"{"zen":"Practicality beats purity."}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    provider.subscribe(&source).await.unwrap();
    let payload = provider.receive(&source).await.unwrap();
    let envelope: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(envelope["header"]["X-Github-Event"][0], "ping");
    assert_eq!(envelope["body"]["zen"], "Practicality beats purity.");
}

#[tokio::test]
async fn test_configured_secret_is_enforced() {
    let mut server = server("secret");
    server.config.webhook_secret = Some("hook-secret".to_string());
    let context = server.build_context().await.unwrap();

    let response = server
        .router(context)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_listeners_start_and_stop() {
    let server = server("listeners");
    let context = server.build_context().await.unwrap();

    let listeners = server.spawn_listeners(&context);
    assert_eq!(listeners.len(), 1);
    tokio::time::timeout(std::time::Duration::from_secs(5), listeners.shutdown())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_configured_index_url() {
    let mut server = server("index");
    assert_eq!(server.resolve_index_url().await, None);

    server.config.index_url = Some("https://example.com/kabanero-index.yaml".to_string());
    assert_eq!(
        server.resolve_index_url().await.as_deref(),
        Some("https://example.com/kabanero-index.yaml")
    );
}

#[tokio::test]
async fn test_bad_definitions_fail_startup() {
    let config = ServerConfig {
        provider_config: write_definitions(
            "bad",
            "messageProviders:\n  - name: p\n    providerType: kafka\n",
        )
        .display()
        .to_string(),
        ..Default::default()
    };
    let server = RelayServer::new(config).with_secret_store(Arc::new(MemorySecretStore::new()));
    assert!(matches!(server.build_context().await, Err(ServerError::Events(_))));

    let config = ServerConfig {
        provider_config: "/nonexistent/eventDefinitions.yaml".to_string(),
        ..Default::default()
    };
    let server = RelayServer::new(config).with_secret_store(Arc::new(MemorySecretStore::new()));
    assert!(server.build_context().await.is_err());
}
