use super::*;
use crate::config::ProviderConfig;

#[test]
fn client_configuration() {
    let config = ProviderConfig {
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        embedding_dimension: 512,
        batch_size: 128,
        ..ProviderConfig::default()
    };
    let embedder = RemoteEmbedder::new(&config).expect("Failed to create embedder");

    assert_eq!(embedder.model, "test-model");
    assert_eq!(embedder.batch_size, 128);
    assert_eq!(embedder.dimension(), 512);
    assert_eq!(embedder.base_url.host_str(), Some("test-host"));
    assert_eq!(embedder.base_url.port(), Some(1234));
    assert_eq!(embedder.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    assert_eq!(embedder.name(), "remote");
}

#[test]
fn builder_overrides_retry_attempts() {
    let config = ProviderConfig::default();
    let embedder = RemoteEmbedder::new(&config)
        .expect("Failed to create embedder")
        .with_retry_attempts(5);

    assert_eq!(embedder.retry_attempts, 5);
}

#[test]
fn request_delay_comes_from_config() {
    let config = ProviderConfig {
        request_delay_ms: 250,
        ..ProviderConfig::default()
    };
    let embedder = RemoteEmbedder::new(&config).expect("Failed to create embedder");
    assert_eq!(
        embedder.policy().request_delay,
        Some(Duration::from_millis(250))
    );

    let config = ProviderConfig::default();
    let embedder = RemoteEmbedder::new(&config).expect("Failed to create embedder");
    assert_eq!(embedder.policy().request_delay, None);
}

#[test]
fn embed_request_serialization() {
    let request = EmbedRequest {
        model: "test-model",
        input: vec!["first", "second"],
    };
    let json = serde_json::to_string(&request).expect("Failed to serialize");
    assert_eq!(
        json,
        r#"{"model":"test-model","input":["first","second"]}"#
    );
}

#[test]
fn embed_response_deserialization() {
    let json = r#"{"embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
    let response: EmbedResponse = serde_json::from_str(json).expect("Failed to parse");
    assert_eq!(response.embeddings.len(), 2);
    assert_eq!(response.embeddings[0], vec![0.1, 0.2]);
}

#[test]
fn unreachable_server_is_unavailable() {
    // Port 1 is essentially guaranteed to refuse connections.
    let config = ProviderConfig {
        port: 1,
        timeout_seconds: 1,
        ..ProviderConfig::default()
    };
    let embedder = RemoteEmbedder::new(&config).expect("Failed to create embedder");
    assert!(!embedder.is_available());
}
