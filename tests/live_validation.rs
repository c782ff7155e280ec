use ragchat::{
    config::Config,
    documents::DocumentStore,
    embedding,
    llm::{ChatCompletionClient, ChatMessage, ChatModel},
    metrics::ServiceMetrics,
};
use std::{env, sync::Arc};

fn live_config() -> Config {
    dotenvy::dotenv().ok();
    Config::from_lookup(|key| {
        env::var(key).ok().or_else(|| match key {
            "QDRANT_COLLECTION_NAME" => Some("ragchat-live".into()),
            _ => None,
        })
    })
    .expect("live config requires LLM_API_KEY and LLM_BASE_URL")
}

#[tokio::test]
#[ignore = "Requires live Qdrant"]
async fn live_qdrant_health_snapshot() {
    let config = live_config();
    let store = DocumentStore::new(&config, Arc::new(ServiceMetrics::new()))
        .await
        .expect("document store");
    let health = store.health().await;
    assert!(health.reachable, "Qdrant should be reachable: {health:?}");
    assert!(
        health.collection_present,
        "collection must exist after bootstrap: {health:?}"
    );
}

#[tokio::test]
#[ignore = "Requires live embedding provider"]
async fn live_embedding_roundtrip() {
    let config = live_config();
    let client = embedding::get_embedding_client(&config).expect("embedding client");
    let vectors = client
        .generate_embeddings(vec!["ragchat live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected one embedding per input");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}

#[tokio::test]
#[ignore = "Requires live chat model"]
async fn live_chat_completion() {
    let config = live_config();
    let client = ChatCompletionClient::new(&config).expect("chat client");
    let reply = client
        .complete(&[ChatMessage::user("Reply with the single word: ready")])
        .await
        .expect("chat completion");
    assert!(!reply.is_empty());
}
