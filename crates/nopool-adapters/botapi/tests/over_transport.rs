//! Adapter and bot-API client over a real no-pool transport.

mod common;

use std::sync::Arc;

use common::{BotServer, FILE_BODY, TOKEN};
use nopool_adapter_botapi::{AdapterError, BaseRequest, BotApi, LifecycleState, NoPoolRequest};
use nopool_core::{PoolStrategy, TimeoutOverrides, TransportConfig, TransportError};
use serde_json::json;

fn request(strategy: PoolStrategy) -> Arc<NoPoolRequest> {
    let config = TransportConfig::new().with_strategy(strategy);
    Arc::new(NoPoolRequest::from_config(config).unwrap())
}

#[tokio::test]
async fn test_post_unwraps_successful_envelope() {
    let server = BotServer::start().await;
    let request = request(PoolStrategy::FreshClient);
    request.initialize().await.unwrap();

    let result = request
        .post(&server.method_url("getMe"), Some(json!({})), TimeoutOverrides::NONE)
        .await
        .unwrap();

    assert_eq!(result, json!({ "id": 42, "is_bot": true }));
    assert_eq!(server.accepted(), 1);
}

#[tokio::test]
async fn test_post_returns_failed_envelope_unmodified() {
    let server = BotServer::start().await;
    let request = request(PoolStrategy::FreshClient);

    let result = request
        .post(
            &server.method_url("getChat"),
            Some(json!({ "chat_id": 1 })),
            TimeoutOverrides::NONE,
        )
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({ "ok": false, "error_code": 400, "description": "Bad Request: chat not found" })
    );
    assert_eq!(server.bodies(), vec![json!({ "chat_id": 1 })]);
}

#[tokio::test]
async fn test_retrieve_server_error_is_request_error() {
    let server = BotServer::start().await;
    let request = request(PoolStrategy::FreshClient);

    let err = request.retrieve(&server.url("/error")).await.unwrap_err();

    assert!(matches!(
        err,
        AdapterError::Request(TransportError::Status { status: 500, .. })
    ));
    let message = err.to_string();
    assert!(message.contains("500"), "{message}");
    assert!(message.contains("server error"), "{message}");
}

#[tokio::test]
async fn test_post_after_shutdown_is_closed() {
    let server = BotServer::start().await;
    let request = request(PoolStrategy::SharedNoIdle);
    request.initialize().await.unwrap();
    request.shutdown().await.unwrap();

    let err = request
        .post(&server.method_url("getMe"), None, TimeoutOverrides::NONE)
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::Closed));
    assert_eq!(request.state(), LifecycleState::ShutDown);
    assert_eq!(server.accepted(), 0);
}

async fn assert_bot_calls_open_one_connection_each(strategy: PoolStrategy) {
    let server = BotServer::start().await;
    let request = request(strategy);
    request.initialize().await.unwrap();
    let bot = BotApi::new(TOKEN, request.clone()).with_api_base(server.base());

    assert_eq!(bot.get_me().await.unwrap()["id"], 42);
    assert_eq!(
        bot.send_message(5, "hi", None).await.unwrap(),
        json!({ "message_id": 7 })
    );
    let file = request.retrieve(&bot.file_url("photos/a.png")).await.unwrap();
    assert_eq!(&file[..], FILE_BODY);

    assert_eq!(server.accepted(), 3);
    assert_eq!(
        server.bodies()[1],
        json!({ "chat_id": 5, "text": "hi" })
    );
    request.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bot_calls_fresh_client() {
    assert_bot_calls_open_one_connection_each(PoolStrategy::FreshClient).await;
}

#[tokio::test]
async fn test_bot_calls_shared_client() {
    assert_bot_calls_open_one_connection_each(PoolStrategy::SharedNoIdle).await;
}

#[tokio::test]
async fn test_bot_api_error_from_failed_envelope() {
    let server = BotServer::start().await;
    let bot = BotApi::new(TOKEN, request(PoolStrategy::FreshClient)).with_api_base(server.base());

    let err = bot.call("getChat", json!({ "chat_id": 1 })).await.unwrap_err();

    match err {
        AdapterError::Api {
            code, description, ..
        } => {
            assert_eq!(code, 400);
            assert_eq!(description, "Bad Request: chat not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}
