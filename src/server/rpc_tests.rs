//! Unit tests for JSON-RPC framing.
//!
//! Tests response construction, error-code mapping, and the line-based
//! serve loop against an in-memory store.

use std::sync::Arc;

use super::*;
use crate::config::{
    Config, DatabaseConfig, Environment, ListingConfig, LogFormat, LoggingConfig,
    ReportingConfig, RequestConfig,
};
use crate::server::AppState;
use crate::storage::SqliteStorage;
use chrono::FixedOffset;
use serde_json::json;

fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            path: ":memory:".into(),
            max_connections: 1,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig::default(),
        listing: ListingConfig::default(),
        reporting: ReportingConfig {
            utc_offset: Some(FixedOffset::east_opt(0).unwrap()),
        },
        environment: Environment::Development,
    }
}

async fn test_server() -> RpcServer {
    let storage = SqliteStorage::new_in_memory().await.unwrap();
    RpcServer::new(Arc::new(AppState::new(test_config(), storage)))
}

async fn run_lines(server: &RpcServer, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// ============================================================================
// JsonRpcResponse tests
// ============================================================================

#[test]
fn test_jsonrpc_response_success_with_id() {
    let response = JsonRpcResponse::success(Some(json!(1)), json!({"success": true}));

    assert_eq!(response.jsonrpc, "2.0");
    assert_eq!(response.id, json!(1));
    assert!(response.error.is_none());
    assert_eq!(response.result.unwrap()["success"], true);
}

#[test]
fn test_jsonrpc_response_error_without_id() {
    let response = JsonRpcResponse::error(None, PARSE_ERROR, "Parse error");

    assert_eq!(response.id, Value::Null);
    assert!(response.result.is_none());
    assert_eq!(response.error.unwrap().code, -32700);
}

#[test]
fn test_jsonrpc_error_serialization_omits_result() {
    let response = JsonRpcResponse::error(Some(json!(1)), METHOD_NOT_FOUND, "Method not found");
    let serialized = serde_json::to_string(&response).unwrap();

    assert!(serialized.contains("\"error\""));
    assert!(serialized.contains("-32601"));
    assert!(!serialized.contains("\"result\""));
}

#[test]
fn test_protocol_error_codes() {
    let unknown = ProtocolError::UnknownMethod {
        method: "admin.nope".to_string(),
    };
    let response = JsonRpcResponse::from_protocol_error(Some(json!(7)), &unknown);
    assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);

    let bad_params = ProtocolError::InvalidParameters {
        method: "admin.inquiries.get".to_string(),
        message: "missing string field `id`".to_string(),
    };
    let response = JsonRpcResponse::from_protocol_error(Some(json!(8)), &bad_params);
    let error = response.error.unwrap();
    assert_eq!(error.code, INVALID_PARAMS);
    assert!(error.message.contains("admin.inquiries.get"));
}

#[test]
fn test_jsonrpc_request_params_default() {
    let request: JsonRpcRequest =
        serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).unwrap();
    assert!(request.params.is_none());
    assert_eq!(request.method, "ping");
}

// ============================================================================
// Serve loop tests
// ============================================================================

#[tokio::test]
async fn test_serve_handles_ping_and_skips_blank_lines() {
    let server = test_server().await;
    let responses = run_lines(
        &server,
        "\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n",
    )
    .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"], json!({}));
}

#[tokio::test]
async fn test_serve_reports_parse_error() {
    let server = test_server().await;
    let responses = run_lines(&server, "{not json}\n").await;

    assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
    assert_eq!(responses[0]["id"], Value::Null);
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let server = test_server().await;
    let responses = run_lines(
        &server,
        "{\"jsonrpc\":\"2.0\",\"method\":\"initialized\"}\n\
         {\"jsonrpc\":\"2.0\",\"method\":\"admin.dashboard\"}\n",
    )
    .await;

    assert!(responses.is_empty());
}

#[tokio::test]
async fn test_unknown_method() {
    let server = test_server().await;
    let request: JsonRpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0", "id": "a", "method": "admin.reindex"
    }))
    .unwrap();

    let response = server.handle_request(request).await.unwrap();
    assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_version_is_invalid_request() {
    let server = test_server().await;
    let request: JsonRpcRequest = serde_json::from_value(json!({
        "jsonrpc": "1.0", "id": 3, "method": "ping"
    }))
    .unwrap();

    let response = server.handle_request(request).await.unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, INVALID_REQUEST);
    assert_eq!(error.message, "Invalid request: unsupported JSON-RPC version 1.0");
}

#[tokio::test]
async fn test_initialize_and_operations_list() {
    let server = test_server().await;
    let responses = run_lines(
        &server,
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n\
         {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"operations/list\"}\n",
    )
    .await;

    let init = &responses[0]["result"];
    assert_eq!(init["serverInfo"]["name"], "portfolio-admin");
    assert_eq!(init["operationCount"], OPERATIONS.len());

    let operations = responses[1]["result"]["operations"].as_array().unwrap();
    assert_eq!(operations.len(), OPERATIONS.len());
    assert!(operations
        .iter()
        .any(|op| op["name"] == "admin.dashboard" && op["admin"] == true));
}

#[tokio::test]
async fn test_admin_operation_without_principal_is_denied() {
    let server = test_server().await;
    let request: JsonRpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0", "id": 4, "method": "admin.stats", "params": {}
    }))
    .unwrap();

    let response = server.handle_request(request).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Access denied");
}
