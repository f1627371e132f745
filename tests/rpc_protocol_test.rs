//! Integration tests for JSON-RPC protocol handling
//!
//! Feeds newline-delimited requests through the real server loop and checks
//! the response lines.

mod common;

use std::sync::Arc;

use chrono::FixedOffset;
use serde_json::{json, Value};

use common::{storage_at, utc};
use portfolio_admin::config::{
    Config, DatabaseConfig, Environment, ListingConfig, LogFormat, LoggingConfig, ReportingConfig,
    RequestConfig,
};
use portfolio_admin::server::{AppState, RpcServer, INVALID_PARAMS, METHOD_NOT_FOUND};

async fn test_server() -> RpcServer {
    let (storage, _clock) = storage_at(utc(2026, 10, 17, 12)).await;
    let config = Config {
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
    };
    RpcServer::new(Arc::new(AppState::new(config, storage)))
}

/// Serialize requests one per line, run the server to EOF, parse the replies.
async fn exchange(server: &RpcServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests
        .iter()
        .map(|request| format!("{}\n", request))
        .collect();
    let mut output = Vec::new();
    server
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("serve should reach EOF");

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("Failed to parse JSON-RPC response"))
        .collect()
}

/// Verify JSON-RPC 2.0 response structure
fn assert_valid_jsonrpc_response(response: &Value) {
    assert_eq!(response["jsonrpc"], "2.0", "Invalid JSON-RPC version");
    assert!(
        response.get("result").is_some() != response.get("error").is_some(),
        "Response must have exactly one of result or error"
    );
}

fn admin() -> Value {
    json!({ "id": "admin-1", "role": "admin" })
}

#[cfg(test)]
mod flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_then_list_as_admin() {
        let server = test_server().await;

        let responses = exchange(
            &server,
            &[
                json!({
                    "jsonrpc": "2.0", "id": 1, "method": "inquiries.submit",
                    "params": {
                        "name": "Ada",
                        "email": "ada@example.com",
                        "project_type": "web",
                        "message": "Marketing site",
                    }
                }),
                json!({
                    "jsonrpc": "2.0", "id": 2, "method": "admin.inquiries.list",
                    "params": { "principal": admin(), "search": "ada" }
                }),
                json!({
                    "jsonrpc": "2.0", "id": 3, "method": "admin.dashboard",
                    "params": { "principal": admin() }
                }),
            ],
        )
        .await;

        assert_eq!(responses.len(), 3);
        for response in &responses {
            assert_valid_jsonrpc_response(response);
        }

        assert_eq!(responses[0]["result"]["success"], true);
        let submitted_id = responses[0]["result"]["data"]["id"].clone();

        let page = &responses[1]["result"]["data"];
        assert_eq!(page["total_count"], 1);
        assert_eq!(page["items"][0]["id"], submitted_id);

        let dashboard = &responses[2]["result"]["data"];
        assert_eq!(dashboard["totals"]["inquiries"], 1);
        assert_eq!(dashboard["inquiries"]["new"], 1);
    }

    #[tokio::test]
    async fn test_public_catalog_on_empty_store() {
        let server = test_server().await;

        let responses = exchange(
            &server,
            &[json!({ "jsonrpc": "2.0", "id": 1, "method": "case_studies.categories" })],
        )
        .await;

        let data = &responses[0]["result"]["data"];
        assert_eq!(data["categories"], json!([]));
        assert_eq!(data["types"], json!([]));
        assert_eq!(data["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_invalid_page_size_is_envelope_failure() {
        let server = test_server().await;

        let responses = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0", "id": 1, "method": "testimonials.list_public",
                "params": { "page_size": 0 }
            })],
        )
        .await;

        let result = &responses[0]["result"];
        assert_eq!(result["success"], false);
        assert!(result["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid query"));
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_method_error_code() {
        let server = test_server().await;

        let responses = exchange(
            &server,
            &[json!({ "jsonrpc": "2.0", "id": 9, "method": "admin.export" })],
        )
        .await;

        assert_valid_jsonrpc_response(&responses[0]);
        assert_eq!(responses[0]["id"], 9);
        assert_eq!(responses[0]["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_object_params_error_code() {
        let server = test_server().await;

        let responses = exchange(
            &server,
            &[json!({
                "jsonrpc": "2.0", "id": 1, "method": "case_studies.featured",
                "params": [1, 2]
            })],
        )
        .await;

        assert_eq!(responses[0]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_responses_keep_request_order() {
        let server = test_server().await;

        let responses = exchange(
            &server,
            &[
                json!({ "jsonrpc": "2.0", "id": "a", "method": "ping" }),
                json!({ "jsonrpc": "2.0", "id": "b", "method": "nope" }),
                json!({ "jsonrpc": "2.0", "id": "c", "method": "ping" }),
            ],
        )
        .await;

        let ids: Vec<&Value> = responses.iter().map(|r| &r["id"]).collect();
        assert_eq!(ids, vec![&json!("a"), &json!("b"), &json!("c")]);
    }
}
