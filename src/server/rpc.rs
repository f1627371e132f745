//! JSON-RPC 2.0 framing over newline-delimited stdio.
//!
//! Each request line is one JSON-RPC message; each response is written as one
//! line. Operation results are always wrapped in an envelope; only framing
//! problems (parse errors, unknown methods, malformed params) surface as
//! JSON-RPC error objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_operation, SharedState, OPERATIONS};
use crate::error::ProtocolError;

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod rpc_tests;

/// Parse error.
pub const PARSE_ERROR: i32 = -32700;
/// Request object is not valid JSON-RPC.
pub const INVALID_REQUEST: i32 = -32600;
/// Method does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i32 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null for notifications; always serialized).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Server identification returned by `initialize`.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Result of the `initialize` handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// Number of operations `operations/list` will return.
    #[serde(rename = "operationCount")]
    pub operation_count: usize,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Map a protocol failure onto its JSON-RPC error code.
    pub fn from_protocol_error(id: Option<Value>, err: &ProtocolError) -> Self {
        let code = match err {
            ProtocolError::InvalidRequest { .. } => INVALID_REQUEST,
            ProtocolError::UnknownMethod { .. } => METHOD_NOT_FOUND,
            ProtocolError::InvalidParameters { .. } => INVALID_PARAMS,
            ProtocolError::Unauthorized { .. }
            | ProtocolError::Json(_)
            | ProtocolError::Operation(_) => INTERNAL_ERROR,
        };
        Self::error(id, code, err.to_string())
    }
}

/// JSON-RPC server for the portfolio operations.
pub struct RpcServer {
    /// Shared application state.
    state: SharedState,
}

impl RpcServer {
    /// Create a new server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Portfolio admin server starting...");
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve newline-delimited requests until EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Notifications get no response
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request.
    ///
    /// Returns `None` for notifications (requests without an id).
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        if request.jsonrpc != "2.0" {
            return (!is_notification).then(|| {
                let err = ProtocolError::InvalidRequest {
                    message: format!("unsupported JSON-RPC version {}", request.jsonrpc),
                };
                JsonRpcResponse::from_protocol_error(request.id, &err)
            });
        }

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" => {
                debug!("Received initialized notification");
                None
            }
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            "operations/list" => Some(self.handle_operations_list(request.id)),
            method => {
                if is_notification {
                    debug!(method = %method, "Notification ignored");
                    return None;
                }
                let result = handle_operation(&self.state, method, request.params).await;
                Some(match result {
                    Ok(envelope) => match serde_json::to_value(envelope) {
                        Ok(value) => JsonRpcResponse::success(request.id, value),
                        Err(e) => {
                            error!(error = %e, "Failed to serialize envelope");
                            JsonRpcResponse::error(
                                request.id,
                                INTERNAL_ERROR,
                                format!("Internal error: {}", e),
                            )
                        }
                    },
                    Err(e) => {
                        error!(method = %method, error = %e, "Request rejected");
                        JsonRpcResponse::from_protocol_error(request.id, &e)
                    }
                })
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            operation_count: OPERATIONS.len(),
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e))
            }
        }
    }

    /// Handle operations/list request
    fn handle_operations_list(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, serde_json::json!({ "operations": OPERATIONS }))
    }
}
