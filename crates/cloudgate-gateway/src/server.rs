//! stdio MCP server: newline-delimited JSON-RPC 2.0 over stdin/stdout.
//!
//! Requests are read and answered strictly one at a time, so tool calls
//! never overlap.

use std::sync::Arc;

use cloudgate_protocol::jsonrpc::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR, RpcRequest, RpcResponse, ToolCallParams, ToolCallResult,
};
use cloudgate_protocol::{Arguments, LineReader, LineWriter, ProtocolError, decode_line, tools};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};

use crate::error::GatewayResult;
use crate::gateway::Gateway;

/// Name reported in `initialize`.
pub const SERVER_NAME: &str = "cloudgate";

/// Answers JSON-RPC requests with the gateway.
pub struct McpServer {
    gateway: Arc<Gateway>,
}

impl McpServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Serves stdin/stdout until end of input or Ctrl-C.
    pub async fn serve_stdio(&self) -> GatewayResult<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        tokio::select! {
            result = self.run(stdin, stdout) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, shutting down");
                Ok(())
            }
        }
    }

    /// Serves one stream pair until end of input.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> GatewayResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = LineReader::new(reader);
        let mut writer = LineWriter::new(writer);
        info!("MCP server ready on stdio");

        loop {
            let line = match reader.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(ProtocolError::MessageTooLarge { size, max }) => {
                    warn!(size, max, "Dropping oversized message");
                    let response = RpcResponse::error(
                        Value::Null,
                        INVALID_REQUEST,
                        format!("message too large: {size} bytes (max: {max})"),
                    );
                    writer.write_message(&response).await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(response) = self.handle_line(&line).await {
                writer.write_message(&response).await?;
            }
        }

        info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Answers one framed message. Notifications get no answer.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let request: RpcRequest = match decode_line(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Unparsable request");
                return Some(RpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                ));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                RpcResponse::error(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"")
            });
        }

        debug!(method = %request.method, "Handling request");
        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        Some(match request.method.as_str() {
            "initialize" => RpcResponse::result(id, initialize_result()),
            "ping" => RpcResponse::result(id, json!({})),
            "tools/list" => RpcResponse::result(id, json!({ "tools": tools() })),
            "tools/call" => self.call_tool(id, request.params).await,
            other => {
                RpcResponse::error(id, METHOD_NOT_FOUND, format!("method not found: {other}"))
            }
        })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> RpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => return RpcResponse::error(id, INVALID_PARAMS, "missing tools/call params"),
            Err(e) => {
                let message = format!("invalid tools/call params: {e}");
                return RpcResponse::error(id, INVALID_PARAMS, message);
            }
        };

        let arguments = Arguments::new(params.arguments.unwrap_or_default());
        let envelope = self.gateway.invoke(&params.name, arguments).await;
        let result = ToolCallResult::from(&envelope);
        match serde_json::to_value(result) {
            Ok(value) => RpcResponse::result(id, value),
            Err(e) => {
                RpcResponse::error(id, INTERNAL_ERROR, format!("failed to encode result: {e}"))
            }
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": { "tools": {} },
    })
}
