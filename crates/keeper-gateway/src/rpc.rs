//! JSON-RPC 2.0 envelope types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, must be "2.0".
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// JSON-RPC 2.0 response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,

    /// Echo of the request id; null when the request could not be read.
    pub id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Code reported in logs; 0 for success.
    pub fn code(&self) -> i32 {
        self.error.as_ref().map_or(0, |e| e.code)
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Parse error (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    /// Invalid request error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_roundtrip() {
        let req = JsonRpcRequest::new("data.get")
            .with_id(7)
            .with_params(json!({"id": "a1"}));
        let text = serde_json::to_string(&req).unwrap();
        let parsed: JsonRpcRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.method, "data.get");
        assert_eq!(parsed.id, Some(json!(7)));
        assert_eq!(parsed.params.unwrap()["id"], "a1");
    }

    #[test]
    fn test_request_without_params() {
        let parsed: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"x","method":"ping"}"#).unwrap();
        assert!(parsed.params.is_none());
    }

    #[test]
    fn test_response_shapes() {
        let ok = JsonRpcResponse::success(Some(json!(1)), json!({"pong": true}));
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(ok.code(), 0);

        let err = JsonRpcResponse::error(None, JsonRpcError::parse_error("bad json"));
        let value = serde_json::to_value(&err).unwrap();
        assert!(value.get("result").is_none());
        assert!(value["id"].is_null());
        assert_eq!(err.code(), -32700);
    }
}
