//! JSON-RPC request/response envelopes
//!
//! Deluge's web API wraps every call in `{"id", "method", "params"}` and
//! every reply in `{"id", "result", "error"}`. Params are positional; their
//! order is fixed per method. A non-null `error` member always takes
//! precedence over `result`.

use crate::error::{ClientError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outgoing RPC call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Opaque correlation token; unique within one transport, not across restarts
    pub id: u32,
    /// Namespaced method, e.g. `core.get_torrents_status`
    pub method: String,
    /// Positional parameters in the method's fixed order
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: u32, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// A decoded response envelope
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// The `error` member of a response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

impl From<RpcError> for ClientError {
    fn from(err: RpcError) -> Self {
        Self::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

impl RpcResponse {
    /// Deserialize the `result` member into the method's typed model.
    ///
    /// The `error` member is checked first and wins unconditionally. A
    /// missing/null `result` is an [`ClientError::UnexpectedResponse`]
    /// unless `T` itself accepts null (e.g. `()` or an `Option`).
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        match self.result {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| ClientError::Decoding(e.to_string()))
            }
            None => serde_json::from_value(Value::Null).map_err(|_| {
                ClientError::UnexpectedResponse("envelope has no result member".to_string())
            }),
        }
    }

    /// Accept any non-error envelope, discarding `result`.
    ///
    /// Mutating calls (pause/resume/remove/...) define success as "the
    /// daemon did not report an error"; their `result` shapes vary across
    /// daemon versions and carry no information.
    pub fn into_ack(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let req = RpcRequest::new(7, "auth.login", vec![json!("secret")]);
        let encoded = serde_json::to_value(&req).unwrap();
        assert_eq!(
            encoded,
            json!({"id": 7, "method": "auth.login", "params": ["secret"]})
        );
    }

    #[test]
    fn test_request_round_trip_preserves_param_order() {
        let req = RpcRequest::new(
            1,
            "core.get_torrents_status",
            vec![json!({}), json!(["name", "hash"])],
        );
        let bytes = serde_json::to_vec(&req).unwrap();
        let back: RpcRequest = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.method, req.method);
        assert_eq!(back.params, req.params);
        assert_eq!(back.id, req.id);
    }

    #[test]
    fn test_error_takes_precedence_over_result() {
        let body = json!({
            "id": 3,
            "result": {"looks": "valid"},
            "error": {"message": "boom", "code": 4}
        });
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        match resp.into_result::<Value>() {
            Err(ClientError::Rpc { code, message }) => {
                assert_eq!(code, Some(4));
                assert_eq!(message, "boom");
            }
            other => panic!("expected Rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_error_decodes_result() {
        let body = json!({"id": 1, "result": true, "error": null});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        assert!(resp.into_result::<bool>().unwrap());
    }

    #[test]
    fn test_missing_result_is_unexpected_response() {
        let body = json!({"id": 1, "result": null, "error": null});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        match resp.into_result::<String>() {
            Err(ClientError::UnexpectedResponse(_)) => {}
            other => panic!("expected UnexpectedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_null_result_acceptable_for_unit_and_option() {
        let body = json!({"id": 1, "result": null, "error": null});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        resp.into_result::<()>().unwrap();

        let body = json!({"id": 2, "result": null, "error": null});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.into_result::<Option<String>>().unwrap(), None);
    }

    #[test]
    fn test_ack_ignores_result_shape() {
        let body = json!({"id": 1, "result": true, "error": null});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        resp.into_ack().unwrap();

        let body = json!({"id": 2, "error": {"message": "nope"}});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        assert!(resp.into_ack().is_err());
    }
}
