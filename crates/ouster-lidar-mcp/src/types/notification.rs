//! MCP notification types.

use serde::{Deserialize, Serialize};

use super::message::{JsonRpcNotification, JSONRPC_VERSION};

pub const PROGRESS_METHOD: &str = "notifications/progress";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl ProgressParams {
    pub fn into_notification(self) -> JsonRpcNotification {
        JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: PROGRESS_METHOD.to_string(),
            params: serde_json::to_value(self).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_wire_format() {
        let notification = ProgressParams {
            progress_token: ProgressToken::String("scan-1".to_string()),
            progress: 2.0,
            total: Some(5.0),
        }
        .into_notification();

        let wire = serde_json::to_value(&notification).unwrap();
        assert_eq!(wire["method"], "notifications/progress");
        assert_eq!(
            wire["params"],
            json!({ "progressToken": "scan-1", "progress": 2.0, "total": 5.0 })
        );
        assert!(wire.get("id").is_none());
    }

    #[test]
    fn test_numeric_token() {
        let token: ProgressToken = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(token, ProgressToken::Number(7));
    }
}
