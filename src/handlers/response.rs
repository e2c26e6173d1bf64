//! Uniform `{success, error}` response envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::supervisor::SupervisorStatus;

/// Wallet summary returned by the `wallet-data` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    pub balance: String,
    pub status: String,
    pub last_updated: DateTime<Utc>,
}

impl WalletData {
    /// Placeholder summary until balances are read from the node.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            balance: "0".to_string(),
            status: "idle".to_string(),
            last_updated: Utc::now(),
        }
    }
}

/// Response to one channel request.
///
/// Payload fields are omitted on the wire when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SupervisorStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<WalletData>,
}

impl Response {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            status: None,
            cookie: None,
            data: None,
        }
    }

    /// Failed response carrying the error's message.
    #[must_use]
    pub fn failure(error: &impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::ok()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: SupervisorStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: WalletData) -> Self {
        self.data = Some(data);
        self
    }
}

impl<E: std::fmt::Display> From<Result<Response, E>> for Response {
    fn from(result: Result<Response, E>) -> Self {
        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Handler failed");
                Self::failure(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::SupervisorError;

    #[test]
    fn test_ok_serializes_success_only() {
        let json = serde_json::to_string(&Response::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }

    #[test]
    fn test_failure_serializes_error() {
        let response = Response::failure(&"Initialization failed");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"Initialization failed"}"#);
    }

    #[test]
    fn test_unknown_supervisor_error_message() {
        let response: Response = Err::<Response, _>(SupervisorError::Unknown).into();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Unknown error"));
    }

    #[test]
    fn test_cookie_payload() {
        let response = Response::ok().with_cookie("tok");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["cookie"], "tok");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_wallet_data_uses_camel_case() {
        let json = serde_json::to_value(WalletData::placeholder()).unwrap();
        assert_eq!(json["balance"], "0");
        assert!(json.get("lastUpdated").is_some());
    }

    #[test]
    fn test_deserializes_missing_payloads() {
        let response: Response = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(response, Response::ok());
    }
}
