//! Terminal response wire format

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::error::DeliveryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Success => "SUCCESS",
            ResponseStatus::Failed => "FAILED",
        }
    }
}

/// The single outcome record sent back to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminalResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: Map<String, JsonValue>,
}

impl TerminalResponse {
    /// Serialize to the JSON body sent with the PUT
    pub fn to_body(&self) -> Result<Bytes, DeliveryError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Headers expected by the pre-signed callback URL.
    ///
    /// The content type must be empty, otherwise the signature check on
    /// the receiving side fails.
    pub fn headers(body: &Bytes) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(""));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers
    }
}
