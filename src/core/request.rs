//! Lifecycle requests
//!
//! The platform hands the function a PascalCase JSON envelope. It is
//! validated once and turned into an immutable [`Request`] that lives for
//! the rest of the invocation.

use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::Validate;

use super::error::{DispatchError, DispatchResult};
use crate::invalid_request;

/// The lifecycle verb carried by the envelope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    Create,
    Update,
    Delete,
    /// Anything the protocol does not define, kept verbatim
    Other(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
            RequestType::Other(value) => value,
        }
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Create" => RequestType::Create,
            "Update" => RequestType::Update,
            "Delete" => RequestType::Delete,
            _ => RequestType::Other(value),
        }
    }
}

impl From<&str> for RequestType {
    fn from(value: &str) -> Self {
        RequestType::from(value.to_string())
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        match value {
            RequestType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw invocation envelope as delivered by the platform
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationEnvelope {
    pub request_type: RequestType,
    #[validate(length(min = 1))]
    pub stack_id: String,
    #[validate(length(min = 1))]
    pub request_id: String,
    #[validate(length(min = 1))]
    pub logical_resource_id: String,
    #[serde(rename = "ResponseURL")]
    #[validate(url)]
    pub response_url: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_properties: Map<String, JsonValue>,
    #[serde(default)]
    pub old_resource_properties: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub service_token: Option<String>,
}

impl InvocationEnvelope {
    pub fn from_value(event: JsonValue) -> DispatchResult<Self> {
        trace!("Read invocation event: {event}");
        serde_json::from_value(event).map_err(|e| invalid_request!("Unable to parse event: {}", e))
    }
}

/// One lifecycle event, immutable for the whole invocation
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    request_type: RequestType,
    stack_id: String,
    request_id: String,
    logical_resource_id: String,
    physical_resource_id: Option<String>,
    callback_url: String,
    resource_type: String,
    resource_properties: Map<String, JsonValue>,
    old_resource_properties: Option<Map<String, JsonValue>>,
    service_token: Option<String>,
}

impl Request {
    pub fn new(
        request_type: impl Into<RequestType>,
        stack_id: impl Into<String>,
        request_id: impl Into<String>,
        logical_resource_id: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            request_type: request_type.into(),
            stack_id: stack_id.into(),
            request_id: request_id.into(),
            logical_resource_id: logical_resource_id.into(),
            physical_resource_id: None,
            callback_url: callback_url.into(),
            resource_type: String::new(),
            resource_properties: Map::new(),
            old_resource_properties: None,
            service_token: None,
        }
    }

    pub fn with_physical_resource_id(mut self, physical_resource_id: impl Into<String>) -> Self {
        self.physical_resource_id = Some(physical_resource_id.into());
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn with_resource_properties(mut self, properties: Map<String, JsonValue>) -> Self {
        self.resource_properties = properties;
        self
    }

    pub fn with_old_resource_properties(mut self, properties: Map<String, JsonValue>) -> Self {
        self.old_resource_properties = Some(properties);
        self
    }

    pub fn request_type(&self) -> &RequestType {
        &self.request_type
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn logical_resource_id(&self) -> &str {
        &self.logical_resource_id
    }

    /// Present on Update and Delete
    pub fn physical_resource_id(&self) -> Option<&str> {
        self.physical_resource_id.as_deref()
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_properties(&self) -> &Map<String, JsonValue> {
        &self.resource_properties
    }

    /// Properties before the change, Update only
    pub fn old_resource_properties(&self) -> Option<&Map<String, JsonValue>> {
        self.old_resource_properties.as_ref()
    }

    pub fn service_token(&self) -> Option<&str> {
        self.service_token.as_deref()
    }
}

impl TryFrom<InvocationEnvelope> for Request {
    type Error = DispatchError;

    fn try_from(envelope: InvocationEnvelope) -> Result<Self, Self::Error> {
        envelope
            .validate()
            .map_err(|e| invalid_request!("Invalid envelope: {}", e))?;

        Ok(Self {
            request_type: envelope.request_type,
            stack_id: envelope.stack_id,
            request_id: envelope.request_id,
            logical_resource_id: envelope.logical_resource_id,
            physical_resource_id: envelope.physical_resource_id,
            callback_url: envelope.response_url,
            resource_type: envelope.resource_type,
            resource_properties: envelope.resource_properties,
            old_resource_properties: envelope.old_resource_properties,
            service_token: envelope.service_token,
        })
    }
}

impl TryFrom<JsonValue> for Request {
    type Error = DispatchError;

    fn try_from(event: JsonValue) -> Result<Self, Self::Error> {
        Request::try_from(InvocationEnvelope::from_value(event)?)
    }
}
