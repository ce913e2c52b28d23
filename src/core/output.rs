//! Handler outputs and their validation
//!
//! Handlers hand back a loosely shaped [`HandlerOutput`]; the executor
//! checks it against the `(PhysicalResourceId, Data)` contract and turns
//! it into a typed [`HandlerResult`].

use serde_json::{Map, Value as JsonValue};

use super::error::ContractError;

/// Raw value returned by a handler
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput(JsonValue);

impl HandlerOutput {
    /// The regular create/update shape
    pub fn new(physical_resource_id: impl Into<String>, data: Map<String, JsonValue>) -> Self {
        Self(JsonValue::Array(vec![
            JsonValue::String(physical_resource_id.into()),
            JsonValue::Object(data),
        ]))
    }

    /// The delete shape, only a physical resource id
    pub fn id(physical_resource_id: impl Into<String>) -> Self {
        Self(JsonValue::String(physical_resource_id.into()))
    }

    /// Check the output against the handler contract.
    ///
    /// Delete handlers return only the id, so it is paired with an empty
    /// mapping before the checks run.
    pub fn validate(
        self,
        handler: &'static str,
        delete: bool,
    ) -> Result<HandlerResult, ContractError> {
        let value = if delete {
            JsonValue::Array(vec![self.0, JsonValue::Object(Map::new())])
        } else {
            self.0
        };

        let mut pair = match value {
            JsonValue::Array(items) if items.len() == 2 => items.into_iter(),
            _ => return Err(ContractError::NotAPair { handler }),
        };
        let (Some(first), Some(second)) = (pair.next(), pair.next()) else {
            return Err(ContractError::NotAPair { handler });
        };

        let physical_resource_id = match first {
            JsonValue::String(id) => id,
            other => {
                return Err(ContractError::PhysicalResourceIdNotString {
                    found: json_type_name(&other),
                })
            }
        };
        if physical_resource_id.is_empty() {
            return Err(ContractError::EmptyPhysicalResourceId);
        }

        let data = match second {
            JsonValue::Object(data) => data,
            other => {
                return Err(ContractError::DataNotMapping {
                    found: json_type_name(&other),
                })
            }
        };

        Ok(HandlerResult {
            physical_resource_id,
            data,
        })
    }
}

impl From<JsonValue> for HandlerOutput {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

impl From<String> for HandlerOutput {
    fn from(id: String) -> Self {
        Self::id(id)
    }
}

impl From<&str> for HandlerOutput {
    fn from(id: &str) -> Self {
        Self::id(id)
    }
}

impl<S: Into<String>> From<(S, Map<String, JsonValue>)> for HandlerOutput {
    fn from((id, data): (S, Map<String, JsonValue>)) -> Self {
        Self::new(id, data)
    }
}

/// A validated `(PhysicalResourceId, Data)` pair
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult {
    pub physical_resource_id: String,
    pub data: Map<String, JsonValue>,
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
