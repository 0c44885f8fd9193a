//! Parameter schemas for tools.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema describing a tool's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentToolParameters {
    pub schema: Value,
}

impl AgentToolParameters {
    /// Wrap a schema as published by a tool server. A schema without a
    /// `type` is treated as an object schema.
    pub fn from_schema(schema: Value) -> Self {
        let schema = match schema {
            Value::Object(mut map) => {
                map.entry("type").or_insert_with(|| json!("object"));
                Value::Object(map)
            }
            _ => return Self::empty(),
        };
        Self { schema }
    }

    /// No parameters.
    pub fn empty() -> Self {
        Self {
            schema: json!({ "type": "object", "properties": {} }),
        }
    }

    pub fn object() -> ParameterBuilder {
        ParameterBuilder::default()
    }
}

/// Builder for small hand-written object schemas.
#[derive(Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "string", description, required)
    }

    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, "boolean", description, required)
    }

    fn property(mut self, name: &str, kind: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": kind, "description": description }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn build(self) -> AgentToolParameters {
        AgentToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
