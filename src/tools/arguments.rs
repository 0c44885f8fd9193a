//! Parsed tool-call arguments.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Result, VoiceGitError};

/// Arguments of one tool call, always a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    raw: Map<String, Value>,
}

impl ToolArguments {
    /// Wrap an object value. `null` is treated as no arguments.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(raw) => Self { raw },
            _ => Self::default(),
        }
    }

    /// Normalize what a model produced into an argument object.
    ///
    /// Accepts an object, `null`, or a string holding a JSON object (some
    /// models double-encode). Anything else is an [`VoiceGitError::InvalidArgument`].
    pub fn from_model(value: &Value) -> Result<Self> {
        match value {
            Value::Object(raw) => Ok(Self { raw: raw.clone() }),
            Value::Null => Ok(Self::default()),
            Value::String(text) if text.trim().is_empty() => Ok(Self::default()),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(raw)) => Ok(Self { raw }),
                _ => Err(VoiceGitError::InvalidArgument(format!(
                    "tool arguments are not a JSON object: {text}"
                ))),
            },
            other => Err(VoiceGitError::InvalidArgument(format!(
                "tool arguments must be an object, got {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    /// Deserialize the whole object into a typed struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.raw.clone())).map_err(Into::into)
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn into_object(self) -> Map<String, Value> {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_objects_null_and_stringified_objects() {
        let direct = ToolArguments::from_model(&json!({"org": "acme"})).expect("object");
        assert_eq!(direct.get_str("org"), Some("acme"));

        assert!(ToolArguments::from_model(&Value::Null)
            .expect("null")
            .as_object()
            .is_empty());

        let encoded = ToolArguments::from_model(&json!("{\"org\":\"acme\"}")).expect("string");
        assert_eq!(encoded, direct);
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert!(matches!(
            ToolArguments::from_model(&json!("{not json")),
            Err(VoiceGitError::InvalidArgument(_))
        ));
        assert!(matches!(
            ToolArguments::from_model(&json!([1, 2])),
            Err(VoiceGitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parses_into_typed_struct() {
        #[derive(serde::Deserialize)]
        struct Repo {
            org: String,
        }
        let args = ToolArguments::new(json!({"org": "acme"}));
        let repo: Repo = args.parse().expect("typed");
        assert_eq!(repo.org, "acme");
    }
}
