//! Watson Assistant webhook wire types and request validation.
//!
//! Inbound: `{ "text": string(1..=2048), "context"?: object }`.
//! Outbound: `{ "response_type": "text", "text": string, "context"?: object }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Assistant context variables, round-tripped opaquely. Key order is preserved.
pub type Context = serde_json::Map<String, Value>;

/// Maximum inbound `text` length, in characters.
pub const MAX_TEXT_CHARS: usize = 2048;

const RESPONSE_TYPE_TEXT: &str = "text";

/// A validated inbound webhook payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub text: String,
    /// Empty when the caller sent no context.
    pub context: Context,
}

/// Webhook response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(default = "default_response_type")]
    pub response_type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

fn default_response_type() -> String {
    RESPONSE_TYPE_TEXT.to_string()
}

impl OutboundMessage {
    /// A text response carrying the given context.
    pub fn text(text: impl Into<String>, context: Context) -> Self {
        Self {
            response_type: default_response_type(),
            text: text.into(),
            context: Some(context),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("text: missing data for required field")]
    MissingText,
    #[error("text: not a valid string")]
    TextNotString,
    #[error("text: length must be between 1 and {max}, got {len}")]
    TextLength { len: usize, max: usize },
    #[error("context: not a valid mapping")]
    ContextNotObject,
    #[error("{0}: unknown field")]
    UnknownField(String),
}

impl ValidationError {
    /// Nominal HTTP status for this error: 400 for unreadable JSON, 422 for schema violations.
    pub fn status_code(&self) -> u16 {
        match self {
            ValidationError::MalformedJson(_) => 400,
            _ => 422,
        }
    }
}

/// A rejected payload: the reason plus whatever context could be salvaged from the body
/// (empty when the body or its `context` field could not be read as an object).
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub error: ValidationError,
    pub context: Context,
}

impl Rejection {
    fn new(error: ValidationError, context: Context) -> Self {
        Self { error, context }
    }
}

/// Validate a raw request body into an [`InboundMessage`]. Pure; no I/O.
pub fn parse_inbound(body: &[u8]) -> Result<InboundMessage, Rejection> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Rejection::new(ValidationError::MalformedJson(e.to_string()), Context::new())
    })?;
    let Value::Object(mut fields) = value else {
        return Err(Rejection::new(ValidationError::NotAnObject, Context::new()));
    };

    let context = match fields.remove("context") {
        None => Context::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(Rejection::new(
                ValidationError::ContextNotObject,
                Context::new(),
            ))
        }
    };

    let reject = |error| Err(Rejection::new(error, context.clone()));

    let text = match fields.remove("text") {
        None => return reject(ValidationError::MissingText),
        Some(Value::String(s)) => s,
        Some(_) => return reject(ValidationError::TextNotString),
    };
    if let Some(unknown) = fields.keys().next() {
        return reject(ValidationError::UnknownField(unknown.clone()));
    }
    let len = text.chars().count();
    if len == 0 || len > MAX_TEXT_CHARS {
        return reject(ValidationError::TextLength {
            len,
            max: MAX_TEXT_CHARS,
        });
    }

    Ok(InboundMessage { text, context })
}

/// Merge adapter keys into a copy of `base`. Every key of `base` is kept; on collision the
/// addition wins. Applying the same additions again yields the same map.
pub fn merge_context<I>(base: &Context, additions: I) -> Context
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut merged = base.clone();
    for (key, value) in additions {
        merged.insert(key, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn accepts_text_without_context() {
        let msg = parse_inbound(br#"{"text":"Hello"}"#).unwrap();
        assert_eq!(msg.text, "Hello");
        assert!(msg.context.is_empty());
    }

    #[test]
    fn keeps_context_opaque() {
        let msg = parse_inbound(br#"{"text":"hi","context":{"user":{"id":7},"turn":3}}"#).unwrap();
        assert_eq!(msg.context, ctx(json!({"user": {"id": 7}, "turn": 3})));
    }

    #[test]
    fn rejects_empty_and_missing_text() {
        let err = parse_inbound(br#"{"text":""}"#).unwrap_err();
        assert_eq!(err.error, ValidationError::TextLength { len: 0, max: 2048 });
        assert_eq!(err.error.status_code(), 422);

        let err = parse_inbound(br#"{"context":{}}"#).unwrap_err();
        assert_eq!(err.error, ValidationError::MissingText);
    }

    #[test]
    fn length_is_counted_in_characters() {
        let at_limit = "é".repeat(MAX_TEXT_CHARS);
        let body = serde_json::to_vec(&json!({ "text": at_limit })).unwrap();
        assert!(parse_inbound(&body).is_ok());

        let over = "a".repeat(MAX_TEXT_CHARS + 1);
        let body = serde_json::to_vec(&json!({ "text": over })).unwrap();
        assert_eq!(
            parse_inbound(&body).unwrap_err().error,
            ValidationError::TextLength { len: 2049, max: 2048 }
        );
    }

    #[test]
    fn rejects_wrong_types() {
        assert_eq!(
            parse_inbound(br#"{"text":42}"#).unwrap_err().error,
            ValidationError::TextNotString
        );
        assert_eq!(
            parse_inbound(br#"{"text":"hi","context":null}"#).unwrap_err().error,
            ValidationError::ContextNotObject
        );
        assert_eq!(
            parse_inbound(br#"["text"]"#).unwrap_err().error,
            ValidationError::NotAnObject
        );
        let err = parse_inbound(b"{not json").unwrap_err();
        assert!(matches!(err.error, ValidationError::MalformedJson(_)));
        assert_eq!(err.error.status_code(), 400);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = parse_inbound(br#"{"text":"hi","intent":"greet"}"#).unwrap_err();
        assert_eq!(err.error, ValidationError::UnknownField("intent".to_string()));
    }

    #[test]
    fn rejection_salvages_well_formed_context() {
        let err = parse_inbound(br#"{"text":"","context":{"session":"abc"}}"#).unwrap_err();
        assert_eq!(err.context, ctx(json!({"session": "abc"})));

        let err = parse_inbound(br#"{"text":"","context":"abc"}"#).unwrap_err();
        assert!(err.context.is_empty());
    }

    #[test]
    fn merge_keeps_base_and_additions_win() {
        let base = ctx(json!({"a": 1, "last_gpt_response": "old"}));
        let merged = merge_context(&base, [("last_gpt_response".to_string(), json!("new"))]);
        assert_eq!(merged, ctx(json!({"a": 1, "last_gpt_response": "new"})));
    }

    #[test]
    fn merge_is_idempotent() {
        let base = ctx(json!({"a": 1, "b": [1, 2]}));
        let additions = || [("error".to_string(), json!("boom"))];
        let once = merge_context(&base, additions());
        let twice = merge_context(&once, additions());
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 3);
    }

    #[test]
    fn outbound_serializes_in_webhook_shape() {
        let out = OutboundMessage::text("Hi there!", ctx(json!({"last_gpt_response": "Hi there!"})));
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({
                "response_type": "text",
                "text": "Hi there!",
                "context": {"last_gpt_response": "Hi there!"}
            })
        );
    }
}
