//! JSON bodies of the backend contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use stylist_core::catalog::RawItem;
use stylist_core::types::{EventContext, HistoryEntry};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    /// Turns preceding this message, oldest first.
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub return_audio: bool,
}

/// Body returned by `POST /api/chat`.
///
/// Only `text_response` is mandatory. The optional parts are kept as raw
/// JSON so that one badly shaped field never invalidates the whole reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponseBody {
    pub text_response: String,
    #[serde(default)]
    pub event_context: Option<Value>,
    #[serde(default)]
    pub recommended_items: Option<Value>,
    #[serde(default)]
    pub audio_response_base64: Option<String>,
}

impl ChatResponseBody {
    /// A reply carrying only text.
    pub fn text(text_response: impl Into<String>) -> Self {
        Self {
            text_response: text_response.into(),
            ..Default::default()
        }
    }

    pub fn event_context(&self) -> Option<EventContext> {
        self.event_context.as_ref().and_then(EventContext::from_value)
    }

    /// Recommendation records, if the backend sent a list.
    pub fn raw_items(&self) -> Option<Vec<RawItem>> {
        match self.recommended_items.as_ref()? {
            Value::Array(items) => Some(items.iter().map(RawItem::from_value).collect()),
            Value::Null => None,
            other => {
                tracing::warn!(kind = %json_kind(other), "recommended_items is not a list, ignoring");
                None
            }
        }
    }

    /// The synthesized reply, unless absent or blank.
    pub fn audio_base64(&self) -> Option<&str> {
        self.audio_response_base64
            .as_deref()
            .filter(|audio| !audio.trim().is_empty())
    }
}

/// Body returned by `POST /api/transcribe`.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeResponseBody {
    pub transcript: String,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stylist_core::types::Role;

    #[test]
    fn test_request_serialization_omits_missing_image() {
        let body = ChatRequestBody {
            message: "I need an outfit for a wedding".into(),
            conversation_history: vec![HistoryEntry {
                role: Role::User,
                content: "hi".into(),
            }],
            image_base64: None,
            return_audio: true,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "I need an outfit for a wedding",
                "conversation_history": [{"role": "user", "content": "hi"}],
                "return_audio": true
            })
        );
    }

    #[test]
    fn test_request_serialization_with_image() {
        let body = ChatRequestBody {
            message: "What do you think about this item?".into(),
            conversation_history: vec![],
            image_base64: Some("/9j/".into()),
            return_audio: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["image_base64"], "/9j/");
        assert_eq!(value["return_audio"], false);
    }

    #[test]
    fn test_response_minimal() {
        let body: ChatResponseBody =
            serde_json::from_str(r#"{"text_response": "Try the navy blazer."}"#).unwrap();
        assert_eq!(body.text_response, "Try the navy blazer.");
        assert!(body.event_context().is_none());
        assert!(body.raw_items().is_none());
        assert!(body.audio_base64().is_none());
    }

    #[test]
    fn test_response_missing_text_is_malformed() {
        let result: Result<ChatResponseBody, _> =
            serde_json::from_str(r#"{"recommended_items": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_response_full() {
        let body: ChatResponseBody = serde_json::from_value(json!({
            "text_response": "Here are some picks",
            "event_context": {"event_type": "wedding", "season": "Summer"},
            "recommended_items": [{"id": 1}, {"id": "2", "price": 80}],
            "audio_response_base64": "SUQz",
            "apis_used": ["chat"]
        }))
        .unwrap();

        assert_eq!(
            body.event_context().unwrap().event_type.as_deref(),
            Some("wedding")
        );
        let items = body.raw_items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id.as_deref(), Some("1"));
        assert_eq!(items[1].price, Some(80.0));
        assert_eq!(body.audio_base64(), Some("SUQz"));
    }

    #[test]
    fn test_response_items_wrong_shape_are_ignored() {
        let body: ChatResponseBody = serde_json::from_value(json!({
            "text_response": "ok",
            "recommended_items": {"id": 1},
            "audio_response_base64": "  "
        }))
        .unwrap();
        assert!(body.raw_items().is_none());
        assert!(body.audio_base64().is_none());
    }

    #[test]
    fn test_transcribe_response() {
        let body: TranscribeResponseBody =
            serde_json::from_str(r#"{"transcript": "a linen suit", "model": "whisper-1"}"#)
                .unwrap();
        assert_eq!(body.transcript, "a linen suit");
    }
}
