//! Chat gateway: validates a submission, builds the backend request and
//! turns the reply into display-ready parts.
//!
//! Validation is local and synchronous so a rejected submission never
//! reaches the network. The round trip itself is bounded by the configured
//! request timeout.

use std::sync::Arc;
use std::time::Duration;

use stylist_client::{ChatRequestBody, ChatResponseBody, StylistBackend};
use stylist_core::catalog::NormalizedItem;
use stylist_core::config::ChatConfig;
use stylist_core::error::{Result, StylistError};
use stylist_core::types::{
    ConnectionStatus, ConversationTurn, EventContext, HistoryEntry, ImageAttachment,
};

use crate::normalize::RecommendationNormalizer;

pub const EMPTY_SUBMISSION: &str = "Please enter a message or upload an image";
pub const NOT_CONNECTED: &str = "Not connected to server. Please check your connection.";

/// A validated submission, ready to be appended and dispatched.
#[derive(Debug, Clone)]
pub struct PreparedChat {
    /// The user's turn, carrying the pending image if there was one.
    pub turn: ConversationTurn,
    pub request: ChatRequestBody,
}

/// A parsed chat reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub event_context: Option<EventContext>,
    /// Present only when the backend sent a non-empty list.
    pub items: Option<Vec<NormalizedItem>>,
    pub audio_base64: Option<String>,
}

/// Talks to `POST /api/chat` on behalf of the session.
pub struct ChatGateway<B: StylistBackend> {
    backend: Arc<B>,
    config: ChatConfig,
    timeout: Duration,
    normalizer: RecommendationNormalizer,
}

impl<B: StylistBackend> Clone for ChatGateway<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            timeout: self.timeout,
            normalizer: self.normalizer,
        }
    }
}

impl<B: StylistBackend> ChatGateway<B> {
    pub fn new(backend: Arc<B>, config: ChatConfig, timeout: Duration) -> Self {
        Self {
            backend,
            config,
            timeout,
            normalizer: RecommendationNormalizer::new(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Check that a submission may go out and build its request.
    ///
    /// Checks run in order: empty submission or an attachment that is not
    /// an image (`Validation`), a request already in flight (`Busy`),
    /// backend not online (`Connectivity`).
    /// `history` is every turn before this one.
    pub fn prepare(
        &self,
        text: &str,
        image: Option<ImageAttachment>,
        history: &[ConversationTurn],
        processing: bool,
        connection: ConnectionStatus,
    ) -> Result<PreparedChat> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Err(StylistError::Validation(EMPTY_SUBMISSION.to_string()));
        }
        if let Some(ref image) = image {
            image.validate()?;
        }
        if processing {
            return Err(StylistError::Busy);
        }
        if connection != ConnectionStatus::Online {
            return Err(StylistError::Connectivity(NOT_CONNECTED.to_string()));
        }

        let message = if text.is_empty() {
            self.config.default_image_prompt.clone()
        } else {
            text.to_string()
        };
        let request = ChatRequestBody {
            message: message.clone(),
            conversation_history: history.iter().map(HistoryEntry::from).collect(),
            image_base64: image.as_ref().map(ImageAttachment::to_base64),
            return_audio: self.config.return_audio,
        };

        Ok(PreparedChat {
            turn: ConversationTurn::user(message, image),
            request,
        })
    }

    /// Perform the round trip. Expiry of the request timeout is reported as
    /// a connectivity failure.
    pub async fn send(&self, request: ChatRequestBody) -> Result<ChatReply> {
        let body = tokio::time::timeout(self.timeout, self.backend.chat(request))
            .await
            .map_err(|_| {
                StylistError::Connectivity(format!(
                    "chat request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;
        Ok(self.parse(body))
    }

    fn parse(&self, body: ChatResponseBody) -> ChatReply {
        let items = body
            .raw_items()
            .filter(|raw| !raw.is_empty())
            .map(|raw| self.normalizer.normalize_all(&raw));
        tracing::debug!(
            text_len = body.text_response.len(),
            items = items.as_ref().map_or(0, Vec::len),
            has_audio = body.audio_base64().is_some(),
            "Chat reply parsed"
        );
        ChatReply {
            event_context: body.event_context(),
            audio_base64: body.audio_base64().map(str::to_string),
            items,
            text: body.text_response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stylist_client::MockBackend;
    use stylist_core::types::NOT_AN_IMAGE;

    fn gateway(backend: &MockBackend) -> ChatGateway<MockBackend> {
        ChatGateway::new(
            Arc::new(backend.clone()),
            ChatConfig::default(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_prepare_rejects_in_order() {
        let backend = MockBackend::new();
        let gw = gateway(&backend);

        let err = gw
            .prepare("  ", None, &[], true, ConnectionStatus::Offline)
            .unwrap_err();
        assert!(matches!(err, StylistError::Validation(_)));

        let err = gw
            .prepare("hi", None, &[], true, ConnectionStatus::Offline)
            .unwrap_err();
        assert!(matches!(err, StylistError::Busy));

        let err = gw
            .prepare("hi", None, &[], false, ConnectionStatus::Connecting)
            .unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(backend.chat_calls(), 0);
    }

    #[test]
    fn test_prepare_rejects_non_image_attachment() {
        let backend = MockBackend::new();
        let gw = gateway(&backend);
        let pdf = ImageAttachment::new(b"%PDF-1.4 order receipt".to_vec());

        match gw.prepare("what about this?", Some(pdf), &[], false, ConnectionStatus::Online) {
            Err(StylistError::Validation(msg)) => assert_eq!(msg, NOT_AN_IMAGE),
            other => panic!("expected validation error, got {:?}", other.map(|p| p.request)),
        }
    }

    #[test]
    fn test_prepare_image_only_uses_default_prompt() {
        let backend = MockBackend::new();
        let gw = gateway(&backend);
        let image = ImageAttachment::new(vec![0xff, 0xd8, 0xff]);

        let prepared = gw
            .prepare("", Some(image.clone()), &[], false, ConnectionStatus::Online)
            .unwrap();
        assert_eq!(prepared.request.message, "What do you think about this item?");
        assert_eq!(prepared.request.image_base64.as_deref(), Some("/9j/"));
        assert!(prepared.request.return_audio);
        assert_eq!(prepared.turn.attached_image, Some(image));
        assert_eq!(prepared.turn.content, prepared.request.message);
    }

    #[test]
    fn test_prepare_carries_prior_history() {
        let backend = MockBackend::new();
        let gw = gateway(&backend);
        let history = vec![
            ConversationTurn::user("wedding in spring", None),
            ConversationTurn::assistant("Lovely! Indoor or outdoor?"),
        ];

        let prepared = gw
            .prepare(" outdoor ", None, &history, false, ConnectionStatus::Online)
            .unwrap();
        assert_eq!(prepared.request.message, "outdoor");
        assert_eq!(prepared.request.conversation_history.len(), 2);
        assert_eq!(
            prepared.request.conversation_history[1].content,
            "Lovely! Indoor or outdoor?"
        );
        assert!(prepared.request.image_base64.is_none());
    }

    #[tokio::test]
    async fn test_send_parses_and_normalizes() {
        let backend = MockBackend::new();
        let body: ChatResponseBody = serde_json::from_value(json!({
            "text_response": "Try these",
            "event_context": {"event_type": "gala"},
            "recommended_items": [{"id": "42"}],
            "audio_response_base64": "SUQz"
        }))
        .unwrap();
        backend.push_chat_reply(body);
        let gw = gateway(&backend);

        let prepared = gw
            .prepare("gala", None, &[], false, ConnectionStatus::Online)
            .unwrap();
        let reply = gw.send(prepared.request).await.unwrap();
        assert_eq!(reply.text, "Try these");
        assert_eq!(
            reply.event_context.unwrap().event_type.as_deref(),
            Some("gala")
        );
        let items = reply.items.unwrap();
        assert_eq!(items[0].price, 65.0);
        assert_eq!(reply.audio_base64.as_deref(), Some("SUQz"));
    }

    #[tokio::test]
    async fn test_send_empty_items_are_absent() {
        let backend = MockBackend::new();
        let body: ChatResponseBody = serde_json::from_value(json!({
            "text_response": "Tell me more",
            "recommended_items": []
        }))
        .unwrap();
        backend.push_chat_reply(body);
        let gw = gateway(&backend);

        let reply = gw
            .send(gw.prepare("x", None, &[], false, ConnectionStatus::Online).unwrap().request)
            .await
            .unwrap();
        assert!(reply.items.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_timeout_is_connectivity() {
        let backend = MockBackend::new();
        backend.set_chat_delay(Duration::from_secs(45));
        let gw = gateway(&backend);

        let request = gw
            .prepare("slow", None, &[], false, ConnectionStatus::Online)
            .unwrap()
            .request;
        let err = gw.send(request).await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("timed out"));
    }
}
