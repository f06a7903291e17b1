use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StylistError};

// =============================================================================
// Enums
// =============================================================================

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Backend reachability as shown by the connection indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// A health check is in flight and no result is known yet.
    #[default]
    Connecting,
    /// The last health check reported a healthy backend. Sends are permitted.
    Online,
    /// The backend is unreachable or unhealthy. Sends are blocked.
    Offline,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Online => "Connected",
            ConnectionStatus::Offline => "Offline",
        }
    }
}

/// Severity of a user-facing notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Audio container negotiated for a recording session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFormat {
    /// Preferred format.
    Webm,
    /// Fallback when the device cannot produce webm.
    Mp4,
}

impl CaptureFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            CaptureFormat::Webm => "audio/webm",
            CaptureFormat::Mp4 => "audio/mp4",
        }
    }

    /// File name used for the multipart upload.
    pub fn file_name(&self) -> &'static str {
        match self {
            CaptureFormat::Webm => "recording.webm",
            CaptureFormat::Mp4 => "recording.mp4",
        }
    }

    /// Recover the format from a mime type, ignoring codec parameters.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        match essence {
            "audio/webm" => Some(CaptureFormat::Webm),
            "audio/mp4" => Some(CaptureFormat::Mp4),
            _ => None,
        }
    }
}

/// Kind of an entry in the rendered conversation view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Greeting shown at session start. Never sent to the backend.
    Welcome,
    User,
    Assistant,
    /// Fixed apology rendered after a failed chat request. Never sent to the backend.
    Apology,
}

// =============================================================================
// Newtype Wrappers
// =============================================================================

/// Unix timestamp in milliseconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }
}

/// Notice shown when an attachment is not a supported image.
pub const NOT_AN_IMAGE: &str = "Please select an image file";

/// Image formats the backend accepts as attachments.
const ACCEPTED_IMAGE_FORMATS: [image::ImageFormat; 4] = [
    image::ImageFormat::Jpeg,
    image::ImageFormat::Png,
    image::ImageFormat::Gif,
    image::ImageFormat::WebP,
];

/// A still image attached to a user turn. Held as raw bytes and encoded to
/// base64 only at the wire boundary.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment(Vec<u8>);

impl ImageAttachment {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode an image from a base64 string (no `data:` prefix).
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Ok(Self(BASE64_STANDARD.decode(encoded.trim())?))
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mime type sniffed from the leading bytes, if the attachment is a
    /// JPEG, PNG, GIF or WebP image.
    pub fn mime_type(&self) -> Option<&'static str> {
        let format = image::guess_format(&self.0).ok()?;
        ACCEPTED_IMAGE_FORMATS
            .contains(&format)
            .then(|| format.to_mime_type())
    }

    /// Reject bytes that are not a supported image.
    pub fn validate(&self) -> Result<()> {
        match self.mime_type() {
            Some(_) => Ok(()),
            None => Err(StylistError::Validation(NOT_AN_IMAGE.to_string())),
        }
    }
}

impl std::fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImageAttachment({} bytes)", self.0.len())
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// One message in the backend-bound conversation history.
///
/// Turns are immutable once appended; the session only ever pushes new ones.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub attached_image: Option<ImageAttachment>,
    pub created_at: Timestamp,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>, attached_image: Option<ImageAttachment>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attached_image,
            created_at: Timestamp::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attached_image: None,
            created_at: Timestamp::now(),
        }
    }
}

/// `{role, content}` pair as carried in `conversation_history`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&ConversationTurn> for HistoryEntry {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// An entry of the rendered conversation view.
///
/// The view is a superset of the history: it also carries the welcome
/// message and apology turns.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedMessage {
    pub kind: MessageKind,
    pub text: String,
    pub image: Option<ImageAttachment>,
}

/// A user-facing notice (toast).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

// =============================================================================
// Audio
// =============================================================================

/// A finalized audio object: concatenated chunks tagged with their mime type.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Decode a synthesized reply from the backend's base64 payload.
    pub fn from_base64(encoded: &str, mime_type: impl Into<String>) -> Result<Self> {
        Ok(Self::new(BASE64_STANDARD.decode(encoded.trim())?, mime_type))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

// =============================================================================
// Backend status
// =============================================================================

/// Parsed `GET /health` payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub dataset_size: u64,
    #[serde(default)]
    pub demo_mode: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Event details the backend extracted from the conversation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    pub event_type: Option<String>,
    pub formality_level: Option<String>,
    pub season: Option<String>,
    pub venue_type: Option<String>,
    pub gender: Option<String>,
}

impl EventContext {
    /// Build from an untrusted JSON value. Non-string fields are ignored.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let field = |key: &str| {
            obj.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            event_type: field("event_type"),
            formality_level: field("formality_level"),
            season: field("season"),
            venue_type: field("venue_type"),
            gender: field("gender"),
        })
    }

    /// Labelled fields to display, skipping absent and `"unknown"` values.
    pub fn display_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Event", &self.event_type),
            ("Formality", &self.formality_level),
            ("Season", &self.season),
            ("Venue", &self.venue_type),
            ("Style", &self.gender),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.eq_ignore_ascii_case("unknown"))
                .map(|v| (label, v))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_capture_format_mime_and_file_name() {
        assert_eq!(CaptureFormat::Webm.mime_type(), "audio/webm");
        assert_eq!(CaptureFormat::Mp4.mime_type(), "audio/mp4");
        assert_eq!(CaptureFormat::Webm.file_name(), "recording.webm");
        assert_eq!(CaptureFormat::Mp4.file_name(), "recording.mp4");
    }

    #[test]
    fn test_capture_format_from_mime_type() {
        assert_eq!(
            CaptureFormat::from_mime_type("audio/webm;codecs=opus"),
            Some(CaptureFormat::Webm)
        );
        assert_eq!(
            CaptureFormat::from_mime_type("audio/mp4"),
            Some(CaptureFormat::Mp4)
        );
        assert_eq!(CaptureFormat::from_mime_type("audio/wav"), None);
    }

    #[test]
    fn test_image_attachment_base64() {
        let image = ImageAttachment::new(vec![0xff, 0xd8, 0xff]);
        let encoded = image.to_base64();
        assert_eq!(encoded, "/9j/");
        assert_eq!(ImageAttachment::from_base64(&encoded).unwrap(), image);
        assert_eq!(format!("{:?}", image), "ImageAttachment(3 bytes)");
    }

    #[test]
    fn test_image_attachment_format_sniffing() {
        let jpeg = ImageAttachment::new(vec![0xff, 0xd8, 0xff, 0xe0]);
        assert_eq!(jpeg.mime_type(), Some("image/jpeg"));
        let png = ImageAttachment::new(b"\x89PNG\r\n\x1a\n\0\0".to_vec());
        assert_eq!(png.mime_type(), Some("image/png"));
        let gif = ImageAttachment::new(b"GIF89a\x01\0".to_vec());
        assert_eq!(gif.mime_type(), Some("image/gif"));
        assert!(png.validate().is_ok());

        for bytes in [b"%PDF-1.4 minimal".to_vec(), Vec::new(), vec![0xaa]] {
            match ImageAttachment::new(bytes).validate() {
                Err(StylistError::Validation(msg)) => assert_eq!(msg, NOT_AN_IMAGE),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_image_attachment_invalid_base64() {
        assert!(ImageAttachment::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_history_entry_from_turn_drops_image() {
        let turn = ConversationTurn::user("hello", Some(ImageAttachment::new(vec![1, 2])));
        let entry = HistoryEntry::from(&turn);
        assert_eq!(entry.role, Role::User);
        assert_eq!(entry.content, "hello");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_health_status_defaults_for_missing_fields() {
        let health: HealthStatus = serde_json::from_str(r#"{"status": "healthy"}"#).unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.dataset_size, 0);
        assert!(!health.demo_mode);

        let degraded: HealthStatus = serde_json::from_str(r#"{"status": "starting"}"#).unwrap();
        assert!(!degraded.is_healthy());
    }

    #[test]
    fn test_event_context_from_value_is_lenient() {
        let value = serde_json::json!({
            "event_type": "wedding",
            "formality_level": 3,
            "season": "  ",
            "venue_type": "unknown",
            "gender": "Women"
        });
        let ctx = EventContext::from_value(&value).unwrap();
        assert_eq!(ctx.event_type.as_deref(), Some("wedding"));
        assert!(ctx.formality_level.is_none());
        assert!(ctx.season.is_none());
        assert_eq!(
            ctx.display_fields(),
            vec![("Event", "wedding"), ("Style", "Women")]
        );
    }

    #[test]
    fn test_event_context_from_non_object() {
        assert!(EventContext::from_value(&serde_json::json!("wedding")).is_none());
    }

    #[test]
    fn test_audio_clip_from_base64() {
        let clip = AudioClip::from_base64("SUQz", "audio/mpeg").unwrap();
        assert_eq!(clip.data, b"ID3".to_vec());
        assert_eq!(clip.mime_type, "audio/mpeg");
        assert_eq!(clip.len(), 3);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = Timestamp(1_700_000_000_123);
        assert_eq!(Timestamp::from_datetime(ts.to_datetime()), ts);
    }

    #[test]
    fn test_connection_status_labels() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Connecting);
        assert_eq!(ConnectionStatus::Online.label(), "Connected");
        assert_eq!(ConnectionStatus::Offline.label(), "Offline");
    }
}
