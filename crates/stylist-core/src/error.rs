use thiserror::Error;

/// Top-level error type for the stylist session client.
///
/// The first five variants form the user-facing taxonomy: each maps to a
/// notice shown by the rendering layer and none of them is fatal to the
/// session. The remaining variants cover ambient failures (configuration,
/// I/O, devices) that subsystems propagate with `?`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StylistError {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Chat request error: {0}")]
    ChatRequest(String),

    #[error("A chat request is already in progress")]
    Busy,

    #[error("Device error: {0}")]
    Device(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StylistError {
    /// Whether the error means the backend could not be reached at all.
    ///
    /// Connectivity failures flip the session to offline and block new sends
    /// until the next successful health check.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StylistError::Connectivity(_))
    }
}

impl From<toml::de::Error> for StylistError {
    fn from(err: toml::de::Error) -> Self {
        StylistError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for StylistError {
    fn from(err: toml::ser::Error) -> Self {
        StylistError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for StylistError {
    fn from(err: serde_json::Error) -> Self {
        StylistError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for StylistError {
    fn from(err: base64::DecodeError) -> Self {
        StylistError::Serialization(format!("invalid base64: {}", err))
    }
}

/// A specialized `Result` type for stylist operations.
pub type Result<T> = std::result::Result<T, StylistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StylistError::Validation("empty message".to_string());
        assert_eq!(err.to_string(), "Validation error: empty message");
    }

    #[test]
    fn test_error_display_taxonomy() {
        let cases: Vec<(StylistError, &str)> = vec![
            (
                StylistError::Connectivity("refused".to_string()),
                "Connectivity error: refused",
            ),
            (
                StylistError::Permission("denied".to_string()),
                "Permission error: denied",
            ),
            (
                StylistError::Transcription("status 500".to_string()),
                "Transcription error: status 500",
            ),
            (
                StylistError::ChatRequest("API error: 500".to_string()),
                "Chat request error: API error: 500",
            ),
            (StylistError::Busy, "A chat request is already in progress"),
            (
                StylistError::Device("unplugged".to_string()),
                "Device error: unplugged",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_is_connectivity() {
        assert!(StylistError::Connectivity("timeout".into()).is_connectivity());
        assert!(!StylistError::ChatRequest("500".into()).is_connectivity());
        assert!(!StylistError::Busy.is_connectivity());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StylistError = io_err.into();
        assert!(matches!(err, StylistError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: StylistError = err.unwrap_err().into();
        assert!(matches!(err, StylistError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: StylistError = err.unwrap_err().into();
        assert!(matches!(err, StylistError::Serialization(_)));
    }

    #[test]
    fn test_error_from_base64() {
        use base64::Engine;
        let err = base64::engine::general_purpose::STANDARD
            .decode("%%%")
            .unwrap_err();
        let err: StylistError = err.into();
        assert!(err.to_string().contains("invalid base64"));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let value: serde_json::Value = serde_json::from_str("{\"a\": 1}")?;
            Ok(value["a"].to_string())
        }

        assert_eq!(inner().unwrap(), "1");
    }
}
