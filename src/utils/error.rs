//! Error types for Crickstream
//!
//! This module defines the error taxonomy used throughout the player core.
//! We use thiserror for the library error type and anyhow at the binary
//! level. Engine and cast failures are caught at the adapter/bridge boundary
//! and folded into player state; only invalid commands reach the caller.

use thiserror::Error;

/// Main error type for Crickstream
#[derive(Error, Debug)]
pub enum PlayerError {
    /// The segmented-media engine could not bind to the media element
    #[error("Engine attach failure: {0}")]
    EngineAttach(String),

    /// Fatal decode or network error reported by the engine
    #[error("Stream unplayable: {0}")]
    StreamUnplayable(String),

    /// The cast receiver rejected a load request
    #[error("Cast load failure: {0}")]
    CastLoad(String),

    /// Picture-in-picture is not available on this platform
    #[error("Picture-in-picture is not supported")]
    PipUnsupported,

    /// The host refused a fullscreen request
    #[error("Fullscreen denied: {0}")]
    FullscreenDenied(String),

    /// The engine reported no live-sync position
    #[error("Live sync position unavailable")]
    LiveSyncUnavailable,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog loading or parsing errors
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        PlayerError::Catalog(format!("JSON error: {}", err))
    }
}

impl PlayerError {
    /// Whether this failure belongs to an optional affordance that degrades
    /// silently instead of surfacing to the user
    pub fn is_optional_feature(&self) -> bool {
        matches!(
            self,
            PlayerError::PipUnsupported
                | PlayerError::FullscreenDenied(_)
                | PlayerError::CastLoad(_)
                | PlayerError::LiveSyncUnavailable
        )
    }
}

/// Convenience type alias for Results in Crickstream
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Extension trait for converting other errors to PlayerError
pub trait IntoPlayerError<T> {
    /// Convert this error into a PlayerError with the given context
    fn engine_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
    fn catalog_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoPlayerError<T> for std::result::Result<T, E> {
    fn engine_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::EngineAttach(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Config(format!("{}: {}", context, e)))
    }

    fn catalog_err(self, context: &str) -> Result<T> {
        self.map_err(|e| PlayerError::Catalog(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlayerError::EngineAttach("no media source extensions".to_string());
        assert_eq!(err.to_string(), "Engine attach failure: no media source extensions");

        let err = PlayerError::PipUnsupported;
        assert_eq!(err.to_string(), "Picture-in-picture is not supported");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let player_err: PlayerError = io_err.into();
        assert!(matches!(player_err, PlayerError::FileIO(_)));

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let player_err: PlayerError = json_err.into();
        assert!(matches!(player_err, PlayerError::Catalog(_)));
    }

    #[test]
    fn test_into_player_error_trait() {
        let result: std::result::Result<(), &str> = Err("unexpected end of input");
        let converted = result.catalog_err("Reading streams.json");

        match converted {
            Err(PlayerError::Catalog(msg)) => {
                assert_eq!(msg, "Reading streams.json: unexpected end of input");
            }
            _ => panic!("Expected Catalog error"),
        }
    }

    #[test]
    fn test_optional_feature_classification() {
        assert!(PlayerError::PipUnsupported.is_optional_feature());
        assert!(PlayerError::FullscreenDenied("user gesture required".into()).is_optional_feature());
        assert!(!PlayerError::StreamUnplayable("manifest 404".into()).is_optional_feature());
        assert!(!PlayerError::EngineAttach("detached".into()).is_optional_feature());
    }
}
