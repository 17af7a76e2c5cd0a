use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("No media selected")]
    NoMediaSelected,

    #[error("No playable source available")]
    NoPlayableSource,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Format unsupported: {0}")]
    FormatUnsupported(String),

    #[error("Playback aborted")]
    Aborted,

    #[error("Subtitle fetch failed: {0}")]
    SubtitleFetch(String),

    #[error("Backend report failed: {0}")]
    BackendReport(String),

    #[error("Playback session controller is gone")]
    ControllerGone,
}

impl SessionError {
    pub fn network(error: impl std::fmt::Display) -> Self {
        SessionError::Network(error.to_string())
    }
}

/// Why a session ended up in the `Error` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackFailure {
    Aborted,
    Network,
    Decode,
    FormatUnsupported,
    NoPlayableSource,
}

impl PlaybackFailure {
    /// Maps the surface's numeric media error code (1..=4).
    pub fn from_media_error_code(code: u16) -> Self {
        match code {
            1 => PlaybackFailure::Aborted,
            2 => PlaybackFailure::Network,
            3 => PlaybackFailure::Decode,
            4 => PlaybackFailure::FormatUnsupported,
            _ => PlaybackFailure::Decode,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            PlaybackFailure::Aborted => "Playback was aborted",
            PlaybackFailure::Network => "Network error while loading video",
            PlaybackFailure::Decode => "Video could not be decoded",
            PlaybackFailure::FormatUnsupported => "Video format is not supported on this device",
            PlaybackFailure::NoPlayableSource => "No playable version of this item was found",
        }
    }
}

impl From<&SessionError> for PlaybackFailure {
    fn from(error: &SessionError) -> Self {
        match error {
            SessionError::NoPlayableSource => PlaybackFailure::NoPlayableSource,
            SessionError::Decode(_) => PlaybackFailure::Decode,
            SessionError::FormatUnsupported(_) => PlaybackFailure::FormatUnsupported,
            SessionError::Aborted => PlaybackFailure::Aborted,
            _ => PlaybackFailure::Network,
        }
    }
}
