use thiserror::Error;

/// Why the camera/microphone could not be acquired.
///
/// The kind is kept precise so the screen can surface a matching remedy
/// instead of a generic failure.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("Camera or microphone permission denied")]
    PermissionDenied,

    #[error("No camera or microphone was found")]
    NotFound,

    #[error("The camera or microphone is busy")]
    Busy,

    #[error("Media capture is not supported here")]
    Unsupported,

    #[error("Media capture failed: {0}")]
    Other(String),
}

impl DeviceError {
    /// A user-actionable remedy for this failure kind.
    pub fn remedy(&self) -> &'static str {
        match self {
            DeviceError::PermissionDenied => {
                "Allow camera and microphone access in your browser settings, then reload"
            }
            DeviceError::NotFound => "Connect a camera and microphone, then reload",
            DeviceError::Busy => "Close other applications using the camera, then reload",
            DeviceError::Unsupported => "Try a different browser or device",
            DeviceError::Other(_) => "Reload the page to try again",
        }
    }
}

/// Why a turn was not sent
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("No active avatar session")]
    MissingSession,

    #[error("Cannot send an empty message")]
    EmptyText,

    #[error("A previous audio send is still in flight")]
    Busy,

    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}
