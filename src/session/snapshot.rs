use super::lifecycle::Phase;
use crate::avatar::ConnectionHealth;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The session state exposed to the surrounding screen
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Lifecycle phase
    pub phase: Phase,

    /// Avatar stream connection health
    pub health: ConnectionHealth,

    /// Seconds since the session went live
    pub elapsed_secs: u64,

    /// Whether local recording is active
    pub recording: bool,

    /// Autoplay was blocked; a manual resume gesture is needed
    pub needs_gesture: bool,

    /// Interview record id, once the interview has been submitted
    pub record_id: Option<String>,

    /// The interview question, once context has resolved
    pub question: Option<String>,
}

/// A transient, auto-dismissing user notice
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
