use crate::avatar::PlayerFactory;
use crate::config::{SessionSettings, StreamSettings};
use crate::media::CaptureBackend;
use crate::remote::InterviewApi;
use crate::session::{Notice, SessionHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

/// One live interview session with its pending notices
pub struct LiveSession {
    pub handle: SessionHandle,
    pub notices: Mutex<mpsc::UnboundedReceiver<Notice>>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active interview sessions (session key → actor handle)
    pub sessions: Arc<RwLock<HashMap<String, Arc<LiveSession>>>>,

    pub api: Arc<dyn InterviewApi>,
    pub capture: Arc<dyn CaptureBackend>,
    pub players: Arc<dyn PlayerFactory>,
    pub session_settings: SessionSettings,
    pub stream_settings: StreamSettings,
}

impl AppState {
    pub fn new(
        api: Arc<dyn InterviewApi>,
        capture: Arc<dyn CaptureBackend>,
        players: Arc<dyn PlayerFactory>,
        session_settings: SessionSettings,
        stream_settings: StreamSettings,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            api,
            capture,
            players,
            session_settings,
            stream_settings,
        }
    }
}
