use crate::media::RecordedArtifact;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Question and model configuration fetched for an interview type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewContext {
    pub question: String,
    pub model: String,
}

impl Default for InterviewContext {
    fn default() -> Self {
        Self {
            question: "Tell me about yourself.".to_string(),
            model: "default".to_string(),
        }
    }
}

/// Where to attach the real-time player for an avatar session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub stream_url: String,
    pub token: String,
}

/// A live remote avatar session.
///
/// The session id is the sole capability needed to send turns or stop the
/// session; it must be stopped exactly once.
#[derive(Debug, Clone)]
pub struct AvatarSession {
    pub session_id: String,
    pub descriptor: StreamDescriptor,
}

/// Server-side interview record, created lazily on submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub record_id: String,
    pub position: u32,
}

/// One candidate utterance
#[derive(Debug, Clone)]
pub enum TurnPayload {
    Text(String),
    Audio { data: Vec<u8>, mime_type: String },
}

/// Server acknowledgement for a sent turn
#[derive(Debug, Clone, Deserialize)]
pub struct TurnAck {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
}

/// Remote interview/avatar backend, as consumed by the orchestrator.
///
/// Production talks HTTP (`HttpInterviewApi`); tests inject fakes.
#[async_trait::async_trait]
pub trait InterviewApi: Send + Sync {
    /// Fetch question/model for an interview type. Callers fall back to
    /// `InterviewContext::default()` on failure.
    async fn interview_context(&self, kind: &str) -> Result<InterviewContext>;

    /// Start a remote avatar session.
    async fn start_avatar(&self) -> Result<AvatarSession>;

    /// Stop a remote avatar session. Also used detached on page unload.
    async fn stop_avatar(&self, session_id: &str) -> Result<()>;

    /// Send one text or audio turn, tagged with the interview record id once
    /// one exists. Untagged turns are valid before the record is created.
    async fn send_turn(
        &self,
        session_id: &str,
        turn: TurnPayload,
        record_id: Option<&str>,
    ) -> Result<TurnAck>;

    /// Create the interview record (lazy; only on submit).
    async fn create_record(&self, kind: &str) -> Result<InterviewRecord>;

    /// Mark the interview record complete.
    async fn finalize_record(
        &self,
        record_id: &str,
        elapsed_secs: u64,
        session_id: Option<&str>,
    ) -> Result<()>;

    /// Upload the recorded artifact. Best-effort; callers log failures and
    /// keep going.
    async fn upload_artifact(&self, record_id: &str, artifact: RecordedArtifact) -> Result<()>;
}
