// Shared test doubles: a remote API that records every call, scripted
// stream players, and capture backends that fail on demand.
#![allow(dead_code)]

use anyhow::{bail, Result};
use parley_interview::avatar::{PlayerEvent, PlayerFactory, StreamPlayer};
use parley_interview::error::DeviceError;
use parley_interview::media::{CaptureBackend, DeviceHandle};
use parley_interview::remote::{
    AvatarSession, InterviewApi, InterviewContext, InterviewRecord, StreamDescriptor, TurnAck,
    TurnPayload,
};
use parley_interview::RecordedArtifact;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ============================================================================
// Remote API fake
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Context(String),
    StartAvatar,
    StopAvatar(String),
    SendTurn {
        session_id: String,
        text: Option<String>,
        audio_bytes: usize,
        record_id: Option<String>,
    },
    CreateRecord(String),
    FinalizeRecord {
        record_id: String,
        elapsed_secs: u64,
        session_id: Option<String>,
    },
    UploadArtifact {
        record_id: String,
        bytes: usize,
    },
}

/// Records every remote call; individual operations can be made to fail.
#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<ApiCall>>,
    pub fail_context: AtomicBool,
    pub fail_start_avatar: AtomicBool,
    pub fail_stop_avatar: AtomicBool,
    pub fail_create_record: AtomicBool,
    pub fail_finalize: AtomicBool,
    pub fail_upload: AtomicBool,
    /// Artificial latency for send_turn, in milliseconds
    pub turn_delay_ms: AtomicU64,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stop_avatar_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::StopAvatar(_)))
            .count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl InterviewApi for FakeApi {
    async fn interview_context(&self, kind: &str) -> Result<InterviewContext> {
        self.record(ApiCall::Context(kind.to_string()));
        if self.fail_context.load(Ordering::SeqCst) {
            bail!("context unavailable");
        }
        Ok(InterviewContext {
            question: "Why do you want this job?".to_string(),
            model: "test-model".to_string(),
        })
    }

    async fn start_avatar(&self) -> Result<AvatarSession> {
        self.record(ApiCall::StartAvatar);
        if self.fail_start_avatar.load(Ordering::SeqCst) {
            bail!("no avatar capacity");
        }
        Ok(AvatarSession {
            session_id: "avatar-1".to_string(),
            descriptor: StreamDescriptor {
                stream_url: "stream://avatar-1".to_string(),
                token: "tok".to_string(),
            },
        })
    }

    async fn stop_avatar(&self, session_id: &str) -> Result<()> {
        self.record(ApiCall::StopAvatar(session_id.to_string()));
        if self.fail_stop_avatar.load(Ordering::SeqCst) {
            bail!("already reaped");
        }
        Ok(())
    }

    async fn send_turn(
        &self,
        session_id: &str,
        turn: TurnPayload,
        record_id: Option<&str>,
    ) -> Result<TurnAck> {
        let (text, audio_bytes) = match &turn {
            TurnPayload::Text(t) => (Some(t.clone()), 0),
            TurnPayload::Audio { data, .. } => (None, data.len()),
        };
        self.record(ApiCall::SendTurn {
            session_id: session_id.to_string(),
            text,
            audio_bytes,
            record_id: record_id.map(|s| s.to_string()),
        });

        let delay = self.turn_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        Ok(TurnAck {
            ok: true,
            message: "received".to_string(),
        })
    }

    async fn create_record(&self, kind: &str) -> Result<InterviewRecord> {
        self.record(ApiCall::CreateRecord(kind.to_string()));
        if self.fail_create_record.load(Ordering::SeqCst) {
            bail!("record service down");
        }
        Ok(InterviewRecord {
            record_id: "record-1".to_string(),
            position: 1,
        })
    }

    async fn finalize_record(
        &self,
        record_id: &str,
        elapsed_secs: u64,
        session_id: Option<&str>,
    ) -> Result<()> {
        self.record(ApiCall::FinalizeRecord {
            record_id: record_id.to_string(),
            elapsed_secs,
            session_id: session_id.map(|s| s.to_string()),
        });
        if self.fail_finalize.load(Ordering::SeqCst) {
            bail!("finalize failed");
        }
        Ok(())
    }

    async fn upload_artifact(&self, record_id: &str, artifact: RecordedArtifact) -> Result<()> {
        self.record(ApiCall::UploadArtifact {
            record_id: record_id.to_string(),
            bytes: artifact.len(),
        });
        if self.fail_upload.load(Ordering::SeqCst) {
            bail!("upload rejected");
        }
        Ok(())
    }
}

// ============================================================================
// Scripted stream players
// ============================================================================

/// What one attached player does: events emitted by `play()` and the
/// successive `position_secs()` samples (last value repeats).
#[derive(Debug, Clone, Default)]
pub struct PlayerScript {
    pub on_play: Vec<PlayerEvent>,
    pub positions: Vec<f64>,
}

impl PlayerScript {
    pub fn first_frame() -> Self {
        Self {
            on_play: vec![PlayerEvent::FirstFrame],
            positions: vec![],
        }
    }

    pub fn error() -> Self {
        Self {
            on_play: vec![PlayerEvent::Error("transport error".to_string())],
            positions: vec![],
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }
}

/// Hands out scripted players in order; once the queue is empty, the default
/// script repeats.
pub struct ScriptedFactory {
    scripts: Mutex<VecDeque<PlayerScript>>,
    default: PlayerScript,
    pub attaches: AtomicUsize,
    pub muted_plays: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new(scripts: Vec<PlayerScript>, default: PlayerScript) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            default,
            attaches: AtomicUsize::new(0),
            muted_plays: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn repeating(script: PlayerScript) -> Arc<Self> {
        Self::new(vec![], script)
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }
}

impl PlayerFactory for ScriptedFactory {
    fn attach(
        &self,
        _descriptor: &StreamDescriptor,
    ) -> (Box<dyn StreamPlayer>, mpsc::UnboundedReceiver<PlayerEvent>) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());

        let (events, rx) = mpsc::unbounded_channel();
        (
            Box::new(ScriptedPlayer {
                script,
                position_calls: AtomicUsize::new(0),
                muted: false,
                muted_plays: Arc::clone(&self.muted_plays),
                events,
            }),
            rx,
        )
    }
}

pub struct ScriptedPlayer {
    script: PlayerScript,
    position_calls: AtomicUsize,
    muted: bool,
    muted_plays: Arc<AtomicUsize>,
    events: mpsc::UnboundedSender<PlayerEvent>,
}

#[async_trait::async_trait]
impl StreamPlayer for ScriptedPlayer {
    async fn play(&mut self) -> Result<()> {
        if self.muted {
            self.muted_plays.fetch_add(1, Ordering::SeqCst);
        }
        for event in &self.script.on_play {
            let _ = self.events.send(event.clone());
        }
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn position_secs(&self) -> f64 {
        let i = self.position_calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .positions
            .get(i)
            .or(self.script.positions.last())
            .copied()
            .unwrap_or(0.0)
    }

    async fn shutdown(&mut self) {}
}

// ============================================================================
// Capture backends
// ============================================================================

/// Backend whose acquisition always fails with the given kind
pub struct FailingCapture(pub DeviceError);

#[async_trait::async_trait]
impl CaptureBackend for FailingCapture {
    async fn open(&self) -> Result<DeviceHandle, DeviceError> {
        Err(self.0.clone())
    }

    fn name(&self) -> &str {
        "failing"
    }
}
