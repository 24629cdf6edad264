use super::snapshot::{Notice, SessionSnapshot};
use super::turns::TurnExchangeGateway;
use crate::avatar::{AttemptOutcome, AvatarStreamController, PlayerFactory, StreamOutcome};
use crate::config::{SessionSettings, StreamSettings};
use crate::error::TurnError;
use crate::media::{CaptureBackend, LocalRecorder, MediaCaptureGuard};
use crate::remote::{InterviewApi, InterviewContext, TurnAck};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Lifecycle phase of one interview attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Initializing,
    Live,
    Ending,
    Closed,
}

enum SessionCommand {
    Begin {
        reply: oneshot::Sender<()>,
    },
    SendText {
        text: String,
        reply: oneshot::Sender<Result<TurnAck, TurnError>>,
    },
    SendAudio {
        data: Vec<u8>,
        mime_type: String,
        reply: oneshot::Sender<Result<TurnAck, TurnError>>,
    },
    Activity,
    Submit {
        reply: oneshot::Sender<Option<String>>,
    },
    Abort {
        reply: oneshot::Sender<()>,
    },
    Unload,
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Cloneable handle to a running interview session actor.
///
/// Dropping every handle tears the session down; the actor then releases the
/// capture device and stops any remote avatar session on its way out.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Enter the interview: acquire the camera, fetch the question, start the
    /// avatar. Returns once the concurrent setup has been dispatched.
    pub async fn begin(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Begin { reply })
            .await
            .map_err(|_| anyhow!("session closed"))?;
        rx.await.map_err(|_| anyhow!("session closed"))
    }

    pub async fn send_text(&self, text: &str) -> Result<TurnAck, TurnError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::SendText {
                text: text.to_string(),
                reply,
            })
            .await
            .map_err(|_| TurnError::MissingSession)?;
        rx.await.map_err(|_| TurnError::MissingSession)?
    }

    pub async fn send_audio(&self, data: Vec<u8>, mime_type: &str) -> Result<TurnAck, TurnError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::SendAudio {
                data,
                mime_type: mime_type.to_string(),
                reply,
            })
            .await
            .map_err(|_| TurnError::MissingSession)?;
        rx.await.map_err(|_| TurnError::MissingSession)?
    }

    /// Record a user interaction (pointer, key, click, scroll); resets the
    /// inactivity clock. Non-blocking.
    pub fn activity(&self) {
        let _ = self.tx.try_send(SessionCommand::Activity);
    }

    /// Submit and end the interview. Returns the interview record id to
    /// navigate to, when one could be created.
    pub async fn submit(&self) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Submit { reply })
            .await
            .map_err(|_| anyhow!("session closed"))?;
        rx.await.map_err(|_| anyhow!("session closed"))
    }

    /// Exit without submitting. Nothing is persisted.
    pub async fn abort(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Abort { reply })
            .await
            .map_err(|_| anyhow!("session closed"))?;
        rx.await.map_err(|_| anyhow!("session closed"))
    }

    /// Page unload / visibility loss: fire-and-forget avatar stop. Never
    /// blocks the caller.
    pub fn unload(&self) {
        let _ = self.tx.try_send(SessionCommand::Unload);
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Snapshot { reply })
            .await
            .map_err(|_| anyhow!("session closed"))?;
        rx.await.map_err(|_| anyhow!("session closed"))
    }
}

/// One interview attempt: the top-level state machine sequencing capture,
/// recording, avatar streaming, turn exchange, and the end-of-interview
/// server calls, with release guaranteed on every exit path.
pub struct InterviewSession {
    kind: String,
    api: Arc<dyn InterviewApi>,
    guard: MediaCaptureGuard,
    recorder: LocalRecorder,
    stream: AvatarStreamController,
    gateway: TurnExchangeGateway,
    phase: Phase,
    avatar_session_id: Option<String>,
    record_id: Option<String>,
    context: Option<InterviewContext>,
    started_at: Option<Instant>,
    idle_timeout: Duration,
    awaiting_outcome: bool,
    outcome_rx: Option<watch::Receiver<Option<AttemptOutcome>>>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl InterviewSession {
    /// Spawn the session actor. Returns the command handle and the stream of
    /// transient user notices.
    pub fn spawn(
        kind: impl Into<String>,
        api: Arc<dyn InterviewApi>,
        capture: Arc<dyn CaptureBackend>,
        players: Arc<dyn PlayerFactory>,
        session_settings: SessionSettings,
        stream_settings: StreamSettings,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::channel(32);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let session = Self {
            kind: kind.into(),
            gateway: TurnExchangeGateway::new(Arc::clone(&api)),
            api,
            guard: MediaCaptureGuard::new(capture),
            recorder: LocalRecorder::new(),
            stream: AvatarStreamController::new(players, stream_settings),
            phase: Phase::Idle,
            avatar_session_id: None,
            record_id: None,
            context: None,
            started_at: None,
            idle_timeout: session_settings.idle_timeout(),
            awaiting_outcome: false,
            outcome_rx: None,
            notices: notice_tx,
        };

        tokio::spawn(session.run(rx));

        (SessionHandle { tx }, notice_rx)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>) {
        let idle = tokio::time::sleep(self.idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else {
                        // Screen unmounted: every handle is gone.
                        info!("Session handles dropped, tearing down");
                        break;
                    };

                    match cmd {
                        SessionCommand::Begin { reply } => {
                            self.handle_begin().await;
                            if self.outcome_rx.is_none() {
                                // No avatar attempt to wait for.
                                self.enter_live();
                            } else {
                                self.awaiting_outcome = true;
                            }
                            idle.as_mut().reset(Instant::now() + self.idle_timeout);
                            let _ = reply.send(());
                        }
                        SessionCommand::SendText { text, reply } => {
                            idle.as_mut().reset(Instant::now() + self.idle_timeout);
                            let gateway = self.gateway.clone();
                            let session_id = self.avatar_session_id.clone();
                            let record_id = self.record_id.clone();
                            tokio::spawn(async move {
                                let result = gateway
                                    .send_text(session_id.as_deref(), &text, record_id.as_deref())
                                    .await;
                                let _ = reply.send(result);
                            });
                        }
                        SessionCommand::SendAudio { data, mime_type, reply } => {
                            idle.as_mut().reset(Instant::now() + self.idle_timeout);
                            let gateway = self.gateway.clone();
                            let session_id = self.avatar_session_id.clone();
                            let record_id = self.record_id.clone();
                            tokio::spawn(async move {
                                let result = gateway
                                    .send_audio(
                                        session_id.as_deref(),
                                        data,
                                        &mime_type,
                                        record_id.as_deref(),
                                    )
                                    .await;
                                let _ = reply.send(result);
                            });
                        }
                        SessionCommand::Activity => {
                            idle.as_mut().reset(Instant::now() + self.idle_timeout);
                        }
                        SessionCommand::Submit { reply } => {
                            let record_id = self.handle_submit().await;
                            let _ = reply.send(record_id);
                            break;
                        }
                        SessionCommand::Abort { reply } => {
                            self.handle_abort().await;
                            let _ = reply.send(());
                            break;
                        }
                        SessionCommand::Unload => {
                            self.handle_unload();
                        }
                        SessionCommand::Snapshot { reply } => {
                            let _ = reply.send(self.snapshot());
                        }
                    }
                }
                outcome = Self::next_outcome(&mut self.outcome_rx), if self.awaiting_outcome => {
                    self.awaiting_outcome = false;

                    match outcome {
                        // An outcome from a superseded attempt is a no-op.
                        Some(o) if o.generation == self.stream.generation() => {
                            if o.outcome == StreamOutcome::Failed {
                                self.notice(
                                    "The interviewer avatar could not connect. Reload to try again",
                                );
                            }
                            // Ready and Failed both end the waiting state.
                            if self.phase == Phase::Initializing {
                                self.enter_live();
                                idle.as_mut().reset(Instant::now() + self.idle_timeout);
                            }
                        }
                        Some(o) => {
                            info!(
                                stale_generation = o.generation,
                                "Ignoring outcome from superseded stream attempt"
                            );
                        }
                        None => {}
                    }
                }
                _ = idle.as_mut(), if self.phase == Phase::Live && self.avatar_session_id.is_some() => {
                    warn!("No user interaction for {:?}, stopping avatar session", self.idle_timeout);
                    self.notice("The avatar session ended due to inactivity");
                    self.stop_avatar_once().await;
                }
            }
        }

        self.shutdown().await;
    }

    /// Resolve the current attempt's terminal outcome; pends forever when no
    /// attempt is being awaited (the select guard keeps this branch off).
    async fn next_outcome(
        rx: &mut Option<watch::Receiver<Option<AttemptOutcome>>>,
    ) -> Option<AttemptOutcome> {
        match rx {
            Some(rx) => loop {
                if let Some(outcome) = *rx.borrow_and_update() {
                    return Some(outcome);
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            },
            None => std::future::pending().await,
        }
    }

    async fn handle_begin(&mut self) {
        if self.phase != Phase::Idle {
            warn!(phase = ?self.phase, "Begin ignored, session already started");
            return;
        }
        self.phase = Phase::Initializing;
        info!(kind = self.kind, "Entering interview");

        // Camera, question context, and avatar start run concurrently; each
        // failure is handled on its own. A dead camera does not block the
        // avatar conversation and a dead avatar does not block camera
        // practice.
        let (device, context, avatar) = tokio::join!(
            self.guard.acquire(),
            self.api.interview_context(&self.kind),
            self.api.start_avatar(),
        );
        let device = device.map(|_| ());

        match device {
            Ok(()) => {
                if !self.recorder.start(self.guard.handle_mut()) {
                    warn!("Recording could not start");
                }
            }
            Err(e) => {
                error!("Capture acquisition failed: {}", e);
                self.notice(format!("{}. {}", e, e.remedy()));
            }
        }

        self.context = Some(match context {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Context fetch failed, using defaults: {}", e);
                self.notice("Could not load the interview question, using a default");
                InterviewContext::default()
            }
        });

        match avatar {
            Ok(session) => {
                info!(session_id = session.session_id, "Avatar session obtained");
                self.avatar_session_id = Some(session.session_id);
                let rx = self.stream.connect(session.descriptor);
                self.outcome_rx = Some(rx);
            }
            Err(e) => {
                error!("Avatar start failed: {}", e);
                self.notice(format!("The interviewer avatar is unavailable: {}", e));
            }
        }
    }

    fn enter_live(&mut self) {
        self.phase = Phase::Live;
        self.started_at = Some(Instant::now());
        info!("Interview is live");
    }

    async fn handle_submit(&mut self) -> Option<String> {
        if matches!(self.phase, Phase::Ending | Phase::Closed) {
            return self.record_id.clone();
        }
        self.phase = Phase::Ending;
        info!("Submitting interview");

        // Recording must be finalized before anything can be uploaded.
        self.recorder.stop().await;

        // The record is created lazily, only now: abandoned attempts are
        // never persisted.
        match self.api.create_record(&self.kind).await {
            Ok(record) => {
                self.record_id = Some(record.record_id);
            }
            Err(e) => {
                error!("Failed to create interview record: {}", e);
                self.notice(format!("Could not save the interview: {}", e));
            }
        }

        // Best-effort: the review must exist even when video capture failed.
        if let Err(e) = self
            .recorder
            .upload_to(&self.api, self.record_id.as_deref())
            .await
        {
            warn!("Artifact upload failed: {}", e);
            self.notice("Video upload failed; the interview was still saved");
        }

        if let Some(record_id) = self.record_id.clone() {
            let elapsed = self.elapsed_secs();
            if let Err(e) = self
                .api
                .finalize_record(&record_id, elapsed, self.avatar_session_id.as_deref())
                .await
            {
                // The turns already reached the server; still navigate away.
                error!("Failed to finalize interview record: {}", e);
                self.notice(format!("Finishing the interview failed: {}", e));
            }
        }

        self.guard.release();
        // Last network action: late avatar events during wind-down still had
        // a valid session to target.
        self.stop_avatar_once().await;
        self.close_local();

        self.record_id.clone()
    }

    async fn handle_abort(&mut self) {
        if matches!(self.phase, Phase::Ending | Phase::Closed) {
            return;
        }
        self.phase = Phase::Ending;
        info!("Aborting interview, nothing will be persisted");

        self.recorder.stop().await;
        self.recorder.discard();
        self.guard.release();
        self.stop_avatar_once().await;
        self.close_local();
    }

    fn handle_unload(&mut self) {
        // Safety net on page unload; the id is taken so no later path can
        // issue a second stop for it.
        let Some(session_id) = self.avatar_session_id.take() else {
            return;
        };

        info!(session_id, "Unload signal, detached avatar stop");
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.stop_avatar(&session_id).await {
                warn!(session_id, "Detached avatar stop failed: {}", e);
            }
        });
    }

    /// Stop the remote avatar session at most once. A no-op when none exists;
    /// on failure the local id is still cleared so nothing retries against a
    /// session the server may have already reaped.
    async fn stop_avatar_once(&mut self) {
        let Some(session_id) = self.avatar_session_id.take() else {
            return;
        };

        if let Err(e) = self.api.stop_avatar(&session_id).await {
            warn!(session_id, "Failed to stop avatar session: {}", e);
        }
    }

    fn close_local(&mut self) {
        self.phase = Phase::Closed;
        self.stream.teardown();
        self.outcome_rx = None;
        self.awaiting_outcome = false;
        info!("Session closed");
    }

    /// Release everything on the way out, whichever path ended the loop.
    async fn shutdown(&mut self) {
        if self.phase != Phase::Closed {
            self.recorder.stop().await;
            self.recorder.discard();
            self.guard.release();
            self.stop_avatar_once().await;
            self.close_local();
        }
    }

    fn elapsed_secs(&self) -> u64 {
        self.started_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            health: self.stream.health(),
            elapsed_secs: self.elapsed_secs(),
            recording: self.recorder.is_recording(),
            needs_gesture: self.stream.needs_gesture(),
            record_id: self.record_id.clone(),
            question: self.context.as_ref().map(|c| c.question.clone()),
        }
    }

    fn notice(&self, message: impl Into<String>) {
        let _ = self.notices.send(Notice::new(message));
    }
}
