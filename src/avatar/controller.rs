use super::player::{PlayerEvent, PlayerFactory, StreamPlayer};
use crate::config::StreamSettings;
use crate::remote::StreamDescriptor;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tracing::{info, warn};

/// Minimum playback-position advance that proves frames are being decoded
const PROBE_EPSILON_SECS: f64 = 0.1;

/// Connection health of the current stream attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionHealth {
    Connecting,
    Ready,
    Failed,
}

/// Terminal result of one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Ready,
    Failed,
}

/// Terminal outcome tagged with the attempt generation that produced it.
///
/// Consumers compare the generation against the controller's current one, so
/// a leftover outcome from a superseded attempt is a provable no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub generation: u64,
    pub outcome: StreamOutcome,
}

/// Supervises the real-time playback of a remote avatar stream.
///
/// Per descriptor, exactly one terminal outcome (Ready or Failed) is
/// produced, bounded by a retry ceiling and a single global deadline armed
/// when the descriptor arrives. Superseding the descriptor or tearing the
/// controller down aborts the supervision task, so no timer from a stale
/// attempt can fire.
pub struct AvatarStreamController {
    factory: Arc<dyn PlayerFactory>,
    settings: StreamSettings,
    generation: u64,
    task: Option<JoinHandle<()>>,
    health_tx: watch::Sender<ConnectionHealth>,
    health_rx: watch::Receiver<ConnectionHealth>,
    gesture_tx: watch::Sender<bool>,
    gesture_rx: watch::Receiver<bool>,
    outcome_rx: Option<watch::Receiver<Option<AttemptOutcome>>>,
}

impl AvatarStreamController {
    pub fn new(factory: Arc<dyn PlayerFactory>, settings: StreamSettings) -> Self {
        let (health_tx, health_rx) = watch::channel(ConnectionHealth::Connecting);
        let (gesture_tx, gesture_rx) = watch::channel(false);

        Self {
            factory,
            settings,
            generation: 0,
            task: None,
            health_tx,
            health_rx,
            gesture_tx,
            gesture_rx,
            outcome_rx: None,
        }
    }

    /// Generation of the current attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current connection health.
    pub fn health(&self) -> ConnectionHealth {
        *self.health_rx.borrow()
    }

    pub fn health_watch(&self) -> watch::Receiver<ConnectionHealth> {
        self.health_rx.clone()
    }

    /// True when autoplay was denied and a manual resume gesture is needed.
    pub fn needs_gesture(&self) -> bool {
        *self.gesture_rx.borrow()
    }

    /// Start supervising playback of the given descriptor.
    ///
    /// Any prior attempt is superseded: its task is aborted (cancelling the
    /// retry, probe, and deadline timers with it) and the generation bumped.
    /// Returns a watch that yields the attempt's single terminal outcome.
    pub fn connect(
        &mut self,
        descriptor: StreamDescriptor,
    ) -> watch::Receiver<Option<AttemptOutcome>> {
        self.cancel_task();
        self.generation += 1;

        let _ = self.health_tx.send(ConnectionHealth::Connecting);
        let _ = self.gesture_tx.send(false);

        let (outcome_tx, outcome_rx) = watch::channel(None);
        self.outcome_rx = Some(outcome_rx.clone());

        let generation = self.generation;
        let factory = Arc::clone(&self.factory);
        let settings = self.settings.clone();
        let health_tx = self.health_tx.clone();
        let gesture_tx = self.gesture_tx.clone();

        info!(generation, "Connecting to avatar stream");

        self.task = Some(tokio::spawn(supervise(
            generation, descriptor, factory, settings, health_tx, gesture_tx, outcome_tx,
        )));

        outcome_rx
    }

    /// Outcome watch of the current attempt, if one was started.
    pub fn outcome_watch(&self) -> Option<watch::Receiver<Option<AttemptOutcome>>> {
        self.outcome_rx.clone()
    }

    /// Cancel the current attempt and all of its timers.
    pub fn teardown(&mut self) {
        self.cancel_task();
        self.outcome_rx = None;
        let _ = self.gesture_tx.send(false);
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AvatarStreamController {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

enum AttemptVerdict {
    Ready,
    Retry,
    RetryMuted,
    DeadlineExceeded,
}

async fn supervise(
    generation: u64,
    descriptor: StreamDescriptor,
    factory: Arc<dyn PlayerFactory>,
    settings: StreamSettings,
    health_tx: watch::Sender<ConnectionHealth>,
    gesture_tx: watch::Sender<bool>,
    outcome_tx: watch::Sender<Option<AttemptOutcome>>,
) {
    // One deadline for the whole attempt, armed when the descriptor arrives.
    // Retries never reset it.
    let deadline = tokio::time::sleep(settings.deadline());
    tokio::pin!(deadline);

    let mut retries: u32 = 0;
    let mut muted = false;

    let terminal = |outcome: StreamOutcome| {
        let health = match outcome {
            StreamOutcome::Ready => ConnectionHealth::Ready,
            StreamOutcome::Failed => ConnectionHealth::Failed,
        };
        let _ = health_tx.send(health);
        let _ = outcome_tx.send(Some(AttemptOutcome {
            generation,
            outcome,
        }));
        info!(generation, ?outcome, "Stream attempt finished");
    };

    loop {
        let (mut player, mut events) = factory.attach(&descriptor);
        if muted {
            player.set_muted(true);
        }

        let verdict = if let Err(e) = player.play().await {
            warn!(generation, "Play request failed: {}", e);
            AttemptVerdict::Retry
        } else {
            run_attempt(player.as_mut(), &mut events, &mut deadline, &settings, generation).await
        };

        player.shutdown().await;

        match verdict {
            AttemptVerdict::Ready => {
                terminal(StreamOutcome::Ready);
                return;
            }
            AttemptVerdict::DeadlineExceeded => {
                warn!(generation, "Stream connection deadline exceeded");
                terminal(StreamOutcome::Failed);
                return;
            }
            AttemptVerdict::Retry | AttemptVerdict::RetryMuted => {
                if matches!(verdict, AttemptVerdict::RetryMuted) {
                    muted = true;
                    let _ = gesture_tx.send(true);
                }

                retries += 1;
                if retries >= settings.retry_limit {
                    warn!(
                        generation,
                        retries, "Stream retry ceiling exhausted"
                    );
                    terminal(StreamOutcome::Failed);
                    return;
                }

                tokio::select! {
                    _ = deadline.as_mut() => {
                        warn!(generation, "Stream connection deadline exceeded");
                        terminal(StreamOutcome::Failed);
                        return;
                    }
                    _ = tokio::time::sleep(settings.retry_delay()) => {}
                }
            }
        }
    }
}

async fn run_attempt(
    player: &mut dyn StreamPlayer,
    events: &mut mpsc::UnboundedReceiver<PlayerEvent>,
    deadline: &mut Pin<&mut Sleep>,
    settings: &StreamSettings,
    generation: u64,
) -> AttemptVerdict {
    // Readiness race: the first-frame signal and the position probe both
    // count; whichever lands first wins.
    let probe = tokio::time::sleep(settings.probe_interval());
    tokio::pin!(probe);
    let mut probing = false;
    let mut last_position = 0.0_f64;

    loop {
        tokio::select! {
            _ = deadline.as_mut() => {
                return AttemptVerdict::DeadlineExceeded;
            }
            _ = probe.as_mut(), if probing => {
                let position = player.position_secs();
                if position - last_position > PROBE_EPSILON_SECS {
                    info!(generation, position, "Playback position advanced, stream is live");
                    return AttemptVerdict::Ready;
                }
                last_position = position;
                probe.as_mut().reset(Instant::now() + settings.probe_interval());
            }
            event = events.recv() => {
                match event {
                    Some(PlayerEvent::FirstFrame) => {
                        info!(generation, "First frame rendered");
                        return AttemptVerdict::Ready;
                    }
                    Some(PlayerEvent::Playing) => {
                        // A playing event alone is not proof of decoded
                        // frames; start sampling the position.
                        last_position = player.position_secs();
                        probing = true;
                        probe.as_mut().reset(Instant::now() + settings.probe_interval());
                    }
                    Some(PlayerEvent::NotAllowed) => {
                        warn!(generation, "Autoplay blocked, retrying muted");
                        return AttemptVerdict::RetryMuted;
                    }
                    Some(PlayerEvent::Error(reason)) => {
                        warn!(generation, "Stream error: {}", reason);
                        return AttemptVerdict::Retry;
                    }
                    None => {
                        warn!(generation, "Player event channel closed");
                        return AttemptVerdict::Retry;
                    }
                }
            }
        }
    }
}
