use crate::remote::StreamDescriptor;
use anyhow::Result;
use tokio::sync::mpsc;

/// Asynchronous events emitted by a real-time player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Media frames have started arriving (may be spurious; readiness is
    /// confirmed by `FirstFrame` or the position probe)
    Playing,
    /// The browser-level "first frame rendered" signal
    FirstFrame,
    /// Autoplay was blocked; playback must be retried muted and a manual
    /// resume affordance surfaced
    NotAllowed,
    /// Transport or decoding failure
    Error(String),
}

/// A real-time playback of the remote avatar stream.
///
/// The production implementation wraps the embedding platform's player; the
/// controller only ever drives this trait.
#[async_trait::async_trait]
pub trait StreamPlayer: Send + Sync {
    /// Issue the play request.
    async fn play(&mut self) -> Result<()>;

    /// Mute or unmute playback (used after an autoplay denial).
    fn set_muted(&mut self, muted: bool);

    /// Current playback position in seconds.
    fn position_secs(&self) -> f64;

    /// Tear the player down. Must stop all playback activity.
    async fn shutdown(&mut self);
}

/// Creates a player attached to a stream descriptor.
///
/// Each retry attaches a fresh player to the same descriptor.
pub trait PlayerFactory: Send + Sync {
    fn attach(
        &self,
        descriptor: &StreamDescriptor,
    ) -> (Box<dyn StreamPlayer>, mpsc::UnboundedReceiver<PlayerEvent>);
}

/// Player that plays immediately with a clock-driven position (dry runs,
/// tests without a real media stack)
pub struct SimulatedPlayerFactory;

impl PlayerFactory for SimulatedPlayerFactory {
    fn attach(
        &self,
        _descriptor: &StreamDescriptor,
    ) -> (Box<dyn StreamPlayer>, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Box::new(SimulatedPlayer {
                events,
                started: None,
            }),
            rx,
        )
    }
}

struct SimulatedPlayer {
    events: mpsc::UnboundedSender<PlayerEvent>,
    started: Option<tokio::time::Instant>,
}

#[async_trait::async_trait]
impl StreamPlayer for SimulatedPlayer {
    async fn play(&mut self) -> Result<()> {
        self.started = Some(tokio::time::Instant::now());
        let _ = self.events.send(PlayerEvent::Playing);
        Ok(())
    }

    fn set_muted(&mut self, _muted: bool) {}

    fn position_secs(&self) -> f64 {
        self.started
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    async fn shutdown(&mut self) {
        self.started = None;
    }
}
