// Avatar stream controller: retry ceiling, global deadline, readiness race,
// generation tagging. All timers run under paused virtual time.

mod common;

use common::{PlayerScript, ScriptedFactory};
use parley_interview::avatar::{
    AttemptOutcome, AvatarStreamController, ConnectionHealth, PlayerEvent, PlayerFactory, StreamOutcome,
};
use parley_interview::config::StreamSettings;
use parley_interview::remote::StreamDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn descriptor() -> StreamDescriptor {
    StreamDescriptor {
        stream_url: "stream://u1".to_string(),
        token: "tok".to_string(),
    }
}

fn settings(retry_limit: u32, retry_delay_ms: u64, deadline_ms: u64) -> StreamSettings {
    StreamSettings {
        retry_limit,
        retry_delay_ms,
        deadline_ms,
        probe_interval_ms: 500,
    }
}

async fn wait_outcome(rx: &mut watch::Receiver<Option<AttemptOutcome>>) -> AttemptOutcome {
    loop {
        if let Some(outcome) = *rx.borrow_and_update() {
            return outcome;
        }
        rx.changed()
            .await
            .expect("attempt ended without a terminal outcome");
    }
}

#[tokio::test(start_paused = true)]
async fn first_frame_signal_declares_ready() {
    let factory = ScriptedFactory::repeating(PlayerScript::first_frame());
    let mut controller =
        AvatarStreamController::new(factory.clone() as Arc<dyn PlayerFactory>, StreamSettings::default());

    let mut rx = controller.connect(descriptor());
    let outcome = wait_outcome(&mut rx).await;

    assert_eq!(outcome.outcome, StreamOutcome::Ready);
    assert_eq!(outcome.generation, 1);
    assert_eq!(controller.health(), ConnectionHealth::Ready);
    assert_eq!(factory.attach_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_ceiling_exhaustion_is_terminal_failed() {
    // Deadline far beyond the retry window so only the ceiling can end this.
    let factory = ScriptedFactory::repeating(PlayerScript::error());
    let mut controller =
        AvatarStreamController::new(factory.clone() as Arc<dyn PlayerFactory>, settings(16, 500, 20_000));

    let start = tokio::time::Instant::now();
    let mut rx = controller.connect(descriptor());
    let outcome = wait_outcome(&mut rx).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.outcome, StreamOutcome::Failed);
    assert_eq!(factory.attach_count(), 16, "16 attempts, then give up");
    // 15 retry delays of 500ms, well under the 20s deadline
    assert!(
        elapsed >= Duration::from_millis(7_500) && elapsed < Duration::from_millis(20_000),
        "failed at {:?}, expected ~7.5s of retrying",
        elapsed
    );
    assert_eq!(controller.health(), ConnectionHealth::Failed);
}

#[tokio::test(start_paused = true)]
async fn global_deadline_overrides_retry_counter() {
    // Slow retries: the 3.5s deadline fires while the counter is still far
    // under the ceiling.
    let factory = ScriptedFactory::repeating(PlayerScript::error());
    let mut controller =
        AvatarStreamController::new(factory.clone() as Arc<dyn PlayerFactory>, settings(16, 1_000, 3_500));

    let start = tokio::time::Instant::now();
    let mut rx = controller.connect(descriptor());
    let outcome = wait_outcome(&mut rx).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.outcome, StreamOutcome::Failed);
    assert!(
        factory.attach_count() < 16,
        "deadline must fire before the ceiling ({} attempts)",
        factory.attach_count()
    );
    assert!(
        elapsed >= Duration::from_millis(3_500) && elapsed < Duration::from_millis(4_000),
        "failed at {:?}, expected the 3.5s deadline",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn playing_event_alone_is_not_readiness() {
    // First probe sees no position advance; the second one does. Ready must
    // come from the successful probe, not the playing event.
    let factory = ScriptedFactory::repeating(PlayerScript {
        on_play: vec![PlayerEvent::Playing],
        positions: vec![0.0, 0.0, 0.6],
    });
    let mut controller =
        AvatarStreamController::new(factory.clone() as Arc<dyn PlayerFactory>, StreamSettings::default());

    let start = tokio::time::Instant::now();
    let mut rx = controller.connect(descriptor());
    let outcome = wait_outcome(&mut rx).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.outcome, StreamOutcome::Ready);
    assert!(
        elapsed >= Duration::from_millis(1_000),
        "ready at {:?}, before the second probe",
        elapsed
    );
    assert_eq!(factory.attach_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_playback_fails_by_deadline() {
    // Playing fires but the position never moves: the probe must never
    // declare Ready and the deadline ends the attempt.
    let factory = ScriptedFactory::repeating(PlayerScript {
        on_play: vec![PlayerEvent::Playing],
        positions: vec![0.0],
    });
    let mut controller =
        AvatarStreamController::new(factory.clone() as Arc<dyn PlayerFactory>, StreamSettings::default());

    let start = tokio::time::Instant::now();
    let mut rx = controller.connect(descriptor());
    let outcome = wait_outcome(&mut rx).await;

    assert_eq!(outcome.outcome, StreamOutcome::Failed);
    assert_eq!(start.elapsed(), Duration::from_millis(8_000));
}

#[tokio::test(start_paused = true)]
async fn exactly_one_terminal_outcome_per_attempt() {
    let factory = ScriptedFactory::repeating(PlayerScript::first_frame());
    let mut controller =
        AvatarStreamController::new(factory as Arc<dyn PlayerFactory>, StreamSettings::default());

    let mut rx = controller.connect(descriptor());
    let outcome = wait_outcome(&mut rx).await;
    assert_eq!(outcome.outcome, StreamOutcome::Ready);

    // No second terminal value may ever arrive for this generation; the
    // channel either stays quiet or closes with the outcome still in place.
    let second = tokio::time::timeout(Duration::from_secs(30), rx.changed()).await;
    assert!(
        !matches!(second, Ok(Ok(()))),
        "attempt produced a second outcome"
    );
    assert_eq!(rx.borrow().unwrap(), outcome);
}

#[tokio::test(start_paused = true)]
async fn superseding_descriptor_cancels_prior_attempt() {
    // Attempt 1 never resolves on its own; attempt 2 is immediately ready.
    let factory = ScriptedFactory::new(
        vec![PlayerScript::silent(), PlayerScript::first_frame()],
        PlayerScript::silent(),
    );
    let mut controller =
        AvatarStreamController::new(factory.clone() as Arc<dyn PlayerFactory>, StreamSettings::default());

    let mut rx1 = controller.connect(descriptor());
    tokio::task::yield_now().await;

    let mut rx2 = controller.connect(descriptor());
    assert_eq!(controller.generation(), 2);

    let outcome = wait_outcome(&mut rx2).await;
    assert_eq!(outcome.generation, 2);
    assert_eq!(outcome.outcome, StreamOutcome::Ready);

    // The superseded attempt was aborted: its channel closes without ever
    // carrying an outcome, so nothing can act on generation 1.
    assert!(rx1.changed().await.is_err());
    assert!(rx1.borrow().is_none());
}

#[tokio::test(start_paused = true)]
async fn autoplay_denial_retries_muted_and_surfaces_gesture() {
    let factory = ScriptedFactory::new(
        vec![
            PlayerScript {
                on_play: vec![PlayerEvent::NotAllowed],
                positions: vec![],
            },
            PlayerScript::first_frame(),
        ],
        PlayerScript::silent(),
    );
    let mut controller =
        AvatarStreamController::new(factory.clone() as Arc<dyn PlayerFactory>, StreamSettings::default());

    let mut rx = controller.connect(descriptor());
    let outcome = wait_outcome(&mut rx).await;

    assert_eq!(outcome.outcome, StreamOutcome::Ready);
    assert_eq!(factory.attach_count(), 2, "denial consumes a retry slot");
    assert_eq!(
        factory.muted_plays.load(std::sync::atomic::Ordering::SeqCst),
        1,
        "the replay after an autoplay denial must be muted"
    );
    assert!(controller.needs_gesture(), "resume affordance not surfaced");
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_attempt_without_outcome() {
    let factory = ScriptedFactory::repeating(PlayerScript::silent());
    let mut controller =
        AvatarStreamController::new(factory as Arc<dyn PlayerFactory>, StreamSettings::default());

    let mut rx = controller.connect(descriptor());
    tokio::task::yield_now().await;
    controller.teardown();

    assert!(rx.changed().await.is_err());
    assert!(rx.borrow().is_none());
}
