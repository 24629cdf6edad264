//! Avatar stream supervision
//!
//! The controller owns one connection attempt at a time: it attaches a
//! real-time player to a stream descriptor, watches playback events and a
//! position probe for readiness, retries transient errors under a ceiling,
//! and enforces a single global deadline so the caller always gets exactly
//! one Ready or Failed per attempt.

pub mod controller;
pub mod player;

pub use controller::{AttemptOutcome, AvatarStreamController, ConnectionHealth, StreamOutcome};
pub use player::{PlayerEvent, PlayerFactory, StreamPlayer};
