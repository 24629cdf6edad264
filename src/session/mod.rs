//! Interview session lifecycle
//!
//! One actor per interview attempt sequences "start avatar → start recording
//! → converse → stop recording → upload artifact → finalize record → release
//! avatar session" and guarantees release on every exit path: submit, abort,
//! unload, inactivity, or handle drop.

pub mod lifecycle;
pub mod snapshot;
pub mod turns;

pub use lifecycle::{InterviewSession, Phase, SessionHandle};
pub use snapshot::{Notice, SessionSnapshot};
pub use turns::TurnExchangeGateway;
