//! HTTP control surface
//!
//! Exposes the interview session orchestrator to the surrounding screen:
//! start/submit/abort, turn exchange, status snapshots, activity pings, and
//! the unload beacon.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
