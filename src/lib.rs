pub mod avatar;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod remote;
pub mod session;

pub use avatar::{
    AttemptOutcome, AvatarStreamController, ConnectionHealth, PlayerEvent, PlayerFactory,
    StreamOutcome, StreamPlayer,
};
pub use config::Config;
pub use error::{DeviceError, TurnError};
pub use http::{create_router, AppState};
pub use media::{
    CaptureBackend, DeviceHandle, LocalRecorder, MediaCaptureGuard, MediaChunk, RecordedArtifact,
};
pub use remote::{
    AvatarSession, HttpInterviewApi, InterviewApi, InterviewContext, InterviewRecord,
    StreamDescriptor, TurnAck, TurnPayload,
};
pub use session::{InterviewSession, Notice, Phase, SessionHandle, SessionSnapshot};
