pub mod backend;
pub mod guard;
pub mod recorder;

pub use backend::{
    CaptureBackend, CaptureFactory, CaptureSource, DeviceHandle, MediaChunk, SyntheticBackend,
};
pub use guard::MediaCaptureGuard;
pub use recorder::{LocalRecorder, RecordedArtifact};
