use super::backend::{CaptureBackend, DeviceHandle};
use crate::error::DeviceError;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the single live camera+microphone handle for an interview screen.
///
/// Acquire and release only happen through the guard, so the hardware can
/// never be left recording past the screen's lifetime: the lifecycle manager
/// calls `release` on every exit path, and dropping the guard stops the
/// tracks as a backstop.
pub struct MediaCaptureGuard {
    backend: Arc<dyn CaptureBackend>,
    handle: Option<DeviceHandle>,
}

impl MediaCaptureGuard {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            handle: None,
        }
    }

    /// Open the camera+microphone capture.
    ///
    /// Returns the live handle if one is already open; at most one handle
    /// exists per guard.
    pub async fn acquire(&mut self) -> Result<&mut DeviceHandle, DeviceError> {
        if self.handle.is_some() {
            warn!("Capture already acquired, reusing live handle");
            return Ok(self.handle.as_mut().unwrap());
        }

        let handle = self.backend.open().await?;
        info!(
            backend = self.backend.name(),
            device_id = handle.device_id(),
            "Acquired capture device"
        );

        self.handle = Some(handle);
        Ok(self.handle.as_mut().unwrap())
    }

    /// Currently held handle, if any.
    pub fn handle_mut(&mut self) -> Option<&mut DeviceHandle> {
        self.handle.as_mut()
    }

    pub fn is_acquired(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop all tracks and drop the handle. Safe to call any number of times.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!(device_id = handle.device_id(), "Releasing capture device");
            handle.stop();
        }
    }
}

impl Drop for MediaCaptureGuard {
    fn drop(&mut self) {
        self.release();
    }
}
