//! Frame source that fabricates blank frames instead of opening a device.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{VisionError, VisionResult};
use crate::frame::{Frame, FrameSource};

/// Failure to inject on `acquire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFailure {
    PermissionDenied,
    Unavailable,
}

/// Synthetic camera.
///
/// After `acquire` it yields `warmup` zero-size frames (a device that has not
/// started streaming yet), then blank frames of the configured size.
#[derive(Debug)]
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    warmup: u64,
    failure: Option<CameraFailure>,
    active: bool,
    polls: AtomicU64,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            warmup: 0,
            failure: None,
            active: false,
            polls: AtomicU64::new(0),
        }
    }

    /// Number of zero-size frames produced before real ones.
    pub fn with_warmup(mut self, frames: u64) -> Self {
        self.warmup = frames;
        self
    }

    /// Make every `acquire` fail.
    pub fn failing(mut self, failure: CameraFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Frames requested since the last `acquire`.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn acquire(&mut self) -> VisionResult<()> {
        match self.failure {
            Some(CameraFailure::PermissionDenied) => Err(VisionError::CameraPermissionDenied),
            Some(CameraFailure::Unavailable) => {
                Err(VisionError::camera_unavailable("synthetic device unplugged"))
            }
            None => {
                self.polls.store(0, Ordering::Relaxed);
                self.active = true;
                debug!(width = self.width, height = self.height, "Synthetic camera started");
                Ok(())
            }
        }
    }

    fn current_frame(&self) -> Option<Frame> {
        if !self.active {
            return None;
        }
        let sequence = self.polls.fetch_add(1, Ordering::Relaxed);
        if sequence < self.warmup {
            Some(Frame::blank(0, 0, sequence))
        } else {
            Some(Frame::blank(self.width, self.height, sequence))
        }
    }

    fn release(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_frames_before_acquire() {
        let source = SyntheticFrameSource::new(8, 8);
        assert!(source.current_frame().is_none());
        assert!(!source.is_active());
    }

    #[tokio::test]
    async fn test_warmup_frames_are_empty() {
        let mut source = SyntheticFrameSource::new(8, 6).with_warmup(2);
        source.acquire().await.unwrap();

        assert!(source.current_frame().unwrap().is_empty());
        assert!(source.current_frame().unwrap().is_empty());
        let frame = source.current_frame().unwrap();
        assert_eq!(frame.dimensions(), (8, 6));
        assert_eq!(frame.sequence(), 2);
        assert_eq!(source.polls(), 3);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut denied = SyntheticFrameSource::new(8, 8).failing(CameraFailure::PermissionDenied);
        assert!(matches!(
            denied.acquire().await,
            Err(VisionError::CameraPermissionDenied)
        ));
        assert!(!denied.is_active());

        let mut gone = SyntheticFrameSource::new(8, 8).failing(CameraFailure::Unavailable);
        assert!(gone.acquire().await.unwrap_err().is_camera_error());
    }

    #[tokio::test]
    async fn test_release_is_repeatable() {
        let mut source = SyntheticFrameSource::new(8, 8);
        source.release();
        source.acquire().await.unwrap();
        source.release();
        source.release();
        assert!(!source.is_active());
        assert!(source.current_frame().is_none());
    }
}
