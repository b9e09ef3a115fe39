//! Camera frames and the frame source abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;

use crate::error::VisionResult;

/// A decoded video frame.
///
/// Cloning is cheap; the pixel buffer is shared. A frame is only meaningful
/// while the capture device that produced it is active, and each tick
/// fetches a fresh one.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    sequence: u64,
}

impl Frame {
    /// Wrap a decoded image.
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image: Arc::new(image),
            sequence,
        }
    }

    /// A black frame of the given size.
    pub fn blank(width: u32, height: u32, sequence: u64) -> Self {
        Self::new(RgbImage::new(width, height), sequence)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True while the device has not produced real pixels yet.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Position of this frame in the capture stream.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Live video source owning the capture device.
///
/// The source holds the device handle exclusively. `release` must be safe
/// to call any number of times, including when `acquire` never succeeded.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Open the capture device.
    ///
    /// This is the one operation that waits on the outside world (permission
    /// prompt, hardware init). Errors are `CameraPermissionDenied` or
    /// `CameraUnavailable`.
    async fn acquire(&mut self) -> VisionResult<()>;

    /// The most recent decoded frame, if the device is producing any.
    fn current_frame(&self) -> Option<Frame>;

    /// Stop capture and release the device.
    fn release(&mut self);

    /// Whether the device is currently held.
    fn is_active(&self) -> bool;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}
