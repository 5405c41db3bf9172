//! Image decoding
//!
//! This module turns a file in the disk tier into a [`DecodedImage`]:
//! - `still.rs` - single-frame raster decode
//! - `animated.rs` - multi-frame assembly (GIF, APNG, animated WebP)
//!
//! Which path is taken depends on the [`ResourceKind`] declared by the
//! descriptor, never on the file content. The concrete codec inside each
//! path is still guessed from the bytes.

mod animated;
mod still;

use std::path::Path;
use std::time::Duration;

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

use crate::error::LoadError;
use crate::resource::ResourceKind;

pub use animated::assemble_frames;

/// Errors produced while decoding a cached file.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("no usable frames")]
    NoFrames,

    #[error("unsupported animation container: {0}")]
    Unsupported(String),
}

impl From<DecodeError> for LoadError {
    fn from(err: DecodeError) -> Self {
        LoadError::Decode(err.to_string())
    }
}

/// One frame of an animation and how long it stays on screen.
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    pub buffer: RgbaImage,
    pub delay: Duration,
}

/// A playable multi-frame image.
#[derive(Debug, Clone)]
pub struct AnimatedImage {
    frames: Vec<AnimationFrame>,
    duration: Duration,
}

impl AnimatedImage {
    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    /// Sum of all frame delays.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// In-memory representation handed to callers.
#[derive(Debug, Clone)]
pub enum DecodedImage {
    Still(DynamicImage),
    Animated(AnimatedImage),
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        match self {
            DecodedImage::Still(img) => img.width(),
            DecodedImage::Animated(anim) => anim.frames[0].buffer.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            DecodedImage::Still(img) => img.height(),
            DecodedImage::Animated(anim) => anim.frames[0].buffer.height(),
        }
    }

    pub fn frame_count(&self) -> usize {
        match self {
            DecodedImage::Still(_) => 1,
            DecodedImage::Animated(anim) => anim.frames.len(),
        }
    }

    /// Total playback time; zero for still images.
    pub fn duration(&self) -> Duration {
        match self {
            DecodedImage::Still(_) => Duration::ZERO,
            DecodedImage::Animated(anim) => anim.duration,
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, DecodedImage::Animated(_))
    }
}

/// Decode the file at `path` as a resource of the given kind.
///
/// Blocking: call from a blocking-capable thread.
pub fn decode(path: &Path, kind: ResourceKind) -> Result<DecodedImage, DecodeError> {
    let bytes = std::fs::read(path)?;
    match kind {
        ResourceKind::Still => still::decode_still(&bytes).map(DecodedImage::Still),
        ResourceKind::Animated => animated::decode_animated(&bytes).map(DecodedImage::Animated),
    }
}
