//! Multi-frame decoding
//!
//! Every frame is read together with its own display delay. Frames that fail
//! to decode, or that carry no delay, are skipped; the decode only fails when
//! nothing usable is left. A zero delay counts as missing timing, so an
//! animation whose frames all have zero delay is rejected with
//! [`DecodeError::NoFrames`] rather than played at a guessed rate.

use std::io::Cursor;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, Frame, ImageFormat, ImageResult};
use log::{debug, warn};

use super::{AnimatedImage, AnimationFrame, DecodeError};

/// Stop scanning after this many frame errors in a row. Some decoders keep
/// yielding the same error once the stream is broken.
const MAX_CONSECUTIVE_FRAME_ERRORS: usize = 8;

pub(super) fn decode_animated(bytes: &[u8]) -> Result<AnimatedImage, DecodeError> {
    let format = image::guess_format(bytes)?;
    let cursor = Cursor::new(bytes);

    match format {
        ImageFormat::Gif => assemble_frames(GifDecoder::new(cursor)?.into_frames()),
        ImageFormat::Png => {
            let decoder = PngDecoder::new(cursor)?;
            if !decoder.is_apng()? {
                debug!("PNG has no animation control chunk");
                return Err(DecodeError::NoFrames);
            }
            assemble_frames(decoder.apng()?.into_frames())
        }
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(cursor)?;
            if !decoder.has_animation() {
                debug!("WebP has no animation chunk");
                return Err(DecodeError::NoFrames);
            }
            assemble_frames(decoder.into_frames())
        }
        other => Err(DecodeError::Unsupported(format!("{other:?}"))),
    }
}

/// Build an [`AnimatedImage`] from decoded frames.
///
/// The total duration is the sum of the delays of the frames that were kept.
pub fn assemble_frames<I>(frames: I) -> Result<AnimatedImage, DecodeError>
where
    I: IntoIterator<Item = ImageResult<Frame>>,
{
    let mut kept = Vec::new();
    let mut duration = Duration::ZERO;
    let mut consecutive_errors = 0;

    for (index, frame) in frames.into_iter().enumerate() {
        let frame = match frame {
            Ok(frame) => {
                consecutive_errors = 0;
                frame
            }
            Err(e) => {
                warn!("skipping unreadable frame {}: {}", index, e);
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_FRAME_ERRORS {
                    break;
                }
                continue;
            }
        };

        let delay = Duration::from(frame.delay());
        if delay.is_zero() {
            debug!("skipping frame {} without a display delay", index);
            continue;
        }

        duration += delay;
        kept.push(AnimationFrame {
            buffer: frame.into_buffer(),
            delay,
        });
    }

    if kept.is_empty() {
        return Err(DecodeError::NoFrames);
    }

    Ok(AnimatedImage {
        frames: kept,
        duration,
    })
}
