use image::DynamicImage;

use super::DecodeError;

/// Single-frame decode. The codec is guessed from the bytes, so a mislabeled
/// extension still decodes as long as the content is a supported format.
pub(super) fn decode_still(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    Ok(image::load_from_memory(bytes)?)
}
