//! # Payload Format Detection
//!
//! The first two bytes of a payload, read as a little-endian `u16`, are the
//! only discriminator between image formats. Nothing else (content type,
//! length, file name) is consulted, and an unrecognized magic is always an
//! error rather than a guess.
//!
//! | magic | bytes | format |
//! |---|---|---|
//! | `0x4D42` | `BM` | [`Format::Bmp`] |
//! | `0x315A` | `Z1` | [`Format::Z1`] |
//! | `0x325A` | `Z2` | [`Format::Z2`] |
//! | `0x335A` | `Z3` | [`Format::Z3`] |

use crate::binary::LeBytes;
use crate::error::DecodeError;
use crate::image::MonoImage;
use crate::rle::RleVariant;
use crate::{bmp, rle};
use tracing::info;

pub const BMP_MAGIC: u16 = 0x4D42;
pub const Z1_MAGIC: u16 = 0x315A;
pub const Z2_MAGIC: u16 = 0x325A;
pub const Z3_MAGIC: u16 = 0x335A;

/// Recognized payload encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Bmp,
    Z1,
    Z2,
    Z3,
}

impl Format {
    /// Identify a payload from its magic.
    pub fn detect(data: &[u8]) -> Result<Self, DecodeError> {
        let magic = LeBytes::new(data).u16_at(0).ok_or(DecodeError::TooShort)?;
        info!("Image format header: 0x{:04X}", magic);
        match magic {
            BMP_MAGIC => Ok(Format::Bmp),
            Z1_MAGIC => Ok(Format::Z1),
            Z2_MAGIC => Ok(Format::Z2),
            Z3_MAGIC => Ok(Format::Z3),
            other => Err(DecodeError::UnknownFormat(other)),
        }
    }
}

/// Decode any supported payload into a monochrome image.
///
/// BMP output keeps the bitmap's own dimensions; the RLE formats always
/// yield an 800x480 canvas. Orientation and normalization happen afterwards.
pub fn decode(data: &[u8]) -> Result<MonoImage, DecodeError> {
    match Format::detect(data)? {
        Format::Bmp => bmp::decode(data),
        Format::Z1 => Ok(rle::decode(data, RleVariant::Z1)),
        Format::Z2 => Ok(rle::decode(data, RleVariant::Z2)),
        Format::Z3 => Ok(rle::decode(data, RleVariant::Z3)),
    }
}
