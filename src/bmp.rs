//! # BMP Decoder
//!
//! Decodes the DIB-style container the server uses for most screens into a
//! [`MonoImage`]. Supported layouts:
//!
//! | depth | pixel source | compression |
//! |---|---|---|
//! | 1, 4, 8 | palette index (MSB-first / high nibble first) | 0 |
//! | 16 | packed 5-5-5 (compression 0) or 5-6-5 (compression 3) | 0, 3 |
//! | 24, 32 | B, G, R (+ ignored alpha) | 0 |
//!
//! ## Header Layout
//! ```text
//! offset  size  field
//!      0     2  signature "BM" (0x4D42)
//!     10     4  pixel array offset
//!     14     4  DIB header size
//!     18     4  width (unsigned)
//!     22     4  height (signed; > 0 bottom-up, < 0 top-down)
//!     26     2  color planes (must be 1)
//!     28     2  bits per pixel
//!     30     4  compression
//! ```
//!
//! ## Truncation
//! Header fields must be present (54 bytes minimum). Pixel data, however, is
//! read defensively: any pixel whose bytes lie past the end of the buffer
//! stays white instead of failing the whole decode. The same applies to
//! palette entries.

use crate::binary::LeBytes;
use crate::error::DecodeError;
use crate::format::BMP_MAGIC;
use crate::image::MonoImage;
use tracing::{debug, info};

/// File header (14 bytes) plus the classic BITMAPINFOHEADER (40 bytes)
pub const MIN_HEADER_LEN: usize = 54;

/// Largest accepted width or height
pub const MAX_DIMENSION: u32 = 16_384;

/// Largest accepted pixel count (four panel areas)
pub const MAX_PIXELS: u64 = 4 * crate::DISPLAY_WIDTH as u64 * crate::DISPLAY_HEIGHT as u64;

/// Palette entries and RGB samples brighter than this are white
const THRESHOLD: u32 = 0x80;

/// Parsed header fields that drive pixel extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BmpHeader {
    pub pixel_offset: u32,
    pub header_size: u32,
    pub width: u32,
    /// Absolute row count
    pub height: u32,
    /// True when rows are stored bottom-up (positive height in the header)
    pub bottom_up: bool,
    pub depth: u16,
    pub compression: u32,
}

impl BmpHeader {
    /// Parse and validate the container header.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MIN_HEADER_LEN {
            return Err(DecodeError::TooShort);
        }
        let bytes = LeBytes::new(data);
        let field = |v: Option<u32>| v.ok_or(DecodeError::TooShort);

        let signature = bytes.u16_at(0).ok_or(DecodeError::TooShort)?;
        if signature != BMP_MAGIC {
            return Err(DecodeError::InvalidSignature(signature));
        }

        let pixel_offset = field(bytes.u32_at(10))?;
        let header_size = field(bytes.u32_at(14))?;
        let width = field(bytes.u32_at(18))?;
        let raw_height = bytes.i32_at(22).ok_or(DecodeError::TooShort)?;
        let planes = bytes.u16_at(26).ok_or(DecodeError::TooShort)?;
        let depth = bytes.u16_at(28).ok_or(DecodeError::TooShort)?;
        let compression = field(bytes.u32_at(30))?;

        let height = raw_height.unsigned_abs();
        info!(
            "BMP: {}x{}, {}bpp, compression={}",
            width, height, depth, compression
        );

        if planes != 1 {
            return Err(DecodeError::UnsupportedPlanes(planes));
        }
        if compression != 0 && compression != 3 {
            return Err(DecodeError::UnsupportedCompression(compression));
        }
        if !matches!(depth, 1 | 4 | 8 | 16 | 24 | 32) {
            return Err(DecodeError::UnsupportedDepth(depth));
        }
        if width == 0
            || height == 0
            || width > MAX_DIMENSION
            || height > MAX_DIMENSION
            || width as u64 * height as u64 > MAX_PIXELS
        {
            return Err(DecodeError::InvalidDimensions { width, height });
        }

        Ok(Self {
            pixel_offset,
            header_size,
            width,
            height,
            bottom_up: raw_height > 0,
            depth,
            compression,
        })
    }

    /// Bytes per stored row, padded to a 4-byte boundary.
    ///
    /// Sub-byte depths round the bit count up to whole 32-bit words; byte
    /// depths truncate to whole bytes first and then pad.
    pub fn stride(&self) -> usize {
        let width = self.width as usize;
        let depth = self.depth as usize;
        if depth < 8 {
            (width * depth).div_ceil(32) * 4
        } else {
            (width * depth / 8).div_ceil(4) * 4
        }
    }

    fn palette_offset(&self) -> usize {
        14usize.saturating_add(self.header_size as usize)
    }
}

/// Palette reduced to black/white, indexed 0..2^depth.
fn read_palette(bytes: &LeBytes<'_>, header: &BmpHeader) -> Vec<bool> {
    let offset = header.palette_offset();
    (0..1usize << header.depth)
        .map(|i| match bytes.u32_at(offset.saturating_add(i * 4)) {
            Some(entry) => {
                let [b, g, r, _] = entry.to_le_bytes();
                (b as u32 + g as u32 + r as u32) / 3 > THRESHOLD
            }
            None => true,
        })
        .collect()
}

fn rgb_is_white(r: u32, g: u32, b: u32) -> bool {
    r + g + b > 3 * THRESHOLD
}

/// Decode a 16-bit sample; `compression == 3` selects 5-6-5.
fn rgb16_is_white(lsb: u8, msb: u8, compression: u32) -> bool {
    let (lsb, msb) = (lsb as u32, msb as u32);
    let (r, g, b) = if compression == 0 {
        (
            (msb & 0x7C) << 1,
            ((msb & 0x03) << 6) | ((lsb & 0xE0) >> 2),
            (lsb & 0x1F) << 3,
        )
    } else {
        (
            msb & 0xF8,
            ((msb & 0x07) << 5) | ((lsb & 0xE0) >> 3),
            (lsb & 0x1F) << 3,
        )
    };
    rgb_is_white(r, g, b)
}

/// Decode a complete BMP payload.
pub fn decode(data: &[u8]) -> Result<MonoImage, DecodeError> {
    info!("Decoding BMP image...");
    let header = BmpHeader::parse(data)?;
    let bytes = LeBytes::new(data);
    let palette = if header.depth <= 8 {
        read_palette(&bytes, &header)
    } else {
        Vec::new()
    };
    let stride = header.stride();
    debug!(stride, palette = palette.len(), "BMP layout");

    let mut image = MonoImage::new(header.width, header.height);
    let indexed = |index: Option<u8>| {
        index.map(|pn| palette.get(pn as usize).copied().unwrap_or(true))
    };

    for row in 0..header.height {
        let y = if header.bottom_up {
            header.height - 1 - row
        } else {
            row
        };
        let Some(row_offset) = (row as usize)
            .checked_mul(stride)
            .and_then(|o| o.checked_add(header.pixel_offset as usize))
        else {
            break;
        };

        let at = |offset: usize| bytes.u8_at(row_offset.saturating_add(offset));

        for col in 0..header.width {
            let c = col as usize;
            let white = match header.depth {
                1 => indexed(at(c / 8).map(|byte| (byte >> (7 - (c % 8))) & 1)),
                4 => indexed(at(c / 2).map(|byte| {
                    if c % 2 == 0 {
                        byte >> 4
                    } else {
                        byte & 0x0F
                    }
                })),
                8 => indexed(at(c)),
                16 => match (at(c * 2), at(c * 2 + 1)) {
                    (Some(lsb), Some(msb)) => Some(rgb16_is_white(lsb, msb, header.compression)),
                    _ => None,
                },
                _ => {
                    let idx = c * (header.depth as usize / 8);
                    match (at(idx), at(idx + 1), at(idx + 2)) {
                        (Some(b), Some(g), Some(r)) => {
                            Some(rgb_is_white(r as u32, g as u32, b as u32))
                        }
                        _ => None,
                    }
                }
            };
            image.set_pixel(col, y, white.unwrap_or(true));
        }
    }

    debug!(black = image.black_pixels(), "BMP decoded");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{BLACK, WHITE};

    /// Build a BMP with a 40-byte info header, optional palette and raw rows.
    fn bmp(width: u32, height: i32, depth: u16, compression: u32, palette: &[[u8; 4]], rows: &[u8]) -> Vec<u8> {
        let pixel_offset = 54 + palette.len() as u32 * 4;
        let mut out = Vec::new();
        out.extend_from_slice(&BMP_MAGIC.to_le_bytes());
        out.extend_from_slice(&(pixel_offset + rows.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&pixel_offset.to_le_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&depth.to_le_bytes());
        out.extend_from_slice(&compression.to_le_bytes());
        out.extend_from_slice(&[0; 20]);
        for entry in palette {
            out.extend_from_slice(entry);
        }
        out.extend_from_slice(rows);
        out
    }

    const BW_PALETTE: [[u8; 4]; 2] = [[0, 0, 0, 0], [0xFF, 0xFF, 0xFF, 0]];

    #[test]
    fn rejects_short_buffers() {
        assert_eq!(decode(&[0x42, 0x4D]), Err(DecodeError::TooShort));
        assert_eq!(decode(&[0u8; 53]), Err(DecodeError::TooShort));
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut data = bmp(1, 1, 24, 0, &[], &[0; 4]);
        data[0] = b'X';
        assert!(matches!(decode(&data), Err(DecodeError::InvalidSignature(_))));
    }

    #[test]
    fn rejects_bad_planes_and_compression() {
        let mut data = bmp(1, 1, 24, 0, &[], &[0; 4]);
        data[26] = 2;
        assert_eq!(decode(&data), Err(DecodeError::UnsupportedPlanes(2)));

        let data = bmp(1, 1, 8, 1, &[], &[0; 4]);
        assert_eq!(decode(&data), Err(DecodeError::UnsupportedCompression(1)));
    }

    #[test]
    fn rejects_unsupported_depth_and_dimensions() {
        let data = bmp(1, 1, 2, 0, &[], &[0; 4]);
        assert_eq!(decode(&data), Err(DecodeError::UnsupportedDepth(2)));

        let data = bmp(0, 1, 24, 0, &[], &[]);
        assert!(matches!(decode(&data), Err(DecodeError::InvalidDimensions { .. })));

        let data = bmp(100_000, 100_000, 1, 0, &BW_PALETTE, &[]);
        assert!(matches!(decode(&data), Err(DecodeError::InvalidDimensions { .. })));
    }

    #[test]
    fn pixel_budget_bounds_allocation() {
        // 54 bytes claiming 16384x16384 must not allocate a 268 MB frame
        let data = bmp(16_384, 16_384, 1, 0, &[], &[]);
        assert_eq!(data.len(), MIN_HEADER_LEN);
        assert_eq!(
            decode(&data),
            Err(DecodeError::InvalidDimensions {
                width: 16_384,
                height: 16_384
            })
        );

        // Each side alone is fine, the product is not
        let data = bmp(3_200, -481, 1, 0, &BW_PALETTE, &[]);
        assert!(matches!(decode(&data), Err(DecodeError::InvalidDimensions { .. })));

        // Exactly four panel areas is still accepted
        let data = bmp(1_600, -960, 1, 0, &BW_PALETTE, &[]);
        let image = decode(&data).unwrap();
        assert_eq!((image.width(), image.height()), (1_600, 960));
    }

    #[test]
    fn stride_follows_packing_rules() {
        let header = |width, depth| BmpHeader {
            pixel_offset: 0,
            header_size: 40,
            width,
            height: 1,
            bottom_up: true,
            depth,
            compression: 0,
        };
        assert_eq!(header(1, 1).stride(), 4);
        assert_eq!(header(33, 1).stride(), 8);
        assert_eq!(header(800, 1).stride(), 100);
        assert_eq!(header(3, 4).stride(), 4);
        assert_eq!(header(9, 4).stride(), 8);
        assert_eq!(header(5, 8).stride(), 8);
        assert_eq!(header(3, 24).stride(), 12);
        assert_eq!(header(1, 16).stride(), 4);
        assert_eq!(header(3, 32).stride(), 12);
    }

    /// 1bpp, 8x10, row `r` has only pixel `r % 8` black
    fn diagonal_rows() -> Vec<u8> {
        (0..10u8)
            .flat_map(|r| [!(0x80u8 >> (r % 8)), 0, 0, 0])
            .collect()
    }

    #[test]
    fn negative_height_is_top_down() {
        let data = bmp(8, -10, 1, 0, &BW_PALETTE, &diagonal_rows());
        let img = decode(&data).unwrap();
        assert_eq!((img.width(), img.height()), (8, 10));
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        assert_eq!(img.pixel(1, 1), Some(BLACK));
        assert_eq!(img.pixel(1, 0), Some(WHITE));
        assert_eq!(img.black_pixels(), 10);
    }

    #[test]
    fn positive_height_is_flipped() {
        let data = bmp(8, 10, 1, 0, &BW_PALETTE, &diagonal_rows());
        let img = decode(&data).unwrap();
        // Output row 0 is the last stored row (9 → column 1)
        assert_eq!(img.pixel(1, 0), Some(BLACK));
        assert_eq!(img.pixel(0, 0), Some(WHITE));
        assert_eq!(img.pixel(0, 9), Some(BLACK));
    }

    #[test]
    fn four_bit_nibbles_high_first() {
        let mut palette = vec![[0xFF, 0xFF, 0xFF, 0]; 16];
        palette[3] = [0x10, 0x10, 0x10, 0];
        let data = bmp(3, -1, 4, 0, &palette, &[0x03, 0x30, 0, 0]);
        let img = decode(&data).unwrap();
        assert_eq!(img.pixel(0, 0), Some(WHITE));
        assert_eq!(img.pixel(1, 0), Some(BLACK));
        assert_eq!(img.pixel(2, 0), Some(BLACK));
    }

    #[test]
    fn eight_bit_palette_threshold() {
        let mut palette = vec![[0u8; 4]; 256];
        palette[1] = [0x80, 0x80, 0x80, 0]; // average == threshold → black
        palette[2] = [0x81, 0x81, 0x81, 0];
        let data = bmp(3, -1, 8, 0, &palette, &[1, 2, 0, 0]);
        let img = decode(&data).unwrap();
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        assert_eq!(img.pixel(1, 0), Some(WHITE));
        assert_eq!(img.pixel(2, 0), Some(BLACK));
    }

    #[test]
    fn missing_palette_entries_default_to_white() {
        // 8bpp header but no palette and pixel offset pointing at the rows
        let mut data = bmp(2, -1, 8, 0, &[], &[0, 5, 0, 0]);
        // Header size large enough that the palette lies past the buffer
        data[14..18].copy_from_slice(&4000u32.to_le_bytes());
        let img = decode(&data).unwrap();
        assert_eq!(img.black_pixels(), 0);
    }

    #[test]
    fn sixteen_bit_555_and_565() {
        // 555 white 0x7FFF, 565 black 0x0000 / white 0xFFFF
        let data = bmp(2, -1, 16, 0, &[], &[0xFF, 0x7F, 0x00, 0x00]);
        let img = decode(&data).unwrap();
        assert_eq!(img.pixel(0, 0), Some(WHITE));
        assert_eq!(img.pixel(1, 0), Some(BLACK));

        let data = bmp(2, -1, 16, 3, &[], &[0xFF, 0xFF, 0x00, 0x00]);
        let img = decode(&data).unwrap();
        assert_eq!(img.pixel(0, 0), Some(WHITE));
        assert_eq!(img.pixel(1, 0), Some(BLACK));

        // Pure 565 red (0xF800): 248 < 384 → black
        let data = bmp(1, -1, 16, 3, &[], &[0x00, 0xF8, 0, 0]);
        assert_eq!(decode(&data).unwrap().pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn truecolor_sum_threshold() {
        // 24bpp: (0x80,0x80,0x80) sums to exactly 3*0x80 → black; 0x81 → white
        let data = bmp(2, -1, 24, 0, &[], &[0x80, 0x80, 0x80, 0x81, 0x81, 0x81, 0, 0]);
        let img = decode(&data).unwrap();
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        assert_eq!(img.pixel(1, 0), Some(WHITE));

        // 32bpp ignores alpha
        let data = bmp(1, -1, 32, 0, &[], &[0xFF, 0xFF, 0xFF, 0x00]);
        assert_eq!(decode(&data).unwrap().pixel(0, 0), Some(WHITE));
        let data = bmp(1, -1, 32, 0, &[], &[0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(decode(&data).unwrap().pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn truncated_pixel_data_defaults_to_white() {
        // Two 24bpp rows of one black pixel, second row cut off
        let data = bmp(1, -2, 24, 0, &[], &[0, 0, 0, 0, 0, 0]);
        let img = decode(&data).unwrap();
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        assert_eq!(img.pixel(0, 1), Some(WHITE));
    }
}
