//! # Run-Length Raster Decoders (Z1, Z2, Z3)
//!
//! The server's compact formats are plain streams of `(color, run)` tokens
//! painted in raster order onto a fixed 800x480 white canvas. The three
//! variants only differ in how a token is packed:
//!
//! | variant | token | color bits | run bits | max run |
//! |---|---|---|---|---|
//! | Z1 | 2 bytes | byte 0 | byte 1 | 255 |
//! | Z2 | 1 byte | top 2 | low 6 | 63 |
//! | Z3 | 1 byte | top 3 | low 5 | 31 |
//!
//! There is no dimension field and no end marker. Decoding stops when the
//! input runs out or the cursor leaves the last row; unreached cells stay
//! white and excess runs are dropped at the canvas edge.

use crate::image::MonoImage;
use crate::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use tracing::{debug, info};

/// Bytes skipped at the start of every stream (the format magic)
const MAGIC_LEN: usize = 2;

/// Token packing scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RleVariant {
    Z1,
    Z2,
    Z3,
}

impl RleVariant {
    /// Split the token stream (magic already stripped) into `(color, run)`.
    fn tokens<'a>(self, body: &'a [u8]) -> Box<dyn Iterator<Item = (u8, u8)> + 'a> {
        match self {
            RleVariant::Z1 => Box::new(body.chunks_exact(2).map(|t| (t[0], t[1]))),
            RleVariant::Z2 => Box::new(body.iter().map(|&b| (b >> 6, b & 0b0011_1111))),
            RleVariant::Z3 => Box::new(body.iter().map(|&b| (b >> 5, b & 0b0001_1111))),
        }
    }

    fn token_len(self) -> usize {
        match self {
            RleVariant::Z1 => 2,
            RleVariant::Z2 | RleVariant::Z3 => 1,
        }
    }
}

/// Color index to monochrome: 0 is white, everything else is ink.
///
/// Indices above 1 address the extra inks of color panels (red, yellow, ...)
/// and collapse to black on this display.
pub fn index_is_white(index: u8) -> bool {
    index == 0
}

/// Raster cursor over a white canvas.
struct Canvas {
    image: MonoImage,
    x: u32,
    y: u32,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            image: MonoImage::new(width, height),
            x: 0,
            y: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.y >= self.image.height()
    }

    /// Paint `run` cells, wrapping rows and stopping at the canvas end.
    fn paint(&mut self, white: bool, run: u8) {
        for _ in 0..run {
            if self.is_full() {
                return;
            }
            self.image.set_pixel(self.x, self.y, white);
            self.x += 1;
            if self.x >= self.image.width() {
                self.x = 0;
                self.y += 1;
            }
        }
    }
}

/// Decode a full Z-format payload (including its 2-byte magic).
pub fn decode(data: &[u8], variant: RleVariant) -> MonoImage {
    info!("Decoding {:?} RLE image...", variant);
    let body = data.get(MAGIC_LEN..).unwrap_or(&[]);
    let mut canvas = Canvas::new(DISPLAY_WIDTH, DISPLAY_HEIGHT);

    let mut consumed = 0usize;
    for (color, run) in variant.tokens(body) {
        if canvas.is_full() {
            break;
        }
        consumed += 1;
        canvas.paint(index_is_white(color), run);
    }

    info!(
        "{:?} decoded: {} bytes read",
        variant,
        MAGIC_LEN + consumed * variant.token_len()
    );
    debug!(black = canvas.image.black_pixels(), "RLE canvas painted");
    canvas.image
}
