//! # Monochrome Images
//!
//! [`MonoImage`] is the single pixel representation shared by every decoder,
//! the orientation transform, the registration screen and the display
//! drivers. Pixels are stored row-major with the origin at the top-left, one
//! byte per pixel, and only ever hold [`WHITE`] (255) or [`BLACK`] (0).
//!
//! ## Pipeline Position
//! ```text
//! decode(bytes) → MonoImage → rotated(rotation) → normalized(800, 480) → render
//! ```
//!
//! The image also implements `embedded-graphics`' `DrawTarget` with
//! `BinaryColor`, where `On` means black ink on the paper.

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

/// Pixel value for white (paper).
pub const WHITE: u8 = 255;
/// Pixel value for black (ink).
pub const BLACK: u8 = 0;

/// Width x height grid of binary pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct MonoImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for MonoImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonoImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("black_pixels", &self.black_pixels())
            .finish()
    }
}

impl MonoImage {
    /// Create an all-white image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![WHITE; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major pixel values, `WHITE` or `BLACK`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Pixel value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn is_white(&self, x: u32, y: u32) -> bool {
        self.pixel(x, y) == Some(WHITE)
    }

    /// Set a pixel; writes outside the image are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, white: bool) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = if white { WHITE } else { BLACK };
        }
    }

    /// Number of black pixels, handy for logging and tests.
    pub fn black_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p == BLACK).count()
    }

    /// Apply an orientation code. Quarter turns swap width and height.
    pub fn rotated(self, rotation: Rotation) -> MonoImage {
        let (w, h) = (self.width, self.height);
        match rotation {
            Rotation::Identity => self,
            Rotation::Clockwise90 => {
                let mut out = MonoImage::new(h, w);
                for y in 0..w {
                    for x in 0..h {
                        out.set_pixel(x, y, self.is_white(y, h - 1 - x));
                    }
                }
                out
            }
            Rotation::Half => {
                let mut out = self;
                out.pixels.reverse();
                out
            }
            Rotation::CounterClockwise90 => {
                let mut out = MonoImage::new(h, w);
                for y in 0..w {
                    for x in 0..h {
                        out.set_pixel(x, y, self.is_white(w - 1 - y, x));
                    }
                }
                out
            }
        }
    }

    /// Resample to exactly `width` x `height` and re-binarize.
    ///
    /// Each target pixel averages the source rectangle it covers; an average
    /// of at least 128 becomes white. Images already at the target size are
    /// returned untouched.
    pub fn normalized(self, width: u32, height: u32) -> MonoImage {
        if self.width == width && self.height == height {
            return self;
        }
        let mut out = MonoImage::new(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }

        let span = |t: u32, src: u32, dst: u32| {
            let (t, src, dst) = (t as u64, src as u64, dst as u64);
            let start = t * src / dst;
            let end = ((t + 1) * src).div_ceil(dst).max(start + 1);
            (start as u32, end as u32)
        };

        for ty in 0..height {
            let (y0, y1) = span(ty, self.height, height);
            for tx in 0..width {
                let (x0, x1) = span(tx, self.width, width);
                let mut total = 0u64;
                let mut sum = 0u64;
                for sy in y0..y1 {
                    for sx in x0..x1 {
                        total += 1;
                        sum += self.pixel(sx, sy).unwrap_or(WHITE) as u64;
                    }
                }
                out.set_pixel(tx, ty, sum / total >= 128);
            }
        }
        out
    }
}

/// Orientation codes sent by the server in the `rotate` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    /// Code 0
    #[default]
    Identity,
    /// Code 1: quarter turn clockwise, bounding box expands
    Clockwise90,
    /// Code 2: half turn, dimensions unchanged
    Half,
    /// Code 3: quarter turn counter-clockwise, bounding box expands
    CounterClockwise90,
}

impl Rotation {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Rotation::Identity),
            1 => Some(Rotation::Clockwise90),
            2 => Some(Rotation::Half),
            3 => Some(Rotation::CounterClockwise90),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl OriginDimensions for MonoImage {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for MonoImage {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set_pixel(x, y, color.is_off());
            }
        }
        Ok(())
    }
}
