//! Display drivers.
//!
//! The client only ever talks to a [`DisplayDriver`]: wake the panel, push a
//! full frame, put it back to sleep. The Waveshare binding lives behind the
//! `hardware` feature; [`AsciiDisplay`] draws to a terminal for development.

use crate::error::DisplayError;
use crate::image::MonoImage;
use std::io::{self, Write};
use tracing::{debug, info};

/// Terminal preview size. Characters are roughly twice as tall as wide,
/// so 800x480 maps to 8x16 pixel cells.
pub const ASCII_COLUMNS: u32 = 100;
pub const ASCII_ROWS: u32 = 30;

/// Lifecycle of an e-ink panel.
pub trait DisplayDriver {
    /// Wake the controller and prepare it for a frame
    fn initialize(&mut self) -> Result<(), DisplayError>;

    /// Push a full frame. The image is already at panel size
    fn render(&mut self, image: &MonoImage) -> Result<(), DisplayError>;

    /// Enter the low-power state between updates
    fn sleep(&mut self) -> Result<(), DisplayError>;
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for Box<D> {
    fn initialize(&mut self) -> Result<(), DisplayError> {
        (**self).initialize()
    }

    fn render(&mut self, image: &MonoImage) -> Result<(), DisplayError> {
        (**self).render(image)
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        (**self).sleep()
    }
}

/// 1-bit frame buffer in panel order.
///
/// Rows of `(width+7)/8` bytes, most significant bit leftmost, a set bit
/// meaning black ink. This is the polarity the 7.5" V2 controller reads
/// from its new-data RAM, where `0x00` clears to white.
pub struct DisplayBuffer {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl DisplayBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let bytes_per_row = width.div_ceil(8);
        Self {
            width,
            height,
            buffer: vec![0x00; (bytes_per_row * height) as usize], // White by default
        }
    }

    pub fn from_image(image: &MonoImage) -> Self {
        let mut buffer = Self::new(image.width(), image.height());
        for y in 0..image.height() {
            for x in 0..image.width() {
                if !image.is_white(x, y) {
                    buffer.set_black(x, y);
                }
            }
        }
        buffer
    }

    pub fn set_black(&mut self, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let bytes_per_row = self.width.div_ceil(8);
        let byte_index = (y * bytes_per_row + x / 8) as usize;
        self.buffer[byte_index] |= 0x80 >> (x % 8);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

/// Text-mode stand-in for the panel.
pub struct AsciiDisplay<W> {
    out: W,
    columns: u32,
    rows: u32,
}

impl AsciiDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AsciiDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            columns: ASCII_COLUMNS,
            rows: ASCII_ROWS,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, image: &MonoImage) -> io::Result<()> {
        let preview = image.clone().normalized(self.columns, self.rows);
        let border = format!("+{}+", "-".repeat(self.columns as usize));

        writeln!(self.out, "{border}")?;
        for y in 0..preview.height() {
            let line: String = (0..preview.width())
                .map(|x| if preview.is_white(x, y) { ' ' } else { '#' })
                .collect();
            writeln!(self.out, "|{line}|")?;
        }
        writeln!(self.out, "{border}")?;
        self.out.flush()
    }
}

impl<W: Write> DisplayDriver for AsciiDisplay<W> {
    fn initialize(&mut self) -> Result<(), DisplayError> {
        debug!("ASCII display ready");
        Ok(())
    }

    fn render(&mut self, image: &MonoImage) -> Result<(), DisplayError> {
        info!(
            "Rendering {}x{} image ({} black pixels)",
            image.width(),
            image.height(),
            image.black_pixels()
        );
        self.draw(image)
            .map_err(|e| DisplayError(format!("stdout write failed: {e}")))
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        debug!("ASCII display sleeping");
        Ok(())
    }
}
