//! # ZivyObraz Client Core Library
//!
//! Everything a Raspberry Pi needs to act as a ZivyObraz e-ink display:
//! poll the content server, decide whether the picture changed, decode the
//! payload into a monochrome 800x480 frame and push it to the panel.
//!
//! ## Data Flow
//! 1. **Check**: [`protocol::Poller`] asks the server for the current
//!    timestamp, sleep interval and rotation (response headers only)
//! 2. **Fetch**: on a new timestamp the payload is downloaded
//! 3. **Decode**: [`format::decode`] picks BMP or one of the Z1/Z2/Z3 RLE
//!    streams by magic and produces a [`image::MonoImage`]
//! 4. **Normalize**: rotate, then resample to the panel size
//! 5. **Display**: initialize, render, sleep through a
//!    [`display::DisplayDriver`]
//!
//! Until the first successful draw the [`registration`] screen is shown so
//! the device can be claimed by its MAC address.
//!
//! ## Memory
//! A full frame is one byte per pixel (384 000 bytes at 800x480) while being
//! processed and one bit per pixel once packed for the panel, which keeps a
//! Pi Zero comfortably within budget.

/// Panel width in pixels (Waveshare 7.5" V2)
pub const DISPLAY_WIDTH: u32 = 800;
/// Panel height in pixels (Waveshare 7.5" V2)
pub const DISPLAY_HEIGHT: u32 = 480;
/// Sleep used whenever the server gave no usable advice
pub const DEFAULT_SLEEP_SECS: u64 = 120;

pub mod binary;
pub mod bmp;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod format;
pub mod identity;
pub mod image;
pub mod protocol;
pub mod registration;
pub mod rle;
pub mod transport;

// Waveshare panel binding, only built for the Pi
#[cfg(all(target_os = "linux", feature = "hardware"))]
pub mod epd7in5_v2;
