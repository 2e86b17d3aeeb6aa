//! # Error Taxonomy
//!
//! Every failure the client can hit falls into one of a handful of enums.
//! None of them is fatal to the process: the client loop catches them at the
//! iteration boundary and falls back to the default sleep interval.
//!
//! | error | raised by | recovery |
//! |---|---|---|
//! | [`TransportError`] | HTTP transport | default sleep, state untouched |
//! | [`ProtocolError`] | header parsing | default sleep |
//! | [`DecodeError`] | image decoders | skip this render, maybe show registration |
//! | [`DisplayError`] | display driver | skip this render |

use thiserror::Error;

/// Errors produced while turning a raw payload into a monochrome image.
///
/// Decoders never panic on malformed input; every structural problem with a
/// payload maps to one of these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is shorter than the header it claims to carry
    #[error("payload too short")]
    TooShort,

    /// First two bytes match none of the recognized magics
    #[error("unknown image format: 0x{0:04X}")]
    UnknownFormat(u16),

    /// BMP decoder was handed a buffer without the `BM` signature
    #[error("invalid BMP signature: 0x{0:04X}")]
    InvalidSignature(u16),

    /// BMP color planes field is not 1
    #[error("unsupported planes: {0}")]
    UnsupportedPlanes(u16),

    /// BMP compression other than BI_RGB (0) or BI_BITFIELDS 565 (3)
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(u32),

    /// BMP bit depth outside 1/4/8/16/24/32
    #[error("unsupported bit depth: {0}")]
    UnsupportedDepth(u16),

    /// Zero-sized or absurdly large bitmap
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Errors talking to the content server.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request never produced a response (timeout, refused, DNS, ...)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with something other than 200
    #[error("server returned status {0}")]
    Status(u16),
}

/// Errors interpreting the control headers of a check response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A control header did not hold a valid integer
    #[error("invalid value for header `{name}`: {value:?}")]
    InvalidHeader { name: String, value: String },
}

/// Failure reported by a display driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("display error: {0}")]
pub struct DisplayError(pub String);

/// Outcome of one fetch-decode-render attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Display(#[from] DisplayError),
}
