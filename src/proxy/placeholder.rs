//! Placeholder image served whenever no upstream image can be delivered.

use bytes::Bytes;

/// A 1×1 fully transparent RGBA PNG.
static TRANSPARENT_PIXEL_PNG: [u8; 68] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x60,
    0x00, 0x02, 0x00, 0x00, 0x05, 0x00, 0x01, 0xe9, 0xfa, 0xdc, 0xd8, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub const PLACEHOLDER_CONTENT_TYPE: &str = "image/png";

/// The placeholder body. Shares the static buffer, no per-request copy.
pub fn placeholder_png() -> Bytes {
    Bytes::from_static(&TRANSPARENT_PIXEL_PNG)
}

/// Whether a response body is the placeholder.
pub fn is_placeholder(body: &[u8]) -> bool {
    body == TRANSPARENT_PIXEL_PNG.as_slice()
}
