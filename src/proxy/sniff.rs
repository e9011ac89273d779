//! Content type detection from magic bytes.
//!
//! Upstream `Content-Type` headers are spoofable and frequently wrong, so the
//! first bytes of the body are inspected as well. Only raster image types are
//! ever served; `image/svg+xml` can carry script and is always refused.

/// Number of leading body bytes inspected.
pub const SNIFF_WINDOW: usize = 64;

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF_SIGNATURE: &[u8] = b"GIF8";
const AVIF_BRAND: &[u8] = b"ftypavif";
const SVG: &str = "image/svg+xml";

/// Detect a raster image type from the leading bytes of a body.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    let head = &bytes[..bytes.len().min(SNIFF_WINDOW)];

    if head.starts_with(PNG_SIGNATURE) {
        Some("image/png")
    } else if head.starts_with(JPEG_SIGNATURE) {
        Some("image/jpeg")
    } else if head.starts_with(GIF_SIGNATURE) {
        Some("image/gif")
    } else if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        Some("image/webp")
    } else if head.windows(AVIF_BRAND.len()).any(|w| w == AVIF_BRAND) {
        Some("image/avif")
    } else {
        None
    }
}

/// Media type of a `Content-Type` value: parameters stripped, lowercased.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a media type is a servable raster image.
pub fn is_allowed_raster(media_type: &str) -> bool {
    media_type.starts_with("image/") && media_type.len() > "image/".len() && media_type != SVG
}

/// Outcome of combining the declared and detected content types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffedImage {
    /// Type detected from magic bytes, if any.
    pub detected_type: Option<&'static str>,
    /// Declared media type (parameters stripped), empty when absent.
    pub header_type: String,
    /// Type the image is served with, `None` when the body must be refused.
    pub final_type: Option<String>,
}

impl SniffedImage {
    /// Resolve the served type.
    ///
    /// The declared type wins whenever it is itself an allowed raster type;
    /// otherwise the sniffed type is used if allowed. A declared SVG is refused
    /// whatever the body looks like.
    pub fn resolve(content_type: Option<&str>, prefix: &[u8]) -> Self {
        let header_type = content_type.map(media_type).unwrap_or_default();
        let detected_type = sniff_image_type(prefix);

        let final_type = if header_type == SVG {
            None
        } else if is_allowed_raster(&header_type) {
            Some(header_type.clone())
        } else {
            detected_type
                .filter(|t| is_allowed_raster(t))
                .map(str::to_string)
        };

        Self {
            detected_type,
            header_type,
            final_type,
        }
    }
}
