//! MIME type helpers for image payloads.

use image::ImageFormat;

pub const JPEG: &str = "image/jpeg";

/// Lower-cased type/subtype with parameters stripped:
/// `"Image/JPEG; charset=binary"` becomes `"image/jpeg"`.
#[must_use]
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[must_use]
pub fn is_jpeg(content_type: &str) -> bool {
    mime_essence(content_type) == JPEG
}

/// Guess a MIME type from the leading magic bytes.
#[must_use]
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data).ok().and_then(format_to_mime)
}

#[must_use]
pub fn format_to_mime(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some(JPEG),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

/// Decoder hint for a declared content type, if it names a format we know.
#[must_use]
pub fn format_from_mime(content_type: &str) -> Option<ImageFormat> {
    ImageFormat::from_mime_type(mime_essence(content_type))
}

/// File extension (without the dot) conventionally used for a MIME type.
#[must_use]
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    match mime_essence(content_type).as_str() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}
