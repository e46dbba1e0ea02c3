//! JPEG normalization for downloaded media.
//!
//! Anything declared as `image/jpeg` passes through untouched. Every other
//! payload is decoded into an in-memory raster and re-encoded as JPEG, so a
//! saved file always matches its `.jpg` extension. The raster only lives for
//! the duration of the call.

use std::io::Cursor;

use {
    image::{DynamicImage, ImageFormat, ImageReader, codecs::jpeg::JpegEncoder},
    tracing::debug,
};

use crate::{
    error::{Context, Error, Result},
    mime,
};

/// Re-encode quality (0.95 on a 0-1 scale).
pub const JPEG_QUALITY: u8 = 95;

/// Normalized payload plus what happened to it.
#[derive(Debug)]
pub struct Normalized {
    /// JPEG bytes ready to be written.
    pub data: Vec<u8>,
    /// `false` when the input was passed through unchanged.
    pub transcoded: bool,
    /// Detected source format (`None` for pass-through).
    pub source_format: Option<ImageFormat>,
}

/// Normalize `raw` to JPEG at [`JPEG_QUALITY`].
pub fn normalize(raw: Vec<u8>, declared_mime: &str) -> Result<Normalized> {
    normalize_with_quality(raw, declared_mime, JPEG_QUALITY)
}

/// Normalize `raw` to JPEG, re-encoding at `quality` (clamped to 1..=100)
/// when the declared type is not already JPEG.
pub fn normalize_with_quality(
    raw: Vec<u8>,
    declared_mime: &str,
    quality: u8,
) -> Result<Normalized> {
    if mime::is_jpeg(declared_mime) {
        return Ok(Normalized {
            data: raw,
            transcoded: false,
            source_format: None,
        });
    }
    if raw.is_empty() {
        return Err(Error::Empty);
    }

    let (img, format) = decode(&raw, declared_mime)?;
    let data = encode_jpeg(&img, quality)?;
    debug!(
        declared = declared_mime,
        ?format,
        width = img.width(),
        height = img.height(),
        in_bytes = raw.len(),
        out_bytes = data.len(),
        "transcoded to jpeg"
    );

    Ok(Normalized {
        data,
        transcoded: true,
        source_format: format,
    })
}

/// Decode using the sniffed format, falling back to the declared type when
/// the magic bytes are not recognized.
fn decode(raw: &[u8], declared_mime: &str) -> Result<(DynamicImage, Option<ImageFormat>)> {
    let mut reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .context("failed to read image header")?;
    if reader.format().is_none()
        && let Some(hint) = mime::format_from_mime(declared_mime)
    {
        reader.set_format(hint);
    }
    let format = reader.format();

    let img = reader.decode().map_err(|source| Error::Decode {
        declared: mime::mime_essence(declared_mime),
        source,
    })?;
    Ok((img, format))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG has no alpha channel and no 16-bit samples.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|source| Error::Encode { source })?;
    Ok(output.into_inner())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        image::{Rgb, RgbImage, Rgba, RgbaImage},
    };

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn png_with_alpha() -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 3, Rgba([200, 40, 40, 128]));
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    #[test]
    fn jpeg_passes_through_unchanged() {
        let raw = vec![0xFF, 0xD8, 0xFF, 0x00, 0x01, 0x02];
        let out = normalize(raw.clone(), "image/jpeg").unwrap();
        assert_eq!(out.data, raw);
        assert!(!out.transcoded);
    }

    #[test]
    fn jpeg_with_parameters_passes_through() {
        // Not even a valid image: pass-through must not attempt a decode.
        let raw = b"opaque".to_vec();
        let out = normalize(raw.clone(), "Image/JPEG; charset=binary").unwrap();
        assert_eq!(out.data, raw);
    }

    #[test]
    fn png_becomes_jpeg() {
        let out = normalize(png_with_alpha(), "image/png").unwrap();
        assert!(out.transcoded);
        assert_eq!(out.source_format, Some(ImageFormat::Png));
        assert_eq!(image::guess_format(&out.data).unwrap(), ImageFormat::Jpeg);
        assert_eq!(mime::sniff_mime(&out.data), Some("image/jpeg"));

        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn mislabelled_payload_uses_sniffed_format() {
        let bmp = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 128, 255]))),
            ImageFormat::Bmp,
        );
        let out = normalize(bmp, "application/octet-stream").unwrap();
        assert_eq!(out.source_format, Some(ImageFormat::Bmp));
        assert_eq!(image::guess_format(&out.data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn lower_quality_produces_smaller_output() {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 90]));
        let png = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);
        let high = normalize_with_quality(png.clone(), "image/png", 100).unwrap();
        let low = normalize_with_quality(png, "image/png", 10).unwrap();
        assert!(low.data.len() < high.data.len());
    }

    #[test]
    fn empty_payload_is_decode_error() {
        let err = normalize(Vec::new(), "image/png").unwrap_err();
        assert!(matches!(err, Error::Empty));
        assert!(err.is_decode());
    }

    #[test]
    fn corrupt_payload_is_decode_error() {
        let mut bytes = png_with_alpha();
        bytes.truncate(20);
        let err = normalize(bytes, "image/png").unwrap_err();
        assert!(err.is_decode(), "unexpected error: {err}");
        assert!(err.to_string().contains("image/png"));
    }

    #[test]
    fn unknown_payload_is_decode_error() {
        let err = normalize(b"<html></html>".to_vec(), "text/html").unwrap_err();
        assert!(err.is_decode(), "unexpected error: {err}");
    }
}
