//! Image transcoding: local file → encoded bytes + MIME type → data URI.
//!
//! The WeChat editor keeps `data:` images on paste but drops relative
//! paths, so every local image is decoded, optionally flattened, resized,
//! and re-encoded here before being wrapped as base64.
//!
//! Order of operations is fixed: colour normalisation, then resize, then
//! encode. Flattening before resizing keeps Lanczos from smearing
//! transparent edge pixels into the white background.

use crate::config::{ImageEmbedConfig, ImageFormat};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::error::{EncodingError, ImageFormatHint};
use image::{DynamicImage, ImageError, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// One image ready to be inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type for the `data:` URI.
    pub mime: &'static str,
    /// Encoded file bytes (before base64).
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>`.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// MIME type for a format or extension name; unknown names map to PNG.
pub fn mime_for(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "image/png",
    }
}

/// Read, transform, and re-encode the image at `path`.
///
/// I/O failures surface as [`ImageError::IoError`] so callers can still
/// tell a permission problem from a decode failure.
pub fn encode_file(path: &Path, config: &ImageEmbedConfig) -> Result<EncodedImage, ImageError> {
    if is_svg(path) {
        return encode_svg(path, config);
    }

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let native = reader.format();
    let img = reader.decode()?;
    let target = resolve_target(config.format, native);

    let img = normalise_color(img, target);
    let img = resize_to_width(img, config.max_width);
    let bytes = encode_image(&img, target, config.quality)?;

    debug!(
        "Encoded {} → {}x{} {} ({} bytes)",
        path.display(),
        img.width(),
        img.height(),
        target.extensions_str().first().copied().unwrap_or("png"),
        bytes.len()
    );
    Ok(EncodedImage {
        mime: mime_for(target.extensions_str().first().copied().unwrap_or("png")),
        bytes,
    })
}

/// Requested format, else the source's own, else PNG.
fn resolve_target(requested: Option<ImageFormat>, native: Option<image::ImageFormat>) -> image::ImageFormat {
    match requested {
        Some(ImageFormat::Jpeg) => image::ImageFormat::Jpeg,
        Some(ImageFormat::Png) => image::ImageFormat::Png,
        Some(ImageFormat::Webp) => image::ImageFormat::WebP,
        Some(ImageFormat::Gif) => image::ImageFormat::Gif,
        None => native.unwrap_or(image::ImageFormat::Png),
    }
}

/// Flatten alpha onto white for JPEG; any other alpha-less target gets RGB.
fn normalise_color(img: DynamicImage, target: image::ImageFormat) -> DynamicImage {
    if target != image::ImageFormat::Jpeg {
        return img;
    }
    if img.color().has_alpha() {
        DynamicImage::ImageRgb8(flatten_on_white(&img))
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Lanczos downscale to `max_width`, keeping aspect ratio; never upscales.
fn resize_to_width(img: DynamicImage, max_width: Option<u32>) -> DynamicImage {
    match max_width {
        Some(max) if max > 0 && img.width() > max => {
            let (w, h) = scaled_size(img.width(), img.height(), max);
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        _ => img,
    }
}

/// Target dimensions for a width-capped resize.
pub fn scaled_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    let h = (f64::from(height) * f64::from(max_width) / f64::from(width)).round() as u32;
    (max_width, h.max(1))
}

fn encode_image(img: &DynamicImage, target: image::ImageFormat, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    match target {
        image::ImageFormat::Jpeg => {
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)))?;
        }
        image::ImageFormat::Png => {
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))?;
        }
        image::ImageFormat::WebP => {
            // libwebp takes 8-bit RGB or RGBA only.
            let img = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            let encoder = webp::Encoder::from_image(&img).map_err(|e| {
                ImageError::Encoding(EncodingError::new(
                    ImageFormatHint::Exact(image::ImageFormat::WebP),
                    e.to_string(),
                ))
            })?;
            buf.extend_from_slice(&encoder.encode(f32::from(quality.clamp(1, 100))));
        }
        other => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut Cursor::new(&mut buf), other)?;
        }
    }
    Ok(buf)
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// SVG is embedded as-is: there is no rasteriser to resize or transcode it.
fn encode_svg(path: &Path, config: &ImageEmbedConfig) -> Result<EncodedImage, ImageError> {
    if let Some(format) = config.format {
        return Err(ImageError::Unsupported(
            image::error::UnsupportedError::from_format_and_kind(
                image::error::ImageFormatHint::Name("svg".into()),
                image::error::UnsupportedErrorKind::GenericFeature(format!(
                    "converting SVG to {format}"
                )),
            ),
        ));
    }
    let bytes = std::fs::read(path)?;
    Ok(EncodedImage {
        mime: mime_for("svg"),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, px: Rgba<u8>) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(w, h, px).save(&path).expect("write fixture");
        path
    }

    fn decode(bytes: &[u8]) -> DynamicImage {
        image::load_from_memory(bytes).expect("decodable output")
    }

    #[test]
    fn mime_table() {
        assert_eq!(mime_for("jpg"), "image/jpeg");
        assert_eq!(mime_for("JPEG"), "image/jpeg");
        assert_eq!(mime_for("webp"), "image/webp");
        assert_eq!(mime_for("svg"), "image/svg+xml");
        assert_eq!(mime_for("ico"), "image/x-icon");
        assert_eq!(mime_for("tiff"), "image/png");
    }

    #[test]
    fn resize_math() {
        assert_eq!(scaled_size(1000, 500, 500), (500, 250));
        assert_eq!(scaled_size(3, 2, 2), (2, 1));
        assert_eq!(scaled_size(1000, 1, 10), (10, 1));
    }

    #[test]
    fn keeps_native_format_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 4, 4, Rgba([0, 0, 255, 255]));
        let out = encode_file(&path, &ImageEmbedConfig::default()).unwrap();
        assert_eq!(out.mime, "image/png");
        assert_eq!(decode(&out.bytes).width(), 4);
    }

    #[test]
    fn downscales_wide_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "wide.png", 1000, 500, Rgba([10, 20, 30, 255]));
        let config = ImageEmbedConfig {
            max_width: Some(500),
            ..Default::default()
        };
        let out = encode_file(&path, &config).unwrap();
        let img = decode(&out.bytes);
        assert_eq!((img.width(), img.height()), (500, 250));
    }

    #[test]
    fn narrow_image_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "small.png", 20, 10, Rgba([1, 2, 3, 255]));
        let config = ImageEmbedConfig {
            max_width: Some(500),
            ..Default::default()
        };
        let img = decode(&encode_file(&path, &config).unwrap().bytes);
        assert_eq!(img.width(), 20);
    }

    #[test]
    fn jpeg_target_flattens_transparency_to_white() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "clear.png", 8, 8, Rgba([0, 0, 0, 0]));
        let config = ImageEmbedConfig {
            format: Some(ImageFormat::Jpeg),
            quality: 95,
            ..Default::default()
        };
        let out = encode_file(&path, &config).unwrap();
        assert_eq!(out.mime, "image/jpeg");
        let px = decode(&out.bytes).to_rgb8().get_pixel(4, 4).0;
        assert!(px.iter().all(|&c| c > 245), "expected white, got {px:?}");
    }

    #[test]
    fn webp_and_gif_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 6, 6, Rgba([200, 100, 50, 128]));
        for (format, mime) in [(ImageFormat::Webp, "image/webp"), (ImageFormat::Gif, "image/gif")] {
            let config = ImageEmbedConfig {
                format: Some(format),
                ..Default::default()
            };
            let out = encode_file(&path, &config).unwrap();
            assert_eq!(out.mime, mime);
            assert_eq!(decode(&out.bytes).width(), 6);
        }
    }

    #[test]
    fn webp_quality_controls_payload_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.png");
        let mut state = 0x9e37_79b9u32;
        RgbaImage::from_fn(300, 300, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 255])
        })
        .save(&path)
        .unwrap();

        let encode_at = |quality| {
            let config = ImageEmbedConfig {
                format: Some(ImageFormat::Webp),
                quality,
                ..Default::default()
            };
            encode_file(&path, &config).unwrap()
        };
        let low = encode_at(10);
        let high = encode_at(95);
        assert_eq!(low.mime, "image/webp");
        assert!(
            low.bytes.len() < high.bytes.len(),
            "q10 {} bytes vs q95 {} bytes",
            low.bytes.len(),
            high.bytes.len()
        );
        assert_eq!(decode(&low.bytes).width(), 300);
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = encode_file(&path, &ImageEmbedConfig::default()).unwrap_err();
        assert!(!matches!(err, ImageError::IoError(_)), "got: {err}");
    }

    #[test]
    fn svg_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.svg");
        std::fs::write(&path, "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
        let out = encode_file(&path, &ImageEmbedConfig::default()).unwrap();
        assert_eq!(out.mime, "image/svg+xml");
        assert!(out.data_uri().starts_with("data:image/svg+xml;base64,"));

        let config = ImageEmbedConfig {
            format: Some(ImageFormat::Png),
            ..Default::default()
        };
        assert!(encode_file(&path, &config).is_err());
    }

    #[test]
    fn data_uri_shape() {
        let img = EncodedImage {
            mime: "image/png",
            bytes: vec![1, 2, 3],
        };
        assert_eq!(img.data_uri(), "data:image/png;base64,AQID");
    }
}
