//! Configuration types for Markdown-to-WeChat-HTML conversion.
//!
//! All conversion behaviour is controlled through [`ConversionOptions`],
//! built via its [`ConversionOptionsBuilder`]. The image-embedding stage
//! receives an immutable [`ImageEmbedConfig`] snapshot derived from the
//! options at the start of each conversion.

use crate::error::Md2WxError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default quality for lossy image encodings.
pub const DEFAULT_IMAGE_QUALITY: u8 = 85;

/// Name of the theme used when the caller does not pick one.
pub const DEFAULT_THEME: &str = "default";

/// Options for one Markdown-to-HTML conversion.
///
/// Built via [`ConversionOptions::builder()`] or using
/// [`ConversionOptions::default()`].
///
/// # Example
/// ```rust
/// use md2wx_html::{ConversionOptions, ImageFormat};
///
/// let options = ConversionOptions::builder()
///     .content_theme("green_simple")
///     .embed_local_images(true)
///     .image_format(ImageFormat::Jpeg)
///     .image_quality(80)
///     .image_max_width(1080)
///     .build()
///     .unwrap();
/// assert_eq!(options.image_quality, 80);
/// ```
#[derive(Clone)]
pub struct ConversionOptions {
    /// Content theme name, resolved through the theme catalogue. Default: `"default"`.
    pub content_theme: String,

    /// Code highlighting theme name, resolved through the theme catalogue. Default: `"default"`.
    pub code_theme: String,

    /// Replace local `<img>` sources with base64 data URIs. Default: false.
    ///
    /// WeChat's editor drops relative image paths on paste; embedding keeps
    /// local screenshots visible without an upload step.
    pub embed_local_images: bool,

    /// Re-encode embedded images to this format. Default: keep the source format.
    pub image_format: Option<ImageFormat>,

    /// Quality for lossy encodings, 1–100. Default: 85.
    pub image_quality: u8,

    /// Downscale embedded images wider than this many pixels. Default: no limit.
    pub image_max_width: Option<u32>,

    /// Resolution root for relative image sources. Default: current directory.
    pub base_dir: Option<PathBuf>,

    /// Rewrite `[text](url)` links as numbered references before rendering. Default: false.
    pub number_links: bool,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            content_theme: DEFAULT_THEME.to_string(),
            code_theme: DEFAULT_THEME.to_string(),
            embed_local_images: false,
            image_format: None,
            image_quality: DEFAULT_IMAGE_QUALITY,
            image_max_width: None,
            base_dir: None,
            number_links: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field("content_theme", &self.content_theme)
            .field("code_theme", &self.code_theme)
            .field("embed_local_images", &self.embed_local_images)
            .field("image_format", &self.image_format)
            .field("image_quality", &self.image_quality)
            .field("image_max_width", &self.image_max_width)
            .field("base_dir", &self.base_dir)
            .field("number_links", &self.number_links)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Snapshot the image-related options for one embedding pass.
    ///
    /// `base_dir` overrides the options' own `base_dir` when given.
    pub fn image_embed_config(&self, base_dir: Option<PathBuf>) -> ImageEmbedConfig {
        ImageEmbedConfig {
            format: self.image_format,
            quality: self.image_quality,
            max_width: self.image_max_width,
            base_dir: base_dir.or_else(|| self.base_dir.clone()),
        }
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn content_theme(mut self, name: impl Into<String>) -> Self {
        self.options.content_theme = name.into();
        self
    }

    pub fn code_theme(mut self, name: impl Into<String>) -> Self {
        self.options.code_theme = name.into();
        self
    }

    pub fn embed_local_images(mut self, v: bool) -> Self {
        self.options.embed_local_images = v;
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.options.image_format = Some(format);
        self
    }

    pub fn image_quality(mut self, quality: u8) -> Self {
        self.options.image_quality = quality.clamp(1, 100);
        self
    }

    pub fn image_max_width(mut self, px: u32) -> Self {
        self.options.image_max_width = Some(px);
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.base_dir = Some(dir.into());
        self
    }

    pub fn number_links(mut self, v: bool) -> Self {
        self.options.number_links = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.options.progress_callback = Some(cb);
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<ConversionOptions, Md2WxError> {
        let o = &self.options;
        if !(1..=100).contains(&o.image_quality) {
            return Err(Md2WxError::InvalidConfig(format!(
                "image quality must be 1–100, got {}",
                o.image_quality
            )));
        }
        if o.image_max_width == Some(0) {
            return Err(Md2WxError::InvalidConfig(
                "image max width must be a positive number of pixels".into(),
            ));
        }
        if o.content_theme.trim().is_empty() || o.code_theme.trim().is_empty() {
            return Err(Md2WxError::InvalidConfig("theme names must not be empty".into()));
        }
        Ok(self.options)
    }
}

/// Immutable configuration snapshot for one image-embedding pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEmbedConfig {
    /// Target encoding; `None` keeps the source format.
    pub format: Option<ImageFormat>,
    /// Quality for lossy encodings, 1–100.
    pub quality: u8,
    /// Maximum output width in pixels.
    pub max_width: Option<u32>,
    /// Resolution root for relative paths; `None` means the working directory.
    pub base_dir: Option<PathBuf>,
}

impl Default for ImageEmbedConfig {
    fn default() -> Self {
        Self {
            format: None,
            quality: DEFAULT_IMAGE_QUALITY,
            max_width: None,
            base_dir: None,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Target encoding for embedded images.
///
/// `jpg` is accepted as an alias of [`ImageFormat::Jpeg`] everywhere a
/// format is parsed from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Webp,
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Webp => "webp",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
        }
    }

    /// Whether the encoding can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = Md2WxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(ImageFormat::Webp),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "gif" => Ok(ImageFormat::Gif),
            other => Err(Md2WxError::InvalidConfig(format!(
                "unsupported image format '{other}' (expected webp, jpeg, png or gif)"
            ))),
        }
    }
}
