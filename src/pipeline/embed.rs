//! Image embedding: rewrite local `<img src>` references as data URIs.
//!
//! The HTML is scanned tag by tag rather than parsed into a tree, so every
//! byte outside the rewritten `src` values comes out exactly as it went in.
//! Each `<img>` yields one [`ImageOutcome`]; failures are recorded and the
//! scan moves on, leaving that image's `src` untouched.

use crate::config::ImageEmbedConfig;
use crate::error::ImageEmbedError;
use crate::pipeline::encode::encode_file;
use crate::progress::{ConversionProgressCallback, NoopProgressCallback};
use image::ImageError;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;
use std::io::{self, ErrorKind};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Encoded payloads above this many KiB get a size warning.
pub const LARGE_IMAGE_KB: f64 = 500.0;

static RE_IMG_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap());

static RE_SRC_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#).unwrap()
});

/// Why an image was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No `src` attribute, or an empty one.
    NoSource,
    /// Already a `data:` URI.
    DataUri,
    /// An `http://` or `https://` URL.
    Remote,
}

/// What happened to one `<img>`, in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOutcome {
    Embedded {
        src: String,
        path: PathBuf,
        size_bytes: usize,
        warning: Option<String>,
    },
    Skipped {
        src: String,
        reason: SkipReason,
    },
    Failed(ImageEmbedError),
}

/// Rewritten HTML plus per-image outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedReport {
    pub html: String,
    pub outcomes: Vec<ImageOutcome>,
}

impl EmbedReport {
    /// Advisory messages (oversized payloads), in document order.
    pub fn warnings(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ImageOutcome::Embedded { warning, .. } => warning.clone(),
                _ => None,
            })
            .collect()
    }

    /// Per-image failures, in document order.
    pub fn errors(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ImageOutcome::Failed(e) => Some(e.to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn embedded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImageOutcome::Embedded { .. }))
            .count()
    }
}

/// Embed every local image in `html`.
pub fn embed_images(html: &str, config: &ImageEmbedConfig) -> EmbedReport {
    embed_images_with_progress(html, config, &NoopProgressCallback)
}

/// [`embed_images`] reporting per-image events to `progress`.
pub fn embed_images_with_progress(
    html: &str,
    config: &ImageEmbedConfig,
    progress: &dyn ConversionProgressCallback,
) -> EmbedReport {
    let mut out = String::with_capacity(html.len());
    let mut outcomes = Vec::new();
    let mut last = 0;

    for (index, tag) in RE_IMG_TAG.find_iter(html).enumerate() {
        let Some((raw_src, value)) = src_attribute(tag.as_str()) else {
            outcomes.push(ImageOutcome::Skipped {
                src: String::new(),
                reason: SkipReason::NoSource,
            });
            continue;
        };

        if let Some(reason) = skip_reason(&raw_src) {
            outcomes.push(ImageOutcome::Skipped { src: raw_src, reason });
            continue;
        }

        let src = decode_src(&raw_src);
        let path = resolve_path(&src, config.base_dir.as_deref());
        progress.on_image_start(index, &src);

        match embed_one(&src, &path, config) {
            Ok((data_uri, size_bytes)) => {
                let value_start = tag.start() + value.start;
                out.push_str(&html[last..value_start]);
                out.push('"');
                out.push_str(&data_uri);
                out.push('"');
                last = tag.start() + value.end;

                let warning = size_warning(&display_name(&path), size_bytes);
                if let Some(w) = &warning {
                    warn!("{w}");
                }
                progress.on_image_complete(index, size_bytes);
                outcomes.push(ImageOutcome::Embedded {
                    src,
                    path,
                    size_bytes,
                    warning,
                });
            }
            Err(e) => {
                warn!("{e}");
                progress.on_image_error(index, &e.to_string());
                outcomes.push(ImageOutcome::Failed(e));
            }
        }
    }
    out.push_str(&html[last..]);

    EmbedReport { html: out, outcomes }
}

fn embed_one(src: &str, path: &Path, config: &ImageEmbedConfig) -> Result<(String, usize), ImageEmbedError> {
    // `Path::exists` folds every stat failure into "missing".
    std::fs::metadata(path).map_err(|e| classify_io(e, src, path))?;
    let encoded = encode_file(path, config).map_err(|e| classify(e, src, path))?;
    debug!("Embedding {} as {} ({} bytes)", src, encoded.mime, encoded.bytes.len());
    Ok((encoded.data_uri(), encoded.bytes.len()))
}

fn classify(err: ImageError, src: &str, path: &Path) -> ImageEmbedError {
    match err {
        ImageError::IoError(e) => classify_io(e, src, path),
        other => ImageEmbedError::Other {
            src: src.to_string(),
            detail: other.to_string(),
        },
    }
}

fn classify_io(err: io::Error, src: &str, path: &Path) -> ImageEmbedError {
    match err.kind() {
        ErrorKind::NotFound => ImageEmbedError::NotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ImageEmbedError::PermissionDenied { src: src.to_string() },
        _ => ImageEmbedError::Other {
            src: src.to_string(),
            detail: err.to_string(),
        },
    }
}

/// The raw `src` value and its byte range (quotes included) within `tag`.
fn src_attribute(tag: &str) -> Option<(String, Range<usize>)> {
    let caps = RE_SRC_ATTR.captures(tag)?;
    let value = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    let range = if caps.get(3).is_some() {
        value.range()
    } else {
        value.start() - 1..value.end() + 1
    };
    Some((value.as_str().to_string(), range))
}

fn skip_reason(src: &str) -> Option<SkipReason> {
    let trimmed = src.trim();
    if trimmed.is_empty() {
        Some(SkipReason::NoSource)
    } else if trimmed.starts_with("data:") {
        Some(SkipReason::DataUri)
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(SkipReason::Remote)
    } else {
        None
    }
}

/// Undo HTML attribute escaping, then percent-encoding.
fn decode_src(raw: &str) -> String {
    let unescaped = raw
        .trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&");
    percent_decode_str(&unescaped).decode_utf8_lossy().into_owned()
}

/// Absolute paths as-is; relative ones against `base_dir` or the working directory.
pub fn resolve_path(src: &str, base_dir: Option<&Path>) -> PathBuf {
    let p = Path::new(src);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match base_dir {
        Some(base) => base.join(p),
        None => std::env::current_dir()
            .map(|cwd| cwd.join(p))
            .unwrap_or_else(|_| p.to_path_buf()),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Warning text for a payload of `len` bytes, if it is oversized.
pub fn size_warning(name: &str, len: usize) -> Option<String> {
    let size_kb = len as f64 / 1024.0;
    (size_kb > LARGE_IMAGE_KB).then(|| {
        format!(
            "Embedded image {name} is large ({size_kb:.1} KB). \
Consider using a smaller image or external hosting."
        )
    })
}
