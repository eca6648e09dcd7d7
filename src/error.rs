//! Error types for the md2wx-html library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2WxError`] — **Fatal**: the conversion cannot proceed at all
//!   (input file unreadable, unknown theme, highlighter failure, invalid
//!   options). Returned as `Err(Md2WxError)` from the `convert*` functions.
//!
//! * [`ImageEmbedError`] — **Non-fatal**: a single `<img>` could not be
//!   embedded but every other image is fine. Collected into
//!   [`crate::pipeline::embed::EmbedReport`] and surfaced as strings in
//!   [`crate::output::ConversionResult::errors`]; the image keeps its
//!   original `src`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2wx-html library.
///
/// Image-level failures use [`ImageEmbedError`] and never abort a conversion.
#[derive(Debug, Error)]
pub enum Md2WxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Markdown input file was not found at the given path.
    #[error("Markdown file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the input file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input could be opened but not read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The content theme name is not known to the theme catalogue.
    #[error("Unknown content theme '{name}'. Available: {available}")]
    UnknownContentTheme { name: String, available: String },

    /// The code theme name is not known to the theme catalogue.
    #[error("Unknown code theme '{name}'. Available: {available}")]
    UnknownCodeTheme { name: String, available: String },

    /// The syntax highlighter failed on a code block.
    #[error("Highlighting failed for {language} code block: {detail}")]
    HighlightFailed { language: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal failure for a single image reference.
///
/// The `Display` text is the diagnostic line reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ImageEmbedError {
    /// The resolved path does not exist.
    #[error("Image not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but cannot be opened for reading.
    #[error("Permission denied reading image: {src}")]
    PermissionDenied { src: String },

    /// Decoding, transcoding, or encoding failed.
    #[error("Error processing image {src}: {detail}")]
    Other { src: String, detail: String },
}
