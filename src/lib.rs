//! # md2wx-html
//!
//! Convert Markdown into self-contained, inline-styled HTML that survives
//! being pasted into the WeChat Official Account editor.
//!
//! The editor strips `<style>` blocks, external CSS, and relative image
//! paths. Everything this crate emits therefore carries inline `style`
//! attributes, and local images can be embedded as base64 data URIs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Links     optional: [text](url) → text[n] + reference list
//!  ├─ 2. Extract   fenced code → collision-free placeholder tokens
//!  ├─ 3. Content   pulldown-cmark → themed inline-styled HTML
//!  ├─ 4. Code      syntect → highlighted <pre> per block
//!  ├─ 5. Merge     placeholders → code HTML (exact string replace)
//!  └─ 6. Images    optional: local <img> → resized/re-encoded data URIs
//! ```
//!
//! Code is highlighted separately from the prose so the Markdown renderer
//! never sees (or mangles) it, and image failures never abort a conversion:
//! they are collected into [`ConversionResult::errors`].
//!
//! ## Quick Start
//!
//! ```rust
//! use md2wx_html::{convert, ConversionOptions};
//!
//! let options = ConversionOptions::builder()
//!     .content_theme("green_simple")
//!     .build()?;
//! let result = convert("# Hi\n\nSome **bold** text.", &options)?;
//! assert!(result.success);
//! assert!(result.html.contains("color: #2bae85"));
//! # Ok::<(), md2wx_html::Md2WxError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2wx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2wx-html = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod theme;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionOptions, ConversionOptionsBuilder, ImageEmbedConfig, ImageFormat};
pub use convert::{convert, convert_file, convert_to_file, write_html, Converter};
pub use error::{ImageEmbedError, Md2WxError};
pub use output::ConversionResult;
pub use pipeline::content::{ContentRenderer, MarkdownRenderer};
pub use pipeline::embed::{embed_images, EmbedReport, ImageOutcome};
pub use pipeline::extract::{extract_code_blocks, CodeBlock, Extraction};
pub use pipeline::highlight::{CodeRenderer, SyntectHighlighter};
pub use pipeline::links::{number_links, LinkNumbering};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use theme::{BuiltinThemes, ContentTheme, Element, ThemeCatalog};
