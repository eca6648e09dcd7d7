//! Pipeline stages for Markdown-to-WeChat-HTML conversion.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the two renderers can be swapped behind their
//! traits.
//!
//! ## Data Flow
//!
//! ```text
//! links ──▶ extract ──▶ content ──▶ highlight ──▶ (substitute) ──▶ embed
//! (opt.)   (fences)    (markdown)   (per block)                  (opt., encode)
//! ```
//!
//! 1. [`links`]     — optional pre-pass turning `[text](url)` into numbered
//!    references
//! 2. [`extract`]   — lift fenced code out of the document, leaving
//!    collision-free placeholder tokens
//! 3. [`content`]   — render the remaining Markdown with inline theme styles
//! 4. [`highlight`] — render each code block with syntect
//! 5. [`embed`]     — replace local `<img>` sources with data URIs, using
//!    [`encode`] for decode/resize/re-encode

pub mod content;
pub mod embed;
pub mod encode;
pub mod extract;
pub mod highlight;
pub mod links;
