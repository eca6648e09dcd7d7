//! Conversion entry points.
//!
//! [`Converter`] owns the collaborators (theme catalogue, content renderer,
//! code renderer) and runs the pipeline; the free functions are thin
//! wrappers that build a converter with the built-in collaborators.

use crate::config::ConversionOptions;
use crate::error::Md2WxError;
use crate::output::ConversionResult;
use crate::pipeline::content::{ContentRenderer, MarkdownRenderer};
use crate::pipeline::embed::embed_images_with_progress;
use crate::pipeline::extract::extract_code_blocks;
use crate::pipeline::highlight::{CodeRenderer, SyntectHighlighter};
use crate::pipeline::links::number_links;
use crate::progress::{ConversionProgressCallback, NoopProgressCallback};
use crate::theme::{BuiltinThemes, ThemeCatalog};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Markdown-to-WeChat-HTML converter.
///
/// Cheap to clone and safe to share across threads; every call to
/// [`Converter::convert`] is independent.
#[derive(Clone)]
pub struct Converter {
    options: ConversionOptions,
    themes: Arc<dyn ThemeCatalog>,
    content: Arc<dyn ContentRenderer>,
    code: Arc<dyn CodeRenderer>,
}

impl Converter {
    /// Converter with the built-in themes and renderers.
    pub fn new(options: ConversionOptions) -> Self {
        Self {
            options,
            themes: BuiltinThemes::shared(),
            content: Arc::new(MarkdownRenderer),
            code: Arc::new(SyntectHighlighter),
        }
    }

    pub fn with_themes(mut self, themes: Arc<dyn ThemeCatalog>) -> Self {
        self.themes = themes;
        self
    }

    pub fn with_content_renderer(mut self, renderer: Arc<dyn ContentRenderer>) -> Self {
        self.content = renderer;
        self
    }

    pub fn with_code_renderer(mut self, renderer: Arc<dyn CodeRenderer>) -> Self {
        self.code = renderer;
        self
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert a Markdown document, resolving images against the options'
    /// `base_dir`.
    pub fn convert(&self, markdown: &str) -> Result<ConversionResult, Md2WxError> {
        self.convert_in(markdown, None)
    }

    /// Convert a Markdown document, resolving relative image paths against
    /// `base_dir` when given.
    ///
    /// # Errors
    /// Returns `Err` only for fatal problems: an unknown theme or a renderer
    /// failure. Image problems are reported in [`ConversionResult::errors`].
    pub fn convert_in(
        &self,
        markdown: &str,
        base_dir: Option<&Path>,
    ) -> Result<ConversionResult, Md2WxError> {
        let start = Instant::now();
        let o = &self.options;
        let noop = NoopProgressCallback;
        let progress: &dyn ConversionProgressCallback = match &o.progress_callback {
            Some(cb) => cb.as_ref(),
            None => &noop,
        };

        let content_theme = self.themes.content_theme(&o.content_theme).ok_or_else(|| {
            Md2WxError::UnknownContentTheme {
                name: o.content_theme.clone(),
                available: self.themes.content_theme_names().join(", "),
            }
        })?;
        let code_theme =
            self.themes
                .code_theme(&o.code_theme)
                .ok_or_else(|| Md2WxError::UnknownCodeTheme {
                    name: o.code_theme.clone(),
                    available: self.themes.code_theme_names().join(", "),
                })?;

        // ── Step 1: Link numbering ───────────────────────────────────────────
        let numbered;
        let source = if o.number_links {
            numbered = number_links(markdown);
            debug!("Numbered {} link references", numbered.references.len());
            numbered.markdown.as_str()
        } else {
            markdown
        };

        // ── Step 2: Extract fenced code ──────────────────────────────────────
        let extraction = extract_code_blocks(source);
        info!(
            "Converting {} bytes of Markdown with {} code blocks",
            source.len(),
            extraction.blocks.len()
        );
        progress.on_conversion_start(extraction.blocks.len());

        // ── Step 3: Render content ───────────────────────────────────────────
        let mut html = self.content.render(&extraction.markdown, content_theme)?;

        // ── Step 4: Render code blocks ───────────────────────────────────────
        let rendered = extraction
            .blocks
            .iter()
            .map(|block| {
                self.code
                    .render(block, code_theme, content_theme)
                    .map(|h| (block.placeholder.clone(), h))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // ── Step 5: Substitute placeholders ──────────────────────────────────
        for (placeholder, code_html) in &rendered {
            if !html.contains(placeholder.as_str()) {
                warn!("Code block placeholder was dropped by the content renderer");
                continue;
            }
            html = html.replace(placeholder.as_str(), code_html);
        }
        let code_blocks: HashMap<String, String> = rendered.into_iter().collect();

        // ── Step 6: Embed images ─────────────────────────────────────────────
        let (mut warnings, mut errors) = (Vec::new(), Vec::new());
        if o.embed_local_images {
            let config = o.image_embed_config(base_dir.map(Path::to_path_buf));
            let report = embed_images_with_progress(&html, &config, progress);
            info!(
                "Embedded {} image(s), {} error(s)",
                report.embedded_count(),
                report.errors().len()
            );
            warnings.extend(report.warnings());
            errors.extend(report.errors());
            html = report.html;
        }

        let result = ConversionResult::new(html, code_blocks, warnings, errors);
        info!(
            "Conversion {} in {} ms ({} bytes of HTML)",
            if result.success { "succeeded" } else { "finished with errors" },
            start.elapsed().as_millis(),
            result.html.len()
        );
        progress.on_conversion_complete(result.success);
        Ok(result)
    }
}

/// Convert a Markdown string with the built-in renderers.
///
/// # Example
/// ```rust
/// use md2wx_html::{convert, ConversionOptions};
///
/// let result = convert("# Hello\n\n```rust\nfn main() {}\n```\n", &ConversionOptions::default()).unwrap();
/// assert!(result.success);
/// assert!(result.html.contains("<h1"));
/// assert_eq!(result.code_blocks.len(), 1);
/// ```
pub fn convert(markdown: &str, options: &ConversionOptions) -> Result<ConversionResult, Md2WxError> {
    Converter::new(options.clone()).convert(markdown)
}

/// Read a Markdown file and convert it.
///
/// Relative image paths resolve against the options' `base_dir`, else the
/// directory containing `path`.
pub fn convert_file(
    path: impl AsRef<Path>,
    options: &ConversionOptions,
) -> Result<ConversionResult, Md2WxError> {
    let path = path.as_ref();
    let markdown = read_markdown(path)?;
    let base_dir = match &options.base_dir {
        Some(dir) => dir.clone(),
        None => document_dir(path),
    };
    debug!("Resolving images against {}", base_dir.display());
    Converter::new(options.clone()).convert_in(&markdown, Some(&base_dir))
}

/// Convert a Markdown file and write the HTML next to wherever `output_path`
/// points.
///
/// Uses atomic write (temp file in the target directory + persist) so a
/// failed run never leaves a truncated file behind. The HTML is written
/// even when some images failed; inspect the returned result.
pub fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    options: &ConversionOptions,
) -> Result<ConversionResult, Md2WxError> {
    let result = convert_file(input, options)?;
    write_html(output_path, &result.html)?;
    Ok(result)
}

/// Atomically write `html` to `path`, creating parent directories.
pub fn write_html(path: impl AsRef<Path>, html: &str) -> Result<(), Md2WxError> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| Md2WxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(html.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    info!("Wrote {} bytes to {}", html.len(), path.display());
    Ok(())
}

fn read_markdown(path: &Path) -> Result<String, Md2WxError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Md2WxError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => Md2WxError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Md2WxError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

fn document_dir(path: &Path) -> PathBuf {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    match absolute.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
