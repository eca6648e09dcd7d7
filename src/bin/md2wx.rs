//! CLI binary for md2wx-html.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionOptions`, writes the HTML, and prints diagnostics.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2wx_html::{
    convert_file, write_html, BuiltinThemes, ConversionOptions, ConversionProgressCallback,
    ImageFormat, ProgressCallback, ThemeCatalog,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per embedded image.
struct CliProgressCallback {
    bar: ProgressBar,
    embedded: AtomicUsize,
    failed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.set_message("Reading Markdown…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            embedded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, code_blocks: usize) {
        self.bar
            .set_message(format!("rendering ({code_blocks} code blocks)"));
    }

    fn on_image_start(&self, _index: usize, src: &str) {
        self.bar.set_prefix("Embedding");
        self.bar.set_message(src.to_string());
    }

    fn on_image_complete(&self, index: usize, size_bytes: usize) {
        self.embedded.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} image #{:<3} {}",
            green("✓"),
            index + 1,
            dim(&format!("{:.1} KB", size_bytes as f64 / 1024.0)),
        ));
    }

    fn on_image_error(&self, index: usize, error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 100 {
            format!("{}\u{2026}", error.chars().take(99).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} image #{:<3} {}", red("✗"), index + 1, red(&msg)));
    }

    fn on_conversion_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
        let embedded = self.embedded.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        if embedded + failed > 0 {
            eprintln!(
                "{} {} image(s) embedded, {} failed",
                if failed == 0 { green("◆") } else { yellow("◆") },
                bold(&embedded.to_string()),
                failed
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with the default theme (writes article.html)
  md2wx article.md

  # Green theme, embedded images downscaled to 1080 px JPEG
  md2wx article.md --content-theme green_simple --embed-images \
        --image-format jpeg --image-quality 80 --image-max-width 1080

  # Turn links into numbered references (WeChat drops external links)
  md2wx article.md --number-links -o out/article.html

  # Machine-readable result record
  md2wx article.md --json > result.json

  # Show available themes
  md2wx --list-themes

EXIT STATUS:
  0  HTML written (warnings may have been printed)
  1  Conversion failed, or some images could not be embedded and
     --allow-partial was not given (no file is written in that case)

ENVIRONMENT VARIABLES:
  MD2WX_CONTENT_THEME     Default for --content-theme
  MD2WX_CODE_THEME        Default for --code-theme
  MD2WX_EMBED_IMAGES      Default for --embed-images
  MD2WX_IMAGE_FORMAT      Default for --image-format
  MD2WX_IMAGE_QUALITY     Default for --image-quality
  MD2WX_IMAGE_MAX_WIDTH   Default for --image-max-width
  RUST_LOG                Override log filtering (e.g. md2wx_html=debug)
"#;

/// Convert Markdown into inline-styled HTML for the WeChat editor.
#[derive(Parser, Debug)]
#[command(
    name = "md2wx",
    version,
    about = "Convert Markdown into inline-styled HTML for the WeChat editor",
    long_about = "Convert Markdown into self-contained HTML whose every element carries an inline \
style attribute, with syntax-highlighted code blocks and optional base64-embedded local images, \
ready to paste into the WeChat Official Account editor.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    #[arg(required_unless_present = "list_themes")]
    input: Option<PathBuf>,

    /// Output HTML path. Default: the input path with an .html extension.
    #[arg(short, long, env = "MD2WX_OUTPUT")]
    output: Option<PathBuf>,

    /// Content theme name.
    #[arg(long, env = "MD2WX_CONTENT_THEME", default_value = "default")]
    content_theme: String,

    /// Code highlighting theme name.
    #[arg(long, env = "MD2WX_CODE_THEME", default_value = "default")]
    code_theme: String,

    /// Embed local images as base64 data URIs.
    #[arg(long, env = "MD2WX_EMBED_IMAGES")]
    embed_images: bool,

    /// Re-encode embedded images to this format. Default: keep the source format.
    #[arg(long, env = "MD2WX_IMAGE_FORMAT", value_enum)]
    image_format: Option<ImageFormatArg>,

    /// Quality for lossy image encodings (1–100).
    #[arg(long, env = "MD2WX_IMAGE_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    image_quality: u8,

    /// Downscale embedded images wider than this many pixels.
    #[arg(long, env = "MD2WX_IMAGE_MAX_WIDTH",
          value_parser = clap::value_parser!(u32).range(1..))]
    image_max_width: Option<u32>,

    /// Rewrite links as numbered references with a list at the end.
    #[arg(long, env = "MD2WX_NUMBER_LINKS")]
    number_links: bool,

    /// Write the HTML even when some images failed to embed.
    #[arg(long, env = "MD2WX_ALLOW_PARTIAL")]
    allow_partial: bool,

    /// Print the result record as JSON on stdout.
    #[arg(long, env = "MD2WX_JSON")]
    json: bool,

    /// List available content and code themes, then exit.
    #[arg(long)]
    list_themes: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2WX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2WX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImageFormatArg {
    Webp,
    #[value(alias = "jpg")]
    Jpeg,
    Png,
    Gif,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(v: ImageFormatArg) -> Self {
        match v {
            ImageFormatArg::Webp => ImageFormat::Webp,
            ImageFormatArg::Jpeg => ImageFormat::Jpeg,
            ImageFormatArg::Png => ImageFormat::Png,
            ImageFormatArg::Gif => ImageFormat::Gif,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.json && !cli.list_themes;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Theme listing ────────────────────────────────────────────────────
    if cli.list_themes {
        let themes = BuiltinThemes::shared();
        println!("{}", bold("Content themes:"));
        for name in themes.content_theme_names() {
            println!("  {name}");
        }
        println!("{}", bold("Code themes:"));
        for name in themes.code_theme_names() {
            println!("  {name}");
        }
        return Ok(());
    }

    let Some(input) = cli.input.clone() else {
        anyhow::bail!("No input file given");
    };
    let output_path = cli.output.clone().unwrap_or_else(|| default_output(&input));

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let options = build_options(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let start = Instant::now();
    let result = convert_file(&input, &options)
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    }

    if !cli.quiet {
        for w in &result.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
    }
    for e in &result.errors {
        eprintln!("{} {}", red("✗"), e);
    }

    if !result.success && !cli.allow_partial {
        anyhow::bail!(
            "{} image(s) could not be embedded; nothing written to {} (use --allow-partial to write anyway)",
            result.errors.len(),
            output_path.display()
        );
    }

    write_html(&output_path, &result.html)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if !cli.quiet && !cli.json {
        eprintln!(
            "{}  {} code blocks  {}ms  →  {}",
            if result.success { green("✔") } else { yellow("⚠") },
            result.code_blocks.len(),
            start.elapsed().as_millis(),
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionOptions`.
fn build_options(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionOptions> {
    let mut builder = ConversionOptions::builder()
        .content_theme(&cli.content_theme)
        .code_theme(&cli.code_theme)
        .embed_local_images(cli.embed_images)
        .image_quality(cli.image_quality)
        .number_links(cli.number_links);

    if let Some(format) = cli.image_format {
        builder = builder.image_format(format.into());
    }
    if let Some(px) = cli.image_max_width {
        builder = builder.image_max_width(px);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `notes/post.md` → `notes/post.html`.
fn default_output(input: &Path) -> PathBuf {
    input.with_extension("html")
}
