//! End-to-end tests for md2wx-html.
//!
//! Every test builds its fixtures in a fresh temp directory (Markdown files
//! and images generated with the `image` crate), so nothing here touches
//! the network or depends on files in the repository.
//!
//! Run with:
//!   cargo test --test convert -- --nocapture

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, Rgba, RgbaImage};
use md2wx_html::{
    convert, convert_file, convert_to_file, BuiltinThemes, ContentTheme, ConversionOptions,
    ConversionProgressCallback, Converter, Element, ImageFormat, ThemeCatalog,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use syntect::highlighting::Theme;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_image(dir: &Path, name: &str, w: u32, h: u32) {
    RgbaImage::from_pixel(w, h, Rgba([30, 120, 200, 255]))
        .save(dir.join(name))
        .expect("write fixture image");
}

/// Deterministic noise so the PNG encoder cannot compress it away.
fn write_noise_png(dir: &Path, name: &str, w: u32, h: u32) {
    let mut state: u32 = 0x1234_5678;
    let img = RgbaImage::from_fn(w, h, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [a, b, c, _] = state.to_le_bytes();
        Rgba([a, b, c, 255])
    });
    img.save(dir.join(name)).expect("write noise image");
}

fn embed_options(dir: &Path) -> md2wx_html::ConversionOptionsBuilder {
    ConversionOptions::builder()
        .embed_local_images(true)
        .base_dir(dir)
}

/// Decode the first `data:` image in `html`.
fn first_data_image(html: &str) -> (String, DynamicImage) {
    let start = html.find("src=\"data:").expect("a data URI") + "src=\"data:".len();
    let rest = &html[start..];
    let (mime, rest) = rest.split_once(";base64,").expect("base64 data URI");
    let payload = &rest[..rest.find('"').expect("closing quote")];
    let bytes = STANDARD.decode(payload).expect("valid base64");
    let img = image::load_from_memory(&bytes).expect("decodable image");
    (mime.to_string(), img)
}

// ── Code blocks ──────────────────────────────────────────────────────────────

#[test]
fn code_blocks_round_trip_through_placeholders() {
    init_tracing();
    let md = "# Demo\n\n```rust\nfn main() {}\n```\n\nText between.\n\n~~~python\nprint('x')\n~~~\n\n```\nplain\n```\n";
    let result = convert(md, &ConversionOptions::default()).unwrap();

    assert!(result.success);
    assert_eq!(result.code_blocks.len(), 3);
    assert!(!result.html.contains('\u{2063}'), "placeholder leaked");
    assert!(!result.html.contains("<!--"));
    assert!(!result.html.contains("```"));
    assert!(!result.html.contains("~~~"));
    assert_eq!(result.html.matches("<pre").count(), 3);
    for fragment in result.code_blocks.values() {
        assert!(result.html.contains(fragment.as_str()));
    }
    let main_at = result.html.find("main").unwrap();
    let between_at = result.html.find("Text between.").unwrap();
    let print_at = result.html.find("print").unwrap();
    assert!(main_at < between_at && between_at < print_at);
}

#[test]
fn markdown_inside_code_is_not_rendered() {
    let md = "```md\n# not a heading\n**not bold**\n```\n";
    let result = convert(md, &ConversionOptions::default()).unwrap();
    assert!(!result.html.contains("<h1"));
    assert!(!result.html.contains("<strong"));
    assert!(result.html.contains("heading"));
}

#[test]
fn rule_after_code_block_is_kept() {
    let md = "```\ncode\n```\n---\n\nafter\n";
    let result = convert(md, &ConversionOptions::default()).unwrap();
    assert_eq!(result.code_blocks.len(), 1);
    assert!(!result.html.contains("<h2"), "code became a heading: {}", result.html);
    let pre_at = result.html.find("<pre").unwrap();
    let hr_at = result.html.find("<hr").expect("thematic break");
    let after_at = result.html.find("after").unwrap();
    assert!(pre_at < hr_at && hr_at < after_at);
}

#[test]
fn text_right_after_code_block_is_its_own_paragraph() {
    let md = "intro\n```\nx\n```\noutro\n";
    let result = convert(md, &ConversionOptions::default()).unwrap();
    let pre_at = result.html.find("<pre").unwrap();
    let outro_at = result.html.find("outro").unwrap();
    assert!(pre_at < outro_at);
    assert!(result.html[..pre_at].ends_with("intro</p>"), "got: {}", result.html);
    assert!(result.html[pre_at..outro_at].contains("<p"));
}

#[test]
fn indented_fence_is_literal_code() {
    let md = "para\n\n    ```\n    literal\n    ```\n";
    let result = convert(md, &ConversionOptions::default()).unwrap();
    assert!(result.code_blocks.is_empty());
    assert_eq!(result.html.matches("<pre").count(), 1);
    assert!(result.html.contains("```\nliteral\n```"), "got: {}", result.html);
}

#[test]
fn inline_code_with_backticks_is_not_a_fence() {
    let md = "Use ```x``` inline, then a real block:\n\n```\ny\n```\n";
    let result = convert(md, &ConversionOptions::default()).unwrap();
    assert_eq!(result.code_blocks.len(), 1);
    assert!(result.html.contains("<code"));
}

#[test]
fn every_element_is_inline_styled() {
    let options = ConversionOptions::builder()
        .content_theme("green_simple")
        .build()
        .unwrap();
    let md = "# H\n\n> quote\n\n- item\n\n| a |\n|---|\n| b |\n\n---\n\n[link](http://x) `code`\n";
    let result = convert(md, &options).unwrap();
    for tag in ["<h1 ", "<blockquote ", "<ul ", "<li ", "<table ", "<td ", "<hr ", "<a ", "<code "] {
        let at = result.html.find(tag).unwrap_or_else(|| panic!("missing {tag}"));
        assert!(
            result.html[at..].split('>').next().unwrap().contains("style=\""),
            "{tag} has no inline style"
        );
    }
    assert!(!result.html.contains("<style"));
    assert!(!result.html.contains("class="));
}

// ── Images ───────────────────────────────────────────────────────────────────

#[test]
fn missing_image_reports_error_and_keeps_src() {
    let dir = tempfile::tempdir().unwrap();
    let options = embed_options(dir.path()).build().unwrap();
    let result = Converter::new(options).convert("![gone](gone.png)").unwrap();

    assert!(!result.success);
    assert_eq!(
        result.errors,
        vec![format!("Image not found: {}", dir.path().join("gone.png").display())]
    );
    assert!(result.html.contains(r#"src="gone.png""#));
}

#[test]
fn remote_and_data_images_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let md = "![r](https://example.com/a.png)\n\n![d](data:image/png;base64,iVBORw0KGgo=)\n";
    let plain = convert(md, &ConversionOptions::default()).unwrap();
    let embedded = convert(md, &embed_options(dir.path()).build().unwrap()).unwrap();

    assert_eq!(plain.html, embedded.html);
    assert!(embedded.success);
    assert!(embedded.warnings.is_empty());
}

#[test]
fn local_image_resized_to_max_width() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "wide.png", 1000, 500);
    let options = embed_options(dir.path()).image_max_width(500).build().unwrap();
    let result = convert("![w](wide.png)", &options).unwrap();

    assert!(result.success, "{:?}", result.errors);
    let (mime, img) = first_data_image(&result.html);
    assert_eq!(mime, "image/png");
    assert_eq!((img.width(), img.height()), (500, 250));
}

#[test]
fn jpg_alias_yields_jpeg_mime() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "pic.png", 16, 16);
    let format: ImageFormat = "jpg".parse().unwrap();
    let options = embed_options(dir.path())
        .image_format(format)
        .image_quality(70)
        .build()
        .unwrap();
    let result = convert("![p](pic.png)", &options).unwrap();
    let (mime, img) = first_data_image(&result.html);
    assert_eq!(mime, "image/jpeg");
    assert_eq!(img.width(), 16);
}

#[test]
fn large_image_produces_warning_only() {
    let dir = tempfile::tempdir().unwrap();
    write_noise_png(dir.path(), "noise.png", 460, 460);
    let result = convert("![n](noise.png)", &embed_options(dir.path()).build().unwrap()).unwrap();

    assert!(result.success);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("Embedded image noise.png is large ("));
    assert!(result.warnings[0].ends_with("KB). Consider using a smaller image or external hosting."));
    assert!(result.html.contains("src=\"data:image/png;base64,"));
}

#[test]
fn partial_success_keeps_good_images() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "ok.png", 8, 8);
    let md = "![a](ok.png)\n\n![b](missing.png)\n";
    let result = convert(md, &embed_options(dir.path()).build().unwrap()).unwrap();

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.html.contains("data:image/png;base64,"));
    assert!(result.html.contains(r#"src="missing.png""#));
}

#[test]
fn file_helpers_resolve_images_next_to_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("img")).unwrap();
    write_image(&dir.path().join("img"), "a.png", 4, 4);
    let md_path = dir.path().join("post.md");
    std::fs::write(&md_path, "# Post\n\n![a](img/a.png)\n").unwrap();

    let options = ConversionOptions::builder().embed_local_images(true).build().unwrap();
    let out_path = dir.path().join("out/post.html");
    let result = convert_to_file(&md_path, &out_path, &options).unwrap();

    assert!(result.success, "{:?}", result.errors);
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, result.html);
    assert!(written.contains("data:image/png;base64,"));
}

#[test]
fn missing_markdown_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert_file(dir.path().join("nope.md"), &ConversionOptions::default()).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

// ── Link numbering ───────────────────────────────────────────────────────────

#[test]
fn numbered_links_render_reference_list() {
    let options = ConversionOptions::builder().number_links(true).build().unwrap();
    let md = "[A](http://x) and [B](http://y) and [A2](http://x)\n\n```\n[kept](http://z)\n```\n";
    let result = convert(md, &options).unwrap();

    assert!(result.html.contains("A[1] and B[2] and A2[1]"));
    assert!(result.html.contains("[1] A：http://x"));
    assert!(result.html.contains("[2] B：http://y"));
    assert!(!result.html.contains("[3]"));
    assert_eq!(result.code_blocks.len(), 1);
}

// ── Collaborators ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counting {
    blocks: AtomicUsize,
    images: AtomicUsize,
    errors: AtomicUsize,
    completed: AtomicUsize,
}

impl ConversionProgressCallback for Counting {
    fn on_conversion_start(&self, code_blocks: usize) {
        self.blocks.store(code_blocks, Ordering::SeqCst);
    }
    fn on_image_complete(&self, _index: usize, _size_bytes: usize) {
        self.images.fetch_add(1, Ordering::SeqCst);
    }
    fn on_image_error(&self, _index: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_conversion_complete(&self, _success: bool) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn progress_callback_sees_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "ok.png", 4, 4);
    let counter = Arc::new(Counting::default());
    let options = embed_options(dir.path())
        .progress_callback(counter.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();

    convert("```\na\n```\n\n![x](ok.png) ![y](nope.png)", &options).unwrap();

    assert_eq!(counter.blocks.load(Ordering::SeqCst), 1);
    assert_eq!(counter.images.load(Ordering::SeqCst), 1);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 1);
}

/// A catalogue with a single marker theme.
struct MarkerThemes {
    content: ContentTheme,
    code: Theme,
}

impl ThemeCatalog for MarkerThemes {
    fn content_theme(&self, name: &str) -> Option<&ContentTheme> {
        (name == "marker").then_some(&self.content)
    }
    fn code_theme(&self, _name: &str) -> Option<&Theme> {
        Some(&self.code)
    }
    fn content_theme_names(&self) -> Vec<String> {
        vec!["marker".into()]
    }
    fn code_theme_names(&self) -> Vec<String> {
        vec!["any".into()]
    }
}

#[test]
fn injected_theme_catalog_is_used() {
    let builtin = BuiltinThemes::new();
    let themes = MarkerThemes {
        content: ContentTheme::new("marker").with_style(Element::Paragraph, "color: hotpink;"),
        code: builtin.code_theme("default").unwrap().clone(),
    };
    let options = ConversionOptions::builder().content_theme("marker").build().unwrap();
    let result = Converter::new(options)
        .with_themes(Arc::new(themes))
        .convert("hello")
        .unwrap();
    assert_eq!(
        result.html,
        r#"<section><p style="color: hotpink;">hello</p></section>"#
    );
}

#[test]
fn converter_is_shareable_across_threads() {
    let converter = Arc::new(Converter::new(ConversionOptions::default()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let c = Arc::clone(&converter);
            std::thread::spawn(move || c.convert(&format!("# Doc {i}\n\n```\n{i}\n```\n")).unwrap())
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        let result = h.join().unwrap();
        assert!(result.html.contains(&format!("Doc {i}")));
        assert_eq!(result.code_blocks.len(), 1);
    }
}
