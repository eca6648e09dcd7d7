//! Code rendering: one extracted block → inline-styled, highlighted `<pre>`.
//!
//! syntect's HTML writer already emits `style` attributes on every span, so
//! its output survives the WeChat editor unchanged. The only work here is
//! merging the content theme's code-block chrome into syntect's `<pre>`.

use crate::error::Md2WxError;
use crate::pipeline::extract::CodeBlock;
use crate::theme::{ContentTheme, Element};
use once_cell::sync::Lazy;
use regex::Regex;
use syntect::highlighting::Theme;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use tracing::debug;

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static RE_PRE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^<pre style="([^"]*)">\n?"#).unwrap());

/// Renders a single code block to self-contained HTML.
pub trait CodeRenderer: Send + Sync {
    /// Render `block` with `code_theme` colours inside `content_theme` chrome.
    fn render(
        &self,
        block: &CodeBlock,
        code_theme: &Theme,
        content_theme: &ContentTheme,
    ) -> Result<String, Md2WxError>;
}

/// [`CodeRenderer`] backed by syntect's bundled grammars.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntectHighlighter;

impl CodeRenderer for SyntectHighlighter {
    fn render(
        &self,
        block: &CodeBlock,
        code_theme: &Theme,
        content_theme: &ContentTheme,
    ) -> Result<String, Md2WxError> {
        let syntax = SYNTAXES
            .find_syntax_by_token(&block.language)
            .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());
        debug!(
            "Highlighting {} byte block as {} (tag '{}')",
            block.code.len(),
            syntax.name,
            block.language
        );

        let code = block.code.strip_suffix('\n').unwrap_or(&block.code);
        let html = highlighted_html_for_string(code, &SYNTAXES, syntax, code_theme).map_err(|e| {
            Md2WxError::HighlightFailed {
                language: display_language(&block.language).to_string(),
                detail: e.to_string(),
            }
        })?;

        Ok(apply_chrome(&html, content_theme.style(Element::CodeBlock)))
    }
}

fn display_language(tag: &str) -> &str {
    if tag.is_empty() {
        "untagged"
    } else {
        tag
    }
}

/// Merge `chrome` declarations into the leading `<pre>` and drop the
/// newline syntect writes after it and after `</pre>`.
fn apply_chrome(html: &str, chrome: Option<&str>) -> String {
    let body = html.trim_end_matches('\n');
    let Some(caps) = RE_PRE_OPEN.captures(body) else {
        return body.to_string();
    };
    let background = caps[1].trim();
    let rest = &body[caps[0].len()..];

    let mut style = String::new();
    if let Some(chrome) = chrome.map(str::trim).filter(|c| !c.is_empty()) {
        style.push_str(&chrome.replace('"', "'"));
    }
    if !background.is_empty() {
        if !style.is_empty() {
            style.push(' ');
        }
        style.push_str(background);
    }
    format!(r#"<pre style="{style}">{rest}"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{BuiltinThemes, ThemeCatalog};

    fn block(language: &str, code: &str) -> CodeBlock {
        CodeBlock {
            placeholder: "<!--\u{2063}md2wx:code:0:0\u{2063}-->".into(),
            language: language.into(),
            code: code.into(),
        }
    }

    fn render(language: &str, code: &str) -> String {
        let themes = BuiltinThemes::shared();
        let code_theme = themes.code_theme("default").unwrap();
        let content = themes.content_theme("green_simple").unwrap();
        SyntectHighlighter
            .render(&block(language, code), code_theme, content)
            .unwrap()
    }

    #[test]
    fn rust_block_is_highlighted_inline() {
        let html = render("rust", "fn main() {}\n");
        assert!(html.starts_with("<pre style=\""), "got: {html}");
        assert!(html.ends_with("</pre>"), "got: {html}");
        assert!(html.contains("<span style=\""));
        assert!(html.contains("main"));
        assert!(!html.contains("class="));
    }

    #[test]
    fn chrome_and_background_merged() {
        let html = render("python", "print(1)\n");
        let open = &html[..html.find('>').unwrap()];
        assert!(open.contains("border-left: 3px solid #2bae85;"), "got: {open}");
        assert!(open.contains("background-color:#"), "got: {open}");
        assert_eq!(html.matches("<pre").count(), 1);
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let html = render("no-such-lang", "a < b && c\n");
        assert!(html.contains("a &lt; b &amp;&amp; c"), "got: {html}");
    }

    #[test]
    fn untagged_block_renders() {
        let html = render("", "just text\n");
        assert!(html.contains("just text"));
    }

    #[test]
    fn trailing_newline_not_rendered_before_close() {
        let html = render("", "line\n");
        assert!(!html.contains("\n</pre>"), "got: {html:?}");
    }

    #[test]
    fn apply_chrome_without_chrome_keeps_background() {
        let out = apply_chrome("<pre style=\"background-color:#fff;\">\nx</pre>\n", None);
        assert_eq!(out, "<pre style=\"background-color:#fff;\">x</pre>");
    }
}
