//! Theme catalogue: inline style tables for content and code.
//!
//! The WeChat editor strips `<style>` blocks, so a "theme" here is not a
//! stylesheet but a table of inline `style` declarations keyed by the
//! element the renderer is about to emit. Renderers receive the catalogue
//! as an injected [`ThemeCatalog`]; [`BuiltinThemes`] is the stock
//! implementation and tests can substitute their own.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use syntect::highlighting::{Theme, ThemeSet};

/// Syntect theme used for the `"default"` code theme name.
pub const DEFAULT_CODE_THEME: &str = "InspiredGitHub";

const FONT_STACK: &str = "PingFang SC, system-ui, -apple-system, BlinkMacSystemFont, \
'Helvetica Neue', 'Hiragino Sans GB', 'Microsoft YaHei UI', 'Microsoft YaHei', Arial, sans-serif";

const MONO_STACK: &str = "'SF Mono', Consolas, Monaco, 'Courier New', monospace";

/// Elements the content renderer styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// `<section>` wrapping the whole article.
    Root,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Paragraph,
    Strong,
    Emphasis,
    Strikethrough,
    Link,
    UnorderedList,
    OrderedList,
    /// A list nested inside a list item.
    NestedList,
    ListItem,
    TaskCheckbox,
    Blockquote,
    /// A blockquote nested inside another blockquote.
    NestedBlockquote,
    InlineCode,
    /// Outer `<pre>` chrome around highlighted code.
    CodeBlock,
    Table,
    TableHead,
    TableHeaderCell,
    TableCell,
    Rule,
    Image,
    Superscript,
    Subscript,
    FootnoteRef,
    Footnotes,
    DefinitionTitle,
    DefinitionDetails,
}

impl Element {
    /// Heading element for a level between 1 and 6.
    pub fn heading(level: u8) -> Self {
        match level {
            1 => Element::H1,
            2 => Element::H2,
            3 => Element::H3,
            4 => Element::H4,
            5 => Element::H5,
            _ => Element::H6,
        }
    }
}

/// Inline style declarations for each content element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTheme {
    name: String,
    styles: HashMap<Element, String>,
}

impl ContentTheme {
    /// An empty theme: every element renders unstyled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            styles: HashMap::new(),
        }
    }

    /// Set the declarations for one element.
    pub fn with_style(mut self, element: Element, declarations: impl Into<String>) -> Self {
        self.styles.insert(element, declarations.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declarations for `element`, if the theme styles it.
    pub fn style(&self, element: Element) -> Option<&str> {
        self.styles.get(&element).map(String::as_str)
    }

    /// ` style="…"` attribute text for `element`, or an empty string.
    pub fn style_attr(&self, element: Element) -> String {
        match self.style(element) {
            Some(css) if !css.is_empty() => format!(r#" style="{}""#, css.replace('"', "'")),
            _ => String::new(),
        }
    }

    /// Stock neutral theme.
    pub fn default_theme() -> Self {
        let heading = format!(
            "font-family: {FONT_STACK}; font-weight: 700; color: #1f2328; line-height: 1.4em; margin: 28px 0 16px;"
        );
        Self::new("default")
            .with_style(
                Element::Root,
                format!(
                    "max-width: 720px; margin: 0 auto; padding: 8px; font-family: {FONT_STACK}; \
font-size: 16px; line-height: 1.75; word-wrap: break-word; color: #333;"
                ),
            )
            .with_style(Element::H1, format!("{heading} font-size: 28px; margin-top: 0;"))
            .with_style(Element::H2, format!("{heading} font-size: 22px; border-bottom: 1px solid #eaecef; padding-bottom: 6px;"))
            .with_style(Element::H3, format!("{heading} font-size: 19px;"))
            .with_style(Element::H4, format!("{heading} font-size: 17px;"))
            .with_style(Element::H5, format!("{heading} font-size: 16px;"))
            .with_style(Element::H6, format!("{heading} font-size: 16px; color: #57606a;"))
            .with_style(Element::Paragraph, "margin: 5px 0 18px; line-height: 1.75em; font-size: 16px; color: #333;")
            .with_style(Element::Strong, "font-weight: 700; color: #1f2328;")
            .with_style(Element::Emphasis, "font-style: italic;")
            .with_style(Element::Strikethrough, "text-decoration: line-through; color: #999;")
            .with_style(Element::Link, "color: #0969da; text-decoration: none; border-bottom: 1px solid #0969da;")
            .with_style(Element::UnorderedList, "margin: 8px 0; padding-left: 22px; list-style-type: disc;")
            .with_style(Element::OrderedList, "margin: 8px 0; padding-left: 22px; list-style-type: decimal;")
            .with_style(Element::NestedList, "margin: 4px 0; padding-left: 20px;")
            .with_style(Element::ListItem, "margin: 4px 0; line-height: 1.6;")
            .with_style(Element::TaskCheckbox, "margin-right: 6px;")
            .with_style(Element::Blockquote, "margin: 18px 0; padding: 12px 16px; border-left: 4px solid #d0d7de; color: #57606a; background: #f6f8fa;")
            .with_style(Element::NestedBlockquote, "margin: 10px 0; padding: 8px 14px; border-left: 4px solid #afb8c1; color: #57606a;")
            .with_style(
                Element::InlineCode,
                format!("font-family: {MONO_STACK}; font-size: 14px; padding: 2px 4px; background-color: rgba(175, 184, 193, 0.2); border-radius: 3px;"),
            )
            .with_style(
                Element::CodeBlock,
                format!("margin: 18px 0; padding: 14px 16px; border-radius: 6px; overflow-x: auto; font-family: {MONO_STACK}; font-size: 14px; line-height: 1.6; white-space: pre;"),
            )
            .with_style(Element::Table, "width: 100%; margin: 16px 0; border-collapse: collapse; font-size: 15px;")
            .with_style(Element::TableHead, "background: #f6f8fa;")
            .with_style(Element::TableHeaderCell, "padding: 8px 12px; border: 1px solid #d0d7de; font-weight: 700; text-align: left;")
            .with_style(Element::TableCell, "padding: 8px 12px; border: 1px solid #d0d7de;")
            .with_style(Element::Rule, "border: none; height: 1px; background: #d0d7de; margin: 28px 0;")
            .with_style(Element::Image, "max-width: 100%; height: auto; display: block; margin: 18px auto;")
            .with_style(Element::Superscript, "vertical-align: super; font-size: 0.75em;")
            .with_style(Element::Subscript, "vertical-align: sub; font-size: 0.75em;")
            .with_style(Element::FootnoteRef, "color: #0969da; font-size: 0.75em; vertical-align: super;")
            .with_style(Element::Footnotes, "margin-top: 32px; padding-top: 12px; border-top: 1px solid #d0d7de; font-size: 14px; color: #57606a;")
            .with_style(Element::DefinitionTitle, "font-weight: 700; margin: 8px 0 4px;")
            .with_style(Element::DefinitionDetails, "margin: 4px 0 16px 20px; line-height: 1.6;")
    }

    /// Green accent theme.
    pub fn green_simple() -> Self {
        let heading = format!(
            "color: #2bae85; font-weight: 700; line-height: 1.4em; word-break: break-all; \
letter-spacing: -0.02em; font-family: {FONT_STACK};"
        );
        let code_font = format!("font-family: {MONO_STACK};");
        Self::new("green_simple")
            .with_style(
                Element::Root,
                format!(
                    "max-width: 720px; margin: 0 auto; padding: 8px; font-family: {FONT_STACK}; \
font-size: 16px; line-height: 1.75; word-wrap: break-word; color: #2c2c2c;"
                ),
            )
            .with_style(Element::H1, format!("{heading} font-size: 32px; margin-top: 0; margin-bottom: 24px;"))
            .with_style(Element::H2, format!("{heading} font-size: 24px; margin-top: 36px; margin-bottom: 24px;"))
            .with_style(Element::H3, format!("{heading} font-size: 20px; margin-top: 28px; margin-bottom: 20px; letter-spacing: -0.01em;"))
            .with_style(Element::H4, format!("{heading} font-size: 18px; margin-top: 24px; margin-bottom: 16px; letter-spacing: -0.01em; color: #25936c;"))
            .with_style(Element::H5, format!("{heading} font-size: 18px; margin-top: 24px; margin-bottom: 16px; letter-spacing: -0.01em; color: #25936c;"))
            .with_style(Element::H6, format!("{heading} font-size: 18px; margin-top: 24px; margin-bottom: 16px; letter-spacing: -0.01em; color: #25936c;"))
            .with_style(
                Element::Paragraph,
                "margin: 5px 0 20px; line-height: 1.75em; text-align: start; font-size: 16px; font-weight: 400; color: #2c2c2c; word-break: break-all;",
            )
            .with_style(Element::Strong, "font-weight: 700; color: #2bae85;")
            .with_style(Element::Emphasis, "font-style: italic;")
            .with_style(Element::Strikethrough, "text-decoration: line-through; color: #999;")
            .with_style(Element::Link, "color: #2bae85; text-decoration: none; border-bottom: 1px solid #2bae85;")
            .with_style(Element::UnorderedList, "margin: 8px 0; padding-left: 20px; list-style-type: disc; color: #2bae85;")
            .with_style(Element::OrderedList, "margin: 8px 0; padding-left: 20px; list-style-type: decimal; color: #2bae85;")
            .with_style(Element::NestedList, "margin: 4px 0; padding-left: 20px; color: #25936c;")
            .with_style(Element::ListItem, format!("margin: 0; line-height: 1.6; padding-left: 0; color: #2c2c2c; font-family: {FONT_STACK};"))
            .with_style(Element::TaskCheckbox, "margin-top: 4px; margin-right: 8px;")
            .with_style(
                Element::Blockquote,
                "margin: 20px 0; padding: 16px 20px; border-left: 4px solid #2bae85; background: rgba(43, 174, 133, 0.05); border-radius: 0 4px 4px 0; color: #666;",
            )
            .with_style(
                Element::NestedBlockquote,
                "margin-top: 12px; padding: 12px 16px; border-left: 4px solid #25936c; background: rgba(37, 147, 108, 0.05);",
            )
            .with_style(
                Element::InlineCode,
                format!("{code_font} font-size: 14px; padding: 2px 4px; background-color: rgba(0, 0, 0, 0.05); border-radius: 2px; color: #2c2c2c;"),
            )
            .with_style(
                Element::CodeBlock,
                format!(
                    "margin: 20px 0; padding: 16px 20px; border: 1px solid #d4e5de; border-left: 3px solid #2bae85; \
border-radius: 4px; overflow-x: auto; {code_font} font-size: 14px; line-height: 1.6; white-space: pre;"
                ),
            )
            .with_style(Element::Table, "width: 100%; margin: 16px 0; border-collapse: collapse; font-size: 15px;")
            .with_style(Element::TableHead, "background: #f8f9fa; border-bottom: 2px solid #2bae85;")
            .with_style(Element::TableHeaderCell, "padding: 12px; text-align: left; font-weight: 700; color: #2c2c2c; border-bottom: 1px solid #e0e0e0;")
            .with_style(Element::TableCell, "padding: 12px; border-bottom: 1px solid #e0e0e0; color: #2c2c2c;")
            .with_style(
                Element::Rule,
                "border: none; height: 2px; background: linear-gradient(to right, transparent, #2bae85, transparent); margin: 32px 0;",
            )
            .with_style(Element::Image, "max-width: 100%; height: auto; display: block; border-radius: 4px; margin: 20px 0;")
            .with_style(Element::Superscript, "vertical-align: super; font-size: 0.75em;")
            .with_style(Element::Subscript, "vertical-align: sub; font-size: 0.75em;")
            .with_style(Element::FootnoteRef, "color: #2bae85; text-decoration: none; border-bottom: 1px dotted #2bae85;")
            .with_style(Element::Footnotes, "margin-top: 32px; padding-top: 16px; border-top: 1px solid #e0e0e0;")
            .with_style(Element::DefinitionTitle, "font-weight: 700; color: #2bae85; margin: 8px 0 4px;")
            .with_style(Element::DefinitionDetails, "margin: 4px 0 16px 20px; color: #2c2c2c; line-height: 1.6;")
    }
}

/// Read-only lookup from theme names to style tables.
pub trait ThemeCatalog: Send + Sync {
    /// Content theme by name.
    fn content_theme(&self, name: &str) -> Option<&ContentTheme>;

    /// Code highlighting theme by name.
    fn code_theme(&self, name: &str) -> Option<&Theme>;

    /// Known content theme names, sorted.
    fn content_theme_names(&self) -> Vec<String>;

    /// Known code theme names, sorted.
    fn code_theme_names(&self) -> Vec<String>;
}

/// Built-in themes: `default` and `green_simple` for content, the bundled
/// syntect theme set for code (`default` aliases [`DEFAULT_CODE_THEME`]).
pub struct BuiltinThemes {
    content: BTreeMap<String, ContentTheme>,
    code: BTreeMap<String, Theme>,
}

static SHARED: Lazy<Arc<BuiltinThemes>> = Lazy::new(|| Arc::new(BuiltinThemes::new()));

impl BuiltinThemes {
    pub fn new() -> Self {
        let content = [ContentTheme::default_theme(), ContentTheme::green_simple()]
            .into_iter()
            .map(|t| (t.name().to_string(), t))
            .collect();
        Self {
            content,
            code: ThemeSet::load_defaults().themes,
        }
    }

    /// Process-wide instance; the syntect theme set is parsed once.
    pub fn shared() -> Arc<BuiltinThemes> {
        Arc::clone(&SHARED)
    }

    /// Register an additional content theme under its own name.
    pub fn with_content_theme(mut self, theme: ContentTheme) -> Self {
        self.content.insert(theme.name().to_string(), theme);
        self
    }
}

impl Default for BuiltinThemes {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeCatalog for BuiltinThemes {
    fn content_theme(&self, name: &str) -> Option<&ContentTheme> {
        self.content.get(name)
    }

    fn code_theme(&self, name: &str) -> Option<&Theme> {
        let name = if name == "default" { DEFAULT_CODE_THEME } else { name };
        self.code.get(name)
    }

    fn content_theme_names(&self) -> Vec<String> {
        self.content.keys().cloned().collect()
    }

    fn code_theme_names(&self) -> Vec<String> {
        std::iter::once("default".to_string())
            .chain(self.code.keys().cloned())
            .collect()
    }
}
