//! Content rendering: placeholder-substituted Markdown → themed HTML.
//!
//! Every element is written with an inline `style` taken from the selected
//! [`ContentTheme`]. Placeholder tokens are HTML comments, so pulldown-cmark
//! hands them over as raw HTML and they come out verbatim. A token that
//! ends up inline anyway is lifted out of its `<p>`, so the code HTML
//! substituted for it later is never nested inside a paragraph.

use crate::error::Md2WxError;
use crate::pipeline::extract::RE_PLACEHOLDER;
use crate::theme::{ContentTheme, Element};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use tracing::debug;

/// Renders a whole (code-free) Markdown document to HTML.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, markdown: &str, theme: &ContentTheme) -> Result<String, Md2WxError>;
}

/// [`ContentRenderer`] on top of pulldown-cmark with GFM tables, footnotes,
/// strikethrough, and task lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, markdown: &str, theme: &ContentTheme) -> Result<String, Md2WxError> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let mut writer = HtmlWriter::new(theme);
        for event in Parser::new_ext(markdown, options) {
            writer.event(event);
        }
        Ok(writer.finish())
    }
}

struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

struct HtmlWriter<'t> {
    theme: &'t ContentTheme,
    out: String,
    paragraph_start: Option<usize>,
    quote_depth: usize,
    lists: Vec<bool>,
    table_align: Vec<Alignment>,
    table_cell: usize,
    in_table_head: bool,
    indented_code: Option<String>,
    image: Option<PendingImage>,
    image_nesting: usize,
    in_metadata: bool,
    footnotes: HashMap<String, usize>,
}

impl<'t> HtmlWriter<'t> {
    fn new(theme: &'t ContentTheme) -> Self {
        let mut out = String::new();
        out.push_str(&format!("<section{}>", theme.style_attr(Element::Root)));
        Self {
            theme,
            out,
            paragraph_start: None,
            quote_depth: 0,
            lists: Vec::new(),
            table_align: Vec::new(),
            table_cell: 0,
            in_table_head: false,
            indented_code: None,
            image: None,
            image_nesting: 0,
            in_metadata: false,
            footnotes: HashMap::new(),
        }
    }

    fn finish(mut self) -> String {
        self.out.push_str("</section>");
        self.out
    }

    fn style(&self, element: Element) -> String {
        self.theme.style_attr(element)
    }

    /// Base style followed by a nested variant's declarations.
    fn nested_style(&self, base: Element, nested: Element) -> String {
        let css = [self.theme.style(base), self.theme.style(nested)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if css.is_empty() {
            String::new()
        } else {
            format!(r#" style="{}""#, css.replace('"', "'"))
        }
    }

    fn open(&mut self, tag: &str, element: Element) {
        let style = self.style(element);
        self.out.push_str(&format!("<{tag}{style}>"));
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::InlineMath(math) => self.inline_code(&math),
            Event::DisplayMath(math) => {
                let style = self.style(Element::CodeBlock);
                self.out
                    .push_str(&format!("<pre{style}><code>{}</code></pre>", escape_html(&math)));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if self.image.is_some() {
                    return;
                }
                let trimmed = html.trim_end();
                if RE_PLACEHOLDER.find(trimmed).is_some_and(|m| m.as_str() == trimmed.trim_start()) {
                    self.out.push_str(trimmed.trim_start());
                } else {
                    self.out.push_str(&html);
                }
            }
            Event::FootnoteReference(_) | Event::TaskListMarker(_) | Event::Rule
                if self.image.is_some() => {}
            Event::FootnoteReference(name) => {
                let n = self.footnote_number(&name);
                let style = self.style(Element::FootnoteRef);
                self.out.push_str(&format!("<sup{style}>[{n}]</sup>"));
            }
            Event::SoftBreak => self.text("\n"),
            Event::HardBreak => {
                if self.image.is_none() {
                    self.out.push_str("<br>");
                }
            }
            Event::Rule => self.open("hr", Element::Rule),
            Event::TaskListMarker(checked) => {
                let style = self.style(Element::TaskCheckbox);
                let mark = if checked { '\u{2611}' } else { '\u{2610}' };
                self.out.push_str(&format!("<span{style}>{mark}</span>"));
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        if self.image.is_some() {
            if let Tag::Image { .. } = tag {
                self.image_nesting += 1;
            }
            return;
        }
        match tag {
            Tag::Paragraph => self.paragraph_start = Some(self.out.len()),
            Tag::Heading { level, .. } => {
                let n = heading_level(level);
                self.open(&format!("h{n}"), Element::heading(n));
            }
            Tag::BlockQuote(_) => {
                let style = if self.quote_depth == 0 {
                    self.style(Element::Blockquote)
                } else {
                    self.nested_style(Element::Blockquote, Element::NestedBlockquote)
                };
                self.quote_depth += 1;
                self.out.push_str(&format!("<blockquote{style}>"));
            }
            Tag::CodeBlock(kind) => {
                // Top-level fences are gone by now; fences inside blockquotes
                // and indented code still arrive here and render unhighlighted.
                if let CodeBlockKind::Fenced(info) = &kind {
                    debug!("Rendering fenced '{info}' block without highlighting");
                }
                self.indented_code = Some(String::new());
            }
            Tag::HtmlBlock => {}
            Tag::List(start) => {
                let (tag, element) = match start {
                    Some(_) => ("ol", Element::OrderedList),
                    None => ("ul", Element::UnorderedList),
                };
                let style = if self.lists.is_empty() {
                    self.style(element)
                } else {
                    self.nested_style(element, Element::NestedList)
                };
                let start_attr = match start {
                    Some(n) if n != 1 => format!(r#" start="{n}""#),
                    _ => String::new(),
                };
                self.lists.push(start.is_some());
                self.out.push_str(&format!("<{tag}{start_attr}{style}>"));
            }
            Tag::Item => self.open("li", Element::ListItem),
            Tag::FootnoteDefinition(name) => {
                let n = self.footnote_number(&name);
                let style = self.style(Element::Footnotes);
                self.out.push_str(&format!("<section{style}><span>[{n}] </span>"));
            }
            Tag::DefinitionList => self.out.push_str("<dl>"),
            Tag::DefinitionListTitle => self.open("dt", Element::DefinitionTitle),
            Tag::DefinitionListDefinition => self.open("dd", Element::DefinitionDetails),
            Tag::Table(alignments) => {
                self.table_align = alignments;
                self.open("table", Element::Table);
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.table_cell = 0;
                self.open("thead", Element::TableHead);
                self.out.push_str("<tr>");
            }
            Tag::TableRow => {
                self.table_cell = 0;
                self.out.push_str("<tr>");
            }
            Tag::TableCell => {
                let (tag, element) = if self.in_table_head {
                    ("th", Element::TableHeaderCell)
                } else {
                    ("td", Element::TableCell)
                };
                let mut css = self.theme.style(element).unwrap_or_default().to_string();
                if let Some(align) = self.table_align.get(self.table_cell).and_then(|a| alignment_css(*a)) {
                    if !css.is_empty() {
                        css.push(' ');
                    }
                    css.push_str(align);
                }
                if css.is_empty() {
                    self.out.push_str(&format!("<{tag}>"));
                } else {
                    self.out
                        .push_str(&format!(r#"<{tag} style="{}">"#, css.replace('"', "'")));
                }
            }
            Tag::Emphasis => self.open("em", Element::Emphasis),
            Tag::Strong => self.open("strong", Element::Strong),
            Tag::Strikethrough => self.open("del", Element::Strikethrough),
            Tag::Superscript => self.open("sup", Element::Superscript),
            Tag::Subscript => self.open("sub", Element::Subscript),
            Tag::Link { dest_url, title, .. } => {
                let style = self.style(Element::Link);
                let title_attr = if title.is_empty() {
                    String::new()
                } else {
                    format!(r#" title="{}""#, escape_html(&title))
                };
                self.out.push_str(&format!(
                    r#"<a href="{}"{title_attr}{style}>"#,
                    escape_html(&dest_url)
                ));
            }
            Tag::Image { dest_url, title, .. } => {
                // Alt text is the plain text of the image's children.
                self.image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::MetadataBlock(_) => self.in_metadata = true,
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if self.image.is_some() && tag != TagEnd::Image {
            return;
        }
        if tag == TagEnd::Image && self.image_nesting > 0 {
            self.image_nesting -= 1;
            return;
        }
        match tag {
            TagEnd::Paragraph => self.close_paragraph(),
            TagEnd::Heading(level) => {
                let n = heading_level(level);
                self.out.push_str(&format!("</h{n}>"));
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.out.push_str("</blockquote>");
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.indented_code.take() {
                    let style = self.style(Element::CodeBlock);
                    self.out.push_str(&format!(
                        "<pre{style}><code>{}</code></pre>",
                        escape_html(code.trim_end_matches('\n'))
                    ));
                }
            }
            TagEnd::HtmlBlock => {}
            TagEnd::List(ordered) => {
                self.lists.pop();
                self.out.push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => self.out.push_str("</li>"),
            TagEnd::FootnoteDefinition => self.out.push_str("</section>"),
            TagEnd::DefinitionList => self.out.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.out.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.out.push_str("</dd>"),
            TagEnd::Table => {
                self.table_align.clear();
                self.out.push_str("</tbody></table>");
            }
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.out.push_str("</tr></thead><tbody>");
            }
            TagEnd::TableRow => self.out.push_str("</tr>"),
            TagEnd::TableCell => {
                self.out.push_str(if self.in_table_head { "</th>" } else { "</td>" });
                self.table_cell += 1;
            }
            TagEnd::Emphasis => self.out.push_str("</em>"),
            TagEnd::Strong => self.out.push_str("</strong>"),
            TagEnd::Strikethrough => self.out.push_str("</del>"),
            TagEnd::Superscript => self.out.push_str("</sup>"),
            TagEnd::Subscript => self.out.push_str("</sub>"),
            TagEnd::Link => self.out.push_str("</a>"),
            TagEnd::Image => {
                if let Some(img) = self.image.take() {
                    let style = self.style(Element::Image);
                    let title_attr = if img.title.is_empty() {
                        String::new()
                    } else {
                        format!(r#" title="{}""#, escape_html(&img.title))
                    };
                    self.out.push_str(&format!(
                        r#"<img src="{}" alt="{}"{title_attr}{style}>"#,
                        escape_html(&img.src),
                        escape_html(&img.alt)
                    ));
                }
            }
            TagEnd::MetadataBlock(_) => self.in_metadata = false,
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_metadata {
            return;
        }
        if let Some(code) = self.indented_code.as_mut() {
            code.push_str(text);
        } else if let Some(img) = self.image.as_mut() {
            img.alt.push_str(text);
        } else {
            self.out.push_str(&escape_html(text));
        }
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(img) = self.image.as_mut() {
            img.alt.push_str(code);
            return;
        }
        let style = self.style(Element::InlineCode);
        self.out
            .push_str(&format!("<code{style}>{}</code>", escape_html(code)));
    }

    /// Emit the buffered paragraph, hoisting placeholder tokens out of `<p>`.
    fn close_paragraph(&mut self) {
        let Some(start) = self.paragraph_start.take() else {
            return;
        };
        let inner = self.out.split_off(start);
        let style = self.style(Element::Paragraph);
        let mut last = 0;
        for token in RE_PLACEHOLDER.find_iter(&inner) {
            push_paragraph(&mut self.out, &style, &inner[last..token.start()]);
            self.out.push_str(token.as_str());
            last = token.end();
        }
        push_paragraph(&mut self.out, &style, &inner[last..]);
    }

    fn footnote_number(&mut self, name: &str) -> usize {
        let next = self.footnotes.len() + 1;
        *self.footnotes.entry(name.to_string()).or_insert(next)
    }
}

fn push_paragraph(out: &mut String, style: &str, inner: &str) {
    let inner = inner.trim();
    if inner.is_empty() || inner == "<br>" {
        return;
    }
    out.push_str(&format!("<p{style}>{inner}</p>"));
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alignment_css(align: Alignment) -> Option<&'static str> {
    match align {
        Alignment::None => None,
        Alignment::Left => Some("text-align: left;"),
        Alignment::Center => Some("text-align: center;"),
        Alignment::Right => Some("text-align: right;"),
    }
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
