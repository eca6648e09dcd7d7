//! Code-block extraction: pull fenced code blocks out of raw Markdown.
//!
//! Each fenced block is replaced by an opaque placeholder token so the
//! Markdown renderer never sees (or re-styles) code. The token is
//!
//! ```text
//! "<!--" U+2063 "md2wx:code:" <salt> ":" <index> U+2063 "-->"
//! ```
//!
//! A line holding only an HTML comment is a CommonMark HTML block that
//! ends on that same line and may interrupt a paragraph, exactly like the
//! fence it replaces. The line after the token therefore starts fresh:
//! `---` stays a thematic break instead of turning the token into a setext
//! heading, and text after it opens a new paragraph. The renderer passes
//! the comment through verbatim.
//!
//! Inside the comment, U+2063 (INVISIBLE SEPARATOR) delimits a counter.
//! The trailing delimiter means no token is a prefix of another (`…:1⁣`
//! vs `…:10⁣`), and the salt is chosen per document so the token prefix
//! never occurs in the source text.
//!
//! Fence rules follow CommonMark: a run of three or more backticks or
//! tildes, indented at most three columns past the enclosing list item's
//! content, opens a block; the closing run uses the same character, is at
//! least as long, and is followed only by whitespace. A backtick run whose
//! info string contains a backtick is an inline code span, not a fence.
//! Deeper indentation makes the line indented code, which is left alone.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Delimiter wrapped around every placeholder token.
pub const PLACEHOLDER_DELIM: char = '\u{2063}';

const PLACEHOLDER_TAG: &str = "md2wx:code:";

/// Matches any placeholder token, whatever its salt.
pub static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new("<!--\u{2063}md2wx:code:[0-9]+:[0-9]+\u{2063}-->").unwrap());

/// One fenced code block pulled from the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Token standing in for the block in the clean Markdown.
    pub placeholder: String,
    /// First word of the fence info string; empty when absent.
    pub language: String,
    /// Code text with fence lines removed.
    pub code: String,
}

/// Output of [`extract_code_blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Input Markdown with every fenced block replaced by its placeholder.
    pub markdown: String,
    /// Extracted blocks in document order.
    pub blocks: Vec<CodeBlock>,
}

/// Replace every fenced code block in `markdown` with a unique placeholder.
///
/// Everything outside the fences is preserved byte-for-byte: the replaced
/// span runs from the first fence character of the opening line to the end
/// of the closing fence line, excluding its line terminator. An unterminated
/// fence swallows the rest of the document as one block. Never fails.
pub fn extract_code_blocks(markdown: &str) -> Extraction {
    let salt = choose_salt(markdown);
    let mut clean = String::with_capacity(markdown.len());
    let mut blocks = Vec::new();
    let mut cursor = 0usize;
    let mut open: Option<OpenFence> = None;
    let mut lists = ListContext::default();
    let mut line_start = 0usize;

    for line in markdown.split_inclusive('\n') {
        let content = line.trim_end_matches('\n').trim_end_matches('\r');

        let closes = open.as_ref().is_some_and(|f| f.is_closed_by(content));
        if closes {
            if let Some(fence) = open.take() {
                clean.push_str(&markdown[cursor..fence.start]);
                let block = fence.finish(salt, blocks.len());
                clean.push_str(&block.placeholder);
                blocks.push(block);
                cursor = line_start + content.len();
            }
        } else if let Some(fence) = open.as_mut() {
            fence.push_line(content);
        } else if !content.trim().is_empty() {
            let base = lists.observe(content);
            open = OpenFence::detect(content, line_start, base);
        }

        line_start += line.len();
    }

    if let Some(fence) = open {
        debug!("Unterminated code fence at byte {}; taking the rest of the document", fence.start);
        clean.push_str(&markdown[cursor..fence.start]);
        let block = fence.finish(salt, blocks.len());
        clean.push_str(&block.placeholder);
        blocks.push(block);
        cursor = markdown.len();
    }

    clean.push_str(&markdown[cursor..]);
    debug!("Extracted {} code blocks", blocks.len());

    Extraction {
        markdown: clean,
        blocks,
    }
}

/// Build the placeholder token for block `index`.
pub fn placeholder_token(salt: u32, index: usize) -> String {
    format!("<!--{PLACEHOLDER_DELIM}{PLACEHOLDER_TAG}{salt}:{index}{PLACEHOLDER_DELIM}-->")
}

/// True if `text` still contains any placeholder token.
pub fn contains_placeholder(text: &str) -> bool {
    RE_PLACEHOLDER.is_match(text)
}

/// Smallest salt whose token prefix does not occur in the document.
fn choose_salt(markdown: &str) -> u32 {
    let mut salt = 0u32;
    while markdown.contains(&format!("{PLACEHOLDER_DELIM}{PLACEHOLDER_TAG}{salt}:")) {
        salt += 1;
    }
    salt
}

/// Leading whitespace of `line` as (bytes, columns); tabs stop every 4 columns.
fn leading_indent(line: &str) -> (usize, usize) {
    let mut cols = 0;
    for (i, b) in line.bytes().enumerate() {
        match b {
            b' ' => cols += 1,
            b'\t' => cols += 4 - cols % 4,
            _ => return (i, cols),
        }
    }
    (line.len(), cols)
}

/// Content columns of the list items enclosing the current line.
///
/// Only non-blank lines outside fences are observed. A lazy continuation
/// line pops items it should not; that only makes fence detection stricter.
#[derive(Default)]
struct ListContext {
    columns: Vec<usize>,
}

impl ListContext {
    /// Update the stack for `line` and return the column its block
    /// content is measured from.
    fn observe(&mut self, line: &str) -> usize {
        let (bytes, cols) = leading_indent(line);
        while self.columns.last().is_some_and(|&c| c > cols) {
            self.columns.pop();
        }
        let base = self.columns.last().copied().unwrap_or(0);
        let rest = &line[bytes..];
        if cols - base <= 3 && !is_thematic_break(rest) {
            if let Some(width) = list_marker_width(rest) {
                self.columns.push(cols + width);
            }
        }
        base
    }
}

/// `* * *`, `---`, `___`: three or more of one marker with only spaces between.
fn is_thematic_break(rest: &str) -> bool {
    let Some(marker) = rest.chars().next().filter(|c| matches!(c, '-' | '*' | '_')) else {
        return false;
    };
    let mut count = 0;
    for c in rest.chars() {
        if c == marker {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return false;
        }
    }
    count >= 3
}

/// Width of a list marker plus its trailing spaces, if `rest` starts an item.
fn list_marker_width(rest: &str) -> Option<usize> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let marker = match rest.as_bytes().first()? {
        b'-' | b'+' | b'*' => 1,
        _ if (1..=9).contains(&digits) && matches!(rest.as_bytes().get(digits), Some(b'.' | b')')) => {
            digits + 1
        }
        _ => return None,
    };
    let after = &rest[marker..];
    let spaces = after.bytes().take_while(|&b| b == b' ').count();
    if spaces == after.len() {
        // Empty item: content starts one column past the marker.
        return Some(marker + 1);
    }
    match spaces {
        0 => None,
        1..=4 => Some(marker + spaces),
        // Five or more spaces: indented code inside the item.
        _ => Some(marker + 1),
    }
}

/// A fence that has been opened but not yet closed.
struct OpenFence {
    /// Byte offset of the first fence character in the source.
    start: usize,
    /// Leading whitespace before the opening fence; stripped from code lines.
    indent: usize,
    /// Content column of the enclosing list item.
    base: usize,
    fence_char: char,
    fence_len: usize,
    language: String,
    code: String,
}

impl OpenFence {
    /// Detect an opening fence on `line` (without its terminator), where
    /// `base` is the content column of the enclosing list item.
    fn detect(line: &str, line_start: usize, base: usize) -> Option<Self> {
        let (indent, cols) = leading_indent(line);
        if cols.saturating_sub(base) > 3 {
            return None;
        }
        let trimmed = &line[indent..];
        let fence_char = trimmed.chars().next()?;
        if fence_char != '`' && fence_char != '~' {
            return None;
        }

        let fence_len = trimmed.chars().take_while(|&c| c == fence_char).count();
        if fence_len < 3 {
            return None;
        }

        // fence_char is ASCII, so char count == byte count
        let info = trimmed[fence_len..].trim();
        if fence_char == '`' && info.contains('`') {
            return None;
        }

        let language = info.split_whitespace().next().unwrap_or("").to_string();

        Some(Self {
            start: line_start + indent,
            indent,
            base,
            fence_char,
            fence_len,
            language,
            code: String::new(),
        })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let (indent, cols) = leading_indent(line);
        if cols.saturating_sub(self.base) > 3 {
            return false;
        }
        let trimmed = &line[indent..];
        let count = trimmed.chars().take_while(|&c| c == self.fence_char).count();
        count >= self.fence_len && trimmed[count..].chars().all(char::is_whitespace)
    }

    fn push_line(&mut self, line: &str) {
        let strip = line
            .bytes()
            .take(self.indent)
            .take_while(|&b| b == b' ' || b == b'\t')
            .count();
        self.code.push_str(&line[strip..]);
        self.code.push('\n');
    }

    fn finish(self, salt: u32, index: usize) -> CodeBlock {
        CodeBlock {
            placeholder: placeholder_token(salt, index),
            language: self.language,
            code: self.code,
        }
    }
}
