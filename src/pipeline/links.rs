//! Link-reference numbering: an optional Markdown pre-pass.
//!
//! WeChat articles cannot carry clickable external links, so readers lose
//! every `[text](url)`. This pass rewrites each link to `text[n]` and
//! appends a numbered reference list, giving readers the URLs in plain text.
//!
//! Runs on the raw document before code-block extraction.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

/// Heading line of the appended reference list.
pub const REFERENCE_HEADING: &str = "参考链接：";

/// One numbered reference, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReference {
    pub index: usize,
    pub text: String,
    pub url: String,
}

/// Output of [`number_links`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNumbering {
    pub markdown: String,
    pub references: Vec<LinkReference>,
}

/// Rewrite `[text](url)` links as `text[n]` and append the reference list.
///
/// Rules (applied in order):
/// 1. Leave fenced code untouched
/// 2. Leave image syntax `![alt](src)` untouched
/// 3. Number links by first-seen URL; a repeated URL reuses its number
/// 4. Append the list, or return the input unchanged when nothing matched
///
/// Rules 1 and 2 are a deliberate departure from rewriting every
/// `[text](url)` match in the raw text: a blind rewrite turns images into
/// `!alt[n]` and edits code samples, so those spans keep their links.
pub fn number_links(markdown: &str) -> LinkNumbering {
    let mut references: Vec<LinkReference> = Vec::new();
    let mut body = String::with_capacity(markdown.len());
    let mut fence: Option<(char, usize)> = None;

    for line in markdown.split_inclusive('\n') {
        if track_fence(line, &mut fence) {
            body.push_str(line);
        } else {
            body.push_str(&rewrite_line(line, &mut references));
        }
    }

    if references.is_empty() {
        return LinkNumbering {
            markdown: markdown.to_string(),
            references,
        };
    }

    body.push_str("\n\n---\n\n");
    body.push_str(REFERENCE_HEADING);
    body.push('\n');
    for r in &references {
        body.push_str(&format!("[{}] {}：{}\n", r.index, r.text, r.url));
    }
    LinkNumbering {
        markdown: body,
        references,
    }
}

// ── Rule 1: Skip fenced code ─────────────────────────────────────────────────

/// Update the open-fence state for `line`; true while the line belongs to
/// a fence (including both fence lines).
fn track_fence(line: &str, fence: &mut Option<(char, usize)>) -> bool {
    let trimmed = line.trim_start_matches([' ', '\t']).trim_end();
    let run = |c: char| trimmed.chars().take_while(|&x| x == c).count();

    match *fence {
        Some((c, len)) => {
            let n = run(c);
            if n >= len && trimmed[n * c.len_utf8()..].trim().is_empty() {
                *fence = None;
            }
            true
        }
        None => {
            for c in ['`', '~'] {
                let n = run(c);
                if n >= 3 && !(c == '`' && trimmed[n..].contains('`')) {
                    *fence = Some((c, n));
                    return true;
                }
            }
            false
        }
    }
}

// ── Rules 2 and 3: Number links, skip images ─────────────────────────────────

static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(!?)\[([^\]]+)\]\(([^)]+)\)").unwrap());

fn rewrite_line(line: &str, references: &mut Vec<LinkReference>) -> String {
    RE_LINK
        .replace_all(line, |caps: &Captures| {
            if !caps[1].is_empty() {
                return caps[0].to_string();
            }
            let text = &caps[2];
            let url = &caps[3];
            let index = match references.iter().find(|r| r.url == url) {
                Some(r) => r.index,
                None => {
                    let index = references.len() + 1;
                    references.push(LinkReference {
                        index,
                        text: text.to_string(),
                        url: url.to_string(),
                    });
                    index
                }
            };
            format!("{text}[{index}]")
        })
        .into_owned()
}
