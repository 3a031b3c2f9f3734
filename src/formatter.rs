//! WhatsApp text formatting for the chat bubble preview.
//!
//! WhatsApp understands a tiny markup subset: `*bold*`, `_italic_` and plain
//! line breaks. This module turns message text into a [`FormattedText`]
//! structure and renders it as escaped HTML ([`SafeHtml`]).
//!
//! # Rules
//!
//! - Pairs match non-greedily, first match wins, and never cross a line break.
//! - Bold pairs are found first. An italic `_` then pairs with the next
//!   unused `_` in the same region: inside the same bold span, or outside
//!   every bold span. So `*_x_*` is bold italic, `_a *b* c_` is italic
//!   around a bold word, and a pair that would straddle a bold boundary is
//!   never formed.
//! - There is no escaping of delimiters. An unmatched `*` or `_` stays literal.
//! - Every HTML-significant character of the source is escaped before it is
//!   wrapped in tags, so the result can be embedded as trusted markup.
//!
//! Formatting is not idempotent: always format the original message text,
//! never the HTML produced by a previous call.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static BOLD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("bold pattern is valid"));

/// A node of a formatted line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Span {
    /// Literal source text without delimiters
    Text(String),
    /// Children wrapped in `*…*`
    Bold(Vec<Span>),
    /// Children wrapped in `_…_`
    Italic(Vec<Span>),
}

/// One line of formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FormattedLine {
    /// Top-level spans in order
    pub spans: Vec<Span>,
}

/// Structured result of formatting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedText {
    lines: Vec<FormattedLine>,
}

/// HTML that has been escaped and tagged by this module.
///
/// There is no public constructor: the only way to obtain one is through
/// [`FormattedText::to_html`] or [`format_html`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    /// Returns the markup.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the markup.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FormattedText {
    /// Returns the formatted lines.
    #[must_use]
    pub fn lines(&self) -> &[FormattedLine] {
        &self.lines
    }

    /// Renders escaped HTML with `<strong>`, `<em>` and one `<br />` per newline.
    #[must_use]
    pub fn to_html(&self) -> SafeHtml {
        let mut html = String::new();

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                html.push_str("<br />");
            }
            for span in &line.spans {
                push_html(&mut html, span);
            }
        }

        SafeHtml(html)
    }

    /// Rebuilds the source text, delimiters included.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut text = String::new();

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            for span in &line.spans {
                push_source(&mut text, span);
            }
        }

        text
    }
}

/// Parses WhatsApp markup into a [`FormattedText`]. Never fails.
#[must_use]
pub fn format_whatsapp(text: &str) -> FormattedText {
    let lines = text.split('\n').map(format_line).collect();
    FormattedText { lines }
}

/// Shorthand for `format_whatsapp(text).to_html()`.
#[must_use]
pub fn format_html(text: &str) -> SafeHtml {
    format_whatsapp(text).to_html()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Bold,
    Italic,
}

/// A delimiter that was paired, at a byte offset of the line.
#[derive(Debug, Clone, Copy)]
struct Delimiter {
    at: usize,
    mark: Mark,
    open: bool,
}

impl Delimiter {
    const fn pair(mark: Mark, (open, close): (usize, usize)) -> [Self; 2] {
        [
            Self { at: open, mark, open: true },
            Self { at: close, mark, open: false },
        ]
    }
}

fn format_line(line: &str) -> FormattedLine {
    let bold: Vec<(usize, usize)> = BOLD_PATTERN
        .find_iter(line)
        .map(|m| (m.start(), m.end() - 1))
        .collect();

    let mut delimiters: Vec<Delimiter> = bold
        .iter()
        .flat_map(|&pair| Delimiter::pair(Mark::Bold, pair))
        .chain(
            italic_pairs(line, &bold)
                .into_iter()
                .flat_map(|pair| Delimiter::pair(Mark::Italic, pair)),
        )
        .collect();
    delimiters.sort_by_key(|d| d.at);

    // Pairs are properly nested, so a stack of open spans rebuilds the tree.
    let mut stack: Vec<(Mark, Vec<Span>)> = Vec::new();
    let mut spans: Vec<Span> = Vec::new();
    let mut last = 0;

    for delimiter in delimiters {
        if delimiter.at > last {
            let text = Span::Text(line[last..delimiter.at].to_string());
            stack.last_mut().map_or(&mut spans, |(_, c)| c).push(text);
        }
        last = delimiter.at + 1;

        if delimiter.open {
            stack.push((delimiter.mark, Vec::new()));
            continue;
        }
        let Some((mark, children)) = stack.pop() else {
            continue;
        };
        let span = match mark {
            Mark::Bold => Span::Bold(children),
            Mark::Italic => Span::Italic(children),
        };
        stack.last_mut().map_or(&mut spans, |(_, c)| c).push(span);
    }

    if last < line.len() {
        spans.push(Span::Text(line[last..].to_string()));
    }

    FormattedLine { spans }
}

/// Pairs `_` delimiters left to right, each with the next unused `_` in the
/// same bold region.
fn italic_pairs(line: &str, bold: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let region = |at: usize| bold.iter().position(|&(open, close)| open < at && at < close);
    let underscores: Vec<(usize, Option<usize>)> = line
        .match_indices('_')
        .map(|(at, _)| (at, region(at)))
        .collect();

    let mut used = vec![false; underscores.len()];
    let mut pairs = Vec::new();

    for i in 0..underscores.len() {
        if used[i] {
            continue;
        }
        let (open, open_region) = underscores[i];
        let partner = (i + 1..underscores.len())
            .find(|&j| !used[j] && underscores[j].1 == open_region);
        if let Some(j) = partner {
            used[i] = true;
            used[j] = true;
            pairs.push((open, underscores[j].0));
        }
    }

    pairs
}

fn push_html(out: &mut String, span: &Span) {
    match span {
        Span::Text(text) => push_escaped(out, text),
        Span::Bold(children) => {
            out.push_str("<strong>");
            children.iter().for_each(|child| push_html(out, child));
            out.push_str("</strong>");
        }
        Span::Italic(children) => {
            out.push_str("<em>");
            children.iter().for_each(|child| push_html(out, child));
            out.push_str("</em>");
        }
    }
}

fn push_source(out: &mut String, span: &Span) {
    match span {
        Span::Text(text) => out.push_str(text),
        Span::Bold(children) => {
            out.push('*');
            children.iter().for_each(|child| push_source(out, child));
            out.push('*');
        }
        Span::Italic(children) => {
            out.push('_');
            children.iter().for_each(|child| push_source(out, child));
            out.push('_');
        }
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
