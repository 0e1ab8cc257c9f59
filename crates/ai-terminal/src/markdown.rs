//! Streaming markdown renderer.
//!
//! Answers arrive as arbitrary fragments. Text is held back until a line is
//! complete, then the line is classified (fence, heading, list item, ...)
//! and written with inline styling. Fenced code goes through [`CodeBlock`].

use std::io::{self, Write};

use crossterm::terminal;

use crate::highlight::CodeBlock;
use crate::style;

/// Renders markdown incrementally to any writer.
///
/// Call [`push`](Self::push) for every fragment and [`finish`](Self::finish)
/// once the answer is complete.
pub struct ResponseRenderer<W: Write> {
    out: W,
    pending: String,
    code: Option<OpenFence>,
    width: u16,
}

struct OpenFence {
    marker: &'static str,
    block: CodeBlock,
}

impl<W: Write> ResponseRenderer<W> {
    /// Renderer sized to the current terminal (80 columns if unknown).
    pub fn new(out: W) -> Self {
        let (width, _) = terminal::size().unwrap_or((80, 24));
        Self::with_width(out, width)
    }

    pub fn with_width(out: W, width: u16) -> Self {
        Self {
            out,
            pending: String::new(),
            code: None,
            width,
        }
    }

    /// Add a fragment; every line it completes is written immediately.
    pub fn push(&mut self, fragment: &str) -> io::Result<()> {
        self.pending.push_str(fragment);
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Ok(());
        };

        let complete: String = self.pending.drain(..=last_newline).collect();
        for line in complete.split_terminator('\n') {
            self.render_line(line.strip_suffix('\r').unwrap_or(line))?;
        }
        self.out.flush()
    }

    /// Write any unterminated last line and close an open code block.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.render_line(&rest)?;
        }
        self.code = None;
        self.out.flush()
    }

    /// Render a complete answer in one go.
    pub fn render_all(&mut self, text: &str) -> io::Result<()> {
        self.push(text)?;
        self.finish()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render_line(&mut self, line: &str) -> io::Result<()> {
        if let Some(fence) = self.code.as_mut() {
            if line.trim_start().starts_with(fence.marker) {
                self.code = None;
                return writeln!(self.out, "{}", style::dim(line.trim()));
            }
            let highlighted = fence.block.highlight(line);
            return writeln!(self.out, "  {highlighted}");
        }

        match classify(line) {
            Line::Fence { marker, info } => {
                self.code = Some(OpenFence {
                    marker,
                    block: CodeBlock::open(info),
                });
                writeln!(self.out, "{}", style::dim(&format!("{marker}{info}")))
            }
            Line::Heading { level, text } => {
                writeln!(self.out, "{}", style::heading(&render_inline(text), level))
            }
            Line::Rule => writeln!(self.out, "{}", style::horizontal_rule(self.width)),
            Line::Quote(text) => writeln!(
                self.out,
                "{}{}",
                style::blockquote_prefix(),
                render_inline(text)
            ),
            Line::Bullet { depth, text } => writeln!(
                self.out,
                "{} {}",
                style::list_bullet(depth),
                render_inline(text)
            ),
            Line::Numbered {
                depth,
                number,
                text,
            } => writeln!(
                self.out,
                "{} {}",
                style::list_number(number, depth),
                render_inline(text)
            ),
            Line::Blank => writeln!(self.out),
            Line::Text(text) => writeln!(self.out, "{}", render_inline(text)),
        }
    }
}

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Fence { marker: &'static str, info: &'a str },
    Heading { level: u8, text: &'a str },
    Rule,
    Quote(&'a str),
    Bullet { depth: u8, text: &'a str },
    Numbered { depth: u8, number: u32, text: &'a str },
    Blank,
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    for marker in ["```", "~~~"] {
        if let Some(info) = trimmed.strip_prefix(marker) {
            return Line::Fence {
                marker,
                info: info.trim_start_matches(marker.as_bytes()[0] as char).trim(),
            };
        }
    }

    if let Some(heading) = heading(trimmed) {
        return heading;
    }
    if is_rule(trimmed) {
        return Line::Rule;
    }
    if let Some(rest) = trimmed.strip_prefix('>') {
        return Line::Quote(rest.strip_prefix(' ').unwrap_or(rest));
    }

    let indent = line.len() - line.trim_start().len();
    let depth = (indent / 2).min(u8::MAX as usize) as u8;
    let body = line.trim_start();

    for bullet in ["- ", "* ", "+ "] {
        if let Some(text) = body.strip_prefix(bullet) {
            return Line::Bullet {
                depth,
                text: text.trim(),
            };
        }
    }

    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && digits < 10 {
        let after = &body[digits..];
        if let Some(text) = after.strip_prefix(". ").or_else(|| after.strip_prefix(") ")) {
            if let Ok(number) = body[..digits].parse() {
                return Line::Numbered {
                    depth,
                    number,
                    text: text.trim(),
                };
            }
        }
    }

    Line::Text(trimmed)
}

fn heading(line: &str) -> Option<Line<'_>> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some(Line::Heading {
        level: level as u8,
        text: rest.trim().trim_end_matches('#').trim_end(),
    })
}

fn is_rule(line: &str) -> bool {
    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_')
        && line.chars().filter(|&c| c == first).count() >= 3
        && marks.all(|c| c == first)
}

// ---------------------------------------------------------------------------
// Inline spans
// ---------------------------------------------------------------------------

/// Style `**bold**`, `*italic*`, `***both***`, `` `code` `` and
/// `[text](url)` within one line. Unmatched markers are printed as-is.
pub fn render_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        let consumed = match c {
            '\\' => escape(rest, &mut out),
            '`' => code(rest, &mut out),
            '*' | '_' => emphasis(rest, c, &mut out),
            '[' => link(rest, &mut out),
            _ => None,
        };
        let step = consumed.unwrap_or_else(|| {
            out.push(c);
            c.len_utf8()
        });
        rest = &rest[step..];
    }
    out
}

fn escape(rest: &str, out: &mut String) -> Option<usize> {
    let next = rest[1..].chars().next()?;
    if !"\\`*_[]()#>-+.!".contains(next) {
        return None;
    }
    out.push(next);
    Some(1 + next.len_utf8())
}

fn code(rest: &str, out: &mut String) -> Option<usize> {
    let ticks = rest.bytes().take_while(|&b| b == b'`').count();
    let fence = &rest[..ticks];
    let body = &rest[ticks..];
    let end = body.find(fence)?;
    let inner = body[..end].trim();
    if inner.is_empty() {
        return None;
    }
    out.push_str(&style::code_span(inner));
    Some(ticks + end + ticks)
}

fn emphasis(rest: &str, marker: char, out: &mut String) -> Option<usize> {
    let run = rest.chars().take_while(|&c| c == marker).count().min(3);
    let delim = &rest[..run];
    let body = &rest[run..];

    // An opening marker must hug its text: "2 * 3" is not emphasis.
    if body.starts_with(char::is_whitespace) {
        return None;
    }
    let end = body.find(delim)?;
    let inner = &body[..end];
    if inner.is_empty() || inner.ends_with(char::is_whitespace) {
        return None;
    }
    // snake_case identifiers keep their underscores.
    if marker == '_' && body[end + run..].starts_with(char::is_alphanumeric) {
        return None;
    }

    let styled = render_inline(inner);
    out.push_str(&match run {
        1 => style::italic(&styled),
        2 => style::bold(&styled),
        _ => style::strong_emphasis(&styled),
    });
    Some(run + end + run)
}

fn link(rest: &str, out: &mut String) -> Option<usize> {
    let close = rest.find("](")?;
    let text = &rest[1..close];
    if text.contains('[') {
        return None;
    }
    let after = &rest[close + 2..];
    let url_end = after.find(')')?;
    let url = after[..url_end].trim();
    out.push_str(&style::link(&render_inline(text), url));
    Some(close + 2 + url_end + 1)
}
