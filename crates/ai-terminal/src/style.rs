//! Terminal style helpers using crossterm ANSI escape sequences.
//!
//! Markdown pieces (headings, bullets, code spans) and the status lines the
//! CLI prints around an answer.

use crossterm::style::{Attribute, Color, SetAttribute, SetForegroundColor};

fn with_attr(attr: Attribute, text: &str) -> String {
    format!("{}{text}{}", SetAttribute(attr), SetAttribute(Attribute::Reset))
}

fn with_color(color: Color, text: &str) -> String {
    format!(
        "{}{text}{}",
        SetForegroundColor(color),
        SetForegroundColor(Color::Reset)
    )
}

pub fn bold(text: &str) -> String {
    with_attr(Attribute::Bold, text)
}

pub fn dim(text: &str) -> String {
    with_attr(Attribute::Dim, text)
}

pub fn italic(text: &str) -> String {
    with_attr(Attribute::Italic, text)
}

/// Bold and italic together (`***text***`).
pub fn strong_emphasis(text: &str) -> String {
    format!(
        "{}{}{text}{}",
        SetAttribute(Attribute::Bold),
        SetAttribute(Attribute::Italic),
        SetAttribute(Attribute::Reset)
    )
}

/// Inline code: cyan on the default background.
pub fn code_span(text: &str) -> String {
    with_color(Color::Cyan, text)
}

/// Heading: bold, colored by level, with its `#` marks kept visible.
pub fn heading(text: &str, level: u8) -> String {
    let color = match level {
        1 => Color::Magenta,
        2 => Color::Blue,
        3 => Color::Cyan,
        _ => Color::White,
    };
    format!(
        "{}{}{} {text}{}",
        SetForegroundColor(color),
        SetAttribute(Attribute::Bold),
        "#".repeat(level as usize),
        SetAttribute(Attribute::Reset)
    )
}

/// Link text underlined, followed by the dimmed URL when it adds anything.
pub fn link(text: &str, url: &str) -> String {
    let label = with_attr(Attribute::Underlined, text);
    if url.is_empty() || url == text {
        label
    } else {
        format!("{label} {}", dim(&format!("({url})")))
    }
}

/// Horizontal rule, capped at 80 columns.
pub fn horizontal_rule(width: u16) -> String {
    dim(&"─".repeat(width.clamp(3, 80) as usize))
}

pub fn blockquote_prefix() -> String {
    with_color(Color::DarkGrey, "▌ ")
}

pub fn list_bullet(depth: u8) -> String {
    let marker = if depth % 2 == 0 { "•" } else { "◦" };
    format!(
        "{}{}",
        "  ".repeat(depth as usize),
        with_color(Color::Yellow, marker)
    )
}

pub fn list_number(n: u32, depth: u8) -> String {
    format!(
        "{}{}",
        "  ".repeat(depth as usize),
        with_color(Color::Yellow, &format!("{n}."))
    )
}

// ---------------------------------------------------------------------------
// Status lines
// ---------------------------------------------------------------------------

/// "✓ text" in green.
pub fn success(text: &str) -> String {
    with_color(Color::Green, &format!("✓ {text}"))
}

/// "! text" in yellow.
pub fn warning(text: &str) -> String {
    with_color(Color::Yellow, &format!("! {text}"))
}

/// "✗ text" in bold red.
pub fn error(text: &str) -> String {
    format!(
        "{}{}✗ {text}{}",
        SetForegroundColor(Color::Red),
        SetAttribute(Attribute::Bold),
        SetAttribute(Attribute::Reset)
    )
}

/// Input prompt label, e.g. "you> ".
pub fn prompt(label: &str) -> String {
    format!(
        "{}{}{label}>{} ",
        SetForegroundColor(Color::Green),
        SetAttribute(Attribute::Bold),
        SetAttribute(Attribute::Reset)
    )
}
