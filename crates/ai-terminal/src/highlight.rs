//! Fenced code block highlighting via syntect.

use std::fmt::Write;
use std::sync::LazyLock;

use crossterm::style::{Attribute, Color, SetAttribute, SetForegroundColor};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, ThemeSet};
use syntect::parsing::SyntaxSet;

const THEME_NAME: &str = "base16-ocean.dark";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Highlighter state for one open code block. Lines must be fed in order,
/// since multi-line constructs (strings, comments) carry over.
pub struct CodeBlock {
    language: String,
    lines: Option<HighlightLines<'static>>,
}

impl CodeBlock {
    /// Open a block for the fence's info string (`rust`, `py`, `sh`, ...).
    /// Unknown languages are highlighted as plain text.
    pub fn open(language: &str) -> Self {
        let syntaxes: &'static SyntaxSet = &SYNTAXES;
        let token = language.split_whitespace().next().unwrap_or("");
        let syntax = syntaxes
            .find_syntax_by_token(token)
            .unwrap_or_else(|| syntaxes.find_syntax_plain_text());
        let themes: &'static ThemeSet = &THEMES;
        let theme = themes
            .themes
            .get(THEME_NAME)
            .or_else(|| themes.themes.values().next());

        Self {
            language: token.to_string(),
            lines: theme.map(|theme| HighlightLines::new(syntax, theme)),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Highlight one line (without its newline) into an ANSI string.
    pub fn highlight(&mut self, line: &str) -> String {
        let Some(lines) = self.lines.as_mut() else {
            return line.to_string();
        };
        let with_newline = format!("{line}\n");
        match lines.highlight_line(&with_newline, &SYNTAXES) {
            Ok(ranges) => ranges_to_ansi(&ranges),
            Err(e) => {
                tracing::debug!("Highlighting failed, falling back to plain text: {e}");
                self.lines = None;
                line.to_string()
            }
        }
    }
}

fn ranges_to_ansi(ranges: &[(Style, &str)]) -> String {
    let mut out = String::new();
    for (style, text) in ranges {
        let text = text.trim_end_matches('\n');
        if text.is_empty() {
            continue;
        }
        let fg = style.foreground;
        let _ = write!(
            out,
            "{}",
            SetForegroundColor(Color::Rgb {
                r: fg.r,
                g: fg.g,
                b: fg.b
            })
        );
        if style.font_style.contains(FontStyle::BOLD) {
            let _ = write!(out, "{}", SetAttribute(Attribute::Bold));
        }
        if style.font_style.contains(FontStyle::ITALIC) {
            let _ = write!(out, "{}", SetAttribute(Attribute::Italic));
        }
        let _ = write!(out, "{text}{}", SetAttribute(Attribute::Reset));
    }
    out
}
