//! ANSI escape sequence descriptors and their rendering.
//!
//! Every descriptor is a small `Copy` value that knows the exact bytes it
//! stands for. Rendering never depends on where the bytes end up; deciding
//! whether they should be written at all is the job of the writers.

use std::fmt::{self, Write as _};
use std::io::{self, Write as _};

use crate::error::{Error, Result};
use crate::types::{Color, ColorTarget, Style};

const ESC: u8 = 0x1B;
const CSI: &str = "\x1B[";

/// A single escape sequence or control character.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AnsiEscape {
    /// Set the foreground or background color.
    Color(ColorTarget, Color),
    /// Apply a text style.
    Style(Style),
    /// Move the cursor.
    Cursor(CursorMove),
    /// Erase part of the screen or the current line.
    Erase(Erase),
    /// A plain ASCII control character.
    Control(ControlChar),
}

/// The broad category an escape belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EscapeKind {
    /// Changes how subsequent text looks.
    TextStyle,
    /// Acts on the terminal itself.
    TerminalControl,
}

/// Cursor movements. Counts and coordinates are passed to the terminal as
/// given; terminals treat 0 like 1.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CursorMove {
    Up(u16),
    Down(u16),
    Right(u16),
    Left(u16),
    /// Absolute column on the current line, starting at 1.
    ToColumn(u16),
    /// Absolute position, starting at `1;1` in the upper left corner.
    To { line: u16, column: u16 },
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Erase {
    /// The whole screen.
    Screen,
    CursorToLineEnd,
    LineStartToCursor,
    /// The whole current line.
    Line,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ControlChar {
    Bell,
    Backspace,
    CarriageReturn,
}

impl ControlChar {
    fn as_char(self) -> char {
        match self {
            ControlChar::Bell => '\x07',
            ControlChar::Backspace => '\x08',
            ControlChar::CarriageReturn => '\r',
        }
    }
}

impl AnsiEscape {
    /// A foreground color.
    pub const fn fg(color: Color) -> AnsiEscape {
        AnsiEscape::Color(ColorTarget::Foreground, color)
    }

    /// A background color.
    pub const fn bg(color: Color) -> AnsiEscape {
        AnsiEscape::Color(ColorTarget::Background, color)
    }

    pub const fn style(style: Style) -> AnsiEscape {
        AnsiEscape::Style(style)
    }

    pub const fn cursor(movement: CursorMove) -> AnsiEscape {
        AnsiEscape::Cursor(movement)
    }

    /// Returns whether this escape styles text or controls the terminal.
    pub fn kind(&self) -> EscapeKind {
        match self {
            AnsiEscape::Color(..) | AnsiEscape::Style(_) => EscapeKind::TextStyle,
            AnsiEscape::Cursor(_)
            | AnsiEscape::Erase(_)
            | AnsiEscape::Control(_) => EscapeKind::TerminalControl,
        }
    }

    /// Writes the bytes of this escape to `wtr`.
    pub fn write_to<W: io::Write + ?Sized>(&self, wtr: &mut W) -> io::Result<()> {
        write!(wtr, "{self}")
    }

    /// Returns the bytes of this escape.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for AnsiEscape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AnsiEscape::Color(target, color) => write_color(f, target, color),
            AnsiEscape::Style(style) => write!(f, "{CSI}{}m", style.code()),
            AnsiEscape::Cursor(movement) => match movement {
                CursorMove::Up(n) => write!(f, "{CSI}{n}A"),
                CursorMove::Down(n) => write!(f, "{CSI}{n}B"),
                CursorMove::Right(n) => write!(f, "{CSI}{n}C"),
                CursorMove::Left(n) => write!(f, "{CSI}{n}D"),
                CursorMove::ToColumn(column) => write!(f, "{CSI}{column}G"),
                CursorMove::To { line, column } => {
                    write!(f, "{CSI}{line};{column}H")
                }
            },
            AnsiEscape::Erase(erase) => {
                let (n, letter) = match erase {
                    Erase::Screen => (2, 'J'),
                    Erase::CursorToLineEnd => (0, 'K'),
                    Erase::LineStartToCursor => (1, 'K'),
                    Erase::Line => (2, 'K'),
                };
                write!(f, "{CSI}{n}{letter}")
            }
            AnsiEscape::Control(ch) => f.write_char(ch.as_char()),
        }
    }
}

fn write_color(
    f: &mut fmt::Formatter<'_>,
    target: ColorTarget,
    color: Color,
) -> fmt::Result {
    let base = target.base();
    let code = match color {
        Color::Black => 0,
        Color::Red => 1,
        Color::Green => 2,
        Color::Yellow => 3,
        Color::Blue => 4,
        Color::Magenta => 5,
        Color::Cyan => 6,
        Color::White => 7,
        Color::Default => 9,
        Color::Ansi256(n) => return write!(f, "{CSI}{base}8;5;{n}m"),
        Color::Rgb(r, g, b) => return write!(f, "{CSI}{base}8;2;{r};{g};{b}m"),
    };
    write!(f, "{CSI}{base}{code}m")
}

pub const BLACK: AnsiEscape = AnsiEscape::fg(Color::Black);
pub const RED: AnsiEscape = AnsiEscape::fg(Color::Red);
pub const GREEN: AnsiEscape = AnsiEscape::fg(Color::Green);
pub const YELLOW: AnsiEscape = AnsiEscape::fg(Color::Yellow);
pub const BLUE: AnsiEscape = AnsiEscape::fg(Color::Blue);
pub const MAGENTA: AnsiEscape = AnsiEscape::fg(Color::Magenta);
pub const CYAN: AnsiEscape = AnsiEscape::fg(Color::Cyan);
pub const WHITE: AnsiEscape = AnsiEscape::fg(Color::White);
pub const DEFAULT_FG: AnsiEscape = AnsiEscape::fg(Color::Default);

pub const ON_BLACK: AnsiEscape = AnsiEscape::bg(Color::Black);
pub const ON_RED: AnsiEscape = AnsiEscape::bg(Color::Red);
pub const ON_GREEN: AnsiEscape = AnsiEscape::bg(Color::Green);
pub const ON_YELLOW: AnsiEscape = AnsiEscape::bg(Color::Yellow);
pub const ON_BLUE: AnsiEscape = AnsiEscape::bg(Color::Blue);
pub const ON_MAGENTA: AnsiEscape = AnsiEscape::bg(Color::Magenta);
pub const ON_CYAN: AnsiEscape = AnsiEscape::bg(Color::Cyan);
pub const ON_WHITE: AnsiEscape = AnsiEscape::bg(Color::White);
pub const ON_DEFAULT: AnsiEscape = AnsiEscape::bg(Color::Default);

pub const RESET: AnsiEscape = AnsiEscape::style(Style::Reset);
pub const BOLD: AnsiEscape = AnsiEscape::style(Style::Bold);
pub const FAINT: AnsiEscape = AnsiEscape::style(Style::Faint);
pub const ITALIC: AnsiEscape = AnsiEscape::style(Style::Italic);
pub const UNDERLINE: AnsiEscape = AnsiEscape::style(Style::Underline);
pub const SWAP_COLORS: AnsiEscape = AnsiEscape::style(Style::SwapColors);
pub const CROSSED: AnsiEscape = AnsiEscape::style(Style::Crossed);

pub const ERASE_SCREEN: AnsiEscape = AnsiEscape::Erase(Erase::Screen);
pub const ERASE_LINE: AnsiEscape = AnsiEscape::Erase(Erase::Line);
pub const ERASE_TO_LINE_END: AnsiEscape =
    AnsiEscape::Erase(Erase::CursorToLineEnd);
pub const ERASE_FROM_LINE_START: AnsiEscape =
    AnsiEscape::Erase(Erase::LineStartToCursor);

pub const BELL: AnsiEscape = AnsiEscape::Control(ControlChar::Bell);
pub const BACKSPACE: AnsiEscape = AnsiEscape::Control(ControlChar::Backspace);
pub const CARRIAGE_RETURN: AnsiEscape =
    AnsiEscape::Control(ControlChar::CarriageReturn);

/// Wraps `text` in a foreground and a background color.
///
/// With `reset_after`, both colors are put back to the terminal defaults
/// after the text.
pub fn color_output(text: &str, fg: Color, bg: Color, reset_after: bool) -> String {
    let mut out = format!("{}{}{text}", AnsiEscape::fg(fg), AnsiEscape::bg(bg));
    if reset_after {
        let _ = write!(out, "{DEFAULT_FG}{ON_DEFAULT}");
    }
    out
}

/// Wraps `text` in a foreground color.
pub fn color_fg(text: &str, fg: Color, reset_after: bool) -> String {
    colored(text, ColorTarget::Foreground, fg, reset_after)
}

/// Wraps `text` in a background color.
pub fn color_bg(text: &str, bg: Color, reset_after: bool) -> String {
    colored(text, ColorTarget::Background, bg, reset_after)
}

fn colored(text: &str, target: ColorTarget, color: Color, reset_after: bool) -> String {
    let mut out = format!("{}{text}", AnsiEscape::Color(target, color));
    if reset_after {
        let _ = write!(out, "{}", AnsiEscape::Color(target, Color::Default));
    }
    out
}

/// Prefixes `text` with every style in `styles`, in order.
///
/// With `reset_after`, a full reset follows the text. Note that this also
/// resets colors.
pub fn modify(text: &str, styles: &[Style], reset_after: bool) -> String {
    let mut out = String::with_capacity(text.len() + styles.len() * 4 + 4);
    for &style in styles {
        let _ = write!(out, "{}", AnsiEscape::Style(style));
    }
    out.push_str(text);
    if reset_after {
        let _ = write!(out, "{RESET}");
    }
    out
}

/// Colors each character of `text` with an RGB value interpolated between
/// `first` and `last`.
///
/// The first character gets exactly `first` and the last exactly `last`.
/// With `reset_after`, the target's default color follows the text.
pub fn text_gradient(
    text: &str,
    target: ColorTarget,
    first: (u8, u8, u8),
    last: (u8, u8, u8),
    reset_after: bool,
) -> String {
    let count = text.chars().count();
    let steps = count.saturating_sub(1).max(1) as f32;
    let lerp = |from: u8, to: u8, i: usize| -> u8 {
        let t = i as f32 / steps;
        (f32::from(from) + (f32::from(to) - f32::from(from)) * t).round() as u8
    };

    let mut out = String::new();
    for (i, ch) in text.chars().enumerate() {
        let color = Color::Rgb(
            lerp(first.0, last.0, i),
            lerp(first.1, last.1, i),
            lerp(first.2, last.2, i),
        );
        let _ = write!(out, "{}{ch}", AnsiEscape::Color(target, color));
    }
    if reset_after {
        let _ = write!(out, "{}", AnsiEscape::Color(target, Color::Default));
    }
    out
}

/// Returns true if `bytes` contains an escape character.
pub fn contains_escape(bytes: &[u8]) -> bool {
    bytes.contains(&ESC)
}

/// Copies `input` to `out` with every CSI sequence removed.
///
/// A CSI sequence is `ESC [`, any number of parameter bytes (`0x30..=0x3F`),
/// any number of intermediate bytes (`0x20..=0x2F`) and one final byte
/// (`0x40..=0x7E`). An escape character that does not start a complete
/// sequence of that shape is reported as `Error::MalformedEscape`, and
/// nothing after it is written.
pub fn strip_escapes<W: io::Write + ?Sized>(input: &[u8], out: &mut W) -> Result<()> {
    let mut start = 0;
    while let Some(found) = input[start..].iter().position(|&b| b == ESC) {
        let at = start + found;
        out.write_all(&input[start..at])?;
        start = csi_end(input, at).ok_or_else(|| Error::MalformedEscape {
            offset: at,
            text: String::from_utf8_lossy(input).into_owned(),
        })?;
    }
    out.write_all(&input[start..])?;
    Ok(())
}

/// Returns the index one past the CSI sequence starting at `at`.
fn csi_end(input: &[u8], at: usize) -> Option<usize> {
    if input.get(at + 1) != Some(&b'[') {
        return None;
    }
    let mut i = at + 2;
    while matches!(input.get(i), Some(0x30..=0x3F)) {
        i += 1;
    }
    while matches!(input.get(i), Some(0x20..=0x2F)) {
        i += 1;
    }
    match input.get(i) {
        Some(0x40..=0x7E) => Some(i + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stripped(input: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![];
        strip_escapes(input, &mut out)?;
        Ok(out)
    }

    #[test]
    fn named_colors() {
        assert_eq!(RED.to_string(), "\x1b[31m");
        assert_eq!(ON_RED.to_string(), "\x1b[41m");
        assert_eq!(DEFAULT_FG.to_string(), "\x1b[39m");
        assert_eq!(ON_DEFAULT.to_string(), "\x1b[49m");
        assert_eq!(RESET.to_bytes(), b"\x1b[0m");
    }

    #[test]
    fn extended_colors() {
        assert_eq!(AnsiEscape::fg(Color::Ansi256(200)).to_string(), "\x1b[38;5;200m");
        assert_eq!(
            AnsiEscape::bg(Color::Rgb(1, 2, 3)).to_string(),
            "\x1b[48;2;1;2;3m"
        );
    }

    #[test]
    fn styles() {
        assert_eq!(BOLD.to_string(), "\x1b[1m");
        assert_eq!(AnsiEscape::style(Style::AlternateFont(2)).to_string(), "\x1b[12m");
        assert_eq!(AnsiEscape::style(Style::DoubleUnderline).to_string(), "\x1b[21m");
    }

    #[test]
    fn cursor_and_erase() {
        assert_eq!(AnsiEscape::cursor(CursorMove::Up(3)).to_string(), "\x1b[3A");
        assert_eq!(AnsiEscape::cursor(CursorMove::Left(1)).to_string(), "\x1b[1D");
        assert_eq!(AnsiEscape::cursor(CursorMove::ToColumn(7)).to_string(), "\x1b[7G");
        assert_eq!(
            AnsiEscape::cursor(CursorMove::To { line: 4, column: 10 }).to_string(),
            "\x1b[4;10H"
        );
        assert_eq!(ERASE_SCREEN.to_string(), "\x1b[2J");
        assert_eq!(ERASE_TO_LINE_END.to_string(), "\x1b[0K");
        assert_eq!(ERASE_FROM_LINE_START.to_string(), "\x1b[1K");
        assert_eq!(ERASE_LINE.to_string(), "\x1b[2K");
    }

    #[test]
    fn control_chars() {
        assert_eq!(BELL.to_bytes(), b"\x07");
        assert_eq!(BACKSPACE.to_bytes(), b"\x08");
        assert_eq!(CARRIAGE_RETURN.to_bytes(), b"\r");
    }

    #[test]
    fn kinds() {
        assert_eq!(RED.kind(), EscapeKind::TextStyle);
        assert_eq!(BOLD.kind(), EscapeKind::TextStyle);
        assert_eq!(ERASE_LINE.kind(), EscapeKind::TerminalControl);
        assert_eq!(BELL.kind(), EscapeKind::TerminalControl);
    }

    #[test]
    fn write_to_matches_display() {
        let mut buf = vec![];
        ON_CYAN.write_to(&mut buf).unwrap();
        assert_eq!(buf, ON_CYAN.to_bytes());
    }

    #[test]
    fn helpers() {
        assert_eq!(
            color_output("hi", Color::Red, Color::Black, true),
            "\x1b[31m\x1b[40mhi\x1b[39m\x1b[49m"
        );
        assert_eq!(color_fg("hi", Color::Green, false), "\x1b[32mhi");
        assert_eq!(color_bg("hi", Color::Blue, true), "\x1b[44mhi\x1b[49m");
        assert_eq!(
            modify("x", &[Style::Bold, Style::Underline], true),
            "\x1b[1m\x1b[4mx\x1b[0m"
        );
    }

    #[test]
    fn gradient_hits_both_ends() {
        let out = text_gradient(
            "abc",
            ColorTarget::Foreground,
            (0, 0, 0),
            (200, 100, 10),
            true,
        );
        assert_eq!(
            out,
            "\x1b[38;2;0;0;0ma\x1b[38;2;100;50;5mb\x1b[38;2;200;100;10mc\x1b[39m"
        );
        let single =
            text_gradient("z", ColorTarget::Background, (9, 9, 9), (0, 0, 0), false);
        assert_eq!(single, "\x1b[48;2;9;9;9mz");
        assert_eq!(
            text_gradient("", ColorTarget::Foreground, (0, 0, 0), (1, 1, 1), false),
            ""
        );
    }

    #[test]
    fn strip_removes_sequences() {
        let input = b"\x1b[1m\x1b[31mERROR\x1b[0m plain \x1b[38;2;1;2;3mrgb\x1b[2K";
        assert_eq!(stripped(input).unwrap(), b"ERROR plain rgb");
        assert_eq!(stripped(b"no escapes").unwrap(), b"no escapes");
        assert!(!contains_escape(b"no escapes"));
        assert!(contains_escape(input));
    }

    #[test]
    fn strip_rejects_malformed() {
        match stripped(b"ok \x1b[31") {
            Err(Error::MalformedEscape { offset, .. }) => assert_eq!(offset, 3),
            other => panic!("expected malformed escape, got {other:?}"),
        }
        assert!(stripped(b"lone \x1b here").is_err());
        assert!(stripped(b"\x1b").is_err());
    }
}
