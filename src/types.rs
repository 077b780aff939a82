use std::io::IsTerminal;
use std::str::FromStr;

use thiserror::Error;

use crate::terminal::{self, StandardKind};

/// AnsiMode decides whether escape sequences are emitted by a stream.
///
/// The `Default` implementation for this type will select `Auto`, which tries
/// to do the right thing based on where the stream ends up.
///
/// The `FromStr` implementation for this type converts a lowercase string of
/// the variant name to the corresponding variant. `automatic` is accepted as
/// an alias of `auto`. Any other string results in an error.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum AnsiMode {
    /// Always emit escape sequences, even when writing to a regular file.
    Always,
    /// Emit escape sequences only when the destination is a terminal that
    /// understands them. `TERM=dumb` or a defined `NO_COLOR` turn them off.
    #[default]
    Auto,
    /// Never emit escape sequences.
    Never,
}

impl FromStr for AnsiMode {
    type Err = AnsiModeParseError;

    fn from_str(s: &str) -> Result<AnsiMode, AnsiModeParseError> {
        match s.to_lowercase().as_str() {
            "always" => Ok(AnsiMode::Always),
            "auto" | "automatic" => Ok(AnsiMode::Auto),
            "never" => Ok(AnsiMode::Never),
            unknown => Err(AnsiModeParseError {
                unknown_mode: unknown.to_string(),
            }),
        }
    }
}

impl AnsiMode {
    /// Resolves this mode for the given handle.
    ///
    /// `Auto` asks the handle whether it is a terminal and then checks the
    /// environment.
    pub fn resolve<T: IsTerminal + ?Sized>(&self, handle: &T) -> bool {
        match *self {
            AnsiMode::Always => true,
            AnsiMode::Never => false,
            AnsiMode::Auto => terminal::supports_ansi(handle),
        }
    }

    /// Resolves this mode for one of the process's standard streams.
    ///
    /// On Windows, this also attempts to switch the console into virtual
    /// terminal mode whenever escapes may be emitted.
    pub fn resolve_standard(&self, kind: StandardKind) -> bool {
        match *self {
            AnsiMode::Always => {
                terminal::enable_virtual_terminal(kind);
                true
            }
            AnsiMode::Never => false,
            AnsiMode::Auto => terminal::standard_supports_ansi(kind),
        }
    }
}

/// An error that occurs when parsing an `AnsiMode` fails.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error(
    "unrecognized ansi mode '{unknown_mode}': valid modes are: \
     always, auto, never"
)]
pub struct AnsiModeParseError {
    unknown_mode: String,
}

impl AnsiModeParseError {
    /// Return the string that couldn't be parsed as a valid mode.
    pub fn invalid_mode(&self) -> &str {
        &self.unknown_mode
    }
}

/// Which part of a character cell a color applies to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ColorTarget {
    /// The glyph itself (SGR 30-39).
    Foreground,
    /// The cell behind the glyph (SGR 40-49).
    Background,
}

impl ColorTarget {
    /// The tens digit shared by every SGR color code for this target.
    pub(crate) fn base(self) -> u8 {
        match self {
            ColorTarget::Foreground => 3,
            ColorTarget::Background => 4,
        }
    }
}

/// The set of available colors for the terminal foreground/background.
///
/// This type has a `FromStr` impl that can parse colors from their human
/// readable form. The format is as follows:
///
/// 1. Any of the explicitly listed colors in English, or `default`. They are
///    matched case insensitively.
/// 2. A single 8-bit integer, in either decimal or hexadecimal format.
/// 3. A triple of 8-bit integers separated by a comma, where each integer is
///    in decimal or hexadecimal format.
///
/// Hexadecimal numbers are written with a `0x` prefix.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    /// The terminal's own default color.
    Default,
    Ansi256(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Parses a numeric color string, either ANSI or RGB.
    fn from_str_numeric(s: &str) -> Result<Color, ParseColorError> {
        // The "ansi256" format is a single number (decimal or hex)
        // corresponding to one of 256 colors.
        //
        // The "rgb" format is a triple of numbers (decimal or hex) delimited
        // by a comma corresponding to one of 256^3 colors.

        fn parse_number(s: &str) -> Option<u8> {
            let s = s.trim();
            if let Some(hex_str) = s.strip_prefix("0x") {
                u8::from_str_radix(hex_str, 16).ok()
            } else {
                s.parse::<u8>().ok()
            }
        }

        let codes: Vec<&str> = s.split(',').collect();
        match codes.len() {
            1 => match parse_number(codes[0]) {
                Some(n) => Ok(Color::Ansi256(n)),
                None if s.chars().all(|c| c.is_ascii_hexdigit()) => {
                    Err(ParseColorError::InvalidAnsi256(s.to_string()))
                }
                None => Err(ParseColorError::InvalidName(s.to_string())),
            },
            3 => {
                let invalid = || ParseColorError::InvalidRgb(s.to_string());
                let r = parse_number(codes[0]).ok_or_else(invalid)?;
                let g = parse_number(codes[1]).ok_or_else(invalid)?;
                let b = parse_number(codes[2]).ok_or_else(invalid)?;
                Ok(Color::Rgb(r, g, b))
            }
            _ => Err(ParseColorError::InvalidRgb(s.to_string())),
        }
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Color, ParseColorError> {
        match &*s.to_lowercase() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),
            "default" => Ok(Color::Default),
            _ => Color::from_str_numeric(s),
        }
    }
}

/// An error from parsing an invalid color.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseColorError {
    /// Not one of the known color names.
    #[error(
        "unrecognized color name '{0}'. Choose from: black, red, green, \
         yellow, blue, magenta, cyan, white, default"
    )]
    InvalidName(String),
    /// Looked like a number but didn't fit in 8 bits.
    #[error(
        "unrecognized ansi256 color number, should be '[0-255]' \
         (or a hex number), but is '{0}'"
    )]
    InvalidAnsi256(String),
    /// Comma separated, but not three valid 8-bit components.
    #[error(
        "unrecognized RGB color triple, should be \
         '[0-255],[0-255],[0-255]' (or a hex triple), but is '{0}'"
    )]
    InvalidRgb(String),
}

impl ParseColorError {
    /// Return the string that couldn't be parsed as a valid color.
    pub fn invalid(&self) -> &str {
        match self {
            ParseColorError::InvalidName(s)
            | ParseColorError::InvalidAnsi256(s)
            | ParseColorError::InvalidRgb(s) => s,
        }
    }
}

/// Text styles expressed through Select Graphic Rendition.
///
/// Only `Reset`, `Bold`, `Underline`, `SwapColors` and `Crossed` are
/// supported nearly everywhere. The rest depend on the terminal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Style {
    /// Complete reset, colors included.
    Reset,
    Bold,
    Faint,
    Italic,
    Underline,
    SlowBlink,
    FastBlink,
    /// Inverse the foreground and background colors.
    SwapColors,
    Conceal,
    Crossed,
    DefaultFont,
    /// One of the nine alternate fonts, `1..=9`. Other values are not
    /// checked and produce whatever code they map to.
    AlternateFont(u8),
    Gothic,
    DoubleUnderline,
}

impl Style {
    /// The SGR parameter for this style.
    pub fn code(self) -> u8 {
        match self {
            Style::Reset => 0,
            Style::Bold => 1,
            Style::Faint => 2,
            Style::Italic => 3,
            Style::Underline => 4,
            Style::SlowBlink => 5,
            Style::FastBlink => 6,
            Style::SwapColors => 7,
            Style::Conceal => 8,
            Style::Crossed => 9,
            Style::DefaultFont => 10,
            Style::AlternateFont(n) => 10u8.wrapping_add(n),
            Style::Gothic => 20,
            Style::DoubleUnderline => 21,
        }
    }
}

impl FromStr for Style {
    type Err = ParseStyleError;

    fn from_str(s: &str) -> Result<Style, ParseStyleError> {
        let style = match &*s.to_lowercase() {
            "reset" => Style::Reset,
            "bold" => Style::Bold,
            "faint" | "dimmed" => Style::Faint,
            "italic" => Style::Italic,
            "underline" => Style::Underline,
            "slow-blink" => Style::SlowBlink,
            "fast-blink" => Style::FastBlink,
            "swap-colors" | "inverse" => Style::SwapColors,
            "conceal" => Style::Conceal,
            "crossed" | "strikethrough" => Style::Crossed,
            "default-font" => Style::DefaultFont,
            "gothic" => Style::Gothic,
            "double-underline" => Style::DoubleUnderline,
            other => match other.strip_prefix("font") {
                Some(n) => match n.parse::<u8>() {
                    Ok(n @ 1..=9) => Style::AlternateFont(n),
                    _ => return Err(ParseStyleError(s.to_string())),
                },
                None => return Err(ParseStyleError(s.to_string())),
            },
        };
        Ok(style)
    }
}

/// An error from parsing an unknown style name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unrecognized style '{0}'")]
pub struct ParseStyleError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("ALWAYS".parse::<AnsiMode>(), Ok(AnsiMode::Always));
        assert_eq!("automatic".parse::<AnsiMode>(), Ok(AnsiMode::Auto));
        assert_eq!("never".parse::<AnsiMode>(), Ok(AnsiMode::Never));
        let err = "sometimes".parse::<AnsiMode>().unwrap_err();
        assert_eq!(err.invalid_mode(), "sometimes");
    }

    #[test]
    fn default_mode_is_auto() {
        assert_eq!(AnsiMode::default(), AnsiMode::Auto);
    }

    #[test]
    fn fixed_modes_ignore_the_handle() {
        let file = tempfile::tempfile().unwrap();
        assert!(AnsiMode::Always.resolve(&file));
        assert!(!AnsiMode::Never.resolve(&file));
        // A regular file is never a terminal.
        assert!(!AnsiMode::Auto.resolve(&file));
    }

    #[test]
    fn colors_parse() {
        assert_eq!("Red".parse::<Color>(), Ok(Color::Red));
        assert_eq!("default".parse::<Color>(), Ok(Color::Default));
        assert_eq!("0x1f".parse::<Color>(), Ok(Color::Ansi256(31)));
        assert_eq!("1, 2,0xff".parse::<Color>(), Ok(Color::Rgb(1, 2, 255)));
    }

    #[test]
    fn color_errors_keep_their_input() {
        assert_eq!(
            "256".parse::<Color>(),
            Err(ParseColorError::InvalidAnsi256("256".to_string()))
        );
        assert_eq!(
            "mauve".parse::<Color>(),
            Err(ParseColorError::InvalidName("mauve".to_string()))
        );
        let err = "1,2".parse::<Color>().unwrap_err();
        assert_eq!(err, ParseColorError::InvalidRgb("1,2".to_string()));
        assert_eq!(err.invalid(), "1,2");
    }

    #[test]
    fn style_codes() {
        assert_eq!(Style::Reset.code(), 0);
        assert_eq!(Style::Crossed.code(), 9);
        assert_eq!(Style::AlternateFont(3).code(), 13);
        assert_eq!("font9".parse::<Style>(), Ok(Style::AlternateFont(9)));
        assert!("font0".parse::<Style>().is_err());
        assert_eq!("strikethrough".parse::<Style>(), Ok(Style::Crossed));
    }
}
