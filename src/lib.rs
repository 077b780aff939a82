//! ANSI-aware terminal streams, a buffered file adapter and `tracing` sinks.
//!
//! Escape sequences are plain values (`AnsiEscape`) that render to exact
//! bytes. Writers implementing `WriteAnsi` decide whether those bytes reach
//! their destination, based on an `AnsiMode` resolved once at construction.
//!
//! ```no_run
//! use std::io::Write;
//! use termlog::{AnsiMode, Terminals, WriteAnsi, escape};
//!
//! let mut terms = Terminals::detect(AnsiMode::Auto);
//! terms.out.write_escape(&escape::RED)?;
//! write!(terms.out, "only red on a terminal")?;
//! terms.out.reset()?;
//! writeln!(terms.out)?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! Logging goes through `tracing`. `init_logging` installs a subscriber whose
//! records are highlighted by level and stripped of escapes when the output
//! can't show them.

pub mod escape;
mod error;
pub mod filebuf;
mod format;
mod logger;
mod sink;
pub mod terminal;
mod traits;
mod types;
mod writers;

// Re-export core traits and types
pub use error::{Error, Result};
pub use escape::{AnsiEscape, ControlChar, CursorMove, Erase, EscapeKind};
pub use filebuf::{FileBuf, OpenMode};
pub use format::{AnsiEventFormatter, LogFormat, SEPARATOR_WIDTH};
pub use logger::{
    COLOR_ENV, FORMAT_ENV, LEVEL_ENV, LogOutput, LoggerConfig, Message,
    Verbosity, check, init_logging, subscriber,
};
pub use sink::{AnsiSink, AnsiSinkWriter, LevelColor, LevelPalette};
pub use terminal::StandardKind;
pub use traits::WriteAnsi;
pub use types::{
    AnsiMode, AnsiModeParseError, Color, ColorTarget, ParseColorError,
    ParseStyleError, Style,
};
pub use writers::{
    AnsiFileStream, AnsiStream, BufferedStandardStream, StandardStream,
    StandardStreamLock, Terminals,
};
