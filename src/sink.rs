//! A `tracing-subscriber` writer that respects a stream's ANSI setting.
//!
//! Formatters are free to put escape sequences into records. When the
//! destination stream has ANSI output disabled, `AnsiSink` removes them
//! before the bytes reach it.

use std::fmt;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::Error;
use crate::escape::{self, AnsiEscape};
use crate::filebuf::{DEFAULT_CAPACITY, FileBuf, OpenMode};
use crate::{AnsiMode, AnsiStream, Color, StandardStream, Style, WriteAnsi};

/// Colors and style used to highlight one log level.
///
/// Renders as the style first, then the background, then the foreground.
///
/// The `FromStr` implementation accepts a comma separated list of
/// `fg:<color>`, `bg:<color>` and a style name, e.g. `fg:red,bold`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct LevelColor {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub style: Option<Style>,
}

impl LevelColor {
    pub const fn fg(color: Color) -> LevelColor {
        LevelColor { fg: Some(color), bg: None, style: None }
    }

    pub const fn on(self, color: Color) -> LevelColor {
        LevelColor { bg: Some(color), ..self }
    }

    pub const fn with_style(self, style: Style) -> LevelColor {
        LevelColor { style: Some(style), ..self }
    }

    /// The escapes this color consists of, in rendering order.
    pub fn escapes(&self) -> impl Iterator<Item = AnsiEscape> {
        let style = self.style.map(AnsiEscape::Style);
        let bg = self.bg.map(AnsiEscape::bg);
        let fg = self.fg.map(AnsiEscape::fg);
        style.into_iter().chain(bg).chain(fg)
    }
}

impl fmt::Display for LevelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for escape in self.escapes() {
            write!(f, "{escape}")?;
        }
        Ok(())
    }
}

impl FromStr for LevelColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<LevelColor, Error> {
        let mut color = LevelColor::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(fg) = part.strip_prefix("fg:") {
                color.fg = Some(fg.parse()?);
            } else if let Some(bg) = part.strip_prefix("bg:") {
                color.bg = Some(bg.parse()?);
            } else {
                color.style = Some(part.parse()?);
            }
        }
        Ok(color)
    }
}

/// One `LevelColor` per log level.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LevelPalette {
    pub trace: LevelColor,
    pub debug: LevelColor,
    pub info: LevelColor,
    pub warn: LevelColor,
    pub error: LevelColor,
}

impl Default for LevelPalette {
    fn default() -> LevelPalette {
        LevelPalette {
            trace: LevelColor::fg(Color::White),
            debug: LevelColor::fg(Color::Cyan),
            info: LevelColor::fg(Color::Green),
            warn: LevelColor::fg(Color::Yellow).with_style(Style::Bold),
            error: LevelColor::fg(Color::Red).with_style(Style::Bold),
        }
    }
}

impl LevelPalette {
    pub fn get(&self, level: &Level) -> LevelColor {
        match *level {
            Level::TRACE => self.trace,
            Level::DEBUG => self.debug,
            Level::INFO => self.info,
            Level::WARN => self.warn,
            Level::ERROR => self.error,
        }
    }

    pub fn set(&mut self, level: &Level, color: LevelColor) {
        let slot = match *level {
            Level::TRACE => &mut self.trace,
            Level::DEBUG => &mut self.debug,
            Level::INFO => &mut self.info,
            Level::WARN => &mut self.warn,
            Level::ERROR => &mut self.error,
        };
        *slot = color;
    }
}

/// A shared, thread-safe destination for formatted log records.
///
/// Each record is written under the stream's lock. If the stream has ANSI
/// output disabled, escape sequences are removed from the record first; a
/// record containing a broken sequence fails with `InvalidData`.
///
/// Stripping works per `write` call, so a sequence must not be split across
/// writes. `tracing-subscriber` writes each record in one call.
#[derive(Debug)]
pub struct AnsiSink<W> {
    stream: Arc<Mutex<W>>,
    auto_flush: bool,
}

impl<W> Clone for AnsiSink<W> {
    fn clone(&self) -> AnsiSink<W> {
        AnsiSink { stream: Arc::clone(&self.stream), auto_flush: self.auto_flush }
    }
}

impl<W: WriteAnsi> AnsiSink<W> {
    pub fn new(stream: W) -> AnsiSink<W> {
        AnsiSink { stream: Arc::new(Mutex::new(stream)), auto_flush: true }
    }

    /// Whether each record is flushed as soon as it is written. On by
    /// default.
    pub fn auto_flush(mut self, yes: bool) -> AnsiSink<W> {
        self.auto_flush = yes;
        self
    }

    /// Lock the stream for direct access.
    ///
    /// A panic while the lock was held doesn't make the stream unusable.
    pub fn lock(&self) -> MutexGuard<'_, W> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ansi_enabled(&self) -> bool {
        self.lock().is_ansi_enabled()
    }
}

impl AnsiSink<StandardStream> {
    pub fn stdout(mode: AnsiMode) -> AnsiSink<StandardStream> {
        AnsiSink::new(StandardStream::stdout(mode))
    }

    pub fn stderr(mode: AnsiMode) -> AnsiSink<StandardStream> {
        AnsiSink::new(StandardStream::stderr(mode))
    }
}

impl AnsiSink<AnsiStream<FileBuf<File>>> {
    /// A sink appending to `file`.
    ///
    /// Records are written after the file's current contents. `Auto` enables
    /// escapes only if the file is a terminal, which is written to in order.
    pub fn file(
        file: File,
        mode: AnsiMode,
    ) -> io::Result<AnsiSink<AnsiStream<FileBuf<File>>>> {
        let enabled = mode.resolve(&file);
        let mut buf =
            FileBuf::with_capacity(OpenMode::Write, DEFAULT_CAPACITY, file)?;
        if buf.is_seekable() {
            buf.seek(SeekFrom::End(0))?;
        }
        Ok(AnsiSink::new(AnsiStream::new(enabled, buf)))
    }
}

impl<'a, W: WriteAnsi + 'a> MakeWriter<'a> for AnsiSink<W> {
    type Writer = AnsiSinkWriter<'a, W>;

    fn make_writer(&'a self) -> Self::Writer {
        AnsiSinkWriter { stream: self.lock(), auto_flush: self.auto_flush }
    }
}

/// The writer handed out by `AnsiSink` for one record.
pub struct AnsiSinkWriter<'a, W: io::Write> {
    stream: MutexGuard<'a, W>,
    auto_flush: bool,
}

impl<W: WriteAnsi> io::Write for AnsiSinkWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stream.is_ansi_enabled() {
            return self.stream.write(buf);
        }
        // A record with a broken sequence must not reach the stream at all.
        let mut plain = Vec::with_capacity(buf.len());
        escape::strip_escapes(buf, &mut plain)?;
        self.stream.write_all(&plain)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl<W: io::Write> Drop for AnsiSinkWriter<'_, W> {
    fn drop(&mut self) {
        if self.auto_flush {
            // Nowhere to report this from inside the subscriber.
            let _ = self.stream.flush();
        }
    }
}
