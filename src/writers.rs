use crate::escape::AnsiEscape;
use crate::filebuf::{DEFAULT_CAPACITY, FileBuf, OpenMode};
use crate::terminal::StandardKind;
use crate::{AnsiMode, WriteAnsi};
use std::fs::File;
use std::io::{self, IsTerminal, Write};

/// `std::io` implements `Stdout` and `Stderr` (and their `Lock` variants) as
/// separate types, which makes it difficult to abstract over them. We use
/// some simple internal enum types to work around this.
#[derive(Debug)]
enum IoStandardStream {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

impl IoStandardStream {
    fn new(kind: StandardKind) -> IoStandardStream {
        match kind {
            StandardKind::Stdout => IoStandardStream::Stdout(io::stdout()),
            StandardKind::Stderr => IoStandardStream::Stderr(io::stderr()),
        }
    }

    fn lock(&self) -> IoStandardStreamLock<'_> {
        match *self {
            IoStandardStream::Stdout(ref s) => {
                IoStandardStreamLock::StdoutLock(s.lock())
            }
            IoStandardStream::Stderr(ref s) => {
                IoStandardStreamLock::StderrLock(s.lock())
            }
        }
    }
}

impl io::Write for IoStandardStream {
    #[inline(always)]
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        match *self {
            IoStandardStream::Stdout(ref mut s) => s.write(b),
            IoStandardStream::Stderr(ref mut s) => s.write(b),
        }
    }

    #[inline(always)]
    fn flush(&mut self) -> io::Result<()> {
        match *self {
            IoStandardStream::Stdout(ref mut s) => s.flush(),
            IoStandardStream::Stderr(ref mut s) => s.flush(),
        }
    }
}

// Same rigmarole for the locked variants of the standard streams.

#[derive(Debug)]
enum IoStandardStreamLock<'a> {
    StdoutLock(io::StdoutLock<'a>),
    StderrLock(io::StderrLock<'a>),
}

impl<'a> io::Write for IoStandardStreamLock<'a> {
    #[inline(always)]
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        match *self {
            IoStandardStreamLock::StdoutLock(ref mut s) => s.write(b),
            IoStandardStreamLock::StderrLock(ref mut s) => s.write(b),
        }
    }

    #[inline(always)]
    fn flush(&mut self) -> io::Result<()> {
        match *self {
            IoStandardStreamLock::StdoutLock(ref mut s) => s.flush(),
            IoStandardStreamLock::StderrLock(ref mut s) => s.flush(),
        }
    }
}

/// A writer that passes escape sequences through only when enabled.
///
/// Bytes written through `io::Write` always reach the underlying writer
/// unchanged. Escapes written through `WriteAnsi::write_escape` are dropped
/// while ANSI output is disabled. With ANSI enabled, the output is
/// byte-for-byte what writing the same values to the bare writer produces.
#[derive(Clone, Debug)]
pub struct AnsiStream<W> {
    wtr: W,
    enabled: bool,
}

/// An `AnsiStream` writing through a `FileBuf` over a borrowed file.
pub type AnsiFileStream<'a> = AnsiStream<FileBuf<&'a File>>;

impl<W: io::Write> AnsiStream<W> {
    /// Create a new stream with escapes explicitly turned on or off.
    pub fn new(enabled: bool, wtr: W) -> AnsiStream<W> {
        AnsiStream { wtr, enabled }
    }

    /// Create a new stream for a writer that can't tell whether it is a
    /// terminal.
    ///
    /// `Auto` therefore disables escapes. Use `AnsiStream::detect` for
    /// handles that know.
    pub fn with_mode(mode: AnsiMode, wtr: W) -> AnsiStream<W> {
        AnsiStream::new(mode == AnsiMode::Always, wtr)
    }

    /// Turn escape output on or off.
    pub fn enable_ansi(&mut self, yes: bool) {
        self.enabled = yes;
    }

    /// An in-memory stream with the same setting as this one.
    ///
    /// Useful for assembling a piece of output, then writing it to this
    /// stream in one go.
    pub fn child_buffer(&self) -> AnsiStream<Vec<u8>> {
        AnsiStream::new(self.enabled, Vec::new())
    }

    /// Consume this stream and return the inner writer.
    pub fn into_inner(self) -> W {
        self.wtr
    }

    /// Return a reference to the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.wtr
    }

    /// Return a mutable reference to the inner writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wtr
    }
}

impl<W: io::Write + IsTerminal> AnsiStream<W> {
    /// Create a new stream, resolving `Auto` from the writer itself.
    pub fn detect(mode: AnsiMode, wtr: W) -> AnsiStream<W> {
        let enabled = mode.resolve(&wtr);
        AnsiStream::new(enabled, wtr)
    }
}

impl<'a> AnsiStream<FileBuf<&'a File>> {
    /// Create a buffered, write-only stream over `file`, starting at offset 0.
    ///
    /// `Auto` enables escapes only if `file` is a terminal. Terminals and
    /// pipes can't seek and are written to in order. The file stays
    /// owned by the caller; pending output is flushed when the stream is
    /// dropped.
    pub fn file(file: &'a File, mode: AnsiMode) -> io::Result<AnsiFileStream<'a>> {
        let enabled = mode.resolve(file);
        let buf = FileBuf::with_capacity(OpenMode::Write, DEFAULT_CAPACITY, file)?;
        Ok(AnsiStream::new(enabled, buf))
    }
}

impl<W: io::Write> io::Write for AnsiStream<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.wtr.write(buf)
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.wtr.write_all(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

impl<W: io::Write> WriteAnsi for AnsiStream<W> {
    #[inline]
    fn is_ansi_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    fn write_escape(&mut self, escape: &AnsiEscape) -> io::Result<()> {
        if self.enabled {
            escape.write_to(&mut self.wtr)?;
        }
        Ok(())
    }
}

/// A standard stream for writing to stdout or stderr.
///
/// This satisfies both `io::Write` and `WriteAnsi`. Writes go straight to
/// the process's handle, which does its own line buffering.
#[derive(Debug)]
pub struct StandardStream {
    wtr: AnsiStream<IoStandardStream>,
}

/// `StandardStreamLock` is a locked reference to a `StandardStream`.
///
/// This implements the `io::Write` and `WriteAnsi` traits, and is constructed
/// via the `StandardStream::lock` method.
///
/// The lifetime `'a` refers to the lifetime of the corresponding
/// `StandardStream`.
#[derive(Debug)]
pub struct StandardStreamLock<'a> {
    wtr: AnsiStream<IoStandardStreamLock<'a>>,
}

/// Like `StandardStream`, but does buffered writing.
#[derive(Debug)]
pub struct BufferedStandardStream {
    wtr: AnsiStream<io::BufWriter<IoStandardStream>>,
}

impl StandardStream {
    /// Create a new `StandardStream` with the given mode that writes to
    /// standard output.
    pub fn stdout(mode: AnsiMode) -> StandardStream {
        StandardStream::create(StandardKind::Stdout, mode)
    }

    /// Create a new `StandardStream` with the given mode that writes to
    /// standard error.
    pub fn stderr(mode: AnsiMode) -> StandardStream {
        StandardStream::create(StandardKind::Stderr, mode)
    }

    fn create(kind: StandardKind, mode: AnsiMode) -> StandardStream {
        let enabled = mode.resolve_standard(kind);
        StandardStream { wtr: AnsiStream::new(enabled, IoStandardStream::new(kind)) }
    }

    /// Lock the underlying writer.
    ///
    /// The lock guard returned also satisfies `io::Write` and
    /// `WriteAnsi`.
    pub fn lock(&self) -> StandardStreamLock<'_> {
        let locked = self.wtr.get_ref().lock();
        StandardStreamLock { wtr: AnsiStream::new(self.wtr.enabled, locked) }
    }
}

impl BufferedStandardStream {
    /// Create a new `BufferedStandardStream` with the given mode that writes
    /// to standard output via a buffered writer.
    pub fn stdout(mode: AnsiMode) -> BufferedStandardStream {
        BufferedStandardStream::create(StandardKind::Stdout, mode)
    }

    /// Create a new `BufferedStandardStream` with the given mode that writes
    /// to standard error via a buffered writer.
    pub fn stderr(mode: AnsiMode) -> BufferedStandardStream {
        BufferedStandardStream::create(StandardKind::Stderr, mode)
    }

    fn create(kind: StandardKind, mode: AnsiMode) -> BufferedStandardStream {
        let enabled = mode.resolve_standard(kind);
        let wtr = io::BufWriter::new(IoStandardStream::new(kind));
        BufferedStandardStream { wtr: AnsiStream::new(enabled, wtr) }
    }
}

impl io::Write for StandardStream {
    #[inline]
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        self.wtr.write(b)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

impl WriteAnsi for StandardStream {
    #[inline]
    fn is_ansi_enabled(&self) -> bool {
        self.wtr.is_ansi_enabled()
    }

    #[inline]
    fn write_escape(&mut self, escape: &AnsiEscape) -> io::Result<()> {
        self.wtr.write_escape(escape)
    }
}

impl<'a> io::Write for StandardStreamLock<'a> {
    #[inline]
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        self.wtr.write(b)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

impl<'a> WriteAnsi for StandardStreamLock<'a> {
    #[inline]
    fn is_ansi_enabled(&self) -> bool {
        self.wtr.is_ansi_enabled()
    }

    #[inline]
    fn write_escape(&mut self, escape: &AnsiEscape) -> io::Result<()> {
        self.wtr.write_escape(escape)
    }
}

impl io::Write for BufferedStandardStream {
    #[inline]
    fn write(&mut self, b: &[u8]) -> io::Result<usize> {
        self.wtr.write(b)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

impl WriteAnsi for BufferedStandardStream {
    #[inline]
    fn is_ansi_enabled(&self) -> bool {
        self.wtr.is_ansi_enabled()
    }

    #[inline]
    fn write_escape(&mut self, escape: &AnsiEscape) -> io::Result<()> {
        self.wtr.write_escape(escape)
    }
}

/// The process's default output streams.
///
/// Create this once near the start of `main` and hand the streams to
/// whatever needs them. The underlying OS handles belong to the process and
/// are never closed.
#[derive(Debug)]
pub struct Terminals {
    pub out: StandardStream,
    pub err: StandardStream,
}

impl Terminals {
    /// Open stdout and stderr, resolving `mode` for each separately.
    pub fn detect(mode: AnsiMode) -> Terminals {
        Terminals {
            out: StandardStream::stdout(mode),
            err: StandardStream::stderr(mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::{BOLD, RED, RESET};
    use pretty_assertions::assert_eq;

    #[test]
    fn with_mode_treats_auto_as_disabled() {
        assert!(AnsiStream::with_mode(AnsiMode::Always, vec![]).is_ansi_enabled());
        assert!(!AnsiStream::with_mode(AnsiMode::Auto, vec![]).is_ansi_enabled());
        assert!(!AnsiStream::with_mode(AnsiMode::Never, vec![]).is_ansi_enabled());
    }

    #[test]
    fn toggling_applies_to_later_escapes() {
        let mut stream = AnsiStream::new(false, vec![]);
        stream.write_escape(&RED).unwrap();
        stream.enable_ansi(true);
        stream.write_escape(&BOLD).unwrap();
        write!(stream, "x").unwrap();
        stream.reset().unwrap();
        assert_eq!(stream.into_inner(), b"\x1b[1mx\x1b[0m");
    }

    #[test]
    fn child_buffers_inherit_the_setting() {
        let parent = AnsiStream::new(false, io::sink());
        let mut child = parent.child_buffer();
        child.write_escape(&RESET).unwrap();
        child.write_all(b"text").unwrap();
        assert!(!child.is_ansi_enabled());
        assert_eq!(child.get_ref(), b"text");
    }

    #[test]
    fn detect_on_a_regular_file() {
        let file = tempfile::tempfile().unwrap();
        let auto = AnsiStream::detect(AnsiMode::Auto, file.try_clone().unwrap());
        assert!(!auto.is_ansi_enabled());
        assert!(AnsiStream::detect(AnsiMode::Always, file).is_ansi_enabled());
    }

    #[test]
    fn never_is_never_enabled_on_standard_streams() {
        let terms = Terminals::detect(AnsiMode::Never);
        assert!(!terms.out.is_ansi_enabled());
        assert!(!terms.err.is_ansi_enabled());
        assert!(!terms.out.lock().is_ansi_enabled());
        assert!(!BufferedStandardStream::stderr(AnsiMode::Never).is_ansi_enabled());
    }
}
