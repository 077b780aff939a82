use crate::escape::{AnsiEscape, RESET};
use std::io;

/// This trait describes writers that may or may not pass escape sequences
/// through to their destination.
pub trait WriteAnsi: io::Write {
    /// Returns true if and only if escape sequences written with
    /// `write_escape` reach the underlying writer.
    fn is_ansi_enabled(&self) -> bool;

    /// Write an escape sequence.
    ///
    /// When escapes are disabled this writes nothing and succeeds. Otherwise
    /// the exact bytes of `escape` are written.
    fn write_escape(&mut self, escape: &AnsiEscape) -> io::Result<()> {
        if self.is_ansi_enabled() {
            escape.write_to(self)?;
        }
        Ok(())
    }

    /// Reset colors and styles to the terminal defaults.
    ///
    /// This is `write_escape(&RESET)`, so it is silent on disabled writers.
    fn reset(&mut self) -> io::Result<()> {
        self.write_escape(&RESET)
    }
}

impl<T: ?Sized + WriteAnsi> WriteAnsi for &mut T {
    fn is_ansi_enabled(&self) -> bool {
        (**self).is_ansi_enabled()
    }
    fn write_escape(&mut self, escape: &AnsiEscape) -> io::Result<()> {
        (**self).write_escape(escape)
    }
    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }
}

impl<T: ?Sized + WriteAnsi> WriteAnsi for Box<T> {
    fn is_ansi_enabled(&self) -> bool {
        (**self).is_ansi_enabled()
    }
    fn write_escape(&mut self, escape: &AnsiEscape) -> io::Result<()> {
        (**self).write_escape(escape)
    }
    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }
}

impl WriteAnsi for io::Sink {
    fn is_ansi_enabled(&self) -> bool {
        false
    }
}

impl WriteAnsi for Vec<u8> {
    fn is_ansi_enabled(&self) -> bool {
        false
    }
}
