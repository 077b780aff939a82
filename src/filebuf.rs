//! A buffered adapter over a file handle.
//!
//! `FileBuf` keeps separate input and output cursors over the same handle, so
//! a caller can append at one offset while reading from another. Both sides
//! are buffered. Before every access to the handle the relevant cursor is
//! seeked to, and after every access the cursor is taken from the offset the
//! handle reports. Counting bytes instead would drift on handles that
//! translate line endings.
//!
//! Terminals, pipes and FIFOs have no offsets. When the handle refuses the
//! initial seek with `NotSeekable`, the buffer switches to sequential mode:
//! writes go out in order, reads take whatever the handle delivers next,
//! cursors count the bytes moved, and seeking is `Unsupported`.
//!
//! The handle is borrowed or owned as `F`; `FileBuf` never opens, closes or
//! reopens anything. Passing `&File` keeps ownership with the caller.

use std::cmp;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

/// Buffer size used by `FileBuf::new`.
pub const DEFAULT_CAPACITY: usize = 128;

/// Which sides of a `FileBuf` are usable.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    pub fn reads(self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::ReadWrite)
    }

    fn covers(self, other: OpenMode) -> bool {
        (self.reads() || !other.reads()) && (self.writes() || !other.writes())
    }
}

/// Buffered reading and writing over a file handle with independent cursors.
#[derive(Debug)]
pub struct FileBuf<F: Read + Write + Seek> {
    /// Only `into_inner` takes the handle out.
    inner: Option<F>,
    mode: OpenMode,
    capacity: usize,
    seekable: bool,
    in_buf: Vec<u8>,
    /// Next unread byte in `in_buf`.
    in_start: usize,
    /// End of the valid bytes in `in_buf`.
    in_end: usize,
    /// Handle offset just past the bytes held in `in_buf`.
    in_pos: u64,
    out_buf: Vec<u8>,
    /// Handle offset the first byte of `out_buf` is written to.
    out_pos: u64,
}

fn handle_mut<F>(inner: &mut Option<F>) -> &mut F {
    match inner {
        Some(inner) => inner,
        None => unreachable!("file buffer used after its handle was taken"),
    }
}

impl<F: Read + Write + Seek> FileBuf<F> {
    /// Create a read-write buffer of `DEFAULT_CAPACITY` bytes per side.
    pub fn new(inner: F) -> io::Result<FileBuf<F>> {
        FileBuf::with_capacity(OpenMode::ReadWrite, DEFAULT_CAPACITY, inner)
    }

    /// Create a buffer with the given mode and per-side capacity.
    ///
    /// Both cursors start at offset 0 and the handle is seeked there. A
    /// handle that can't seek at all is used sequentially. A capacity of zero
    /// is rejected.
    pub fn with_capacity(
        mode: OpenMode,
        capacity: usize,
        mut inner: F,
    ) -> io::Result<FileBuf<F>> {
        if capacity == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "file buffer capacity must be greater than zero",
            ));
        }
        let seekable = match inner.seek(SeekFrom::Start(0)) {
            Ok(_) => true,
            Err(err) if err.kind() == io::ErrorKind::NotSeekable => {
                tracing::debug!(%err, "file buffer handle is sequential");
                false
            }
            Err(err) => return Err(err),
        };
        Ok(FileBuf {
            inner: Some(inner),
            mode,
            capacity,
            seekable,
            in_buf: if mode.reads() { vec![0; capacity] } else { Vec::new() },
            in_start: 0,
            in_end: 0,
            in_pos: 0,
            out_buf: if mode.writes() {
                Vec::with_capacity(capacity)
            } else {
                Vec::new()
            },
            out_pos: 0,
        })
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns false for terminals, pipes and other handles without offsets.
    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    /// The offset the next read returns data from.
    ///
    /// On handles that translate line endings, this is only exact while no
    /// input is buffered. On sequential handles it is the number of bytes
    /// consumed so far.
    pub fn input_position(&self) -> u64 {
        self.in_pos - (self.in_end - self.in_start) as u64
    }

    /// The offset the next written byte lands at, counting pending output.
    pub fn output_position(&self) -> u64 {
        self.out_pos + self.out_buf.len() as u64
    }

    /// Number of bytes left to read: buffered input plus everything between
    /// the input cursor and the end of the file.
    ///
    /// Pending output is flushed first, since it may extend the file. A
    /// sequential handle can't tell, so only buffered input counts there.
    pub fn remaining(&mut self) -> io::Result<u64> {
        self.check(OpenMode::Read)?;
        self.flush_output()?;
        let buffered = (self.in_end - self.in_start) as u64;
        if !self.seekable {
            return Ok(buffered);
        }
        Ok(buffered + self.unread_on_handle()?)
    }

    /// Moves the cursors selected by `which` and returns the new offset.
    ///
    /// Pending output is flushed and buffered input is discarded first.
    /// `SeekFrom::Current` is relative to the output cursor when `which`
    /// includes the output side, and to the input cursor otherwise.
    pub fn seek_to(&mut self, pos: SeekFrom, which: OpenMode) -> io::Result<u64> {
        self.check(which)?;
        if !self.seekable {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "file buffer handle is not seekable",
            ));
        }
        self.flush_output()?;
        self.discard_input();

        let base = if which.writes() { self.out_pos } else { self.in_pos };
        let inner = handle_mut(&mut self.inner);
        let target = match pos {
            SeekFrom::Current(offset) => {
                inner.seek(SeekFrom::Start(base))?;
                SeekFrom::Current(offset)
            }
            absolute => absolute,
        };
        let offset = inner.seek(target)?;
        if which.reads() {
            self.in_pos = offset;
        }
        if which.writes() {
            self.out_pos = offset;
        }
        tracing::trace!(offset, ?which, "file buffer seek");
        Ok(offset)
    }

    /// Gets a reference to the underlying handle.
    pub fn get_ref(&self) -> &F {
        match self.inner {
            Some(ref inner) => inner,
            None => unreachable!("file buffer used after its handle was taken"),
        }
    }

    /// Gets a mutable reference to the underlying handle.
    ///
    /// Moving the handle's own cursor is harmless: every access seeks first.
    /// Writing through it bypasses pending output.
    pub fn get_mut(&mut self) -> &mut F {
        handle_mut(&mut self.inner)
    }

    /// Flushes pending output and returns the handle.
    pub fn into_inner(mut self) -> io::Result<F> {
        self.flush_output()?;
        self.inner.take().ok_or_else(|| {
            io::Error::other("file buffer handle was already taken")
        })
    }

    fn check(&self, which: OpenMode) -> io::Result<()> {
        if self.mode.covers(which) {
            return Ok(());
        }
        let side = if which.writes() && !self.mode.writes() {
            "writing"
        } else {
            "reading"
        };
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("file buffer is not open for {side}"),
        ))
    }

    /// Drops buffered input, moving the input cursor back to the first
    /// unread byte.
    fn discard_input(&mut self) {
        self.in_pos = self.input_position();
        self.in_start = 0;
        self.in_end = 0;
    }

    /// Writes pending output at the output cursor.
    ///
    /// Whatever the handle accepted is removed from the buffer even when a
    /// later write fails, so a retry continues with the unwritten tail.
    fn flush_output(&mut self) -> io::Result<()> {
        if self.out_buf.is_empty() {
            return Ok(());
        }
        let seekable = self.seekable;
        let inner = handle_mut(&mut self.inner);
        if seekable {
            inner.seek(SeekFrom::Start(self.out_pos))?;
        }
        let mut written = 0;
        let result = loop {
            if written == self.out_buf.len() {
                break Ok(());
            }
            match inner.write(&self.out_buf[written..]) {
                Ok(0) => {
                    break Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write the buffered data",
                    ));
                }
                Ok(n) => written += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.out_buf.drain(..written);
        if seekable {
            self.out_pos = inner.stream_position()?;
            if written > 0 {
                self.discard_input();
            }
        } else {
            self.out_pos += written as u64;
        }
        result
    }

    /// Writes `buf` at the output cursor without buffering it.
    fn write_through(&mut self, buf: &[u8]) -> io::Result<usize> {
        let seekable = self.seekable;
        let inner = handle_mut(&mut self.inner);
        if !seekable {
            let n = inner.write(buf)?;
            self.out_pos += n as u64;
            return Ok(n);
        }
        inner.seek(SeekFrom::Start(self.out_pos))?;
        let n = inner.write(buf)?;
        self.out_pos = inner.stream_position()?;
        self.discard_input();
        Ok(n)
    }

    fn unread_on_handle(&mut self) -> io::Result<u64> {
        let end = handle_mut(&mut self.inner).seek(SeekFrom::End(0))?;
        Ok(end.saturating_sub(self.in_pos))
    }

    /// Refills the input buffer with one read at the input cursor.
    ///
    /// Leaves the buffer empty at end of file.
    fn underflow(&mut self) -> io::Result<()> {
        self.flush_output()?;
        self.in_start = 0;
        self.in_end = 0;
        let want = if self.seekable {
            let available = self.unread_on_handle()?;
            if available == 0 {
                return Ok(());
            }
            cmp::min(available, self.capacity as u64) as usize
        } else {
            self.capacity
        };

        let seekable = self.seekable;
        let inner = handle_mut(&mut self.inner);
        if seekable {
            inner.seek(SeekFrom::Start(self.in_pos))?;
        }
        let n = loop {
            match inner.read(&mut self.in_buf[..want]) {
                Ok(n) => break n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        };
        self.in_end = n;
        self.in_pos = if seekable {
            inner.stream_position()?
        } else {
            self.in_pos + n as u64
        };
        Ok(())
    }
}

impl<F: Read + Write + Seek> io::Write for FileBuf<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check(OpenMode::Write)?;
        if self.out_buf.len() + buf.len() > self.capacity {
            self.flush_output()?;
        }
        if buf.len() > self.capacity {
            return self.write_through(buf);
        }
        self.out_buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check(OpenMode::Write)?;
        self.flush_output()?;
        handle_mut(&mut self.inner).flush()
    }
}

impl<F: Read + Write + Seek> io::Read for FileBuf<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = {
            let available = self.fill_buf()?;
            let n = cmp::min(available.len(), buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl<F: Read + Write + Seek> io::BufRead for FileBuf<F> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.check(OpenMode::Read)?;
        if self.in_start == self.in_end {
            self.underflow()?;
        }
        Ok(&self.in_buf[self.in_start..self.in_end])
    }

    fn consume(&mut self, amt: usize) {
        self.in_start = cmp::min(self.in_start + amt, self.in_end);
    }
}

impl<F: Read + Write + Seek> io::Seek for FileBuf<F> {
    /// Moves every cursor this buffer's mode enables.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seek_to(pos, self.mode)
    }
}

impl<F: Read + Write + Seek> Drop for FileBuf<F> {
    fn drop(&mut self) {
        if self.inner.is_none() {
            return;
        }
        if let Err(err) = self.flush_output() {
            tracing::warn!(%err, "dropping file buffer with unwritten output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn zero_capacity_is_rejected() {
        let err = FileBuf::with_capacity(OpenMode::ReadWrite, 0, Cursor::new(vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn disabled_sides_are_unsupported() {
        let mut rd =
            FileBuf::with_capacity(OpenMode::Read, 8, Cursor::new(vec![])).unwrap();
        assert_eq!(rd.write(b"x").unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert_eq!(
            rd.seek_to(SeekFrom::Start(0), OpenMode::Write).unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );

        let mut wr =
            FileBuf::with_capacity(OpenMode::Write, 8, Cursor::new(vec![])).unwrap();
        let mut buf = [0; 4];
        assert_eq!(wr.read(&mut buf).unwrap_err().kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn construction_rewinds_the_handle() {
        let mut cursor = Cursor::new(b"abc".to_vec());
        cursor.set_position(2);
        let mut fb = FileBuf::new(cursor).unwrap();
        let mut s = String::new();
        fb.read_to_string(&mut s).unwrap();
        assert_eq!(s, "abc");
    }

    #[test]
    fn small_writes_stay_buffered() {
        let mut fb =
            FileBuf::with_capacity(OpenMode::ReadWrite, 4, Cursor::new(vec![])).unwrap();
        fb.write_all(b"abc").unwrap();
        assert!(fb.get_ref().get_ref().is_empty());
        assert_eq!(fb.output_position(), 3);
        fb.write_all(b"de").unwrap();
        // The first three bytes had to make room.
        assert_eq!(fb.get_ref().get_ref(), b"abc");
        fb.flush().unwrap();
        assert_eq!(fb.get_ref().get_ref(), b"abcde");
    }

    #[test]
    fn reads_see_pending_output() {
        let mut fb = FileBuf::new(Cursor::new(vec![])).unwrap();
        fb.write_all(b"pending").unwrap();
        assert_eq!(fb.remaining().unwrap(), 7);
        let mut s = String::new();
        fb.read_to_string(&mut s).unwrap();
        assert_eq!(s, "pending");
        assert_eq!(fb.remaining().unwrap(), 0);
    }

    #[test]
    fn refills_are_capped_by_capacity() {
        let mut fb =
            FileBuf::with_capacity(OpenMode::Read, 3, Cursor::new(b"abcdefg".to_vec()))
                .unwrap();
        assert_eq!(fb.fill_buf().unwrap(), b"abc");
        fb.consume(2);
        assert_eq!(fb.input_position(), 2);
        assert_eq!(fb.remaining().unwrap(), 5);
        fb.consume(1);
        assert_eq!(fb.fill_buf().unwrap(), b"def");
        fb.consume(3);
        assert_eq!(fb.fill_buf().unwrap(), b"g");
        fb.consume(1);
        assert_eq!(fb.fill_buf().unwrap(), b"");
    }

    #[test]
    fn current_seeks_follow_the_selected_cursor() {
        let mut fb = FileBuf::new(Cursor::new(b"0123456789".to_vec())).unwrap();
        fb.seek_to(SeekFrom::Start(8), OpenMode::Write).unwrap();
        fb.seek_to(SeekFrom::Start(2), OpenMode::Read).unwrap();

        assert_eq!(fb.seek_to(SeekFrom::Current(3), OpenMode::Read).unwrap(), 5);
        assert_eq!(fb.seek_to(SeekFrom::Current(-1), OpenMode::Write).unwrap(), 7);
        assert_eq!(fb.input_position(), 5);
        assert_eq!(fb.output_position(), 7);
        // Both sides jump together through `Seek`.
        assert_eq!(fb.seek(SeekFrom::End(-1)).unwrap(), 9);
        assert_eq!(fb.input_position(), 9);
        assert_eq!(fb.output_position(), 9);
    }

    #[test]
    fn into_inner_flushes() {
        let mut fb = FileBuf::new(Cursor::new(vec![])).unwrap();
        fb.write_all(b"kept").unwrap();
        let cursor = fb.into_inner().unwrap();
        assert_eq!(cursor.into_inner(), b"kept");
    }

    #[test]
    fn taken_handles_are_not_flushed_again() {
        let mut data = Cursor::new(vec![]);
        let fb = {
            let mut fb = FileBuf::new(&mut data).unwrap();
            fb.write_all(b"once").unwrap();
            fb
        };
        let handle = fb.into_inner().unwrap();
        handle.write_all(b"+").unwrap();
        assert_eq!(data.get_ref(), b"once+");
    }

    #[test]
    fn drop_flushes() {
        let mut data = Cursor::new(vec![]);
        {
            let mut fb = FileBuf::new(&mut data).unwrap();
            fb.write_all(b"on drop").unwrap();
        }
        assert_eq!(data.get_ref(), b"on drop");
    }
}
