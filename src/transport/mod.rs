//! # Byte sources and sinks
//!
//! Blocks are written to a [`BlockSink`], an [`io::Write`] that can report
//! whether it was closed cleanly, and read from any [`BlockSource`], a
//! [`Read`] that may also be able to skip forward without reading. Files,
//! in-memory cursors, standard input and the output of a child process all
//! qualify; [`pipe`] opens (possibly compressed) files by name.

pub mod block;
pub mod pipe;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Stdin, Stdout, Write},
    process::{ChildStdin, ChildStdout},
    sync::{Arc, Mutex},
};

/// Where top-level blocks are read from.
pub trait BlockSource: Read {
    /// Skip up to `n` bytes without reading them, returning how many were
    /// skipped. The caller reads and discards whatever is left.
    fn seek_forward(&mut self, _n: u64) -> io::Result<u64> { Ok(0) }
}

/// Regular files seek; pipes and devices opened as files do not.
impl BlockSource for File {
    fn seek_forward(&mut self, n: u64) -> io::Result<u64> {
        if !self.metadata()?.is_file() {
            return Ok(0);
        }
        let offset = i64::try_from(n).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek too far"))?;
        self.seek(SeekFrom::Current(offset))?;
        Ok(n)
    }
}

impl<T: AsRef<[u8]>> BlockSource for Cursor<T> {
    fn seek_forward(&mut self, n: u64) -> io::Result<u64> {
        let len = self.get_ref().as_ref().len() as u64;
        let skipped = n.min(len.saturating_sub(self.position()));
        self.set_position(self.position() + skipped);
        Ok(skipped)
    }
}

impl<'a> BlockSource for &'a [u8] {
    fn seek_forward(&mut self, n: u64) -> io::Result<u64> {
        let skipped = usize::try_from(n).map_or(self.len(), |n| n.min(self.len()));
        *self = &self[skipped..];
        Ok(skipped as u64)
    }
}

impl BlockSource for Stdin {}

impl BlockSource for ChildStdout {}

/// Drops buffered bytes first, then lets the inner source seek.
impl<R: BlockSource> BlockSource for BufReader<R> {
    fn seek_forward(&mut self, n: u64) -> io::Result<u64> {
        let buffered = (self.buffer().len() as u64).min(n);
        self.consume(buffered as usize);
        if buffered == n {
            return Ok(n);
        }
        Ok(buffered + self.get_mut().seek_forward(n - buffered)?)
    }
}

impl<S: BlockSource + ?Sized> BlockSource for Box<S> {
    fn seek_forward(&mut self, n: u64) -> io::Result<u64> { (**self).seek_forward(n) }
}

/// Where top-level blocks are written to.
pub trait BlockSink: Write {
    /// Flush everything and report whether the data reached its destination.
    fn finish(&mut self) -> io::Result<()> { self.flush() }
}

impl BlockSink for File {}

impl BlockSink for Stdout {}

impl BlockSink for ChildStdin {}

impl BlockSink for Vec<u8> {}

impl BlockSink for Cursor<Vec<u8>> {}

impl<W: BlockSink> BlockSink for BufWriter<W> {
    fn finish(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().finish()
    }
}

impl<S: BlockSink + ?Sized> BlockSink for Box<S> {
    fn finish(&mut self) -> io::Result<()> { (**self).finish() }
}

/// An in-memory sink whose clones share one byte vector.
///
/// Lets several sessions write into a buffer that is inspected or merged after
/// they are done.
#[derive(Clone, Debug, Default)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self { Self::default() }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> { self.0.lock().unwrap_or_else(|e| e.into_inner()).clone() }

    pub fn len(&self) -> usize { self.0.lock().unwrap_or_else(|e| e.into_inner()).len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

impl BlockSink for MemorySink {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_and_cursors_skip() {
        let data = [1u8, 2, 3, 4, 5];
        let mut slice: &[u8] = &data;
        assert_eq!(slice.seek_forward(3).unwrap(), 3);
        assert_eq!(slice, &[4, 5]);
        assert_eq!(slice.seek_forward(3).unwrap(), 2);
        assert!(slice.is_empty());

        let mut cursor = Cursor::new(data.to_vec());
        assert_eq!(cursor.seek_forward(4).unwrap(), 4);
        assert_eq!(cursor.seek_forward(4).unwrap(), 1);
        assert_eq!(cursor.position(), 5);

        let mut boxed: Box<dyn BlockSource> = Box::new(Cursor::new(data));
        assert_eq!(boxed.seek_forward(2).unwrap(), 2);
        let mut rest = Vec::new();
        boxed.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, [3, 4, 5]);
    }

    #[test]
    fn buffered_readers_skip_through() {
        let data: Vec<u8> = (0..100).collect();
        let mut reader = BufReader::with_capacity(16, &data[..]);
        let mut first = [0u8; 4];
        reader.read_exact(&mut first).unwrap();
        assert_eq!(reader.seek_forward(50).unwrap(), 50);
        let mut next = [0u8; 1];
        reader.read_exact(&mut next).unwrap();
        assert_eq!(next[0], 54);
    }

    #[test]
    fn shared_sink() {
        let sink = MemorySink::new();
        let mut a = sink.clone();
        let mut b = sink.clone();
        a.write_all(b"ab").unwrap();
        b.write_all(b"cd").unwrap();
        assert_eq!(sink.contents(), b"abcd");
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn buffered_sinks_finish_through() {
        let sink = MemorySink::new();
        let mut out: Box<dyn BlockSink> = Box::new(BufWriter::new(sink.clone()));
        out.write_all(b"block").unwrap();
        assert!(sink.is_empty());
        out.finish().unwrap();
        assert_eq!(sink.contents(), b"block");
    }
}
