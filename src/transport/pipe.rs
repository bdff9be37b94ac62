//! Opening inputs and outputs by name.
//!
//! Compressed files are recognised by their extension and passed through the
//! matching external program, which has to be on the `PATH`. The name `-`
//! stands for standard input or output.

use super::{BlockSink, BlockSource};
use crate::errors::*;
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

/// How a file is compressed, judging by its name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    Lz4,
}

impl Compression {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("bz2") => Compression::Bzip2,
            Some("xz") => Compression::Xz,
            Some("zst") | Some("zstd") => Compression::Zstd,
            Some("lz4") => Compression::Lz4,
            _ => Compression::None,
        }
    }

    /// The external program handling this compression.
    pub fn program(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gzip"),
            Compression::Bzip2 => Some("bzip2"),
            Compression::Xz => Some("xz"),
            Compression::Zstd => Some("zstd"),
            Compression::Lz4 => Some("lz4"),
        }
    }
}

/// Output of a decompressor reading a file.
#[derive(Debug)]
pub struct PipeSource {
    child: Child,
    out: Option<ChildStdout>,
}

impl Read for PipeSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.out.as_mut() {
            Some(out) => out.read(buf),
            None => Ok(0),
        }
    }
}

impl BlockSource for PipeSource {}

impl Drop for PipeSource {
    fn drop(&mut self) {
        // closing our end first lets a decompressor that is still writing exit
        self.out.take();
        let _ = self.child.wait();
    }
}

/// Input of a compressor writing a file.
#[derive(Debug)]
pub struct PipeSink {
    child: Child,
    input: Option<ChildStdin>,
}

impl PipeSink {
    fn wait(&mut self) -> io::Result<()> {
        self.input.take();
        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("compressor exited with {}", status),
            ))
        }
    }
}

impl Write for PipeSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.input.as_mut() {
            Some(input) => input.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.input.as_mut() {
            Some(input) => input.flush(),
            None => Ok(()),
        }
    }
}

/// Closes the pipe and waits for the compressor, failing if it did.
impl BlockSink for PipeSink {
    fn finish(&mut self) -> io::Result<()> { self.wait() }
}

impl Drop for PipeSink {
    fn drop(&mut self) {
        if self.input.is_none() {
            return;
        }
        if let Err(e) = self.wait() {
            tracing::error!(target: "eventio", "output left unfinished: {}", e);
        }
    }
}

/// Opens `path` for reading blocks, decompressing on the fly if its
/// extension asks for it.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BlockSource + Send>> {
    let path = path.as_ref();
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)?;
    match Compression::from_path(path).program() {
        None => Ok(Box::new(BufReader::new(file))),
        Some(program) => {
            let mut child = Command::new(program)
                .arg("-dc")
                .stdin(Stdio::from(file))
                .stdout(Stdio::piped())
                .spawn()?;
            let out = child.stdout.take();
            Ok(Box::new(BufReader::new(PipeSource { child, out })))
        }
    }
}

/// Creates `path` for writing blocks, compressing on the fly if its
/// extension asks for it. Finish the sink, e.g. with
/// [`IoBuffer::close_output`](crate::IoBuffer::close_output), to learn whether
/// the compressor succeeded.
pub fn open_output<P: AsRef<Path>>(path: P) -> Result<Box<dyn BlockSink + Send>> {
    let path = path.as_ref();
    if path == Path::new("-") {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(path)?;
    match Compression::from_path(path).program() {
        None => Ok(Box::new(BufWriter::new(file))),
        Some(program) => {
            let mut child = Command::new(program)
                .arg("-c")
                .stdin(Stdio::piped())
                .stdout(Stdio::from(file))
                .spawn()?;
            let input = child.stdin.take();
            Ok(Box::new(PipeSink { child, input }))
        }
    }
}
