use crate::{
    config::{BufferConfig, ByteOrder},
    diagnostics::Diagnostics,
    encoding::{constants::*, de::Deserializer, ser::Serializer},
    errors::*,
    item::ItemHeader,
    transport::{BlockSink, BlockSource},
    util::growth_increment,
};
use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;
use std::{fmt, io::Write};

/// What the session is doing with its buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Idle,
    Writing,
    Reading,
}

/// What the buffer holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum BlockState {
    Empty,
    /// The header of an input block is loaded; its body is still in the source.
    Pending(ItemHeader),
    /// A complete top-level block, read or written.
    Loaded,
}

/// One open item.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Frame {
    /// Where the item's bytes begin, including the sync tag at level 0.
    pub start: usize,
    /// Where its body begins.
    pub data_start: usize,
    pub extended: bool,
    pub item_type: u16,
    /// Declared body length, when reading.
    pub length: u64,
    /// Bytes accounted for by closed children and padding, when writing.
    pub sub_length: u64,
    /// The parent's `sub_length` before this item began.
    pub parent_sub_length: u64,
}

impl Frame {
    pub fn header_len(&self) -> usize { ITEM_HEADER_LEN + if self.extended { EXTENSION_LEN } else { 0 } }

    /// Offset of the type word.
    pub fn header_start(&self) -> usize { self.data_start - self.header_len() }

    pub fn end(&self) -> usize { self.data_start + self.length as usize }
}

/// An I/O session: one growable buffer, the stack of open items and the byte
/// source and sink blocks travel through.
///
/// One top-level block lives in the buffer at a time. Writing one starts with
/// [`put_item_begin`](IoBuffer::put_item_begin) at level 0 and ends with the
/// matching [`put_item_end`](IoBuffer::put_item_end), which hands the block to
/// the output. Reading one starts with [`find_block`](IoBuffer::find_block) and
/// [`read_block`](IoBuffer::read_block), after which the items are decoded with
/// [`get_item_begin`](IoBuffer::get_item_begin).
pub struct IoBuffer {
    pub(crate) data: BytesMut,
    /// Logical buffer size, the base for growth decisions.
    pub(crate) capacity: usize,
    /// Read cursor. Writes always append to `data`.
    pub(crate) pos: usize,
    pub(crate) order: ByteOrder,
    pub(crate) mode: Mode,
    pub(crate) block: BlockState,
    pub(crate) frames: SmallVec<[Frame; MAX_ITEM_DEPTH]>,
    /// Size of the first write that did not fit.
    pub(crate) overflow: Option<usize>,
    pub(crate) sync_errors: u32,
    pub(crate) last_sync_skip: u64,
    pub(crate) config: BufferConfig,
    pub(crate) diag: Diagnostics,
    pub(crate) input: Option<Box<dyn BlockSource + Send>>,
    pub(crate) output: Option<Box<dyn BlockSink + Send>>,
}

impl fmt::Debug for IoBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IoBuffer")
            .field("len", &self.data.len())
            .field("capacity", &self.capacity)
            .field("pos", &self.pos)
            .field("order", &self.order)
            .field("mode", &self.mode)
            .field("block", &self.block)
            .field("depth", &self.frames.len())
            .field("sync_errors", &self.sync_errors)
            .finish()
    }
}

impl IoBuffer {
    /// Creates a session. Fails if the initial capacity is below the minimum
    /// or above the growth ceiling; 0 selects the default.
    pub fn new(mut config: BufferConfig) -> Result<Self> {
        if config.initial_capacity == 0 {
            config.initial_capacity = DEFAULT_INITIAL_CAPACITY.min(config.max_capacity);
        }
        if config.initial_capacity < MIN_CAPACITY || config.initial_capacity > config.max_capacity {
            return Err(Error::AllocationError {
                requested: config.initial_capacity,
            });
        }
        config.max_depth = config.max_depth.min(MAX_ITEM_DEPTH);
        Ok(IoBuffer {
            data: BytesMut::with_capacity(config.initial_capacity),
            capacity: config.initial_capacity,
            pos: 0,
            order: config.byte_order,
            mode: Mode::Idle,
            block: BlockState::Empty,
            frames: SmallVec::new(),
            overflow: None,
            sync_errors: 0,
            last_sync_skip: 0,
            config,
            diag: Diagnostics::new(),
            input: None,
            output: None,
        })
    }

    /// A session with default settings and the given initial size.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        Self::new(BufferConfig::default().with_initial_capacity(initial_capacity))
    }

    pub fn with_diagnostics(mut self, diag: Diagnostics) -> Self {
        self.diag = diag;
        self
    }

    pub fn with_input<S: BlockSource + Send + 'static>(mut self, input: S) -> Self {
        self.set_input(input);
        self
    }

    pub fn with_output<W: BlockSink + Send + 'static>(mut self, output: W) -> Self {
        self.set_output(output);
        self
    }

    pub fn set_diagnostics(&mut self, diag: Diagnostics) { self.diag = diag }

    pub fn diagnostics(&self) -> &Diagnostics { &self.diag }

    pub fn config(&self) -> &BufferConfig { &self.config }

    /// Replaces the byte source. Any pending block header is forgotten.
    pub fn set_input<S: BlockSource + Send + 'static>(&mut self, input: S) {
        self.input = Some(Box::new(input));
        if let BlockState::Pending(_) = self.block {
            self.clear_block();
        }
    }

    pub fn take_input(&mut self) -> Option<Box<dyn BlockSource + Send>> { self.input.take() }

    pub fn set_output<W: BlockSink + Send + 'static>(&mut self, output: W) { self.output = Some(Box::new(output)) }

    /// Detaches the sink, flushing it first.
    pub fn take_output(&mut self) -> Result<Option<Box<dyn BlockSink + Send>>> {
        if let Some(out) = self.output.as_mut() {
            out.flush()?;
        }
        Ok(self.output.take())
    }

    /// Detaches and finishes the sink. A compressor that failed is reported
    /// here as [`Error::Transport`].
    pub fn close_output(&mut self) -> Result<()> {
        match self.output.take() {
            Some(mut out) => out.finish().map_err(|e| {
                self.diag.error(format_args!("Closing the output failed: {}", e));
                Error::Transport(e)
            }),
            None => Ok(()),
        }
    }

    /// Byte order of the block being written or read.
    pub fn byte_order(&self) -> ByteOrder { self.order }

    /// Sets the byte order of blocks written from now on.
    pub fn set_byte_order(&mut self, order: ByteOrder) { self.config.byte_order = order }

    pub fn capacity(&self) -> usize { self.capacity }

    /// The read cursor, or the write position while writing.
    pub fn position(&self) -> usize {
        match self.mode {
            Mode::Writing => self.data.len(),
            _ => self.pos,
        }
    }

    /// Bytes left before the end of the block being read.
    pub fn remaining_read(&self) -> usize {
        match self.mode {
            Mode::Reading => self.data.len().saturating_sub(self.pos),
            _ => 0,
        }
    }

    /// Bytes that can still be written without growing.
    pub fn remaining_write(&self) -> usize {
        match self.mode {
            Mode::Writing => self.capacity.saturating_sub(self.data.len()),
            _ => 0,
        }
    }

    /// Number of open items.
    pub fn depth(&self) -> usize { self.frames.len() }

    /// True once a write did not fit under the growth ceiling. The block
    /// in progress is then rejected when its top-level item ends.
    pub fn has_overflowed(&self) -> bool { self.overflow.is_some() }

    /// Resynchronisation events seen so far.
    pub fn sync_errors(&self) -> u32 { self.sync_errors }

    /// Garbage bytes skipped by the last successful `find_block`.
    pub fn last_sync_skip(&self) -> u64 { self.last_sync_skip }

    /// The complete block in the buffer, sync tag included, if there is one.
    pub fn block_bytes(&self) -> Option<&[u8]> {
        match self.block {
            BlockState::Loaded if self.mode != Mode::Writing => Some(&self.data[..]),
            _ => None,
        }
    }

    /// Consumes the session, returning the block in the buffer.
    pub fn into_block(self) -> Option<Bytes> {
        match self.block {
            BlockState::Loaded if self.mode != Mode::Writing => Some(self.data.freeze()),
            _ => None,
        }
    }

    /// Back to the empty state, shrinking the buffer to its initial size.
    pub fn reset_block(&mut self) {
        self.clear_block();
        if self.capacity > self.config.initial_capacity {
            self.data = BytesMut::with_capacity(self.config.initial_capacity);
            self.capacity = self.config.initial_capacity;
        }
    }

    /// Back to the empty state, keeping the memory.
    pub(crate) fn clear_block(&mut self) {
        self.data.clear();
        self.pos = 0;
        self.mode = Mode::Idle;
        self.block = BlockState::Empty;
        self.frames.clear();
        self.overflow = None;
    }

    /// Makes room for `n` more bytes after the current end of data.
    pub(crate) fn ensure_writable(&mut self, n: usize) -> Result<()> {
        let needed = self.data.len() + n;
        if needed > self.capacity {
            self.grow(needed - self.capacity)?;
        }
        Ok(())
    }

    /// Grows the buffer by at least `shortfall` bytes.
    pub(crate) fn grow(&mut self, shortfall: usize) -> Result<()> {
        let increment = growth_increment(self.capacity, shortfall);
        let new_capacity = (self.capacity + increment).min(self.config.max_capacity);
        if new_capacity < self.capacity + shortfall {
            self.diag.warn(format_args!(
                "Cannot extend I/O buffer of length {} by another {} bytes",
                self.capacity, shortfall
            ));
            return Err(Error::BufferFull {
                requested: self.capacity + shortfall,
                limit: self.config.max_capacity,
            });
        }
        let increment = new_capacity - self.capacity;
        self.data.reserve(new_capacity - self.data.len());
        self.capacity = new_capacity;
        self.diag.info(format_args!(
            "I/O block extended by {} to {} bytes",
            increment, new_capacity
        ));
        Ok(())
    }

    pub(crate) fn read_u32_at(&self, offset: usize) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[offset..offset + 4]);
        if self.order.is_little_endian() {
            u32::from_le_bytes(word)
        } else {
            u32::from_be_bytes(word)
        }
    }

    pub(crate) fn write_u32_at(&mut self, offset: usize, v: u32) {
        let word = if self.order.is_little_endian() {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        };
        self.data[offset..offset + 4].copy_from_slice(&word);
    }
}

impl Serializer for IoBuffer {
    fn put_u8(&mut self, u: u8) { self.put_slice(&[u]) }

    fn put_slice(&mut self, slice: &[u8]) {
        if self.mode != Mode::Writing {
            self.diag.warn(format_args!(
                "{} bytes written outside of any item are dropped",
                slice.len()
            ));
            return;
        }
        if self.overflow.is_some() {
            return;
        }
        match self.ensure_writable(slice.len()) {
            Ok(()) => self.data.extend_from_slice(slice),
            Err(_) => self.overflow = Some(self.data.len() + slice.len()),
        }
    }

    fn is_little_endian(&self) -> bool { self.order.is_little_endian() }
}

impl Deserializer for IoBuffer {
    fn take_bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.peek_bytes(n)?;
        let start = self.pos;
        self.pos += n;
        Ok(&self.data[start..start + n])
    }

    fn peek_bytes(&self, n: usize) -> Result<&[u8]> {
        if self.mode != Mode::Reading {
            return Err(Error::InvalidState("no item is being read"));
        }
        let remaining = self.data.len().saturating_sub(self.pos);
        if n > remaining {
            return Err(Error::Underflow {
                wanted: n,
                remaining,
            });
        }
        Ok(&self.data[self.pos..self.pos + n])
    }

    fn remaining(&self) -> usize { self.remaining_read() }

    fn is_little_endian(&self) -> bool { self.order.is_little_endian() }

    fn warn(&self, msg: fmt::Arguments) { self.diag.warn(msg) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::*;

    fn writing(initial: usize, max: usize) -> IoBuffer {
        let config = BufferConfig::new()
            .with_initial_capacity(initial)
            .with_max_capacity(max);
        let mut buf = IoBuffer::new(config).unwrap();
        buf.mode = Mode::Writing;
        buf
    }

    #[test]
    fn invalid_sizes() {
        assert!(matches!(
            IoBuffer::with_capacity(8),
            Err(Error::AllocationError { requested: 8 })
        ));
        assert!(IoBuffer::new(BufferConfig::new().with_initial_capacity(10_000).with_max_capacity(5_000)).is_err());
        assert_eq!(IoBuffer::with_capacity(0).unwrap().capacity(), DEFAULT_INITIAL_CAPACITY);
    }

    #[test]
    fn growth_keeps_bytes() {
        let mut buf = writing(64, 1 << 20);
        let prefix: Vec<u8> = (0..64).collect();
        buf.put_slice(&prefix);
        assert_eq!(buf.capacity(), 64);
        buf.put_slice(&[0xab; 10_000]);
        assert!(buf.capacity() >= 10_064);
        assert_eq!(&buf.data[..64], &prefix[..]);
        assert_eq!(buf.data.len(), 10_064);
    }

    #[test]
    fn ceiling() {
        let mut buf = writing(64, 128);
        buf.put_slice(&[1; 60]);
        buf.put_slice(&[2; 100]);
        assert!(buf.has_overflowed());
        assert_eq!(buf.data.len(), 60);
        // later writes are dropped as well
        buf.put_u32(7);
        assert_eq!(buf.data.len(), 60);
    }

    #[test]
    fn reading_needs_an_item() {
        let mut buf = IoBuffer::with_capacity(64).unwrap();
        assert!(matches!(buf.get_u8(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn reset_shrinks() {
        let mut buf = writing(64, 1 << 20);
        buf.put_slice(&[0; 1000]);
        assert!(buf.capacity() > 64);
        buf.reset_block();
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.depth(), 0);
        assert_eq!(buf.position(), 0);
    }
}
