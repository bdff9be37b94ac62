//! # Top-level blocks
//!
//! A block is a top-level item preceded by the sync tag. Reading goes through
//! two steps: [`find_block`](IoBuffer::find_block) scans the input for the next
//! tag and loads the header, then either [`read_block`](IoBuffer::read_block)
//! loads the body or [`skip_block`](IoBuffer::skip_block) passes over it.
//! Garbage in front of a tag is skipped and counted; too much of it in one scan
//! or too many such events in one session end the input with
//! [`Error::Desync`].
//!
//! ```
//! use eventio::prelude::*;
//! use std::io::Cursor;
//!
//! let sink = MemorySink::new();
//! let mut out = IoBuffer::with_capacity(1024).unwrap().with_output(sink.clone());
//! for ident in 0..3 {
//!     let mut item = ItemHeader::new(1204, 0, ident);
//!     out.put_item_begin(&mut item).unwrap();
//!     out.put_scount(-i64::from(ident));
//!     out.put_item_end(&mut item).unwrap();
//! }
//!
//! let mut input = IoBuffer::with_capacity(1024)
//!     .unwrap()
//!     .with_input(Cursor::new(sink.contents()));
//! let mut seen = Vec::new();
//! while let Some(header) = input.find_block().unwrap() {
//!     if header.ident == 1 {
//!         input.skip_block().unwrap();
//!         continue;
//!     }
//!     input.read_block().unwrap();
//!     let item = input.get_item_begin(1204).unwrap();
//!     seen.push(input.get_scount().unwrap());
//!     input.get_item_end(&item).unwrap();
//! }
//! assert_eq!(seen, [0, -2]);
//! ```

use super::BlockSource;
use crate::{
    buffer::{BlockState, IoBuffer, Mode},
    config::ByteOrder,
    encoding::constants::*,
    errors::*,
    item::ItemHeader,
};
use std::io::{self, Read, Write};

fn read_byte<R: Read + ?Sized>(input: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Fills as much of `buf` as the input has, returning the count.
fn read_full<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn skip_bytes<R: BlockSource + ?Sized>(input: &mut R, n: u64) -> Result<()> {
    let mut left = n - input.seek_forward(n)?.min(n);
    let mut chunk = [0u8; SKIP_CHUNK];
    while left > 0 {
        let want = left.min(SKIP_CHUNK as u64) as usize;
        match input.read(&mut chunk[..want]) {
            Ok(0) => return Err(Error::Eof),
            Ok(got) => left -= got as u64,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn sync_tag_bytes(order: ByteOrder) -> [u8; 4] {
    if order.is_little_endian() {
        SYNC_TAG.to_le_bytes()
    } else {
        SYNC_TAG.to_be_bytes()
    }
}

impl IoBuffer {
    /// Passes the completed block in the buffer to the output. Without an
    /// output the block stays in the buffer, see
    /// [`block_bytes`](IoBuffer::block_bytes).
    pub fn write_block(&mut self) -> Result<()> {
        if !self.frames.is_empty() || self.mode == Mode::Writing {
            self.diag
                .warn("Cannot write I/O block while items are still open");
            return Err(Error::InvalidState("items are still open"));
        }
        if self.block != BlockState::Loaded {
            return Err(Error::InvalidState("no complete block to write"));
        }
        if let Some(out) = self.output.as_mut() {
            if let Err(e) = out.write_all(&self.data[..]) {
                self.diag.error(format_args!("Write error on I/O block: {}", e));
                return Err(Error::Transport(e));
            }
        }
        Ok(())
    }

    /// Scans the input for the next block and loads its header.
    ///
    /// Returns `Ok(None)` at the end of the input. The header found has to be
    /// followed by [`read_block`](IoBuffer::read_block) or
    /// [`skip_block`](IoBuffer::skip_block) before the next scan.
    pub fn find_block(&mut self) -> Result<Option<ItemHeader>> {
        if let BlockState::Pending(_) = self.block {
            self.diag
                .warn("Block header already found; read or skip the block first");
            return Err(Error::InvalidState("previous block neither read nor skipped"));
        }
        if self.mode == Mode::Writing {
            return Err(Error::InvalidState("a block is being written"));
        }
        if self.input.is_none() {
            self.diag.warn("No input defined for I/O buffer");
            return Err(Error::InvalidState("no input"));
        }
        self.clear_block();

        let max_skip = self.config.max_sync_skip;
        let input = match self.input.as_mut() {
            Some(input) => input,
            None => return Err(Error::InvalidState("no input")),
        };

        let mut window = 0u32;
        let mut scanned = 0u64;
        let order = loop {
            let byte = match read_byte(input)? {
                Some(byte) => byte,
                None => {
                    if scanned > 0 {
                        self.diag.warn(format_args!(
                            "{} bytes of trailing data without a block",
                            scanned
                        ));
                    }
                    return Ok(None);
                }
            };
            window = (window << 8) | u32::from(byte);
            scanned += 1;
            match window {
                SYNC_TAG => break ByteOrder::from_little_endian(false),
                SYNC_TAG_SWAPPED => break ByteOrder::from_little_endian(true),
                _ => {}
            }
            if scanned.saturating_sub(3) > max_skip {
                self.sync_errors += 1;
                self.diag.error(format_args!(
                    "No sync tag within {} bytes; giving up on this input",
                    max_skip
                ));
                return Err(Error::Desync {
                    skipped: scanned - 3,
                    errors: self.sync_errors,
                });
            }
        };
        let skipped = scanned - 4;

        let mut head = [0u8; ITEM_HEADER_LEN + EXTENSION_LEN];
        match read_full(input, &mut head[..ITEM_HEADER_LEN])? {
            0 => {
                self.diag.warn("Sync tag at the end of input");
                return Ok(None);
            }
            ITEM_HEADER_LEN => {}
            _ => return Err(Error::Eof),
        }
        let length_word = if order.is_little_endian() {
            u32::from_le_bytes([head[8], head[9], head[10], head[11]])
        } else {
            u32::from_be_bytes([head[8], head[9], head[10], head[11]])
        };
        let header_len = if length_word & LENGTH_EXT_BIT != 0 {
            if read_full(input, &mut head[ITEM_HEADER_LEN..])? != EXTENSION_LEN {
                return Err(Error::Eof);
            }
            ITEM_HEADER_LEN + EXTENSION_LEN
        } else {
            ITEM_HEADER_LEN
        };

        self.order = order;
        self.data.extend_from_slice(&sync_tag_bytes(order));
        self.data.extend_from_slice(&head[..header_len]);
        let header = match self.decode_block_header() {
            Ok(header) => header,
            Err(e) => {
                // false tag; the next scan starts after this header
                self.clear_block();
                self.sync_errors += 1;
                return Err(e);
            }
        };
        self.block = BlockState::Pending(header);
        self.last_sync_skip = skipped;

        if skipped > 0 {
            self.diag.warn(format_args!(
                "Synchronization error. {} bytes of data have been skipped.",
                skipped
            ));
            self.diag.warn(format_args!("Now at {}", header));
            if self.sync_errors >= self.config.max_sync_errors {
                self.sync_errors += 1;
                self.diag
                    .error("Too many synchronization errors; no further input is accepted");
                self.clear_block();
                return Err(Error::Desync {
                    skipped,
                    errors: self.sync_errors,
                });
            }
            self.sync_errors += 1;
        }
        Ok(Some(header))
    }

    /// Header of the block whose tag and header words are in the buffer.
    fn decode_block_header(&self) -> Result<ItemHeader> {
        let type_word = self.read_u32_at(4);
        let version = ((type_word >> VERSION_SHIFT) & VERSION_MASK) as u16;
        if version & VERSION_CORRUPT_BIT != 0 {
            self.diag
                .warn("Version number invalid - may be corrupted data");
            return Err(Error::InvalidHeader(format!("block version {}", version)));
        }
        let length_word = self.read_u32_at(12);
        let use_extension = length_word & LENGTH_EXT_BIT != 0;
        let mut length = u64::from(length_word & LENGTH_LOW_MASK);
        if use_extension {
            length |= u64::from(self.read_u32_at(16) & LENGTH_HIGH_MASK) << LENGTH_LOW_BITS;
        }
        Ok(ItemHeader {
            item_type: (type_word & TYPE_MASK) as u16,
            version,
            ident: self.read_u32_at(8) as i32,
            user_flag: type_word & USER_FLAG_BIT != 0,
            use_extension,
            searchable: length_word & LENGTH_SEARCH_BIT != 0,
            length,
            level: 0,
        })
    }

    /// Loads the body of the block found by [`find_block`](IoBuffer::find_block).
    ///
    /// A block too large for the growth ceiling is skipped and reported as
    /// [`Error::BufferFull`]; the next `find_block` continues after it.
    pub fn read_block(&mut self) -> Result<()> {
        let header = match self.block {
            BlockState::Pending(header) => header,
            _ => {
                self.diag.warn("No I/O block header found before reading");
                return Err(Error::InvalidState("no block header found"));
            }
        };
        let total = match usize::try_from(self.data.len() as u64 + header.length) {
            Ok(total) => total,
            Err(_) => {
                self.skip_block()?;
                return Err(Error::LengthOverflow {
                    length: header.length,
                });
            }
        };
        if total > self.capacity {
            if let Err(e) = self.grow(total - self.capacity) {
                self.diag
                    .warn("I/O buffer too small; I/O block is skipped");
                self.skip_block()?;
                return Err(e);
            }
        }

        let start = self.data.len();
        self.data.resize(total, 0);
        let read = match self.input.as_mut() {
            Some(input) => input.read_exact(&mut self.data[start..]),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "no input")),
        };
        if let Err(e) = read {
            self.clear_block();
            self.diag.warn(format_args!(
                "Read error on I/O block of type {}: {}",
                header.item_type, e
            ));
            return Err(e.into());
        }
        self.block = BlockState::Loaded;
        self.mode = Mode::Idle;
        self.pos = 0;
        Ok(())
    }

    /// Passes over the body of the block found by
    /// [`find_block`](IoBuffer::find_block), seeking where the input allows it.
    pub fn skip_block(&mut self) -> Result<()> {
        let header = match self.block {
            BlockState::Pending(header) => header,
            _ => {
                self.diag.warn("No I/O block header found before skipping");
                return Err(Error::InvalidState("no block header found"));
            }
        };
        self.clear_block();
        match self.input.as_mut() {
            Some(input) => skip_bytes(input, header.length),
            None => Err(Error::InvalidState("no input")),
        }
    }

    /// Writes a one-line summary of every remaining block of the input and
    /// returns how many there were.
    pub fn list_blocks<W: Write + ?Sized>(&mut self, out: &mut W, verbosity: u32) -> Result<usize> {
        writeln!(out)?;
        let mut count = 0;
        while let Some(header) = self.find_block()? {
            writeln!(
                out,
                "{}{}{}",
                header,
                if self.order == ByteOrder::Swapped {
                    " with inverse byte order"
                } else {
                    ""
                },
                self.diag.type_label(header.item_type, verbosity)
            )?;
            self.skip_block()?;
            count += 1;
        }
        writeln!(out)?;
        Ok(count)
    }

    /// Copies the item being read, header included, into `target` as a
    /// complete top-level block in the same byte order. The item is finished
    /// here as if by [`get_item_end`](IoBuffer::get_item_end).
    pub fn copy_item_to_block(&mut self, target: &mut IoBuffer, header: &ItemHeader) -> Result<()> {
        if self.mode != Mode::Reading || header.level + 1 != self.frames.len() {
            return Err(Error::InvalidState("item is not the one being read"));
        }
        let frame = self.frames[header.level];
        let (from, end) = (frame.header_start(), frame.end());
        if end > self.data.len() {
            return Err(Error::InvalidHeader(format!(
                "item type {} reaches past the block",
                frame.item_type
            )));
        }

        target.clear_block();
        let needed = 4 + end - from;
        if needed > target.capacity {
            target.grow(needed - target.capacity)?;
        }
        target.data.extend_from_slice(&sync_tag_bytes(self.order));
        target.data.extend_from_slice(&self.data[from..end]);
        target.order = self.order;
        target.block = BlockState::Loaded;

        self.get_item_end(header)
    }

    /// Splices a complete block, sync tag included, into the item being
    /// written. The block must be in the byte order of this one.
    pub fn append_block_as_item(&mut self, block: &[u8]) -> Result<()> {
        if self.mode != Mode::Writing || self.frames.is_empty() {
            return Err(Error::InvalidState("no item is being written"));
        }
        if block.len() < BLOCK_HEADER_LEN {
            return Err(Error::InvalidHeader(format!(
                "{} bytes are too short for a block",
                block.len()
            )));
        }
        let tag = [block[0], block[1], block[2], block[3]];
        let own = sync_tag_bytes(self.order);
        if tag != own {
            let mut reversed = own;
            reversed.reverse();
            if tag == reversed {
                self.diag
                    .warn("Cannot append an I/O block of different byte order");
                return Err(Error::ByteOrderMismatch);
            }
            return Err(Error::BadSyncTag {
                found: u32::from_le_bytes(tag),
            });
        }
        let body = &block[4..];
        self.ensure_writable(body.len())?;
        self.data.extend_from_slice(body);
        if let Some(top) = self.frames.last_mut() {
            top.sub_length += body.len() as u64;
        }
        Ok(())
    }
}
