//! # Items
//!
//! An item is a 12-byte header followed by a body padded to a multiple of four
//! bytes. The header holds the type word (type, user flag, extension flag and
//! version), a signed identifier and the length word (body length, searchable
//! flag and extension flag); an optional fourth word extends the length from
//! 30 to 42 bits. Bodies may contain further items, up to the configured depth.
//!
//! Writing an item reserves its length word and patches it when the item ends.
//! An item whose body was built only from complete sub-items is marked
//! searchable, which lets readers skip from sub-item to sub-item by length.
//!
//! ```
//! use eventio::prelude::*;
//!
//! let mut buf = IoBuffer::with_capacity(1024).unwrap();
//!
//! let mut event = ItemHeader::new(2010, 0, 17);
//! buf.put_item_begin(&mut event).unwrap();
//! for tel in 1..=2 {
//!     let mut data = ItemHeader::new(2100 + tel, 1, i32::from(tel));
//!     buf.put_item_begin(&mut data).unwrap();
//!     buf.put_var_string("adc sums").unwrap();
//!     buf.put_item_end(&mut data).unwrap();
//! }
//! buf.put_item_end(&mut event).unwrap();
//! assert!(event.searchable);
//!
//! let event = buf.get_item_begin(2010).unwrap();
//! assert_eq!(event.ident, 17);
//! let first = buf.get_item_begin(0).unwrap();
//! assert_eq!(first.item_type, 2101);
//! buf.get_item_end(&first).unwrap();
//! assert_eq!(buf.next_subitem_type().unwrap(), 2102);
//! buf.get_item_end(&event).unwrap();
//! ```

use crate::{
    buffer::{BlockState, Frame, IoBuffer, Mode},
    config::ByteOrder,
    encoding::{constants::*, de::*, ser::*},
    errors::*,
    util::{padding, split_length},
};
use std::fmt;

/// Header of one item, as written or as found.
///
/// For writing, fill in type, version, identifier and flags; `level`, `length`
/// and `searchable` are set by the buffer. For reading, everything is set by
/// [`IoBuffer::get_item_begin`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemHeader {
    pub item_type: u16,
    /// 0 to 2047.
    pub version: u16,
    /// Negative means "no identifier".
    pub ident: i32,
    pub user_flag: bool,
    /// The header carries the extension length word.
    pub use_extension: bool,
    /// The body consists of complete sub-items only.
    pub searchable: bool,
    /// Body length including padding.
    pub length: u64,
    /// Nesting level, 0 for top-level items.
    pub level: usize,
}

impl ItemHeader {
    pub fn new(item_type: u16, version: u16, ident: i32) -> Self {
        ItemHeader {
            item_type,
            version,
            ident,
            user_flag: false,
            use_extension: false,
            searchable: false,
            length: 0,
            level: 0,
        }
    }

    pub fn with_user_flag(mut self, flag: bool) -> Self {
        self.user_flag = flag;
        self
    }

    pub fn with_extension(mut self, extension: bool) -> Self {
        self.use_extension = extension;
        self
    }

    pub fn has_ident(&self) -> bool { self.ident >= 0 }

    /// Header size in the buffer, without sync tag.
    pub fn header_len(&self) -> usize {
        ITEM_HEADER_LEN + if self.use_extension { EXTENSION_LEN } else { 0 }
    }

    fn type_word(&self) -> u32 {
        let mut word = u32::from(self.item_type) | (u32::from(self.version) << VERSION_SHIFT);
        if self.user_flag {
            word |= USER_FLAG_BIT;
        }
        if self.use_extension {
            word |= EXTENDED_BIT;
        }
        word
    }
}

/// `Type 1234, version 2, length 96 (id 5 = 0x5)`, as used by the listings.
impl fmt::Display for ItemHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Type {:4}, version {}, {}length {}",
            self.item_type,
            self.version,
            if self.use_extension { "extended " } else { "" },
            self.length
        )?;
        if self.has_ident() {
            write!(
                f,
                " ({}id {} = {:#x})",
                if self.user_flag { "*" } else { "" },
                self.ident,
                self.ident
            )?;
        }
        Ok(())
    }
}

/// Classifies a sync tag read as a little-endian word.
pub(crate) fn classify_sync_tag(tag_le: u32) -> Result<ByteOrder> {
    match tag_le {
        SYNC_TAG => Ok(ByteOrder::from_little_endian(true)),
        SYNC_TAG_SWAPPED => Ok(ByteOrder::from_little_endian(false)),
        found => Err(Error::BadSyncTag { found }),
    }
}

impl IoBuffer {
    /// Starts writing an item. At level 0 this discards whatever the buffer
    /// held and writes the sync tag first.
    ///
    /// Sets `header.level`; the extension word is reserved if the header or
    /// the session configuration asks for it.
    pub fn put_item_begin(&mut self, header: &mut ItemHeader) -> Result<()> {
        if header.item_type == 0 {
            return Err(Error::InvalidHeader("item type 0 is reserved".to_string()));
        }
        if header.version > MAX_VERSION {
            return Err(Error::InvalidHeader(format!(
                "version {} exceeds {}",
                header.version, MAX_VERSION
            )));
        }
        let level = self.frames.len();
        if level == 0 {
            self.clear_block();
            self.order = self.config.byte_order;
            self.mode = Mode::Writing;
        } else if self.mode != Mode::Writing {
            return Err(Error::InvalidState("cannot write an item while reading"));
        }
        if level >= self.config.max_depth {
            self.diag.warn(format_args!(
                "Maximum level of sub-items in I/O buffer exceeded for item type {}",
                header.item_type
            ));
            return Err(Error::DepthExceeded {
                max: self.config.max_depth,
                item_type: header.item_type,
            });
        }

        header.use_extension |= self.config.always_extended;
        header.searchable = false;
        header.length = 0;
        header.level = level;

        let start = self.data.len();
        let tag_len = if level == 0 { 4 } else { 0 };
        if let Err(e) = self.ensure_writable(tag_len + header.header_len()) {
            if level == 0 {
                self.clear_block();
            }
            return Err(e);
        }
        if level == 0 {
            self.put_u32(SYNC_TAG);
        }
        self.put_u32(header.type_word());
        self.put_i32(header.ident);
        self.put_u32(0);
        if header.use_extension {
            self.put_u32(0);
        }

        let parent_sub_length = match self.frames.last_mut() {
            Some(parent) => {
                let before = parent.sub_length;
                parent.sub_length += header.header_len() as u64;
                before
            }
            None => 0,
        };
        self.frames.push(Frame {
            start,
            data_start: self.data.len(),
            extended: header.use_extension,
            item_type: header.item_type,
            length: 0,
            sub_length: 0,
            parent_sub_length,
        });
        Ok(())
    }

    /// Finishes writing an item: pads it, patches its length word and sets
    /// `header.length` and `header.searchable`. Deeper items still open are
    /// closed first. Ending a top-level item completes the block and passes it
    /// to the output, if one is set.
    pub fn put_item_end(&mut self, header: &mut ItemHeader) -> Result<()> {
        if self.mode != Mode::Writing || header.level >= self.frames.len() {
            self.diag
                .warn("Attempt to finish putting an item which is no more active");
            return Err(Error::InvalidState("item is not being written"));
        }
        if let Some(requested) = self.overflow {
            self.clear_block();
            return Err(Error::BufferFull {
                requested,
                limit: self.config.max_capacity,
            });
        }
        let unterminated = self.frames.len() - 1 - header.level;
        if unterminated > 0 {
            self.diag.warn(format_args!(
                "Closing {} unterminated sub-item(s) of item type {}",
                unterminated, header.item_type
            ));
        }

        while self.frames.len() > header.level {
            let closed = match self.close_frame() {
                Ok(closed) => closed,
                Err(e) => {
                    self.clear_block();
                    return Err(e);
                }
            };
            if self.frames.len() == header.level {
                header.length = closed.length;
                header.searchable = closed.searchable;
                header.use_extension = closed.use_extension;
            }
        }

        if header.level == 0 {
            self.mode = Mode::Idle;
            self.block = BlockState::Loaded;
            self.pos = 0;
            self.write_block()?;
        }
        Ok(())
    }

    /// Pops the innermost frame and patches its header.
    fn close_frame(&mut self) -> Result<ItemHeader> {
        let mut frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Err(Error::InvalidState("no open item")),
        };
        let pad = padding(self.data.len() - frame.data_start);
        self.ensure_writable(pad)?;
        self.data.extend_from_slice(&[0u8; ITEM_ALIGN][..pad]);
        frame.sub_length += pad as u64;

        let length = (self.data.len() - frame.data_start) as u64;
        let searchable = self.patch_length(&mut frame, length)?;

        if let Some(parent) = self.frames.last_mut() {
            parent.sub_length += length;
        }

        let type_word = self.read_u32_at(frame.header_start());
        Ok(ItemHeader {
            item_type: frame.item_type,
            version: ((type_word >> VERSION_SHIFT) & VERSION_MASK) as u16,
            ident: self.read_u32_at(frame.header_start() + 4) as i32,
            user_flag: type_word & USER_FLAG_BIT != 0,
            use_extension: frame.extended,
            searchable,
            length,
            level: self.frames.len(),
        })
    }

    /// Writes the length word(s) of a closed frame, widening its header if
    /// the length needs the extension word. Returns the searchable flag.
    fn patch_length(&mut self, frame: &mut Frame, length: u64) -> Result<bool> {
        let (low, high) = match split_length(length) {
            Some(split) => split,
            None => {
                self.diag
                    .warn(format_args!("I/O block of {} bytes is too long for data format", length));
                return Err(Error::LengthOverflow { length });
            }
        };
        if high != 0 && !frame.extended {
            self.widen(frame)?;
        }

        let searchable = length == frame.sub_length;
        let mut word = low;
        if searchable {
            word |= LENGTH_SEARCH_BIT;
        }
        if frame.extended {
            word |= LENGTH_EXT_BIT;
            self.write_u32_at(frame.data_start - 8, word);
            self.write_u32_at(frame.data_start - 4, high & LENGTH_HIGH_MASK);
        } else {
            self.write_u32_at(frame.data_start - 4, word);
        }
        Ok(searchable)
    }

    /// Makes room for the extension word in front of a body that turned out
    /// to need it.
    fn widen(&mut self, frame: &mut Frame) -> Result<()> {
        self.ensure_writable(EXTENSION_LEN)?;
        let end = self.data.len();
        self.data.resize(end + EXTENSION_LEN, 0);
        self.data
            .copy_within(frame.data_start..end, frame.data_start + EXTENSION_LEN);
        self.data[frame.data_start..frame.data_start + EXTENSION_LEN].fill(0);
        frame.data_start += EXTENSION_LEN;
        frame.extended = true;

        let type_at = frame.header_start();
        let type_word = self.read_u32_at(type_at) | EXTENDED_BIT;
        self.write_u32_at(type_at, type_word);
        if let Some(parent) = self.frames.last_mut() {
            parent.sub_length += EXTENSION_LEN as u64;
        }
        self.diag.info(format_args!(
            "Item type {} needed the extension length field and was moved by {} bytes",
            frame.item_type, EXTENSION_LEN
        ));
        Ok(())
    }

    /// Abandons an item being written, together with everything written since
    /// it began. Earlier siblings are kept.
    pub fn unput_item(&mut self, header: &ItemHeader) -> Result<()> {
        if self.mode != Mode::Writing {
            return Err(Error::InvalidState("not writing"));
        }
        if header.level >= self.frames.len() {
            return Err(Error::InvalidState("item is not being written"));
        }
        let frame = self.frames[header.level];
        self.frames.truncate(header.level);
        if header.level == 0 {
            self.clear_block();
            return Ok(());
        }
        self.data.truncate(frame.start);
        if let Some(parent) = self.frames.last_mut() {
            parent.sub_length = frame.parent_sub_length;
        }
        if self.overflow.is_some() && self.data.len() < self.capacity {
            self.overflow = None;
        }
        Ok(())
    }

    /// Removes the most recently written item, open or already closed,
    /// provided nothing was written after it.
    pub fn remove_item(&mut self, header: &mut ItemHeader) -> Result<()> {
        if self.mode != Mode::Writing {
            return Err(Error::InvalidState("not writing"));
        }
        if header.level < self.frames.len() {
            self.unput_item(header)?;
        } else if header.level == self.frames.len() && header.level > 0 {
            let len = header.header_len() + header.length as usize;
            let start = match self.data.len().checked_sub(len) {
                Some(start) if start >= self.frames[header.level - 1].data_start => start,
                _ => return Err(Error::InvalidState("item is not the last one written")),
            };
            if self.read_u32_at(start) & TYPE_MASK != u32::from(header.item_type) {
                return Err(Error::InvalidState("item is not the last one written"));
            }
            self.data.truncate(start);
            if let Some(parent) = self.frames.last_mut() {
                parent.sub_length = parent.sub_length.saturating_sub(len as u64);
            }
        } else {
            return Err(Error::InvalidState("item is not being written"));
        }
        header.item_type = 0;
        header.length = 0;
        Ok(())
    }

    /// Starts reading an item. At level 0 the block in the buffer is read from
    /// its sync tag on; deeper items must lie inside the enclosing item.
    ///
    /// With a nonzero `wanted` type, an item of another type is left unread and
    /// [`Error::TypeMismatch`] returned. [`Error::EndOfItem`] means the enclosing
    /// item has no further sub-items.
    pub fn get_item_begin(&mut self, wanted: u16) -> Result<ItemHeader> {
        let level = self.frames.len();
        let saved = (self.pos, self.order, self.mode);
        let result = self.read_header(level, wanted);
        match &result {
            Ok(header) => {
                let extension = if header.use_extension { EXTENSION_LEN } else { 0 };
                let data_start = self.pos;
                self.frames.push(Frame {
                    start: if level == 0 {
                        0
                    } else {
                        data_start - ITEM_HEADER_LEN - extension
                    },
                    data_start,
                    extended: header.use_extension,
                    item_type: header.item_type,
                    length: header.length,
                    sub_length: 0,
                    parent_sub_length: 0,
                });
            }
            Err(_) => {
                self.pos = saved.0;
                self.order = saved.1;
                self.mode = saved.2;
            }
        }
        result
    }

    fn read_header(&mut self, level: usize, wanted: u16) -> Result<ItemHeader> {
        if level >= self.config.max_depth {
            self.diag
                .warn("Maximum level of sub-items in I/O Buffer exceeded");
            return Err(Error::DepthExceeded {
                max: self.config.max_depth,
                item_type: wanted,
            });
        }
        let bound = if level == 0 {
            if self.block != BlockState::Loaded {
                self.diag
                    .warn("You must get an I/O block before you can read items");
                return Err(Error::InvalidState("no block loaded"));
            }
            self.mode = Mode::Reading;
            self.pos = 0;
            let tag = self.take_bytes(4)?;
            let tag_le = u32::from_le_bytes([tag[0], tag[1], tag[2], tag[3]]);
            self.order = match classify_sync_tag(tag_le) {
                Ok(order) => order,
                Err(e) => {
                    self.diag.warn("Invalid byte ordering of input data");
                    return Err(e);
                }
            };
            self.data.len()
        } else {
            if self.mode != Mode::Reading {
                return Err(Error::InvalidState("not reading"));
            }
            let parent_end = self.frames[level - 1].end();
            if self.pos >= self.data.len() || self.pos + ITEM_HEADER_LEN > parent_end {
                return Err(Error::EndOfItem);
            }
            parent_end
        };

        let type_word = self.get_u32()?;
        let item_type = (type_word & TYPE_MASK) as u16;
        let version = ((type_word >> VERSION_SHIFT) & VERSION_MASK) as u16;
        if version & VERSION_CORRUPT_BIT != 0 {
            self.diag
                .warn("Version number invalid - may be corrupted data");
            return Err(Error::InvalidHeader(format!(
                "version {} of item type {}",
                version, item_type
            )));
        }
        let ident = self.get_i32()?;
        let word = self.get_u32()?;
        let use_extension = word & LENGTH_EXT_BIT != 0;
        let mut length = u64::from(word & LENGTH_LOW_MASK);
        if use_extension {
            if level > 0 && self.pos + EXTENSION_LEN > bound {
                return Err(Error::EndOfItem);
            }
            let high = self.get_u32()? & LENGTH_HIGH_MASK;
            length |= u64::from(high) << LENGTH_LOW_BITS;
        }
        if self.pos as u64 + length > bound as u64 {
            return Err(Error::InvalidHeader(format!(
                "item type {} of length {} reaches past its enclosing item",
                item_type, length
            )));
        }
        if wanted != 0 && wanted != item_type {
            return Err(Error::TypeMismatch {
                wanted,
                found: item_type,
            });
        }
        Ok(ItemHeader {
            item_type,
            version,
            ident,
            user_flag: type_word & USER_FLAG_BIT != 0,
            use_extension,
            searchable: word & LENGTH_SEARCH_BIT != 0,
            length,
            level,
        })
    }

    /// Finishes reading an item and moves to its end, whatever was consumed
    /// of its body.
    pub fn get_item_end(&mut self, header: &ItemHeader) -> Result<()> {
        let depth = self.frames.len();
        if header.level >= depth {
            self.diag
                .warn("Attempt to finish getting an item which is not active");
            return Ok(());
        }
        if self.mode != Mode::Reading {
            return Err(Error::InvalidState("not reading"));
        }
        if header.level != depth - 1 {
            self.diag.warn("Item level is inconsistent");
        }
        let frame = self.frames[header.level];
        self.frames.truncate(header.level);
        let end = frame.end();
        if self.pos != end {
            if self.pos > end {
                self.diag.warn(format_args!(
                    "Actual length of item type {} exceeds specified length",
                    frame.item_type
                ));
            }
            self.pos = end;
        }
        if header.level == 0 {
            self.mode = Mode::Idle;
        }
        Ok(())
    }

    /// Goes back to just before the header of an item being read.
    pub fn unget_item(&mut self, header: &ItemHeader) -> Result<()> {
        if self.mode != Mode::Reading || header.level >= self.frames.len() {
            return Err(Error::InvalidState("item is not being read"));
        }
        self.pos = self.frames[header.level].start;
        self.frames.truncate(header.level);
        if header.level == 0 {
            self.mode = Mode::Idle;
        }
        Ok(())
    }

    /// Header of the next sub-item, leaving the cursor where it is.
    pub fn peek_subitem(&mut self) -> Result<ItemHeader> {
        if self.frames.is_empty() {
            return Err(Error::InvalidState("no enclosing item"));
        }
        let header = self.get_item_begin(0)?;
        self.unget_item(&header)?;
        Ok(header)
    }

    pub fn next_subitem_type(&mut self) -> Result<u16> { Ok(self.peek_subitem()?.item_type) }

    pub fn next_subitem_length(&mut self) -> Result<u64> { Ok(self.peek_subitem()?.length) }

    pub fn next_subitem_ident(&mut self) -> Result<i32> { Ok(self.peek_subitem()?.ident) }

    /// Steps over the next sub-item.
    pub fn skip_subitem(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::InvalidState("no enclosing item"));
        }
        let header = self.get_item_begin(0)?;
        self.get_item_end(&header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::BufferConfig, diagnostics::Diagnostics, encoding::*};
    use std::sync::{Arc, Mutex};

    fn buffer() -> IoBuffer {
        IoBuffer::with_capacity(256)
            .unwrap()
            .with_diagnostics(Diagnostics::silent())
    }

    #[test]
    fn header_layout() {
        let mut buf = buffer();
        let mut h = ItemHeader::new(1001, 3, 99).with_user_flag(true);
        buf.put_item_begin(&mut h).unwrap();
        buf.put_u16(7);
        buf.put_item_end(&mut h).unwrap();
        assert_eq!(h.length, 4);
        assert!(!h.searchable);

        let block = buf.block_bytes().unwrap();
        assert_eq!(block.len(), 20);
        let le = buf.byte_order().is_little_endian();
        let word = |i: usize| {
            let b = [block[i], block[i + 1], block[i + 2], block[i + 3]];
            if le {
                u32::from_le_bytes(b)
            } else {
                u32::from_be_bytes(b)
            }
        };
        assert_eq!(word(0), SYNC_TAG);
        assert_eq!(word(4), 1001 | USER_FLAG_BIT | (3 << 20));
        assert_eq!(word(8), 99);
        assert_eq!(word(12), 4);
        let body: [u8; 4] = if le { [7, 0, 0, 0] } else { [0, 7, 0, 0] };
        assert_eq!(&block[16..], &body[..]);
    }

    #[test]
    fn searchable_only_from_children() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        let mut a = ItemHeader::new(1, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_u8(1);
        buf.put_item_end(&mut a).unwrap();
        assert!(!a.searchable);
        assert_eq!(a.length, 4);
        buf.put_item_end(&mut top).unwrap();
        assert!(top.searchable);
        assert_eq!(top.length, 16);

        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        buf.put_u32(5);
        let mut a = ItemHeader::new(1, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_item_end(&mut a).unwrap();
        assert!(a.searchable);
        buf.put_item_end(&mut top).unwrap();
        assert!(!top.searchable);
    }

    #[test]
    fn end_closes_open_children() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        let mut a = ItemHeader::new(1, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        let mut b = ItemHeader::new(2, 0, -1);
        buf.put_item_begin(&mut b).unwrap();
        buf.put_u8(9);
        buf.put_item_end(&mut top).unwrap();
        assert_eq!(top.length, 12 + 12 + 4);
        assert!(top.searchable);
        assert_eq!(buf.depth(), 0);
    }

    #[test]
    fn depth_limit() {
        let mut buf = IoBuffer::new(BufferConfig::new().with_max_depth(2))
            .unwrap()
            .with_diagnostics(Diagnostics::silent());
        let mut a = ItemHeader::new(1, 0, -1);
        let mut b = ItemHeader::new(2, 0, -1);
        let mut c = ItemHeader::new(3, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_item_begin(&mut b).unwrap();
        assert!(matches!(
            buf.put_item_begin(&mut c),
            Err(Error::DepthExceeded { max: 2, item_type: 3 })
        ));
        buf.put_item_end(&mut b).unwrap();
        buf.put_item_end(&mut a).unwrap();
    }

    #[test]
    fn rejects_bad_headers() {
        let mut buf = buffer();
        assert!(buf.put_item_begin(&mut ItemHeader::new(0, 0, 0)).is_err());
        assert!(buf.put_item_begin(&mut ItemHeader::new(5, 0x800, 0)).is_err());
        assert_eq!(buf.depth(), 0);
    }

    #[test]
    fn unput_keeps_siblings() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        let mut a = ItemHeader::new(1, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_u32(1);
        buf.put_item_end(&mut a).unwrap();
        let mut b = ItemHeader::new(2, 0, -1);
        buf.put_item_begin(&mut b).unwrap();
        buf.put_u32(2);
        buf.unput_item(&b).unwrap();
        buf.put_item_end(&mut top).unwrap();
        assert_eq!(top.length, 16);
        assert!(top.searchable);

        let top = buf.get_item_begin(10).unwrap();
        assert_eq!(buf.next_subitem_type().unwrap(), 1);
        buf.skip_subitem().unwrap();
        assert!(matches!(buf.get_item_begin(0), Err(Error::EndOfItem)));
        buf.get_item_end(&top).unwrap();
    }

    #[test]
    fn remove_closed_item() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        let mut a = ItemHeader::new(1, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_u32(1);
        buf.put_item_end(&mut a).unwrap();
        let mut b = ItemHeader::new(2, 0, -1);
        buf.put_item_begin(&mut b).unwrap();
        buf.put_vector_of_u32(&[1, 2, 3]);
        buf.put_item_end(&mut b).unwrap();
        buf.remove_item(&mut b).unwrap();
        assert_eq!(b.item_type, 0);
        // with b gone, a is the last item again
        buf.remove_item(&mut a).unwrap();
        buf.put_item_end(&mut top).unwrap();
        assert_eq!(top.length, 0);
        assert!(top.searchable);
    }

    #[test]
    fn type_mismatch_is_a_peek() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(42, 0, 7);
        buf.put_item_begin(&mut top).unwrap();
        buf.put_item_end(&mut top).unwrap();

        let err = buf.get_item_begin(43).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(buf.depth(), 0);
        let top = buf.get_item_begin(42).unwrap();
        assert_eq!(top.ident, 7);
        buf.get_item_end(&top).unwrap();
    }

    #[test]
    fn under_and_over_consumption() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        let mut a = ItemHeader::new(1, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_vector_of_u32(&[1, 2, 3]);
        buf.put_item_end(&mut a).unwrap();
        let mut b = ItemHeader::new(2, 0, -1);
        buf.put_item_begin(&mut b).unwrap();
        buf.put_u32(4);
        buf.put_item_end(&mut b).unwrap();
        buf.put_item_end(&mut top).unwrap();

        let top = buf.get_item_begin(10).unwrap();
        let a = buf.get_item_begin(1).unwrap();
        assert_eq!(buf.get_u32().unwrap(), 1);
        buf.get_item_end(&a).unwrap();
        let b = buf.get_item_begin(2).unwrap();
        // reads stop at the end of the block
        buf.get_u64().unwrap_err();
        assert_eq!(buf.get_u32().unwrap(), 4);
        buf.get_item_end(&b).unwrap();
        buf.get_item_end(&top).unwrap();
    }

    fn capture() -> (Diagnostics, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let diag = Diagnostics::new().with_sink(move |_, msg| log.lock().unwrap().push(msg.to_string()));
        (diag, seen)
    }

    #[test]
    fn over_consumption_warns() {
        let (diag, seen) = capture();
        let mut buf = buffer().with_diagnostics(diag);
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        let mut a = ItemHeader::new(1, 0, -1);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_u32(1);
        buf.put_item_end(&mut a).unwrap();
        let mut b = ItemHeader::new(2, 0, 5);
        buf.put_item_begin(&mut b).unwrap();
        buf.put_u32(4);
        buf.put_item_end(&mut b).unwrap();
        buf.put_item_end(&mut top).unwrap();

        let top = buf.get_item_begin(10).unwrap();
        let a = buf.get_item_begin(1).unwrap();
        // runs into the header of b
        buf.get_u64().unwrap();
        buf.get_item_end(&a).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(seen.lock().unwrap()[0].contains("exceeds specified length"));

        let b = buf.get_item_begin(2).unwrap();
        assert_eq!(b.ident, 5);
        assert_eq!(buf.get_u32().unwrap(), 4);
        buf.get_item_end(&b).unwrap();
        buf.get_item_end(&top).unwrap();
    }

    #[test]
    fn length_overflow() {
        let (diag, seen) = capture();
        let mut buf = buffer().with_diagnostics(diag);
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        let mut f = buf.frames.pop().unwrap();
        assert!(matches!(
            buf.patch_length(&mut f, MAX_ITEM_LENGTH + 1),
            Err(Error::LengthOverflow { length }) if length == MAX_ITEM_LENGTH + 1
        ));
        assert!(seen.lock().unwrap()[0].contains("too long for data format"));

        // the longest body still fits, in the extension word
        assert!(!buf.patch_length(&mut f, MAX_ITEM_LENGTH).unwrap());
        assert!(f.extended);
        assert_eq!(buf.read_u32_at(f.data_start - 8), LENGTH_EXT_BIT | LENGTH_LOW_MASK);
        assert_eq!(buf.read_u32_at(f.data_start - 4), LENGTH_HIGH_MASK);
    }

    #[test]
    fn sub_item_after_odd_raw_data() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        buf.put_u8(0xaa);
        let mut a = ItemHeader::new(1, 0, 3);
        buf.put_item_begin(&mut a).unwrap();
        buf.put_u16(0x1234);
        buf.put_item_end(&mut a).unwrap();
        buf.put_item_end(&mut top).unwrap();
        // headers follow the raw byte directly, the body is padded at the end
        assert_eq!(top.length, 1 + 12 + 4 + 3);
        assert!(!top.searchable);

        let top = buf.get_item_begin(10).unwrap();
        assert_eq!(buf.get_u8().unwrap(), 0xaa);
        let a = buf.get_item_begin(1).unwrap();
        assert_eq!(a.ident, 3);
        assert_eq!(buf.get_u16().unwrap(), 0x1234);
        buf.get_item_end(&a).unwrap();
        assert!(matches!(buf.get_item_begin(0), Err(Error::EndOfItem)));
        buf.get_item_end(&top).unwrap();
    }

    #[test]
    fn widening() {
        let mut buf = buffer();
        let mut top = ItemHeader::new(10, 0, -1);
        buf.put_item_begin(&mut top).unwrap();
        buf.put_u32(0xdead_beef);
        let len_before = buf.data.len();
        let mut f = buf.frames.pop().unwrap();
        buf.widen(&mut f).unwrap();
        assert_eq!(buf.data.len(), len_before + 4);
        assert_eq!(f.data_start, 20);
        assert_eq!(buf.read_u32_at(16), 0);
        assert_eq!(buf.read_u32_at(20), 0xdead_beef);
        assert_ne!(buf.read_u32_at(4) & EXTENDED_BIT, 0);
    }

    #[test]
    fn display() {
        let h = ItemHeader {
            length: 96,
            ..ItemHeader::new(1234, 2, 5).with_user_flag(true)
        };
        assert_eq!(h.to_string(), "Type 1234, version 2, length 96 (*id 5 = 0x5)");
        assert_eq!(
            ItemHeader::new(7, 0, -1).with_extension(true).to_string(),
            "Type    7, version 0, extended length 0"
        );
    }
}
