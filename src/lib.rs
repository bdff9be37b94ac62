//! # eventio
//!
//! eventio is a binary format for streams of nested, self-describing records
//! ("items"), built for the large volumes of data produced by detector
//! simulations. Every item carries a type number, a version, an identifier and
//! its length, so readers can skip what they do not understand and find what
//! they do without decoding everything in between.
//!
//! # Usage
//!
//! All work happens in an [`IoBuffer`], which holds one top-level block at a
//! time. Items are opened and closed on it, and the values inside are written
//! and read with the codec traits from [`encoding`].
//!
//! ```
//! use eventio::prelude::*;
//!
//! let mut buf = IoBuffer::with_capacity(1024).unwrap();
//!
//! // write
//! let mut item = ItemHeader::new(42, 0, 7);
//! buf.put_item_begin(&mut item).unwrap();
//! buf.put_i32(-1);
//! buf.put_f64(3.14159265);
//! buf.put_count(300);
//! buf.put_item_end(&mut item).unwrap();
//! assert_eq!(item.length, 16);
//!
//! // and read it back
//! let item = buf.get_item_begin(42).unwrap();
//! assert_eq!(item.ident, 7);
//! assert_eq!(buf.get_i32().unwrap(), -1);
//! assert_eq!(buf.get_f64().unwrap(), 3.14159265);
//! assert_eq!(buf.get_count().unwrap(), 300);
//! buf.get_item_end(&item).unwrap();
//! ```
//!
//! With an output attached ([`IoBuffer::with_output`]) every completed
//! top-level item is written out as a block; with an input attached
//! ([`IoBuffer::with_input`]) blocks are found with [`IoBuffer::find_block`] and
//! loaded with [`IoBuffer::read_block`]. See [`transport`].
//!
//! # Format
//!
//! ## Blocks
//!
//! A top-level item is preceded by the sync tag `0xD41F8A37`, written in the
//! byte order of everything that follows. Readers accept both orders, so the
//! order may change from block to block.
//!
//! ## Item headers
//!
//! | Word | Bits   | Contents                                   |
//! | ---  | ---    | ---                                        |
//! | 0    | 0-15   | Type                                       |
//! | 0    | 16     | User flag                                  |
//! | 0    | 17     | Extension word present                     |
//! | 0    | 20-31  | Version (bit 31 must be 0)                 |
//! | 1    | 0-31   | Identifier, negative for none              |
//! | 2    | 0-29   | Length of the body, low 30 bits            |
//! | 2    | 30     | Searchable: body consists of items only    |
//! | 2    | 31     | Extension word present                     |
//! | 3    | 0-11   | Length, high 12 bits (extension word only) |
//!
//! Bodies are padded with zeros to a multiple of four bytes and may contain
//! further items, which have the same header but no sync tag.
//!
//! ## Counts
//!
//! Unsigned integers of unspecified width are stored in one to nine bytes; the
//! number of leading one bits in the first byte is the number of bytes that
//! follow. Signed counts are zigzag-mapped onto unsigned ones first. See
//! [`encoding::count`].
//!
//! ## Strings
//!
//! A length (16-bit, 32-bit or a count) followed by the bytes, without a
//! terminating NUL.

#![warn(
    deprecated_in_future,
    unsafe_code,
    unused_labels,
    keyword_idents,
    missing_debug_implementations,
    macro_use_extern_crate,
    trivial_casts,
    unused_extern_crates,
    unused_import_braces
)]
#![allow(clippy::cast_lossless)]

mod buffer;
pub mod config;
pub mod diagnostics;
pub mod encoding;
pub mod errors;
pub mod float;
mod item;
pub mod prelude;
mod search;
pub mod transport;
pub mod util;

pub use buffer::IoBuffer;
pub use config::{BufferConfig, ByteOrder};
pub use errors::{Error, Result};
pub use item::ItemHeader;
pub use search::SearchOutcome;
pub use transport::{BlockSource, MemorySink};
