use failure::Fail;
use std::io;

/// Everything that can go wrong while building, reading or transporting items.
///
/// Only [`Error::TypeMismatch`] and [`Error::EndOfItem`] are soft: they are the
/// answers to "is the next item of this type?" and "is there another sub-item?"
/// and leave the buffer exactly where it was. Every other variant aborts the
/// top-level item in progress; the session itself stays usable for the next one.
#[derive(Debug, Fail)]
pub enum Error {
    /// The four bytes at the start of a block are neither the sync tag nor its
    /// byte reversal.
    #[fail(display = "invalid sync tag {:#010x}: input is not synchronised", found)]
    BadSyncTag {
        /// The tag as read in little-endian order.
        found: u32,
    },

    /// Too much garbage between blocks, either in one scan or summed over the
    /// session.
    #[fail(
        display = "too many synchronisation errors ({} events, {} bytes skipped in the last scan)",
        errors, skipped
    )]
    Desync {
        /// Bytes skipped in the scan that gave up.
        skipped: u64,
        /// Resynchronisation events counted so far in this session.
        errors: u32,
    },

    /// Another nested item would exceed the maximum nesting depth.
    #[fail(display = "maximum item depth {} exceeded by item type {}", max, item_type)]
    DepthExceeded { max: usize, item_type: u16 },

    /// The buffer cannot grow any further.
    #[fail(display = "cannot grow buffer to {} bytes (limit is {})", requested, limit)]
    BufferFull { requested: usize, limit: usize },

    /// A read would run past the end of the readable data.
    #[fail(display = "tried to read {} bytes with only {} remaining", wanted, remaining)]
    Underflow { wanted: usize, remaining: usize },

    /// An item body longer than the 42 bits the header can describe.
    #[fail(display = "item length {} does not fit into the header", length)]
    LengthOverflow { length: u64 },

    /// The next item is not of the requested type. The read position is unchanged.
    #[fail(display = "wanted item type {}, found {}", wanted, found)]
    TypeMismatch { wanted: u16, found: u16 },

    /// The input ended inside a block.
    #[fail(display = "unexpected end of input")]
    Eof,

    /// The byte source or sink failed.
    #[fail(display = "transport error: {}", _0)]
    Transport(#[fail(cause)] io::Error),

    /// No further sub-item inside the enclosing item.
    #[fail(display = "no more sub-items in the enclosing item")]
    EndOfItem,

    /// A header that cannot be right: corrupted version bits, a length reaching
    /// past its parent, a zero type.
    #[fail(display = "invalid item header: {}", _0)]
    InvalidHeader(String),

    /// An operation called in the wrong state, e.g. reading a block before finding it.
    #[fail(display = "invalid state: {}", _0)]
    InvalidState(&'static str),

    /// A string that does not fit its length prefix.
    #[fail(display = "string of {} bytes exceeds the maximum of {}", length, max)]
    StringTooLong { length: usize, max: usize },

    /// A block written in the other byte order cannot be spliced into this one.
    #[fail(display = "block byte order differs from the enclosing block")]
    ByteOrderMismatch,

    /// A buffer could not be created with the requested size.
    #[fail(display = "cannot allocate an I/O buffer of {} bytes", requested)]
    AllocationError { requested: usize },
}

impl Error {
    /// True for the soft codes that leave the buffer untouched.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. } | Error::EndOfItem)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::Eof,
            _ => Error::Transport(e),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
