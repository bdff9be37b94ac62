//! Length-prefixed byte strings.
//!
//! Three flavours differ only in the length prefix: a `u16` ([`put_string`]),
//! a 32-bit word ([`put_long_string`]) or a count ([`put_var_string`]). No
//! terminating NUL goes on the wire.
//!
//! Readers either copy into a caller buffer, which is always NUL-terminated and
//! may truncate, or return the whole string as [`Bytes`].
//!
//! [`put_string`]: StringSerializer::put_string
//! [`put_long_string`]: StringSerializer::put_long_string
//! [`put_var_string`]: StringSerializer::put_var_string

use super::{
    count::{decode_count, extra_bytes},
    de::*,
    ser::*,
};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use crate::errors::*;
use bytes::Bytes;

/// String encoders for every [`Serializer`].
pub trait StringSerializer: SerializerExt {
    /// Add a string with a 16-bit length. Returns the number of string bytes.
    fn put_string<S: AsRef<[u8]> + ?Sized>(&mut self, s: &S) -> Result<usize> {
        let s = s.as_ref();
        if s.len() > usize::from(u16::MAX) {
            return Err(Error::StringTooLong {
                length: s.len(),
                max: usize::from(u16::MAX),
            });
        }
        self.put_u16(s.len() as u16);
        self.put_slice(s);
        Ok(s.len())
    }

    /// Add a string with a 32-bit length.
    fn put_long_string<S: AsRef<[u8]> + ?Sized>(&mut self, s: &S) -> Result<usize> {
        let s = s.as_ref();
        if s.len() > i32::MAX as usize {
            return Err(Error::StringTooLong {
                length: s.len(),
                max: i32::MAX as usize,
            });
        }
        self.put_i32(s.len() as i32);
        self.put_slice(s);
        Ok(s.len())
    }

    /// Add a string with a variable-width length.
    fn put_var_string<S: AsRef<[u8]> + ?Sized>(&mut self, s: &S) -> Result<usize> {
        let s = s.as_ref();
        self.put_count(s.len() as u64);
        self.put_slice(s);
        Ok(s.len())
    }
}

impl<S: Serializer + ?Sized> StringSerializer for S {}

#[derive(Copy, Clone)]
enum Prefix {
    Short,
    Long,
    Var,
}

/// Size of the length prefix at the cursor and the length it announces.
fn peek_prefix<D: Deserializer + ?Sized>(de: &D, prefix: Prefix) -> Result<(usize, u64)> {
    let little = de.is_little_endian();
    Ok(match prefix {
        Prefix::Short => {
            let b = de.peek_bytes(2)?;
            let n = if little { LittleEndian::read_u16(b) } else { BigEndian::read_u16(b) };
            (2, u64::from(n))
        }
        Prefix::Long => {
            let b = de.peek_bytes(4)?;
            let n = if little { LittleEndian::read_u32(b) } else { BigEndian::read_u32(b) };
            (4, u64::from(n))
        }
        Prefix::Var => {
            let len = 1 + extra_bytes(de.peek_bytes(1)?[0]);
            let b = de.peek_bytes(len)?;
            (len, decode_count(b[0], &b[1..]))
        }
    })
}

/// Consumes prefix and string together, or nothing at all.
fn take_string<D: Deserializer + ?Sized>(de: &mut D, prefix: Prefix) -> Result<&[u8]> {
    let (head, n) = peek_prefix(de, prefix)?;
    let total = match usize::try_from(n).ok().and_then(|n| n.checked_add(head)) {
        Some(total) if total <= de.remaining() => total,
        _ => {
            return Err(Error::Underflow {
                wanted: head.saturating_add(n as usize),
                remaining: de.remaining(),
            })
        }
    };
    Ok(&de.take_bytes(total)?[head..])
}

fn fill(src: &[u8], out: &mut [u8]) -> usize {
    if let Some(room) = out.len().checked_sub(1) {
        let copied = room.min(src.len());
        out[..copied].copy_from_slice(&src[..copied]);
        out[copied] = 0;
    }
    src.len()
}

/// String decoders for every [`Deserializer`].
///
/// A string that does not fit in the remaining input leaves the cursor where
/// it was.
pub trait StringDeserializer: DeserializerExt {
    /// Read a string with a 16-bit length into `out`.
    ///
    /// At most `out.len() - 1` bytes are copied, followed by a NUL; any excess
    /// is skipped. Returns the full length of the stored string.
    fn get_string(&mut self, out: &mut [u8]) -> Result<usize> { Ok(fill(take_string(self, Prefix::Short)?, out)) }

    /// Read a string with a 32-bit length into `out`.
    fn get_long_string(&mut self, out: &mut [u8]) -> Result<usize> { Ok(fill(take_string(self, Prefix::Long)?, out)) }

    /// Read a string with a variable-width length into `out`.
    fn get_var_string(&mut self, out: &mut [u8]) -> Result<usize> { Ok(fill(take_string(self, Prefix::Var)?, out)) }

    fn get_string_bytes(&mut self) -> Result<Bytes> { Ok(Bytes::copy_from_slice(take_string(self, Prefix::Short)?)) }

    fn get_long_string_bytes(&mut self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(take_string(self, Prefix::Long)?))
    }

    fn get_var_string_bytes(&mut self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(take_string(self, Prefix::Var)?))
    }
}

impl<D: Deserializer + ?Sized> StringDeserializer for D {}
