use super::count::{decode_count, extra_bytes, unzigzag};
use crate::{errors::*, float::from_sfloat};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use half::f16;
use num_traits::{Bounded, ToPrimitive};
use std::fmt;

/// A byte source that knows which byte order it reads.
pub trait Deserializer {
    /// Consume the next `n` bytes, or fail with [`Error::Underflow`] without
    /// consuming anything.
    fn take_bytes(&mut self, n: usize) -> Result<&[u8]>;
    /// The next `n` bytes, without consuming them.
    fn peek_bytes(&self, n: usize) -> Result<&[u8]>;
    /// Bytes left to read.
    fn remaining(&self) -> usize;
    /// True if multi-byte values come least significant byte first.
    fn is_little_endian(&self) -> bool;
    /// Report a value that had to be clipped to fit its type.
    fn warn(&self, _msg: fmt::Arguments) {}
}

/// Standalone payloads, least significant byte first.
impl<'a> Deserializer for &'a [u8] {
    fn take_bytes(&mut self, n: usize) -> Result<&[u8]> {
        if self.len() < n {
            return Err(Error::Underflow {
                wanted: n,
                remaining: self.len(),
            });
        }
        let (head, tail) = self.split_at(n);
        *self = tail;
        Ok(head)
    }

    fn peek_bytes(&self, n: usize) -> Result<&[u8]> {
        self.get(..n).ok_or(Error::Underflow {
            wanted: n,
            remaining: self.len(),
        })
    }

    fn remaining(&self) -> usize { self.len() }

    fn is_little_endian(&self) -> bool { true }
}

fn clip<D, T, V>(de: &D, v: V, what: &str) -> T
where
    D: Deserializer + ?Sized,
    T: Bounded + num_traits::NumCast,
    V: num_traits::NumCast + Copy + fmt::Display,
{
    match num_traits::cast::<V, T>(v) {
        Some(t) => t,
        None => {
            de.warn(format_args!("value {} too large for {}, clipped", v, what));
            if v.to_i64().map_or(false, |x| x < 0) {
                T::min_value()
            } else {
                T::max_value()
            }
        }
    }
}

fn check<D: Deserializer + ?Sized>(de: &D, n: usize) -> Result<()> {
    if de.remaining() < n {
        Err(Error::Underflow {
            wanted: n,
            remaining: de.remaining(),
        })
    } else {
        Ok(())
    }
}

macro_rules! get_fixed {
    ($($get:ident, $get_vec:ident, $ty:ty, $read:ident, $n:expr;)*) => {$(
        #[doc = concat!("Read a [`", stringify!($ty), "`] in the byte order of the input.")]
        fn $get(&mut self) -> Result<$ty> {
            let little = self.is_little_endian();
            let bytes = self.take_bytes($n)?;
            Ok(if little {
                LittleEndian::$read(bytes)
            } else {
                BigEndian::$read(bytes)
            })
        }

        #[doc = concat!("Fill `out` with [`", stringify!($ty), "`] values.")]
        fn $get_vec(&mut self, out: &mut [$ty]) -> Result<()> {
            check(self, $n * out.len())?;
            for v in out.iter_mut() {
                *v = self.$get()?;
            }
            Ok(())
        }
    )*};
}

/// Scalar decoders for every [`Deserializer`].
pub trait DeserializerExt: Deserializer {
    get_fixed! {
        get_u16, get_vector_of_u16, u16, read_u16, 2;
        get_i16, get_vector_of_i16, i16, read_i16, 2;
        get_u32, get_vector_of_u32, u32, read_u32, 4;
        get_i32, get_vector_of_i32, i32, read_i32, 4;
        get_u64, get_vector_of_u64, u64, read_u64, 8;
        get_i64, get_vector_of_i64, i64, read_i64, 8;
        get_f32, get_vector_of_f32, f32, read_f32, 4;
        get_f64, get_vector_of_f64, f64, read_f64, 8;
    }

    fn get_u8(&mut self) -> Result<u8> { Ok(self.take_bytes(1)?[0]) }

    fn get_vector_of_u8(&mut self, out: &mut [u8]) -> Result<()> {
        out.copy_from_slice(self.take_bytes(out.len())?);
        Ok(())
    }

    fn get_i8(&mut self) -> Result<i8> { Ok(self.get_u8()? as i8) }

    fn get_vector_of_i8(&mut self, out: &mut [i8]) -> Result<()> {
        check(self, out.len())?;
        for v in out.iter_mut() {
            *v = self.get_i8()?;
        }
        Ok(())
    }

    fn get_bool(&mut self) -> Result<bool> { Ok(self.get_u8()? != 0) }

    fn get_vector_of_bool(&mut self, out: &mut [bool]) -> Result<()> {
        check(self, out.len())?;
        for v in out.iter_mut() {
            *v = self.get_bool()?;
        }
        Ok(())
    }

    /// Read a single precision value as a double.
    fn get_real(&mut self) -> Result<f64> { Ok(f64::from(self.get_f32()?)) }

    fn get_vector_of_real(&mut self, out: &mut [f64]) -> Result<()> {
        check(self, 4 * out.len())?;
        for v in out.iter_mut() {
            *v = self.get_real()?;
        }
        Ok(())
    }

    /// Read a half precision value as a double.
    fn get_sfloat(&mut self) -> Result<f64> { Ok(from_sfloat(self.get_u16()?)) }

    fn get_vector_of_sfloat(&mut self, out: &mut [f64]) -> Result<()> {
        check(self, 2 * out.len())?;
        for v in out.iter_mut() {
            *v = self.get_sfloat()?;
        }
        Ok(())
    }

    fn get_f16(&mut self) -> Result<f16> { Ok(f16::from_bits(self.get_u16()?)) }

    /// Read an unsigned variable-width integer.
    fn get_count(&mut self) -> Result<u64> {
        let lead = self.peek_bytes(1)?[0];
        let bytes = self.take_bytes(1 + extra_bytes(lead))?;
        Ok(decode_count(lead, &bytes[1..]))
    }

    /// Read a count, clipping values above `u32::MAX`.
    fn get_count32(&mut self) -> Result<u32> {
        let n = self.get_count()?;
        Ok(clip(self, n, "count32"))
    }

    /// Read a count, clipping values above `u16::MAX`.
    fn get_count16(&mut self) -> Result<u16> {
        let n = self.get_count()?;
        Ok(clip(self, n, "count16"))
    }

    /// Read a signed variable-width integer.
    fn get_scount(&mut self) -> Result<i64> { Ok(unzigzag(self.get_count()?)) }

    fn get_scount32(&mut self) -> Result<i32> {
        let n = self.get_scount()?;
        Ok(clip(self, n, "scount32"))
    }

    fn get_scount16(&mut self) -> Result<i16> {
        let n = self.get_scount()?;
        Ok(clip(self, n, "scount16"))
    }

    fn get_vector_of_scount(&mut self, out: &mut [i32]) -> Result<()> {
        check(self, out.len())?;
        for v in out.iter_mut() {
            *v = self.get_scount32()?;
        }
        Ok(())
    }
}

impl<D: Deserializer + ?Sized> DeserializerExt for D {}
