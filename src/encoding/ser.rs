use super::count::{encode_count, zigzag, MAX_COUNT_LEN};
use crate::float::to_sfloat;
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use half::f16;

/// A byte sink that knows which byte order it writes.
pub trait Serializer {
    /// Add a byte to the output.
    fn put_u8(&mut self, u: u8);
    /// Add a slice to the output.
    fn put_slice(&mut self, slice: &[u8]);
    /// True if multi-byte values go least significant byte first.
    fn is_little_endian(&self) -> bool;
}

/// Standalone payloads, least significant byte first.
impl Serializer for Vec<u8> {
    fn put_u8(&mut self, u: u8) { self.push(u) }

    fn put_slice(&mut self, slice: &[u8]) { self.extend_from_slice(slice) }

    fn is_little_endian(&self) -> bool { true }
}

macro_rules! put_fixed {
    ($($put:ident, $put_vec:ident, $ty:ty, $write:ident, $n:expr;)*) => {$(
        #[doc = concat!("Add a [`", stringify!($ty), "`] in the byte order of the output.")]
        fn $put(&mut self, v: $ty) {
            let mut buf = [0u8; $n];
            if self.is_little_endian() {
                LittleEndian::$write(&mut buf, v)
            } else {
                BigEndian::$write(&mut buf, v)
            }
            self.put_slice(&buf)
        }

        #[doc = concat!("Add a run of [`", stringify!($ty), "`] values.")]
        fn $put_vec(&mut self, vs: &[$ty]) {
            for &v in vs {
                self.$put(v)
            }
        }
    )*};
}

/// Scalar encoders for every [`Serializer`].
pub trait SerializerExt: Serializer {
    put_fixed! {
        put_u16, put_vector_of_u16, u16, write_u16, 2;
        put_i16, put_vector_of_i16, i16, write_i16, 2;
        put_u32, put_vector_of_u32, u32, write_u32, 4;
        put_i32, put_vector_of_i32, i32, write_i32, 4;
        put_u64, put_vector_of_u64, u64, write_u64, 8;
        put_i64, put_vector_of_i64, i64, write_i64, 8;
        put_f32, put_vector_of_f32, f32, write_f32, 4;
        put_f64, put_vector_of_f64, f64, write_f64, 8;
    }

    fn put_vector_of_u8(&mut self, vs: &[u8]) { self.put_slice(vs) }

    fn put_i8(&mut self, i: i8) { self.put_u8(i as u8) }

    fn put_vector_of_i8(&mut self, vs: &[i8]) {
        for &v in vs {
            self.put_i8(v)
        }
    }

    fn put_bool(&mut self, b: bool) { self.put_u8(b as u8) }

    fn put_vector_of_bool(&mut self, vs: &[bool]) {
        for &v in vs {
            self.put_bool(v)
        }
    }

    /// Add a double with single precision.
    fn put_real(&mut self, f: f64) { self.put_f32(f as f32) }

    fn put_vector_of_real(&mut self, vs: &[f64]) {
        for &v in vs {
            self.put_real(v)
        }
    }

    /// Add a double with half precision.
    fn put_sfloat(&mut self, f: f64) { self.put_u16(to_sfloat(f)) }

    fn put_vector_of_sfloat(&mut self, vs: &[f64]) {
        for &v in vs {
            self.put_sfloat(v)
        }
    }

    fn put_f16(&mut self, f: f16) { self.put_u16(f.to_bits()) }

    /// Add an unsigned variable-width integer, 1 to 9 bytes.
    fn put_count(&mut self, n: u64) {
        let mut buf = [0u8; MAX_COUNT_LEN];
        let len = encode_count(n, &mut buf);
        self.put_slice(&buf[..len])
    }

    fn put_count32(&mut self, n: u32) { self.put_count(u64::from(n)) }

    fn put_count16(&mut self, n: u16) { self.put_count(u64::from(n)) }

    /// Add a signed variable-width integer, zig-zag mapped.
    fn put_scount(&mut self, n: i64) { self.put_count(zigzag(n)) }

    fn put_scount32(&mut self, n: i32) { self.put_scount(i64::from(n)) }

    fn put_scount16(&mut self, n: i16) { self.put_scount(i64::from(n)) }

    fn put_vector_of_scount(&mut self, vs: &[i32]) {
        for &v in vs {
            self.put_scount32(v)
        }
    }
}

impl<S: Serializer + ?Sized> SerializerExt for S {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_vec() {
        let mut out = Vec::new();
        out.put_u16(0x0102);
        out.put_i32(-2);
        out.put_count(300);
        out.put_scount(-1);
        assert_eq!(out, vec![0x02, 0x01, 0xfe, 0xff, 0xff, 0xff, 0x81, 0x2c, 0x01]);
    }

    #[test]
    fn floats() {
        let mut out = Vec::new();
        out.put_real(1.5);
        out.put_sfloat(-2.0);
        assert_eq!(out, vec![0x00, 0x00, 0xc0, 0x3f, 0x00, 0xc0]);
    }
}
