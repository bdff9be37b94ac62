//! # Scalar and string codecs
//!
//! Everything inside an item body is written through [`SerializerExt`] and
//! [`StringSerializer`] and read back through [`DeserializerExt`] and
//! [`StringDeserializer`]. The traits are implemented for
//! [`IoBuffer`](crate::IoBuffer), which follows the byte order of the block
//! being written or read, and for plain `Vec<u8>` / `&[u8]`, which are always
//! little-endian.
//!
//! # Example
//!
//! ```
//! use eventio::encoding::*;
//!
//! let mut out = Vec::new();
//! out.put_i32(-1);
//! out.put_count(300);
//! out.put_var_string("photons").unwrap();
//! out.put_sfloat(0.5);
//!
//! let mut input: &[u8] = &out;
//! assert_eq!(input.get_i32().unwrap(), -1);
//! assert_eq!(input.get_count().unwrap(), 300);
//! assert_eq!(input.get_var_string_bytes().unwrap(), "photons");
//! assert_eq!(input.get_sfloat().unwrap(), 0.5);
//! ```

pub mod constants;
pub mod count;
pub mod de;
pub mod ser;
pub mod string;

pub use de::*;
pub use ser::*;
pub use string::*;
