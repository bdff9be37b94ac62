use bytes::Bytes;
use eventio::{
    encoding::{constants::*, count::count_len, *},
    prelude::f16,
    util::padding,
    IoBuffer, ItemHeader, Result,
};
use proptest::prelude::*;

/// One value written with one codec call.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(u32),
    F64(u64),
    Half(u16),
    Count(u64),
    SCount(i64),
    Str(Bytes),
    VarStr(Bytes),
}

impl Scalar {
    /// Bytes it takes on the wire.
    pub fn encoded_len(&self) -> usize {
        match self {
            Scalar::U8(_) | Scalar::I8(_) => 1,
            Scalar::U16(_) | Scalar::I16(_) | Scalar::Half(_) => 2,
            Scalar::U32(_) | Scalar::I32(_) | Scalar::F32(_) => 4,
            Scalar::U64(_) | Scalar::I64(_) | Scalar::F64(_) => 8,
            Scalar::Count(n) => count_len(*n),
            Scalar::SCount(n) => count_len(count::zigzag(*n)),
            Scalar::Str(s) => 2 + s.len(),
            Scalar::VarStr(s) => count_len(s.len() as u64) + s.len(),
        }
    }

    pub fn write<S: Serializer + ?Sized>(&self, out: &mut S) {
        match self {
            Scalar::U8(v) => out.put_u8(*v),
            Scalar::I8(v) => out.put_i8(*v),
            Scalar::U16(v) => out.put_u16(*v),
            Scalar::I16(v) => out.put_i16(*v),
            Scalar::U32(v) => out.put_u32(*v),
            Scalar::I32(v) => out.put_i32(*v),
            Scalar::U64(v) => out.put_u64(*v),
            Scalar::I64(v) => out.put_i64(*v),
            Scalar::F32(bits) => out.put_f32(f32::from_bits(*bits)),
            Scalar::F64(bits) => out.put_f64(f64::from_bits(*bits)),
            Scalar::Half(bits) => out.put_f16(f16::from_bits(*bits)),
            Scalar::Count(v) => out.put_count(*v),
            Scalar::SCount(v) => out.put_scount(*v),
            Scalar::Str(s) => {
                let _ = out.put_string(&s[..]);
            }
            Scalar::VarStr(s) => {
                let _ = out.put_var_string(&s[..]);
            }
        }
    }

    /// Reads a value of the same kind. Floats compare by their bits.
    pub fn read_like<D: Deserializer + ?Sized>(&self, input: &mut D) -> Result<Scalar> {
        Ok(match self {
            Scalar::U8(_) => Scalar::U8(input.get_u8()?),
            Scalar::I8(_) => Scalar::I8(input.get_i8()?),
            Scalar::U16(_) => Scalar::U16(input.get_u16()?),
            Scalar::I16(_) => Scalar::I16(input.get_i16()?),
            Scalar::U32(_) => Scalar::U32(input.get_u32()?),
            Scalar::I32(_) => Scalar::I32(input.get_i32()?),
            Scalar::U64(_) => Scalar::U64(input.get_u64()?),
            Scalar::I64(_) => Scalar::I64(input.get_i64()?),
            Scalar::F32(_) => Scalar::F32(input.get_f32()?.to_bits()),
            Scalar::F64(_) => Scalar::F64(input.get_f64()?.to_bits()),
            Scalar::Half(_) => Scalar::Half(input.get_f16()?.to_bits()),
            Scalar::Count(_) => Scalar::Count(input.get_count()?),
            Scalar::SCount(_) => Scalar::SCount(input.get_scount()?),
            Scalar::Str(_) => Scalar::Str(input.get_string_bytes()?),
            Scalar::VarStr(_) => Scalar::VarStr(input.get_var_string_bytes()?),
        })
    }
}

/// arbitrary Bytes for use with proptest
pub fn arb_bs() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..300).prop_map(Bytes::from)
}

/// Counts at and around every encoding width boundary.
pub fn arb_count_boundary() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(u64::MAX),
        (1u32..10, -1i64..=1).prop_map(|(k, d)| {
            let edge = if k * 7 >= 64 { u64::MAX } else { 1u64 << (k * 7) };
            (edge as i128 + d as i128).clamp(0, u64::MAX as i128) as u64
        }),
        any::<u64>(),
    ]
}

/// Signed counts near the boundaries of their zigzag images.
pub fn arb_scount_boundary() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(i64::MIN),
        Just(i64::MAX),
        (1u32..9, -1i64..=1, any::<bool>()).prop_map(|(k, d, neg)| {
            let edge = (1i64 << (k * 7 - 1)) + d;
            if neg {
                -edge
            } else {
                edge
            }
        }),
        any::<i64>(),
    ]
}

/// arbitrary Scalar for use with proptest
pub fn arb_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<u8>().prop_map(Scalar::U8),
        any::<i8>().prop_map(Scalar::I8),
        any::<u16>().prop_map(Scalar::U16),
        any::<i16>().prop_map(Scalar::I16),
        any::<u32>().prop_map(Scalar::U32),
        any::<i32>().prop_map(Scalar::I32),
        any::<u64>().prop_map(Scalar::U64),
        any::<i64>().prop_map(Scalar::I64),
        any::<u32>().prop_map(Scalar::F32),
        any::<u64>().prop_map(Scalar::F64),
        any::<u16>().prop_map(Scalar::Half),
        arb_count_boundary().prop_map(Scalar::Count),
        arb_scount_boundary().prop_map(Scalar::SCount),
        arb_bs().prop_map(Scalar::Str),
        arb_bs().prop_map(Scalar::VarStr),
    ]
}

/// True if the sync tag occurs in `bytes` in either byte order.
pub fn contains_sync_tag(bytes: &[u8]) -> bool {
    let le = SYNC_TAG.to_le_bytes();
    let be = SYNC_TAG.to_be_bytes();
    bytes.windows(4).any(|w| w == le || w == be)
}

/// Bytes that cannot be mistaken for the start of a block, even when
/// followed by one.
pub fn arb_garbage(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..max_len).prop_filter("no sync tag", |bytes| {
        [SYNC_TAG.to_le_bytes(), SYNC_TAG.to_be_bytes()].iter().all(|tag| {
            let mut probe = bytes.clone();
            probe.extend_from_slice(tag);
            !contains_sync_tag(&probe[..probe.len() - 1])
        })
    })
}

/// What goes into an item body, in order.
#[derive(Clone, Debug)]
pub enum Part {
    Raw(Scalar),
    Item(ItemScript),
}

/// How to build one item.
#[derive(Clone, Debug)]
pub struct ItemScript {
    pub item_type: u16,
    pub version: u16,
    pub ident: i32,
    pub parts: Vec<Part>,
}

impl ItemScript {
    /// Searchable exactly when nothing but sub-items went into the body.
    pub fn expect_searchable(&self) -> bool { self.parts.iter().all(|p| matches!(p, Part::Item(_))) }

    /// Body length including padding.
    pub fn body_len(&self) -> usize {
        let raw: usize = self
            .parts
            .iter()
            .map(|p| match p {
                Part::Raw(s) => s.encoded_len(),
                Part::Item(item) => ITEM_HEADER_LEN + item.body_len(),
            })
            .sum();
        raw + padding(raw)
    }

    pub fn depth(&self) -> usize {
        1 + self
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Item(item) => Some(item.depth()),
                Part::Raw(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Writes the item and everything in it.
    pub fn write(&self, buf: &mut IoBuffer) -> Result<ItemHeader> {
        let mut header = ItemHeader::new(self.item_type, self.version, self.ident);
        buf.put_item_begin(&mut header)?;
        for part in &self.parts {
            match part {
                Part::Raw(s) => s.write(buf),
                Part::Item(item) => {
                    item.write(buf)?;
                }
            }
        }
        buf.put_item_end(&mut header)?;
        Ok(header)
    }

    /// Reads the item back, checking every header field and value.
    pub fn verify(&self, buf: &mut IoBuffer) -> std::result::Result<(), String> {
        let header = buf
            .get_item_begin(self.item_type)
            .map_err(|e| format!("begin of type {}: {}", self.item_type, e))?;
        if header.ident != self.ident || header.version != self.version {
            return Err(format!("header mismatch: {:?} vs {:?}", header, self));
        }
        if header.searchable != self.expect_searchable() {
            return Err(format!("searchable flag wrong on {}", header));
        }
        if header.length != self.body_len() as u64 {
            return Err(format!("{} but body is {} bytes", header, self.body_len()));
        }
        for part in &self.parts {
            match part {
                Part::Raw(s) => {
                    let got = s.read_like(buf).map_err(|e| e.to_string())?;
                    if &got != s {
                        return Err(format!("wrote {:?}, read {:?}", s, got));
                    }
                }
                Part::Item(item) => item.verify(buf)?,
            }
        }
        buf.get_item_end(&header).map_err(|e| e.to_string())
    }
}

fn arb_part_list(inner: BoxedStrategy<ItemScript>) -> impl Strategy<Value = Vec<Part>> {
    prop::collection::vec(
        prop_oneof![
            arb_scalar().prop_map(Part::Raw),
            inner.prop_map(Part::Item),
        ],
        0..6,
    )
}

/// arbitrary item-construction script for use with proptest
pub fn arb_item_script() -> impl Strategy<Value = ItemScript> {
    let leaf = (1u16.., 0u16..=MAX_VERSION, any::<i32>(), prop::collection::vec(arb_scalar(), 0..6)).prop_map(
        |(item_type, version, ident, raw)| ItemScript {
            item_type,
            version,
            ident,
            parts: raw.into_iter().map(Part::Raw).collect(),
        },
    );
    leaf.prop_recursive(
        6,  // max depth
        40, // max nodes
        6,  // max parts per item
        |inner| {
            (1u16.., 0u16..=MAX_VERSION, any::<i32>(), arb_part_list(inner)).prop_map(
                |(item_type, version, ident, parts)| ItemScript {
                    item_type,
                    version,
                    ident,
                    parts,
                },
            )
        },
    )
}
