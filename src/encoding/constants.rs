/// Marks the start of every top-level block, 0xD41F8A37.
pub const SYNC_TAG: u32 = 0xD41F_8A37;
/// The sync tag as seen through the wrong byte order.
pub const SYNC_TAG_SWAPPED: u32 = 0x378A_1FD4;

/// Type word, identifier and length word.
pub const ITEM_HEADER_LEN: usize = 12;
/// Optional word carrying the upper length bits.
pub const EXTENSION_LEN: usize = 4;
/// Sync tag plus item header.
pub const BLOCK_HEADER_LEN: usize = 4 + ITEM_HEADER_LEN;

/// Type word: item type, bits 0-15.
pub(crate) const TYPE_MASK: u32 = 0x0000_ffff;
/// Type word: user flag, bit 16.
pub(crate) const USER_FLAG_BIT: u32 = 0x0001_0000;
/// Type word: extension word present, bit 17.
pub(crate) const EXTENDED_BIT: u32 = 0x0002_0000;
/// Type word: version starts at bit 20.
pub(crate) const VERSION_SHIFT: u32 = 20;
pub(crate) const VERSION_MASK: u32 = 0xfff;
/// Versions with this bit set are taken as corrupted data.
pub(crate) const VERSION_CORRUPT_BIT: u16 = 0x800;
pub const MAX_VERSION: u16 = 0x7ff;

/// Length word: extension word follows, bit 31.
pub(crate) const LENGTH_EXT_BIT: u32 = 0x8000_0000;
/// Length word: body consists of sub-items only, bit 30.
pub(crate) const LENGTH_SEARCH_BIT: u32 = 0x4000_0000;
/// Length word: lower 30 bits of the body length.
pub(crate) const LENGTH_LOW_MASK: u32 = 0x3fff_ffff;
pub(crate) const LENGTH_LOW_BITS: u32 = 30;
/// Extension word: upper 12 bits of the body length.
pub(crate) const LENGTH_HIGH_MASK: u32 = 0x0fff;
/// Longest body a header can describe, 2^42 - 1.
pub const MAX_ITEM_LENGTH: u64 = (1 << 42) - 1;

/// Items are padded with zero bytes to this alignment.
pub const ITEM_ALIGN: usize = 4;

/// Size of the inline frame stack.
pub const MAX_ITEM_DEPTH: usize = 20;
pub const MIN_CAPACITY: usize = 32;
pub const DEFAULT_INITIAL_CAPACITY: usize = 32_768;
pub const DEFAULT_MAX_CAPACITY: usize = 3_000_000;
pub const DEFAULT_MAX_SYNC_ERRORS: u32 = 100;
pub const DEFAULT_MAX_SYNC_SKIP: u64 = 64 << 20;

/// Growth increments and the buffer sizes from which they apply.
pub(crate) const GROWTH_TIERS: [(usize, usize); 3] = [
    (8 << 20, 1 << 20),
    (2 << 20, 256 << 10),
    (1 << 20, 128 << 10),
];
pub(crate) const MIN_GROWTH: usize = 8192;

/// Chunk size used when a block has to be skipped by reading.
pub(crate) const SKIP_CHUNK: usize = 512;
