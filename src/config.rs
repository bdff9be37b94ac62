use crate::encoding::constants::*;

/// Which byte order multi-byte values are written in, relative to the host.
///
/// Readers never need to set this: the sync tag of every block tells them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Host byte order.
    Native,
    /// The reverse of the host byte order.
    Swapped,
}

impl ByteOrder {
    /// True if values in this order are stored least significant byte first.
    pub fn is_little_endian(self) -> bool {
        match self {
            ByteOrder::Native => cfg!(target_endian = "little"),
            ByteOrder::Swapped => !cfg!(target_endian = "little"),
        }
    }

    /// The order that stores values least (`true`) or most significant byte first.
    pub fn from_little_endian(little: bool) -> Self {
        if little == cfg!(target_endian = "little") {
            ByteOrder::Native
        } else {
            ByteOrder::Swapped
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self { ByteOrder::Native }
}

/// Settings of one I/O session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Size the buffer starts with and shrinks back to on reset.
    pub initial_capacity: usize,
    /// Growth ceiling.
    pub max_capacity: usize,
    /// Maximum item nesting depth, at most [`MAX_ITEM_DEPTH`].
    pub max_depth: usize,
    /// Resynchronisation events tolerated before `find_block` fails for good.
    pub max_sync_errors: u32,
    /// Garbage bytes a single `find_block` scans before giving up.
    pub max_sync_skip: u64,
    /// Reserve the extension length word in every item header.
    pub always_extended: bool,
    /// Byte order of written blocks.
    pub byte_order: ByteOrder,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_depth: MAX_ITEM_DEPTH,
            max_sync_errors: DEFAULT_MAX_SYNC_ERRORS,
            max_sync_skip: DEFAULT_MAX_SYNC_SKIP,
            always_extended: false,
            byte_order: ByteOrder::Native,
        }
    }
}

impl BufferConfig {
    pub fn new() -> Self { Self::default() }

    pub fn with_initial_capacity(mut self, n: usize) -> Self {
        self.initial_capacity = n;
        self
    }

    pub fn with_max_capacity(mut self, n: usize) -> Self {
        self.max_capacity = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.min(MAX_ITEM_DEPTH);
        self
    }

    pub fn with_max_sync_errors(mut self, n: u32) -> Self {
        self.max_sync_errors = n;
        self
    }

    pub fn with_max_sync_skip(mut self, n: u64) -> Self {
        self.max_sync_skip = n;
        self
    }

    pub fn with_always_extended(mut self, extended: bool) -> Self {
        self.always_extended = extended;
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }
}
