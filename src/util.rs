use crate::encoding::constants::*;

/// Number of zero bytes needed to bring `len` to the item alignment.
///
/// # Arguments
///
/// * `len: usize` - The unpadded body length.
///
/// # Example
///
/// ```
/// use eventio::util::padding;
///
/// assert_eq!(padding(0), 0);
/// assert_eq!(padding(5), 3);
/// assert_eq!(padding(8), 0);
/// ```
pub fn padding(len: usize) -> usize { (ITEM_ALIGN - len % ITEM_ALIGN) % ITEM_ALIGN }

/// How much a buffer of `capacity` bytes grows when it is `shortfall` bytes short.
///
/// Bigger buffers take bigger steps, so that a block written in many small
/// pieces is not reallocated for every piece.
///
/// # Arguments
///
/// * `capacity: usize` - The current buffer size.
/// * `shortfall: usize` - The number of bytes missing.
///
/// # Example
///
/// ```
/// use eventio::util::growth_increment;
///
/// // small buffers grow by at least 8 KiB
/// assert_eq!(growth_increment(32_768, 10), 8192);
/// // large ones by at least 1 MiB
/// assert_eq!(growth_increment(8 << 20, 10), 1 << 20);
/// // a big request is granted as is
/// assert_eq!(growth_increment(32_768, 100_000), 100_000);
/// ```
pub fn growth_increment(capacity: usize, shortfall: usize) -> usize {
    let tier = GROWTH_TIERS
        .iter()
        .find(|(from, _)| capacity >= *from)
        .map_or(MIN_GROWTH, |(_, step)| *step);
    let mut increment = shortfall.max(tier);
    if capacity > 65_536 && increment.saturating_mul(8) < capacity {
        increment = increment.max(((capacity - 1) / 65_536) * 8192);
    }
    increment
}

/// Splits a body length into the 30-bit base and 12-bit extension fields.
pub(crate) fn split_length(length: u64) -> Option<(u32, u32)> {
    if length > MAX_ITEM_LENGTH {
        None
    } else {
        Some((
            (length & u64::from(LENGTH_LOW_MASK)) as u32,
            (length >> LENGTH_LOW_BITS) as u32,
        ))
    }
}
