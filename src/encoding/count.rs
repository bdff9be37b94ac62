//! Variable-width integers.
//!
//! The number of leading one bits of the first byte tells how many bytes
//! follow it, much like UTF-8. The remaining bits of the first byte are the most
//! significant bits of the value and the following bytes are the rest, most
//! significant first, whatever byte order the block uses:
//!
//! | first byte  | extra bytes | value bits |
//! |-------------|-------------|------------|
//! | `0xxxxxxx`  | 0           | 7          |
//! | `10xxxxxx`  | 1           | 14         |
//! | `110xxxxx`  | 2           | 21         |
//! | `1110xxxx`  | 3           | 28         |
//! | `11110xxx`  | 4           | 35         |
//! | `111110xx`  | 5           | 42         |
//! | `1111110x`  | 6           | 49         |
//! | `11111110`  | 7           | 56         |
//! | `11111111`  | 8           | 64         |
//!
//! Signed values are zig-zag mapped first, so that small magnitudes of either
//! sign stay short.

/// Longest encoding of a `u64`.
pub const MAX_COUNT_LEN: usize = 9;

/// Number of bytes `encode_count` uses for `n`.
pub fn count_len(n: u64) -> usize {
    (0..8)
        .find(|extra| n < 1u64 << (7 * (extra + 1)))
        .map_or(MAX_COUNT_LEN, |extra| extra as usize + 1)
}

/// Encodes `n` into `out`, returning the number of bytes used.
pub fn encode_count(n: u64, out: &mut [u8; MAX_COUNT_LEN]) -> usize {
    let len = count_len(n);
    let extra = len - 1;
    out[0] = if extra == 8 {
        0xff
    } else {
        !(0xffu8 >> extra) | (n >> (8 * extra)) as u8
    };
    for i in 1..len {
        out[i] = (n >> (8 * (extra - i))) as u8;
    }
    len
}

/// Number of bytes following a first byte of `lead`.
pub fn extra_bytes(lead: u8) -> usize { lead.leading_ones() as usize }

/// Decodes a count from its first byte and the `extra_bytes(lead)` bytes after it.
pub fn decode_count(lead: u8, rest: &[u8]) -> u64 {
    let extra = extra_bytes(lead);
    let head = if extra >= 7 {
        0
    } else {
        u64::from(lead & (0x7f >> extra))
    };
    rest.iter()
        .take(extra)
        .fold(head, |acc, &b| (acc << 8) | u64::from(b))
}

/// Maps signed onto unsigned values: 0, -1, 1, -2, ... become 0, 1, 2, 3, ...
pub fn zigzag(n: i64) -> u64 {
    if n < 0 {
        ((-(n + 1)) as u64) << 1 | 1
    } else {
        (n as u64) << 1
    }
}

/// Inverse of [`zigzag`].
pub fn unzigzag(u: u64) -> i64 {
    if u & 1 == 1 {
        -((u >> 1) as i64) - 1
    } else {
        (u >> 1) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(n: u64) -> Vec<u8> {
        let mut out = [0; MAX_COUNT_LEN];
        let len = encode_count(n, &mut out);
        out[..len].to_vec()
    }

    fn dec(bytes: &[u8]) -> u64 {
        assert_eq!(extra_bytes(bytes[0]) + 1, bytes.len());
        decode_count(bytes[0], &bytes[1..])
    }

    #[test]
    fn known_encodings() {
        assert_eq!(enc(0), vec![0x00]);
        assert_eq!(enc(127), vec![0x7f]);
        assert_eq!(enc(128), vec![0x80, 0x80]);
        assert_eq!(enc(300), vec![0x81, 0x2c]);
        assert_eq!(enc((1 << 14) - 1), vec![0xbf, 0xff]);
        assert_eq!(enc(1 << 14), vec![0xc0, 0x40, 0x00]);
        assert_eq!(enc((1 << 56) - 1), vec![0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(enc(1 << 56), vec![0xff, 0x01, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(enc(u64::MAX), vec![0xff; 9]);
    }

    #[test]
    fn boundaries() {
        for bits in (7..=56).step_by(7) {
            let edge = (1u64 << bits) - 1;
            let len = count_len(edge);
            assert_eq!(len, bits as usize / 7);
            assert_eq!(dec(&enc(edge)), edge);
            assert_eq!(dec(&enc(edge + 1)), edge + 1);
            assert_eq!(count_len(edge + 1), len + 1);
        }
        for &n in &[(1 << 63) - 1, 1 << 63, u64::MAX] {
            assert_eq!(dec(&enc(n)), n);
        }
    }

    #[test]
    fn zigzag_extremes() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(zigzag(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag(i64::MIN), u64::MAX);
        for &n in &[0, -1, 1, i64::MIN, i64::MAX, -64, 64] {
            assert_eq!(unzigzag(zigzag(n)), n);
        }
    }
}
