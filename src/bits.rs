//! Bit addressing helpers.
//!
//! Bits are addressed by absolute position: bit `p` of a buffer is bit
//! `p % 8` (value `1 << (p % 8)`) of byte `p / 8`. A `(byte, bit)` pair from a
//! handle is the position `byte * 8 + bit`.

/// Absolute bit position of `(byte, bit)`.
#[must_use]
pub const fn position(byte: usize, bit: u8) -> usize {
    byte * 8 + bit as usize
}

/// Number of bytes needed to hold `count` packed bits.
#[must_use]
pub const fn bitmap_len(count: usize) -> usize {
    count.div_ceil(8)
}

/// Number of bytes spanned by `count` bits starting at bit `bit` of a byte.
#[must_use]
pub const fn span_len(bit: u8, count: usize) -> usize {
    (bit as usize + count).div_ceil(8)
}

/// Read the bit at `pos`. Positions past the end read as zero.
#[must_use]
pub fn get(buf: &[u8], pos: usize) -> bool {
    buf.get(pos / 8).is_some_and(|b| b & (1 << (pos % 8)) != 0)
}

/// Write the bit at `pos`. Positions past the end are ignored.
pub fn set(buf: &mut [u8], pos: usize, value: bool) {
    if let Some(b) = buf.get_mut(pos / 8) {
        let mask = 1u8 << (pos % 8);
        if value {
            *b |= mask;
        } else {
            *b &= !mask;
        }
    }
}

/// Copy `count` bits from `src` starting at `src_pos` into `dst` starting at
/// `dst_pos`. Destination bits outside the copied run are left untouched.
pub fn copy(src: &[u8], src_pos: usize, dst: &mut [u8], dst_pos: usize, count: usize) {
    for n in 0..count {
        set(dst, dst_pos + n, get(src, src_pos + n));
    }
}

/// Set `count` consecutive bits starting at `pos`.
pub fn fill(buf: &mut [u8], pos: usize, count: usize) {
    for n in 0..count {
        set(buf, pos + n, true);
    }
}
