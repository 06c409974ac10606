//! Bit-field helpers for packed 16-bit entry words
//!
//! Entry layouts are described by contiguous masks; the shift of every
//! field is the position of the lowest set bit of its mask.

/// Place `value` into the field selected by `mask`
///
/// Bits of `value` that do not fit the field are dropped.
#[inline(always)]
pub const fn prep(mask: u16, value: u16) -> u16 {
    (value << mask.trailing_zeros()) & mask
}

/// Extract the field selected by `mask` from `word`
#[inline(always)]
pub const fn get(mask: u16, word: u16) -> u16 {
    (word & mask) >> mask.trailing_zeros()
}

/// Single-bit field as `bool`
#[inline(always)]
pub const fn flag(mask: u16, word: u16) -> bool {
    word & mask != 0
}

/// `mask` when `set`, else 0
#[inline(always)]
pub const fn prep_flag(mask: u16, set: bool) -> u16 {
    if set { mask } else { 0 }
}

/// Largest value the field selected by `mask` can hold
#[inline(always)]
pub const fn max(mask: u16) -> u16 {
    mask >> mask.trailing_zeros()
}
