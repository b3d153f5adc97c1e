//! Modular sequence-number arithmetic.
//!
//! Sequence numbers live in `[0, limit)` where `limit = 2 × WindowSize`, and
//! wrap around.  Every comparison in the protocol goes through the helpers
//! here so that wrap-around is handled in exactly one place.
//!
//! Unlike a u32 space where "close enough" comparisons work via wrapping
//! subtraction, a small modular space has no notion of signed distance: the
//! helpers take `limit` explicitly and reason in forward (clockwise)
//! direction only.

/// The sequence number following `seq`, wrapping at `limit`.
#[inline]
pub fn next(seq: u16, limit: u16) -> u16 {
    (seq + 1) % limit
}

/// The sequence number preceding `seq`, wrapping at `limit`.
#[inline]
pub fn prev(seq: u16, limit: u16) -> u16 {
    (seq + limit - 1) % limit
}

/// Forward (clockwise) distance from `from` to `to` in the modular space.
///
/// `fwd_distance(x, x, _) == 0`; the result is always in `[0, limit)`.
#[inline]
pub fn fwd_distance(from: u16, to: u16, limit: u16) -> u16 {
    if to >= from {
        to - from
    } else {
        to + limit - from
    }
}

/// `true` when `seq` falls inside the wrap-aware window `[lo, hi]`.
///
/// When the window does not wrap (`hi >= lo`) this is a plain range check;
/// when it wraps past the limit, membership means being on either side of
/// the wrap point.
#[inline]
pub fn in_window(lo: u16, hi: u16, seq: u16) -> bool {
    if hi >= lo {
        lo <= seq && seq <= hi
    } else {
        seq >= lo || seq <= hi
    }
}
