//! FNV-1a 64-bit hash primitives.
//!
//! Used both as a content hash for managed strings and as an equality
//! accelerator: two strings with different cached hashes cannot be equal.

/// FNV-1a 64-bit offset basis.
pub const FNV_OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;

/// FNV-1a 64-bit prime.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Returns the initial hash state (the offset basis).
#[inline]
pub const fn start() -> u64 {
    FNV_OFFSET_BASIS
}

/// Feeds one byte into the state: `(state XOR byte) * prime`.
#[inline]
pub const fn next(state: u64, byte: u8) -> u64 {
    (state ^ byte as u64).wrapping_mul(FNV_PRIME)
}

/// Combines two hash states: `(a XOR b) * prime`.
///
/// A symmetric combiner, not a concatenation of the two hashed inputs;
/// `mix(hash(a), hash(b))` differs from `hash(a ++ b)`.
#[inline]
pub const fn mix(a: u64, b: u64) -> u64 {
    (a ^ b).wrapping_mul(FNV_PRIME)
}

/// Folds every byte of `bytes` into `state`.
#[inline]
pub fn fold(state: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(state, |acc, &b| next(acc, b))
}

/// Hashes `data` up to the first zero byte or `max_len` bytes, whichever
/// comes first.
pub fn hash(data: &[u8], max_len: usize) -> u64 {
    let mut state = start();
    for &b in data.iter().take(max_len) {
        if b == 0 {
            break;
        }
        state = next(state, b);
    }
    state
}
