//! The owned managed string.

use core::fmt;

use super::header::{self, HEADER_SIZE};
use crate::err_set;
use crate::error::ErrCode;
use crate::hash;
use crate::mem::RawBuf;

/// A managed string: one block from the current allocator holding the
/// sentinel-validated header, the payload, and a zero terminator.
///
/// Invariants, maintained by every public mutation:
/// - the block is `HEADER_SIZE + capacity + 1` bytes,
/// - `len <= capacity`, and `payload[len] == 0`,
/// - the cached hash equals FNV-1a over `payload[0..len]`.
///
/// Release is `Drop`, through the allocator handle current at that point.
pub struct RStr {
    buf: RawBuf,
}

impl RStr {
    /// Builds a managed string from `bytes`, measuring to the first zero
    /// byte (or the slice end) and folding the content hash along the way.
    ///
    /// Refuses lengths above `max_len` with [`ErrCode::StringTooLong`].
    pub fn of(bytes: impl AsRef<[u8]>, max_len: usize) -> Option<RStr> {
        let bytes = bytes.as_ref();
        let n = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if n > max_len {
            err_set!(ErrCode::StringTooLong);
            return None;
        }
        RStr::copy_bytes(&bytes[..n])
    }

    /// Allocates a managed string of `len` zeroed payload bytes with a
    /// caller-provided hash.
    ///
    /// The caller is responsible for the hash matching whatever it writes
    /// into the payload before handing the string out.
    pub fn with_len(len: usize, hash: u64) -> Option<RStr> {
        let buf = RawBuf::alloc(HEADER_SIZE + len + 1)?;
        let mut s = RStr { buf };
        let addr = s.buf.addr() + HEADER_SIZE;
        header::write(s.buf.as_mut_slice(), len, len, hash, addr);
        Some(s)
    }

    /// Fresh managed string with an exact copy of `bytes` (no NUL scan).
    pub(crate) fn copy_bytes(bytes: &[u8]) -> Option<RStr> {
        let mut s = RStr::with_len(bytes.len(), hash::fold(hash::start(), bytes))?;
        s.buf.as_mut_slice()[HEADER_SIZE..HEADER_SIZE + bytes.len()].copy_from_slice(bytes);
        Some(s)
    }

    /// Payload length in bytes, excluding the terminator. O(1).
    pub fn len(&self) -> usize {
        header::as_managed(self.buf.as_slice())
            .map(|h| h.len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes reserved, excluding the terminator.
    pub fn capacity(&self) -> usize {
        header::as_managed(self.buf.as_slice())
            .map(|h| h.cap)
            .unwrap_or(0)
    }

    /// The cached FNV-1a hash of the payload.
    pub fn content_hash(&self) -> u64 {
        header::as_managed(self.buf.as_slice())
            .map(|h| h.hash)
            .unwrap_or(0)
    }

    /// The payload bytes (`len` of them).
    pub fn payload(&self) -> &[u8] {
        let len = self.len();
        &self.buf.as_slice()[HEADER_SIZE..HEADER_SIZE + len]
    }

    /// The whole underlying block, header and terminator included.
    pub fn block(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Mutable view of the whole block. Corrupting the header (sentinels
    /// included) demotes the block to foreign; use [`RStr::into_raw_buf`]
    /// afterwards to release it on the foreign path.
    pub fn block_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut_slice()
    }

    /// Full-capacity payload window, for operations that write before
    /// publishing a length.
    pub(crate) fn spare_payload(&self) -> &[u8] {
        let cap = self.capacity();
        &self.buf.as_slice()[HEADER_SIZE..HEADER_SIZE + cap]
    }

    pub(crate) fn spare_payload_mut(&mut self) -> &mut [u8] {
        let cap = self.capacity();
        &mut self.buf.as_mut_slice()[HEADER_SIZE..HEADER_SIZE + cap]
    }

    /// Publishes a new length and hash without touching capacity.
    pub(crate) fn set_len_hash(&mut self, len: usize, hash: u64) {
        debug_assert!(len <= self.capacity());
        let block = self.buf.as_mut_slice();
        header::set_len(block, len);
        header::set_hash(block, hash);
        block[HEADER_SIZE + len] = 0;
    }

    /// Resizes to `new_len`, updating length, hash, and terminator.
    ///
    /// The block is reallocated (to a capacity of exactly `new_len`) when
    /// `force` is set, when `new_len` exceeds the capacity, or when it drops
    /// below half of it. `force = false` does not suppress the half-capacity
    /// shrink. Returns `false` (string unchanged) when the reallocation
    /// fails.
    pub fn resize(&mut self, new_len: usize, new_hash: u64, force: bool) -> bool {
        let cap = self.capacity();
        if force || new_len > cap || new_len < cap / 2 {
            if !self.buf.resize(HEADER_SIZE + new_len + 1) {
                return false;
            }
            let addr = self.buf.addr() + HEADER_SIZE;
            header::write(self.buf.as_mut_slice(), new_len, new_len, new_hash, addr);
            let block = self.buf.as_mut_slice();
            block[HEADER_SIZE + new_len] = 0;
        } else {
            self.set_len_hash(new_len, new_hash);
        }
        true
    }

    /// Surrenders the underlying block.
    pub fn into_raw_buf(self) -> RawBuf {
        self.buf
    }

    /// Reclaims a block as a managed string iff the sentinel triple and the
    /// structural invariants hold; otherwise hands the block back as the
    /// foreign buffer it is.
    pub fn from_raw_buf(buf: RawBuf) -> Result<RStr, RawBuf> {
        match header::as_managed(buf.as_slice()) {
            Some(h) if h.len <= h.cap && buf.size() == HEADER_SIZE + h.cap + 1 => {
                Ok(RStr { buf })
            }
            _ => Err(buf),
        }
    }
}

impl fmt::Debug for RStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RStr")
            .field("len", &self.len())
            .field("cap", &self.capacity())
            .field("hash", &format_args!("{:#018x}", self.content_hash()))
            .field("payload", &String::from_utf8_lossy(self.payload()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;
    use crate::str::header::{OFF_ETX, OFF_SOH, OFF_STX};

    #[test]
    fn test_of_roundtrip() {
        let s = RStr::of("hello", 1024).unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(s.capacity(), 5);
        assert_eq!(s.payload(), b"hello");
        assert_eq!(s.content_hash(), 0xa430_d846_80aa_bd0b);
        assert_eq!(s.block()[HEADER_SIZE + 5], 0);
        assert!(header::as_managed(s.block()).is_some());
    }

    #[test]
    fn test_of_measures_to_nul() {
        let s = RStr::of(&b"abc\0def"[..], 1024).unwrap();
        assert_eq!(s.payload(), b"abc");
    }

    #[test]
    fn test_of_refuses_overlength() {
        crate::error::clear();
        assert!(RStr::of("toolong", 3).is_none());
        assert_eq!(crate::error::code(), ErrCode::StringTooLong);
        crate::error::clear();
        // Boundary: exactly max_len is accepted.
        assert!(RStr::of("abc", 3).is_some());
    }

    #[test]
    fn test_with_len_zeroed() {
        let s = RStr::with_len(8, 99).unwrap();
        assert_eq!(s.len(), 8);
        assert_eq!(s.payload(), &[0u8; 8]);
        assert_eq!(s.content_hash(), 99);
    }

    #[test]
    fn test_resize_grow_and_shrink() {
        let mut s = RStr::of("abcdefgh", 1024).unwrap();
        let h = hash::fold(hash::start(), b"abcd");
        // Shrink below half capacity: reallocates to exact size.
        assert!(s.resize(4, h, false));
        assert_eq!(s.len(), 4);
        assert_eq!(s.capacity(), 4);
        assert_eq!(s.payload(), b"abcd");
        assert_eq!(s.block()[HEADER_SIZE + 4], 0);

        // Grow past capacity: reallocates, tail zeroed.
        let h8 = hash::fold(hash::start(), b"abcd\0\0\0\0");
        assert!(s.resize(8, h8, false));
        assert_eq!(s.capacity(), 8);
        assert_eq!(s.payload(), b"abcd\0\0\0\0");
    }

    #[test]
    fn test_resize_within_capacity_keeps_block() {
        let mut s = RStr::of("abcdefgh", 1024).unwrap();
        let h = hash::fold(hash::start(), b"abcdef");
        // 6 >= 8/2: no reallocation, capacity stays.
        assert!(s.resize(6, h, false));
        assert_eq!(s.len(), 6);
        assert_eq!(s.capacity(), 8);
        assert_eq!(s.payload(), b"abcdef");
        // force always reallocates to exact capacity.
        assert!(s.resize(6, h, true));
        assert_eq!(s.capacity(), 6);
        assert_eq!(s.payload(), b"abcdef");
    }

    #[test]
    fn test_tampered_sentinels_demote_to_foreign() {
        for off in [OFF_SOH, OFF_STX, OFF_ETX] {
            let mut s = RStr::of("guarded", 1024).unwrap();
            s.block_mut()[off] = 0x7F;
            assert!(header::as_managed(s.block()).is_none());
            let buf = s.into_raw_buf();
            // Foreign release path: the block is still freed cleanly.
            assert!(RStr::from_raw_buf(buf).is_err());
        }
    }

    #[test]
    fn test_from_raw_buf_accepts_intact_block() {
        let s = RStr::of("intact", 1024).unwrap();
        let buf = s.into_raw_buf();
        let s = RStr::from_raw_buf(buf).ok().unwrap();
        assert_eq!(s.payload(), b"intact");
    }

    #[test]
    fn test_wire_layout_offsets() {
        use crate::str::header::{OFF_CAP, OFF_HASH, OFF_LEN, OFF_PAYLOAD};
        let s = RStr::of("wire", 1024).unwrap();
        let block = s.block();
        assert_eq!(block[OFF_SOH], 0x01);
        assert_eq!(block[OFF_STX], 0x02);
        assert_eq!(block[OFF_ETX], 0x03);
        let field = |off: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&block[off..off + 8]);
            u64::from_le_bytes(raw)
        };
        assert_eq!(field(OFF_LEN), 4);
        assert_eq!(field(OFF_CAP), 4);
        assert_eq!(field(OFF_HASH), hash::fold(hash::start(), b"wire"));
        // Self-referential payload pointer.
        assert_eq!(
            field(OFF_PAYLOAD),
            block.as_ptr() as u64 + HEADER_SIZE as u64
        );
    }
}
