//! The managed-string block layout.
//!
//! A managed string is one allocation holding, in order: a sentinel triple
//! interleaved with the metadata fields, then the payload, then a zero
//! terminator:
//!
//! ```text
//! offset  width  field
//! 0       1      SOH (0x01)
//! 1       8      length        (u64, little-endian, excludes terminator)
//! 9       8      capacity      (u64, payload bytes reserved)
//! 17      8      cached hash   (FNV-1a over the payload)
//! 25      1      STX (0x02)
//! 26      8      payload addr  (self-referential, u64)
//! 34      1      ETX (0x03)
//! 35      len+1  payload + NUL
//! ```
//!
//! The sentinel triple is what lets a bare block be classified at runtime:
//! [`as_managed`] accepts a block iff all three sentinels sit at their fixed
//! offsets. Anything else is a foreign zero-terminated buffer.

/// Leading sentinel.
pub const SOH: u8 = 0x01;
/// Separator sentinel between the metadata fields and the payload pointer.
pub const STX: u8 = 0x02;
/// Trailing sentinel, immediately before the payload.
pub const ETX: u8 = 0x03;

pub const OFF_SOH: usize = 0;
pub const OFF_LEN: usize = 1;
pub const OFF_CAP: usize = 9;
pub const OFF_HASH: usize = 17;
pub const OFF_STX: usize = 25;
pub const OFF_PAYLOAD: usize = 26;
pub const OFF_ETX: usize = 34;

/// Total header size preceding the payload.
pub const HEADER_SIZE: usize = 35;

/// Decoded header fields of a managed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub len: usize,
    pub cap: usize,
    pub hash: u64,
}

fn read_u64(block: &[u8], off: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&block[off..off + 8]);
    u64::from_le_bytes(raw)
}

fn write_u64(block: &mut [u8], off: usize, value: u64) {
    block[off..off + 8].copy_from_slice(&value.to_le_bytes());
}

/// Classifies a block: `Some(header)` iff the sentinel triple matches.
///
/// Only the sentinels are inspected; a block that merely happens to start
/// with `0x01` is rejected by the other two probes.
pub fn as_managed(block: &[u8]) -> Option<Header> {
    if block.len() < HEADER_SIZE
        || block[OFF_SOH] != SOH
        || block[OFF_STX] != STX
        || block[OFF_ETX] != ETX
    {
        return None;
    }
    Some(Header {
        len: read_u64(block, OFF_LEN) as usize,
        cap: read_u64(block, OFF_CAP) as usize,
        hash: read_u64(block, OFF_HASH),
    })
}

/// Writes a complete header over the first [`HEADER_SIZE`] bytes of `block`.
pub(crate) fn write(block: &mut [u8], len: usize, cap: usize, hash: u64, payload_addr: usize) {
    block[OFF_SOH] = SOH;
    write_u64(block, OFF_LEN, len as u64);
    write_u64(block, OFF_CAP, cap as u64);
    write_u64(block, OFF_HASH, hash);
    block[OFF_STX] = STX;
    write_u64(block, OFF_PAYLOAD, payload_addr as u64);
    block[OFF_ETX] = ETX;
}

pub(crate) fn set_len(block: &mut [u8], len: usize) {
    write_u64(block, OFF_LEN, len as u64);
}

pub(crate) fn set_hash(block: &mut [u8], hash: u64) {
    write_u64(block, OFF_HASH, hash);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Vec<u8> {
        let mut block = vec![0u8; HEADER_SIZE + 6];
        write(&mut block, 5, 5, 0xDEAD_BEEF, 0x1000);
        block[HEADER_SIZE..HEADER_SIZE + 5].copy_from_slice(b"hello");
        block
    }

    #[test]
    fn test_roundtrip() {
        let block = sample_block();
        let h = as_managed(&block).unwrap();
        assert_eq!(h.len, 5);
        assert_eq!(h.cap, 5);
        assert_eq!(h.hash, 0xDEAD_BEEF);
    }

    #[test]
    fn test_each_sentinel_guards() {
        for off in [OFF_SOH, OFF_STX, OFF_ETX] {
            let mut block = sample_block();
            block[off] ^= 0xFF;
            assert!(as_managed(&block).is_none(), "offset {off} not guarded");
        }
    }

    #[test]
    fn test_short_block_is_foreign() {
        assert!(as_managed(b"hello\0").is_none());
        assert!(as_managed(&[]).is_none());
        assert!(as_managed(&[SOH]).is_none());
    }

    #[test]
    fn test_set_len_and_hash() {
        let mut block = sample_block();
        set_len(&mut block, 3);
        set_hash(&mut block, 7);
        let h = as_managed(&block).unwrap();
        assert_eq!(h.len, 3);
        assert_eq!(h.hash, 7);
    }
}
