//! Managed byte strings.
//!
//! A managed string ([`RStr`]) owns a header+payload block with length,
//! capacity, and a cached FNV-1a content hash validated by a sentinel triple
//! (see [`header`]). Every public operation also accepts plain
//! zero-terminated byte buffers; the two cases meet in [`StrArg`]
//! ([`header::as_managed`] remains the block-level probe for interop and
//! release paths).
//!
//! `max_len` parameters are hard ceilings on both input and output byte
//! counts. Concatenation and join truncate at the last operand that fits;
//! every other overrun is refused with [`ErrCode::StringTooLong`] or
//! [`ErrCode::LengthExceeded`].

pub mod header;

mod edit;
mod rstr;
mod search;

pub use edit::{replace, split, sub};
pub use header::{Header, HEADER_SIZE, as_managed};
pub use rstr::RStr;
pub use search::{STR_STACK_MAX_LEN, find, rfind};

use core::cmp::Ordering;

use crate::err_set;
use crate::error::ErrCode;
use crate::hash as fnv;

/// Ceiling on concatenation/join operand counts; extra operands are ignored.
pub const STR_MAX_VARG: usize = 16;

/// Default ceiling callers pass as `max_len`: 128 KiB.
pub const STR_MAX_SIZE: usize = 128 * 1024;

/// One text operand: a managed string or a foreign zero-terminated buffer.
///
/// A foreign buffer's effective text runs to its first zero byte or the end
/// of the slice, whichever comes first.
#[derive(Clone, Copy)]
pub enum StrArg<'a> {
    Managed(&'a RStr),
    Foreign(&'a [u8]),
}

impl<'a> From<&'a RStr> for StrArg<'a> {
    fn from(s: &'a RStr) -> StrArg<'a> {
        StrArg::Managed(s)
    }
}

impl<'a> From<&'a [u8]> for StrArg<'a> {
    fn from(b: &'a [u8]) -> StrArg<'a> {
        StrArg::Foreign(b)
    }
}

impl<'a> From<&'a str> for StrArg<'a> {
    fn from(s: &'a str) -> StrArg<'a> {
        StrArg::Foreign(s.as_bytes())
    }
}

impl<'a> StrArg<'a> {
    /// The effective text bytes.
    pub fn bytes(&self) -> &'a [u8] {
        match *self {
            StrArg::Managed(s) => s.payload(),
            StrArg::Foreign(b) => {
                let n = b.iter().position(|&c| c == 0).unwrap_or(b.len());
                &b[..n]
            }
        }
    }

    /// [`bytes`](StrArg::bytes) under a hard bound: an extent beyond
    /// `max_len` is refused with [`ErrCode::StringTooLong`].
    pub fn bytes_bounded(&self, max_len: usize) -> Option<&'a [u8]> {
        let b = self.bytes();
        if b.len() > max_len {
            err_set!(ErrCode::StringTooLong);
            return None;
        }
        Some(b)
    }

    /// Cached `(len, hash)` when the operand is managed.
    fn cached(&self) -> Option<(usize, u64)> {
        match *self {
            StrArg::Managed(s) => Some((s.len(), s.content_hash())),
            StrArg::Foreign(_) => None,
        }
    }
}

/// Text length in bytes: O(1) for managed operands, a bounded scan for
/// foreign ones.
pub fn len(s: StrArg<'_>, max_len: usize) -> Option<usize> {
    s.bytes_bounded(max_len).map(|b| b.len())
}

/// Total footprint the text would have as a managed block:
/// `len + 1 + HEADER_SIZE`.
pub fn size(s: StrArg<'_>, max_len: usize) -> Option<usize> {
    len(s, max_len).map(|n| n + 1 + HEADER_SIZE)
}

/// Content hash: cached for managed operands, computed for foreign ones.
pub fn hash(s: StrArg<'_>, max_len: usize) -> Option<u64> {
    match s {
        StrArg::Managed(m) => {
            if m.len() > max_len {
                err_set!(ErrCode::StringTooLong);
                return None;
            }
            Some(m.content_hash())
        }
        StrArg::Foreign(_) => s.bytes_bounded(max_len).map(|b| fnv::fold(fnv::start(), b)),
    }
}

fn concat(delim: &[u8], parts: &[StrArg<'_>], max_len: usize) -> Option<RStr> {
    let capped = &parts[..parts.len().min(STR_MAX_VARG)];

    // Pass 1: sum lengths, truncating at the last operand that still fits.
    let mut total = 0usize;
    let mut fit = 0usize;
    for (i, p) in capped.iter().enumerate() {
        let b = p.bytes();
        let add = if i == 0 { b.len() } else { delim.len() + b.len() };
        if total + add > max_len {
            break;
        }
        total += add;
        fit = i + 1;
    }

    // Pass 2: copy operand bytes in order, streaming the content hash.
    let mut out = RStr::with_len(total, fnv::start())?;
    let mut state = fnv::start();
    let mut w = 0;
    {
        let dst = out.spare_payload_mut();
        for (i, p) in capped[..fit].iter().enumerate() {
            if i > 0 {
                dst[w..w + delim.len()].copy_from_slice(delim);
                w += delim.len();
                state = fnv::fold(state, delim);
            }
            let b = p.bytes();
            dst[w..w + b.len()].copy_from_slice(b);
            w += b.len();
            state = fnv::fold(state, b);
        }
    }
    debug_assert_eq!(w, total);
    out.set_len_hash(total, state);
    Some(out)
}

/// Concatenates `parts` (at most [`STR_MAX_VARG`] of them) into a fresh
/// managed string.
///
/// The operand list is truncated at the last operand that keeps the result
/// within `max_len`; callers detect truncation by comparing the result
/// length with the sum of the inputs.
pub fn cat(max_len: usize, parts: &[StrArg<'_>]) -> Option<RStr> {
    concat(b"", parts, max_len)
}

/// Like [`cat`], with `delim` interleaved between operands (once per gap,
/// hash included).
pub fn join(delim: StrArg<'_>, parts: &[StrArg<'_>], max_len: usize) -> Option<RStr> {
    concat(delim.bytes(), parts, max_len)
}

/// Three-way comparison with absent-text ordering: `None` sorts before any
/// text, two `None`s are equal. Present operands compare bytewise over at
/// most `len` bytes.
pub fn cmp(a: Option<StrArg<'_>>, b: Option<StrArg<'_>>, len: usize) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let ab = a.bytes();
            let bb = b.bytes();
            ab[..ab.len().min(len)].cmp(&bb[..bb.len().min(len)])
        }
    }
}

/// Equality over at most `len` bytes, with a cached-hash early reject when
/// both operands are managed and fully inside the window.
pub fn eq(a: StrArg<'_>, b: StrArg<'_>, len: usize) -> bool {
    let ab = a.bytes();
    let bb = b.bytes();
    let ea = &ab[..ab.len().min(len)];
    let eb = &bb[..bb.len().min(len)];
    if ea.len() != eb.len() {
        return false;
    }
    if let (Some((la, ha)), Some((lb, hb))) = (a.cached(), b.cached()) {
        if la <= len && lb <= len && ha != hb {
            return false;
        }
    }
    ea == eb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash as fnv;

    #[test]
    fn test_len_size_hash_dual_mode() {
        let m = RStr::of("hello", 64).unwrap();
        assert_eq!(len((&m).into(), 64), Some(5));
        assert_eq!(len("hello\0junk".into(), 64), Some(5));
        assert_eq!(size((&m).into(), 64), Some(5 + 1 + HEADER_SIZE));
        assert_eq!(hash((&m).into(), 64), Some(m.content_hash()));
        assert_eq!(hash("hello".into(), 64), Some(m.content_hash()));
    }

    #[test]
    fn test_len_hard_bound() {
        crate::error::clear();
        assert_eq!(len("abcdef".into(), 3), None);
        assert_eq!(crate::error::code(), ErrCode::StringTooLong);
        crate::error::clear();
        let m = RStr::of("abcdef", 64).unwrap();
        assert_eq!(hash((&m).into(), 3), None);
        crate::error::clear();
    }

    #[test]
    fn test_cat_basic() {
        let out = cat(1024, &["foo".into(), "bar".into()]).unwrap();
        assert_eq!(out.payload(), b"foobar");
        assert_eq!(out.len(), 6);
        assert_eq!(out.content_hash(), fnv::fold(fnv::start(), b"foobar"));
    }

    #[test]
    fn test_cat_truncates_at_last_fitting_operand() {
        let out = cat(5, &["foo".into(), "bar".into()]).unwrap();
        assert_eq!(out.payload(), b"foo");
        // Truncation is detectable from the shorter result.
        assert!(out.len() < 6);
    }

    #[test]
    fn test_cat_mixed_operands_and_empty_list() {
        let m = RStr::of("mid", 64).unwrap();
        let out = cat(1024, &["pre-".into(), (&m).into(), "-post".into()]).unwrap();
        assert_eq!(out.payload(), b"pre-mid-post");

        let out = cat(1024, &[]).unwrap();
        assert_eq!(out.payload(), b"");
        assert_eq!(out.content_hash(), fnv::start());
    }

    #[test]
    fn test_cat_caps_operand_count() {
        let parts: Vec<StrArg<'_>> = (0..STR_MAX_VARG + 4).map(|_| "a".into()).collect();
        let out = cat(1024, &parts).unwrap();
        assert_eq!(out.len(), STR_MAX_VARG);
    }

    #[test]
    fn test_join_interleaves_delim() {
        let out = join(", ".into(), &["a".into(), "b".into(), "c".into()], 64).unwrap();
        assert_eq!(out.payload(), b"a, b, c");
        assert_eq!(out.content_hash(), fnv::fold(fnv::start(), b"a, b, c"));
    }

    #[test]
    fn test_join_truncation_counts_delim() {
        // "ab" + ",cd" fits in 5, the next ",ef" would not.
        let out = join(
            ",".into(),
            &["ab".into(), "cd".into(), "ef".into()],
            5,
        )
        .unwrap();
        assert_eq!(out.payload(), b"ab,cd");
    }

    #[test]
    fn test_cmp_absent_ordering() {
        assert_eq!(cmp(None, None, 16), Ordering::Equal);
        assert_eq!(cmp(None, Some("a".into()), 16), Ordering::Less);
        assert_eq!(cmp(Some("a".into()), None, 16), Ordering::Greater);
        assert_eq!(cmp(Some("abc".into()), Some("abd".into()), 16), Ordering::Less);
        assert_eq!(cmp(Some("abc".into()), Some("abc".into()), 16), Ordering::Equal);
        // Prefix sorts first.
        assert_eq!(cmp(Some("ab".into()), Some("abc".into()), 16), Ordering::Less);
        // Window cuts the difference.
        assert_eq!(cmp(Some("abX".into()), Some("abY".into()), 2), Ordering::Equal);
    }

    #[test]
    fn test_eq_hash_fast_path_and_window() {
        let a = RStr::of("same", 64).unwrap();
        let b = RStr::of("same", 64).unwrap();
        let c = RStr::of("diff", 64).unwrap();
        assert!(eq((&a).into(), (&b).into(), 64));
        assert!(!eq((&a).into(), (&c).into(), 64));
        assert!(eq((&a).into(), "same".into(), 64));
        assert!(!eq("ab".into(), "abc".into(), 64));
        assert!(eq("abX".into(), "abY".into(), 2));
    }

    #[test]
    fn test_eq_implies_equal_hash() {
        let a = RStr::of("payload", 64).unwrap();
        let b = RStr::of("payload", 64).unwrap();
        assert!(eq((&a).into(), (&b).into(), 64));
        assert_eq!(hash((&a).into(), 64), hash((&b).into(), 64));
    }
}
