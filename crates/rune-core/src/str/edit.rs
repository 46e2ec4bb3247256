//! Rewriting operations: replace-all, substring, split, trim.

use super::search::Kmp;
use super::{RStr, StrArg};
use crate::err_set;
use crate::error::ErrCode;
use crate::hash;

/// Matches gathered per scan chunk before the result buffer is grown.
const REPLACE_CHUNK: usize = 128;

/// Replaces every occurrence of `target` in `s` with `new_val`, producing a
/// fresh managed string.
///
/// An empty `target` is refused with [`ErrCode::EmptyInput`]. A result that
/// would exceed `max_len` is refused with [`ErrCode::LengthExceeded`]. The
/// cached hash is recomputed over the final payload.
pub fn replace(
    s: StrArg<'_>,
    target: StrArg<'_>,
    new_val: StrArg<'_>,
    max_len: usize,
) -> Option<RStr> {
    let hay = s.bytes_bounded(max_len)?;
    let t = target.bytes();
    let r = new_val.bytes();
    if t.is_empty() {
        err_set!(ErrCode::EmptyInput);
        return None;
    }

    let grow = r.len().saturating_sub(t.len());
    let mut out = RStr::with_len(hay.len(), 0)?;
    let mut read = 0;
    let mut write = 0;
    let mut scan = 0;
    let kmp = Kmp::new(t)?;

    loop {
        // Gather up to a chunk of non-overlapping matches, then grow the
        // result once for the whole chunk.
        let mut chunk = [0usize; REPLACE_CHUNK];
        let mut n = 0;
        while n < REPLACE_CHUNK {
            let Some(p) = kmp.find_from(hay, scan) else {
                break;
            };
            chunk[n] = p;
            n += 1;
            scan = p + t.len();
        }
        if n == 0 {
            break;
        }
        if grow > 0 {
            let new_cap = out.capacity() + n * grow;
            if new_cap > max_len {
                err_set!(ErrCode::LengthExceeded);
                return None;
            }
            if !out.resize(new_cap, 0, false) {
                return None;
            }
        }
        let dst = out.spare_payload_mut();
        for &p in &chunk[..n] {
            let pre = &hay[read..p];
            dst[write..write + pre.len()].copy_from_slice(pre);
            write += pre.len();
            dst[write..write + r.len()].copy_from_slice(r);
            write += r.len();
            read = p + t.len();
        }
        if n < REPLACE_CHUNK {
            break;
        }
    }

    // Tail after the last match.
    let tail = &hay[read..];
    let dst = out.spare_payload_mut();
    dst[write..write + tail.len()].copy_from_slice(tail);
    write += tail.len();

    let h = hash::fold(hash::start(), &out.spare_payload()[..write]);
    if !out.resize(write, h, false) {
        return None;
    }
    Some(out)
}

/// Copies the substring of `s` starting at `start` (clamped to the payload)
/// spanning `count` bytes; `None` as count runs to the end.
///
/// The hash is folded during the copy.
pub fn sub(s: StrArg<'_>, start: usize, count: Option<usize>) -> Option<RStr> {
    let b = s.bytes();
    let start = start.min(b.len());
    let end = match count {
        Some(n) => start.saturating_add(n).min(b.len()),
        None => b.len(),
    };
    RStr::copy_bytes(&b[start..end])
}

/// Splits `s` on `delim` into at most `max_tokens` managed strings, empty
/// tokens preserved. Text past the `max_tokens`th token is discarded.
///
/// An empty delimiter is refused with [`ErrCode::EmptyInput`]; a token
/// longer than `max_len` with [`ErrCode::StringTooLong`].
pub fn split(
    s: StrArg<'_>,
    delim: StrArg<'_>,
    max_tokens: usize,
    max_len: usize,
) -> Option<Vec<RStr>> {
    let b = s.bytes();
    let d = delim.bytes();
    if d.is_empty() {
        err_set!(ErrCode::EmptyInput);
        return None;
    }
    let kmp = Kmp::new(d)?;

    let mut tokens = Vec::new();
    let mut from = 0;
    while tokens.len() < max_tokens {
        let (token, next) = match kmp.find_from(b, from) {
            Some(p) => (&b[from..p], Some(p + d.len())),
            None => (&b[from..], None),
        };
        if token.len() > max_len {
            err_set!(ErrCode::StringTooLong);
            return None;
        }
        tokens.push(RStr::copy_bytes(token)?);
        match next {
            Some(n) => from = n,
            None => break,
        }
    }
    Some(tokens)
}

impl RStr {
    fn trim_extent(&self, left: bool, right: bool) -> (usize, usize) {
        let p = self.payload();
        let start = if left {
            p.iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(p.len())
        } else {
            0
        };
        let end = if right {
            p.iter()
                .rposition(|b| !b.is_ascii_whitespace())
                .map_or(start, |i| i + 1)
        } else {
            p.len()
        };
        (start, end.max(start))
    }

    fn trim_impl(&mut self, left: bool, right: bool, force_realloc: bool) -> bool {
        let (start, end) = self.trim_extent(left, right);
        let n = end - start;
        let h = hash::fold(hash::start(), &self.payload()[start..end]);
        // Destructive in-place move of the surviving bytes.
        self.spare_payload_mut().copy_within(start..end, 0);
        self.resize(n, h, force_realloc)
    }

    /// Strips ASCII whitespace from both ends in place.
    ///
    /// `force_realloc` forces the capacity down to the new length; without
    /// it the block is only reallocated under the usual [`RStr::resize`]
    /// rules.
    pub fn trim(&mut self, force_realloc: bool) -> bool {
        self.trim_impl(true, true, force_realloc)
    }

    /// Strips leading ASCII whitespace in place.
    pub fn trim_start(&mut self, force_realloc: bool) -> bool {
        self.trim_impl(true, false, force_realloc)
    }

    /// Strips trailing ASCII whitespace in place.
    pub fn trim_end(&mut self, force_realloc: bool) -> bool {
        self.trim_impl(false, true, force_realloc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;

    fn managed(s: &str) -> RStr {
        RStr::of(s, 4096).unwrap()
    }

    #[test]
    fn test_replace_grows() {
        let out = replace("aaaa".into(), "a".into(), "bb".into(), 1024).unwrap();
        assert_eq!(out.payload(), b"bbbbbbbb");
        assert_eq!(out.len(), 8);
        assert_eq!(out.content_hash(), hash::fold(hash::start(), b"bbbbbbbb"));
    }

    #[test]
    fn test_replace_shrinks() {
        let out = replace("foo--bar--baz".into(), "--".into(), ".".into(), 1024).unwrap();
        assert_eq!(out.payload(), b"foo.bar.baz");
    }

    #[test]
    fn test_replace_equal_width_and_no_match() {
        let out = replace("abcabc".into(), "b".into(), "x".into(), 1024).unwrap();
        assert_eq!(out.payload(), b"axcaxc");
        let out = replace("abcabc".into(), "zz".into(), "x".into(), 1024).unwrap();
        assert_eq!(out.payload(), b"abcabc");
    }

    #[test]
    fn test_replace_length_law() {
        // |out| = |s| + count * (|r| - |t|) when |r| >= |t|.
        let s = "ab".repeat(300);
        let out = replace(s.as_str().into(), "ab".into(), "xyz".into(), 4096).unwrap();
        assert_eq!(out.len(), s.len() + 300 * (3 - 2));
        assert_eq!(out.payload(), "xyz".repeat(300).as_bytes());
    }

    #[test]
    fn test_replace_spans_multiple_chunks() {
        // More than REPLACE_CHUNK matches forces several grow passes.
        let s = "a".repeat(REPLACE_CHUNK * 2 + 17);
        let out = replace(s.as_str().into(), "a".into(), "bb".into(), 8192).unwrap();
        assert_eq!(out.len(), s.len() * 2);
        assert!(out.payload().iter().all(|&b| b == b'b'));
        assert_eq!(out.content_hash(), hash::fold(hash::start(), out.payload()));
    }

    #[test]
    fn test_replace_empty_target_refused() {
        crate::error::clear();
        assert!(replace("abc".into(), "".into(), "x".into(), 1024).is_none());
        assert_eq!(crate::error::code(), crate::ErrCode::EmptyInput);
        crate::error::clear();
    }

    #[test]
    fn test_replace_result_over_max_len_refused() {
        crate::error::clear();
        assert!(replace("aaaa".into(), "a".into(), "bb".into(), 6).is_none());
        assert_eq!(crate::error::code(), crate::ErrCode::LengthExceeded);
        crate::error::clear();
    }

    #[test]
    fn test_sub_clamps() {
        let s = managed("hello world");
        assert_eq!(sub((&s).into(), 6, None).unwrap().payload(), b"world");
        assert_eq!(sub((&s).into(), 0, Some(5)).unwrap().payload(), b"hello");
        assert_eq!(sub((&s).into(), 6, Some(100)).unwrap().payload(), b"world");
        assert_eq!(sub((&s).into(), 100, None).unwrap().payload(), b"");
        let piece = sub((&s).into(), 6, Some(3)).unwrap();
        assert_eq!(piece.content_hash(), hash::fold(hash::start(), b"wor"));
    }

    #[test]
    fn test_split_preserves_empty_tokens() {
        let tokens = split("a,,b,c".into(), ",".into(), 4, 64).unwrap();
        let texts: Vec<&[u8]> = tokens.iter().map(|t| t.payload()).collect();
        assert_eq!(texts, [&b"a"[..], b"", b"b", b"c"]);
    }

    #[test]
    fn test_split_token_cap_discards_rest() {
        let tokens = split("a,b,c,d".into(), ",".into(), 2, 64).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].payload(), b"a");
        assert_eq!(tokens[1].payload(), b"b");
    }

    #[test]
    fn test_split_edges() {
        let tokens = split(",x,".into(), ",".into(), 8, 64).unwrap();
        let texts: Vec<&[u8]> = tokens.iter().map(|t| t.payload()).collect();
        assert_eq!(texts, [&b""[..], b"x", b""]);

        let tokens = split("no-delim".into(), ",".into(), 8, 64).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].payload(), b"no-delim");

        crate::error::clear();
        assert!(split("abc".into(), "".into(), 8, 64).is_none());
        assert_eq!(crate::error::code(), crate::ErrCode::EmptyInput);
        crate::error::clear();
    }

    #[test]
    fn test_trim_both_ends() {
        let mut s = managed("  \t hello \n ");
        assert!(s.trim(false));
        assert_eq!(s.payload(), b"hello");
        assert_eq!(s.content_hash(), hash::fold(hash::start(), b"hello"));
    }

    #[test]
    fn test_trim_sides() {
        let mut s = managed("  pad  ");
        assert!(s.trim_start(false));
        assert_eq!(s.payload(), b"pad  ");
        let mut s = managed("  pad  ");
        assert!(s.trim_end(false));
        assert_eq!(s.payload(), b"  pad");
    }

    #[test]
    fn test_trim_all_whitespace_and_noop() {
        let mut s = managed(" \t\n ");
        assert!(s.trim(false));
        assert_eq!(s.payload(), b"");
        assert_eq!(s.content_hash(), hash::start());

        let mut s = managed("solid");
        assert!(s.trim(false));
        assert_eq!(s.payload(), b"solid");
    }

    #[test]
    fn test_trim_force_realloc_tightens_capacity() {
        let mut s = managed("hi                  ");
        assert!(s.trim(true));
        assert_eq!(s.payload(), b"hi");
        assert_eq!(s.capacity(), 2);
    }
}
