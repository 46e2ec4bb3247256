//! KMP substring search over managed or foreign text.

use super::StrArg;
use crate::mem::TypedBuf;

/// Needles at or below this length use a stack-allocated prefix table;
/// longer needles take the table from the current allocator.
pub const STR_STACK_MAX_LEN: usize = 64;

/// Longest-proper-prefix-that-is-also-suffix table for `needle`.
///
/// `lps` must be exactly `needle.len()` entries.
fn build_lps(needle: &[u8], lps: &mut [usize]) {
    debug_assert_eq!(lps.len(), needle.len());
    let mut len = 0;
    let mut i = 1;
    while i < needle.len() {
        if needle[i] == needle[len] {
            len += 1;
            lps[i] = len;
            i += 1;
        } else if len != 0 {
            len = lps[len - 1];
        } else {
            lps[i] = 0;
            i += 1;
        }
    }
}

enum LpsTable {
    Stack([usize; STR_STACK_MAX_LEN]),
    Heap(TypedBuf<usize>),
}

/// A compiled needle: the bytes plus their prefix table.
pub(crate) struct Kmp<'a> {
    needle: &'a [u8],
    table: LpsTable,
}

impl<'a> Kmp<'a> {
    /// Compiles a non-empty needle. `None` only when the heap table cannot
    /// be allocated.
    pub(crate) fn new(needle: &'a [u8]) -> Option<Kmp<'a>> {
        debug_assert!(!needle.is_empty());
        let table = if needle.len() <= STR_STACK_MAX_LEN {
            let mut lps = [0usize; STR_STACK_MAX_LEN];
            build_lps(needle, &mut lps[..needle.len()]);
            LpsTable::Stack(lps)
        } else {
            let mut buf = TypedBuf::<usize>::alloc(needle.len())?;
            build_lps(needle, buf.as_mut_slice());
            LpsTable::Heap(buf)
        };
        Some(Kmp { needle, table })
    }

    fn lps(&self) -> &[usize] {
        match &self.table {
            LpsTable::Stack(arr) => &arr[..self.needle.len()],
            LpsTable::Heap(buf) => buf.as_slice(),
        }
    }

    /// First match at or after `start`, as an offset into `hay`.
    pub(crate) fn find_from(&self, hay: &[u8], start: usize) -> Option<usize> {
        if start > hay.len() {
            return None;
        }
        let lps = self.lps();
        let mut j = 0;
        for (i, &b) in hay.iter().enumerate().skip(start) {
            while j > 0 && b != self.needle[j] {
                j = lps[j - 1];
            }
            if b == self.needle[j] {
                j += 1;
                if j == self.needle.len() {
                    return Some(i + 1 - j);
                }
            }
        }
        None
    }

    /// Last match in `hay`, overlapping occurrences included.
    pub(crate) fn find_last(&self, hay: &[u8]) -> Option<usize> {
        let lps = self.lps();
        let mut j = 0;
        let mut last = None;
        for (i, &b) in hay.iter().enumerate() {
            while j > 0 && b != self.needle[j] {
                j = lps[j - 1];
            }
            if b == self.needle[j] {
                j += 1;
                if j == self.needle.len() {
                    last = Some(i + 1 - j);
                    j = lps[j - 1];
                }
            }
        }
        last
    }
}

/// Offset of the first occurrence of `needle` in `haystack`.
///
/// An empty needle matches at offset 0. `None` when the needle is longer
/// than the haystack, absent, or either side exceeds `max_len`.
pub fn find(haystack: StrArg<'_>, needle: StrArg<'_>, max_len: usize) -> Option<usize> {
    let hay = haystack.bytes_bounded(max_len)?;
    let nee = needle.bytes_bounded(max_len)?;
    if nee.is_empty() {
        return Some(0);
    }
    if hay.len() < nee.len() {
        return None;
    }
    Kmp::new(nee)?.find_from(hay, 0)
}

/// Offset of the last occurrence of `needle` in `haystack`.
///
/// An empty needle matches one past the end.
pub fn rfind(haystack: StrArg<'_>, needle: StrArg<'_>, max_len: usize) -> Option<usize> {
    let hay = haystack.bytes_bounded(max_len)?;
    let nee = needle.bytes_bounded(max_len)?;
    if nee.is_empty() {
        return Some(hay.len());
    }
    if hay.len() < nee.len() {
        return None;
    }
    Kmp::new(nee)?.find_last(hay)
}
