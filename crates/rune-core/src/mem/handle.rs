//! Allocator handles: the dispatch trait, the default system handle, and a
//! stats-keeping wrapper.

use core::ptr::NonNull;
use std::alloc::{self, Layout};

use parking_lot::Mutex;

use super::ALLOC_ALIGN;
use crate::err_set;
use crate::error::ErrCode;

/// An allocator that can be installed on the per-thread allocator stack.
///
/// Handle-local state (stats, arenas, pools) hangs off `&self`. Handles must
/// return blocks aligned to [`ALLOC_ALIGN`].
pub trait AllocHandle {
    /// Allocates `size` bytes. `None` on failure (the handle records the
    /// error).
    fn alloc(&self, size: usize) -> Option<NonNull<u8>>;

    /// Resizes a block. On failure returns `None` and leaves the old block
    /// valid.
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by this handle with size `old_size`.
    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by this handle with size `size`, and
    /// must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize);
}

fn layout_for(size: usize) -> Option<Layout> {
    match Layout::from_size_align(size.max(1), ALLOC_ALIGN) {
        Ok(layout) => Some(layout),
        Err(_) => {
            err_set!(ErrCode::Overflow);
            None
        }
    }
}

/// Default handle: the platform allocator, implicitly at the bottom of every
/// thread's stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAlloc;

impl AllocHandle for SystemAlloc {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = layout_for(size)?;
        // SAFETY: `layout` has non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        match NonNull::new(ptr) {
            Some(p) => Some(p),
            None => {
                err_set!(ErrCode::OutOfMemory);
                None
            }
        }
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let old_layout = layout_for(old_size)?;
        if layout_for(new_size).is_none() {
            return None;
        }
        // SAFETY: caller guarantees `ptr` came from this handle with
        // `old_size`; `new_size.max(1)` is non-zero.
        let raw = unsafe { alloc::realloc(ptr.as_ptr(), old_layout, new_size.max(1)) };
        match NonNull::new(raw) {
            Some(p) => Some(p),
            None => {
                err_set!(ErrCode::OutOfMemory);
                None
            }
        }
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(layout) = layout_for(size) {
            // SAFETY: caller guarantees `ptr` came from this handle with
            // `size`.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

/// Allocation counters kept by [`CountingAlloc`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub allocs: u64,
    pub reallocs: u64,
    pub frees: u64,
    pub live_bytes: usize,
    pub peak_bytes: usize,
}

/// A handle that forwards to [`SystemAlloc`] and tracks allocation traffic.
///
/// A single handle may be shared by several strings or trees; the stats live
/// behind a mutex so the handle itself decides its synchronization.
#[derive(Debug, Default)]
pub struct CountingAlloc {
    inner: SystemAlloc,
    stats: Mutex<AllocStats>,
}

impl CountingAlloc {
    pub fn new() -> CountingAlloc {
        CountingAlloc::default()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> AllocStats {
        *self.stats.lock()
    }

    fn grow(&self, bytes: usize) {
        let mut s = self.stats.lock();
        s.live_bytes += bytes;
        s.peak_bytes = s.peak_bytes.max(s.live_bytes);
    }
}

impl AllocHandle for CountingAlloc {
    fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.inner.alloc(size)?;
        self.stats.lock().allocs += 1;
        self.grow(size);
        Some(ptr)
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded contract.
        let out = unsafe { self.inner.realloc(ptr, old_size, new_size) }?;
        {
            let mut s = self.stats.lock();
            s.reallocs += 1;
            s.live_bytes = s.live_bytes.saturating_sub(old_size);
        }
        self.grow(new_size);
        Some(out)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        // SAFETY: forwarded contract.
        unsafe { self.inner.free(ptr, size) };
        let mut s = self.stats.lock();
        s.frees += 1;
        s.live_bytes = s.live_bytes.saturating_sub(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_alloc_roundtrip() {
        let a = SystemAlloc;
        let ptr = a.alloc(100).unwrap();
        assert_eq!(ptr.as_ptr() as usize % ALLOC_ALIGN, 0);
        // SAFETY: just allocated 100 bytes.
        unsafe { a.free(ptr, 100) };
    }

    #[test]
    fn test_system_alloc_zero_size() {
        let a = SystemAlloc;
        // malloc(0) convention: a real, freeable pointer.
        let ptr = a.alloc(0).unwrap();
        // SAFETY: just allocated.
        unsafe { a.free(ptr, 0) };
    }

    #[test]
    fn test_system_realloc_preserves_prefix() {
        let a = SystemAlloc;
        let ptr = a.alloc(4).unwrap();
        // SAFETY: 4 writable bytes at `ptr`.
        unsafe { core::ptr::copy_nonoverlapping(b"rune".as_ptr(), ptr.as_ptr(), 4) };
        // SAFETY: `ptr` came from `a` with size 4.
        let ptr = unsafe { a.realloc(ptr, 4, 64) }.unwrap();
        // SAFETY: first 4 bytes survived the realloc.
        let prefix = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), 4) };
        assert_eq!(prefix, b"rune");
        unsafe { a.free(ptr, 64) };
    }

    #[test]
    fn test_counting_alloc_tracks_peak_and_live() {
        let a = CountingAlloc::new();
        let p1 = a.alloc(100).unwrap();
        let p2 = a.alloc(50).unwrap();
        assert_eq!(a.stats().live_bytes, 150);
        assert_eq!(a.stats().peak_bytes, 150);
        // SAFETY: blocks came from `a` with the given sizes.
        unsafe { a.free(p1, 100) };
        assert_eq!(a.stats().live_bytes, 50);
        assert_eq!(a.stats().peak_bytes, 150);
        unsafe { a.free(p2, 50) };
        let s = a.stats();
        assert_eq!(s.allocs, 2);
        assert_eq!(s.frees, 2);
        assert_eq!(s.live_bytes, 0);
    }
}
