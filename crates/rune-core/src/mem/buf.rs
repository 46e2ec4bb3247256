//! Typed allocation helpers layered above the allocator stack.
//!
//! [`RawBuf`] is an owned, zero-initialized byte block; [`TypedBuf`] is an
//! owned array of a plain-old-data element type. Both allocate through the
//! current handle and release through whatever handle is current at drop
//! time (see the module docs for the release discipline).

use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::err_set;
use crate::error::ErrCode;

/// An owned byte block from the current allocator. Always fully initialized
/// (zero-filled on allocation and on growth).
#[derive(Debug)]
pub struct RawBuf {
    ptr: NonNull<u8>,
    size: usize,
}

impl RawBuf {
    /// Allocates a zero-filled block of `size` bytes.
    pub fn alloc(size: usize) -> Option<RawBuf> {
        let ptr = super::alloc_zero(size)?;
        Some(RawBuf { ptr, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Reallocates to `new_size`. On failure the block is unchanged and
    /// `false` is returned. Grown bytes are zero-filled.
    pub fn resize(&mut self, new_size: usize) -> bool {
        if new_size == self.size {
            return true;
        }
        // SAFETY: `ptr`/`size` describe a live block from the current handle.
        let Some(ptr) = (unsafe { super::realloc(self.ptr, self.size, new_size) }) else {
            return false;
        };
        if new_size > self.size {
            // SAFETY: the realloc produced `new_size` bytes; the tail past
            // the old size is uninitialized until zeroed here.
            unsafe {
                core::ptr::write_bytes(ptr.as_ptr().add(self.size), 0, new_size - self.size)
            };
        }
        self.ptr = ptr;
        self.size = new_size;
        true
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `size` initialized bytes at `ptr`, owned by `self`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` gives unique access.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }

    /// Base address of the block (the managed-string header stores it in the
    /// self-referential payload-pointer field).
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

impl Drop for RawBuf {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`size` describe a live block; dropped exactly once.
        unsafe { super::free(self.ptr, self.size) };
    }
}

/// An owned, zero-initialized array of a plain-old-data type.
///
/// Backs the heap path of the KMP prefix table. `T` must be valid when
/// zero-filled and must not need `Drop`; the crate only instantiates it with
/// primitive integers.
#[derive(Debug)]
pub struct TypedBuf<T: Copy> {
    ptr: NonNull<u8>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Copy> TypedBuf<T> {
    /// Allocates `len` zeroed elements through the current handle.
    pub fn alloc(len: usize) -> Option<TypedBuf<T>> {
        if core::mem::align_of::<T>() > super::ALLOC_ALIGN {
            err_set!(ErrCode::InvalidArgument);
            return None;
        }
        let Some(size) = len.checked_mul(core::mem::size_of::<T>()) else {
            err_set!(ErrCode::Overflow);
            return None;
        };
        let ptr = super::alloc_zero(size)?;
        Some(TypedBuf {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: block is zero-initialized, sized for `len` elements, and
        // aligned (handles guarantee ALLOC_ALIGN >= align_of::<T>()).
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr().cast::<T>(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, with unique access through `&mut self`.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<T>(), self.len) }
    }
}

impl<T: Copy> Drop for TypedBuf<T> {
    fn drop(&mut self) {
        let size = self.len * core::mem::size_of::<T>();
        // SAFETY: live block from the current handle, dropped exactly once.
        unsafe { super::free(self.ptr, size) };
    }
}
