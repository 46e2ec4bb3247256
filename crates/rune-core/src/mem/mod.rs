//! Allocator handles, the per-thread allocator stack, and typed buffers.
//!
//! Every allocation in the library routes through [`current()`]: the top of a
//! thread-local stack of [`AllocHandle`]s with [`SystemAlloc`] implicitly at
//! the bottom. Callers install a handle for a region of code either manually
//! (`push`/`pop`) or through [`AllocScope`], which guarantees the matching pop
//! on every exit path.
//!
//! This module owns the crate's raw-allocation boundary and is the only place
//! `unsafe` is permitted. The [`RawBuf`] and [`TypedBuf`] wrappers expose a
//! safe surface to the layers above.
//!
//! Release discipline: a buffer is freed through whatever handle is current
//! at drop time, so it must be released while the handle that produced it is
//! still installed.

mod buf;
mod handle;

pub use buf::{RawBuf, TypedBuf};
pub use handle::{AllocHandle, AllocStats, CountingAlloc, SystemAlloc};

use core::cell::RefCell;
use core::ptr::NonNull;
use std::rc::Rc;

use crate::err_set;
use crate::error::ErrCode;

/// Maximum depth of the per-thread allocator stack.
pub const ALLOC_STACK_MAX: usize = 16;

/// Alignment guaranteed by every handle, malloc-style: suitable for any
/// fundamental type.
pub const ALLOC_ALIGN: usize = 16;

thread_local! {
    static STACK: RefCell<Vec<Rc<dyn AllocHandle>>> = const { RefCell::new(Vec::new()) };
}

fn default_handle() -> Rc<dyn AllocHandle> {
    thread_local! {
        static DEFAULT: Rc<SystemAlloc> = Rc::new(SystemAlloc);
    }
    DEFAULT.with(|d| {
        let h: Rc<dyn AllocHandle> = d.clone();
        h
    })
}

/// Installs `handle` as the current allocator.
///
/// Fails with [`ErrCode::AllocatorStackOverflow`] when the stack is
/// saturated.
pub fn push(handle: Rc<dyn AllocHandle>) -> bool {
    let pushed = STACK.with(|s| {
        let mut s = s.borrow_mut();
        if s.len() >= ALLOC_STACK_MAX {
            return false;
        }
        s.push(handle);
        true
    });
    if !pushed {
        err_set!(ErrCode::AllocatorStackOverflow);
    }
    pushed
}

/// Uninstalls the current allocator.
///
/// Fails with [`ErrCode::AllocatorStackUnderflow`] when the stack is empty.
pub fn pop() -> bool {
    let popped = STACK.with(|s| s.borrow_mut().pop().is_some());
    if !popped {
        err_set!(ErrCode::AllocatorStackUnderflow);
    }
    popped
}

/// Number of explicitly installed handles (the implicit default is not
/// counted).
pub fn depth() -> usize {
    STACK.with(|s| s.borrow().len())
}

/// The top handle, or the default system handle when the stack is empty.
pub fn current() -> Rc<dyn AllocHandle> {
    STACK
        .with(|s| s.borrow().last().cloned())
        .unwrap_or_else(default_handle)
}

/// Allocates `size` bytes through the current handle.
pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    current().alloc(size)
}

/// Allocates `size` bytes through the current handle and zeroes exactly
/// `size` bytes.
pub fn alloc_zero(size: usize) -> Option<NonNull<u8>> {
    let ptr = current().alloc(size)?;
    // SAFETY: the handle just produced `size` writable bytes at `ptr`.
    unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, size) };
    Some(ptr)
}

/// Reallocates through the current handle.
///
/// # Safety
///
/// `ptr` must have been produced by the current handle with size `old_size`.
pub unsafe fn realloc(ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
    // SAFETY: forwarded contract.
    unsafe { current().realloc(ptr, old_size, new_size) }
}

/// Releases through the current handle.
///
/// # Safety
///
/// `ptr` must have been produced by the current handle with size `size`, and
/// must not be used afterwards.
pub unsafe fn free(ptr: NonNull<u8>, size: usize) {
    // SAFETY: forwarded contract.
    unsafe { current().free(ptr, size) }
}

/// Scoped acquisition of an allocator handle.
///
/// Pushes on [`enter`](AllocScope::enter), pops on drop — the pop runs on
/// every exit path of the enclosing scope, early returns and unwinding
/// included.
#[must_use = "dropping the scope immediately pops the handle again"]
pub struct AllocScope {
    _priv: (),
}

impl AllocScope {
    /// Installs `handle`; `None` when the stack is saturated (the error is
    /// already recorded).
    pub fn enter(handle: Rc<dyn AllocHandle>) -> Option<AllocScope> {
        if push(handle) {
            Some(AllocScope { _priv: () })
        } else {
            None
        }
    }
}

impl Drop for AllocScope {
    fn drop(&mut self) {
        pop();
    }
}

/// Runs `f` with `handle` installed as the current allocator.
///
/// `None` when the stack is saturated; the handle is popped even when `f`
/// unwinds.
pub fn with_alloc<R>(handle: Rc<dyn AllocHandle>, f: impl FnOnce() -> R) -> Option<R> {
    let _scope = AllocScope::enter(handle)?;
    Some(f())
}
