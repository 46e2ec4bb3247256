//! # rune-core
//!
//! Reusable building blocks: a thread-local error stack with call-site
//! capture, a thread-local allocator stack with scoped acquisition, FNV-1a
//! hash primitives, managed byte strings with a sentinel-validated header
//! layout, and a generic red-black ordered set.
//!
//! The crate is safe Rust throughout; only the `mem` module, which owns the
//! raw-allocation boundary, is permitted `unsafe`.

#![deny(unsafe_code)]

pub mod error;
pub mod hash;
#[allow(unsafe_code)]
pub mod mem;
pub mod str;
pub mod tree;

pub use error::ErrCode;
pub use str::{RStr, StrArg};
pub use tree::RbSet;
