//! Ordered set on a red-black tree.
//!
//! Nodes live in an index-addressed arena (a dense `Vec` with swap-remove
//! compaction), so parent back-references are plain indices rather than
//! owning handles and rotations reduce to index swaps.

mod set;

pub use set::{Iter, RbSet};
