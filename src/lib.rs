#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Pluggable storage for the slot array.
///
/// This module provides the `TableAllocator` trait the table draws its
/// storage from, the default `Global` heap allocator, and `FnAllocator` for
/// raw function-pointer pairs.
pub mod allocator;

/// Behavior sets describing how keys and values are hashed, compared, copied
/// and destroyed.
pub mod behavior;

/// Errors reported by table creation and growth.
pub mod error;

pub mod hash_table;

pub use allocator::FnAllocator;
pub use allocator::Global;
pub use allocator::TableAllocator;
pub use behavior::Cloned;
#[cfg(any(feature = "foldhash", feature = "std"))]
pub use behavior::DefaultHashBuilder;
pub use behavior::FnKeyBehavior;
pub use behavior::FnValueBehavior;
pub use behavior::Hashed;
pub use behavior::KeyBehavior;
pub use behavior::ValueBehavior;
pub use error::AllocationError;
pub use hash_table::HashTable;
