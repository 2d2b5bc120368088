use core::alloc::Layout;

use thiserror::Error;

/// Error returned when the table cannot obtain storage for its slot array.
///
/// Surfaced by table creation and by any insert that needs to grow the table.
/// In both cases the table (if one exists) is left exactly as it was before
/// the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The slot array for the requested number of slots does not fit in the
    /// address space.
    #[error("a slot array of {slots} slots exceeds the addressable size")]
    CapacityOverflow {
        /// Number of slots that was requested.
        slots: usize,
    },
    /// The allocator refused the request.
    #[error("allocator could not provide {size} bytes aligned to {align}")]
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },
}

impl AllocationError {
    /// Builds an [`AllocationError::OutOfMemory`] describing `layout`.
    pub fn out_of_memory(layout: Layout) -> Self {
        AllocationError::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        }
    }
}
