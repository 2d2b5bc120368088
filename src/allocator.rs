use core::alloc::Layout;
use core::fmt::Debug;
use core::ptr::NonNull;

use crate::error::AllocationError;

/// A pluggable source of storage for a table's slot array.
///
/// The table asks for exactly one block per slot array and hands every block
/// back through [`release`](TableAllocator::release) with the same layout it
/// was allocated with. Requests always have a non-zero size.
///
/// # Safety
///
/// Implementations must return blocks that are valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and that stay valid
/// until they are released. A block must not be handed out again while it is
/// still live.
pub unsafe trait TableAllocator {
    /// Obtains a block of storage matching `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError>;

    /// Returns a block previously obtained from [`allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not be used after this call.
    ///
    /// [`allocate`]: TableAllocator::allocate
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);
}

// SAFETY: Forwards to `A`, which upholds the contract.
unsafe impl<A> TableAllocator for &A
where
    A: TableAllocator + ?Sized,
{
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Caller upholds the contract for `A::release`.
        unsafe { (**self).release(ptr, layout) }
    }
}

/// The default allocator, backed by the global heap.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

// SAFETY: The global allocator satisfies the block validity requirements for
// non-zero-sized layouts, which is all the table ever requests.
unsafe impl TableAllocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        debug_assert!(layout.size() != 0);
        // SAFETY: The table only requests non-zero-sized layouts.
        let raw = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(raw).ok_or_else(|| AllocationError::out_of_memory(layout))
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// An allocator assembled from a raw acquire/release function pair.
///
/// Null from the acquire function is reported as
/// [`AllocationError::OutOfMemory`].
///
/// # Examples
///
/// ```rust
/// use std::alloc::alloc;
/// use std::alloc::dealloc;
///
/// use probe_hash::FnAllocator;
///
/// // SAFETY: `alloc`/`dealloc` form a matching pair.
/// let allocator = unsafe { FnAllocator::new(alloc, dealloc) };
/// # let _ = allocator;
/// ```
#[derive(Clone, Copy)]
pub struct FnAllocator {
    allocate: unsafe fn(Layout) -> *mut u8,
    release: unsafe fn(*mut u8, Layout),
}

impl FnAllocator {
    /// Wraps `allocate` and `release`.
    ///
    /// # Safety
    ///
    /// For every non-zero-sized `layout`, `allocate` must either return null
    /// or a block satisfying the [`TableAllocator`] contract, and `release`
    /// must accept every such block together with the layout it was
    /// allocated with.
    pub const unsafe fn new(
        allocate: unsafe fn(Layout) -> *mut u8,
        release: unsafe fn(*mut u8, Layout),
    ) -> Self {
        Self { allocate, release }
    }
}

impl Debug for FnAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnAllocator")
            .field("allocate", &(self.allocate as *const ()))
            .field("release", &(self.release as *const ()))
            .finish()
    }
}

// SAFETY: The constructor's contract makes the wrapped pair uphold the
// allocator requirements.
unsafe impl TableAllocator for FnAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        // SAFETY: Guaranteed by the `FnAllocator::new` contract for non-zero
        // sizes, which is all the table requests.
        let raw = unsafe { (self.allocate)(layout) };
        NonNull::new(raw).ok_or_else(|| AllocationError::out_of_memory(layout))
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { (self.release)(ptr.as_ptr(), layout) }
    }
}
