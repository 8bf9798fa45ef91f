//! Fixed-size block pool for real-time paths.
//!
//! One contiguous region is reserved up front and carved into equal blocks.
//! Allocation pops a block off a free list; there is no growth and no
//! defragmentation, so allocation cost and memory use never change after
//! construction.

use std::ops::Range;
use std::ptr::NonNull;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::PoolError;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// A pool of `block_count` blocks of `block_size` bytes each.
pub struct BlockPool {
    region: NonNull<u8>,
    len: usize,
    block_size: usize,
    block_count: usize,
    free: Mutex<Vec<NonNull<u8>>>,
}

// SAFETY: the region is owned by the pool and only handed out as raw block
// pointers; the free list is behind a mutex.
unsafe impl Send for BlockPool {}
unsafe impl Sync for BlockPool {}

impl BlockPool {
    /// Reserve `block_size * block_count` bytes and put every block on the free list.
    pub fn new(block_size: usize, block_count: usize) -> PoolResult<Self> {
        if block_size == 0 || block_count == 0 {
            return Err(PoolError::InvalidLayout(format!(
                "{block_size} x {block_count} blocks"
            )));
        }
        let len = block_size.checked_mul(block_count).ok_or_else(|| {
            PoolError::InvalidLayout(format!("{block_size} x {block_count} overflows"))
        })?;

        let region: Box<[u8]> = vec![0u8; len].into_boxed_slice();
        // SAFETY: Box::into_raw never returns null.
        let region = unsafe { NonNull::new_unchecked(Box::into_raw(region) as *mut u8) };

        let free = (0..block_count)
            .rev()
            // SAFETY: every offset is inside the allocation just made.
            .map(|i| unsafe { NonNull::new_unchecked(region.as_ptr().add(i * block_size)) })
            .collect();

        Ok(Self {
            region,
            len,
            block_size,
            block_count,
            free: Mutex::new(free),
        })
    }

    /// Take one block off the free list.
    ///
    /// The block is `block_size` bytes, valid for reads and writes until it
    /// is handed back or the pool is dropped.
    pub fn allocate(&self) -> PoolResult<NonNull<u8>> {
        let block = self
            .free
            .lock()
            .pop()
            .ok_or(PoolError::Exhausted(self.block_count))?;
        trace!(addr = block.as_ptr() as usize, "Block allocated");
        Ok(block)
    }

    /// Return a block to the free list.
    ///
    /// Pointers outside the pool's region are rejected. Any pointer inside
    /// the region is accepted, even one that is not currently allocated:
    /// the pool cannot detect a double free, so callers must not hand a
    /// block back twice.
    pub fn deallocate(&self, block: NonNull<u8>) -> PoolResult<()> {
        if !self.contains(block) {
            return Err(PoolError::ForeignPointer(block.as_ptr() as usize));
        }
        self.free.lock().push(block);
        Ok(())
    }

    /// True if `ptr` points into this pool's region.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.address_range().contains(&(ptr.as_ptr() as usize))
    }

    /// Address range of the reserved region.
    pub fn address_range(&self) -> Range<usize> {
        let start = self.region.as_ptr() as usize;
        start..start + self.len
    }

    /// Number of blocks currently on the free list.
    pub fn available_blocks(&self) -> usize {
        self.free.lock().len()
    }

    /// Size of each block in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks.
    pub fn block_count(&self) -> usize {
        self.block_count
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        // SAFETY: reconstructs exactly the boxed slice leaked in `new`.
        unsafe {
            let slice = std::ptr::slice_from_raw_parts_mut(self.region.as_ptr(), self.len);
            drop(Box::from_raw(slice));
        }
    }
}

impl std::fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockPool")
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("available", &self.available_blocks())
            .finish()
    }
}
