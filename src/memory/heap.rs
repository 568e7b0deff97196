/*
 * Kernel Heap
 *
 * Dynamic allocation for kernel data structures, built on the
 * linked_list_allocator crate. The backing pages come from the coremap once
 * it is up, so the boot order is: coremap init, then heap init, then
 * anything that allocates.
 *
 * Registration as the Rust global allocator is gated behind the
 * `kernel-heap` feature: kernel builds enable it, hosted builds (tests) use
 * the host allocator and exercise the heap type directly.
 */

use linked_list_allocator::Heap;
use spin::Mutex;

use crate::errno::Errno;

/// Pages handed to the kernel heap at boot (2 MiB)
pub const KHEAP_PAGES: usize = 512;

/// A lock-guarded first-fit heap over a fixed memory window
pub struct KernelHeap {
    inner: Mutex<Heap>,
}

impl KernelHeap {
    pub const fn empty() -> Self {
        Self { inner: Mutex::new(Heap::empty()) }
    }

    /// Hand the window `[bottom, bottom+size)` to the heap.
    ///
    /// # Safety
    ///
    /// The window must be valid, writable, unused by anything else, and
    /// must outlive the heap.
    pub unsafe fn init(&self, bottom: *mut u8, size: usize) {
        unsafe { self.inner.lock().init(bottom, size) };
    }

    pub fn allocate(&self, layout: core::alloc::Layout) -> Option<core::ptr::NonNull<u8>> {
        self.inner.lock().allocate_first_fit(layout).ok()
    }

    /// # Safety
    ///
    /// `ptr` must come from `allocate` with the same layout.
    pub unsafe fn deallocate(&self, ptr: core::ptr::NonNull<u8>, layout: core::alloc::Layout) {
        unsafe { self.inner.lock().deallocate(ptr, layout) };
    }

    pub fn used(&self) -> usize {
        self.inner.lock().used()
    }

    pub fn free(&self) -> usize {
        self.inner.lock().free()
    }
}

#[cfg(feature = "kernel-heap")]
mod global {
    use linked_list_allocator::LockedHeap;

    #[global_allocator]
    pub(super) static ALLOCATOR: LockedHeap = LockedHeap::empty();
}

/// Carve the kernel heap out of the coremap and register it as the global
/// allocator. Must run exactly once, after the coremap init and before the
/// first allocation.
#[cfg(feature = "kernel-heap")]
pub fn init() -> Result<(), Errno> {
    use crate::config::PAGE_SIZE;
    use crate::memory::coremap;

    let size = KHEAP_PAGES * PAGE_SIZE;
    let bottom = coremap::alloc_kpages(KHEAP_PAGES).ok_or(Errno::ENOMEM)?;
    log::info!("kernel heap: {} KiB at {:#x}", size / 1024, bottom.as_u64());
    // SAFETY: the pages were just allocated for us and are never freed.
    unsafe { global::ALLOCATOR.lock().init(bottom.as_mut_ptr(), size) };
    Ok(())
}

/// Hosted builds run on the host allocator; nothing to set up.
#[cfg(not(feature = "kernel-heap"))]
pub fn init() -> Result<(), Errno> {
    Ok(())
}
