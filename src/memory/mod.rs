/*
 * Memory Management
 *
 * High-level module that ties together:
 *  - Physical frame allocator (coremap)
 *  - Per-process address spaces and page tables
 *  - VM fault handling
 *  - Kernel heap (heap)
 */

pub mod address_space;
pub mod coremap;
pub mod fault;
pub mod heap;
pub mod page_table;
pub mod tlb;
pub mod types;

pub use address_space::{AddressSpace, Region, RegionPerms};
pub use fault::{FaultType, vm_bootstrap, vm_fault};
pub use types::{AsId, PhysAddr, VirtAddr};

use crate::errno::Errno;

/// Top-level memory initialization:
///  1. Physical frame allocator over the boot RAM window
///  2. Kernel heap
///
/// # Safety
///
/// Same contract as [`coremap::init`]: the window must be valid, writable,
/// and handed over exclusively, and this must run exactly once.
pub unsafe fn init(ram_base: *mut u8, ram_size: usize, first_free_phys: usize) -> Result<(), Errno> {
    log::info!("Initializing memory management...");

    // 1) Physical frames
    unsafe { coremap::init(ram_base, ram_size, first_free_phys) };

    // 2) Heap
    heap::init()?;

    log::info!(
        "Physical memory: {} KiB used of {} KiB",
        coremap::used_bytes() / 1024,
        ram_size / 1024
    );
    Ok(())
}
