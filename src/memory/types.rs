/*
 * Memory Types
 *
 * Core types shared across the memory subsystem. We re-export the x86_64
 * crate's address types and provide our own small wrappers where a cleaner
 * abstraction helps.
 */

use crate::config::{PAGE_FRAME, PAGE_SHIFT, PAGE_SIZE};

// Re-export address types for convenience
pub use x86_64::{PhysAddr, VirtAddr};

/// Identifier of an address space, used to tag frame ownership
///
/// The coremap records which address space a user frame belongs to. Storing
/// an id rather than a pointer keeps the coremap free of lifetime ties to
/// process teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AsId(pub u64);

/// Virtual page number of an address
#[inline]
pub fn vpn_of(addr: VirtAddr) -> u64 {
    addr.as_u64() >> PAGE_SHIFT
}

/// Physical frame number of an address
#[inline]
pub fn pfn_of(addr: PhysAddr) -> u64 {
    addr.as_u64() >> PAGE_SHIFT
}

/// Round an address value down to its page base
#[inline]
pub fn page_align_down(addr: u64) -> u64 {
    addr & PAGE_FRAME
}

/// Round a size up to a whole number of pages
#[inline]
pub fn page_round_up(len: u64) -> u64 {
    (len + PAGE_SIZE as u64 - 1) & PAGE_FRAME
}
