/*
 * VM Fault Path
 *
 * Resolves a user fault against the current address space: the address must
 * fall inside one of the space's regions, and a first touch of a page
 * allocates a zeroed frame, installs the page-table entry, and loads one
 * TLB translation. Faults outside every region, or before a process and
 * address space exist, are EFAULT.
 *
 * The fault type is carried but not differentiated yet; it is the hook for
 * write-protection enforcement.
 */

use crate::config::PAGE_SIZE;
use crate::errno::Errno;
use crate::memory::coremap;
use crate::memory::page_table::PageEntry;
use crate::memory::tlb;
use crate::memory::types::{VirtAddr, pfn_of, vpn_of};
use crate::process;

/// Kind of access that faulted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    Read,
    Write,
    /// Write to a read-only mapping
    ReadOnly,
}

/// Post-allocator VM setup hook. The coremap init does all the work in this
/// cut, so there is nothing left to do here; kept so the boot sequence has
/// a stable shape.
pub fn vm_bootstrap() {}

/// Handle a user-mode translation fault at `fault_addr`.
pub fn vm_fault(fault_type: FaultType, fault_addr: VirtAddr) -> Result<(), Errno> {
    // Reserved until write protection is enforced.
    let _ = fault_type;

    // No process or no address space: a kernel fault early in boot. Fail
    // instead of looping on the same fault forever.
    let proc = process::current().ok_or(Errno::EFAULT)?;
    let mut guard = proc.addrspace().lock();
    let space = guard.as_mut().ok_or(Errno::EFAULT)?;

    let Some(region) = space.find_region(fault_addr) else {
        log::debug!("vm_fault: {:?} outside every region", fault_addr);
        return Err(Errno::EFAULT);
    };
    let perms = region.perms();

    let vpn = vpn_of(fault_addr);
    let resident = space.page_table().lookup(vpn).map(|entry| entry.phys);
    let phys = match resident {
        Some(phys) => phys,
        None => {
            let phys = coremap::alloc_upages(1, space.id()).ok_or(Errno::ENOMEM)?;
            let kva = coremap::kvaddr_for(phys).ok_or(Errno::ENOMEM)?;
            // SAFETY: the alias covers exactly one frame we just allocated.
            unsafe {
                core::ptr::write_bytes(kva.as_mut_ptr::<u8>(), 0, PAGE_SIZE);
            }
            space.page_table_mut().insert(PageEntry::resident(vpn, phys, perms));
            phys
        }
    };

    tlb::load(vpn, pfn_of(phys));
    Ok(())
}
