/*
 * Address Space Management
 *
 * Per-process virtual memory bookkeeping: an ordered collection of regions
 * (code/data, heap, stack) plus the flat page table of resident mappings.
 *
 * Memory Layout:
 * ==============
 *
 * 0x00000000 +          Code/data regions, placed by the loader
 * above code +          Heap (base rises to the highest code/data end)
 * 0x7fc00000 - 0x80000000   Stack (1024 pages, grows down from USERSTACK)
 *
 * Regions record permission bits but this cut does not enforce them; the
 * bits survive copies so enforcement can be switched on later. Physical
 * frames reach a space only through its page table, and destroying the
 * space returns every one of them to the coremap.
 */

use alloc::vec::Vec;
use bitflags::bitflags;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::config::{PAGE_SIZE, STACK_PAGES, USERSTACK};
use crate::errno::Errno;
use crate::memory::coremap;
use crate::memory::page_table::{PageState, PageTable};
use crate::memory::tlb;
use crate::memory::types::{AsId, VirtAddr, page_align_down, page_round_up};

bitflags! {
    /// Region permission bits (recorded, not yet enforced)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionPerms: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

/// A contiguous virtual address span within an address space
///
/// The range is page-aligned and half-open: `[vbase, vend)`.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    vbase: VirtAddr,
    vend: VirtAddr,
    pages: usize,
    perms: RegionPerms,
}

impl Region {
    fn new(vbase: VirtAddr, vend: VirtAddr, perms: RegionPerms) -> Self {
        let pages = ((vend - vbase) / PAGE_SIZE as u64) as usize;
        Self { vbase, vend, pages, perms }
    }

    /// Empty placeholder region at address zero
    fn empty() -> Self {
        Self::new(VirtAddr::zero(), VirtAddr::zero(), RegionPerms::empty())
    }

    pub fn vbase(&self) -> VirtAddr {
        self.vbase
    }

    pub fn vend(&self) -> VirtAddr {
        self.vend
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn perms(&self) -> RegionPerms {
        self.perms
    }

    /// Fault-path membership check. The end is deliberately inclusive so a
    /// fault exactly at `vend` still resolves to this region.
    fn covers(&self, addr: VirtAddr) -> bool {
        self.pages > 0 && addr >= self.vbase && addr <= self.vend
    }

    /// Half-open range overlap, used when defining new regions
    fn overlaps(&self, vbase: VirtAddr, vend: VirtAddr) -> bool {
        self.pages > 0 && vbase < self.vend && self.vbase < vend
    }
}

static NEXT_AS_ID: AtomicU64 = AtomicU64::new(1);

/// Per-process address space
///
/// Owns its region lists and page table. The coremap tags user frames with
/// the space's id, and Drop returns every resident frame.
pub struct AddressSpace {
    id: AsId,
    /// Code/data regions in definition order
    regions: Vec<Region>,
    heap: Region,
    stack: Region,
    page_table: PageTable,
}

impl AddressSpace {
    /// Fresh address space: no code/data regions, an empty heap, and the
    /// fixed 1024-page stack ending at USERSTACK.
    pub fn new() -> Self {
        let stack_base = VirtAddr::new(USERSTACK - (STACK_PAGES * PAGE_SIZE) as u64);
        Self {
            id: AsId(NEXT_AS_ID.fetch_add(1, Ordering::Relaxed)),
            regions: Vec::new(),
            heap: Region::empty(),
            stack: Region::new(stack_base, VirtAddr::new(USERSTACK), RegionPerms::READ | RegionPerms::WRITE),
            page_table: PageTable::new(),
        }
    }

    pub fn id(&self) -> AsId {
        self.id
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn heap(&self) -> &Region {
        &self.heap
    }

    pub fn stack(&self) -> &Region {
        &self.stack
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }

    /// Record a code/data region spanning `[vaddr, vaddr+size)`.
    ///
    /// The base is aligned down and the size up to whole pages. The heap
    /// base rises to the highest region end so the heap always begins just
    /// above the loaded segments.
    pub fn define_region(
        &mut self,
        vaddr: VirtAddr,
        size: usize,
        perms: RegionPerms,
    ) -> Result<(), Errno> {
        let base = page_align_down(vaddr.as_u64());
        let len = page_round_up(size as u64 + (vaddr.as_u64() - base));
        if len == 0 {
            return Err(Errno::EINVAL);
        }
        let vbase = VirtAddr::new(base);
        let vend = VirtAddr::new(base + len);

        if self.stack.overlaps(vbase, vend)
            || self.regions.iter().any(|r| r.overlaps(vbase, vend))
        {
            return Err(Errno::EINVAL);
        }

        self.regions.push(Region::new(vbase, vend, perms));

        // Heap floor follows the highest segment; never moves back down.
        if self.heap.vbase < vend {
            self.heap = Region::new(vend, vend, RegionPerms::READ | RegionPerms::WRITE);
        }
        Ok(())
    }

    /// Pre-load hook. Idempotent no-op in this cut.
    pub fn prepare_load(&mut self) -> Result<(), Errno> {
        Ok(())
    }

    /// Post-load hook. Idempotent no-op in this cut.
    pub fn complete_load(&mut self) -> Result<(), Errno> {
        Ok(())
    }

    /// Initial user stack pointer
    pub fn define_stack(&self) -> VirtAddr {
        VirtAddr::new(USERSTACK)
    }

    /// Region containing `addr`, searching code/data, then stack, then heap
    pub(crate) fn find_region(&self, addr: VirtAddr) -> Option<&Region> {
        self.regions
            .iter()
            .find(|r| r.covers(addr))
            .or_else(|| self.stack.covers(addr).then_some(&self.stack))
            .or_else(|| self.heap.covers(addr).then_some(&self.heap))
    }

    /// Deep copy for fork.
    ///
    /// Region lists are duplicated as-is; every resident page gets a fresh
    /// frame owned by the new space and a byte-for-byte copy of its
    /// contents. On allocation failure everything acquired so far is
    /// released and the whole copy fails with ENOMEM.
    pub fn try_clone(&self) -> Result<AddressSpace, Errno> {
        let mut new = AddressSpace::new();
        new.regions = self.regions.clone();
        new.heap = self.heap;
        new.stack = self.stack;

        for entry in self.page_table.iter() {
            let mut copied = *entry;
            if entry.state == PageState::Mem && entry.phys.as_u64() != 0 {
                // Dropping `new` on the error paths returns the frames
                // copied so far.
                let phys = coremap::alloc_upages(1, new.id).ok_or(Errno::ENOMEM)?;
                let src = coremap::kvaddr_for(entry.phys).ok_or(Errno::ENOMEM)?;
                let dst = coremap::kvaddr_for(phys).ok_or(Errno::ENOMEM)?;
                // SAFETY: both aliases point at distinct whole frames inside
                // the coremap's RAM window.
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        src.as_ptr::<u8>(),
                        dst.as_mut_ptr::<u8>(),
                        PAGE_SIZE,
                    );
                }
                copied.phys = phys;
            }
            new.page_table.insert(copied);
        }
        Ok(new)
    }

    /// Make this space current: flush every TLB entry. Runs with the TLB
    /// seam the platform installed.
    pub fn activate(&self) {
        tlb::invalidate_all();
    }

    /// Counterpart of activate. Nothing to do for this design.
    pub fn deactivate(&self) {}
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AddressSpace {
    fn drop(&mut self) {
        // Return every resident frame to the coremap. Region storage is
        // plain memory and goes with the value. Freeing is permissive, so
        // this is safe even for spaces that never touched the allocator.
        for entry in self.page_table.iter() {
            if entry.state == PageState::Mem && entry.phys.as_u64() != 0 {
                coremap::free_upages(entry.phys);
            }
        }
        log::debug!("address space {:?} destroyed", self.id);
    }
}

impl core::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("id", &self.id)
            .field("regions", &self.regions.len())
            .field("heap_base", &self.heap.vbase())
            .field("resident_pages", &self.page_table.len())
            .finish()
    }
}
