/*
 * Physical Frame Allocator (coremap)
 *
 * One descriptor per physical frame, kept in a contiguous array that lives
 * inside the managed RAM itself: init() places the array at the first free
 * physical address and reserves everything below the resulting boundary.
 *
 * Allocation hands out page-aligned contiguous runs using a first-fit linear
 * scan. The first frame of a run is marked PARENT and carries the run
 * length; the rest are CHILD frames. Frames used by the kernel image, the
 * descriptor array, or anything else below the boot boundary are NO_REUSE
 * and never re-enter the free pool.
 *
 * A single spin lock serialises every allocator field. Nothing that can
 * block is done while it is held.
 */

use crate::config::PAGE_SIZE;
use crate::memory::types::{AsId, PhysAddr, VirtAddr};
use spin::Mutex;

/// Lifecycle state of one physical frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Available for allocation
    Free,
    /// In use (kernel, coremap, or an address space)
    Fixed,
}

/// Position of a frame within a multi-page allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    /// First frame of a run; `block_size` is valid here
    Parent,
    /// Follower frame of a run (also the resting role of free frames)
    Child,
}

/// Whether a frame may ever re-enter the free pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reusability {
    Reuse,
    /// Boot-reserved frames (kernel image, coremap array). Never freed.
    NoReuse,
}

/// Descriptor for one physical frame
#[derive(Debug, Clone, Copy)]
pub struct CoremapEntry {
    /// Page-aligned physical base of the frame
    pub(crate) phys: PhysAddr,
    /// Kernel direct-mapped alias of the frame
    pub(crate) kvaddr: VirtAddr,
    /// Owning address space for user frames; None for kernel/fixed pages
    pub(crate) owner: Option<AsId>,
    pub(crate) state: FrameState,
    pub(crate) role: BlockRole,
    /// Frames in this run; valid on the PARENT frame
    pub(crate) block_size: usize,
    pub(crate) reuse: Reusability,
}

/// The frame allocator proper
///
/// The descriptor array is reached through a raw pointer because it lives in
/// the managed RAM window rather than in a Rust allocation. All access goes
/// through `entry`/`entry_mut`, and the instance sits behind the module
/// lock, so there is never more than one live reference into the array.
pub struct Coremap {
    entries: *mut CoremapEntry,
    num_entries: usize,
    /// Direct-map alias of physical address 0
    kvirt_base: VirtAddr,
    ram_size: usize,
    bytes_free: usize,
}

// SAFETY: the raw entries pointer is exclusively owned by this instance and
// only dereferenced under the allocator lock.
unsafe impl Send for Coremap {}

impl Coremap {
    /// Bootstrap the allocator over a direct-mapped RAM window.
    ///
    /// `ram_base` is the kernel-virtual alias of physical address 0 and
    /// `first_free_phys` the first physical byte not occupied by the kernel
    /// image. The descriptor array is placed at `first_free_phys` and the
    /// boundary advanced past it; every frame below the boundary comes out
    /// FIXED and NO_REUSE.
    ///
    /// # Safety
    ///
    /// `ram_base..ram_base+ram_size` must be a valid, writable mapping that
    /// the caller hands over exclusively to the allocator, and
    /// `first_free_phys` must be page-aligned and inside the window.
    pub unsafe fn new(ram_base: *mut u8, ram_size: usize, first_free_phys: usize) -> Coremap {
        let num_entries = ram_size / PAGE_SIZE;
        let kvirt_base = VirtAddr::from_ptr(ram_base);

        // The descriptor array itself occupies whole pages starting at the
        // first free physical address.
        let coremap_bytes = num_entries * core::mem::size_of::<CoremapEntry>();
        let coremap_pages = (coremap_bytes + PAGE_SIZE - 1) / PAGE_SIZE;
        let boundary = first_free_phys + coremap_pages * PAGE_SIZE;
        let pages_used = boundary / PAGE_SIZE;

        // SAFETY: first_free_phys is page-aligned and inside the window, so
        // the array lands on aligned, writable memory owned by us.
        let entries = unsafe { ram_base.add(first_free_phys) } as *mut CoremapEntry;

        let mut phys = 0u64;
        for i in 0..num_entries {
            let reserved = i < pages_used;
            // SAFETY: i < num_entries and the array spans num_entries slots.
            unsafe {
                entries.add(i).write(CoremapEntry {
                    phys: PhysAddr::new(phys),
                    kvaddr: kvirt_base + phys,
                    owner: None,
                    state: if reserved { FrameState::Fixed } else { FrameState::Free },
                    role: BlockRole::Child,
                    block_size: 0,
                    reuse: if reserved { Reusability::NoReuse } else { Reusability::Reuse },
                });
            }
            phys += PAGE_SIZE as u64;
        }

        Coremap {
            entries,
            num_entries,
            kvirt_base,
            ram_size,
            bytes_free: ram_size - pages_used * PAGE_SIZE,
        }
    }

    fn entry(&self, i: usize) -> &CoremapEntry {
        debug_assert!(i < self.num_entries);
        // SAFETY: bounds checked above; exclusive access via &self borrow rules.
        unsafe { &*self.entries.add(i) }
    }

    fn entry_mut(&mut self, i: usize) -> &mut CoremapEntry {
        debug_assert!(i < self.num_entries);
        // SAFETY: bounds checked above; &mut self guarantees exclusivity.
        unsafe { &mut *self.entries.add(i) }
    }

    fn is_allocatable(&self, i: usize) -> bool {
        let e = self.entry(i);
        e.state == FrameState::Free && e.reuse == Reusability::Reuse
    }

    /// First-fit scan for `npages` contiguous allocatable frames.
    ///
    /// When a run is cut short at frame i+k the scan resumes past the
    /// obstruction rather than re-probing it. Lowest index wins.
    fn alloc(&mut self, npages: usize, owner: Option<AsId>) -> Option<PhysAddr> {
        if npages == 0 || npages * PAGE_SIZE > self.bytes_free {
            return None;
        }

        let mut i = 0;
        while i + npages <= self.num_entries {
            if !self.is_allocatable(i) {
                i += 1;
                continue;
            }
            let mut run = 0;
            while run < npages && self.is_allocatable(i + run) {
                run += 1;
            }
            if run == npages {
                let base = self.entry(i).phys;
                for n in 0..npages {
                    let e = self.entry_mut(i + n);
                    e.role = if n == 0 { BlockRole::Parent } else { BlockRole::Child };
                    e.block_size = npages;
                    e.state = FrameState::Fixed;
                    e.owner = owner;
                }
                self.bytes_free -= npages * PAGE_SIZE;
                return Some(base);
            }
            i += run + 1;
        }
        None
    }

    /// Allocate a contiguous run of kernel-owned frames, physical base
    pub fn alloc_ppages(&mut self, npages: usize) -> Option<PhysAddr> {
        self.alloc(npages, None)
    }

    /// Allocate a contiguous run, returning the kernel direct-map alias
    pub fn alloc_kpages(&mut self, npages: usize) -> Option<VirtAddr> {
        self.alloc(npages, None).map(|pa| self.kvirt_base + pa.as_u64())
    }

    /// Allocate frames on behalf of an address space
    pub fn alloc_upages(&mut self, npages: usize, owner: AsId) -> Option<PhysAddr> {
        self.alloc(npages, Some(owner))
    }

    fn free_at(&mut self, i: usize) {
        let head = *self.entry(i);
        if head.role == BlockRole::Child || head.reuse == Reusability::NoReuse {
            // Caller bug (freeing mid-run or a boot frame). The VM layer is
            // still settling, so tolerate it instead of panicking.
            log::debug!("coremap: ignoring free of frame {:#x}", head.phys.as_u64());
            return;
        }
        let npages = head.block_size;
        for n in 0..npages {
            let e = self.entry_mut(i + n);
            e.owner = None;
            e.block_size = 0;
            e.state = FrameState::Free;
            e.role = BlockRole::Child;
        }
        self.bytes_free += npages * PAGE_SIZE;
    }

    /// Release the run whose kernel alias starts at `kvaddr`.
    ///
    /// Unknown, unaligned, CHILD, or NO_REUSE addresses are ignored.
    pub fn free_kpages(&mut self, kvaddr: VirtAddr) {
        if kvaddr < self.kvirt_base {
            return;
        }
        let off = kvaddr - self.kvirt_base;
        let i = (off / PAGE_SIZE as u64) as usize;
        if i >= self.num_entries || self.entry(i).kvaddr != kvaddr {
            return;
        }
        self.free_at(i);
    }

    /// Release the run whose physical base is `phys` (user-frame variant)
    pub fn free_upages(&mut self, phys: PhysAddr) {
        let i = (phys.as_u64() / PAGE_SIZE as u64) as usize;
        if i >= self.num_entries || self.entry(i).phys != phys {
            return;
        }
        self.free_at(i);
    }

    /// Bytes currently reserved, including the boot boundary
    pub fn used_bytes(&self) -> usize {
        self.ram_size - self.bytes_free
    }

    /// Bytes still allocatable
    pub fn bytes_free(&self) -> usize {
        self.bytes_free
    }

    /// Total frames under management
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Kernel direct-map alias for a physical address inside the window
    pub fn kvaddr_for(&self, phys: PhysAddr) -> Option<VirtAddr> {
        if (phys.as_u64() as usize) < self.ram_size {
            Some(self.kvirt_base + phys.as_u64())
        } else {
            None
        }
    }

    /// Snapshot of one descriptor, for diagnostics and tests
    pub fn frame_at(&self, i: usize) -> Option<CoremapEntry> {
        if i < self.num_entries { Some(*self.entry(i)) } else { None }
    }
}

/// The kernel-wide allocator instance
static COREMAP: Mutex<Option<Coremap>> = Mutex::new(None);

/// Install the global coremap. Called exactly once during boot, before any
/// other VM call.
///
/// # Safety
///
/// Same contract as [`Coremap::new`]; additionally the caller must not call
/// this twice.
pub unsafe fn init(ram_base: *mut u8, ram_size: usize, first_free_phys: usize) {
    let map = unsafe { Coremap::new(ram_base, ram_size, first_free_phys) };
    log::info!(
        "coremap: managing {} frames, {} KiB reserved at boot",
        map.num_entries(),
        map.used_bytes() / 1024
    );
    *COREMAP.lock() = Some(map);
}

/// Whether the boot-time init has run
pub fn is_initialized() -> bool {
    COREMAP.lock().is_some()
}

fn with<R>(f: impl FnOnce(&mut Coremap) -> R) -> Option<R> {
    COREMAP.lock().as_mut().map(f)
}

/// Allocate `npages` contiguous frames; physical base or None
pub fn alloc_ppages(npages: usize) -> Option<PhysAddr> {
    with(|m| m.alloc_ppages(npages)).flatten()
}

/// Allocate `npages` contiguous frames; kernel direct-map alias or None
pub fn alloc_kpages(npages: usize) -> Option<VirtAddr> {
    with(|m| m.alloc_kpages(npages)).flatten()
}

/// Allocate `npages` contiguous frames owned by address space `owner`
pub fn alloc_upages(npages: usize, owner: AsId) -> Option<PhysAddr> {
    with(|m| m.alloc_upages(npages, owner)).flatten()
}

/// Release a kernel allocation by its direct-map alias (permissive)
pub fn free_kpages(kvaddr: VirtAddr) {
    with(|m| m.free_kpages(kvaddr));
}

/// Release a user allocation by its physical base (permissive)
pub fn free_upages(phys: PhysAddr) {
    with(|m| m.free_upages(phys));
}

/// RAM size minus bytes free; 0 before init
pub fn used_bytes() -> usize {
    with(|m| m.used_bytes()).unwrap_or(0)
}

/// Direct-map alias of `phys`, or None before init / out of range
pub fn kvaddr_for(phys: PhysAddr) -> Option<VirtAddr> {
    with(|m| m.kvaddr_for(phys)).flatten()
}

/// Copy of the descriptor for frame `i`, for diagnostics and tests
pub fn snapshot_frame(i: usize) -> Option<CoremapEntry> {
    with(|m| m.frame_at(i)).flatten()
}
