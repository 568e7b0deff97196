/*
 * Platform Configuration
 *
 * Central place for the platform constants the kernel core is parameterised
 * on. The values mirror the reference port; an embedding kernel may tune
 * them, but every subsystem reads them from here so they stay consistent.
 */

/// Size of one page / physical frame in bytes (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// log2(PAGE_SIZE), for address <-> page-number conversion
pub const PAGE_SHIFT: u64 = 12;

/// Mask selecting the page-aligned part of an address
pub const PAGE_FRAME: u64 = !(PAGE_SIZE as u64 - 1);

/// Top of the user stack. The stack region grows down from here.
pub const USERSTACK: u64 = 0x8000_0000;

/// Pages reserved for the user stack region
pub const STACK_PAGES: usize = 1024;

/// First byte that is no longer user-accessible. Pointers at or above this
/// are rejected by the user-memory copy routines.
pub const USER_SPACE_TOP: u64 = 0x0000_8000_0000_0000;

/// Maximum open file descriptors per process (slots 0-2 are stdio)
pub const OPEN_MAX: usize = 128;

/// Longest path accepted from user space, including the terminator
pub const PATH_MAX: usize = 1024;

/// Highest process id ever handed out. Pid 1 is the kernel placeholder,
/// user pids start at 2.
pub const PID_MAX: i32 = 255;

/// Maximum number of live processes in the table at once
pub const PROC_MAX: usize = 128;

/// Number of TLB slots on the reference MMU
pub const NUM_TLB: usize = 64;
