/*
 * Osprey Kernel Core
 *
 * The machine-independent heart of the Osprey teaching kernel: physical
 * frame allocation, per-process address spaces, the VM fault path, the file
 * descriptor layer, and the process table with fork/exit/waitpid.
 *
 * The crate is a library. The embedding kernel binary owns boot, drivers,
 * the console, the trap stubs, and the thread system, and wires itself in
 * through the seams exposed here:
 *
 *  - memory::init(ram_base, ram_size, first_free_phys) once RAM is known
 *  - memory::tlb::set_handler() with the platform TLB operations
 *  - vfs::mount_root() with the root filesystem
 *  - vfs::console::set_sink() with the console output path
 *  - thread::set_host() with the thread system
 *  - process::set_current_pid_hook() with the per-CPU current lookup
 *  - syscall::dispatch() from the trap entry
 *
 * Hosted builds (cargo test) use the same seams: the test harness in
 * src/tests stands in for boot.
 */

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod errno;
pub mod io;
pub mod memory;
pub mod process;
pub mod sync;
pub mod syscall;
pub mod thread;
pub mod vfs;

#[cfg(test)]
mod tests;
