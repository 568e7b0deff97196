/*
 * Current Process Hook
 *
 * Which process a kernel path runs on behalf of is decided by the thread
 * system (per-CPU state in the real kernel, a thread-local in the test
 * harness). The hook installed here answers that question; before boot
 * wires it up there is no current process, which the callers treat as the
 * early-boot case.
 */

use alloc::sync::Arc;
use spin::RwLock;

use crate::process::{Process, ProcessId, table};

/// Resolver for the calling thread's process id
pub type CurrentPidFn = fn() -> Option<ProcessId>;

static CURRENT_PID: RwLock<Option<CurrentPidFn>> = RwLock::new(None);

/// Install the resolver. Called once when the thread system comes up.
pub fn set_current_pid_hook(hook: CurrentPidFn) {
    *CURRENT_PID.write() = Some(hook);
}

/// Pid of the calling thread's process, if any
pub fn current_pid() -> Option<ProcessId> {
    (*CURRENT_PID.read())?()
}

/// The calling thread's process, if it is still in the table
pub fn current() -> Option<Arc<Process>> {
    table::lookup(current_pid()?)
}
