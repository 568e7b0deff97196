/*
 * Process Table
 *
 * The kernel-wide registry of live processes, indexed by pid. Pids are
 * handed out from a counter starting at 2 (pid 1 is the kernel placeholder
 * and reparent target) and recycled through a freelist stack when a process
 * is reaped.
 *
 * One mutex guards the table; per-process state has its own lock, and the
 * table lock is never held while waiting on one.
 */

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use heapless::Vec as FixedVec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::config::{PID_MAX, PROC_MAX};
use crate::errno::Errno;
use crate::process::{KERNEL_PID, Process, ProcessId};
use crate::sync::Semaphore;

/// First pid handed to a user process
const FIRST_USER_PID: i32 = 2;

/// The registry proper
pub struct ProcessTable {
    procs: BTreeMap<i32, Arc<Process>>,
    next_pid: i32,
    free_pids: FixedVec<i32, PROC_MAX>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            procs: BTreeMap::new(),
            next_pid: FIRST_USER_PID,
            free_pids: FixedVec::new(),
        }
    }

    fn alloc_pid(&mut self) -> Result<ProcessId, Errno> {
        if self.procs.len() >= PROC_MAX {
            return Err(Errno::ENOMEM);
        }
        if let Some(pid) = self.free_pids.pop() {
            return Ok(ProcessId(pid));
        }
        if self.next_pid > PID_MAX {
            return Err(Errno::ENOMEM);
        }
        let pid = self.next_pid;
        self.next_pid += 1;
        Ok(ProcessId(pid))
    }

    /// Allocate a pid and insert a fresh process under it
    pub fn create(&mut self, name: &str) -> Result<Arc<Process>, Errno> {
        let pid = self.alloc_pid()?;
        let proc = Process::new(pid, name);
        self.procs.insert(pid.0, proc.clone());
        log::debug!("process table: created pid {} ({})", pid.0, name);
        Ok(proc)
    }

    pub fn lookup(&self, pid: ProcessId) -> Option<Arc<Process>> {
        self.procs.get(&pid.0).cloned()
    }

    /// Drop the entry for `pid` and recycle the pid
    pub fn remove(&mut self, pid: ProcessId) -> Option<Arc<Process>> {
        let proc = self.procs.remove(&pid.0)?;
        // A full freelist just retires the pid; the counter has already
        // moved past it.
        let _ = self.free_pids.push(pid.0);
        Some(proc)
    }

    /// Number of live processes whose parent is `parent`
    pub fn child_count(&self, parent: ProcessId) -> usize {
        self.procs
            .values()
            .filter(|p| p.state().lock().ppid == parent)
            .count()
    }

    /// Hand every child of `parent` to the kernel placeholder (pid 1)
    pub fn reparent_children(&self, parent: ProcessId) {
        for proc in self.procs.values() {
            let mut state = proc.state().lock();
            if state.ppid == parent {
                state.ppid = KERNEL_PID;
                log::debug!("pid {} reparented to {}", proc.pid().0, KERNEL_PID.0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// The kernel-wide table instance
    static ref PROCESS_TABLE: Mutex<ProcessTable> = Mutex::new(ProcessTable::new());
}

/// Signalled on every process exit so a supervisor can wait for the system
/// to quiesce
static EXIT_SEM: Semaphore = Semaphore::new(0);

/// Create a process in the global table
pub fn create(name: &str) -> Result<Arc<Process>, Errno> {
    PROCESS_TABLE.lock().create(name)
}

/// Find a process by pid
pub fn lookup(pid: ProcessId) -> Option<Arc<Process>> {
    PROCESS_TABLE.lock().lookup(pid)
}

/// Reap a process: remove its entry and recycle the pid
pub fn remove(pid: ProcessId) -> Option<Arc<Process>> {
    PROCESS_TABLE.lock().remove(pid)
}

/// Reparent every child of `parent` to pid 1
pub fn reparent_children(parent: ProcessId) {
    PROCESS_TABLE.lock().reparent_children(parent);
}

/// Number of live processes
pub fn process_count() -> usize {
    PROCESS_TABLE.lock().len()
}

/// Number of live children of `parent`
pub fn child_count(parent: ProcessId) -> usize {
    PROCESS_TABLE.lock().child_count(parent)
}

/// Post one exit notification
pub fn signal_exit() {
    EXIT_SEM.signal();
}

/// Consume one exit notification, blocking until a process exits
pub fn wait_for_any_exit() {
    EXIT_SEM.wait();
}
