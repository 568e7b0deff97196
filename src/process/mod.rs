/*
 * Process Abstraction and Lifecycle
 *
 * A process is the container for an address space and a file descriptor
 * table, plus the identity and exit bookkeeping waitpid needs. Threads are
 * one-to-one with processes and owned by the embedding thread system; this
 * module only coordinates fork/exit/waitpid across that seam.
 *
 * Exit is a one-shot handshake: the exiting process records its encoded
 * status under its lock, broadcasts its exit event, and any waiter then
 * reads the status and reaps the table entry.
 */

pub mod current;
pub mod table;
pub mod trapframe;

pub use current::{current, current_pid, set_current_pid_hook};
pub use trapframe::{InterruptFrame, TrapFrame};

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use spin::Mutex;

use crate::config::PID_MAX;
use crate::errno::Errno;
use crate::io::fd::FileTable;
use crate::io::usercopy;
use crate::memory::AddressSpace;
use crate::sync::Event;
use crate::thread;

/// Unique identifier for a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub i32);

/// The kernel/init placeholder pid; orphans are handed to it
pub const KERNEL_PID: ProcessId = ProcessId(1);

/// Mutable identity and exit state, guarded by the process lock
#[derive(Debug, Clone, Copy)]
pub struct ProcState {
    pub ppid: ProcessId,
    pub exited: bool,
    /// Encoded wait status; meaningful once `exited` is set
    pub exit_code: i32,
}

/// A process: pid, parent link, owned address space, descriptor table
///
/// Lives behind an Arc so waiters can hold the exit rendezvous while the
/// table entry comes and goes.
pub struct Process {
    pid: ProcessId,
    name: String,
    state: Mutex<ProcState>,
    exit_event: Event,
    files: Mutex<FileTable>,
    addrspace: Mutex<Option<AddressSpace>>,
}

impl Process {
    /// Fresh process with an empty descriptor table and no address space.
    /// The caller decides both (fork shares the parent's; boot wires the
    /// console).
    pub fn new(pid: ProcessId, name: &str) -> Arc<Process> {
        Arc::new(Process {
            pid,
            name: String::from(name),
            state: Mutex::new(ProcState {
                ppid: KERNEL_PID,
                exited: false,
                exit_code: 0,
            }),
            exit_event: Event::new(),
            files: Mutex::new(FileTable::new()),
            addrspace: Mutex::new(None),
        })
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &Mutex<ProcState> {
        &self.state
    }

    pub fn exit_event(&self) -> &Event {
        &self.exit_event
    }

    pub fn files(&self) -> &Mutex<FileTable> {
        &self.files
    }

    pub fn addrspace(&self) -> &Mutex<Option<AddressSpace>> {
        &self.addrspace
    }

    pub fn has_exited(&self) -> bool {
        self.state.lock().exited
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Process")
            .field("pid", &self.pid.0)
            .field("name", &self.name)
            .field("ppid", &state.ppid.0)
            .field("exited", &state.exited)
            .finish()
    }
}

// Wait-status encoding. An 8-bit exit code sits above two tag bits; tag 0
// means a plain exit.

/// Pack an exit code into a wait status
pub const fn mkwait_exit(code: i32) -> i32 {
    (code & 0xff) << 2
}

/// Whether the status describes a plain exit
pub const fn wifexited(status: i32) -> bool {
    status & 0x3 == 0
}

/// Recover the exit code from a wait status
pub const fn wexitstatus(status: i32) -> i32 {
    (status >> 2) & 0xff
}

/// Pid of the calling process
pub fn getpid() -> Result<i32, Errno> {
    current_pid().map(|pid| pid.0).ok_or(Errno::ESRCH)
}

/// Create a child duplicating the calling process.
///
/// The child gets a deep copy of the address space, shares every file
/// handle by reference, and is handed to the thread system with an owned
/// copy of the parent's trap frame arranged to return 0. The parent gets
/// the child pid. Any failure unwinds the child and reports ENOMEM (or the
/// seam's error).
pub fn fork(parent_frame: &TrapFrame) -> Result<ProcessId, Errno> {
    let parent = current().ok_or(Errno::ESRCH)?;
    let child = table::create(parent.name())?;
    child.state().lock().ppid = parent.pid();

    let child_space = {
        let parent_space = parent.addrspace().lock();
        match parent_space.as_ref() {
            Some(space) => match space.try_clone() {
                Ok(copy) => Some(copy),
                Err(e) => {
                    table::remove(child.pid());
                    return Err(e);
                }
            },
            None => None,
        }
    };
    *child.addrspace().lock() = child_space;

    // Every slot shared by reference; the handles' counts now include the
    // child's table.
    *child.files().lock() = parent.files().lock().share();

    let frame = Box::new(parent_frame.for_fork_child());
    if let Err(e) = thread::spawn_user(child.pid(), frame) {
        table::remove(child.pid());
        return Err(e);
    }

    log::info!("pid {} forked child {}", parent.pid().0, child.pid().0);
    Ok(child.pid())
}

/// Wait for `pid` to exit, store its encoded status through `status`, and
/// reap it.
///
/// Any process may wait on any other; kinship is not enforced in this cut.
pub fn waitpid(pid: i32, status: *mut i32, options: i32) -> Result<i32, Errno> {
    if pid < 0 || pid > PID_MAX {
        return Err(Errno::ESRCH);
    }
    if options != 0 {
        return Err(Errno::EINVAL);
    }
    if current_pid() == Some(ProcessId(pid)) {
        return Err(Errno::ECHILD);
    }
    let target = table::lookup(ProcessId(pid)).ok_or(Errno::ESRCH)?;

    // Probe the status slot before blocking so a bad pointer fails fast.
    usercopy::copy_out(0i32, status)?;

    target.exit_event().wait();
    let code = target.state().lock().exit_code;
    usercopy::copy_out(code, status)?;

    table::remove(target.pid());
    log::debug!("pid {} reaped with status {:#x}", pid, code);
    Ok(pid)
}

/// Exit bookkeeping for the calling process: reparent children to pid 1,
/// record the encoded status, release waiters, and post the quiesce
/// semaphore. The caller (the trap layer) terminates the thread afterwards.
pub fn exit_current(code: i32) {
    let Some(me) = current() else {
        log::error!("exit with no current process");
        return;
    };

    table::reparent_children(me.pid());

    {
        let mut state = me.state().lock();
        state.exit_code = mkwait_exit(code);
        state.exited = true;
    }
    me.exit_event().broadcast();
    table::signal_exit();
    log::debug!("pid {} exited with code {}", me.pid().0, code);
}
