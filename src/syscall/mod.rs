/*
 * System Call Dispatch
 *
 * The trap glue saves the user registers into a TrapFrame, reads the call
 * number and arguments out of it, and calls dispatch(). The return value
 * goes back in RAX; negative values are errno codes. SYS_EXIT never
 * returns.
 *
 * The hardware entry stub (MSR setup, swapgs, stack switch) belongs to the
 * embedding kernel; this module starts where the registers are already
 * saved.
 */

pub mod handlers;
pub mod numbers;

use crate::errno::Errno;
use crate::process::TrapFrame;
use numbers::*;

/// Route one system call.
///
/// `args` are the six ABI argument registers in order (RDI, RSI, RDX, R10,
/// R8, R9); `frame` is the caller's saved state, which fork duplicates.
pub fn dispatch(num: usize, args: [u64; 6], frame: &TrapFrame) -> isize {
    match num {
        SYS_READ => handlers::sys_read(args[0] as i32, args[1] as *mut u8, args[2] as usize),
        SYS_WRITE => handlers::sys_write(args[0] as i32, args[1] as *const u8, args[2] as usize),
        SYS_OPEN => handlers::sys_open(args[0] as *const u8, args[1] as u32, args[2] as u32),
        SYS_CLOSE => handlers::sys_close(args[0] as i32),
        SYS_LSEEK => handlers::sys_lseek(args[0] as i32, args[1] as i64, args[2] as *const i32),
        SYS_DUP2 => handlers::sys_dup2(args[0] as i32, args[1] as i32),
        SYS_GETPID => handlers::sys_getpid(),
        SYS_FORK => handlers::sys_fork(frame),
        SYS_EXIT => handlers::sys_exit(args[0] as i32),
        SYS_WAITPID => handlers::sys_waitpid(args[0] as i32, args[1] as *mut i32, args[2] as i32),
        SYS_GETCWD => handlers::sys_getcwd(args[0] as *mut u8, args[1] as usize),
        SYS_CHDIR => handlers::sys_chdir(args[0] as *const u8),
        _ => {
            log::debug!("unknown syscall {}", num);
            Errno::ENOSYS.as_isize()
        }
    }
}
