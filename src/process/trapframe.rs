/*
 * Trap Frame
 *
 * The register state saved at user->kernel entry, in the order the trap
 * stub pushes it: general-purpose registers first, then the frame the CPU
 * pushes itself. The trap layer owns save/restore; this module only knows
 * the layout and how to derive the frame a forked child resumes with.
 */

/// Frame pushed by the CPU on a trap
///
/// The #[repr(C)] ensures the struct layout matches what the CPU pushes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub rip: u64,    // Instruction pointer - where to resume execution
    pub cs: u64,     // Code segment selector
    pub rflags: u64, // CPU flags register
    pub rsp: u64,    // Stack pointer before the trap
    pub ss: u64,     // Stack segment selector
}

impl Default for InterruptFrame {
    fn default() -> Self {
        Self {
            rip: 0,
            cs: 0x1b,      // User code segment
            rflags: 0x202, // IF=1 (interrupts enabled), reserved bit 1 always set
            rsp: 0,
            ss: 0x23,      // User data segment
        }
    }
}

/// Complete saved register state of a user thread
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapFrame {
    // General purpose registers (pushed by the trap stub)
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,

    // Frame pushed automatically by the CPU
    pub frame: InterruptFrame,
}

impl TrapFrame {
    /// Length of the syscall instruction; the child resumes just past it
    pub const SYSCALL_INSN_LEN: u64 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    /// Syscall return value slot
    pub fn set_return_value(&mut self, value: u64) {
        self.rax = value;
    }

    /// The frame a forked child starts from: identical to the parent's at
    /// the fork syscall, except fork returns 0 in the child and execution
    /// resumes at the instruction after the syscall.
    pub fn for_fork_child(&self) -> TrapFrame {
        let mut child = *self;
        child.rax = 0;
        child.frame.rip = child.frame.rip.wrapping_add(Self::SYSCALL_INSN_LEN);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_child_frame() {
        let mut parent = TrapFrame::new();
        parent.rax = 57;
        parent.rbx = 7;
        parent.frame.rip = 0x40_1000;
        let child = parent.for_fork_child();
        assert_eq!(child.rax, 0);
        assert_eq!(child.rbx, 7);
        assert_eq!(child.frame.rip, 0x40_1000 + TrapFrame::SYSCALL_INSN_LEN);
        // Parent frame untouched
        assert_eq!(parent.rax, 57);
        assert_eq!(parent.frame.rip, 0x40_1000);
    }
}
