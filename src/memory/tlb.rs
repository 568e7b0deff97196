/*
 * TLB Seam
 *
 * The TLB itself is hardware owned by the embedding kernel; this module
 * only defines the two operations the VM core needs and a registration
 * point for the platform's implementation. Until one is installed both
 * operations are no-ops, which is exactly right for hosted test builds.
 */

use spin::RwLock;

/// Operations the VM core performs on the translation buffer
pub trait TlbOps: Send + Sync {
    /// Map `vpn` to `pfn` in one TLB slot
    fn load(&self, vpn: u64, pfn: u64);

    /// Drop every entry. Called on address-space switch, with interrupts
    /// raised by the platform implementation.
    fn invalidate_all(&self);
}

static TLB: RwLock<Option<&'static dyn TlbOps>> = RwLock::new(None);

/// Install the platform TLB implementation. Called once at boot.
pub fn set_handler(ops: &'static dyn TlbOps) {
    *TLB.write() = Some(ops);
}

/// Load one translation, if a handler is installed
pub fn load(vpn: u64, pfn: u64) {
    if let Some(ops) = *TLB.read() {
        ops.load(vpn, pfn);
    }
}

/// Invalidate every slot, if a handler is installed
pub fn invalidate_all() {
    if let Some(ops) = *TLB.read() {
        ops.invalidate_all();
    }
}
