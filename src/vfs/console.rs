/*
 * Console Device
 *
 * Character-device node wired to descriptors 0-2 of every process. Output
 * goes to a sink the platform installs (UART, framebuffer terminal, or a
 * test capture buffer); input returns end-of-file until a line discipline
 * exists. The node is not seekable.
 */

use alloc::sync::Arc;
use spin::RwLock;

use crate::errno::Errno;
use crate::vfs::{S_IFCHR, Stat, Vnode};

/// Receives every byte written to the console
pub type ConsoleSink = fn(&[u8]);

static SINK: RwLock<Option<ConsoleSink>> = RwLock::new(None);

/// Install the console output sink. Bytes written before this are dropped.
pub fn set_sink(sink: ConsoleSink) {
    *SINK.write() = Some(sink);
}

/// The console vnode
#[derive(Debug)]
pub struct Console;

impl Console {
    pub fn new() -> Arc<Console> {
        Arc::new(Console)
    }
}

impl Vnode for Console {
    fn read_at(&self, _buf: &mut [u8], _offset: u64) -> Result<usize, Errno> {
        // No input path yet.
        Ok(0)
    }

    fn write_at(&self, buf: &[u8], _offset: u64) -> Result<usize, Errno> {
        if let Some(sink) = *SINK.read() {
            sink(buf);
        }
        Ok(buf.len())
    }

    fn stat(&self) -> Stat {
        Stat {
            st_mode: S_IFCHR | 0o666,
            st_size: 0,
            st_blksize: 1,
            st_blocks: 0,
        }
    }

    fn is_seekable(&self) -> bool {
        false
    }
}
