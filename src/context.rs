use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

use crate::config::{DEFAULT_SOCKET_BUFFER_SIZE, MAX_SOCKETS};
use crate::socket::SocketHandle;

/// Returned when an append would exceed the per-socket capacity. Nothing was
/// copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFull {
    pub fill: usize,
    pub incoming: usize,
}

struct SocketBuffer<const N: usize> {
    data: Vec<u8, N>,
}

impl<const N: usize> SocketBuffer<N> {
    const EMPTY: Self = Self { data: Vec::new() };
}

/// Per-modem store for direct-push payloads.
///
/// The ingestion task appends, the socket read path drains. Every access
/// takes the lock for the span of one copy only; no callback ever runs under
/// it.
pub struct ModuleContext<M: RawMutex, const BUF: usize = DEFAULT_SOCKET_BUFFER_SIZE> {
    buffers: Mutex<M, RefCell<[SocketBuffer<BUF>; MAX_SOCKETS]>>,
}

impl<M: RawMutex, const BUF: usize> Default for ModuleContext<M, BUF> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const BUF: usize> ModuleContext<M, BUF> {
    pub const fn new() -> Self {
        Self {
            buffers: Mutex::new(RefCell::new([SocketBuffer::<BUF>::EMPTY; MAX_SOCKETS])),
        }
    }

    /// Capacity of each socket buffer.
    pub const fn capacity(&self) -> usize {
        BUF
    }

    /// Append a complete payload. Either all of `data` is stored or none of
    /// it is; on success the new fill length is returned.
    pub(crate) fn append(&self, socket: SocketHandle, data: &[u8]) -> Result<usize, BufferFull> {
        self.buffers.lock(|b| {
            let buf = &mut b.borrow_mut()[socket.index()];
            let fill = buf.data.len();
            if fill + data.len() > BUF {
                return Err(BufferFull {
                    fill,
                    incoming: data.len(),
                });
            }
            buf.data
                .extend_from_slice(data)
                .map_err(|_| BufferFull {
                    fill,
                    incoming: data.len(),
                })?;
            Ok(buf.data.len())
        })
    }

    /// Number of buffered bytes waiting to be read for `socket`.
    pub fn available(&self, socket: SocketHandle) -> usize {
        self.buffers
            .lock(|b| b.borrow()[socket.index()].data.len())
    }

    /// Move up to `out.len()` of the oldest buffered bytes into `out`.
    pub fn read(&self, socket: SocketHandle, out: &mut [u8]) -> usize {
        self.buffers.lock(|b| {
            let buf = &mut b.borrow_mut()[socket.index()];
            let len = buf.data.len();
            let n = len.min(out.len());
            out[..n].copy_from_slice(&buf.data[..n]);
            buf.data.copy_within(n..len, 0);
            buf.data.truncate(len - n);
            n
        })
    }

    /// Drop everything buffered for `socket`.
    pub fn clear(&self, socket: SocketHandle) {
        self.buffers
            .lock(|b| b.borrow_mut()[socket.index()].data.clear());
    }

    /// Run `f` over the buffered bytes of `socket` without draining them.
    pub fn peek<R>(&self, socket: SocketHandle, f: impl FnOnce(&[u8]) -> R) -> R {
        self.buffers.lock(|b| f(b.borrow()[socket.index()].data.as_slice()))
    }
}
