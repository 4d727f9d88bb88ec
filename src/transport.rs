//! Gadget endpoint transport: a byte-stream pair over the OS HID gadget
//! file (typically `/dev/hidg0`).
//!
//! Opened `O_NONBLOCK` so a console that hasn't enumerated yet never stalls
//! a write. Readiness is exposed to the Protocol Engine through
//! `tokio::io::unix::AsyncFd` so the bounded wait on host bytes is a real
//! cancellable primitive rather than a busy-poll loop.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use tokio::io::unix::AsyncFd;

use crate::codec::REPORT_LEN;
use crate::error::BridgeError;

pub struct Transport {
    inner: AsyncFd<File>,
}

impl Transport {
    pub fn open(path: &Path) -> Result<Self, BridgeError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(BridgeError::FatalIO)?;
        let inner = AsyncFd::new(file).map_err(BridgeError::FatalIO)?;
        Ok(Self { inner })
    }

    /// Wait up to `budget` for host bytes, then attempt a single read.
    /// Returns `Ok(None)` if the budget elapses or the read is short/empty
    /// (both are ignored) -- never blocks past `budget`.
    pub async fn read_frame(
        &mut self,
        budget: Duration,
    ) -> Result<Option<[u8; REPORT_LEN]>, BridgeError> {
        let guard = match tokio::time::timeout(budget, self.inner.readable_mut()).await {
            Ok(Ok(guard)) => guard,
            Ok(Err(e)) => return Err(BridgeError::FatalIO(e)),
            Err(_elapsed) => return Ok(None),
        };
        Self::try_read(guard)
    }

    fn try_read(
        mut guard: tokio::io::unix::AsyncFdReadyMutGuard<'_, File>,
    ) -> Result<Option<[u8; REPORT_LEN]>, BridgeError> {
        let mut buf = [0u8; REPORT_LEN];
        let result = guard.try_io(|inner| inner.get_mut().read(&mut buf));
        match result {
            Ok(Ok(n)) if n == REPORT_LEN => Ok(Some(buf)),
            Ok(Ok(_short_or_empty)) => Ok(None),
            Ok(Err(e)) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Ok(Err(e)) => Err(BridgeError::FatalIO(e)),
            Err(_would_block) => Ok(None),
        }
    }

    /// Write one 64-byte frame. Transient failures (host not yet
    /// enumerated) are reported as [`BridgeError::TransientWriteUnavailable`]
    /// so the caller decides whether to drop the frame or escalate;
    /// anything else is fatal.
    pub fn write_frame(&mut self, frame: &[u8; REPORT_LEN]) -> Result<(), BridgeError> {
        match self.inner.get_mut().write_all(frame) {
            Ok(()) => Ok(()),
            Err(e) if is_transient(&e) => Err(BridgeError::TransientWriteUnavailable(e)),
            Err(e) => Err(BridgeError::FatalIO(e)),
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    matches!(
        e.raw_os_error(),
        Some(libc::EPIPE) | Some(libc::ESHUTDOWN) | Some(libc::EAGAIN)
    )
}
