use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::{TagResult, TransportError};
use crate::events::Notification;

use super::ModuleId;

/// Receiving end of one module's notifications.
///
/// Messages arrive already encoded; the `recv*` methods decode them. The
/// stream reports disconnection once the transport forgets the module and
/// every queued message has been drained.
#[derive(Debug)]
pub struct NotificationStream {
    module: ModuleId,
    rx: Receiver<Vec<u8>>,
}

impl NotificationStream {
    pub(crate) fn new(module: ModuleId, rx: Receiver<Vec<u8>>) -> Self {
        Self { module, rx }
    }

    /// The module this stream belongs to.
    #[must_use]
    pub const fn module(&self) -> ModuleId {
        self.module
    }

    /// Number of messages waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no message is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Receive the next encoded message (blocking).
    pub fn recv_raw(&self) -> TagResult<Vec<u8>> {
        self.rx.recv().map_err(|_| self.disconnected().into())
    }

    /// Receive the next notification (blocking).
    pub fn recv(&self) -> TagResult<Notification> {
        let raw = self.recv_raw()?;
        Ok(Notification::decode(&raw)?)
    }

    /// Receive the next notification with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> TagResult<Notification> {
        let raw = self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TransportError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            },
            RecvTimeoutError::Disconnected => self.disconnected(),
        })?;
        Ok(Notification::decode(&raw)?)
    }

    /// Receive a notification if one is waiting.
    pub fn try_recv(&self) -> TagResult<Option<Notification>> {
        match self.rx.try_recv() {
            Ok(raw) => Ok(Some(Notification::decode(&raw)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.disconnected().into()),
        }
    }

    /// Drain every waiting notification.
    pub fn drain(&self) -> TagResult<Vec<Notification>> {
        let mut out = Vec::with_capacity(self.rx.len());
        while let Some(n) = self.try_recv()? {
            out.push(n);
        }
        Ok(out)
    }

    fn disconnected(&self) -> TransportError {
        TransportError::Disconnected {
            path: format!("notification_stream_{}", self.module),
        }
    }
}
