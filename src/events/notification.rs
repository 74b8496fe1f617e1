//! Event notification messages.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! [len u32][EVENT_FLAG | kind u32][tag index u32][event id u32][data ...]
//! ```
//!
//! `len` counts the bytes after the first eight, so it is `8 + data.len()`.

use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, TagResult, TransportError};
use crate::handle::TagIndex;
use crate::transport::{ModuleId, Transport};

use super::event::EventId;
use super::kind::EventKind;

/// Marks a message as an event notification.
pub const EVENT_FLAG: u32 = 0x8000_0000;

/// Bytes before the payload.
pub const HEADER_LEN: usize = 16;

/// One fired event.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub index: TagIndex,
    pub id: EventId,
    pub kind: EventKind,
    /// Current bytes of the event range when the event asks for them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl Notification {
    /// Size of the encoded message.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.data.len()
    }

    /// Encode, refusing messages larger than `max_size`.
    pub fn encode(&self, max_size: usize) -> TagResult<Vec<u8>> {
        let size = self.encoded_len();
        let len = u32::try_from(size - 8).ok().filter(|_| size <= max_size);
        let Some(len) = len else {
            return Err(ExecutionError::MessageTooBig {
                size,
                max: max_size,
            }
            .into());
        };
        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&(EVENT_FLAG | self.kind.code()).to_be_bytes());
        buf.extend_from_slice(&self.index.get().to_be_bytes());
        buf.extend_from_slice(&self.id.get().to_be_bytes());
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }

    /// Decode one complete message.
    pub fn decode(buf: &[u8]) -> Result<Self, TransportError> {
        let word = |at: usize| -> Result<u32, TransportError> {
            buf.get(at..at + 4)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_be_bytes)
                .ok_or_else(|| malformed(format!("message of {} bytes is too short", buf.len())))
        };
        let len = word(0)? as usize;
        let tag = word(4)?;
        let index = word(8)?;
        let id = word(12)?;
        if len + 8 != buf.len() {
            return Err(malformed(format!(
                "length field {len} does not match {} message bytes",
                buf.len()
            )));
        }
        if tag & EVENT_FLAG == 0 {
            return Err(malformed(format!("message tag {tag:#010x} is not an event")));
        }
        let kind = EventKind::from_code(tag & !EVENT_FLAG)
            .ok_or_else(|| malformed(format!("unknown event kind {:#x}", tag & !EVENT_FLAG)))?;
        Ok(Self {
            index: TagIndex::new(index),
            id: EventId::new(id),
            kind,
            data: buf[HEADER_LEN..].to_vec(),
        })
    }
}

fn malformed(reason: String) -> TransportError {
    TransportError::Malformed { reason }
}

/// Encodes notifications and hands them to the transport.
#[derive(Clone, Copy)]
pub(crate) struct Notifier<'a> {
    pub(crate) transport: &'a dyn Transport,
    pub(crate) max_message_size: usize,
}

impl Notifier<'_> {
    /// Deliver `note` to `module`. Failures are logged and reported as
    /// `false`; they never propagate into the write that caused them.
    pub(crate) fn deliver(&self, module: ModuleId, note: &Notification) -> bool {
        let result = note
            .encode(self.max_message_size)
            .and_then(|msg| self.transport.send(module, &msg).map_err(Into::into));
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    module = %module,
                    tag = %note.index,
                    event = %note.id,
                    error = %err,
                    "event notification not delivered"
                );
                false
            }
        }
    }
}
