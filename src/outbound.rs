// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    borrow::Cow,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use strum::{Display, EnumString};
use thiserror::Error;

use crate::{EndpointId, SHORT_MESSAGE_MAX_LEN, SYSEX_START};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("not open")]
    NotOpen,
    #[error("empty message")]
    Empty,
    #[error("unsupported direction")]
    UnsupportedDirection,
    #[error("send failed: {msg}")]
    SendFailed { msg: Cow<'static, str> },
}

/// Native transport for an outbound message.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Blocking send, scheduled immediately.
    Sync,
    /// Fire-and-forget send of a system-exclusive message.
    AsyncSysex,
}

/// Selects the [`Transport`] for outbound messages.
#[derive(Debug, Display, EnumString, Clone, Copy, Default, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum TransportPolicy {
    /// Messages longer than 3 bytes are sent as sysex, regardless
    /// of their content.
    #[default]
    LengthHeuristic,
    /// Only messages that start with the sysex status byte are sent as sysex.
    StatusByte,
}

impl TransportPolicy {
    #[must_use]
    pub fn select(self, bytes: &[u8]) -> Transport {
        let sysex = match self {
            Self::LengthHeuristic => bytes.len() > SHORT_MESSAGE_MAX_LEN,
            Self::StatusByte => bytes.first() == Some(&SYSEX_START),
        };
        if sysex {
            Transport::AsyncSysex
        } else {
            Transport::Sync
        }
    }
}

/// A pending outbound message.
///
/// Owns the message buffer until the request is completed.
#[derive(Debug)]
pub struct OutboundRequest {
    pub destination: EndpointId,
    pub bytes: Vec<u8>,
    pub transport: Transport,
}

impl OutboundRequest {
    /// Finish the request and release the buffer.
    ///
    /// Invoked by the native layer on an arbitrary thread. Failures are
    /// only reported, the sender has already returned.
    pub fn complete(self, result: Result<(), SendError>) {
        let Self {
            destination,
            bytes,
            transport,
        } = self;
        match result {
            Ok(()) => {
                log::trace!(
                    "Sent {len} byte(s) to endpoint {destination} ({transport})",
                    len = bytes.len()
                );
            }
            Err(err) => {
                log::warn!(
                    "Failed to send {len} byte(s) to endpoint {destination} ({transport}): {err}",
                    len = bytes.len()
                );
            }
        }
    }
}

/// Native output resources of an open session.
pub trait OutputConnection: Send {
    /// Send a short message immediately.
    fn send_now(&mut self, bytes: &[u8]) -> Result<(), SendError>;

    /// Dispatch a sysex message without waiting for the transmission.
    ///
    /// The implementation must eventually [complete](OutboundRequest::complete)
    /// the request, even after the connection has been closed.
    fn send_sysex(&mut self, request: OutboundRequest);

    /// Release the connection, the port, and the client in this order.
    fn close(self: Box<Self>);
}

pub type BoxedOutputConnection = Box<dyn OutputConnection + 'static>;

pub(crate) struct OpenedOutput {
    pub(crate) connection: BoxedOutputConnection,
    pub(crate) opened_at: Instant,
}

/// Sends messages to a single native destination.
///
/// Sending is serialized with opening and closing the session.
#[allow(missing_debug_implementations)]
pub struct OutboundSender {
    destination: EndpointId,
    transport_policy: TransportPolicy,
    opened: Mutex<Option<OpenedOutput>>,
}

impl OutboundSender {
    pub(crate) const fn new(destination: EndpointId, transport_policy: TransportPolicy) -> Self {
        Self {
            destination,
            transport_policy,
            opened: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn destination(&self) -> EndpointId {
        self.destination
    }

    #[must_use]
    pub const fn transport_policy(&self) -> TransportPolicy {
        self.transport_policy
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<OpenedOutput>> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn send(&self, bytes: &[u8]) -> Result<(), SendError> {
        if bytes.is_empty() {
            return Err(SendError::Empty);
        }
        let mut opened = self.lock();
        let Some(OpenedOutput { connection, .. }) = opened.as_mut() else {
            return Err(SendError::NotOpen);
        };
        let destination = self.destination;
        match self.transport_policy.select(bytes) {
            Transport::Sync => {
                log::trace!("Sending MIDI output to endpoint {destination}: {bytes:x?}");
                connection.send_now(bytes).inspect_err(|err| {
                    log::warn!("Failed to send MIDI output to endpoint {destination}: {err}");
                })
            }
            Transport::AsyncSysex => {
                log::trace!("Dispatching sysex output to endpoint {destination}: {bytes:x?}");
                connection.send_sysex(OutboundRequest {
                    destination,
                    bytes: bytes.to_vec(),
                    transport: Transport::AsyncSysex,
                });
                Ok(())
            }
        }
    }
}
