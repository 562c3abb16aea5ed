// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use crate::{EndpointId, MessageFramer, MidiMessage, UnattachedInputPolicy};

/// Receives reassembled messages from an input session.
///
/// Invoked on the native callback thread while the session is locked.
/// Implementations must not call back into the same session.
pub trait MessageConsumer: Send {
    fn consume_message(&mut self, message: MidiMessage);
}

impl<F> MessageConsumer for F
where
    F: FnMut(MidiMessage) + Send,
{
    fn consume_message(&mut self, message: MidiMessage) {
        self(message);
    }
}

pub type BoxedMessageConsumer = Box<dyn MessageConsumer + 'static>;

/// Native input resources of an open session.
///
/// Closing releases the connection, the port, and the client in this order.
pub trait InputConnection: Send {
    fn close(self: Box<Self>);
}

pub type BoxedInputConnection = Box<dyn InputConnection + 'static>;

pub(crate) struct OpenedInput {
    pub(crate) connection: BoxedInputConnection,
    pub(crate) opened_at: Instant,
}

/// Everything guarded by the lock of an input session.
pub(crate) struct InboundState {
    pub(crate) framer: MessageFramer,
    pub(crate) consumer: Option<BoxedMessageConsumer>,
    /// Native handles exist if and only if the session is open.
    pub(crate) opened: Option<OpenedInput>,
}

/// Hands packets from native callback threads to the session.
///
/// Cloned into the native callback context when the session is opened.
/// All clones share the lock of the session.
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct NativeBridge {
    endpoint: EndpointId,
    unattached_input: UnattachedInputPolicy,
    state: Arc<Mutex<InboundState>>,
}

impl NativeBridge {
    pub(crate) fn new(endpoint: EndpointId, unattached_input: UnattachedInputPolicy) -> Self {
        let state = InboundState {
            framer: MessageFramer::new(),
            consumer: None,
            opened: None,
        };
        Self {
            endpoint,
            unattached_input,
            state: Arc::new(Mutex::new(state)),
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    // The guarded state is consistent after each operation, even
    // if a consumer panicked in between.
    pub(crate) fn lock(&self) -> MutexGuard<'_, InboundState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a single packet.
    pub fn deliver_chunk(&self, chunk: &[u8]) {
        self.deliver(&[chunk]);
    }

    /// Deliver a batch of packets received by a single native callback.
    ///
    /// Packets received while the session is closed are discarded.
    pub fn deliver(&self, chunks: &[&[u8]]) {
        log::trace!(
            "Received MIDI input on endpoint {endpoint}: {chunks:x?}",
            endpoint = self.endpoint
        );
        let mut locked = self.lock();
        let InboundState {
            framer,
            consumer,
            opened,
        } = &mut *locked;
        if opened.is_none() {
            log::debug!(
                "Discarding MIDI input on closed endpoint {endpoint}",
                endpoint = self.endpoint
            );
            return;
        }
        let Some(consumer) = consumer else {
            match self.unattached_input {
                UnattachedInputPolicy::Reassemble => {
                    let discarded = framer.feed_all(chunks.iter().copied()).count();
                    log::trace!(
                        "Discarded {discarded} MIDI message(s) on endpoint {endpoint}: No consumer \
                         attached",
                        endpoint = self.endpoint
                    );
                }
                UnattachedInputPolicy::Drop => {
                    log::trace!(
                        "Dropped MIDI input on endpoint {endpoint}: No consumer attached",
                        endpoint = self.endpoint
                    );
                }
            }
            return;
        };
        for message in framer.feed_all(chunks.iter().copied()) {
            log::trace!(
                "Dispatching MIDI message on endpoint {endpoint}: {message:x?}",
                endpoint = self.endpoint
            );
            consumer.consume_message(message);
        }
    }
}
