// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::time::Instant;

use enum_as_inner::EnumAsInner;

use crate::{
    bridge::OpenedInput, outbound::OpenedOutput, BoxedMessageConsumer, BridgeConfig, Direction,
    EndpointDescriptor, EndpointId, MessageConsumer, NativeBridge, OutboundSender, ResourceError,
    SendError, SharedMidiBackend,
};


/// Direction-specific part of a [`PortSession`].
#[derive(EnumAsInner)]
#[allow(missing_debug_implementations)]
pub enum Port {
    Input(NativeBridge),
    Output(OutboundSender),
}

/// Owns the native resources of a single endpoint.
///
/// A session is created once per endpoint and could be opened
/// and closed repeatedly. Dropping the session closes it.
///
/// All operations are thread-safe. Opening and closing an input
/// session is synchronized with the delivery of incoming packets.
#[allow(missing_debug_implementations)]
pub struct PortSession {
    descriptor: EndpointDescriptor,
    backend: SharedMidiBackend,
    port: Port,
}

fn elapsed_micros(opened_at: Instant) -> u64 {
    u64::try_from(opened_at.elapsed().as_micros()).unwrap_or(u64::MAX)
}

impl PortSession {
    #[must_use]
    pub fn new(
        descriptor: EndpointDescriptor,
        backend: SharedMidiBackend,
        config: &BridgeConfig,
    ) -> Self {
        let port = match descriptor.direction {
            Direction::Input => Port::Input(NativeBridge::new(
                descriptor.id,
                config.unattached_input,
            )),
            Direction::Output => {
                Port::Output(OutboundSender::new(descriptor.id, config.transport))
            }
        };
        Self {
            descriptor,
            backend,
            port,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn endpoint(&self) -> EndpointId {
        self.descriptor.id
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.descriptor.direction
    }

    #[must_use]
    pub const fn port(&self) -> &Port {
        &self.port
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        match &self.port {
            Port::Input(bridge) => bridge.lock().opened.is_some(),
            Port::Output(sender) => sender.lock().is_some(),
        }
    }

    /// Register the receiver of incoming messages.
    ///
    /// Replaces and drops the previous consumer. Only supported
    /// for input sessions.
    pub fn attach_consumer(&self, consumer: impl MessageConsumer + 'static) {
        let Port::Input(bridge) = &self.port else {
            log::warn!(
                "Cannot attach consumer to {direction} endpoint {endpoint}",
                direction = self.direction(),
                endpoint = self.endpoint()
            );
            return;
        };
        let replaced = bridge.lock().consumer.replace(Box::new(consumer));
        if replaced.is_some() {
            log::debug!(
                "Replaced consumer of endpoint {endpoint}",
                endpoint = self.endpoint()
            );
        }
    }

    pub fn detach_consumer(&self) -> Option<BoxedMessageConsumer> {
        let Port::Input(bridge) = &self.port else {
            return None;
        };
        bridge.lock().consumer.take()
    }

    /// Acquire the native resources.
    ///
    /// Does nothing if the session is already open. On failure the
    /// session remains closed and opening could be retried.
    pub fn open(&self) -> Result<(), ResourceError> {
        match &self.port {
            Port::Input(bridge) => {
                let mut locked = bridge.lock();
                if locked.opened.is_some() {
                    return Ok(());
                }
                self.check_available()?;
                let connection = self
                    .backend
                    .connect_input(&self.descriptor, bridge.clone())?;
                let discarded = locked.framer.reset();
                if discarded > 0 {
                    log::debug!(
                        "Discarded {discarded} byte(s) of incomplete sysex message on endpoint \
                         {endpoint}",
                        endpoint = self.endpoint()
                    );
                }
                locked.opened = Some(OpenedInput {
                    connection,
                    opened_at: Instant::now(),
                });
            }
            Port::Output(sender) => {
                let mut opened = sender.lock();
                if opened.is_some() {
                    return Ok(());
                }
                self.check_available()?;
                let connection = self.backend.connect_output(&self.descriptor)?;
                *opened = Some(OpenedOutput {
                    connection,
                    opened_at: Instant::now(),
                });
            }
        }
        log::debug!(
            "Opened {direction} endpoint {endpoint} \"{name}\"",
            direction = self.direction(),
            endpoint = self.endpoint(),
            name = self.descriptor.name(),
        );
        Ok(())
    }

    fn check_available(&self) -> Result<(), ResourceError> {
        if self.backend.is_available(&self.descriptor) {
            Ok(())
        } else {
            Err(ResourceError::DeviceNotFound {
                endpoint: self.endpoint(),
            })
        }
    }

    /// Release the native resources.
    ///
    /// Does nothing if the session is already closed. The resources are
    /// detached while locked and released afterwards. Native threads that
    /// are waiting for the lock will discard their input.
    pub fn close(&self) {
        match &self.port {
            Port::Input(bridge) => {
                let opened = bridge.lock().opened.take();
                let Some(OpenedInput { connection, .. }) = opened else {
                    return;
                };
                connection.close();
            }
            Port::Output(sender) => {
                // In-flight sysex messages are not cancelled
                let opened = sender.lock().take();
                let Some(OpenedOutput { connection, .. }) = opened else {
                    return;
                };
                connection.close();
            }
        }
        log::debug!(
            "Closed {direction} endpoint {endpoint} \"{name}\"",
            direction = self.direction(),
            endpoint = self.endpoint(),
            name = self.descriptor.name(),
        );
    }

    /// Send a message to an output session.
    pub fn send(&self, bytes: &[u8]) -> Result<(), SendError> {
        let Port::Output(sender) = &self.port else {
            return Err(SendError::UnsupportedDirection);
        };
        sender.send(bytes)
    }

    /// Elapsed time since the session has been opened in microseconds.
    ///
    /// Returns 0 if closed.
    #[must_use]
    pub fn position(&self) -> u64 {
        let opened_at = match &self.port {
            Port::Input(bridge) => bridge.lock().opened.as_ref().map(|opened| opened.opened_at),
            Port::Output(sender) => sender.lock().as_ref().map(|opened| opened.opened_at),
        };
        opened_at.map_or(0, elapsed_micros)
    }
}

impl Drop for PortSession {
    fn drop(&mut self) {
        self.close();
    }
}
