// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::{error::Error as StdError, sync::Arc};

use thiserror::Error;

use crate::{
    BoxedInputConnection, BoxedOutputConnection, Direction, EndpointDescriptor, EndpointId,
    NativeBridge,
};

#[cfg(feature = "midir")]
pub(crate) mod midir;

#[cfg(test)]
mod tests;

pub type BoxedResourceErrorSource = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("device not found: endpoint {endpoint}")]
    DeviceNotFound { endpoint: EndpointId },
    #[error("unsupported direction: endpoint {endpoint} is not an {expected} port")]
    UnsupportedDirection {
        endpoint: EndpointId,
        expected: Direction,
    },
    #[error("failed to create native resources for endpoint {endpoint}: {source}")]
    ResourceCreationFailed {
        endpoint: EndpointId,
        #[source]
        source: BoxedResourceErrorSource,
    },
}

impl ResourceError {
    pub fn creation_failed(
        endpoint: EndpointId,
        source: impl Into<BoxedResourceErrorSource>,
    ) -> Self {
        Self::ResourceCreationFailed {
            endpoint,
            source: source.into(),
        }
    }
}

/// Reject descriptors that have been passed to the wrong `connect_*` function.
pub(crate) fn ensure_direction(
    endpoint: &EndpointDescriptor,
    expected: Direction,
) -> Result<(), ResourceError> {
    if endpoint.direction == expected {
        return Ok(());
    }
    Err(ResourceError::UnsupportedDirection {
        endpoint: endpoint.id,
        expected,
    })
}

/// Access to the native MIDI API.
pub trait MidiBackend: Send + Sync {
    /// Check if the endpoint could still be resolved.
    #[must_use]
    fn is_available(&self, endpoint: &EndpointDescriptor) -> bool;

    /// Create the native client, port, and connection for listening.
    ///
    /// Each packet received afterwards must be passed to `bridge`, either
    /// one by one or in batches. Packets must not be delivered before
    /// this function has returned.
    fn connect_input(
        &self,
        endpoint: &EndpointDescriptor,
        bridge: NativeBridge,
    ) -> Result<BoxedInputConnection, ResourceError>;

    /// Create the native client, port, and connection for sending.
    fn connect_output(
        &self,
        endpoint: &EndpointDescriptor,
    ) -> Result<BoxedOutputConnection, ResourceError>;
}

pub type SharedMidiBackend = Arc<dyn MidiBackend + 'static>;
