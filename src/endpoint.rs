// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    borrow::Cow,
    sync::atomic::{AtomicU32, Ordering},
};

use derive_more::{Display, From};
use strum::{Display as StrumDisplay, EnumString};

/// Opaque identifier of a single native source or destination.
///
/// Stable for the lifetime of the process unless the device is removed.
#[derive(Debug, Display, From, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("#{_0}")]
pub struct EndpointId(u32);

impl EndpointId {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

/// Thread-safe generator of unique [`EndpointId`]s.
#[derive(Debug, Default)]
pub struct EndpointIdGenerator {
    next: AtomicU32,
}

impl EndpointIdGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn next(&self) -> EndpointId {
        EndpointId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Direction of an endpoint, seen from this side of the bridge.
#[derive(Debug, StrumDisplay, EnumString, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// A native source. Packets arrive from the device.
    Input,
    /// A native destination. Messages are sent to the device.
    Output,
}

/// Endpoint record as supplied by device discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub id: EndpointId,
    pub name: Cow<'static, str>,
    pub direction: Direction,
}

impl EndpointDescriptor {
    #[must_use]
    pub fn new(id: EndpointId, name: impl Into<Cow<'static, str>>, direction: Direction) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
