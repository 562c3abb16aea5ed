// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use strum::{Display, EnumString};

use crate::TransportPolicy;

/// Handling of input that arrives while no consumer is attached.
#[derive(Debug, Display, EnumString, Clone, Copy, Default, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum UnattachedInputPolicy {
    /// Keep reassembling and discard the completed messages.
    ///
    /// A consumer that is attached in the middle of a sysex message
    /// still receives the complete message.
    #[default]
    Reassemble,
    /// Discard the raw input without touching the reassembly state.
    Drop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub unattached_input: UnattachedInputPolicy,
    pub transport: TransportPolicy,
}
