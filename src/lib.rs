// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

#![allow(rustdoc::invalid_rust_codeblocks)]
#![doc = include_str!("../README.md")]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
//#![warn(missing_docs)] // FIXME
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(rustdoc::broken_intra_doc_links)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]

mod backend;
#[cfg(feature = "midir")]
pub use self::backend::midir::{MidirBackend, MidirError};
pub use self::backend::{
    BoxedResourceErrorSource, MidiBackend, ResourceError, SharedMidiBackend,
};

mod bridge;
pub use self::bridge::{
    BoxedInputConnection, BoxedMessageConsumer, InputConnection, MessageConsumer, NativeBridge,
};

mod config;
pub use self::config::{BridgeConfig, UnattachedInputPolicy};

mod endpoint;
pub use self::endpoint::{Direction, EndpointDescriptor, EndpointId, EndpointIdGenerator};

mod framer;
pub use self::framer::{FramerState, MalformedMessage, MessageFramer};

mod message;
pub use self::message::{MidiMessage, ShortMessage, SHORT_MESSAGE_MAX_LEN, SYSEX_END, SYSEX_START};

mod outbound;
pub use self::outbound::{
    BoxedOutputConnection, OutboundRequest, OutboundSender, OutputConnection, SendError,
    Transport, TransportPolicy,
};

mod registry;
pub use self::registry::SessionRegistry;

mod session;
pub use self::session::{Port, PortSession};

#[cfg(test)]
mod testing;
