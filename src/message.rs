// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use enum_as_inner::EnumAsInner;

/// Status byte that starts a system-exclusive message.
pub const SYSEX_START: u8 = 0xf0;

/// Status byte that terminates a system-exclusive message.
pub const SYSEX_END: u8 = 0xf7;

/// Maximum length of a short message in bytes.
pub const SHORT_MESSAGE_MAX_LEN: usize = 3;

/// A fixed-size message with a status byte and up to two data bytes.
///
/// Missing data bytes read as 0. The original length is retained
/// for reproducing the wire bytes exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortMessage {
    bytes: [u8; SHORT_MESSAGE_MAX_LEN],
    len: u8,
}

impl ShortMessage {
    #[must_use]
    pub const fn status_only(status: u8) -> Self {
        Self {
            bytes: [status, 0, 0],
            len: 1,
        }
    }

    #[must_use]
    pub const fn with_data1(status: u8, data1: u8) -> Self {
        Self {
            bytes: [status, data1, 0],
            len: 2,
        }
    }

    #[must_use]
    pub const fn with_data2(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            bytes: [status, data1, data2],
            len: 3,
        }
    }

    /// Returns `None` unless `bytes` contains 1 to 3 bytes.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [status] => Some(Self::status_only(status)),
            [status, data1] => Some(Self::with_data1(status, data1)),
            [status, data1, data2] => Some(Self::with_data2(status, data1, data2)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> u8 {
        self.bytes[0]
    }

    #[must_use]
    pub const fn data1(&self) -> u8 {
        self.bytes[1]
    }

    #[must_use]
    pub const fn data2(&self) -> u8 {
        self.bytes[2]
    }

    #[must_use]
    #[allow(clippy::len_without_is_empty)] // never empty
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }
}

/// A complete, logical MIDI message.
#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum MidiMessage {
    Short(ShortMessage),
    /// Starts with [`SYSEX_START`] and ends with [`SYSEX_END`].
    Sysex(Vec<u8>),
}

impl MidiMessage {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Short(short) => short.as_bytes(),
            Self::Sysex(bytes) => bytes,
        }
    }
}

impl From<ShortMessage> for MidiMessage {
    fn from(from: ShortMessage) -> Self {
        Self::Short(from)
    }
}
