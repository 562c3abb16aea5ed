// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::mem;

use thiserror::Error;

use crate::{MidiMessage, ShortMessage, SHORT_MESSAGE_MAX_LEN, SYSEX_END, SYSEX_START};


/// A chunk that is neither sysex-delimited nor a valid short message.
#[derive(Debug, Error)]
#[error("malformed MIDI message ({len} bytes)")]
pub struct MalformedMessage {
    pub len: usize,
}

/// Reassembly state of a [`MessageFramer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FramerState {
    /// No partial message buffered.
    #[default]
    Idle,
    /// Bytes of an unterminated sysex message received so far.
    ///
    /// The buffer is never empty.
    Assembling { buffer: Vec<u8> },
}

/// Reconstructs logical MIDI messages from raw packets.
///
/// Short messages are expected to arrive intact in a single packet,
/// while sysex messages may be split across any number of packets.
///
/// There is neither a size limit nor a timeout for reassembly. An
/// unterminated sysex message is buffered until the terminating byte
/// arrives or the framer is [reset](Self::reset). Use [`Self::pending_len()`]
/// for monitoring.
#[derive(Debug, Default)]
pub struct MessageFramer {
    state: FramerState,
}

const fn is_sysex_start(chunk: &[u8]) -> bool {
    matches!(chunk.first(), Some(&SYSEX_START))
}

const fn is_sysex_end(chunk: &[u8]) -> bool {
    matches!(chunk.last(), Some(&SYSEX_END))
}

impl MessageFramer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FramerState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &FramerState {
        &self.state
    }

    #[must_use]
    pub const fn is_assembling(&self) -> bool {
        matches!(self.state, FramerState::Assembling { .. })
    }

    /// Number of buffered bytes of an incomplete sysex message.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        match &self.state {
            FramerState::Idle => 0,
            FramerState::Assembling { buffer } => buffer.len(),
        }
    }

    /// Discard any partial message.
    ///
    /// Returns the number of discarded bytes.
    pub fn reset(&mut self) -> usize {
        let discarded = self.pending_len();
        self.state = FramerState::Idle;
        discarded
    }

    /// Process a single packet.
    ///
    /// Malformed packets are dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<MidiMessage> {
        match self.try_feed(chunk) {
            Ok(message) => message,
            Err(err) => {
                log::debug!("Dropping MIDI input: {err} {chunk:x?}");
                None
            }
        }
    }

    /// Process a batch of packets.
    ///
    /// The packets are consumed lazily while iterating over the completed
    /// messages. Packets that are not reached before the iterator is dropped
    /// remain unprocessed.
    pub fn feed_all<'a, I>(&'a mut self, chunks: I) -> impl Iterator<Item = MidiMessage> + 'a
    where
        I: IntoIterator<Item = &'a [u8]>,
        I::IntoIter: 'a,
    {
        chunks.into_iter().filter_map(move |chunk| self.feed(chunk))
    }

    pub fn try_feed(&mut self, chunk: &[u8]) -> Result<Option<MidiMessage>, MalformedMessage> {
        if chunk.is_empty() {
            return Ok(None);
        }
        // A complete sysex message in a single packet does not affect
        // any partial message that is currently being assembled.
        if is_sysex_start(chunk) && is_sysex_end(chunk) {
            return Ok(Some(MidiMessage::Sysex(chunk.to_vec())));
        }
        if let FramerState::Assembling { buffer } = &mut self.state {
            buffer.extend_from_slice(chunk);
            if !is_sysex_end(buffer) {
                return Ok(None);
            }
            let buffer = mem::take(buffer);
            self.state = FramerState::Idle;
            return Ok(Some(MidiMessage::Sysex(buffer)));
        }
        if is_sysex_start(chunk) {
            self.state = FramerState::Assembling {
                buffer: chunk.to_vec(),
            };
            return Ok(None);
        }
        debug_assert!(!self.is_assembling());
        if chunk.len() > SHORT_MESSAGE_MAX_LEN {
            return Err(MalformedMessage { len: chunk.len() });
        }
        Ok(ShortMessage::from_slice(chunk).map(Into::into))
    }
}
