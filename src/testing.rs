// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

//! In-memory backend for testing sessions without MIDI hardware.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
};

use crate::{
    backend::ensure_direction, BoxedInputConnection, BoxedOutputConnection, Direction,
    EndpointDescriptor, InputConnection, MidiBackend, NativeBridge, OutboundRequest,
    OutputConnection, ResourceError, SendError, Transport,
};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) input_connects: AtomicUsize,
    pub(crate) input_closes: AtomicUsize,
    pub(crate) output_connects: AtomicUsize,
    pub(crate) output_closes: AtomicUsize,
    pub(crate) completed_sysex: AtomicUsize,
}

#[derive(Default)]
pub(crate) struct MockBackend {
    pub(crate) unavailable: AtomicBool,
    pub(crate) fail_connect: AtomicBool,
    pub(crate) fail_send: Arc<AtomicBool>,
    /// Keep sysex requests in flight until [`MockBackend::complete_pending_sysex`].
    pub(crate) defer_sysex: Arc<AtomicBool>,
    pending_sysex: Arc<Mutex<Vec<OutboundRequest>>>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) sent: Arc<Mutex<Vec<(Transport, Vec<u8>)>>>,
    bridge: Mutex<Option<NativeBridge>>,
}

impl MockBackend {
    /// The bridge passed to the most recent input connection.
    pub(crate) fn bridge(&self) -> NativeBridge {
        self.bridge.lock().unwrap().clone().unwrap()
    }

    pub(crate) fn sent(&self) -> Vec<(Transport, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn pending_sysex(&self) -> usize {
        self.pending_sysex.lock().unwrap().len()
    }

    /// Complete all deferred sysex requests on another thread.
    pub(crate) fn complete_pending_sysex(&self) -> JoinHandle<()> {
        let requests = std::mem::take(&mut *self.pending_sysex.lock().unwrap());
        let counters = Arc::clone(&self.counters);
        std::thread::spawn(move || {
            for request in requests {
                request.complete(Ok(()));
                counters.completed_sysex.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    pub(crate) fn completed_sysex(&self) -> usize {
        self.counters.completed_sysex.load(Ordering::SeqCst)
    }

    pub(crate) fn input_connects(&self) -> usize {
        self.counters.input_connects.load(Ordering::SeqCst)
    }

    pub(crate) fn input_closes(&self) -> usize {
        self.counters.input_closes.load(Ordering::SeqCst)
    }

    pub(crate) fn output_connects(&self) -> usize {
        self.counters.output_connects.load(Ordering::SeqCst)
    }

    pub(crate) fn output_closes(&self) -> usize {
        self.counters.output_closes.load(Ordering::SeqCst)
    }
}

impl MidiBackend for MockBackend {
    fn is_available(&self, _endpoint: &EndpointDescriptor) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    fn connect_input(
        &self,
        endpoint: &EndpointDescriptor,
        bridge: NativeBridge,
    ) -> Result<BoxedInputConnection, ResourceError> {
        ensure_direction(endpoint, Direction::Input)?;
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ResourceError::creation_failed(endpoint.id, "mock"));
        }
        self.counters.input_connects.fetch_add(1, Ordering::SeqCst);
        *self.bridge.lock().unwrap() = Some(bridge);
        Ok(Box::new(MockInputConnection {
            counters: Arc::clone(&self.counters),
        }))
    }

    fn connect_output(
        &self,
        endpoint: &EndpointDescriptor,
    ) -> Result<BoxedOutputConnection, ResourceError> {
        ensure_direction(endpoint, Direction::Output)?;
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ResourceError::creation_failed(endpoint.id, "mock"));
        }
        self.counters.output_connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockOutputConnection {
            counters: Arc::clone(&self.counters),
            sent: Arc::clone(&self.sent),
            fail_send: Arc::clone(&self.fail_send),
            defer_sysex: Arc::clone(&self.defer_sysex),
            pending_sysex: Arc::clone(&self.pending_sysex),
        }))
    }
}

struct MockInputConnection {
    counters: Arc<Counters>,
}

impl InputConnection for MockInputConnection {
    fn close(self: Box<Self>) {
        self.counters.input_closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockOutputConnection {
    counters: Arc<Counters>,
    sent: Arc<Mutex<Vec<(Transport, Vec<u8>)>>>,
    fail_send: Arc<AtomicBool>,
    defer_sysex: Arc<AtomicBool>,
    pending_sysex: Arc<Mutex<Vec<OutboundRequest>>>,
}

impl OutputConnection for MockOutputConnection {
    fn send_now(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(SendError::SendFailed {
                msg: "mock".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((Transport::Sync, bytes.to_vec()));
        Ok(())
    }

    fn send_sysex(&mut self, request: OutboundRequest) {
        self.sent
            .lock()
            .unwrap()
            .push((request.transport, request.bytes.clone()));
        if self.defer_sysex.load(Ordering::SeqCst) {
            self.pending_sysex.lock().unwrap().push(request);
            return;
        }
        let counters = Arc::clone(&self.counters);
        // Completion arrives on another thread
        std::thread::spawn(move || {
            request.complete(Ok(()));
            counters.completed_sysex.fetch_add(1, Ordering::SeqCst);
        })
        .join()
        .unwrap();
    }

    fn close(self: Box<Self>) {
        self.counters.output_closes.fetch_add(1, Ordering::SeqCst);
    }
}
