// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    collections::HashMap,
    io,
    sync::{mpsc, Mutex, PoisonError},
};

use midir::{
    ConnectError, ConnectErrorKind, Ignore, InitError, MidiInput, MidiInputConnection, MidiOutput,
    MidiOutputConnection,
};
use thiserror::Error;

use super::{ensure_direction, MidiBackend, ResourceError};
use crate::{
    BoxedInputConnection, BoxedOutputConnection, Direction, EndpointDescriptor, EndpointId,
    EndpointIdGenerator, InputConnection, NativeBridge, OutboundRequest, OutputConnection,
    SendError,
};


#[derive(Debug, Error)]
pub enum MidirError {
    #[error("port not found")]
    PortNotFound,
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("{0}")]
    Connect(ConnectErrorKind),
    #[error(transparent)]
    Spawn(#[from] io::Error),
}

// The rejected client is dropped, only the reason is kept.
impl<T> From<ConnectError<T>> for MidirError {
    fn from(err: ConnectError<T>) -> Self {
        Self::Connect(err.kind())
    }
}

impl MidirError {
    fn into_resource_error(self, endpoint: EndpointId) -> ResourceError {
        match self {
            Self::PortNotFound => ResourceError::DeviceNotFound { endpoint },
            err => ResourceError::creation_failed(endpoint, err),
        }
    }
}

impl From<midir::SendError> for SendError {
    fn from(err: midir::SendError) -> Self {
        SendError::SendFailed {
            msg: err.to_string().into(),
        }
    }
}

/// Ports of the same direction are identified by their name and their
/// position among all ports with the same name.
type PortKey = (Direction, String, usize);

/// Number ports that share the same name in enumeration order.
fn number_port_names(names: impl IntoIterator<Item = String>) -> Vec<(String, usize)> {
    let mut counts = HashMap::<String, usize>::new();
    names
        .into_iter()
        .map(|name| {
            let count = counts.entry(name.clone()).or_default();
            let nth = *count;
            *count += 1;
            (name, nth)
        })
        .collect()
}

/// Find the `nth` port named `name`.
///
/// Ports without a name are skipped.
fn find_nth_port<P>(
    ports: Vec<P>,
    port_name: impl Fn(&P) -> Option<String>,
    name: &str,
    nth: usize,
) -> Option<P> {
    ports
        .into_iter()
        .filter(|port| port_name(port).is_some_and(|port_name| port_name == name))
        .nth(nth)
}

/// [`MidiBackend`] driven by [`midir`].
///
/// Endpoints are resolved by their port name each time a session
/// is opened.
#[derive(Debug)]
pub struct MidirBackend {
    client_name: String,
    id_generator: EndpointIdGenerator,
    known_ids: Mutex<HashMap<PortKey, EndpointId>>,
}

impl MidirBackend {
    #[must_use]
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            id_generator: EndpointIdGenerator::new(),
            known_ids: Default::default(),
        }
    }

    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    fn endpoint_id(&self, key: PortKey) -> EndpointId {
        let mut known_ids = self.known_ids.lock().unwrap_or_else(PoisonError::into_inner);
        *known_ids
            .entry(key)
            .or_insert_with(|| self.id_generator.next())
    }

    /// Position of the endpoint among all ports with the same name.
    ///
    /// Descriptors that have not been discovered by this backend refer
    /// to the first port with their name.
    fn port_position(&self, endpoint: &EndpointDescriptor) -> usize {
        let known_ids = self.known_ids.lock().unwrap_or_else(PoisonError::into_inner);
        known_ids
            .iter()
            .find_map(|((direction, name, nth), id)| {
                (*id == endpoint.id && *direction == endpoint.direction && name == endpoint.name())
                    .then_some(*nth)
            })
            .unwrap_or_default()
    }

    /// Enumerate all native sources and destinations.
    ///
    /// Ports keep their [`EndpointId`] across repeated invocations as
    /// long as neither their name nor their position among ports with
    /// the same name changes.
    pub fn discover(&self) -> Result<Vec<EndpointDescriptor>, MidirError> {
        let input = MidiInput::new(&format!("{} input port watcher", self.client_name))?;
        let output = MidiOutput::new(&format!("{} output port watcher", self.client_name))?;
        let input_names = number_port_names(
            input
                .ports()
                .into_iter()
                .filter_map(|port| input.port_name(&port).ok()),
        );
        let output_names = number_port_names(
            output
                .ports()
                .into_iter()
                .filter_map(|port| output.port_name(&port).ok()),
        );
        let endpoints = input_names
            .into_iter()
            .map(|(name, nth)| (Direction::Input, name, nth))
            .chain(
                output_names
                    .into_iter()
                    .map(|(name, nth)| (Direction::Output, name, nth)),
            )
            .map(|(direction, name, nth)| {
                let id = self.endpoint_id((direction, name.clone(), nth));
                log::debug!("Discovered {direction} port \"{name}\" #{nth} as endpoint {id}");
                EndpointDescriptor::new(id, name, direction)
            })
            .collect();
        Ok(endpoints)
    }

    fn find_input_port(
        &self,
        input: &MidiInput,
        endpoint: &EndpointDescriptor,
    ) -> Option<midir::MidiInputPort> {
        find_nth_port(
            input.ports(),
            |port| input.port_name(port).ok(),
            endpoint.name(),
            self.port_position(endpoint),
        )
    }

    fn find_output_port(
        &self,
        output: &MidiOutput,
        endpoint: &EndpointDescriptor,
    ) -> Option<midir::MidiOutputPort> {
        find_nth_port(
            output.ports(),
            |port| output.port_name(port).ok(),
            endpoint.name(),
            self.port_position(endpoint),
        )
    }

    fn try_connect_input(
        &self,
        endpoint: &EndpointDescriptor,
        bridge: NativeBridge,
    ) -> Result<MidiInputConnection<NativeBridge>, MidirError> {
        let mut input = MidiInput::new(&self.client_name)?;
        input.ignore(Ignore::None);
        let port = self
            .find_input_port(&input, endpoint)
            .ok_or(MidirError::PortNotFound)?;
        let connection = input.connect(
            &port,
            &self.client_name,
            |_micros, packet, bridge| NativeBridge::deliver_chunk(bridge, packet),
            bridge,
        )?;
        Ok(connection)
    }

    fn try_connect_output(
        &self,
        endpoint: &EndpointDescriptor,
    ) -> Result<mpsc::Sender<OutputCommand>, MidirError> {
        let output = MidiOutput::new(&self.client_name)?;
        let port = self
            .find_output_port(&output, endpoint)
            .ok_or(MidirError::PortNotFound)?;
        let connection = output.connect(&port, &self.client_name)?;
        let id = endpoint.id;
        let (command_tx, command_rx) = mpsc::channel();
        std::thread::Builder::new()
            .name(format!("midi-output-{}", id.value()))
            .spawn(move || output_thread_fn(id, connection, &command_rx))?;
        Ok(command_tx)
    }
}

impl MidiBackend for MidirBackend {
    fn is_available(&self, endpoint: &EndpointDescriptor) -> bool {
        let watcher_name = format!("{} port watcher", self.client_name);
        let available = match endpoint.direction {
            Direction::Input => MidiInput::new(&watcher_name)
                .map(|input| self.find_input_port(&input, endpoint).is_some()),
            Direction::Output => MidiOutput::new(&watcher_name)
                .map(|output| self.find_output_port(&output, endpoint).is_some()),
        };
        available.unwrap_or_else(|err| {
            log::warn!("Failed to look up endpoint {id}: {err}", id = endpoint.id);
            false
        })
    }

    fn connect_input(
        &self,
        endpoint: &EndpointDescriptor,
        bridge: NativeBridge,
    ) -> Result<BoxedInputConnection, ResourceError> {
        ensure_direction(endpoint, Direction::Input)?;
        let connection = self
            .try_connect_input(endpoint, bridge)
            .map_err(|err| err.into_resource_error(endpoint.id))?;
        log::debug!("Connected input port \"{name}\"", name = endpoint.name());
        Ok(Box::new(MidirInputConnection {
            endpoint: endpoint.id,
            connection,
        }))
    }

    fn connect_output(
        &self,
        endpoint: &EndpointDescriptor,
    ) -> Result<BoxedOutputConnection, ResourceError> {
        ensure_direction(endpoint, Direction::Output)?;
        let command_tx = self
            .try_connect_output(endpoint)
            .map_err(|err| err.into_resource_error(endpoint.id))?;
        log::debug!("Connected output port \"{name}\"", name = endpoint.name());
        Ok(Box::new(MidirOutputConnection {
            endpoint: endpoint.id,
            command_tx,
        }))
    }
}

struct MidirInputConnection {
    endpoint: EndpointId,
    connection: MidiInputConnection<NativeBridge>,
}

impl InputConnection for MidirInputConnection {
    fn close(self: Box<Self>) {
        let Self {
            endpoint,
            connection,
        } = *self;
        // Disconnects and disposes the port, returns the client
        let (input, _bridge) = connection.close();
        drop(input);
        log::debug!("Closed input connection of endpoint {endpoint}");
    }
}

enum OutputCommand {
    SendNow {
        bytes: Vec<u8>,
        result_tx: mpsc::SyncSender<Result<(), SendError>>,
    },
    SendSysex(OutboundRequest),
}

/// The native connection that is owned by the output thread.
trait OutputSink: Send + 'static {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SendError>;

    fn close(self);
}

impl OutputSink for MidiOutputConnection {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        MidiOutputConnection::send(self, bytes).map_err(Into::into)
    }

    fn close(self) {
        // Disconnects and disposes the port, returns the client
        let output = MidiOutputConnection::close(self);
        drop(output);
    }
}

// All messages are sent in the order they have been submitted, regardless
// of their transport. The sink is closed after the sender has been dropped
// and all pending commands have been executed.
fn output_thread_fn(
    endpoint: EndpointId,
    mut sink: impl OutputSink,
    command_rx: &mpsc::Receiver<OutputCommand>,
) {
    log::debug!("Entering output thread of endpoint {endpoint}");
    for command in command_rx {
        match command {
            OutputCommand::SendNow { bytes, result_tx } => {
                let result = sink.send(&bytes);
                // The sender is blocked until it receives the result
                result_tx.send(result).ok();
            }
            OutputCommand::SendSysex(request) => {
                let result = sink.send(&request.bytes);
                request.complete(result);
            }
        }
    }
    sink.close();
    log::debug!("Exiting output thread of endpoint {endpoint}");
}

struct MidirOutputConnection {
    endpoint: EndpointId,
    command_tx: mpsc::Sender<OutputCommand>,
}

const OUTPUT_THREAD_TERMINATED: &str = "output thread terminated";

impl OutputConnection for MidirOutputConnection {
    fn send_now(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let command = OutputCommand::SendNow {
            bytes: bytes.to_vec(),
            result_tx,
        };
        let terminated = || SendError::SendFailed {
            msg: OUTPUT_THREAD_TERMINATED.into(),
        };
        self.command_tx.send(command).map_err(|_| terminated())?;
        result_rx.recv().map_err(|_| terminated())?
    }

    fn send_sysex(&mut self, request: OutboundRequest) {
        if let Err(mpsc::SendError(OutputCommand::SendSysex(request))) =
            self.command_tx.send(OutputCommand::SendSysex(request))
        {
            request.complete(Err(SendError::SendFailed {
                msg: OUTPUT_THREAD_TERMINATED.into(),
            }));
        }
    }

    fn close(self: Box<Self>) {
        let Self {
            endpoint,
            command_tx,
        } = *self;
        // The output thread closes the connection after all
        // pending sysex messages have been sent
        drop(command_tx);
        log::debug!("Closing output connection of endpoint {endpoint}");
    }
}
