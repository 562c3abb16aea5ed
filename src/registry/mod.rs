// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::{collections::HashMap, sync::Arc};

use crate::{
    BridgeConfig, Direction, EndpointDescriptor, EndpointId, PortSession, SharedMidiBackend,
};

#[cfg(test)]
mod tests;

/// Provides a single [`PortSession`] per known endpoint.
///
/// Sessions are created lazily when an endpoint is referenced for
/// the first time and survive repeated open/close cycles.
#[allow(missing_debug_implementations)]
pub struct SessionRegistry {
    backend: SharedMidiBackend,
    config: BridgeConfig,
    descriptors: Vec<EndpointDescriptor>,
    sessions: HashMap<EndpointId, Arc<PortSession>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(backend: SharedMidiBackend, config: BridgeConfig) -> Self {
        Self {
            backend,
            config,
            descriptors: Vec::new(),
            sessions: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Replace the known endpoints, e.g. after rediscovery.
    ///
    /// Sessions of endpoints that are still present are kept. All other
    /// sessions are closed.
    pub fn register(&mut self, descriptors: impl IntoIterator<Item = EndpointDescriptor>) {
        self.descriptors = descriptors.into_iter().collect();
        let descriptors = &self.descriptors;
        self.sessions.retain(|id, session| {
            let retain = descriptors
                .iter()
                .any(|descriptor| descriptor == session.descriptor());
            if !retain {
                log::info!("Removing session of vanished endpoint {id}");
                session.close();
            }
            retain
        });
    }

    /// Add or update a single endpoint.
    pub fn register_endpoint(&mut self, descriptor: EndpointDescriptor) {
        let mut descriptors = self.descriptors.clone();
        descriptors.retain(|known| known.id != descriptor.id);
        descriptors.push(descriptor);
        self.register(descriptors);
    }

    #[must_use]
    pub fn descriptors(&self) -> &[EndpointDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn descriptor(&self, id: EndpointId) -> Option<&EndpointDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.id == id)
    }

    /// Get or create the session of a known endpoint.
    pub fn session(&mut self, id: EndpointId) -> Option<Arc<PortSession>> {
        if let Some(session) = self.sessions.get(&id) {
            return Some(Arc::clone(session));
        }
        let descriptor = self.descriptor(id)?.clone();
        log::info!(
            "Creating session for {direction} endpoint {id} \"{name}\"",
            direction = descriptor.direction,
            name = descriptor.name()
        );
        let session = Arc::new(PortSession::new(
            descriptor,
            Arc::clone(&self.backend),
            &self.config,
        ));
        self.sessions.insert(id, Arc::clone(&session));
        Some(session)
    }

    /// Get or create the session of the first endpoint with the given
    /// name and direction.
    ///
    /// Devices often expose both an input and an output port with
    /// the same name.
    pub fn find_by_name(&mut self, direction: Direction, name: &str) -> Option<Arc<PortSession>> {
        let id = self
            .descriptors
            .iter()
            .find(|descriptor| descriptor.direction == direction && descriptor.name() == name)?
            .id;
        self.session(id)
    }

    pub fn open_sessions(&self) -> impl Iterator<Item = &Arc<PortSession>> + '_ {
        self.sessions.values().filter(|session| session.is_open())
    }

    pub fn close_all(&self) {
        for session in self.sessions.values() {
            session.close();
        }
    }
}
