// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use super::*;
use crate::{testing::MockBackend, Direction};

fn descriptors() -> Vec<EndpointDescriptor> {
    vec![
        EndpointDescriptor::new(EndpointId::new(0), "Keys", Direction::Input),
        EndpointDescriptor::new(EndpointId::new(1), "Synth", Direction::Output),
    ]
}

fn new_registry(backend: &Arc<MockBackend>) -> SessionRegistry {
    let mut registry =
        SessionRegistry::new(Arc::clone(backend) as SharedMidiBackend, Default::default());
    registry.register(descriptors());
    registry
}

#[test]
fn sessions_are_created_once() {
    let backend = Arc::new(MockBackend::default());
    let mut registry = new_registry(&backend);

    let first = registry.session(EndpointId::new(0)).unwrap();
    let second = registry.session(EndpointId::new(0)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(Direction::Input, first.direction());

    assert!(registry.session(EndpointId::new(2)).is_none());
}

#[test]
fn find_by_name() {
    let backend = Arc::new(MockBackend::default());
    let mut registry = new_registry(&backend);

    let session = registry.find_by_name(Direction::Output, "Synth").unwrap();
    assert_eq!(EndpointId::new(1), session.endpoint());
    assert_eq!(Direction::Output, session.direction());
    assert!(registry.find_by_name(Direction::Input, "Synth").is_none());
    assert!(registry.find_by_name(Direction::Input, "Drums").is_none());
}

#[test]
fn find_by_name_distinguishes_input_and_output() {
    let backend = Arc::new(MockBackend::default());
    let mut registry =
        SessionRegistry::new(Arc::clone(&backend) as SharedMidiBackend, Default::default());
    registry.register(vec![
        EndpointDescriptor::new(EndpointId::new(0), "KAOSS DJ", Direction::Input),
        EndpointDescriptor::new(EndpointId::new(1), "KAOSS DJ", Direction::Output),
    ]);

    let input = registry.find_by_name(Direction::Input, "KAOSS DJ").unwrap();
    let output = registry.find_by_name(Direction::Output, "KAOSS DJ").unwrap();
    assert_eq!(EndpointId::new(0), input.endpoint());
    assert_eq!(Direction::Input, input.direction());
    assert_eq!(EndpointId::new(1), output.endpoint());
    assert_eq!(Direction::Output, output.direction());
}

#[test]
fn open_sessions_and_close_all() {
    let backend = Arc::new(MockBackend::default());
    let mut registry = new_registry(&backend);

    let input = registry.session(EndpointId::new(0)).unwrap();
    let output = registry.session(EndpointId::new(1)).unwrap();
    assert_eq!(0, registry.open_sessions().count());

    input.open().unwrap();
    output.open().unwrap();
    assert_eq!(2, registry.open_sessions().count());

    registry.close_all();
    assert_eq!(0, registry.open_sessions().count());
    assert_eq!(1, backend.input_closes());
    assert_eq!(1, backend.output_closes());
}

#[test]
fn register_closes_vanished_sessions() {
    let backend = Arc::new(MockBackend::default());
    let mut registry = new_registry(&backend);

    let input = registry.session(EndpointId::new(0)).unwrap();
    let output = registry.session(EndpointId::new(1)).unwrap();
    input.open().unwrap();
    output.open().unwrap();

    // The output device has been unplugged
    registry.register(descriptors().into_iter().take(1));
    assert!(input.is_open());
    assert!(!output.is_open());
    assert!(registry.session(EndpointId::new(1)).is_none());
    assert!(Arc::ptr_eq(
        &input,
        &registry.session(EndpointId::new(0)).unwrap()
    ));

    registry.register_endpoint(EndpointDescriptor::new(
        EndpointId::new(1),
        "Synth",
        Direction::Output,
    ));
    assert_eq!(2, registry.descriptors().len());
    let output = registry.session(EndpointId::new(1)).unwrap();
    assert!(!output.is_open());
}
