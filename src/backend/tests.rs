// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use super::*;

#[test]
fn descriptors_with_a_different_direction_are_rejected() {
    let input = EndpointDescriptor::new(EndpointId::new(1), "Keys", Direction::Input);
    assert!(ensure_direction(&input, Direction::Input).is_ok());
    assert!(matches!(
        ensure_direction(&input, Direction::Output),
        Err(ResourceError::UnsupportedDirection {
            endpoint,
            expected: Direction::Output,
        }) if endpoint == input.id
    ));
}

#[test]
fn resource_creation_failure_has_a_source() {
    let err = ResourceError::creation_failed(EndpointId::new(1), "no client");
    assert_eq!(
        "failed to create native resources for endpoint #1: no client",
        err.to_string()
    );
    assert_eq!(
        "no client",
        StdError::source(&err).map(ToString::to_string).unwrap()
    );
}
