//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use mocap_rs::{Acquisition, AcquisitionFileIO, C3DFileIO};
use std::path::Path;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() <= epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Write `acq` to `path` with a default codec and read it back
pub fn write_then_read(path: &Path, acq: &Acquisition) -> Acquisition {
    C3DFileIO::new().write(path, acq).unwrap();
    let mut read = Acquisition::new();
    C3DFileIO::new().read(path, &mut read).unwrap();
    read
}

/// Labels of the groups of a metadata root, each followed by its parameters
pub fn tree_shape(acq: &Acquisition) -> Vec<(String, Vec<String>)> {
    acq.metadata()
        .children()
        .map(|group| {
            (
                group.label().to_string(),
                group.children().map(|p| p.label().to_string()).collect(),
            )
        })
        .collect()
}
