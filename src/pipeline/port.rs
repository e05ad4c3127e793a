//! Port descriptors for process objects.
//!
//! Each process object declares its ports (inputs/outputs) via static
//! `PortDescriptor` arrays. The engine uses them to size the input and output
//! slots and to check the kind of data an upstream output delivers.

use crate::pipeline::data::DataKind;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Static descriptor for a process object's port.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    pub kind: DataKind,
}

impl PortDescriptor {
    pub const fn input(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
            kind,
        }
    }

    pub const fn output(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
            kind,
        }
    }

    /// Whether data of `kind` may flow through this port
    pub fn accepts(&self, kind: DataKind) -> bool {
        self.kind == DataKind::Any || self.kind == kind
    }
}
