//! # mocap-rs: Motion-capture acquisition toolkit
//!
//! Reads, edits and writes biomechanical motion-capture trials stored in the
//! C3D binary format. A trial is held in memory as an [`Acquisition`]: 3D
//! trajectories, analog channels, events and a hierarchical metadata tree.
//!
//! ## Architecture
//!
//! - **Metadata**: a labelled tree of typed, dimensioned parameter values
//! - **Model**: points, analogs and events in label-addressable collections,
//!   aggregated by the acquisition
//! - **Pipeline**: lazily re-executed process objects connected through
//!   typed ports, with per-node timestamps
//! - **IO**: a byte-order aware binary stream, the C3D codec, and the
//!   reader/writer process objects binding codecs into a pipeline
//!
//! ```text
//!   file ──► AcquisitionFileReader ──► (filters) ──► AcquisitionFileWriter ──► file
//!                    │                                         │
//!                    └──────── C3DFileIO (AcquisitionFileIO) ──┘
//! ```
//!
//! ## Configuration
//!
//! The command-line tool reads codec and logging defaults from
//! `config.toml` in the platform config directory under `org.mocap-rs`.
//!
//! ## Example
//!
//! ```ignore
//! use mocap_rs::{shared, AcquisitionFileReader, AcquisitionFileWriter, ProcessObject};
//!
//! let reader = shared(AcquisitionFileReader::new());
//! reader.borrow_mut().set_filename("trial.c3d");
//!
//! let mut writer = AcquisitionFileWriter::new();
//! writer.set_input(reader.clone(), 0)?;
//! writer.set_filename("copy.c3d");
//! writer.update()?;
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::{CodecConfig, Config, LoggingConfig};
pub use error::{MocapError, Result, ResultExt};
pub use io::{
    AcquisitionFileIO, AcquisitionFileIOFactory, AcquisitionFileReader, AcquisitionFileWriter,
    C3DFileIO,
};
pub use metadata::{MetaData, MetaDataFormat, MetaDataInfo, MetaDataValues};
pub use model::{Acquisition, Analog, AnalogGain, Event, EventContext, Point, PointType};
pub use pipeline::{shared, DataKind, DataObject, ProcessObject};
pub use types::{ByteOrder, FileType, StorageFormat, WritingFlags};
