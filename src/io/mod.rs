//! File input/output for acquisitions.
//!
//! # Architecture
//!
//! ```text
//!   AcquisitionFileReader ──► AcquisitionFileIO::read ──► Acquisition
//!            │                        ▲
//!            └── factory::create_for_read (when no codec is set)
//!
//!   Acquisition ──► AcquisitionFileWriter ──► AcquisitionFileIO::write ──► file
//! ```
//!
//! Codecs implement [`AcquisitionFileIO`]. They read a whole file into memory
//! and decode it through [`stream::BinaryReader`], and encode the whole file
//! into a [`stream::BinaryWriter`] before touching the disk.
//!
//! # Modules
//!
//! - [`stream`] - Byte-order aware binary reader and writer
//! - [`c3d`] - The C3D codec
//! - [`factory`] - Codec selection from a file name or its content
//! - [`reader`] / [`writer`] - Process objects binding a codec into a pipeline

pub mod c3d;
pub mod factory;
pub mod reader;
pub mod stream;
pub mod writer;

pub use c3d::C3DFileIO;
pub use factory::AcquisitionFileIOFactory;
pub use reader::AcquisitionFileReader;
pub use writer::AcquisitionFileWriter;

use crate::error::Result;
use crate::model::Acquisition;
use crate::types::{ByteOrder, FileType, StorageFormat};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Codec shared between readers and writers
pub type FileIOHandle = Rc<RefCell<dyn AcquisitionFileIO>>;

/// Reads and writes acquisitions in one file format.
///
/// `read` fills the acquisition only when the whole file decoded; on error
/// the target is left as it was.
#[cfg_attr(test, mockall::automock)]
pub trait AcquisitionFileIO {
    fn file_type(&self) -> FileType;

    fn byte_order(&self) -> ByteOrder;

    fn set_byte_order(&mut self, order: ByteOrder);

    fn storage_format(&self) -> StorageFormat;

    fn set_storage_format(&mut self, format: StorageFormat);

    /// Whether the content of `path` looks like this format
    fn can_read_file(&self, path: &Path) -> bool;

    /// Whether `path` names a file of this format
    fn can_write_file(&self, path: &Path) -> bool;

    fn read(&mut self, path: &Path, acquisition: &mut Acquisition) -> Result<()>;

    fn write(&mut self, path: &Path, acquisition: &Acquisition) -> Result<()>;
}

/// Printable name of the byte order of `io`
pub fn byte_order_as_str(io: &dyn AcquisitionFileIO) -> &'static str {
    io.byte_order().as_str()
}

/// Printable name of the storage format of `io`
pub fn storage_format_as_str(io: &dyn AcquisitionFileIO) -> &'static str {
    io.storage_format().as_str()
}
