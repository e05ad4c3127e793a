//! Process object reading an acquisition from a file.

use super::{AcquisitionFileIOFactory, FileIOHandle};
use crate::error::{MocapError, Result};
use crate::model::Acquisition;
use crate::pipeline::{DataKind, DataObject, PortDescriptor, ProcessCore, ProcessObject};
use std::path::{Path, PathBuf};
use std::rc::Rc;

static OUTPUTS: [PortDescriptor; 1] = [PortDescriptor::output("acquisition", DataKind::Acquisition)];

/// Source of a pipeline: decodes `filename` with a codec.
///
/// Without an explicit codec the factory picks one from the file content on
/// the first update, and keeps it for later updates.
pub struct AcquisitionFileReader {
    core: ProcessCore,
    filename: PathBuf,
    io: Option<FileIOHandle>,
    disable_filename_exception: bool,
}

impl Default for AcquisitionFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionFileReader {
    pub fn new() -> Self {
        Self {
            core: ProcessCore::new(&[], &OUTPUTS),
            filename: PathBuf::new(),
            io: None,
            disable_filename_exception: false,
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn set_filename(&mut self, filename: impl Into<PathBuf>) {
        let filename = filename.into();
        if filename != self.filename {
            self.filename = filename;
            self.modified();
        }
    }

    pub fn acquisition_io(&self) -> Option<FileIOHandle> {
        self.io.clone()
    }

    pub fn set_acquisition_io(&mut self, io: Option<FileIOHandle>) {
        self.io = io;
        self.modified();
    }

    /// When set, an empty filename produces an empty acquisition instead of
    /// a configuration error
    pub fn set_disable_filename_exception(&mut self, disable: bool) {
        if disable != self.disable_filename_exception {
            self.disable_filename_exception = disable;
            self.modified();
        }
    }

    /// The acquisition read, updating the reader first
    pub fn output(&mut self) -> Result<Rc<DataObject>> {
        self.get_nth_output(0)
    }
}

impl ProcessObject for AcquisitionFileReader {
    fn name(&self) -> &str {
        "AcquisitionFileReader"
    }

    fn core(&self) -> &ProcessCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessCore {
        &mut self.core
    }

    fn generate_data(
        &mut self,
        _inputs: &[Option<Rc<DataObject>>],
        outputs: &mut [DataObject],
    ) -> Result<()> {
        if self.filename.as_os_str().is_empty() {
            if self.disable_filename_exception {
                outputs[0] = DataObject::Acquisition(Acquisition::new());
                return Ok(());
            }
            return Err(MocapError::Configuration("Filename must be specified.".to_string()));
        }
        if !self.filename.exists() {
            return Err(MocapError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File '{}' doesn't exist", self.filename.display()),
            )));
        }
        let io = match &self.io {
            Some(io) => io.clone(),
            None => {
                let io = AcquisitionFileIOFactory::create_for_read(&self.filename).ok_or_else(|| {
                    MocapError::Format(format!(
                        "No codec can read '{}'",
                        self.filename.display()
                    ))
                })?;
                self.io = Some(io.clone());
                io
            }
        };

        let mut acq = Acquisition::new();
        io.try_borrow_mut()
            .map_err(|_| MocapError::Pipeline("The codec is already in use".to_string()))?
            .read(&self.filename, &mut acq)?;
        outputs[0] = DataObject::Acquisition(acq);
        Ok(())
    }
}
