//! Process object writing its input acquisition to a file.

use super::{AcquisitionFileIOFactory, FileIOHandle};
use crate::error::{MocapError, Result};
use crate::pipeline::{DataKind, DataObject, PortDescriptor, ProcessCore, ProcessHandle, ProcessObject};
use std::path::{Path, PathBuf};
use std::rc::Rc;

static INPUTS: [PortDescriptor; 1] = [PortDescriptor::input("acquisition", DataKind::Acquisition)];

/// Sink of a pipeline: encodes its input with a codec.
///
/// The writer has no output; call [`update`](ProcessObject::update) to
/// write. Cleaning up a partially written file is left to the codec, so a
/// write rejected before any I/O leaves an existing destination untouched.
pub struct AcquisitionFileWriter {
    core: ProcessCore,
    filename: PathBuf,
    io: Option<FileIOHandle>,
}

impl Default for AcquisitionFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionFileWriter {
    pub fn new() -> Self {
        Self {
            core: ProcessCore::new(&INPUTS, &[]),
            filename: PathBuf::new(),
            io: None,
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

    /// Connect the acquisition to write: output `output` of `producer`
    pub fn set_input(&mut self, producer: ProcessHandle, output: usize) -> Result<()> {
        self.set_nth_input(0, producer, output)
    }
}

impl ProcessObject for AcquisitionFileWriter {
    fn name(&self) -> &str {
        "AcquisitionFileWriter"
    }

    fn core(&self) -> &ProcessCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessCore {
        &mut self.core
    }

    fn generate_data(
        &mut self,
        inputs: &[Option<Rc<DataObject>>],
        _outputs: &mut [DataObject],
    ) -> Result<()> {
        if self.filename.as_os_str().is_empty() {
            return Err(MocapError::Configuration("Filename must be specified.".to_string()));
        }
        let input = inputs[0]
            .as_ref()
            .ok_or_else(|| MocapError::Pipeline("No acquisition to write".to_string()))?;
        let acq = input.acquisition()?;
        let io = match &self.io {
            Some(io) => io.clone(),
            None => {
                let io = AcquisitionFileIOFactory::create_for_write(&self.filename).ok_or_else(|| {
                    MocapError::Format(format!(
                        "No codec can write '{}'",
                        self.filename.display()
                    ))
                })?;
                self.io = Some(io.clone());
                io
            }
        };

        let written = io
            .try_borrow_mut()
            .map_err(|_| MocapError::Pipeline("The codec is already in use".to_string()))?
            .write(&self.filename, acq);
        if let Err(e) = &written {
            tracing::warn!("Cannot write '{}': {}", self.filename.display(), e);
        }
        written
    }
}
