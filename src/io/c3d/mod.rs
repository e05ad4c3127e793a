//! C3D codec.
//!
//! # Layout
//!
//! ```text
//! block 1        header (counts, frame range, scale, frame rate, events)
//! block pfb..    parameter section (groups and parameters, processor code)
//! block dfb..    data section (frame-major point and analog samples)
//! ```
//!
//! # Read path
//!
//! ```text
//! Unopened ──► HeaderRead ──► ParameterBlocksRead ──► DataBlocksRead ──► Closed
//! ```
//!
//! The processor code is read first so that the header is decoded with the
//! right byte order. Counts found in POINT:USED and ANALOG:USED win over the
//! header. Labels, units, analog conversions and events come from the
//! parameter groups (see [`mapping`]).
//!
//! # Write path
//!
//! The writing flags select the derived state recomputed right before
//! encoding: [`C3DFileIO::update_scales_from_data`] and
//! [`C3DFileIO::update_metadata_from_data`]. The file is encoded in memory
//! and written in one go; a partially written file is removed.

pub mod data;
pub mod header;
pub mod mapping;
pub mod parameters;

use self::data::{AnalogChannel, DataLayout};
use self::header::{Header, HeaderEvent, BLOCK_SIZE, MAX_HEADER_EVENTS};
use super::stream::{BinaryReader, BinaryWriter};
use super::AcquisitionFileIO;
use crate::error::{MocapError, Result, ResultExt};
use crate::metadata::{create_child_info, MetaData, MetaDataInfo};
use crate::model::Acquisition;
use crate::types::{ByteOrder, FileType, StorageFormat, WritingFlags, PROCESSOR_CODE_BASE};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Largest integer magnitude targeted when scales are recomputed
const SCALE_RANGE: f64 = 32000.0;
/// Point scale used when there is no valid sample to derive one from
pub const DEFAULT_POINT_SCALE: f32 = 0.1;
/// First block of the parameter section written by this codec
const PARAMETER_FIRST_BLOCK: u8 = 2;

/// Progress of the last read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecState {
    #[default]
    Unopened,
    HeaderRead,
    ParameterBlocksRead,
    DataBlocksRead,
    Closed,
}

impl fmt::Display for CodecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodecState::Unopened => "Unopened",
            CodecState::HeaderRead => "HeaderRead",
            CodecState::ParameterBlocksRead => "ParameterBlocksRead",
            CodecState::DataBlocksRead => "DataBlocksRead",
            CodecState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Reader and writer of C3D files.
///
/// Reading a file records its byte order, storage format and point scale so
/// that the same codec writes the acquisition back the same way.
#[derive(Debug, Clone)]
pub struct C3DFileIO {
    byte_order: ByteOrder,
    storage: StorageFormat,
    /// Magnitude of the point scale
    point_scale: f32,
    writing_flags: WritingFlags,
    /// Analog conversions computed by `update_scales_from_data`
    analog_channels: Option<Vec<AnalogChannel>>,
    state: CodecState,
}

impl Default for C3DFileIO {
    fn default() -> Self {
        Self::new()
    }
}

fn truncated_file(what: &str) -> MocapError {
    MocapError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("file too short to hold {}", what),
    ))
}

fn to_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        MocapError::Format(format!("{} ({}) cannot be stored in a C3D header", what, value))
    })
}

impl C3DFileIO {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrder::default(),
            storage: StorageFormat::default(),
            point_scale: DEFAULT_POINT_SCALE,
            writing_flags: WritingFlags::ALL,
            analog_channels: None,
            state: CodecState::Unopened,
        }
    }

    pub fn point_scale(&self) -> f32 {
        self.point_scale
    }

    /// Set the point scale magnitude used by Integer storage.
    ///
    /// The header stores it for both formats, so a zero scale makes the next
    /// write fail unless the scales are recomputed from the data.
    pub fn set_point_scale(&mut self, scale: f32) {
        self.point_scale = scale.abs();
    }

    pub fn writing_flags(&self) -> WritingFlags {
        self.writing_flags
    }

    pub fn set_writing_flags(&mut self, flags: WritingFlags) {
        self.writing_flags = flags;
    }

    pub fn has_writing_flag(&self, flag: WritingFlags) -> bool {
        self.writing_flags.contains(flag)
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    /// Analog conversions that the next write will use instead of the ones
    /// stored in the analog channels
    pub fn analog_channels(&self) -> Option<&[AnalogChannel]> {
        self.analog_channels.as_deref()
    }

    fn set_state(&mut self, state: CodecState) {
        tracing::trace!("C3D codec: {} -> {}", self.state, state);
        self.state = state;
    }

    // ── Derived state ──

    /// Recompute the point scale and the analog conversions from the samples.
    ///
    /// The point scale maps the largest valid coordinate to 32000 (0.1 when
    /// there is none). Analog channels get a zero offset (mid-range for
    /// unsigned samples) and a scale mapping their largest value to 32000.
    pub fn update_scales_from_data(&mut self, acq: &Acquisition) {
        let max_point = acq
            .points()
            .iter()
            .map(|p| p.max_abs_value())
            .fold(0.0_f64, f64::max);
        self.point_scale = if max_point > 0.0 {
            (max_point / SCALE_RANGE) as f32
        } else {
            DEFAULT_POINT_SCALE
        };

        let (_, gen_scale, unsigned) = mapping::analog_channels(acq.metadata(), 0);
        let gen_scale = if gen_scale == 0.0 { 1.0 } else { gen_scale };
        let channels = acq
            .analogs()
            .iter()
            .map(|a| {
                let max = a.max_abs_value();
                AnalogChannel {
                    offset: if unsigned { 32768 } else { 0 },
                    scale: if max > 0.0 {
                        max / (SCALE_RANGE * gen_scale.abs())
                    } else {
                        1.0
                    },
                }
            })
            .collect();
        self.analog_channels = Some(channels);
        tracing::debug!("Point scale updated from data: {}", self.point_scale);
    }

    /// Metadata tree of `acq` with POINT, ANALOG, EVENT and TRIAL rebuilt from
    /// its entities, using the current point scale and analog conversions.
    pub fn update_metadata_from_data(&self, acq: &Acquisition) -> Result<MetaData> {
        let mut root = acq.metadata().clone();
        let (_, gen_scale, _) = mapping::analog_channels(&root, 0);
        let channels = self.effective_channels(acq);
        mapping::write_point_group(&mut root, acq, self.storage.signed_scale(self.point_scale))?;
        mapping::write_analog_group(&mut root, acq, &channels, gen_scale)?;
        mapping::write_event_group(&mut root, acq)?;
        mapping::write_trial_group(&mut root, acq)?;
        Ok(root)
    }

    fn effective_channels(&self, acq: &Acquisition) -> Vec<AnalogChannel> {
        match &self.analog_channels {
            Some(channels) if channels.len() == acq.analog_number() => channels.clone(),
            _ => acq
                .analogs()
                .iter()
                .map(|a| AnalogChannel {
                    offset: a.offset(),
                    scale: a.scale(),
                })
                .collect(),
        }
    }

    // ── Decoding ──

    /// Decode a whole C3D file held in memory
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Acquisition> {
        self.set_state(CodecState::Unopened);
        let parameter_first_block = *bytes.first().ok_or_else(|| truncated_file("a header"))?;
        if parameter_first_block == 0 {
            return Err(MocapError::Format("Bad parameter first block number".to_string()));
        }
        let processor_pos = BLOCK_SIZE * (parameter_first_block as usize - 1) + 3;
        let processor = *bytes
            .get(processor_pos)
            .ok_or_else(|| truncated_file("the parameter section"))?;
        let order = ByteOrder::from_processor_code(processor as i32 - PROCESSOR_CODE_BASE as i32)
            .ok_or_else(|| MocapError::Format("Invalid processor type".to_string()))?;

        let mut r = BinaryReader::new(bytes, order);
        let header = Header::read(&mut r)?;
        self.set_state(CodecState::HeaderRead);
        let section = parameters::read(&mut r, header.parameter_first_block)?;
        self.set_state(CodecState::ParameterBlocksRead);
        let root = section.root;

        self.byte_order = order;
        self.storage = header.storage;
        self.point_scale = header.scale;
        self.analog_channels = None;

        let mut acq = Acquisition::new();
        if header.parameter_first_block == 1 {
            tracing::debug!("No header: the file only holds parameters");
            acq.set_metadata(root);
            self.set_state(CodecState::Closed);
            return Ok(acq);
        }

        let point_number = mapping::used_count(&root, "POINT", header.point_number as usize);
        let analog_ratio = if header.analog_ratio == 0 {
            tracing::warn!("Analog sample number per point frame is 0; 1 is used");
            1
        } else {
            header.analog_ratio as usize
        };
        let analog_number = mapping::used_count(
            &root,
            "ANALOG",
            header.analog_samples_per_frame as usize / analog_ratio,
        );
        let (first_frame, frames) = match mapping::trial_frame_range(&root) {
            Some((first, last)) if header.last_frame == u16::MAX && last >= first => {
                (first as i32, (last - first + 1) as usize)
            }
            _ => (header.first_frame as i32, header.frame_number()),
        };

        let (channels, analog_gen_scale, unsigned_analogs) =
            mapping::analog_channels(&root, analog_number);
        let layout = DataLayout {
            storage: header.storage,
            point_scale: header.scale as f64,
            point_number,
            frames,
            analog_ratio,
            channels,
            analog_gen_scale,
            unsigned_analogs,
        };
        let has_samples = frames > 0 && point_number + analog_number > 0;
        let data_offset = BLOCK_SIZE * (header.data_first_block as usize).saturating_sub(1);
        if has_samples {
            let data_first_block = header.data_first_block as usize;
            if data_first_block < header.parameter_first_block as usize + section.block_number {
                return Err(MocapError::Format("Bad data first block".to_string()));
            }
            // Counts come from the file: check them against its size before
            // allocating the samples.
            let available = bytes.len().saturating_sub(data_offset);
            match layout.byte_size() {
                Some(needed) if needed <= available => {}
                _ => return Err(truncated_file("the data section")),
            }
        }

        acq.init(point_number, frames, analog_number, analog_ratio);
        if first_frame > 0 {
            acq.set_first_frame(first_frame)?;
        } else {
            tracing::warn!("First frame is 0 in the header; 1 is used");
        }
        acq.set_point_frequency(header.frame_rate as f64);
        acq.set_max_interpolation_gap(header.max_interpolation_gap as i32);

        if has_samples {
            r.seek(data_offset as u64);
            data::read(&mut r, &layout, &mut acq)?;
        }
        self.set_state(CodecState::DataBlocksRead);

        mapping::apply_point_metadata(&root, &mut acq);
        mapping::apply_analog_metadata(&root, &mut acq, &layout.channels);
        for event in mapping::extract_events(&root, &header.events, acq.point_frequency()) {
            acq.append_event(event);
        }
        acq.set_metadata(root);
        acq.validate()?;
        self.set_state(CodecState::Closed);
        tracing::debug!(
            "C3D decoded: {} points, {} analogs, {} frames at {} Hz ({} / {})",
            acq.point_number(),
            acq.analog_number(),
            acq.point_frame_number(),
            acq.point_frequency(),
            self.byte_order,
            self.storage
        );
        Ok(acq)
    }

    // ── Encoding ──

    /// Encode `acq` as a C3D file, applying the writing flags first
    pub fn encode(&mut self, acq: &Acquisition) -> Result<Vec<u8>> {
        acq.validate()?;
        if self.writing_flags.scales_from_data_update {
            self.update_scales_from_data(acq);
            if !self.writing_flags.metadata_from_data_update {
                tracing::warn!(
                    "Scales are updated from the data but the metadata is not; POINT:SCALE and ANALOG:SCALE may disagree with the samples"
                );
            }
        }
        if !(self.point_scale.is_finite() && self.point_scale > 0.0) {
            return Err(MocapError::Format(format!(
                "Point scale must be a non-zero number, got {}",
                self.point_scale
            )));
        }
        let mut root = if self.writing_flags.metadata_from_data_update {
            self.update_metadata_from_data(acq)?
        } else {
            acq.metadata().clone()
        };

        // DATA_START depends on the size of the parameter section, which does
        // not depend on its value.
        let has_data_start = root.find_path("POINT:DATA_START").is_some();
        let mut sizing = BinaryWriter::new(self.byte_order);
        let parameter_blocks = parameters::write(&mut sizing, &root, self.byte_order)?;
        let data_first_block = PARAMETER_FIRST_BLOCK as usize + parameter_blocks;
        if has_data_start {
            if let Some(point) = root.find_child_mut("POINT") {
                create_child_info(
                    point,
                    "DATA_START",
                    MetaDataInfo::from_i16(to_u16(data_first_block, "Data first block")? as i16),
                );
            }
        }

        let header = self.build_header(acq, data_first_block)?;
        let mut w = BinaryWriter::new(self.byte_order);
        header.write(&mut w);
        self.set_state(CodecState::HeaderRead);
        parameters::write(&mut w, &root, self.byte_order)?;
        self.set_state(CodecState::ParameterBlocksRead);

        let (_, analog_gen_scale, unsigned_analogs) = mapping::analog_channels(&root, 0);
        let layout = DataLayout {
            storage: self.storage,
            point_scale: self.point_scale as f64,
            point_number: acq.point_number(),
            frames: acq.point_frame_number(),
            analog_ratio: acq.analog_ratio(),
            channels: self.effective_channels(acq),
            analog_gen_scale,
            unsigned_analogs,
        };
        data::write(&mut w, &layout, acq);
        let end = w.position().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        w.pad_to(end);
        self.set_state(CodecState::DataBlocksRead);
        Ok(w.into_inner())
    }

    fn build_header(&self, acq: &Acquisition, data_first_block: usize) -> Result<Header> {
        if acq.event_number() > MAX_HEADER_EVENTS {
            tracing::debug!(
                "Only the first {} events are stored in the header",
                MAX_HEADER_EVENTS
            );
        }
        let first_frame = acq.first_frame().max(1) as usize;
        let last_frame = acq.last_frame().max(0) as usize;
        Ok(Header {
            parameter_first_block: PARAMETER_FIRST_BLOCK,
            point_number: to_u16(acq.point_number(), "Point number")?,
            analog_samples_per_frame: to_u16(
                acq.analog_number() * acq.analog_ratio(),
                "Analog samples per frame",
            )?,
            first_frame: first_frame.min(u16::MAX as usize) as u16,
            last_frame: last_frame.min(u16::MAX as usize) as u16,
            max_interpolation_gap: acq.max_interpolation_gap().clamp(0, u16::MAX as i32) as u16,
            scale: self.point_scale,
            storage: self.storage,
            data_first_block: to_u16(data_first_block, "Data first block")?,
            analog_ratio: to_u16(acq.analog_ratio(), "Analog ratio")?,
            frame_rate: acq.point_frequency() as f32,
            events: acq
                .events()
                .iter()
                .take(MAX_HEADER_EVENTS)
                .map(|e| HeaderEvent {
                    label: e.label().to_string(),
                    time: e.time() as f32,
                    displayed: true,
                })
                .collect(),
        })
    }
}

impl AcquisitionFileIO for C3DFileIO {
    fn file_type(&self) -> FileType {
        FileType::Binary
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    fn storage_format(&self) -> StorageFormat {
        self.storage
    }

    fn set_storage_format(&mut self, format: StorageFormat) {
        self.storage = format;
    }

    fn can_read_file(&self, path: &Path) -> bool {
        let mut prefix = [0u8; 2];
        match fs::File::open(path).and_then(|mut f| f.read_exact(&mut prefix)) {
            Ok(()) => prefix[0] > 0 && prefix[1] as i8 == header::HEADER_KEY,
            Err(_) => false,
        }
    }

    fn can_write_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("c3d"))
    }

    fn read(&mut self, path: &Path, acquisition: &mut Acquisition) -> Result<()> {
        let bytes = fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
        *acquisition = self.decode(&bytes)?;
        Ok(())
    }

    fn write(&mut self, path: &Path, acquisition: &Acquisition) -> Result<()> {
        let bytes = self.encode(acquisition)?;
        let written = fs::write(path, &bytes);
        if written.is_err() && path.exists() {
            match fs::remove_file(path) {
                Ok(()) => tracing::warn!("Partial file '{}' removed", path.display()),
                Err(e) => tracing::error!("Cannot remove '{}': {}", path.display(), e),
            }
        }
        written.with_context(|| format!("Cannot write '{}'", path.display()))?;
        self.set_state(CodecState::Closed);
        tracing::debug!("C3D written to '{}' ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
