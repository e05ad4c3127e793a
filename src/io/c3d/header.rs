//! C3D header block (block 1, 512 bytes).
//!
//! ```text
//! byte   0   first parameter block       byte  1  key (80)
//! word   2   point count                 word  3  analog samples per frame
//! word   4   first frame                 word  5  last frame
//! word   6   max interpolation gap       7-8      scale (f32, sign = storage)
//! word   9   first data block            word 10  analog samples per point frame
//! 11-12      point frame rate (f32)
//! byte 294   label range marker          296      label range block
//! byte 298   4-char event labels (12345) 300      event count
//! byte 304   18 event times (f32)        376      18 display flags
//! byte 396   18 event labels (4 bytes)
//! ```

use crate::error::{MocapError, Result};
use crate::io::stream::{BinaryReader, BinaryWriter};
use crate::types::StorageFormat;

pub const BLOCK_SIZE: usize = 512;
pub const HEADER_KEY: i8 = 80;
/// Marker of the optional features in the header (label range, 4-char events)
pub const FEATURE_KEY: u16 = 12345;
pub const MAX_HEADER_EVENTS: usize = 18;

const LABEL_RANGE_OFFSET: u64 = 294;
const EVENT_TIMES_OFFSET: usize = 304;
const EVENT_FLAGS_OFFSET: usize = 376;
const EVENT_LABELS_OFFSET: usize = 396;

/// Event stored in the header
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEvent {
    pub label: String,
    pub time: f32,
    pub displayed: bool,
}

/// Decoded header fields
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub parameter_first_block: u8,
    pub point_number: u16,
    pub analog_samples_per_frame: u16,
    pub first_frame: u16,
    pub last_frame: u16,
    pub max_interpolation_gap: u16,
    /// Magnitude of the point scale; the sign lives in `storage`
    pub scale: f32,
    pub storage: StorageFormat,
    pub data_first_block: u16,
    pub analog_ratio: u16,
    pub frame_rate: f32,
    pub events: Vec<HeaderEvent>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parameter_first_block: 2,
            point_number: 0,
            analog_samples_per_frame: 0,
            first_frame: 1,
            last_frame: 0,
            max_interpolation_gap: 0,
            scale: 0.1,
            storage: StorageFormat::Integer,
            data_first_block: 0,
            analog_ratio: 1,
            frame_rate: 0.0,
            events: Vec::new(),
        }
    }
}

impl Header {
    /// Decode the header; the reader must be set to the file byte order.
    pub fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        r.seek(0);
        let parameter_first_block = r.read_i8()?;
        if parameter_first_block <= 0 {
            return Err(MocapError::Format("Bad parameter first block number".to_string()));
        }
        if r.read_i8()? != HEADER_KEY {
            return Err(MocapError::Format("Bad header key".to_string()));
        }
        if parameter_first_block == 1 {
            // Parameters start in block 1: no header, no data section.
            return Ok(Self {
                parameter_first_block: 1,
                ..Self::default()
            });
        }
        let point_number = r.read_u16()?;
        let analog_samples_per_frame = r.read_u16()?;
        let first_frame = r.read_u16()?;
        let last_frame = r.read_u16()?;
        let max_interpolation_gap = r.read_u16()?;
        let scale = r.read_f32()?;
        let storage = StorageFormat::from_scale(scale)
            .ok_or_else(|| MocapError::Format("Incorrect 3D scale factor".to_string()))?;
        let data_first_block = r.read_u16()?;
        let analog_ratio = r.read_u16()?;
        let frame_rate = r.read_f32()?;

        r.seek(LABEL_RANGE_OFFSET);
        let label_range = r.read_u16()?;
        let label_range_block = r.read_u16()?;
        if label_range == FEATURE_KEY {
            tracing::warn!("Label and range section present, it is ignored");
            if label_range_block < 2 {
                tracing::warn!("Label and range section address is incorrect");
            }
        }
        let four_char_labels = r.read_u16()? == FEATURE_KEY;
        let event_number = (r.read_u16()? as usize).min(MAX_HEADER_EVENTS);
        let mut events = Vec::with_capacity(event_number);
        if event_number > 0 {
            r.seek(EVENT_TIMES_OFFSET as u64);
            let times = r.read_f32s(event_number)?;
            r.seek(EVENT_FLAGS_OFFSET as u64);
            let flags = r.read_bytes(event_number)?;
            r.seek(EVENT_LABELS_OFFSET as u64);
            let width = if four_char_labels { 4 } else { 2 };
            for (time, flag) in times.into_iter().zip(flags) {
                let label = r.read_string(width)?.trim().to_string();
                events.push(HeaderEvent {
                    label,
                    time,
                    displayed: flag == 0,
                });
            }
        }

        Ok(Self {
            parameter_first_block: parameter_first_block as u8,
            point_number,
            analog_samples_per_frame,
            first_frame,
            last_frame,
            max_interpolation_gap,
            scale: scale.abs(),
            storage,
            data_first_block,
            analog_ratio,
            frame_rate,
            events,
        })
    }

    /// Encode the 512-byte header block
    pub fn write(&self, w: &mut BinaryWriter) {
        let start = w.position();
        w.write_u8(self.parameter_first_block);
        w.write_i8(HEADER_KEY);
        w.write_u16(self.point_number);
        w.write_u16(self.analog_samples_per_frame);
        w.write_u16(self.first_frame);
        w.write_u16(self.last_frame);
        w.write_u16(self.max_interpolation_gap);
        w.write_f32(self.storage.signed_scale(self.scale));
        w.write_u16(self.data_first_block);
        w.write_u16(self.analog_ratio);
        w.write_f32(self.frame_rate);

        w.pad_to(start + LABEL_RANGE_OFFSET as usize);
        w.write_u16(0);
        w.write_u16(0);
        w.write_u16(FEATURE_KEY);
        let events = &self.events[..self.events.len().min(MAX_HEADER_EVENTS)];
        w.write_u16(events.len() as u16);
        w.pad_to(start + EVENT_TIMES_OFFSET);
        for event in events {
            w.write_f32(event.time);
        }
        w.pad_to(start + EVENT_FLAGS_OFFSET);
        for event in events {
            w.write_u8(if event.displayed { 0 } else { 1 });
        }
        w.pad_to(start + EVENT_LABELS_OFFSET);
        for event in events {
            w.write_string(&event.label, 4);
        }
        w.pad_to(start + BLOCK_SIZE);
    }

    /// Point frame count implied by the frame range
    pub fn frame_number(&self) -> usize {
        (self.last_frame as i64 - self.first_frame as i64 + 1).max(0) as usize
    }
}
