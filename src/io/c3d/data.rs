//! C3D data section: frame-major point and analog samples.
//!
//! ```text
//! frame:  point 1 (x, y, z, residual word) .. point N
//!         sample 1 (channel 1 .. channel M) .. sample ratio
//! ```
//!
//! Samples are `i16` (Integer storage) or `f32` (Float storage). Integer
//! coordinates are multiplied by the point scale. The residual word packs the
//! camera mask in its high byte and the residual, in point scale units, in its
//! low byte; a negative word marks an invalid sample.

use crate::error::Result;
use crate::io::stream::{BinaryReader, BinaryWriter};
use crate::model::Acquisition;
use crate::types::StorageFormat;

/// Conversion of one analog channel between raw samples and values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogChannel {
    pub offset: i32,
    pub scale: f64,
}

impl Default for AnalogChannel {
    fn default() -> Self {
        Self {
            offset: 0,
            scale: 1.0,
        }
    }
}

/// Everything needed to encode or decode the data section
#[derive(Debug, Clone, PartialEq)]
pub struct DataLayout {
    pub storage: StorageFormat,
    /// Magnitude of the point scale
    pub point_scale: f64,
    pub point_number: usize,
    pub frames: usize,
    pub analog_ratio: usize,
    pub channels: Vec<AnalogChannel>,
    pub analog_gen_scale: f64,
    /// ANALOG:FORMAT is "UNSIGNED"
    pub unsigned_analogs: bool,
}

impl DataLayout {
    pub fn analog_number(&self) -> usize {
        self.channels.len()
    }

    /// Size of the section in bytes; `None` when it overflows `usize`
    pub fn byte_size(&self) -> Option<usize> {
        let samples = self
            .point_number
            .checked_mul(4)?
            .checked_add(self.analog_ratio.checked_mul(self.analog_number())?)?;
        self.frames
            .checked_mul(samples)?
            .checked_mul(self.storage.sample_size())
    }

    fn channel_factor(&self, channel: &AnalogChannel) -> f64 {
        let factor = channel.scale * self.analog_gen_scale;
        if factor == 0.0 {
            1.0
        } else {
            factor
        }
    }
}

fn decode_residual(word: i16, scale: f64) -> (f64, u8) {
    if word < 0 {
        (-1.0, 0)
    } else {
        ((word & 0xFF) as f64 * scale, (word >> 8) as u8)
    }
}

fn encode_residual(residual: f64, mask: u8, scale: f64) -> i16 {
    if residual < 0.0 {
        return -1;
    }
    let low = if scale > 0.0 {
        (residual / scale).round().clamp(0.0, 255.0) as i16
    } else {
        0
    };
    (((mask & 0x7F) as i16) << 8) | low
}

fn saturate_i16(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

fn saturate_u16(value: f64) -> u16 {
    value.round().clamp(0.0, u16::MAX as f64) as u16
}

/// Decode the section into `acq`, which must already be sized after `layout`
pub fn read(r: &mut BinaryReader<'_>, layout: &DataLayout, acq: &mut Acquisition) -> Result<()> {
    let frames = layout.frames;
    let ratio = layout.analog_ratio;
    let analog_frames = frames * ratio;
    let mut coords = vec![[0.0_f64; 3]; layout.point_number * frames];
    let mut residuals = vec![0.0_f64; layout.point_number * frames];
    let mut masks = vec![0u8; layout.point_number * frames];
    let mut analogs = vec![0.0_f64; layout.analog_number() * analog_frames];

    for frame in 0..frames {
        for point in 0..layout.point_number {
            let slot = point * frames + frame;
            let word = match layout.storage {
                StorageFormat::Integer => {
                    for c in coords[slot].iter_mut() {
                        *c = r.read_i16()? as f64 * layout.point_scale;
                    }
                    r.read_i16()?
                }
                StorageFormat::Float => {
                    for c in coords[slot].iter_mut() {
                        *c = r.read_f32()? as f64;
                    }
                    r.read_f32()? as i16
                }
            };
            (residuals[slot], masks[slot]) = decode_residual(word, layout.point_scale);
        }
        for sample in 0..ratio {
            let analog_frame = frame * ratio + sample;
            for (idx, channel) in layout.channels.iter().enumerate() {
                let raw = match (layout.storage, layout.unsigned_analogs) {
                    (StorageFormat::Integer, true) => r.read_u16()? as f64,
                    (StorageFormat::Integer, false) => r.read_i16()? as f64,
                    (StorageFormat::Float, _) => r.read_f32()? as f64,
                };
                analogs[idx * analog_frames + analog_frame] =
                    (raw - channel.offset as f64) * channel.scale * layout.analog_gen_scale;
            }
        }
    }

    for (idx, point) in acq.points_mut().iter_mut().enumerate() {
        let range = idx * frames..(idx + 1) * frames;
        point.values_mut().copy_from_slice(&coords[range.clone()]);
        point.residuals_mut().copy_from_slice(&residuals[range.clone()]);
        point.masks_mut().copy_from_slice(&masks[range]);
    }
    for (idx, analog) in acq.analogs_mut().iter_mut().enumerate() {
        analog
            .values_mut()
            .copy_from_slice(&analogs[idx * analog_frames..(idx + 1) * analog_frames]);
    }
    tracing::debug!(
        "Data section decoded: {} frames, {} points, {} analog channels",
        frames,
        layout.point_number,
        layout.analog_number()
    );
    Ok(())
}

/// Encode the samples of `acq` following `layout`
pub fn write(w: &mut BinaryWriter, layout: &DataLayout, acq: &Acquisition) {
    let ratio = layout.analog_ratio;
    let scale = if layout.point_scale > 0.0 {
        layout.point_scale
    } else {
        1.0
    };
    let points: Vec<_> = acq.points().iter().collect();
    let analogs: Vec<_> = acq.analogs().iter().collect();
    let factors: Vec<f64> = layout
        .channels
        .iter()
        .map(|c| layout.channel_factor(c))
        .collect();

    for frame in 0..layout.frames {
        for point in &points {
            let value = point.values()[frame];
            let word = encode_residual(point.residuals()[frame], point.masks()[frame], scale);
            match layout.storage {
                StorageFormat::Integer => {
                    for c in value {
                        w.write_i16(saturate_i16(c / scale));
                    }
                    w.write_i16(word);
                }
                StorageFormat::Float => {
                    for c in value {
                        w.write_f32(c as f32);
                    }
                    w.write_f32(word as f32);
                }
            }
        }
        for sample in 0..ratio {
            let analog_frame = frame * ratio + sample;
            for ((analog, channel), factor) in analogs.iter().zip(&layout.channels).zip(&factors) {
                let raw = analog.values()[analog_frame] / factor + channel.offset as f64;
                match (layout.storage, layout.unsigned_analogs) {
                    (StorageFormat::Integer, true) => w.write_u16(saturate_u16(raw)),
                    (StorageFormat::Integer, false) => w.write_i16(saturate_i16(raw)),
                    (StorageFormat::Float, _) => w.write_f32(raw as f32),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ByteOrder;

    fn layout(storage: StorageFormat) -> DataLayout {
        DataLayout {
            storage,
            point_scale: 1.0 / 12.0,
            point_number: 2,
            frames: 3,
            analog_ratio: 2,
            channels: vec![
                AnalogChannel { offset: 0, scale: 0.5 },
                AnalogChannel { offset: 10, scale: 0.25 },
            ],
            analog_gen_scale: 1.0,
            unsigned_analogs: false,
        }
    }

    fn sample_acquisition() -> Acquisition {
        let mut acq = Acquisition::new();
        acq.init(2, 3, 2, 2);
        for frame in 0..3 {
            let base = frame as f64 * 12.0;
            acq.point_mut(0)
                .unwrap()
                .set_frame(frame, [base + 3005.0 / 12.0, -1.0, 0.5], 16.0 / 12.0, 3)
                .unwrap();
        }
        acq.point_mut(1).unwrap().residuals_mut()[1] = -1.0;
        for frame in 0..6 {
            acq.analog_mut(0).unwrap().set_value(frame, frame as f64 * 0.5).unwrap();
            acq.analog_mut(1).unwrap().set_value(frame, -(frame as f64)).unwrap();
        }
        acq
    }

    fn round_trip(storage: StorageFormat, order: ByteOrder) -> Acquisition {
        let layout = layout(storage);
        let source = sample_acquisition();
        let mut w = BinaryWriter::new(order);
        write(&mut w, &layout, &source);
        assert_eq!(Some(w.position()), layout.byte_size());
        let bytes = w.into_inner();
        let mut decoded = Acquisition::new();
        decoded.init(2, 3, 2, 2);
        read(&mut BinaryReader::new(&bytes, order), &layout, &mut decoded).unwrap();
        decoded
    }

    #[test]
    fn test_integer_round_trip() {
        let acq = round_trip(StorageFormat::Integer, ByteOrder::IeeeLittleEndian);
        let point = acq.point(0).unwrap();
        assert!((point.values()[0][0] - 250.4166).abs() < 1e-4);
        assert!((point.residuals()[0] - 1.3333).abs() < 1e-4);
        assert_eq!(point.masks()[0], 3);
        assert!(!acq.point(1).unwrap().is_valid(1));
        assert!(acq.point(1).unwrap().is_valid(0));
        assert_eq!(acq.analog(0).unwrap().values(), &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
        assert_eq!(acq.analog(1).unwrap().value(5).unwrap(), -5.0);
    }

    #[test]
    fn test_float_round_trip_all_orders() {
        for order in ByteOrder::all() {
            let acq = round_trip(StorageFormat::Float, order);
            let point = acq.point(0).unwrap();
            assert!((point.values()[2][0] - (24.0 + 3005.0 / 12.0)).abs() < 1e-3);
            assert_eq!(point.values()[1][2], 0.5);
            assert_eq!(acq.analog(1).unwrap().value(3).unwrap(), -3.0);
        }
    }

    #[test]
    fn test_residual_word() {
        assert_eq!(decode_residual(-1, 0.1), (-1.0, 0));
        assert_eq!(encode_residual(-0.5, 9, 0.1), -1);
        let word = encode_residual(1.6, 5, 0.1);
        assert_eq!(word, (5 << 8) | 16);
        let (residual, mask) = decode_residual(word, 0.1);
        assert!((residual - 1.6).abs() < 1e-9);
        assert_eq!(mask, 5);
    }

    #[test]
    fn test_unsigned_analogs() {
        let layout = DataLayout {
            storage: StorageFormat::Integer,
            point_scale: 0.1,
            point_number: 0,
            frames: 1,
            analog_ratio: 1,
            channels: vec![AnalogChannel { offset: 2048, scale: 1.0 }],
            analog_gen_scale: 1.0,
            unsigned_analogs: true,
        };
        let bytes = 40000u16.to_le_bytes();
        let mut acq = Acquisition::new();
        acq.init(0, 1, 1, 1);
        read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), &layout, &mut acq).unwrap();
        assert_eq!(acq.analog(0).unwrap().value(0).unwrap(), 40000.0 - 2048.0);
    }

    #[test]
    fn test_integer_values_saturate() {
        assert_eq!(saturate_i16(1.0e9), i16::MAX);
        assert_eq!(saturate_i16(-1.0e9), i16::MIN);
        assert_eq!(saturate_u16(-3.0), 0);
    }

    #[test]
    fn test_truncated_section_fails() {
        let layout = layout(StorageFormat::Integer);
        let bytes = vec![0u8; layout.byte_size().unwrap() - 1];
        let mut acq = Acquisition::new();
        acq.init(2, 3, 2, 2);
        assert!(read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), &layout, &mut acq).is_err());
    }
}
