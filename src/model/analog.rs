//! Single-channel scalar time series.

use super::collection::Labelled;
use crate::error::{MocapError, Result};
use serde::{Deserialize, Serialize};

/// Default unit of an analog channel
pub const DEFAULT_ANALOG_UNIT: &str = "V";

/// Amplifier range of an analog channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnalogGain {
    #[default]
    Unknown,
    PlusMinus10,
    PlusMinus5,
    PlusMinus2Dot5,
    PlusMinus1Dot25,
    PlusMinus1,
}

impl AnalogGain {
    /// Integer code stored in ANALOG:GAIN
    pub fn code(self) -> i16 {
        match self {
            AnalogGain::Unknown => 0,
            AnalogGain::PlusMinus10 => 1,
            AnalogGain::PlusMinus5 => 2,
            AnalogGain::PlusMinus2Dot5 => 3,
            AnalogGain::PlusMinus1Dot25 => 4,
            AnalogGain::PlusMinus1 => 5,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => AnalogGain::PlusMinus10,
            2 => AnalogGain::PlusMinus5,
            3 => AnalogGain::PlusMinus2Dot5,
            4 => AnalogGain::PlusMinus1Dot25,
            5 => AnalogGain::PlusMinus1,
            _ => AnalogGain::Unknown,
        }
    }

    /// Symmetric voltage range, if known
    pub fn range(self) -> Option<f64> {
        match self {
            AnalogGain::Unknown => None,
            AnalogGain::PlusMinus10 => Some(10.0),
            AnalogGain::PlusMinus5 => Some(5.0),
            AnalogGain::PlusMinus2Dot5 => Some(2.5),
            AnalogGain::PlusMinus1Dot25 => Some(1.25),
            AnalogGain::PlusMinus1 => Some(1.0),
        }
    }
}

/// Analog channel sampled at the analog frame rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analog {
    label: String,
    description: String,
    unit: String,
    gain: AnalogGain,
    offset: i32,
    scale: f64,
    values: Vec<f64>,
}

impl Analog {
    pub fn new(label: impl Into<String>, frames: usize) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            unit: DEFAULT_ANALOG_UNIT.to_string(),
            gain: AnalogGain::Unknown,
            offset: 0,
            scale: 1.0,
            values: vec![0.0; frames],
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    pub fn gain(&self) -> AnalogGain {
        self.gain
    }

    pub fn set_gain(&mut self, gain: AnalogGain) {
        self.gain = gain;
    }

    /// Raw-unit offset subtracted before scaling
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    /// Channel scale applied after the offset
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn frame_number(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn value(&self, frame: usize) -> Result<f64> {
        self.values
            .get(frame)
            .copied()
            .ok_or_else(|| MocapError::out_of_range(frame, self.values.len()))
    }

    pub fn set_value(&mut self, frame: usize, value: f64) -> Result<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(frame)
            .ok_or_else(|| MocapError::out_of_range(frame, len))?;
        *slot = value;
        Ok(())
    }

    pub fn max_abs_value(&self) -> f64 {
        self.values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    pub(crate) fn set_frame_number(&mut self, frames: usize) {
        self.values.resize(frames, 0.0);
    }
}

impl Labelled for Analog {
    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let a = Analog::new("FZ1", 4);
        assert_eq!(a.unit(), "V");
        assert_eq!(a.scale(), 1.0);
        assert_eq!(a.offset(), 0);
        assert_eq!(a.gain(), AnalogGain::Unknown);
        assert_eq!(a.values(), &[0.0; 4]);
    }

    #[test]
    fn test_gain_codes() {
        for code in 0..=5 {
            assert_eq!(AnalogGain::from_code(code).code() as i32, code);
        }
        assert_eq!(AnalogGain::from_code(42), AnalogGain::Unknown);
        assert_eq!(AnalogGain::PlusMinus2Dot5.range(), Some(2.5));
    }

    #[test]
    fn test_resize_preserves_values() {
        let mut a = Analog::new("FX1", 2);
        a.set_value(1, 3.5).unwrap();
        a.set_frame_number(4);
        assert_eq!(a.values(), &[0.0, 3.5, 0.0, 0.0]);
        assert!(a.set_value(4, 1.0).is_err());
    }
}
