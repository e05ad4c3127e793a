//! 3D time series with per-frame validity.

use super::collection::Labelled;
use crate::error::{MocapError, Result};
use serde::{Deserialize, Serialize};

/// Nature of the quantity a point carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PointType {
    #[default]
    Marker,
    Angle,
    Force,
    Moment,
    Power,
    Scalar,
    Reaction,
    VirtualMarker,
    VirtualMarkerForFrame,
}

impl PointType {
    pub fn all() -> [PointType; 9] {
        [
            PointType::Marker,
            PointType::Angle,
            PointType::Force,
            PointType::Moment,
            PointType::Power,
            PointType::Scalar,
            PointType::Reaction,
            PointType::VirtualMarker,
            PointType::VirtualMarkerForFrame,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PointType::Marker => "Marker",
            PointType::Angle => "Angle",
            PointType::Force => "Force",
            PointType::Moment => "Moment",
            PointType::Power => "Power",
            PointType::Scalar => "Scalar",
            PointType::Reaction => "Reaction",
            PointType::VirtualMarker => "Virtual marker",
            PointType::VirtualMarkerForFrame => "Virtual marker for frame",
        }
    }
}

/// Per-frame 3D values, residuals and camera masks.
///
/// A residual `>= 0` marks a valid sample, a negative residual an occluded or
/// invalid one. The frame count is fixed at construction and only changes
/// through the owning [`Acquisition`](super::Acquisition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    label: String,
    description: String,
    point_type: PointType,
    values: Vec<[f64; 3]>,
    residuals: Vec<f64>,
    masks: Vec<u8>,
}

impl Point {
    pub fn new(label: impl Into<String>, frames: usize, point_type: PointType) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            point_type,
            values: vec![[0.0; 3]; frames],
            residuals: vec![0.0; frames],
            masks: vec![0; frames],
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

    pub fn point_type(&self) -> PointType {
        self.point_type
    }

    pub fn set_point_type(&mut self, point_type: PointType) {
        self.point_type = point_type;
    }

    pub fn frame_number(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[[f64; 3]] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.values
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn residuals_mut(&mut self) -> &mut [f64] {
        &mut self.residuals
    }

    pub fn masks(&self) -> &[u8] {
        &self.masks
    }

    pub fn masks_mut(&mut self) -> &mut [u8] {
        &mut self.masks
    }

    pub fn value(&self, frame: usize) -> Result<[f64; 3]> {
        self.values
            .get(frame)
            .copied()
            .ok_or_else(|| MocapError::out_of_range(frame, self.values.len()))
    }

    pub fn set_value(&mut self, frame: usize, value: [f64; 3]) -> Result<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(frame)
            .ok_or_else(|| MocapError::out_of_range(frame, len))?;
        *slot = value;
        Ok(())
    }

    pub fn residual(&self, frame: usize) -> Result<f64> {
        self.residuals
            .get(frame)
            .copied()
            .ok_or_else(|| MocapError::out_of_range(frame, self.residuals.len()))
    }

    /// Store one frame: value, residual and camera mask
    pub fn set_frame(&mut self, frame: usize, value: [f64; 3], residual: f64, mask: u8) -> Result<()> {
        self.set_value(frame, value)?;
        self.residuals[frame] = residual;
        self.masks[frame] = mask;
        Ok(())
    }

    /// Whether the sample at `frame` is valid
    pub fn is_valid(&self, frame: usize) -> bool {
        self.residuals.get(frame).is_some_and(|&r| r >= 0.0)
    }

    /// Largest absolute coordinate over valid frames
    pub fn max_abs_value(&self) -> f64 {
        self.values
            .iter()
            .zip(&self.residuals)
            .filter(|(_, r)| **r >= 0.0)
            .flat_map(|(v, _)| v.iter())
            .fold(0.0_f64, |acc, c| acc.max(c.abs()))
    }

    /// Change the frame count, keeping values at indices still in range.
    pub(crate) fn set_frame_number(&mut self, frames: usize) {
        self.values.resize(frames, [0.0; 3]);
        self.residuals.resize(frames, 0.0);
        self.masks.resize(frames, 0);
    }
}

impl Labelled for Point {
    fn label(&self) -> &str {
        &self.label
    }
}
