//! Aggregate root of one recording session.

use super::analog::Analog;
use super::collection::Collection;
use super::event::Event;
use super::point::{Point, PointType};
use crate::error::{MocapError, Result};
use crate::metadata::{MetaData, ROOT_LABEL};
use std::collections::HashMap;

pub type PointCollection = Collection<Point>;
pub type AnalogCollection = Collection<Analog>;
pub type EventCollection = Collection<Event>;

/// Prefix of generated entity labels (`uname*1`, `uname*2`...)
pub const DEFAULT_LABEL_PREFIX: &str = "uname*";

fn default_unit(point_type: PointType) -> &'static str {
    match point_type {
        PointType::Marker | PointType::VirtualMarker | PointType::VirtualMarkerForFrame => "mm",
        PointType::Angle => "deg",
        PointType::Force => "N",
        PointType::Moment => "Nmm",
        PointType::Power => "W",
        PointType::Scalar | PointType::Reaction => "",
    }
}

/// Points, analogs, events and the metadata tree of one acquisition.
///
/// Every point holds [`point_frame_number`](Self::point_frame_number) frames
/// and every analog `point_frame_number * analog_ratio` samples. The sizing
/// operations ([`init`](Self::init), [`resize`](Self::resize)) keep that
/// relation; [`validate`](Self::validate) checks it after direct edits.
#[derive(Debug, Clone)]
pub struct Acquisition {
    metadata: MetaData,
    points: PointCollection,
    analogs: AnalogCollection,
    events: EventCollection,
    first_frame: i32,
    point_frequency: f64,
    analog_ratio: usize,
    point_frames: usize,
    max_interpolation_gap: i32,
    point_units: HashMap<PointType, String>,
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new()
    }
}

impl Acquisition {
    pub fn new() -> Self {
        Self {
            metadata: MetaData::new(ROOT_LABEL),
            points: Collection::new(),
            analogs: Collection::new(),
            events: Collection::new(),
            first_frame: 1,
            point_frequency: 0.0,
            analog_ratio: 1,
            point_frames: 0,
            max_interpolation_gap: 0,
            point_units: HashMap::new(),
        }
    }

    /// Drop all content and return to the freshly constructed state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Discard the entities and allocate zeroed ones.
    ///
    /// Metadata, events and frequencies are kept.
    pub fn init(&mut self, points: usize, frames: usize, analogs: usize, ratio: usize) {
        self.points.clear();
        self.analogs.clear();
        self.resize(points, frames, analogs, ratio);
    }

    /// Resize every entity, keeping values at indices still in range.
    ///
    /// New entities are zero filled and labelled `uname*N` with `N` their
    /// 1-based position.
    pub fn resize(&mut self, points: usize, frames: usize, analogs: usize, ratio: usize) {
        let ratio = if ratio == 0 {
            tracing::warn!("Analog sample number per point frame set to 1 instead of 0");
            1
        } else {
            ratio
        };
        self.point_frames = frames;
        self.analog_ratio = ratio;
        let analog_frames = frames * ratio;

        self.points.truncate(points);
        for point in self.points.iter_mut() {
            point.set_frame_number(frames);
        }
        for idx in self.points.len()..points {
            self.points.insert_item(Point::new(
                format!("{}{}", DEFAULT_LABEL_PREFIX, idx + 1),
                frames,
                PointType::Marker,
            ));
        }

        self.analogs.truncate(analogs);
        for analog in self.analogs.iter_mut() {
            analog.set_frame_number(analog_frames);
        }
        for idx in self.analogs.len()..analogs {
            self.analogs.insert_item(Analog::new(
                format!("{}{}", DEFAULT_LABEL_PREFIX, idx + 1),
                analog_frames,
            ));
        }
    }

    /// Change the frame count of every entity, keeping the ratio
    pub fn set_point_frame_number(&mut self, frames: usize) {
        self.resize(self.points.len(), frames, self.analogs.len(), self.analog_ratio);
    }

    /// Change the analog oversampling, keeping the point frame count
    pub fn set_analog_ratio(&mut self, ratio: usize) {
        self.resize(self.points.len(), self.point_frames, self.analogs.len(), ratio);
    }

    // ── Metadata ──

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetaData {
        &mut self.metadata
    }

    pub fn set_metadata(&mut self, metadata: MetaData) {
        self.metadata = metadata;
    }

    // ── Frames and frequencies ──

    pub fn first_frame(&self) -> i32 {
        self.first_frame
    }

    /// Index of the first frame; must be at least 1
    pub fn set_first_frame(&mut self, first_frame: i32) -> Result<()> {
        if first_frame <= 0 {
            return Err(MocapError::Domain(format!(
                "First frame must be positive, got {}",
                first_frame
            )));
        }
        self.first_frame = first_frame;
        Ok(())
    }

    pub fn last_frame(&self) -> i32 {
        self.first_frame + self.point_frames as i32 - 1
    }

    pub fn point_frame_number(&self) -> usize {
        self.point_frames
    }

    pub fn analog_frame_number(&self) -> usize {
        self.point_frames * self.analog_ratio
    }

    /// Analog samples per point frame
    pub fn analog_ratio(&self) -> usize {
        self.analog_ratio
    }

    pub fn point_frequency(&self) -> f64 {
        self.point_frequency
    }

    pub fn set_point_frequency(&mut self, frequency: f64) {
        self.point_frequency = frequency;
    }

    pub fn analog_frequency(&self) -> f64 {
        self.point_frequency * self.analog_ratio as f64
    }

    /// Duration in seconds, 0 when the frequency is unknown
    pub fn duration(&self) -> f64 {
        if self.point_frequency > 0.0 {
            self.point_frames as f64 / self.point_frequency
        } else {
            0.0
        }
    }

    pub fn max_interpolation_gap(&self) -> i32 {
        self.max_interpolation_gap
    }

    pub fn set_max_interpolation_gap(&mut self, gap: i32) {
        self.max_interpolation_gap = gap;
    }

    pub fn point_unit(&self, point_type: PointType) -> &str {
        self.point_units
            .get(&point_type)
            .map(String::as_str)
            .unwrap_or_else(|| default_unit(point_type))
    }

    pub fn set_point_unit(&mut self, point_type: PointType, unit: impl Into<String>) {
        self.point_units.insert(point_type, unit.into());
    }

    // ── Points ──

    pub fn points(&self) -> &PointCollection {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut PointCollection {
        &mut self.points
    }

    pub fn point_number(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, idx: usize) -> Result<&Point> {
        self.points.item(idx)
    }

    pub fn point_mut(&mut self, idx: usize) -> Result<&mut Point> {
        self.points.item_mut(idx)
    }

    pub fn find_point(&self, label: &str) -> Option<&Point> {
        self.points.find_item(label)
    }

    /// Append a point; its frame count must match the acquisition
    pub fn append_point(&mut self, point: Point) -> Result<()> {
        if point.frame_number() != self.point_frames {
            return Err(MocapError::Consistency(format!(
                "Point '{}' has {} frames, the acquisition has {}",
                point.label(),
                point.frame_number(),
                self.point_frames
            )));
        }
        self.points.insert_item(point);
        Ok(())
    }

    // ── Analogs ──

    pub fn analogs(&self) -> &AnalogCollection {
        &self.analogs
    }

    pub fn analogs_mut(&mut self) -> &mut AnalogCollection {
        &mut self.analogs
    }

    pub fn analog_number(&self) -> usize {
        self.analogs.len()
    }

    pub fn analog(&self, idx: usize) -> Result<&Analog> {
        self.analogs.item(idx)
    }

    pub fn analog_mut(&mut self, idx: usize) -> Result<&mut Analog> {
        self.analogs.item_mut(idx)
    }

    pub fn find_analog(&self, label: &str) -> Option<&Analog> {
        self.analogs.find_item(label)
    }

    /// Append an analog channel; its sample count must match the acquisition
    pub fn append_analog(&mut self, analog: Analog) -> Result<()> {
        if analog.frame_number() != self.analog_frame_number() {
            return Err(MocapError::Consistency(format!(
                "Analog '{}' has {} samples, the acquisition has {}",
                analog.label(),
                analog.frame_number(),
                self.analog_frame_number()
            )));
        }
        self.analogs.insert_item(analog);
        Ok(())
    }

    // ── Events ──

    pub fn events(&self) -> &EventCollection {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventCollection {
        &mut self.events
    }

    pub fn event_number(&self) -> usize {
        self.events.len()
    }

    pub fn event(&self, idx: usize) -> Result<&Event> {
        self.events.item(idx)
    }

    pub fn append_event(&mut self, event: Event) {
        self.events.insert_item(event);
    }

    /// Check that every entity agrees with the aggregate frame counts
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self
            .points
            .iter()
            .find(|p| p.frame_number() != self.point_frames)
        {
            return Err(MocapError::Consistency(format!(
                "Point '{}' has {} frames instead of {}",
                p.label(),
                p.frame_number(),
                self.point_frames
            )));
        }
        let analog_frames = self.analog_frame_number();
        if let Some(a) = self
            .analogs
            .iter()
            .find(|a| a.frame_number() != analog_frames)
        {
            return Err(MocapError::Consistency(format!(
                "Analog '{}' has {} samples instead of {} ({} frames x {})",
                a.label(),
                a.frame_number(),
                analog_frames,
                self.point_frames,
                self.analog_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_acquisition_is_empty() {
        let acq = Acquisition::new();
        assert_eq!(acq.metadata().label(), "ROOT");
        assert_eq!(acq.first_frame(), 1);
        assert_eq!(acq.point_frequency(), 0.0);
        assert_eq!(acq.analog_ratio(), 1);
        assert_eq!(acq.point_number(), 0);
        assert_eq!(acq.point_frame_number(), 0);
        assert_eq!(acq.duration(), 0.0);
        assert!(acq.validate().is_ok());
    }

    #[test]
    fn test_init_labels_and_sizes() {
        let mut acq = Acquisition::new();
        acq.init(2, 10, 3, 4);
        assert_eq!(acq.points().labels(), vec!["uname*1", "uname*2"]);
        assert_eq!(acq.analog(2).unwrap().label(), "uname*3");
        assert_eq!(acq.analog(0).unwrap().frame_number(), 40);
        assert_eq!(acq.last_frame(), 10);
        acq.set_point_frequency(50.0);
        assert_eq!(acq.analog_frequency(), 200.0);
        assert_eq!(acq.duration(), 0.2);
    }

    #[test]
    fn test_zero_ratio_clamps() {
        let mut acq = Acquisition::new();
        acq.init(0, 5, 1, 0);
        assert_eq!(acq.analog_ratio(), 1);
        assert_eq!(acq.analog_frame_number(), 5);
    }

    #[test]
    fn test_append_checks_frames() {
        let mut acq = Acquisition::new();
        acq.init(0, 5, 0, 2);
        assert!(acq.append_point(Point::new("A", 5, PointType::Marker)).is_ok());
        assert!(matches!(
            acq.append_point(Point::new("B", 4, PointType::Marker)),
            Err(MocapError::Consistency(_))
        ));
        assert!(acq.append_analog(Analog::new("FX", 10)).is_ok());
        assert!(acq.append_analog(Analog::new("FY", 5)).is_err());
        assert_eq!(acq.find_analog("FX").unwrap().frame_number(), 10);
    }

    #[test]
    fn test_validate_detects_mismatch() {
        let mut acq = Acquisition::new();
        acq.init(1, 3, 0, 1);
        acq.points_mut().insert_item(Point::new("bad", 7, PointType::Marker));
        assert!(matches!(acq.validate(), Err(MocapError::Consistency(_))));
    }

    #[test]
    fn test_first_frame_must_be_positive() {
        let mut acq = Acquisition::new();
        assert!(acq.set_first_frame(0).is_err());
        acq.set_first_frame(12).unwrap();
        acq.init(1, 10, 0, 1);
        assert_eq!(acq.last_frame(), 21);
    }

    #[test]
    fn test_point_units_default() {
        let mut acq = Acquisition::new();
        assert_eq!(acq.point_unit(PointType::Marker), "mm");
        assert_eq!(acq.point_unit(PointType::Moment), "Nmm");
        acq.set_point_unit(PointType::Marker, "m");
        assert_eq!(acq.point_unit(PointType::Marker), "m");
    }

    proptest! {
        #[test]
        fn prop_resize_preserves_in_range_values(
            points in 1usize..5,
            frames in 1usize..20,
            analogs in 1usize..4,
            ratio in 1usize..5,
            new_points in 0usize..6,
            new_frames in 0usize..25,
            new_analogs in 0usize..5,
            new_ratio in 1usize..6,
        ) {
            let mut acq = Acquisition::new();
            acq.init(points, frames, analogs, ratio);
            for p in 0..points {
                for f in 0..frames {
                    let v = (p * 1000 + f) as f64;
                    acq.point_mut(p).unwrap().set_value(f, [v, -v, 0.5 * v]).unwrap();
                }
            }
            for a in 0..analogs {
                for s in 0..frames * ratio {
                    acq.analog_mut(a).unwrap().set_value(s, (a * 1000 + s) as f64).unwrap();
                }
            }

            acq.resize(new_points, new_frames, new_analogs, new_ratio);

            prop_assert_eq!(acq.point_number(), new_points);
            prop_assert_eq!(acq.analog_number(), new_analogs);
            prop_assert_eq!(acq.analog_frame_number(), acq.point_frame_number() * new_ratio);
            prop_assert!(acq.validate().is_ok());
            for p in 0..points.min(new_points) {
                for f in 0..frames.min(new_frames) {
                    let v = (p * 1000 + f) as f64;
                    prop_assert_eq!(acq.point(p).unwrap().value(f).unwrap(), [v, -v, 0.5 * v]);
                }
            }
            for a in 0..analogs.min(new_analogs) {
                for s in 0..(frames * ratio).min(new_frames * new_ratio) {
                    prop_assert_eq!(acq.analog(a).unwrap().value(s).unwrap(), (a * 1000 + s) as f64);
                }
            }
        }
    }
}
