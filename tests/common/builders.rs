//! Test data builders for creating test acquisitions

use mocap_rs::{Acquisition, Event, PointType};

/// Builder for creating test Acquisitions
///
/// Points and analogs are filled with deterministic ramps so that decoded
/// values can be compared against [`point_value`] and [`analog_value`].
pub struct AcquisitionBuilder {
    points: usize,
    frames: usize,
    analogs: usize,
    ratio: usize,
    frequency: f64,
    labels: Vec<String>,
    angles: Vec<usize>,
    events: Vec<(String, f64, String)>,
    filled: bool,
}

/// Value stored by the builder at point `p`, frame `f`
pub fn point_value(p: usize, f: usize) -> [f64; 3] {
    let base = 100.0 * (p as f64 + 1.0) + 0.37 * f as f64;
    [base, -0.5 * base, 25.0 + (f % 7) as f64]
}

/// Value stored by the builder at analog `a`, sample `s`
pub fn analog_value(a: usize, s: usize) -> f64 {
    (a as f64 + 1.0) * ((s % 40) as f64 - 20.0) * 0.05
}

impl AcquisitionBuilder {
    pub fn new(points: usize, frames: usize) -> Self {
        Self {
            points,
            frames,
            analogs: 0,
            ratio: 1,
            frequency: 100.0,
            labels: Vec::new(),
            angles: Vec::new(),
            events: Vec::new(),
            filled: true,
        }
    }

    pub fn analogs(mut self, analogs: usize, ratio: usize) -> Self {
        self.analogs = analogs;
        self.ratio = ratio;
        self
    }

    pub fn frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Make point `idx` an angle
    pub fn angle(mut self, idx: usize) -> Self {
        self.angles.push(idx);
        self
    }

    pub fn event(mut self, label: &str, time: f64, context: &str) -> Self {
        self.events.push((label.to_string(), time, context.to_string()));
        self
    }

    /// Leave every sample at zero
    pub fn zeroed(mut self) -> Self {
        self.filled = false;
        self
    }

    pub fn build(self) -> Acquisition {
        let mut acq = Acquisition::new();
        acq.init(self.points, self.frames, self.analogs, self.ratio);
        acq.set_point_frequency(self.frequency);

        for (idx, point) in acq.points_mut().iter_mut().enumerate() {
            if let Some(label) = self.labels.get(idx) {
                point.set_label(label.clone());
            }
            if self.angles.contains(&idx) {
                point.set_point_type(PointType::Angle);
            }
            if self.filled {
                for f in 0..self.frames {
                    let residual = if f % 11 == 5 { -1.0 } else { 0.75 };
                    let mask = if residual < 0.0 { 0 } else { (f % 4) as u8 };
                    point
                        .set_frame(f, point_value(idx, f), residual, mask)
                        .unwrap();
                }
            }
        }

        if self.filled {
            for (idx, analog) in acq.analogs_mut().iter_mut().enumerate() {
                for (s, value) in analog.values_mut().iter_mut().enumerate() {
                    *value = analog_value(idx, s);
                }
            }
        }

        for (label, time, context) in self.events {
            let mut event = Event::new(label, time, context.as_str(), "", "");
            event.update_frame(self.frequency);
            acq.append_event(event);
        }
        acq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_builder() {
        let acq = AcquisitionBuilder::new(2, 10)
            .analogs(3, 4)
            .labels(&["RFT1"])
            .event("RIC", 0.05, "Right")
            .build();

        assert_eq!(acq.point_number(), 2);
        assert_eq!(acq.analog(0).unwrap().frame_number(), 40);
        assert_eq!(acq.point(0).unwrap().label(), "RFT1");
        assert_eq!(acq.point(1).unwrap().label(), "uname*2");
        assert_eq!(acq.point(0).unwrap().values()[3], point_value(0, 3));
        assert!(!acq.point(0).unwrap().is_valid(5));
        assert_eq!(acq.event(0).unwrap().frame(), Some(6));
    }
}
