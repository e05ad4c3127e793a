//! Measurement model: points, analogs, events and the acquisition holding them.
//!
//! # Architecture
//!
//! ```text
//! Acquisition
//!   ├── MetaData "ROOT"
//!   ├── PointCollection   ── Rc<Point>   (frames)
//!   ├── AnalogCollection  ── Rc<Analog>  (frames x analog ratio)
//!   └── EventCollection   ── Rc<Event>
//! ```

pub mod acquisition;
pub mod analog;
pub mod collection;
pub mod event;
pub mod point;

pub use acquisition::{
    Acquisition, AnalogCollection, EventCollection, PointCollection, DEFAULT_LABEL_PREFIX,
};
pub use analog::{Analog, AnalogGain, DEFAULT_ANALOG_UNIT};
pub use collection::{Collection, Labelled};
pub use event::{Event, EventContext};
pub use point::{Point, PointType};
