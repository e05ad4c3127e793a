//! Data objects flowing between process objects.

use crate::error::{MocapError, Result};
use crate::metadata::MetaData;
use crate::model::{Acquisition, AnalogCollection, EventCollection, PointCollection};
use std::fmt;

/// Kind of a data object, used for port typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Acquisition,
    Points,
    Analogs,
    Events,
    MetaData,
    /// Port accepting every kind
    Any,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Acquisition => "Acquisition",
            DataKind::Points => "PointCollection",
            DataKind::Analogs => "AnalogCollection",
            DataKind::Events => "EventCollection",
            DataKind::MetaData => "MetaData",
            DataKind::Any => "Any",
        };
        f.write_str(name)
    }
}

/// Output of a process object.
///
/// Produced outputs are handed out as `Rc<DataObject>` and are read-only for
/// consumers; take a clone to modify one.
#[derive(Debug, Clone)]
pub enum DataObject {
    Acquisition(Acquisition),
    Points(PointCollection),
    Analogs(AnalogCollection),
    Events(EventCollection),
    MetaData(MetaData),
}

impl DataObject {
    pub fn kind(&self) -> DataKind {
        match self {
            DataObject::Acquisition(_) => DataKind::Acquisition,
            DataObject::Points(_) => DataKind::Points,
            DataObject::Analogs(_) => DataKind::Analogs,
            DataObject::Events(_) => DataKind::Events,
            DataObject::MetaData(_) => DataKind::MetaData,
        }
    }

    /// Empty object of `kind`; `Any` yields an acquisition
    pub fn empty(kind: DataKind) -> Self {
        match kind {
            DataKind::Acquisition | DataKind::Any => DataObject::Acquisition(Acquisition::new()),
            DataKind::Points => DataObject::Points(PointCollection::new()),
            DataKind::Analogs => DataObject::Analogs(AnalogCollection::new()),
            DataKind::Events => DataObject::Events(EventCollection::new()),
            DataKind::MetaData => DataObject::MetaData(MetaData::default()),
        }
    }

    fn mismatch(&self, requested: DataKind) -> MocapError {
        MocapError::TypeMismatch(format!("{} requested from a {}", requested, self.kind()))
    }

    pub fn acquisition(&self) -> Result<&Acquisition> {
        match self {
            DataObject::Acquisition(acq) => Ok(acq),
            other => Err(other.mismatch(DataKind::Acquisition)),
        }
    }

    pub fn acquisition_mut(&mut self) -> Result<&mut Acquisition> {
        match self {
            DataObject::Acquisition(acq) => Ok(acq),
            other => Err(other.mismatch(DataKind::Acquisition)),
        }
    }

    pub fn points(&self) -> Result<&PointCollection> {
        match self {
            DataObject::Points(points) => Ok(points),
            DataObject::Acquisition(acq) => Ok(acq.points()),
            other => Err(other.mismatch(DataKind::Points)),
        }
    }

    pub fn analogs(&self) -> Result<&AnalogCollection> {
        match self {
            DataObject::Analogs(analogs) => Ok(analogs),
            DataObject::Acquisition(acq) => Ok(acq.analogs()),
            other => Err(other.mismatch(DataKind::Analogs)),
        }
    }

    pub fn events(&self) -> Result<&EventCollection> {
        match self {
            DataObject::Events(events) => Ok(events),
            DataObject::Acquisition(acq) => Ok(acq.events()),
            other => Err(other.mismatch(DataKind::Events)),
        }
    }

    pub fn metadata(&self) -> Result<&MetaData> {
        match self {
            DataObject::MetaData(md) => Ok(md),
            DataObject::Acquisition(acq) => Ok(acq.metadata()),
            other => Err(other.mismatch(DataKind::MetaData)),
        }
    }
}

impl From<Acquisition> for DataObject {
    fn from(acq: Acquisition) -> Self {
        DataObject::Acquisition(acq)
    }
}

impl From<MetaData> for DataObject {
    fn from(md: MetaData) -> Self {
        DataObject::MetaData(md)
    }
}
