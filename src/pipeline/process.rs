//! Process objects and the lazy update protocol.
//!
//! A process object has a fixed number of input and output slots declared by
//! static [`PortDescriptor`] arrays. Inputs are non-owning links to an output
//! of an upstream process object; outputs are owned by the process object that
//! produces them and handed to consumers as `Rc<DataObject>`.
//!
//! # Update
//!
//! [`ProcessObject::update`] walks the inputs depth first, updating every
//! producer before deciding whether this node is stale. A node is stale when
//! it has never executed, when it was modified after its last execution, or
//! when the stamp of an upstream output differs from the one recorded at the
//! last execution. Producers shared by several consumers (diamonds) execute
//! once: later visits find them up to date.
//!
//! Data generation runs on working copies of the outputs. They replace the
//! published outputs only on success, so a failed execution leaves both the
//! outputs and the stamps untouched and the next update retries.

use crate::error::{MocapError, Result};
use crate::pipeline::data::DataObject;
use crate::pipeline::id::{Clock, TimeStamp};
use crate::pipeline::port::PortDescriptor;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared handle used to connect process objects
pub type ProcessHandle = Rc<RefCell<dyn ProcessObject>>;

/// Wrap a process object so that it can feed other process objects.
pub fn shared<P: ProcessObject + 'static>(process: P) -> Rc<RefCell<P>> {
    Rc::new(RefCell::new(process))
}

struct InputLink {
    producer: Weak<RefCell<dyn ProcessObject>>,
    output: usize,
    /// Producer output stamp consumed by the last execution
    seen: TimeStamp,
}

/// Bookkeeping shared by every process object: slots, clock and stamps.
pub struct ProcessCore {
    input_ports: &'static [PortDescriptor],
    output_ports: &'static [PortDescriptor],
    inputs: Vec<Option<InputLink>>,
    outputs: Vec<Option<Rc<DataObject>>>,
    executed: Vec<TimeStamp>,
    clock: Clock,
    mtime: TimeStamp,
    last_execution: TimeStamp,
}

impl ProcessCore {
    pub fn new(
        input_ports: &'static [PortDescriptor],
        output_ports: &'static [PortDescriptor],
    ) -> Self {
        Self {
            input_ports,
            output_ports,
            inputs: input_ports.iter().map(|_| None).collect(),
            outputs: vec![None; output_ports.len()],
            executed: vec![TimeStamp::NEVER; output_ports.len()],
            clock: Clock::new(),
            mtime: TimeStamp::NEVER,
            last_execution: TimeStamp::NEVER,
        }
    }

    pub fn input_ports(&self) -> &'static [PortDescriptor] {
        self.input_ports
    }

    pub fn output_ports(&self) -> &'static [PortDescriptor] {
        self.output_ports
    }

    pub fn input_number(&self) -> usize {
        self.input_ports.len()
    }

    pub fn output_number(&self) -> usize {
        self.output_ports.len()
    }

    pub fn is_connected(&self, idx: usize) -> bool {
        matches!(self.inputs.get(idx), Some(Some(_)))
    }

    /// Time of the last modification
    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }

    /// Time of the last successful execution
    pub fn last_execution(&self) -> TimeStamp {
        self.last_execution
    }

    /// Time at which output `idx` was last produced
    pub fn output_stamp(&self, idx: usize) -> Result<TimeStamp> {
        self.executed
            .get(idx)
            .copied()
            .ok_or_else(|| MocapError::out_of_range(idx, self.executed.len()))
    }

    /// Output `idx` as last produced, without updating
    pub fn cached_output(&self, idx: usize) -> Option<&Rc<DataObject>> {
        self.outputs.get(idx).and_then(Option::as_ref)
    }

    fn touch(&mut self) {
        self.mtime = self.clock.tick();
    }

    fn commit(&mut self, outputs: Vec<DataObject>, consumed: Vec<TimeStamp>) {
        let now = self.clock.tick();
        self.outputs = outputs.into_iter().map(|d| Some(Rc::new(d))).collect();
        self.executed.iter_mut().for_each(|s| *s = now);
        self.last_execution = now;
        for (link, stamp) in self.inputs.iter_mut().zip(consumed) {
            if let Some(link) = link {
                link.seen = stamp;
            }
        }
    }
}

impl fmt::Debug for ProcessCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessCore")
            .field("inputs", &self.inputs.len())
            .field("connected", &self.inputs.iter().filter(|i| i.is_some()).count())
            .field("outputs", &self.outputs.len())
            .field("mtime", &self.mtime)
            .field("last_execution", &self.last_execution)
            .finish()
    }
}

/// Pipeline node with typed inputs/outputs and lazy recomputation.
///
/// Implementors embed a [`ProcessCore`] and provide the two hooks
/// [`make_output`](Self::make_output) and
/// [`generate_data`](Self::generate_data). Setters changing the behaviour of
/// an implementor must call [`modified`](Self::modified).
pub trait ProcessObject {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    fn core(&self) -> &ProcessCore;

    fn core_mut(&mut self) -> &mut ProcessCore;

    /// Allocate output `idx` the first time it is needed
    fn make_output(&self, idx: usize) -> DataObject {
        DataObject::empty(self.core().output_ports()[idx].kind)
    }

    /// Compute the outputs from the inputs.
    ///
    /// `inputs` holds the upstream outputs (`None` for unconnected slots);
    /// `outputs` holds working copies of this node's previous outputs.
    fn generate_data(
        &mut self,
        inputs: &[Option<Rc<DataObject>>],
        outputs: &mut [DataObject],
    ) -> Result<()>;

    fn input_number(&self) -> usize {
        self.core().input_number()
    }

    fn output_number(&self) -> usize {
        self.core().output_number()
    }

    /// Mark the node as changed so the next update re-executes it
    fn modified(&mut self) {
        self.core_mut().touch();
    }

    /// Connect input `idx` to output `output` of `producer`
    fn set_nth_input(&mut self, idx: usize, producer: ProcessHandle, output: usize) -> Result<()> {
        let inputs = self.core().input_number();
        if idx >= inputs {
            return Err(MocapError::out_of_range(idx, inputs));
        }
        let outputs = producer
            .try_borrow()
            .map_err(|_| {
                MocapError::Pipeline(format!(
                    "Cannot connect input #{} of '{}': the producer is busy",
                    idx,
                    self.name()
                ))
            })?
            .output_number();
        if output >= outputs {
            return Err(MocapError::out_of_range(output, outputs));
        }
        self.core_mut().inputs[idx] = Some(InputLink {
            producer: Rc::downgrade(&producer),
            output,
            seen: TimeStamp::NEVER,
        });
        self.modified();
        Ok(())
    }

    /// Disconnect input `idx`
    fn remove_nth_input(&mut self, idx: usize) -> Result<()> {
        let inputs = self.core().input_number();
        if idx >= inputs {
            return Err(MocapError::out_of_range(idx, inputs));
        }
        if self.core_mut().inputs[idx].take().is_some() {
            self.modified();
        }
        Ok(())
    }

    /// Producer and output index connected to input `idx`, if still alive
    fn nth_input(&self, idx: usize) -> Option<(ProcessHandle, usize)> {
        let link = self.core().inputs.get(idx)?.as_ref()?;
        link.producer.upgrade().map(|p| (p, link.output))
    }

    /// Output `idx`, brought up to date first
    fn get_nth_output(&mut self, idx: usize) -> Result<Rc<DataObject>> {
        let outputs = self.core().output_number();
        if idx >= outputs {
            return Err(MocapError::out_of_range(idx, outputs));
        }
        self.update()?;
        self.core().outputs[idx].clone().ok_or_else(|| {
            MocapError::Pipeline(format!("Output #{} of '{}' was not produced", idx, self.name()))
        })
    }

    /// Bring the upstream graph and this node up to date
    fn update(&mut self) -> Result<()> {
        let count = self.core().input_number();
        let mut inputs: Vec<Option<Rc<DataObject>>> = Vec::with_capacity(count);
        let mut consumed: Vec<TimeStamp> = Vec::with_capacity(count);
        let core = self.core();
        let mut stale = !core.last_execution.is_set() || core.mtime > core.last_execution;

        for idx in 0..count {
            let (link, output, seen) = match &self.core().inputs[idx] {
                Some(link) => (link.producer.clone(), link.output, link.seen),
                None => {
                    inputs.push(None);
                    consumed.push(TimeStamp::NEVER);
                    continue;
                }
            };
            let handle = link.upgrade().ok_or_else(|| {
                MocapError::Pipeline(format!(
                    "Input #{} of '{}' is disconnected: its producer was dropped",
                    idx,
                    self.name()
                ))
            })?;
            let mut upstream = handle.try_borrow_mut().map_err(|_| {
                MocapError::Pipeline(format!(
                    "Cycle detected while updating input #{} of '{}'",
                    idx,
                    self.name()
                ))
            })?;
            let data = upstream.get_nth_output(output)?;
            let stamp = upstream.core().output_stamp(output)?;
            let port = &self.core().input_ports()[idx];
            if !port.accepts(data.kind()) {
                return Err(MocapError::TypeMismatch(format!(
                    "Input '{}' of '{}' expects {}, got {}",
                    port.name,
                    self.name(),
                    port.kind,
                    data.kind()
                )));
            }
            stale |= stamp != seen;
            inputs.push(Some(data));
            consumed.push(stamp);
        }

        if !stale {
            tracing::trace!("'{}' is up to date", self.name());
            return Ok(());
        }

        let mut outputs: Vec<DataObject> = (0..self.core().output_number())
            .map(|idx| match self.core().outputs[idx].as_deref() {
                Some(previous) => previous.clone(),
                None => self.make_output(idx),
            })
            .collect();

        tracing::info!("Executing '{}'", self.name());
        self.generate_data(&inputs, &mut outputs)?;
        self.core_mut().commit(outputs, consumed);
        Ok(())
    }
}
