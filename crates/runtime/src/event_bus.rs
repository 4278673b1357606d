use std::cell::RefCell;
use std::rc::Rc;

use crate::observable::ContainerId;

/// A container was replaced with a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub container: ContainerId,
    pub name: &'static str,
    /// Version the container reached with this change.
    pub version: u64,
}

/// Append-only log of container changes, drained by the [`Scheduler`].
///
/// [`Scheduler`]: crate::scheduler::Scheduler
#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

/// Shared handle every container of one state context writes to.
pub type ChangeBus = Rc<RefCell<EventBus>>;

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn shared() -> ChangeBus {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn emit(&mut self, container: ContainerId, name: &'static str, version: u64) {
        self.events.push(Event {
            container,
            name,
            version,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
