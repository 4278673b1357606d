pub mod event_bus;
pub mod job;
pub mod observable;
pub mod scheduler;

pub use event_bus::*;
pub use job::*;
pub use observable::*;
pub use scheduler::*;
