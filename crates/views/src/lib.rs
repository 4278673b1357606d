//! Derived views over the loaded tract data, and the state context that keeps
//! them current as filters and selections change.

pub mod indicator;
pub mod join;
pub mod scatter;
pub mod selection;
pub mod state;

pub use indicator::{IndicatorScatter, indicator_scatter};
pub use join::{TractIndex, TractJoin};
pub use scatter::{InvestorScatter, MeanPoint, ScatterPoint, TrajectoryPoint, primary_scatter};
pub use selection::{SelectionView, TractSelection, active_selection};
pub use state::{AtlasState, StateSnapshot};
