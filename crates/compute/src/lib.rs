pub mod analysis;
pub mod scales;

pub use scales::*;
