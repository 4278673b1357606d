pub mod geojson;
pub mod normalize;
pub mod synthetic;
pub mod tabular;

pub use geojson::*;
pub use normalize::*;
pub use synthetic::*;
pub use tabular::*;
