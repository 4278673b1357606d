pub mod ids;
pub mod toggles;

// Foundation crate: key and toggle vocabulary shared by every layer.
pub use ids::*;
pub use toggles::*;
