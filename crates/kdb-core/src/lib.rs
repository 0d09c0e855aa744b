pub mod ids;
pub mod layout;
pub mod names;

pub use ids::*;
pub use layout::*;
pub use names::*;
