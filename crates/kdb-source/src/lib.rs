pub mod error;
pub mod guard;
pub mod memory;
pub mod traits;

pub use error::*;
pub use guard::*;
pub use memory::*;
pub use traits::*;
