//! Local backup tree: one current configuration file per (host, domain) and a
//! single flat quarantine directory holding the previous generation.

pub mod enumerate;
pub mod error;
pub mod tree;

pub use enumerate::*;
pub use error::*;
pub use tree::*;
