// This module re-exports the configuration pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod backend;
pub mod config;
pub mod logging;
pub mod usage;

pub use backend::*;
pub use config::*;
pub use logging::*;
pub use usage::*;
