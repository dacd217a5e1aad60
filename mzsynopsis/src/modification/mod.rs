//! Modification definitions and the registry used to resolve modifications as reported by search tools

mod definition;
mod load;
mod registry;

pub use definition::*;
pub use load::*;
pub use registry::*;
