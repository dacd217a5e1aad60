//! The result formats of the supported search tools

mod inspect;
mod moda;
mod msfragger;
mod msgfplus;
mod sage;

pub use inspect::*;
pub use moda::*;
pub use msfragger::*;
pub use msgfplus::*;
pub use sage::*;

#[cfg(test)]
mod moda_tests;
#[cfg(test)]
mod sage_tests;
#[cfg(test)]
use test::{test_format, test_registry};
