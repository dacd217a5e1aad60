#![doc = include_str!("../README.md")]

#[macro_use]
mod common_parser;

pub mod csv;
mod error;
pub mod formats;
mod helper_functions;
pub mod mass;
pub mod mass_error;
pub mod modification;
pub mod peptide;
pub mod processing;
pub mod protein;
pub mod ranking;
mod search_hit;
mod search_tool;
pub mod selection;
pub mod writer;

pub use common_parser::{FormatHit, FormatVersion};
pub use error::*;
pub use search_hit::*;
pub use search_tool::*;

/// A subset of the types and traits that are envisioned to be used the most, importing this is a good starting point for working with the crate
pub mod prelude {
    pub use crate::error::{ErrorLog, SynopsisError, SynopsisResult};
    pub use crate::modification::{
        ModificationDefinition, ModificationRegistry, load_modification_definitions,
    };
    pub use crate::peptide::NormalizedPeptide;
    pub use crate::processing::{
        ProcessingOptions, ProcessingStatus, ProcessingSummary, process_file, process_files,
        process_reader,
    };
    pub use crate::protein::ProteinMapper;
    pub use crate::search_hit::SearchHit;
    pub use crate::search_tool::SearchTool;
    pub use crate::selection::{MatchSelector, OutputMode, SynopsisThresholds, ThresholdPredicate};
    pub use crate::writer::{CanonicalPeptideRecord, SynopsisWriter};
}
