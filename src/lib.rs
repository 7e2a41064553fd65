pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod lineage;
pub mod readers;
pub mod types;
pub mod utils;

pub use error::{DesignationError, DesignationResult};
pub use lineage::{designate, designate_with, Designation, DesignationParams, Lineage, Outcome, PhyloTree};
pub use types::{Alignment, AncestralStates, Metadata, MetadataRecord, SequenceRow};
