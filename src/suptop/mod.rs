//! The superimposed topology: the partial mapping between two ligands and
//! every invariant-preserving mutation, filter, and query it supports.

mod align;
mod charges;
mod filters;
mod ids;
mod mapping;

pub use charges::validate_charges;
pub use mapping::{InternalIds, LogEntry, Pair, SuperimposedTopology};
