#![doc = include_str!("../README.md")]

mod core;
mod pipeline;
mod search;
mod suptop;

pub use crate::core::atom::{Atom, BondOrder};
pub use crate::core::elements::{Element, UnknownAtomTypeError, element_from_type};
pub use crate::core::error::{LigandValidationError, NormalizationError, SuperimposeError};
pub use crate::core::topology::{LigandPair, Topology};

pub use crate::suptop::{InternalIds, LogEntry, Pair, SuperimposedTopology, validate_charges};

pub use crate::pipeline::{SuperimposeConfig, superimpose_topologies};
