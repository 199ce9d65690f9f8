//! Chemistry data model: elements, atoms, bonds, and ligand topologies.

pub mod atom;
pub mod elements;
pub mod error;
pub(crate) mod rings;
pub mod topology;

pub use atom::{Atom, BondOrder};
pub use elements::{Element, UnknownAtomTypeError, element_from_type};
pub use error::{LigandValidationError, NormalizationError, SuperimposeError};
pub use topology::{LigandPair, Topology};
