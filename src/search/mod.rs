//! The maximum-common-substructure search: seed selection, the recursive
//! overlay kernel, and the resolution of symmetric branch results.

mod combine;
mod overlay;
mod seeds;

pub(crate) use combine::extract_best;
pub(crate) use overlay::overlay;
pub(crate) use seeds::{cartesian_product, starting_configurations};

/// Knobs the kernel consults while growing a mapping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchSettings {
    /// Match atoms by element rather than by exact force-field type.
    pub use_element_type: bool,
    /// Rank ambiguous branches by aligned RMSD; otherwise pick the first.
    pub use_coords: bool,
}
