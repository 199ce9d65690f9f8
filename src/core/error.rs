//! Error types describing the failure modes of input validation and the
//! superimposition pipeline.
//!
//! These enums aggregate lower-level issues so that library consumers can
//! bubble up a single `SuperimposeError` while still inspecting fine-grained
//! context when needed. Invariant violations caused by incorrect use of the
//! mutation API are programmer errors and panic instead.

use thiserror::Error;

/// Root error emitted by every fallible operation in the superimposition pipeline.
#[derive(Debug, Error)]
pub enum SuperimposeError {
    /// Validation of an input ligand failed before the search could start.
    #[error("invalid input ligand")]
    InvalidInput(#[from] LigandValidationError),

    /// Parsing of a TOML configuration payload did not succeed.
    #[error("failed to parse superimposition configuration")]
    ConfigParse(#[from] toml::de::Error),

    /// A post-search normalization step found an ambiguous structure.
    #[error("type normalization failed")]
    Normalization(#[from] NormalizationError),

    /// A named atom referenced by a configuration option does not exist.
    #[error("configuration references unknown atom name '{name}'")]
    UnknownAtomName {
        /// The atom name that could not be resolved on either side.
        name: String,
    },
}

/// Errors that describe structural or chemical issues with an input ligand.
///
/// These failures are detected before any searching is attempted so that
/// malformed inputs can be rejected early with precise diagnostics.
#[derive(Debug, Error)]
pub enum LigandValidationError {
    /// A bond references an atom identifier that is missing from the ligand.
    #[error("bond references a non-existent atom with ID {atom_id}")]
    MissingAtom {
        /// Identifier of the atom that could not be found.
        atom_id: usize,
    },

    /// A bond lists the same atom as both of its endpoints.
    #[error("atom with ID {atom_id} is bonded to itself")]
    SelfBondingAtom {
        /// Identifier of the atom that incorrectly lists a self-bond.
        atom_id: usize,
    },

    /// Two atoms within one ligand carry the same identifier.
    #[error("duplicate atom ID {atom_id} within one ligand")]
    DuplicateAtomId {
        /// The repeated identifier.
        atom_id: usize,
    },

    /// Two atoms within one ligand carry the same name.
    #[error("duplicate atom name '{name}' within one ligand")]
    DuplicateAtomName {
        /// The repeated name.
        name: String,
    },

    /// An atom name appears in both the left and the right ligand.
    #[error("atom name '{name}' appears in both ligands")]
    OverlappingAtomNames {
        /// The shared name.
        name: String,
    },

    /// A ligand's total charge does not round to an integer within 0.01 e.
    #[error("total charge {total:.4} of the {side} ligand is not integral")]
    NonIntegerTotalCharge {
        /// Which ligand failed the check ("left" or "right").
        side: &'static str,
        /// The offending charge sum.
        total: f64,
    },

    /// The two ligands carry different total charges.
    #[error("total charges differ: left {left:.4} vs right {right:.4}")]
    TotalChargeMismatch {
        /// Charge sum of the left ligand.
        left: f64,
        /// Charge sum of the right ligand.
        right: f64,
    },
}

/// Errors raised by the ring double-bond type normalization.
///
/// The CC/CD rewrite relies on mismatched pairs appearing in bonded couples;
/// any other arrangement indicates an input the rule cannot disambiguate.
#[derive(Debug, Error)]
pub enum NormalizationError {
    /// A CC/CD pair has more than one CC/CD neighbor, so the rewrite is ambiguous.
    #[error("pair {left_name}-{right_name} has multiple CC/CD neighbors")]
    AmbiguousRingBondTypes {
        /// Name of the left atom of the ambiguous pair.
        left_name: String,
        /// Name of the right atom of the ambiguous pair.
        right_name: String,
    },

    /// A CC/CD pair has no CC/CD neighbor to swap with.
    #[error("pair {left_name}-{right_name} has no CC/CD neighbor")]
    LoneRingBondType {
        /// Name of the left atom of the lone pair.
        left_name: String,
        /// Name of the right atom of the lone pair.
        right_name: String,
    },
}
