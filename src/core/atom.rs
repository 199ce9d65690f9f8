//! Atom and bond-order types for ligand topologies.
//!
//! Atoms carry the chemistry attributes used by the superimposition search:
//! the force-field type, the element derived from it, the partial charge, and
//! the 3D position. Atoms are identified by their dense index within a
//! [`Topology`](crate::core::topology::Topology); the `id` field preserves the
//! identifier assigned by the external reader.

use super::elements::{Element, UnknownAtomTypeError, element_from_type};
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Discrete bond multiplicities carried on topology edges.
///
/// The order is opaque to the search itself; it is compared across the two
/// sides by the bond-mismatch filter and emitted in the dual-topology bond
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    /// A single bond.
    Single,
    /// A double bond.
    Double,
    /// A triple bond.
    Triple,
    /// An aromatic bond.
    Aromatic,
}

/// Error returned when parsing a bond order string that does not match the enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bond order: '{0}'")]
pub struct ParseBondOrderError(String);

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Single" => Ok(Self::Single),
            "Double" => Ok(Self::Double),
            "Triple" => Ok(Self::Triple),
            "Aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError(s.to_string())),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// An atom of a ligand topology.
///
/// `name` and `atom_type` are canonicalized to uppercase at construction and
/// the element is derived from the type. `original_charge` records the charge
/// as read from the input and is never modified afterwards, so the charge
/// drift introduced by redistribution remains observable.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Identifier assigned by the external reader, unique within its ligand.
    pub id: usize,
    /// Atom name, uppercase, unique within its ligand.
    pub name: String,
    /// Force-field atom type, uppercase.
    pub atom_type: String,
    /// Chemical element derived from the force-field type.
    pub element: Element,
    /// Current partial charge in electron units.
    pub charge: f64,
    /// Partial charge as read from the input; immutable after construction.
    pub original_charge: f64,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
    /// Residue name this atom belongs to.
    pub resname: String,
}

impl Atom {
    /// Creates an atom, canonicalizing the name and type and deriving the element.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAtomTypeError`] when the force-field type is not in
    /// the recognized alphabet.
    pub fn new(id: usize, name: &str, atom_type: &str, charge: f64) -> Result<Self, UnknownAtomTypeError> {
        let atom_type = atom_type.to_uppercase();
        let element = element_from_type(&atom_type)?;
        Ok(Self {
            id,
            name: name.to_uppercase(),
            atom_type,
            element,
            charge,
            original_charge: charge,
            position: Point3::origin(),
            resname: String::new(),
        })
    }

    /// Whether this atom is a hydrogen.
    pub fn is_hydrogen(&self) -> bool {
        self.element == Element::H
    }

    /// Whether the two atoms agree at the element level.
    pub fn same_element(&self, other: &Atom) -> bool {
        self.element == other.element
    }

    /// Whether the two atoms carry the exact same force-field type.
    pub fn same_type(&self, other: &Atom) -> bool {
        self.atom_type == other.atom_type
    }

    /// Whether the two charges agree within the absolute tolerance.
    pub fn charge_eq(&self, other: &Atom, atol: f64) -> bool {
        (self.charge - other.charge).abs() <= atol
    }
}
