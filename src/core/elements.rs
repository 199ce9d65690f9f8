//! Chemical elements recognized by the superimposer and the fixed mapping
//! from force-field atom types to elements.
//!
//! The type table covers the GAFF atom-type alphabet. Element identity is the
//! coarse equality used during the search when general-type matching is
//! enabled; the exact force-field type is re-imposed by a post-filter.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements that can appear in a ligand topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    /// Carbon.
    C,
    /// Hydrogen.
    H,
    /// Nitrogen.
    N,
    /// Oxygen.
    O,
    /// Phosphorus.
    P,
    /// Sulfur.
    S,
    /// Fluorine.
    F,
    /// Chlorine.
    Cl,
    /// Bromine.
    Br,
    /// Iodine.
    I,
}

/// Error returned when parsing an unknown element symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid element symbol: '{0}'")]
pub struct ParseElementError(String);

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Self::C),
            "H" => Ok(Self::H),
            "N" => Ok(Self::N),
            "O" => Ok(Self::O),
            "P" => Ok(Self::P),
            "S" => Ok(Self::S),
            "F" => Ok(Self::F),
            "Cl" => Ok(Self::Cl),
            "Br" => Ok(Self::Br),
            "I" => Ok(Self::I),
            _ => Err(ParseElementError(s.to_string())),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error returned when a force-field atom type is not in the recognized alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown force-field atom type: '{0}'")]
pub struct UnknownAtomTypeError(pub String);

/// Resolves a force-field atom type to its chemical element.
///
/// The table is total over the recognized GAFF-derived alphabet; any other
/// type is an input error. Lookup expects the canonical uppercase spelling.
///
/// # Errors
///
/// Returns [`UnknownAtomTypeError`] when the type is not in the table.
pub fn element_from_type(atom_type: &str) -> Result<Element, UnknownAtomTypeError> {
    let element = match atom_type {
        "C" | "CA" | "CB" | "C3" | "CX" | "C1" | "C2" | "CC" | "CD" | "CE" | "CF" | "CP"
        | "CQ" | "CU" | "CV" | "CY" | "CZ" | "CG" | "CS" | "CH" => Element::C,
        "H" | "HA" | "HN" | "H4" | "HC" | "H1" | "HX" | "HO" | "HS" | "HP" | "H2" | "H3"
        | "H5" => Element::H,
        "P2" | "P3" | "P4" | "P5" | "PB" | "PC" | "PD" | "PE" | "PF" | "PX" | "PY" => Element::P,
        "O" | "OH" | "OS" | "OP" | "OQ" => Element::O,
        "N" | "NB" | "NS" | "N1" | "N2" | "N3" | "N4" | "NA" | "NH" | "NO" | "NC" | "ND"
        | "NU" | "NE" | "NF" | "NT" | "NX" | "NY" | "NZ" | "N+" | "NV" | "N7" | "N8" | "N9"
        | "NI" | "NJ" | "NK" | "NL" | "NM" | "NN" | "NP" | "NQ" | "N5" | "N6" => Element::N,
        "CL" => Element::Cl,
        "F" => Element::F,
        "BR" | "B" => Element::Br,
        "I" => Element::I,
        "S" | "S2" | "SH" | "SS" | "S4" | "S6" | "SX" | "SY" | "SP" | "SQ" => Element::S,
        _ => return Err(UnknownAtomTypeError(atom_type.to_string())),
    };
    Ok(element)
}
