//! Ligand topologies: atoms, bonds, adjacency, and the precomputed cycle basis.
//!
//! A [`Topology`] is immutable in its connectivity after construction; atom
//! attributes (charges, positions, force-field types) stay mutable so that
//! the post-filter phase can normalize types, redistribute charges, and write
//! back aligned coordinates. Atoms are addressed by their dense index.

use super::atom::{Atom, BondOrder};
use super::error::LigandValidationError;
use super::rings;
use std::collections::HashMap;

/// A ligand's molecular graph with precomputed ring information.
#[derive(Debug, Clone)]
pub struct Topology {
    /// The atoms of the ligand, addressed by dense index.
    pub atoms: Vec<Atom>,
    bonds: Vec<(usize, usize, BondOrder)>,
    adjacency: Vec<Vec<(usize, BondOrder)>>,
    neighbor_indices: Vec<Vec<usize>>,
    cycles: Vec<Vec<usize>>,
    joined_cycles: Vec<Vec<usize>>,
}

impl Topology {
    /// Builds a topology from atoms and bond triples `(id_from, id_to, order)`.
    ///
    /// Bond endpoints reference the reader-assigned `Atom::id` values. The
    /// cycle basis and the joined-cycles relation are computed here, once.
    /// Registering the same bond twice with the same order is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`LigandValidationError`] when an atom ID or name repeats,
    /// when a bond references a missing atom, or when an atom bonds to itself.
    pub fn from_parts(
        atoms: Vec<Atom>,
        bonds: &[(usize, usize, BondOrder)],
    ) -> Result<Self, LigandValidationError> {
        let mut id_to_index = HashMap::with_capacity(atoms.len());
        let mut seen_names = HashMap::with_capacity(atoms.len());
        for (index, atom) in atoms.iter().enumerate() {
            if id_to_index.insert(atom.id, index).is_some() {
                return Err(LigandValidationError::DuplicateAtomId { atom_id: atom.id });
            }
            if seen_names.insert(atom.name.clone(), index).is_some() {
                return Err(LigandValidationError::DuplicateAtomName {
                    name: atom.name.clone(),
                });
            }
        }

        let mut adjacency = vec![Vec::new(); atoms.len()];
        let mut neighbor_indices = vec![Vec::new(); atoms.len()];
        let mut dense_bonds = Vec::with_capacity(bonds.len());
        for &(id_from, id_to, order) in bonds {
            let from = *id_to_index
                .get(&id_from)
                .ok_or(LigandValidationError::MissingAtom { atom_id: id_from })?;
            let to = *id_to_index
                .get(&id_to)
                .ok_or(LigandValidationError::MissingAtom { atom_id: id_to })?;
            if from == to {
                return Err(LigandValidationError::SelfBondingAtom { atom_id: id_from });
            }
            if adjacency[from].contains(&(to, order)) {
                continue;
            }
            adjacency[from].push((to, order));
            adjacency[to].push((from, order));
            neighbor_indices[from].push(to);
            neighbor_indices[to].push(from);
            dense_bonds.push((from.min(to), from.max(to), order));
        }

        let edges: Vec<rings::Edge> = dense_bonds.iter().map(|&(a, b, _)| (a, b)).collect();
        let cycles = rings::cycle_basis(atoms.len(), &edges);

        // two basis cycles are joined when they share an edge (fused rings)
        let mut joined_cycles = vec![Vec::new(); cycles.len()];
        for i in 0..cycles.len() {
            for j in (i + 1)..cycles.len() {
                let shared = cycles[i]
                    .iter()
                    .filter(|atom| cycles[j].binary_search(atom).is_ok())
                    .count();
                if shared >= 2 {
                    joined_cycles[i].push(j);
                    joined_cycles[j].push(i);
                }
            }
        }

        Ok(Self {
            atoms,
            bonds: dense_bonds,
            adjacency,
            neighbor_indices,
            cycles,
            joined_cycles,
        })
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the topology has no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Bonded neighbors of `index` together with the bond orders.
    pub fn neighbors(&self, index: usize) -> &[(usize, BondOrder)] {
        &self.adjacency[index]
    }

    /// Bonded neighbors of `index` as bare indices.
    pub fn neighbor_indices(&self, index: usize) -> &[usize] {
        &self.neighbor_indices[index]
    }

    /// All bonds as `(low index, high index, order)` triples.
    pub fn bonds(&self) -> &[(usize, usize, BondOrder)] {
        &self.bonds
    }

    /// Whether the two atoms share a bond.
    pub fn bound_to(&self, a: usize, b: usize) -> bool {
        self.neighbor_indices[a].contains(&b)
    }

    /// The precomputed cycle basis, each cycle as sorted atom indices.
    pub fn cycles(&self) -> &[Vec<usize>] {
        &self.cycles
    }

    /// Basis cycles sharing at least two atoms with cycle `cycle_idx`.
    pub fn joined_cycles(&self, cycle_idx: usize) -> &[usize] {
        &self.joined_cycles[cycle_idx]
    }

    /// Whether the atom at `index` is a member of any basis cycle.
    pub fn in_ring(&self, index: usize) -> bool {
        self.cycles
            .iter()
            .any(|cycle| cycle.binary_search(&index).is_ok())
    }

    /// Looks up an atom index by its (uppercase) name.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.atoms.iter().position(|atom| atom.name == name)
    }

    /// Sum of the atom charges.
    pub fn total_charge(&self) -> f64 {
        self.atoms.iter().map(|atom| atom.charge).sum()
    }
}

/// The two ligands of a superimposition: disappearing (left) and appearing (right).
///
/// The pair owns both topologies so that the post-filter phase can mutate
/// charges, force-field types, and coordinates in place.
#[derive(Debug, Clone)]
pub struct LigandPair {
    /// The disappearing ligand.
    pub left: Topology,
    /// The appearing ligand.
    pub right: Topology,
}

impl LigandPair {
    /// Bundles two topologies into a pair.
    pub fn new(left: Topology, right: Topology) -> Self {
        Self { left, right }
    }

    /// Checks that no atom name is shared across the two ligands.
    ///
    /// # Errors
    ///
    /// Returns [`LigandValidationError::OverlappingAtomNames`] naming the
    /// first shared atom name encountered.
    pub fn check_names_disjoint(&self) -> Result<(), LigandValidationError> {
        for atom in &self.left.atoms {
            if self.right.index_of_name(&atom.name).is_some() {
                return Err(LigandValidationError::OverlappingAtomNames {
                    name: atom.name.clone(),
                });
            }
        }
        Ok(())
    }
}
