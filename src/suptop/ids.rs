//! Generated atom identifiers and the dual-topology bond list.
//!
//! Matched pairs collapse into one shared ID; appearing and disappearing
//! atoms keep their own. The dual-topology bond list expresses the hybrid
//! molecule over these IDs for downstream input generators.

use super::mapping::{InternalIds, SuperimposedTopology};
use crate::core::{BondOrder, LigandPair};
use std::collections::BTreeSet;

impl SuperimposedTopology {
    /// Left-ligand atoms not covered by any matched pair.
    pub fn disappearing_atoms(&self, ligands: &LigandPair) -> Vec<usize> {
        (0..ligands.left.len())
            .filter(|&index| !self.contains_left_node(index))
            .collect()
    }

    /// Right-ligand atoms not covered by any matched pair.
    pub fn appearing_atoms(&self, ligands: &LigandPair) -> Vec<usize> {
        (0..ligands.right.len())
            .filter(|&index| !self.contains_right_node(index))
            .collect()
    }

    /// Assigns generated IDs: one shared ID per pair, then one per unmatched
    /// left atom, then one per unmatched right atom.
    ///
    /// Returns the next free ID so several mappings can be numbered
    /// sequentially.
    pub fn assign_atom_ids(&mut self, ligands: &LigandPair, id_start: usize) -> usize {
        let mut ids = InternalIds::default();
        let mut counter = id_start;

        for &(l, r) in self.matched_pairs() {
            ids.left.insert(l, counter);
            ids.right.insert(r, counter);
            counter += 1;
        }
        for index in self.disappearing_atoms(ligands) {
            ids.left.insert(index, counter);
            counter += 1;
        }
        for index in self.appearing_atoms(ligands) {
            ids.right.insert(index, counter);
            counter += 1;
        }

        self.internal_ids = Some(ids);
        counter
    }

    /// The generated ID of a left-ligand atom.
    ///
    /// # Panics
    ///
    /// Panics if `assign_atom_ids` has not been called.
    pub fn generated_left_id(&self, index: usize) -> usize {
        self.internal_ids.as_ref().expect("IDs not assigned").left[&index]
    }

    /// The generated ID of a right-ligand atom.
    ///
    /// # Panics
    ///
    /// Panics if `assign_atom_ids` has not been called.
    pub fn generated_right_id(&self, index: usize) -> usize {
        self.internal_ids.as_ref().expect("IDs not assigned").right[&index]
    }

    /// Bond triples `(id_lo, id_hi, order)` of the hybrid dual topology.
    ///
    /// Covers the induced edges between matched pairs (using the shared pair
    /// IDs and the left side's bond order), bonds from unmatched atoms into
    /// matched pairs, and bonds entirely among unmatched atoms. A cycle that
    /// closes among unmatched atoms through a matched pair uses the pair's
    /// shared ID on the matched side, so such cycles appear unreduced.
    ///
    /// # Panics
    ///
    /// Panics if `assign_atom_ids` has not been called, or if the bond orders
    /// of a matched edge disagree while `ignore_bond_types` is unset — the
    /// orchestrator's bond-mismatch filter removes such edges beforehand.
    pub fn dual_topology_bonds(&self, ligands: &LigandPair) -> BTreeSet<(usize, usize, BondOrder)> {
        assert!(self.internal_ids.is_some(), "IDs not assigned");

        let mut bonds = BTreeSet::new();

        for &pair in self.matched_pairs() {
            let from_id = self.generated_left_id(pair.0);
            for &(bonded_pair, (left_order, right_order)) in self.pair_bonds(pair) {
                if !self.ignore_bond_types {
                    assert_eq!(
                        left_order, right_order,
                        "bond orders disagree across matched pair {:?}-{:?}",
                        pair, bonded_pair
                    );
                }
                let to_id = self.generated_left_id(bonded_pair.0);
                bonds.insert((from_id.min(to_id), from_id.max(to_id), left_order));
            }
        }

        for left_index in self.disappearing_atoms(ligands) {
            let atom_id = self.generated_left_id(left_index);
            for &(neighbor, order) in ligands.left.neighbors(left_index) {
                let neighbor_id = self.generated_left_id(neighbor);
                bonds.insert((atom_id.min(neighbor_id), atom_id.max(neighbor_id), order));
            }
        }
        for right_index in self.appearing_atoms(ligands) {
            let atom_id = self.generated_right_id(right_index);
            for &(neighbor, order) in ligands.right.neighbors(right_index) {
                let neighbor_id = self.generated_right_id(neighbor);
                bonds.insert((atom_id.min(neighbor_id), atom_id.max(neighbor_id), order));
            }
        }

        bonds
    }
}
