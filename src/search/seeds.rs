//! Seed-pair selection for the overlay search.
//!
//! Trying every left-right atom couple is wasteful and, inside rings,
//! symmetry-prone. The heuristic keeps non-hydrogen atoms, drops carbons
//! that sit in rings, and emits couples class-by-class from the rarest
//! shared force-field type upward until enough of the theoretical overlap is
//! covered.

use crate::core::{Element, LigandPair, Topology};
use crate::suptop::Pair;
use std::collections::BTreeSet;

/// Fraction of the theoretical overlap the emitted seed classes must cover.
const SEED_FRACTION: f64 = 0.2;

/// Every left-right atom couple, for when the heuristic is disabled.
pub(crate) fn cartesian_product(ligands: &LigandPair) -> Vec<Pair> {
    let mut pairs = Vec::with_capacity(ligands.left.len() * ligands.right.len());
    for n1 in 0..ligands.left.len() {
        for n2 in 0..ligands.right.len() {
            pairs.push((n1, n2));
        }
    }
    pairs
}

/// Heuristically chosen seed pairs, rarest shared atom type first.
pub(crate) fn starting_configurations(ligands: &LigandPair) -> Vec<Pair> {
    let heavy = |topology: &Topology| -> Vec<usize> {
        (0..topology.len())
            .filter(|&i| topology.atoms[i].element != Element::H)
            .collect()
    };
    let left_heavy = heavy(&ligands.left);
    let right_heavy = heavy(&ligands.right);

    // theoretical overlap from the exact types of the heavy atoms
    let count_type = |topology: &Topology, atom_type: &str| {
        topology
            .atoms
            .iter()
            .filter(|atom| atom.atom_type == atom_type)
            .count()
    };
    let common_types: BTreeSet<&str> = {
        let left_types: BTreeSet<&str> = left_heavy
            .iter()
            .map(|&i| ligands.left.atoms[i].atom_type.as_str())
            .collect();
        right_heavy
            .iter()
            .map(|&i| ligands.right.atoms[i].atom_type.as_str())
            .filter(|atom_type| left_types.contains(atom_type))
            .collect()
    };
    let max_overlap: usize = common_types
        .iter()
        .map(|&atom_type| {
            count_type(&ligands.left, atom_type).min(count_type(&ligands.right, atom_type))
        })
        .sum();
    log::debug!("seed selection: theoretical overlap of {max_overlap} atoms");

    // ring carbons suffer from symmetry: starting inside a ring can lock the
    // traversal into the wrong automorphism
    let not_ring_carbon = |topology: &Topology, index: usize| {
        !(topology.atoms[index].element == Element::C && topology.in_ring(index))
    };
    let left_starting: Vec<usize> = left_heavy
        .iter()
        .copied()
        .filter(|&i| not_ring_carbon(&ligands.left, i))
        .collect();
    let right_starting: Vec<usize> = right_heavy
        .iter()
        .copied()
        .filter(|&i| not_ring_carbon(&ligands.right, i))
        .collect();

    let starting_types: BTreeSet<&str> = {
        let left_types: BTreeSet<&str> = left_starting
            .iter()
            .map(|&i| ligands.left.atoms[i].atom_type.as_str())
            .collect();
        right_starting
            .iter()
            .map(|&i| ligands.right.atoms[i].atom_type.as_str())
            .filter(|atom_type| left_types.contains(atom_type))
            .collect()
    };

    let mut paired_by_type: Vec<(Vec<usize>, Vec<usize>)> = starting_types
        .iter()
        .map(|atom_type| {
            let left: Vec<usize> = left_starting
                .iter()
                .copied()
                .filter(|&i| ligands.left.atoms[i].atom_type == *atom_type)
                .collect();
            let right: Vec<usize> = right_starting
                .iter()
                .copied()
                .filter(|&i| ligands.right.atoms[i].atom_type == *atom_type)
                .collect();
            (left, right)
        })
        .collect();
    paired_by_type.sort_by_key(|(left, right)| left.len().min(right.len()));

    let desired = (SEED_FRACTION * max_overlap as f64) as usize;
    let mut configurations = Vec::new();
    let mut covered = 0;
    for (left_class, right_class) in paired_by_type {
        for &n1 in &left_class {
            for &n2 in &right_class {
                configurations.push((n1, n2));
            }
        }
        covered += left_class.len().min(right_class.len());
        if covered > desired {
            break;
        }
    }

    log::debug!("seed selection: {} starting pairs", configurations.len());
    configurations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Atom, BondOrder};

    fn atom(id: usize, name: &str, atom_type: &str) -> Atom {
        Atom::new(id, name, atom_type, 0.0).unwrap()
    }

    /// A benzene-like ring with an N tail: ring carbons are poor seeds, the
    /// nitrogen is rare and therefore preferred.
    fn ring_with_amine(prefix: u32) -> Topology {
        let mut atoms: Vec<Atom> = (1..=6)
            .map(|i| atom(i, &format!("C{prefix}{i}"), "CA"))
            .collect();
        atoms.push(atom(7, &format!("N{prefix}1"), "N3"));
        atoms.push(atom(8, &format!("H{prefix}1"), "HN"));
        let mut bonds: Vec<(usize, usize, BondOrder)> = (1..=6)
            .map(|i| (i, if i == 6 { 1 } else { i + 1 }, BondOrder::Aromatic))
            .collect();
        bonds.push((1, 7, BondOrder::Single));
        bonds.push((7, 8, BondOrder::Single));
        Topology::from_parts(atoms, &bonds).unwrap()
    }

    #[test]
    fn cartesian_product_covers_every_couple() {
        let ligands = LigandPair::new(ring_with_amine(1), ring_with_amine(2));
        let pairs = cartesian_product(&ligands);
        assert_eq!(pairs.len(), 64);
    }

    #[test]
    fn heuristic_prefers_rare_types_and_skips_ring_carbons_and_hydrogens() {
        let ligands = LigandPair::new(ring_with_amine(1), ring_with_amine(2));
        let seeds = starting_configurations(&ligands);

        assert!(!seeds.is_empty());
        // the single N-N couple is the rarest class and must come first
        assert_eq!(seeds[0], (6, 6));
        for &(n1, n2) in &seeds {
            assert_ne!(ligands.left.atoms[n1].element, Element::H);
            assert_ne!(ligands.right.atoms[n2].element, Element::H);
            assert!(!(ligands.left.atoms[n1].element == Element::C && ligands.left.in_ring(n1)));
        }
    }
}
