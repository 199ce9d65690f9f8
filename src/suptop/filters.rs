//! Structural post-filters: type normalization and tightening, bond-order
//! agreement, connected-component pruning, and ring-integrity enforcement.

use super::mapping::{Pair, SuperimposedTopology};
use crate::core::error::NormalizationError;
use crate::core::{LigandPair, Topology};
use std::collections::BTreeSet;

/// Rings larger than this many atoms are exempt from the partial-ring filter.
const MAX_RING_SIZE: usize = 7;

impl SuperimposedTopology {
    /// Normalizes the CC/CD carbon subtypes that encode the arbitrary
    /// double-bond position in aromatic rings.
    ///
    /// Whenever a pair carries the mismatched type set {CC, CD} and exactly
    /// one of its bonded pairs carries the same mismatched set, the right
    /// side is rewritten to the left side's types. The parser picks CC vs CD
    /// from atom order alone, so without this rewrite the exact-type
    /// tightening would drop chemically identical atoms. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError`] when a mismatched pair has zero or
    /// several mismatched neighbors, which the rule cannot disambiguate.
    pub fn normalize_ring_double_bond_types(
        &self,
        ligands: &mut LigandPair,
    ) -> Result<(), NormalizationError> {
        let is_cccd = |ligands: &LigandPair, (l, r): Pair| {
            let tl = ligands.left.atoms[l].atom_type.as_str();
            let tr = ligands.right.atoms[r].atom_type.as_str();
            (tl == "CC" && tr == "CD") || (tl == "CD" && tr == "CC")
        };

        let mut corrected: BTreeSet<Pair> = BTreeSet::new();
        for &pair in self.matched_pairs() {
            if corrected.contains(&pair) || !is_cccd(ligands, pair) {
                continue;
            }

            let mismatched_neighbors: Vec<Pair> = self
                .pair_bonds(pair)
                .iter()
                .map(|&(p, _)| p)
                .filter(|&p| is_cccd(ligands, p))
                .collect();

            let (left, right) = pair;
            let (b1, b2) = match mismatched_neighbors.as_slice() {
                [neighbor] => *neighbor,
                [] => {
                    return Err(NormalizationError::LoneRingBondType {
                        left_name: ligands.left.atoms[left].name.clone(),
                        right_name: ligands.right.atoms[right].name.clone(),
                    });
                }
                _ => {
                    return Err(NormalizationError::AmbiguousRingBondTypes {
                        left_name: ligands.left.atoms[left].name.clone(),
                        right_name: ligands.right.atoms[right].name.clone(),
                    });
                }
            };

            let left_type = ligands.left.atoms[left].atom_type.clone();
            let left_neighbor_type = ligands.left.atoms[b1].atom_type.clone();
            log::info!(
                "ring double bond order correction: {} takes type {} and {} takes type {}",
                ligands.right.atoms[right].name,
                left_type,
                ligands.right.atoms[b2].name,
                left_neighbor_type,
            );
            ligands.right.atoms[right].atom_type = left_type;
            ligands.right.atoms[b2].atom_type = left_neighbor_type;

            corrected.insert(pair);
            corrected.insert((b1, b2));
        }
        Ok(())
    }

    /// Removes every pair whose force-field types differ.
    ///
    /// The search may have matched atoms at the element level to maximize
    /// the overlap; this tightening re-imposes exact types. Idempotent.
    pub fn remove_pairs_with_mismatched_types(&mut self, ligands: &LigandPair) -> Vec<Pair> {
        let mismatched: Vec<Pair> = self
            .matched_pairs()
            .iter()
            .rev()
            .copied()
            .filter(|&(l, r)| !ligands.left.atoms[l].same_type(&ligands.right.atoms[r]))
            .collect();
        for &pair in &mismatched {
            self.remove_pair(pair);
            log::info!(
                "removed earlier general-type match {}-{}",
                ligands.left.atoms[pair.0].name,
                ligands.right.atoms[pair.1].name
            );
        }
        mismatched
    }

    /// Removes both endpoints of every matched edge whose bond orders differ
    /// between the two sides.
    ///
    /// With A-B=C matched onto A=B-C the three atoms behave differently on
    /// each side, so all involved pairs are dropped and recorded.
    pub fn remove_pairs_with_mismatched_bonds(&mut self) -> Vec<Pair> {
        let mut mismatched_edges: Vec<(Pair, Pair)> = Vec::new();
        for &from_pair in self.matched_pairs().iter().rev() {
            for &(bonded_pair, (left_order, right_order)) in self.pair_bonds(from_pair) {
                if left_order != right_order
                    && !mismatched_edges.contains(&(bonded_pair, from_pair))
                {
                    mismatched_edges.push((from_pair, bonded_pair));
                }
            }
        }

        let mut removed = Vec::new();
        for (from_pair, bonded_pair) in mismatched_edges {
            for pair in [from_pair, bonded_pair] {
                if !removed.contains(&pair) {
                    self.remove_pair(pair);
                    removed.push(pair);
                }
            }
            self.removed_bond_mismatch.push((from_pair, bonded_pair));
        }
        removed
    }

    /// Keeps only the largest connected component of the pair graph.
    ///
    /// Components are discovered in pair order, so ties break toward the
    /// first-enumerated component. Removed pairs are recorded in the
    /// disjoint-component log.
    pub fn largest_cc_survives(&mut self) -> Vec<Pair> {
        let pairs: Vec<Pair> = self.matched_pairs().to_vec();
        let mut visited: BTreeSet<Pair> = BTreeSet::new();
        let mut components: Vec<Vec<Pair>> = Vec::new();

        for &start in &pairs {
            if visited.contains(&start) {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![start];
            visited.insert(start);
            while let Some(current) = stack.pop() {
                component.push(current);
                for &(neighbor, _) in self.pair_bonds(current) {
                    if visited.insert(neighbor) {
                        stack.push(neighbor);
                    }
                }
            }
            components.push(component);
        }

        let Some(largest) = components.iter().map(Vec::len).max() else {
            return Vec::new();
        };
        let keep = components
            .iter()
            .position(|component| component.len() == largest)
            .expect("at least one component");

        let mut removed = Vec::new();
        for (idx, component) in components.into_iter().enumerate() {
            if idx == keep {
                continue;
            }
            for pair in component {
                self.remove_pair(pair);
                self.removed_disjoint.push(pair);
                removed.push(pair);
            }
        }
        removed
    }

    /// Whether any mapped ring on one side is paired with atoms drawn from
    /// more than one distinct ring on the other side.
    ///
    /// Uses the junction-stripped cycle sets computed at construction; the
    /// overlay kernel applies this as a branch-pruning predicate.
    pub fn cycle_spans_multiple_cycles(&self) -> bool {
        let overlap = |l_cycle: &BTreeSet<usize>, r_cycle: &BTreeSet<usize>| {
            l_cycle.iter().any(|&l| {
                self.pair_with_left(l)
                    .is_some_and(|(_, r)| r_cycle.contains(&r))
            })
        };

        for l_cycle in &self.nonoverlapping_l_cycles {
            let overlaps = self
                .nonoverlapping_r_cycles
                .iter()
                .filter(|r_cycle| overlap(l_cycle, r_cycle))
                .count();
            if overlaps > 1 {
                return true;
            }
        }
        for r_cycle in &self.nonoverlapping_r_cycles {
            let overlaps = self
                .nonoverlapping_l_cycles
                .iter()
                .filter(|l_cycle| overlap(l_cycle, r_cycle))
                .count();
            if overlaps > 1 {
                return true;
            }
        }
        false
    }

    /// Removes pairs sitting on partially mapped rings until no ring is
    /// broken by the mapping.
    ///
    /// A ring that is mapped atom-for-atom onto a ring of the other side is
    /// accepted; any other mapped ring atom would open or close the ring
    /// during the alchemical transformation, so its pair is removed. Removals
    /// can break previously accepted rings, so the filter iterates to a fixed
    /// point. Rings larger than seven atoms are exempt.
    pub fn enforce_no_partial_rings(&mut self, ligands: &LigandPair) {
        let small = |cycle: &BTreeSet<usize>| cycle.len() <= MAX_RING_SIZE;

        let mut l_circles: Vec<BTreeSet<usize>> = original_cycles(&ligands.left)
            .into_iter()
            .filter(small)
            .collect();
        let mut r_circles: Vec<BTreeSet<usize>> = original_cycles(&ligands.right)
            .into_iter()
            .filter(small)
            .collect();

        let (l_matched, r_matched) = self.induced_cycles(ligands);
        let mut l_matched: Vec<BTreeSet<usize>> = l_matched.into_iter().filter(small).collect();
        let mut r_matched: Vec<BTreeSet<usize>> = r_matched.into_iter().filter(small).collect();

        // rings mapped atom-for-atom are correct as they stand
        let mut correct_circles: Vec<(BTreeSet<usize>, BTreeSet<usize>)> = Vec::new();
        for l_idx in (0..l_matched.len()).rev() {
            let matched_r = r_matched
                .iter()
                .position(|r_circle| self.are_matched_sets(&l_matched[l_idx], r_circle));
            if let Some(r_idx) = matched_r {
                let l_circle = l_matched.remove(l_idx);
                let r_circle = r_matched.remove(r_idx);
                l_circles.retain(|c| *c != l_circle);
                r_circles.retain(|c| *c != r_circle);
                correct_circles.push((l_circle, r_circle));
            }
        }
        assert!(
            l_matched.is_empty() && r_matched.is_empty(),
            "a ring is fully mapped on one side only"
        );

        loop {
            let l_removed = self.remove_pairs_on_circles(&l_circles, true);
            let r_removed = self.remove_pairs_on_circles(&r_circles, false);

            for (l_circle, r_circle) in &correct_circles {
                let l_affected = l_removed.iter().any(|&(l, _)| l_circle.contains(&l));
                let r_affected = r_removed.iter().any(|&(_, r)| r_circle.contains(&r));
                if l_affected || r_affected {
                    l_circles.push(l_circle.clone());
                    r_circles.push(r_circle.clone());
                }
            }

            if l_removed.is_empty() && r_removed.is_empty() {
                break;
            }
        }
    }

    /// Whether every atom of `l_atoms` is mapped onto a member of `r_atoms`.
    fn are_matched_sets(&self, l_atoms: &BTreeSet<usize>, r_atoms: &BTreeSet<usize>) -> bool {
        if l_atoms.len() != r_atoms.len() {
            return false;
        }
        l_atoms.iter().all(|&l| {
            self.pair_with_left(l)
                .is_some_and(|(_, r)| r_atoms.contains(&r))
        })
    }

    /// Removes every matched pair whose atom (on the given side) lies on any
    /// of the circles, logging them as unmatched-ring removals.
    fn remove_pairs_on_circles(
        &mut self,
        circles: &[BTreeSet<usize>],
        left_side: bool,
    ) -> Vec<Pair> {
        let mut removed = Vec::new();
        for circle in circles {
            for &atom in circle {
                let pair = if left_side {
                    self.pair_with_left(atom)
                } else {
                    self.pair_with_right(atom)
                };
                if let Some(pair) = pair {
                    self.remove_pair(pair);
                    self.removed_unmatched_rings.push(pair);
                    removed.push(pair);
                }
            }
        }
        removed
    }
}

fn original_cycles(topology: &Topology) -> Vec<BTreeSet<usize>> {
    topology
        .cycles()
        .iter()
        .map(|cycle| cycle.iter().copied().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Atom, BondOrder};

    fn atom(id: usize, name: &str, atom_type: &str) -> Atom {
        Atom::new(id, name, atom_type, 0.0).unwrap()
    }

    fn ring5_with_tail(names: [&str; 6], types: [&str; 6]) -> Topology {
        let atoms: Vec<Atom> = names
            .iter()
            .zip(types)
            .enumerate()
            .map(|(i, (name, ty))| atom(i + 1, name, ty))
            .collect();
        let bonds = [
            (1, 2, BondOrder::Aromatic),
            (2, 3, BondOrder::Aromatic),
            (3, 4, BondOrder::Aromatic),
            (4, 5, BondOrder::Aromatic),
            (5, 1, BondOrder::Aromatic),
            (1, 6, BondOrder::Single),
        ];
        Topology::from_parts(atoms, &bonds).unwrap()
    }

    fn mapped_chain(
        left: Topology,
        right: Topology,
        pairs: &[Pair],
    ) -> (LigandPair, SuperimposedTopology) {
        let ligands = LigandPair::new(left, right);
        let mut suptop = SuperimposedTopology::new(&ligands);
        for &pair in pairs {
            suptop.add_pair(pair, &ligands);
        }
        // link consecutive pairs that are bonded on both sides
        for i in 0..pairs.len() {
            for j in (i + 1)..pairs.len() {
                let (li, ri) = pairs[i];
                let (lj, rj) = pairs[j];
                if ligands.left.bound_to(li, lj) && ligands.right.bound_to(ri, rj) {
                    let lo = ligands
                        .left
                        .neighbors(li)
                        .iter()
                        .find(|&&(n, _)| n == lj)
                        .unwrap()
                        .1;
                    let ro = ligands
                        .right
                        .neighbors(ri)
                        .iter()
                        .find(|&&(n, _)| n == rj)
                        .unwrap()
                        .1;
                    suptop.link_pairs(pairs[i], &[(pairs[j], (lo, ro))]);
                }
            }
        }
        (ligands, suptop)
    }

    #[test]
    fn cccd_normalization_rewrites_right_types() {
        // two bonded CC/CD pairs with swapped order on the right
        let left = Topology::from_parts(
            vec![atom(1, "C1", "CC"), atom(2, "C2", "CD")],
            &[(1, 2, BondOrder::Aromatic)],
        )
        .unwrap();
        let right = Topology::from_parts(
            vec![atom(1, "C11", "CD"), atom(2, "C12", "CC")],
            &[(1, 2, BondOrder::Aromatic)],
        )
        .unwrap();
        let (mut ligands, suptop) = mapped_chain(left, right, &[(0, 0), (1, 1)]);

        suptop
            .normalize_ring_double_bond_types(&mut ligands)
            .unwrap();
        assert_eq!(ligands.right.atoms[0].atom_type, "CC");
        assert_eq!(ligands.right.atoms[1].atom_type, "CD");

        // applying again changes nothing
        suptop
            .normalize_ring_double_bond_types(&mut ligands)
            .unwrap();
        assert_eq!(ligands.right.atoms[0].atom_type, "CC");
        assert_eq!(ligands.right.atoms[1].atom_type, "CD");
    }

    #[test]
    fn cccd_normalization_rejects_lone_pair() {
        let left = Topology::from_parts(
            vec![atom(1, "C1", "CC"), atom(2, "C2", "CA")],
            &[(1, 2, BondOrder::Aromatic)],
        )
        .unwrap();
        let right = Topology::from_parts(
            vec![atom(1, "C11", "CD"), atom(2, "C12", "CA")],
            &[(1, 2, BondOrder::Aromatic)],
        )
        .unwrap();
        let (mut ligands, suptop) = mapped_chain(left, right, &[(0, 0), (1, 1)]);

        let result = suptop.normalize_ring_double_bond_types(&mut ligands);
        assert!(matches!(
            result,
            Err(NormalizationError::LoneRingBondType { .. })
        ));
    }

    #[test]
    fn mismatched_types_are_tightened_away() {
        let left = Topology::from_parts(
            vec![atom(1, "C1", "CA"), atom(2, "C2", "C3")],
            &[(1, 2, BondOrder::Single)],
        )
        .unwrap();
        let right = Topology::from_parts(
            vec![atom(1, "C11", "CA"), atom(2, "C12", "CB")],
            &[(1, 2, BondOrder::Single)],
        )
        .unwrap();
        let (ligands, mut suptop) = mapped_chain(left, right, &[(0, 0), (1, 1)]);

        let removed = suptop.remove_pairs_with_mismatched_types(&ligands);
        assert_eq!(removed, vec![(1, 1)]);
        assert_eq!(suptop.len(), 1);
    }

    #[test]
    fn mismatched_bond_orders_remove_both_pairs() {
        let left = Topology::from_parts(
            vec![atom(1, "C1", "C3"), atom(2, "C2", "C3")],
            &[(1, 2, BondOrder::Single)],
        )
        .unwrap();
        let right = Topology::from_parts(
            vec![atom(1, "C11", "C3"), atom(2, "C12", "C3")],
            &[(1, 2, BondOrder::Double)],
        )
        .unwrap();
        let (_, mut suptop) = {
            let ligands = LigandPair::new(left, right);
            let mut suptop = SuperimposedTopology::new(&ligands);
            suptop.add_pair((0, 0), &ligands);
            suptop.add_pair((1, 1), &ligands);
            suptop.link_pairs((0, 0), &[((1, 1), (BondOrder::Single, BondOrder::Double))]);
            (ligands, suptop)
        };

        let removed = suptop.remove_pairs_with_mismatched_bonds();
        assert_eq!(removed.len(), 2);
        assert!(suptop.is_empty());
        assert_eq!(suptop.removed_bond_mismatch().len(), 1);
    }

    #[test]
    fn smaller_component_is_pruned() {
        let left = Topology::from_parts(
            vec![
                atom(1, "C1", "C3"),
                atom(2, "C2", "C3"),
                atom(3, "C3", "C3"),
                atom(4, "O1", "OH"),
            ],
            &[
                (1, 2, BondOrder::Single),
                (2, 3, BondOrder::Single),
                (3, 4, BondOrder::Single),
            ],
        )
        .unwrap();
        let right = left.clone();
        let ligands = LigandPair::new(left, right);
        let mut suptop = SuperimposedTopology::new(&ligands);
        for pair in [(0, 0), (1, 1), (3, 3)] {
            suptop.add_pair(pair, &ligands);
        }
        suptop.link_pairs((0, 0), &[((1, 1), (BondOrder::Single, BondOrder::Single))]);
        // (3,3) is left unconnected: its linking pair (2,2) is not matched

        let removed = suptop.largest_cc_survives();
        assert_eq!(removed, vec![(3, 3)]);
        assert_eq!(suptop.removed_disjoint(), &[(3, 3)]);
        assert_eq!(suptop.len(), 2);
    }

    #[test]
    fn partial_ring_is_dismantled() {
        let left = ring5_with_tail(
            ["C1", "C2", "C3", "C4", "N1", "C6"],
            ["CA", "CA", "CA", "CA", "NB", "C3"],
        );
        let right = ring5_with_tail(
            ["C11", "C12", "C13", "C14", "N11", "C16"],
            ["CA", "CA", "CA", "CA", "NB", "C3"],
        );
        // map the tail and only three ring atoms
        let (ligands, mut suptop) = mapped_chain(
            left,
            right,
            &[(5, 5), (0, 0), (1, 1), (4, 4)],
        );

        suptop.enforce_no_partial_rings(&ligands);

        // ring pairs are gone, the tail pair survives
        assert_eq!(suptop.matched_pairs(), &[(5, 5)]);
        assert_eq!(suptop.removed_unmatched_rings().len(), 3);
    }

    #[test]
    fn fully_matched_ring_survives_ring_enforcement() {
        let left = ring5_with_tail(
            ["C1", "C2", "C3", "C4", "N1", "C6"],
            ["CA", "CA", "CA", "CA", "NB", "C3"],
        );
        let right = ring5_with_tail(
            ["C11", "C12", "C13", "C14", "N11", "C16"],
            ["CA", "CA", "CA", "CA", "NB", "C3"],
        );
        let (ligands, mut suptop) = mapped_chain(
            left,
            right,
            &[(0, 0), (1, 1), (2, 2), (3, 3), (4, 4), (5, 5)],
        );

        suptop.enforce_no_partial_rings(&ligands);
        assert_eq!(suptop.len(), 6);
        assert!(suptop.removed_unmatched_rings().is_empty());
    }

    #[test]
    fn spanning_two_rings_is_detected() {
        // left: one 5-ring; right: two 5-rings bridged by a bond
        let left = ring5_with_tail(
            ["C1", "C2", "C3", "C4", "N1", "C6"],
            ["CA", "CA", "CA", "CA", "NB", "C3"],
        );
        let right_atoms: Vec<Atom> = [
            ("C11", "CA"),
            ("C12", "CA"),
            ("C13", "CA"),
            ("C14", "CA"),
            ("N11", "NB"),
            ("C15", "CA"),
            ("C16", "CA"),
            ("C17", "CA"),
            ("C18", "CA"),
            ("N12", "NB"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| atom(i + 1, name, ty))
        .collect();
        let right_bonds = [
            (1, 2, BondOrder::Aromatic),
            (2, 3, BondOrder::Aromatic),
            (3, 4, BondOrder::Aromatic),
            (4, 5, BondOrder::Aromatic),
            (5, 1, BondOrder::Aromatic),
            (6, 7, BondOrder::Aromatic),
            (7, 8, BondOrder::Aromatic),
            (8, 9, BondOrder::Aromatic),
            (9, 10, BondOrder::Aromatic),
            (10, 6, BondOrder::Aromatic),
            (1, 6, BondOrder::Single),
        ];
        let right = Topology::from_parts(right_atoms, &right_bonds).unwrap();
        let ligands = LigandPair::new(left, right);

        let mut suptop = SuperimposedTopology::new(&ligands);
        // left ring atoms C1, C2 pair into the first right ring
        suptop.add_pair((0, 0), &ligands);
        suptop.add_pair((1, 1), &ligands);
        assert!(!suptop.cycle_spans_multiple_cycles());

        // pairing left ring atom N1 into the second right ring spans two rings
        suptop.add_pair((4, 9), &ligands);
        assert!(suptop.cycle_spans_multiple_cycles());
    }
}
