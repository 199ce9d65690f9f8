//! The superimposed topology: a growing bijection between subsets of the two
//! ligands, with bond-pair adjacency, ring bookkeeping, and removal logs.
//!
//! Pairs are `(left index, right index)` tuples into the [`LigandPair`]
//! topologies. All collections iterate deterministically: `matched_pairs` is
//! kept sorted by the left atom name and the pair-bond adjacency lives in a
//! `BTreeMap`. The search clones an instance per branch, which copies the
//! pairs, node sets, logs, and adjacency in O(number of pairs).

use crate::core::rings;
use crate::core::{BondOrder, LigandPair};
use std::collections::{BTreeMap, BTreeSet};

/// A matched atom pair: left ligand index, right ligand index.
pub type Pair = (usize, usize);

/// One entry of the append-only audit trail of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A pair was added during search or merging.
    Added(Pair),
    /// A pair was removed by a mutation or filter.
    Removed(Pair),
    /// Another mapping was merged in; the payload lists the absorbed pairs.
    MergedWith(Vec<Pair>),
}

/// Identifiers generated for the dual-topology output.
///
/// Matched pairs share one ID; unmatched atoms get their own.
#[derive(Debug, Clone, Default)]
pub struct InternalIds {
    /// Generated ID per left atom index.
    pub left: BTreeMap<usize, usize>,
    /// Generated ID per right atom index.
    pub right: BTreeMap<usize, usize>,
}

/// A set of matched atom pairs forming a bijection between subsets of the
/// left and right ligand, together with bond adjacency and bookkeeping.
#[derive(Debug, Clone)]
pub struct SuperimposedTopology {
    matched_pairs: Vec<Pair>,
    left_nodes: BTreeSet<usize>,
    right_nodes: BTreeSet<usize>,
    pair_bonds: BTreeMap<Pair, Vec<(Pair, (BondOrder, BondOrder))>>,
    mirrors: Vec<SuperimposedTopology>,
    alternative_mappings: Vec<SuperimposedTopology>,
    node_log: Vec<LogEntry>,

    pub(crate) removed_charge_mismatch: Vec<(Pair, f64)>,
    pub(crate) removed_disjoint: Vec<Pair>,
    pub(crate) removed_net_charge: Vec<(Pair, f64)>,
    pub(crate) removed_unmatched_rings: Vec<Pair>,
    pub(crate) removed_bond_mismatch: Vec<(Pair, Pair)>,

    pub(crate) internal_ids: Option<InternalIds>,
    pub(crate) nonoverlapping_l_cycles: Vec<BTreeSet<usize>>,
    pub(crate) nonoverlapping_r_cycles: Vec<BTreeSet<usize>>,

    /// Which side provides the reference frame for alignment.
    pub left_coords_are_ref: bool,
    /// Whether mismatched bond orders across a matched edge are tolerated.
    pub ignore_bond_types: bool,
}

impl SuperimposedTopology {
    /// Creates an empty mapping over the given ligand pair.
    ///
    /// The per-side cycle bases are copied with double-ring junction atoms
    /// stripped; the cycle-spanning guard consults these during search.
    pub fn new(ligands: &LigandPair) -> Self {
        let nonoverlapping_l_cycles = nonoverlapping_cycles(ligands.left.cycles());
        let nonoverlapping_r_cycles = nonoverlapping_cycles(ligands.right.cycles());

        Self {
            matched_pairs: Vec::new(),
            left_nodes: BTreeSet::new(),
            right_nodes: BTreeSet::new(),
            pair_bonds: BTreeMap::new(),
            mirrors: Vec::new(),
            alternative_mappings: Vec::new(),
            node_log: Vec::new(),
            removed_charge_mismatch: Vec::new(),
            removed_disjoint: Vec::new(),
            removed_net_charge: Vec::new(),
            removed_unmatched_rings: Vec::new(),
            removed_bond_mismatch: Vec::new(),
            internal_ids: None,
            nonoverlapping_l_cycles,
            nonoverlapping_r_cycles,
            left_coords_are_ref: true,
            ignore_bond_types: true,
        }
    }

    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.matched_pairs.len()
    }

    /// Whether no pair is matched.
    pub fn is_empty(&self) -> bool {
        self.matched_pairs.is_empty()
    }

    /// The matched pairs, sorted by left atom name.
    pub fn matched_pairs(&self) -> &[Pair] {
        &self.matched_pairs
    }

    /// The audit trail of additions, removals, and merges.
    pub fn node_log(&self) -> &[LogEntry] {
        &self.node_log
    }

    /// Alternative mappings over the identical atom set (true symmetries).
    pub fn mirrors(&self) -> &[SuperimposedTopology] {
        &self.mirrors
    }

    /// Same-size mappings over a different atom set (near-symmetries).
    pub fn alternative_mappings(&self) -> &[SuperimposedTopology] {
        &self.alternative_mappings
    }

    /// Pairs removed because their charges differed beyond the tolerance,
    /// with the absolute difference, sorted descending.
    pub fn removed_charge_mismatch(&self) -> &[(Pair, f64)] {
        &self.removed_charge_mismatch
    }

    /// Pairs removed while balancing the net charge, with the difference.
    pub fn removed_net_charge(&self) -> &[(Pair, f64)] {
        &self.removed_net_charge
    }

    /// Pairs removed as members of disjoint mapping components.
    pub fn removed_disjoint(&self) -> &[Pair] {
        &self.removed_disjoint
    }

    /// Pairs removed because they sat on partially mapped rings.
    pub fn removed_unmatched_rings(&self) -> &[Pair] {
        &self.removed_unmatched_rings
    }

    /// Pair couples removed because their bond orders disagreed.
    pub fn removed_bond_mismatch(&self) -> &[(Pair, Pair)] {
        &self.removed_bond_mismatch
    }

    /// Generated IDs, populated by `assign_atom_ids`.
    pub fn internal_ids(&self) -> Option<&InternalIds> {
        self.internal_ids.as_ref()
    }

    /// Whether the left atom index is already mapped.
    pub fn contains_left_node(&self, left: usize) -> bool {
        self.left_nodes.contains(&left)
    }

    /// Whether the right atom index is already mapped.
    pub fn contains_right_node(&self, right: usize) -> bool {
        self.right_nodes.contains(&right)
    }

    /// Whether either endpoint of the candidate pair is already mapped.
    pub fn uses_either(&self, left: usize, right: usize) -> bool {
        self.contains_left_node(left) || self.contains_right_node(right)
    }

    /// Whether this exact pair is matched.
    pub fn contains_pair(&self, pair: Pair) -> bool {
        self.pair_bonds.contains_key(&pair)
    }

    /// Whether a pair with the given atom names is matched.
    pub fn contains_atom_name_pair(
        &self,
        ligands: &LigandPair,
        left_name: &str,
        right_name: &str,
    ) -> bool {
        self.matched_pairs.iter().any(|&(l, r)| {
            ligands.left.atoms[l].name == left_name && ligands.right.atoms[r].name == right_name
        })
    }

    /// Whether the pair was matched at any point, even if a filter later
    /// removed it (charge refinement, net-charge balancing, or component
    /// pruning).
    pub fn matched_or_removed(
        &self,
        ligands: &LigandPair,
        left_name: &str,
        right_name: &str,
    ) -> bool {
        if self.contains_atom_name_pair(ligands, left_name, right_name) {
            return true;
        }
        let names_match = |&(l, r): &Pair| {
            ligands.left.atoms[l].name == left_name && ligands.right.atoms[r].name == right_name
        };
        self.removed_disjoint.iter().any(names_match)
            || self
                .removed_net_charge
                .iter()
                .any(|(pair, _)| names_match(pair))
            || self
                .removed_charge_mismatch
                .iter()
                .any(|(pair, _)| names_match(pair))
    }

    /// The pair whose left side is `left`, if matched.
    pub fn pair_with_left(&self, left: usize) -> Option<Pair> {
        self.matched_pairs.iter().copied().find(|&(l, _)| l == left)
    }

    /// The pair whose right side is `right`, if matched.
    pub fn pair_with_right(&self, right: usize) -> Option<Pair> {
        self.matched_pairs
            .iter()
            .copied()
            .find(|&(_, r)| r == right)
    }

    /// How many atoms this mapping shares with the other, per-side.
    pub fn count_common_nodes(&self, other: &SuperimposedTopology) -> usize {
        self.left_nodes.intersection(&other.left_nodes).count()
            + self.right_nodes.intersection(&other.right_nodes).count()
    }

    /// How many identical pairs the two mappings share.
    pub fn count_common_node_pairs(&self, other: &SuperimposedTopology) -> usize {
        self.matched_pairs
            .iter()
            .filter(|&&pair| other.contains_pair(pair))
            .count()
    }

    /// Whether the two mappings share any atom on either side.
    pub fn shares_any_node_with(&self, other: &SuperimposedTopology) -> bool {
        self.left_nodes
            .intersection(&other.left_nodes)
            .next()
            .is_some()
            || self
                .right_nodes
                .intersection(&other.right_nodes)
                .next()
                .is_some()
    }

    /// Whether every pair of `other` is present in this mapping.
    pub fn contains_all(&self, other: &SuperimposedTopology) -> bool {
        other
            .matched_pairs
            .iter()
            .all(|&pair| self.contains_pair(pair))
    }

    /// Structural equality: same size, same pairs in any order.
    pub fn eq_pairs(&self, other: &SuperimposedTopology) -> bool {
        self.len() == other.len() && self.contains_all(other)
    }

    /// Whether the two mappings cover identical atom sets on both sides,
    /// paired differently or not.
    pub fn same_nodes(&self, other: &SuperimposedTopology) -> bool {
        self.left_nodes == other.left_nodes && self.right_nodes == other.right_nodes
    }

    /// A mirror covers the same atoms with the same cardinality via a
    /// different pairing (a graph automorphism).
    pub fn is_mirror_of(&self, other: &SuperimposedTopology) -> bool {
        self.len() == other.len() && self.same_nodes(other)
    }

    /// Whether this mapping (or any of its mirrors) is a proper subgraph of
    /// the other.
    pub fn is_subgraph_of(&self, other: &SuperimposedTopology) -> bool {
        if self.len() >= other.len() {
            return false;
        }
        if other.contains_all(self) {
            return true;
        }
        self.mirrors.iter().any(|mirror| other.contains_all(mirror))
    }

    /// Absorbs another mapping as a mirror, taking over its own mirrors.
    ///
    /// # Panics
    ///
    /// Panics if the two mappings differ in size.
    pub fn absorb_mirror(&mut self, mut mirror: SuperimposedTopology) {
        assert_eq!(
            self.len(),
            mirror.len(),
            "a mirror must have the same number of pairs"
        );
        if self.mirrors.iter().any(|known| known.eq_pairs(&mirror)) {
            return;
        }
        self.mirrors.append(&mut mirror.mirrors);
        self.mirrors.push(mirror);
    }

    /// Records a same-size mapping over a different atom set.
    pub fn add_alternative_mapping(&mut self, alternative: SuperimposedTopology) {
        self.alternative_mappings.push(alternative);
    }

    /// Adds a matched pair and re-sorts the pair list by left atom name.
    ///
    /// # Panics
    ///
    /// Panics if the pair is already present or either endpoint is mapped.
    pub fn add_pair(&mut self, pair: Pair, ligands: &LigandPair) {
        let (left, right) = pair;
        assert!(!self.contains_pair(pair), "pair already added");
        assert!(
            !self.left_nodes.contains(&left) && !self.right_nodes.contains(&right),
            "an endpoint of the pair is already mapped"
        );

        self.matched_pairs.push(pair);
        self.matched_pairs
            .sort_by(|a, b| ligands.left.atoms[a.0].name.cmp(&ligands.left.atoms[b.0].name));
        self.left_nodes.insert(left);
        self.right_nodes.insert(right);
        debug_assert_eq!(
            self.matched_pairs.len(),
            self.left_nodes.len().max(self.right_nodes.len())
        );

        self.node_log.push(LogEntry::Added(pair));
        self.pair_bonds.insert(pair, Vec::new());
    }

    /// Registers the induced edge between a pair and its search parent.
    ///
    /// # Panics
    ///
    /// Panics if either pair is not matched.
    pub fn link_with_parent(&mut self, pair: Pair, parent: Pair, orders: (BondOrder, BondOrder)) {
        self.link_pairs(pair, &[(parent, orders)]);
    }

    /// Registers induced edges between `from` and each of `links`, in both
    /// directions. Re-registering an existing edge is idempotent.
    ///
    /// # Panics
    ///
    /// Panics if any referenced pair is not matched.
    pub fn link_pairs(&mut self, from: Pair, links: &[(Pair, (BondOrder, BondOrder))]) {
        assert!(self.contains_pair(from), "pair not matched");
        for &(to, orders) in links {
            assert!(self.contains_pair(to), "linked pair not matched");
            let forward = self.pair_bonds.get_mut(&from).expect("pair bond entry");
            if !forward.contains(&(to, orders)) {
                forward.push((to, orders));
            }
            let backward = self.pair_bonds.get_mut(&to).expect("pair bond entry");
            if !backward.contains(&(from, orders)) {
                backward.push((from, orders));
            }
        }
    }

    /// Induced edges incident to a matched pair.
    pub fn pair_bonds(&self, pair: Pair) -> &[(Pair, (BondOrder, BondOrder))] {
        self.pair_bonds
            .get(&pair)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Removes a matched pair, detaching every adjacency record.
    ///
    /// # Panics
    ///
    /// Panics if the pair is not matched.
    pub fn remove_pair(&mut self, pair: Pair) {
        let position = self
            .matched_pairs
            .iter()
            .position(|&p| p == pair)
            .expect("pair not matched");
        self.matched_pairs.remove(position);
        self.left_nodes.remove(&pair.0);
        self.right_nodes.remove(&pair.1);
        self.node_log.push(LogEntry::Removed(pair));

        let bound = self.pair_bonds.remove(&pair).unwrap_or_default();
        for (bound_pair, orders) in bound {
            if let Some(entries) = self.pair_bonds.get_mut(&bound_pair) {
                entries.retain(|&(p, o)| !(p == pair && o == orders));
            }
        }
    }

    /// Removes every pair adjacent to `pair` whose left atom is a hydrogen.
    ///
    /// Used when a heavy-atom pair is dropped, so its matched hydrogens do
    /// not dangle. Returns the removed pairs.
    pub fn remove_attached_hydrogens(&mut self, pair: Pair, ligands: &LigandPair) -> Vec<Pair> {
        let attached: Vec<Pair> = self
            .pair_bonds(pair)
            .iter()
            .map(|&(p, _)| p)
            .filter(|&(l, _)| ligands.left.atoms[l].is_hydrogen())
            .collect();
        for &hydrogen_pair in &attached {
            self.remove_pair(hydrogen_pair);
            log::debug!("removed attached hydrogen pair {:?}", hydrogen_pair);
        }
        attached
    }

    /// Absorbs every pair of `other` not already present, copying the bond
    /// adjacency of the new pairs.
    ///
    /// The caller must have established consistency beforehand (see
    /// [`SuperimposedTopology::is_consistent_with`]). Returns the pairs that
    /// were actually added.
    ///
    /// # Panics
    ///
    /// Panics if a new pair reuses an atom already mapped to a different
    /// partner.
    pub fn merge(&mut self, other: &SuperimposedTopology, ligands: &LigandPair) -> Vec<Pair> {
        let mut merged_pairs = Vec::new();
        for &pair in &other.matched_pairs {
            if self.contains_pair(pair) {
                continue;
            }
            assert!(
                !self.uses_either(pair.0, pair.1),
                "merge would map an atom twice"
            );
            self.add_pair(pair, ligands);
            merged_pairs.push(pair);
        }
        for &pair in &merged_pairs {
            let bonded: Vec<_> = other
                .pair_bonds(pair)
                .iter()
                .copied()
                .filter(|&(to, _)| self.contains_pair(to))
                .collect();
            self.link_pairs(pair, &bonded);
        }
        self.node_log.push(LogEntry::MergedWith(merged_pairs.clone()));
        merged_pairs
    }

    /// Number of independent cycles induced on the left and right side.
    pub fn induced_cycle_counts(&self, ligands: &LigandPair) -> (usize, usize) {
        let (l_edges, r_edges) = self.induced_edges(ligands);
        (
            rings::cycle_count(ligands.left.len(), &l_edges),
            rings::cycle_count(ligands.right.len(), &r_edges),
        )
    }

    /// Whether both induced sides carry the same number of cycles.
    pub fn same_cycle_count(&self, ligands: &LigandPair) -> bool {
        let (l, r) = self.induced_cycle_counts(ligands);
        l == r
    }

    /// Cycle bases of the subgraphs induced on the mapped atoms, per side.
    pub fn induced_cycles(
        &self,
        ligands: &LigandPair,
    ) -> (Vec<BTreeSet<usize>>, Vec<BTreeSet<usize>>) {
        let (l_edges, r_edges) = self.induced_edges(ligands);
        let to_sets = |cycles: Vec<Vec<usize>>| {
            cycles
                .into_iter()
                .map(|cycle| cycle.into_iter().collect())
                .collect()
        };
        (
            to_sets(rings::cycle_basis(ligands.left.len(), &l_edges)),
            to_sets(rings::cycle_basis(ligands.right.len(), &r_edges)),
        )
    }

    fn induced_edges(&self, ligands: &LigandPair) -> (Vec<rings::Edge>, Vec<rings::Edge>) {
        let left_adjacency: Vec<Vec<usize>> = (0..ligands.left.len())
            .map(|i| ligands.left.neighbor_indices(i).to_vec())
            .collect();
        let right_adjacency: Vec<Vec<usize>> = (0..ligands.right.len())
            .map(|i| ligands.right.neighbor_indices(i).to_vec())
            .collect();
        (
            rings::induced_edges(&left_adjacency, |i| self.left_nodes.contains(&i)),
            rings::induced_edges(&right_adjacency, |i| self.right_nodes.contains(&i)),
        )
    }

    /// Whether `other` can be merged into this mapping.
    ///
    /// Requires that no atom is paired differently across the two mappings,
    /// that at least one pair is shared, and that the merged result keeps the
    /// cycle counts of the two sides equal.
    pub fn is_consistent_with(&self, other: &SuperimposedTopology, ligands: &LigandPair) -> bool {
        for &(l, r) in &self.matched_pairs {
            for &(ol, or) in &other.matched_pairs {
                if (l == ol) != (r == or) {
                    return false;
                }
            }
        }

        if self.count_common_node_pairs(other) == 0 {
            return false;
        }

        self.is_consistent_cycles(other, ligands)
    }

    fn is_consistent_cycles(&self, other: &SuperimposedTopology, ligands: &LigandPair) -> bool {
        assert!(
            self.same_cycle_count(ligands),
            "left side has a different number of induced cycles than the right side"
        );
        assert!(
            other.same_cycle_count(ligands),
            "left side has a different number of induced cycles than the right side"
        );

        let mut probe = self.clone();
        probe.merge(other, ligands);
        probe.same_cycle_count(ligands)
    }
}

/// Copies the cycle sets with atoms shared between any two cycles removed.
///
/// Ring-junction atoms of fused systems belong to both rings; stripping them
/// keeps the cycle-spanning filter from counting a junction as an overlap.
fn nonoverlapping_cycles(cycles: &[Vec<usize>]) -> Vec<BTreeSet<usize>> {
    let mut sets: Vec<BTreeSet<usize>> = cycles
        .iter()
        .map(|cycle| cycle.iter().copied().collect())
        .collect();
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            let common: Vec<usize> = sets[i].intersection(&sets[j]).copied().collect();
            for atom in common {
                sets[i].remove(&atom);
                sets[j].remove(&atom);
            }
        }
    }
    sets
}
