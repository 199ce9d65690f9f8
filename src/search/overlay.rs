//! The recursive overlay kernel: a joint depth-first traversal of the two
//! ligand graphs that grows a partial mapping from a seed pair.
//!
//! Each recursive call works on its own copy of the mapping, so branches do
//! not interfere; dead branches signal by returning `None` rather than by
//! error. The kernel keeps cycles coherent across the two sides at every
//! step and resolves symmetric neighbor choices through the combination
//! resolver.

use super::SearchSettings;
use super::combine::{ClassSolutions, extract_best, largest_of, solve_one_combination};
use crate::core::{BondOrder, Element, LigandPair};
use crate::suptop::SuperimposedTopology;
use std::collections::BTreeMap;

/// Grows `suptop` by the candidate pair `(n1, n2)` and recurses over the
/// type-compatible neighbor combinations.
///
/// `parents` and `parent_orders` carry the pair this call descended from;
/// both are `None` for the seed. Returns the best mapping reachable from
/// this branch, or `None` when the candidate is incompatible (already
/// mapped, type mismatch, or a cycle rule is violated).
pub(crate) fn overlay(
    ligands: &LigandPair,
    n1: usize,
    n2: usize,
    parents: Option<(usize, usize)>,
    parent_orders: Option<(BondOrder, BondOrder)>,
    mut suptop: SuperimposedTopology,
    settings: &SearchSettings,
) -> Option<SuperimposedTopology> {
    if suptop.uses_either(n1, n2) {
        return None;
    }

    let left_atom = &ligands.left.atoms[n1];
    let right_atom = &ligands.right.atoms[n2];
    if settings.use_element_type && !left_atom.same_element(right_atom) {
        return None;
    }
    if !settings.use_element_type && !left_atom.same_type(right_atom) {
        return None;
    }

    let (parent_left, parent_right) = match parents {
        Some((p1, p2)) => (Some(p1), Some(p2)),
        None => (None, None),
    };

    // a cycle closed on one side must close identically on the other
    if !cycle_closures_agree(ligands, &suptop, n1, n2, parent_left, parent_right) {
        return None;
    }
    if !cycle_closures_agree_mirrored(ligands, &suptop, n1, n2, parent_left, parent_right) {
        return None;
    }

    if suptop.cycle_spans_multiple_cycles() {
        log::debug!("branch dropped: a ring would span multiple rings");
        return None;
    }

    log::debug!(
        "adding pair {}-{} to a mapping of {}",
        left_atom.name,
        right_atom.name,
        suptop.len()
    );
    suptop.add_pair((n1, n2), ligands);
    if let (Some(parent_pair), Some(orders)) = (parents, parent_orders) {
        suptop.link_with_parent((n1, n2), parent_pair, orders);
    }

    // record edges this pair induces towards pairs matched earlier
    for &(m1, order1) in ligands.left.neighbors(n1) {
        if Some(m1) == parent_left {
            continue;
        }
        for &(m2, order2) in ligands.right.neighbors(n2) {
            if Some(m2) == parent_right {
                continue;
            }
            if suptop.contains_pair((m1, m2)) {
                suptop.link_pairs((n1, n2), &[((m1, m2), (order1, order2))]);
            }
        }
    }

    // group the remaining neighbors by element; only classes present on
    // both sides can pair up
    let mut classes: BTreeMap<Element, (Vec<(usize, BondOrder)>, Vec<(usize, BondOrder)>)> =
        BTreeMap::new();
    for &(m1, order1) in ligands.left.neighbors(n1) {
        if Some(m1) != parent_left {
            classes
                .entry(ligands.left.atoms[m1].element)
                .or_default()
                .0
                .push((m1, order1));
        }
    }
    for &(m2, order2) in ligands.right.neighbors(n2) {
        if Some(m2) != parent_right {
            classes
                .entry(ligands.right.atoms[m2].element)
                .or_default()
                .1
                .push((m2, order2));
        }
    }

    let mut combinations: Vec<ClassSolutions> = Vec::new();
    for (left_neighbors, right_neighbors) in classes.values() {
        if left_neighbors.is_empty() || right_neighbors.is_empty() {
            continue;
        }
        let mut class_solutions: ClassSolutions = Vec::new();
        for &(m1, order1) in left_neighbors {
            let mut solutions_for_left = Vec::new();
            for &(m2, order2) in right_neighbors {
                let branch = overlay(
                    ligands,
                    m1,
                    m2,
                    Some((n1, n2)),
                    Some((order1, order2)),
                    suptop.clone(),
                    settings,
                );
                if let Some(branch) = branch {
                    solutions_for_left.push((m2, branch));
                }
            }
            if !solutions_for_left.is_empty() {
                class_solutions.push((m1, solutions_for_left));
            }
        }
        if !class_solutions.is_empty() {
            combinations.push(class_solutions);
        }
    }

    if combinations.is_empty() {
        return Some(suptop);
    }
    if combinations.len() == 1 {
        let class_solutions = combinations.pop().expect("one class");
        return Some(solve_one_combination(class_solutions, ligands, settings));
    }

    // several element classes each resolved to their own mapping; merge the
    // compatible ones and keep the best of the largest
    let mut solutions: Vec<SuperimposedTopology> = combinations
        .into_iter()
        .map(|class_solutions| solve_one_combination(class_solutions, ligands, settings))
        .collect();
    solutions.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut index = 0;
    while index < solutions.len() {
        let mut other = solutions.len();
        while other > 0 {
            other -= 1;
            if other == index {
                continue;
            }
            if solutions[index].eq_pairs(&solutions[other]) {
                solutions.remove(other);
                if other < index {
                    index -= 1;
                }
                continue;
            }
            if solutions[other].is_subgraph_of(&solutions[index]) {
                continue;
            }
            if solutions[index].is_consistent_with(&solutions[other], ligands) {
                let absorbed = solutions[other].clone();
                solutions[index].merge(&absorbed, ligands);
                solutions.remove(other);
                if other < index {
                    index -= 1;
                }
            }
        }
        index += 1;
    }

    Some(extract_best(largest_of(solutions), ligands, settings))
}

/// Checks that every cycle `n1` closes on the left is closed the same way by
/// `n2` on the right: the bonded, already-mapped counterpart must be paired
/// with the corresponding atom.
fn cycle_closures_agree(
    ligands: &LigandPair,
    suptop: &SuperimposedTopology,
    n1: usize,
    n2: usize,
    parent_left: Option<usize>,
    parent_right: Option<usize>,
) -> bool {
    for &m1 in ligands.left.neighbor_indices(n1) {
        if Some(m1) == parent_left || !suptop.contains_left_node(m1) {
            continue;
        }
        let closed_on_right = ligands.right.neighbor_indices(n2).iter().any(|&m2| {
            Some(m2) != parent_right && suptop.contains_pair((m1, m2))
        });
        if !closed_on_right {
            return false;
        }
    }
    true
}

/// The right-side counterpart of [`cycle_closures_agree`].
fn cycle_closures_agree_mirrored(
    ligands: &LigandPair,
    suptop: &SuperimposedTopology,
    n1: usize,
    n2: usize,
    parent_left: Option<usize>,
    parent_right: Option<usize>,
) -> bool {
    for &m2 in ligands.right.neighbor_indices(n2) {
        if Some(m2) == parent_right || !suptop.contains_right_node(m2) {
            continue;
        }
        let closed_on_left = ligands.left.neighbor_indices(n1).iter().any(|&m1| {
            Some(m1) != parent_left && suptop.contains_pair((m1, m2))
        });
        if !closed_on_left {
            return false;
        }
    }
    true
}
