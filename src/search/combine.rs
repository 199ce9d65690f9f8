//! Resolution of competing branch results: guarded merging, injection
//! enumeration for many-to-many neighbor classes, and RMSD-based selection
//! of the best candidate with mirror bookkeeping.

use super::SearchSettings;
use crate::core::LigandPair;
use crate::suptop::SuperimposedTopology;

/// Per-class branch results: for each left neighbor, the surviving mapping
/// per right neighbor, in bond-enumeration order.
pub(crate) type ClassSolutions = Vec<(usize, Vec<(usize, SuperimposedTopology)>)>;

/// Keeps only the mappings of maximal size.
pub(crate) fn largest_of(candidates: Vec<SuperimposedTopology>) -> Vec<SuperimposedTopology> {
    let largest = candidates.iter().map(SuperimposedTopology::len).max();
    match largest {
        Some(size) => candidates
            .into_iter()
            .filter(|candidate| candidate.len() == size)
            .collect(),
        None => Vec::new(),
    }
}

/// Picks the best of several same-sized candidates.
///
/// With coordinates enabled the candidate with the lowest aligned RMSD wins
/// (first on ties); otherwise the first candidate wins. Every loser is
/// absorbed into the winner: as a mirror when it covers the identical atom
/// set, as an alternative mapping otherwise.
///
/// # Panics
///
/// Panics when `candidates` is empty.
pub(crate) fn extract_best(
    mut candidates: Vec<SuperimposedTopology>,
    ligands: &LigandPair,
    settings: &SearchSettings,
) -> SuperimposedTopology {
    assert!(!candidates.is_empty(), "cannot pick the best of nothing");
    if candidates.len() == 1 {
        return candidates.pop().expect("one candidate");
    }

    let best_index = if settings.use_coords {
        let rmsds: Vec<f64> = candidates
            .iter()
            .map(|candidate| candidate.aligned_rmsd(ligands))
            .collect();
        let mut best = 0;
        for (index, rmsd) in rmsds.iter().enumerate() {
            if *rmsd < rmsds[best] {
                best = index;
            }
        }
        best
    } else {
        0
    };

    let mut winner = candidates.remove(best_index);
    for loser in candidates {
        if loser.is_mirror_of(&winner) {
            winner.absorb_mirror(loser);
        } else {
            winner.add_alternative_mapping(loser);
        }
    }
    winner
}

/// Merges `other` into `target` when the two are compatible.
///
/// Equal mappings and subgraphs of `target` are ignored; inconsistent
/// mappings leave `target` untouched. Returns whether pairs were absorbed.
pub(crate) fn long_merge(
    target: &mut SuperimposedTopology,
    other: &SuperimposedTopology,
    ligands: &LigandPair,
) -> bool {
    if target.eq_pairs(other) {
        log::debug!("merge skipped: the mappings are equal");
        return false;
    }
    if other.is_subgraph_of(target) {
        log::debug!("merge skipped: already a superset");
        return false;
    }
    if !target.is_consistent_with(other, ligands) {
        log::debug!("merge skipped: mappings are not consistent");
        return false;
    }
    !target.merge(other, ligands).is_empty()
}

/// Resolves the many-to-many choice within one neighbor class into a single
/// mapping.
///
/// One left atom picks its largest candidate directly; several left atoms
/// sharing one right atom likewise. The general case enumerates every
/// injection between the left and right members, merges the participating
/// branch results under the consistency guards, and keeps the best of the
/// largest merged outcomes.
///
/// # Panics
///
/// Panics when no injection yields a merged candidate; the caller only
/// passes classes with at least one surviving branch, which always admits a
/// singleton injection.
pub(crate) fn solve_one_combination(
    solutions: ClassSolutions,
    ligands: &LigandPair,
    settings: &SearchSettings,
) -> SuperimposedTopology {
    assert!(!solutions.is_empty(), "empty neighbor class");

    if solutions.len() == 1 {
        let (_, candidates) = solutions.into_iter().next().expect("one entry");
        let candidates: Vec<SuperimposedTopology> =
            candidates.into_iter().map(|(_, suptop)| suptop).collect();
        return extract_best(largest_of(candidates), ligands, settings);
    }

    let mut right_members: Vec<usize> = Vec::new();
    for (_, candidates) in &solutions {
        for &(right, _) in candidates {
            if !right_members.contains(&right) {
                right_members.push(right);
            }
        }
    }

    if right_members.len() == 1 {
        log::debug!("many left neighbors onto one right neighbor");
        let candidates: Vec<SuperimposedTopology> = solutions
            .into_iter()
            .map(|(_, mut candidates)| candidates.remove(0).1)
            .collect();
        return extract_best(largest_of(candidates), ligands, settings);
    }

    let left_members: Vec<usize> = solutions.iter().map(|&(left, _)| left).collect();
    let injection_size = left_members.len().min(right_members.len());

    let mut alternatives = Vec::new();
    for injection in injections(&left_members, &right_members, injection_size) {
        let mut merged: Option<SuperimposedTopology> = None;
        for (left, right) in injection {
            // a missing entry means this branch died earlier (e.g. on the
            // cycle rules), so the theoretical combination cannot use it
            let Some(suptop) = lookup(&solutions, left, right) else {
                continue;
            };
            match merged.as_mut() {
                None => merged = Some(suptop.clone()),
                Some(target) => {
                    long_merge(target, suptop, ligands);
                }
            }
        }
        if let Some(merged) = merged {
            alternatives.push(merged);
        }
    }
    assert!(
        !alternatives.is_empty(),
        "no injection produced a merged mapping"
    );

    extract_best(largest_of(alternatives), ligands, settings)
}

fn lookup<'a>(
    solutions: &'a ClassSolutions,
    left: usize,
    right: usize,
) -> Option<&'a SuperimposedTopology> {
    solutions
        .iter()
        .find(|&&(l, _)| l == left)
        .and_then(|(_, candidates)| {
            candidates
                .iter()
                .find(|&&(r, _)| r == right)
                .map(|(_, suptop)| suptop)
        })
}

/// Enumerates every injective assignment of `size` left-right couples.
///
/// Couples are drawn from the Cartesian product in left-major order and
/// combined lexicographically, so the enumeration order is deterministic.
fn injections(left: &[usize], right: &[usize], size: usize) -> Vec<Vec<(usize, usize)>> {
    let all_pairs: Vec<(usize, usize)> = left
        .iter()
        .flat_map(|&l| right.iter().map(move |&r| (l, r)))
        .collect();

    let mut result = Vec::new();
    let mut current = Vec::with_capacity(size);
    pick_injective(&all_pairs, 0, size, &mut current, &mut result);
    result
}

fn pick_injective(
    pairs: &[(usize, usize)],
    start: usize,
    size: usize,
    current: &mut Vec<(usize, usize)>,
    result: &mut Vec<Vec<(usize, usize)>>,
) {
    if current.len() == size {
        result.push(current.clone());
        return;
    }
    for index in start..pairs.len() {
        let (l, r) = pairs[index];
        if current.iter().any(|&(cl, cr)| cl == l || cr == r) {
            continue;
        }
        current.push((l, r));
        pick_injective(pairs, index + 1, size, current, result);
        current.pop();
    }
}
