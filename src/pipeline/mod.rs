//! Orchestration of the full superimposition: input validation, seed
//! selection, the per-seed search with deduplication, and the global
//! post-filter cascade.

use crate::core::error::SuperimposeError;
use crate::core::LigandPair;
use crate::search::{
    SearchSettings, cartesian_product, extract_best, overlay, starting_configurations,
};
use crate::suptop::{Pair, SuperimposedTopology, validate_charges};
use serde::Deserialize;

/// Options recognized by [`superimpose_topologies`].
///
/// Every field has the production default; a configuration can also be
/// loaded from TOML, where absent keys fall back to those defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuperimposeConfig {
    /// Per-pair absolute charge tolerance before a pair is removed.
    pub pair_charge_atol: f64,
    /// Apply the per-pair charge refinement.
    pub use_charges: bool,
    /// Rank mirrors and alternative mappings by aligned RMSD.
    pub use_coords: bool,
    /// Explicit seed list as (left name, right name) couples.
    pub starting_node_pairs: Option<Vec<(String, String)>>,
    /// Pairs of atom names that must not stay matched.
    pub force_mismatch: Option<Vec<(String, String)>>,
    /// Keep disconnected mapping components instead of pruning them.
    pub disjoint_components: bool,
    /// Balance the net charge of the matched region.
    pub net_charge_filter: bool,
    /// Net charge magnitude above which pairs are removed.
    pub net_charge_threshold: f64,
    /// Spread the charge drift of pair averaging over the unmatched atoms.
    pub redistribute_charges_over_unmatched: bool,
    /// Align the ligands over the matched region.
    pub align_molecules: bool,
    /// Permit mappings that cover only part of a ring.
    pub partial_rings_allowed: bool,
    /// Skip every charge-related step.
    pub ignore_charges_completely: bool,
    /// Tolerate differing bond orders across a matched edge.
    pub ignore_bond_types: bool,
    /// Use the left ligand as the alignment reference frame.
    pub left_coords_are_ref: bool,
    /// Match by element during the search (tightened to exact types later).
    pub use_general_type: bool,
    /// Keep element-level matches without the exact-type tightening.
    pub use_only_element: bool,
    /// Require the two ligands to use disjoint atom names.
    pub check_atom_names_unique: bool,
    /// Narrow the seed pairs heuristically instead of trying all couples.
    pub starting_pairs_heuristics: bool,
}

impl Default for SuperimposeConfig {
    fn default() -> Self {
        Self {
            pair_charge_atol: 0.1,
            use_charges: true,
            use_coords: true,
            starting_node_pairs: None,
            force_mismatch: None,
            disjoint_components: true,
            net_charge_filter: true,
            net_charge_threshold: 0.1,
            redistribute_charges_over_unmatched: true,
            align_molecules: true,
            partial_rings_allowed: true,
            ignore_charges_completely: false,
            ignore_bond_types: true,
            left_coords_are_ref: true,
            use_general_type: true,
            use_only_element: false,
            check_atom_names_unique: true,
            starting_pairs_heuristics: true,
        }
    }
}

impl SuperimposeConfig {
    /// Parses a configuration from TOML; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the underlying deserialization error for malformed TOML or
    /// unknown keys.
    pub fn from_toml_str(payload: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(payload)
    }
}

/// Computes the superimposed topologies of a ligand pair.
///
/// Runs the overlay search from the configured seed pairs, deduplicates and
/// ranks the candidate mappings, applies the post-filter cascade, and
/// returns the surviving mappings sorted by ascending RMSD. The ligand pair
/// is mutated in place: type normalization, charge redistribution, and the
/// final alignment write through to the atoms.
///
/// When no seed yields a non-empty mapping the result is an empty vector.
///
/// # Errors
///
/// Returns [`SuperimposeError`] for malformed inputs (charge totals, name
/// collisions), unknown atom names in the configuration, or an ambiguous
/// ring-type normalization.
pub fn superimpose_topologies(
    ligands: &mut LigandPair,
    config: &SuperimposeConfig,
) -> Result<Vec<SuperimposedTopology>, SuperimposeError> {
    if !config.ignore_charges_completely {
        validate_charges(ligands)?;
    }
    if config.check_atom_names_unique {
        ligands.check_names_disjoint()?;
    }

    let settings = SearchSettings {
        use_element_type: config.use_general_type,
        use_coords: config.use_coords,
    };
    let seeds = resolve_seeds(ligands, config)?;
    let mut suptops = search_from_seeds(ligands, &seeds, &settings, config);

    // mappings made of hydrogens alone carry no structural information
    suptops.retain(|suptop| {
        suptop
            .matched_pairs()
            .iter()
            .any(|&(l, _)| !ligands.left.atoms[l].is_hydrogen())
    });

    if suptops.is_empty() {
        log::warn!("no seed produced a non-empty mapping; the ligands share no common substructure");
        return Ok(Vec::new());
    }
    log::info!(
        "search produced {} mapping(s) of sizes {:?}",
        suptops.len(),
        suptops.iter().map(SuperimposedTopology::len).collect::<Vec<_>>()
    );

    for suptop in &mut suptops {
        suptop.ignore_bond_types = config.ignore_bond_types;
    }

    // fix the coordinate frame once, using the largest mapping
    if config.align_molecules {
        let largest = suptops
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))
            .map(|(index, _)| index)
            .expect("at least one mapping");
        suptops[largest].align_and_overwrite(ligands);
    }

    for suptop in &suptops {
        suptop.normalize_ring_double_bond_types(ligands)?;
    }

    if !config.use_only_element {
        for suptop in &mut suptops {
            suptop.remove_pairs_with_mismatched_types(ligands);
        }
    }

    if config.use_charges && !config.ignore_charges_completely {
        for suptop in &mut suptops {
            let removed = suptop.refine_against_charges(ligands, config.pair_charge_atol);
            if !removed.is_empty() {
                log::info!(
                    "removed {} pair(s) with charge incompatibility beyond {:.3} e",
                    removed.len(),
                    config.pair_charge_atol
                );
            }
        }
    }

    if let Some(force_mismatch) = &config.force_mismatch {
        for (left_name, right_name) in force_mismatch {
            let pair = resolve_name_pair(ligands, left_name, right_name)?;
            for suptop in &mut suptops {
                if suptop.contains_pair(pair) {
                    suptop.remove_pair(pair);
                    log::info!("removed forced mismatch {left_name}-{right_name}");
                }
            }
        }
    }

    if config.net_charge_filter && !config.ignore_charges_completely {
        balance_net_charge(&mut suptops, ligands, config.net_charge_threshold);
    }

    if !config.partial_rings_allowed {
        for suptop in &mut suptops {
            suptop.enforce_no_partial_rings(ligands);
            if !suptop.removed_unmatched_rings().is_empty() {
                log::info!(
                    "removed {} pair(s) sitting on partial rings",
                    suptop.removed_unmatched_rings().len()
                );
            }
        }
    }

    suptops.retain(|suptop| !suptop.is_empty());

    if !config.disjoint_components {
        for suptop in &mut suptops {
            let removed = suptop.largest_cc_survives();
            if !removed.is_empty() {
                log::info!("removed {} pair(s) in disjoint components", removed.len());
            }
        }
        suptops.retain(|suptop| !suptop.is_empty());
        if suptops.len() > 1 {
            let max_size = suptops
                .iter()
                .map(SuperimposedTopology::len)
                .max()
                .expect("non-empty");
            let keep = suptops
                .iter()
                .position(|suptop| suptop.len() == max_size)
                .expect("a largest mapping exists");
            let chosen = suptops.swap_remove(keep);
            suptops = vec![chosen];
        }
    }

    if config.redistribute_charges_over_unmatched && !config.ignore_charges_completely {
        match suptops.as_slice() {
            [_] => suptops[0].redistribute_charges(ligands)?,
            [] => {}
            _ => log::warn!(
                "skipping charge redistribution: {} disjoint mappings remain",
                suptops.len()
            ),
        }
    }

    let mut next_id = 1;
    for suptop in &mut suptops {
        next_id = suptop.assign_atom_ids(ligands, next_id);
    }

    suptops.sort_by(|a, b| a.rmsd(ligands).total_cmp(&b.rmsd(ligands)));

    if config.align_molecules {
        for suptop in &suptops {
            let main_rmsd = suptop.aligned_rmsd(ligands);
            for mirror in suptop.mirrors() {
                let mirror_rmsd = mirror.aligned_rmsd(ligands);
                if mirror_rmsd < main_rmsd {
                    log::warn!(
                        "a mirror aligns better than the chosen mapping \
                         (RMSD {mirror_rmsd:.4} < {main_rmsd:.4})"
                    );
                }
            }
            suptop.align_and_overwrite(ligands);
        }
    }

    for suptop in &suptops {
        log::info!(
            "final mapping: {} matched pair(s) out of {}L/{}R atoms",
            suptop.len(),
            ligands.left.len(),
            ligands.right.len()
        );
    }

    Ok(suptops)
}

fn resolve_seeds(
    ligands: &LigandPair,
    config: &SuperimposeConfig,
) -> Result<Vec<Pair>, SuperimposeError> {
    if let Some(named_pairs) = &config.starting_node_pairs {
        return named_pairs
            .iter()
            .map(|(left_name, right_name)| resolve_name_pair(ligands, left_name, right_name))
            .collect();
    }
    if config.starting_pairs_heuristics {
        Ok(starting_configurations(ligands))
    } else {
        Ok(cartesian_product(ligands))
    }
}

fn resolve_name_pair(
    ligands: &LigandPair,
    left_name: &str,
    right_name: &str,
) -> Result<Pair, SuperimposeError> {
    let left_name = left_name.to_uppercase();
    let right_name = right_name.to_uppercase();
    let left = ligands
        .left
        .index_of_name(&left_name)
        .ok_or(SuperimposeError::UnknownAtomName { name: left_name })?;
    let right = ligands
        .right
        .index_of_name(&right_name)
        .ok_or(SuperimposeError::UnknownAtomName { name: right_name })?;
    Ok((left, right))
}

/// Runs the overlay from every seed, folding each candidate into the
/// accepted set: duplicates and subgraphs are dropped, mirrors keep their
/// best representative, supergraphs displace what they cover, and partial
/// overlaps resolve by size then RMSD.
fn search_from_seeds(
    ligands: &LigandPair,
    seeds: &[Pair],
    settings: &SearchSettings,
    config: &SuperimposeConfig,
) -> Vec<SuperimposedTopology> {
    let mut suptops: Vec<SuperimposedTopology> = Vec::new();

    for &(n1, n2) in seeds {
        let mut seed_suptop = SuperimposedTopology::new(ligands);
        seed_suptop.left_coords_are_ref = config.left_coords_are_ref;

        let Some(candidate) = overlay(ligands, n1, n2, None, None, seed_suptop, settings) else {
            continue;
        };
        if candidate.is_empty() {
            continue;
        }

        if suptops.iter().any(|existing| existing.eq_pairs(&candidate)) {
            continue;
        }
        if suptops
            .iter()
            .any(|existing| candidate.is_subgraph_of(existing))
        {
            continue;
        }

        let Some(candidate) = fold_mirror(candidate, &mut suptops, ligands, settings) else {
            continue;
        };

        let accepted_before = suptops.len();
        suptops.retain(|existing| !existing.is_subgraph_of(&candidate));
        if suptops.len() != accepted_before {
            suptops.push(candidate);
            continue;
        }

        if let Some(candidate) = resolve_partial_overlaps(candidate, &mut suptops, ligands) {
            suptops.push(candidate);
        }
    }

    suptops
}

/// If the candidate mirrors an accepted mapping, keeps the better of the two
/// in place and consumes the candidate. Returns the candidate when no mirror
/// was found.
fn fold_mirror(
    candidate: SuperimposedTopology,
    suptops: &mut Vec<SuperimposedTopology>,
    ligands: &LigandPair,
    settings: &SearchSettings,
) -> Option<SuperimposedTopology> {
    let mirror_index = suptops
        .iter()
        .position(|existing| existing.is_mirror_of(&candidate));
    let Some(index) = mirror_index else {
        return Some(candidate);
    };
    let existing = suptops.remove(index);
    let winner = extract_best(vec![candidate, existing], ligands, settings);
    suptops.push(winner);
    None
}

/// Resolves node-sharing conflicts with the accepted mappings: the larger
/// side wins; equal sizes rank by plain RMSD with the loser filed as an
/// alternative mapping. Returns the candidate if it should be accepted.
fn resolve_partial_overlaps(
    mut candidate: SuperimposedTopology,
    suptops: &mut Vec<SuperimposedTopology>,
    ligands: &LigandPair,
) -> Option<SuperimposedTopology> {
    for index in (0..suptops.len()).rev() {
        if !suptops[index].shares_any_node_with(&candidate) {
            continue;
        }
        if suptops[index].len() > candidate.len() {
            return None;
        }
        if suptops[index].len() < candidate.len() {
            suptops.remove(index);
            continue;
        }
        if suptops[index].rmsd(ligands) < candidate.rmsd(ligands) {
            suptops[index].add_alternative_mapping(candidate);
            return None;
        }
        let loser = suptops.remove(index);
        candidate.add_alternative_mapping(loser);
    }
    Some(candidate)
}

/// Removes worst-charge pairs from each mapping until its net charge sits
/// within the threshold; mappings emptied in the process are dropped.
fn balance_net_charge(
    suptops: &mut Vec<SuperimposedTopology>,
    ligands: &LigandPair,
    threshold: f64,
) {
    log::info!("accounting for a net charge limit of {threshold:.3} e");
    for index in (0..suptops.len()).rev() {
        while suptops[index].net_charge(ligands).abs() > threshold {
            let removed = suptops[index].remove_worst_charge_match(ligands);
            assert!(
                removed > 0.0,
                "net charge imbalance without any differing pair"
            );
            if suptops[index].is_empty() {
                break;
            }
        }
        if !suptops[index].removed_net_charge().is_empty() {
            log::info!(
                "removed {} pair(s) to balance the net charge",
                suptops[index].removed_net_charge().len()
            );
        }
        if suptops[index].is_empty() {
            suptops.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Atom, BondOrder, Topology};

    #[test]
    fn config_defaults_match_the_documented_values() {
        let config = SuperimposeConfig::default();
        assert_eq!(config.pair_charge_atol, 0.1);
        assert!(config.use_charges);
        assert!(config.use_coords);
        assert!(config.starting_node_pairs.is_none());
        assert!(config.force_mismatch.is_none());
        assert!(config.disjoint_components);
        assert!(config.net_charge_filter);
        assert_eq!(config.net_charge_threshold, 0.1);
        assert!(config.redistribute_charges_over_unmatched);
        assert!(config.align_molecules);
        assert!(config.partial_rings_allowed);
        assert!(!config.ignore_charges_completely);
        assert!(config.ignore_bond_types);
        assert!(config.left_coords_are_ref);
        assert!(config.use_general_type);
        assert!(!config.use_only_element);
        assert!(config.check_atom_names_unique);
        assert!(config.starting_pairs_heuristics);
    }

    #[test]
    fn config_loads_from_toml_with_partial_keys() {
        let config = SuperimposeConfig::from_toml_str(
            r#"
            pair_charge_atol = 0.05
            partial_rings_allowed = false
            force_mismatch = [["C1", "C11"]]
            "#,
        )
        .unwrap();
        assert_eq!(config.pair_charge_atol, 0.05);
        assert!(!config.partial_rings_allowed);
        assert_eq!(
            config.force_mismatch,
            Some(vec![("C1".to_string(), "C11".to_string())])
        );
        // untouched keys keep their defaults
        assert!(config.net_charge_filter);
    }

    #[test]
    fn config_rejects_unknown_keys() {
        assert!(SuperimposeConfig::from_toml_str("no_such_option = true").is_err());
    }

    #[test]
    fn overlapping_atom_names_are_rejected() {
        let atoms = vec![Atom::new(1, "C1", "C3", 0.0).unwrap()];
        let left = Topology::from_parts(atoms.clone(), &[]).unwrap();
        let right = Topology::from_parts(atoms, &[]).unwrap();
        let mut ligands = LigandPair::new(left, right);

        let result = superimpose_topologies(&mut ligands, &SuperimposeConfig::default());
        assert!(matches!(result, Err(SuperimposeError::InvalidInput(_))));
    }

    #[test]
    fn unmatchable_ligands_return_an_empty_result() {
        let left = Topology::from_parts(
            vec![Atom::new(1, "C1", "C3", 0.0).unwrap()],
            &[],
        )
        .unwrap();
        let right = Topology::from_parts(
            vec![Atom::new(1, "O11", "OH", 0.0).unwrap()],
            &[],
        )
        .unwrap();
        let mut ligands = LigandPair::new(left, right);

        let mut config = SuperimposeConfig::default();
        config.starting_pairs_heuristics = false;
        let suptops = superimpose_topologies(&mut ligands, &config).unwrap();
        assert!(suptops.is_empty());
    }

    #[test]
    fn unknown_seed_name_is_an_error() {
        let left = Topology::from_parts(
            vec![Atom::new(1, "C1", "C3", 0.0).unwrap()],
            &[],
        )
        .unwrap();
        let right = Topology::from_parts(
            vec![Atom::new(1, "C11", "C3", 0.0).unwrap()],
            &[],
        )
        .unwrap();
        let mut ligands = LigandPair::new(left, right);

        let mut config = SuperimposeConfig::default();
        config.starting_node_pairs = Some(vec![("C9".to_string(), "C11".to_string())]);
        let result = superimpose_topologies(&mut ligands, &config);
        assert!(matches!(
            result,
            Err(SuperimposeError::UnknownAtomName { .. })
        ));
    }
}
