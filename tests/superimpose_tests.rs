
use harness::{assert_matched_names, atom, bond, build_pair};
use ligand_superimposer::{BondOrder, LigandPair, SuperimposeConfig, superimpose_topologies};

fn default_config() -> SuperimposeConfig {
    SuperimposeConfig::default()
}

fn seeded_config(left: &str, right: &str) -> SuperimposeConfig {
    let mut config = SuperimposeConfig::default();
    config.starting_node_pairs = Some(vec![(left.to_string(), right.to_string())]);
    config
}

/// Two-atom C-N chains on both sides.
fn cn_chain_pair() -> LigandPair {
    build_pair(
        &[
            atom("C1", "C3", 0.0, [1.0, 1.0, 0.0]),
            atom("N1", "N3", 0.0, [1.0, 2.0, 0.0]),
        ],
        &[bond("C1", "N1")],
        &[
            atom("C11", "C3", 0.0, [1.0, 1.0, 0.0]),
            atom("N11", "N3", 0.0, [1.0, 2.0, 0.0]),
        ],
        &[bond("C11", "N11")],
    )
}

#[test]
fn chain_seeded_at_mismatched_elements_finds_nothing() {
    let mut ligands = cn_chain_pair();
    let suptops =
        superimpose_topologies(&mut ligands, &seeded_config("C1", "N11")).unwrap();
    assert!(suptops.is_empty());
}

#[test]
fn chain_seeded_at_matching_carbons_maps_both_atoms() {
    let mut ligands = cn_chain_pair();
    let suptops =
        superimpose_topologies(&mut ligands, &seeded_config("C1", "C11")).unwrap();

    assert_eq!(suptops.len(), 1);
    let suptop = &suptops[0];
    assert_matched_names(suptop, &ligands, &[("C1", "C11"), ("N1", "N11")]);
    assert!(suptop.mirrors().is_empty());
    assert!(suptop.internal_ids().is_some());
}

/// An ester-like branch: the two terminal oxygens can swap, producing one
/// mirror.
#[test]
fn ester_oxygens_produce_exactly_one_mirror() {
    let mut ligands = build_pair(
        &[
            atom("C1", "C3", 0.0, [1.0, 1.0, 0.0]),
            atom("N1", "N3", 0.0, [1.0, 2.0, 0.0]),
            atom("O1", "O", 0.0, [1.0, 3.0, 0.0]),
            atom("O2", "O", 0.0, [2.0, 3.0, 0.0]),
        ],
        &[bond("C1", "N1"), bond("N1", "O1"), bond("N1", "O2")],
        &[
            atom("C11", "C3", 0.0, [1.0, 1.0, 0.0]),
            atom("N11", "N3", 0.0, [1.0, 2.0, 0.0]),
            atom("O11", "O", 0.0, [1.0, 3.0, 0.0]),
            atom("O12", "O", 0.0, [2.0, 3.0, 0.0]),
        ],
        &[bond("C11", "N11"), bond("N11", "O11"), bond("N11", "O12")],
    );

    let suptops =
        superimpose_topologies(&mut ligands, &seeded_config("C1", "C11")).unwrap();

    assert_eq!(suptops.len(), 1);
    let suptop = &suptops[0];
    assert_matched_names(
        suptop,
        &ligands,
        &[("C1", "C11"), ("N1", "N11"), ("O1", "O11"), ("O2", "O12")],
    );

    assert_eq!(suptop.mirrors().len(), 1);
    let mirror = &suptop.mirrors()[0];
    assert!(mirror.contains_atom_name_pair(&ligands, "O1", "O12"));
    assert!(mirror.contains_atom_name_pair(&ligands, "O2", "O11"));
}

/// Identical triangles: every seed couple leads to the same three-pair
/// mapping with one ring per side; the ring automorphisms surface as mirrors.
#[test]
fn triangles_map_fully_with_cycle_parity_and_mirrors() {
    let triangle_left = [
        atom("C1", "C3", 0.0, [1.0, 1.0, 0.0]),
        atom("C2", "C3", 0.0, [1.0, 2.0, 0.0]),
        atom("C3", "C3", 0.0, [2.0, 2.0, 0.0]),
    ];
    let triangle_right = [
        atom("C11", "C3", 0.0, [1.0, 1.0, 0.0]),
        atom("C12", "C3", 0.0, [1.0, 2.0, 0.0]),
        atom("C13", "C3", 0.0, [2.0, 2.0, 0.0]),
    ];
    let bonds_left = [bond("C1", "C2"), bond("C2", "C3"), bond("C3", "C1")];
    let bonds_right = [bond("C11", "C12"), bond("C12", "C13"), bond("C13", "C11")];

    let mut ligands = build_pair(&triangle_left, &bonds_left, &triangle_right, &bonds_right);

    // ring carbons are excluded by the seed heuristic, so try all couples
    let mut config = default_config();
    config.starting_pairs_heuristics = false;
    let suptops = superimpose_topologies(&mut ligands, &config).unwrap();

    assert_eq!(suptops.len(), 1);
    let suptop = &suptops[0];
    assert_eq!(suptop.len(), 3);
    assert_eq!(suptop.induced_cycle_counts(&ligands), (1, 1));
    assert!(!suptop.mirrors().is_empty());
    for mirror in suptop.mirrors() {
        assert_eq!(mirror.len(), 3);
    }
}

/// Charges outside the tolerance cascade away a mutated end of the molecule
/// together with its hydrogen.
#[test]
fn charge_refinement_removes_the_mutated_end() {
    let mut ligands = build_pair(
        &[
            atom("C1", "C3", -0.10, [0.0, 0.0, 0.0]),
            atom("C2", "C3", 0.00, [1.5, 0.0, 0.0]),
            atom("C3", "C3", 0.30, [3.0, 0.0, 0.0]),
            atom("H1", "HC", -0.20, [4.5, 0.0, 0.0]),
        ],
        &[bond("C1", "C2"), bond("C2", "C3"), bond("C3", "H1")],
        &[
            atom("C11", "C3", -0.10, [0.0, 0.0, 0.0]),
            atom("C12", "C3", 0.00, [1.5, 0.0, 0.0]),
            atom("C13", "C3", 0.18, [3.0, 0.0, 0.0]),
            atom("H11", "HC", -0.08, [4.5, 0.0, 0.0]),
        ],
        &[bond("C11", "C12"), bond("C12", "C13"), bond("C13", "H11")],
    );

    let mut config = seeded_config("C1", "C11");
    config.redistribute_charges_over_unmatched = false;
    let suptops = superimpose_topologies(&mut ligands, &config).unwrap();

    assert_eq!(suptops.len(), 1);
    let suptop = &suptops[0];
    assert_matched_names(suptop, &ligands, &[("C1", "C11"), ("C2", "C12")]);

    let removed = suptop.removed_charge_mismatch();
    assert_eq!(removed.len(), 2);
    // sorted by difference, descending; both differences are 0.12 here
    for &(_, difference) in removed {
        assert!((difference - 0.12).abs() < 1e-9);
    }
    assert!(suptop.matched_or_removed(&ligands, "C3", "C13"));
    assert!(suptop.matched_or_removed(&ligands, "H1", "H11"));
}

/// Per-pair differences inside the tolerance can still sum to a net charge
/// imbalance; the worst pairs are peeled off until the net fits.
#[test]
fn net_charge_filter_peels_off_worst_pairs() {
    let mut ligands = build_pair(
        &[
            atom("C1", "C3", 0.08, [0.0, 0.0, 0.0]),
            atom("C2", "C3", 0.08, [1.5, 0.0, 0.0]),
            atom("C3", "C3", 0.08, [3.0, 0.0, 0.0]),
            atom("N1", "N3", -0.24, [4.5, 0.0, 0.0]),
        ],
        &[bond("C1", "C2"), bond("C2", "C3"), bond("C3", "N1")],
        &[
            atom("C11", "C3", 0.00, [0.0, 0.0, 0.0]),
            atom("C12", "C3", 0.00, [1.5, 0.0, 0.0]),
            atom("C13", "C3", 0.00, [3.0, 0.0, 0.0]),
            atom("N11", "N3", 0.00, [4.5, 0.0, 0.0]),
        ],
        &[bond("C11", "C12"), bond("C12", "C13"), bond("C13", "N11")],
    );

    let mut config = seeded_config("C1", "C11");
    config.redistribute_charges_over_unmatched = false;
    let suptops = superimpose_topologies(&mut ligands, &config).unwrap();

    assert_eq!(suptops.len(), 1);
    let suptop = &suptops[0];

    // the N pair fails the per-pair tolerance (0.24), then two of the three
    // C pairs (0.08 each) must go to bring the net below 0.1
    assert_eq!(suptop.removed_charge_mismatch().len(), 1);
    assert_eq!(suptop.removed_net_charge().len(), 2);
    assert_eq!(suptop.len(), 1);
    assert!(suptop.net_charge(&ligands).abs() <= 0.1 + 1e-9);
}

/// A ring with a mutated member cannot be mapped partially when partial
/// rings are forbidden.
#[test]
fn partial_ring_is_removed_when_forbidden() {
    let mut ligands = build_pair(
        &[
            atom("C1", "CA", 0.0, [0.0, 0.0, 0.0]),
            atom("C2", "CA", 0.0, [1.0, 0.5, 0.0]),
            atom("C3", "CA", 0.0, [2.0, 0.0, 0.0]),
            atom("C4", "CA", 0.0, [1.6, -1.0, 0.0]),
            atom("N1", "NB", 0.0, [0.4, -1.0, 0.0]),
            atom("C6", "C3", 0.0, [-1.2, 0.6, 0.0]),
        ],
        &[
            bond("C1", "C2"),
            bond("C2", "C3"),
            bond("C3", "C4"),
            bond("C4", "N1"),
            bond("N1", "C1"),
            bond("C1", "C6"),
        ],
        &[
            atom("C11", "CA", 0.0, [0.0, 0.0, 0.0]),
            atom("C12", "CA", 0.0, [1.0, 0.5, 0.0]),
            atom("C13", "CA", 0.0, [2.0, 0.0, 0.0]),
            atom("C14", "CA", 0.0, [1.6, -1.0, 0.0]),
            atom("O11", "OS", 0.0, [0.4, -1.0, 0.0]),
            atom("C16", "C3", 0.0, [-1.2, 0.6, 0.0]),
        ],
        &[
            bond("C11", "C12"),
            bond("C12", "C13"),
            bond("C13", "C14"),
            bond("C14", "O11"),
            bond("O11", "C11"),
            bond("C11", "C16"),
        ],
    );

    let mut config = default_config();
    config.partial_rings_allowed = false;
    let suptops = superimpose_topologies(&mut ligands, &config).unwrap();

    assert_eq!(suptops.len(), 1);
    let suptop = &suptops[0];
    // the four matched ring carbons are dismantled, the tail survives
    assert_matched_names(suptop, &ligands, &[("C6", "C16")]);
    assert_eq!(suptop.removed_unmatched_rings().len(), 4);
}

/// After charge refinement splits the mapping, only its largest connected
/// component survives when disjoint components are forbidden.
#[test]
fn disjoint_component_is_pruned_after_charge_split() {
    let left_atoms = [
        atom("C1", "C3", 0.0, [0.0, 0.0, 0.0]),
        atom("C2", "C3", 0.0, [1.5, 0.0, 0.0]),
        atom("C3", "C3", 0.2, [3.0, 0.0, 0.0]),
        atom("C4", "C3", 0.0, [4.5, 0.0, 0.0]),
        atom("C5", "C3", -0.2, [6.0, 0.0, 0.0]),
    ];
    let right_atoms = [
        atom("C11", "C3", 0.0, [0.0, 0.0, 0.0]),
        atom("C12", "C3", 0.0, [1.5, 0.0, 0.0]),
        atom("C13", "C3", 0.0, [3.0, 0.0, 0.0]),
        atom("C14", "C3", 0.0, [4.5, 0.0, 0.0]),
        atom("C15", "C3", 0.0, [6.0, 0.0, 0.0]),
    ];
    let left_bonds = [
        bond("C1", "C2"),
        bond("C2", "C3"),
        bond("C3", "C4"),
        bond("C4", "C5"),
    ];
    let right_bonds = [
        bond("C11", "C12"),
        bond("C12", "C13"),
        bond("C13", "C14"),
        bond("C14", "C15"),
    ];
    let mut ligands = build_pair(&left_atoms, &left_bonds, &right_atoms, &right_bonds);

    let mut config = seeded_config("C1", "C11");
    config.disjoint_components = false;
    let suptops = superimpose_topologies(&mut ligands, &config).unwrap();

    assert_eq!(suptops.len(), 1);
    let suptop = &suptops[0];
    // charge refinement removes C3 and C5; the stranded C4 pair is pruned
    assert_matched_names(suptop, &ligands, &[("C1", "C11"), ("C2", "C12")]);
    assert_eq!(suptop.removed_disjoint(), &[(3, 3)]);
}

/// Matched charges are averaged and the drift lands on the unmatched atoms,
/// preserving the integer totals of both sides.
#[test]
fn redistribution_preserves_totals_through_the_pipeline() {
    let mut ligands = build_pair(
        &[
            atom("C1", "C3", 0.30, [0.0, 0.0, 0.0]),
            atom("N1", "N3", -0.30, [1.5, 0.0, 0.0]),
            atom("O1", "O", 0.00, [3.0, 0.0, 0.0]),
        ],
        &[bond("C1", "N1"), bond("N1", "O1")],
        &[
            atom("C11", "C3", 0.24, [0.0, 0.0, 0.0]),
            atom("N11", "N3", -0.24, [1.5, 0.0, 0.0]),
            atom("H11", "HN", 0.00, [1.5, 1.0, 0.0]),
        ],
        &[bond("C11", "N11"), bond("N11", "H11")],
    );

    let suptops =
        superimpose_topologies(&mut ligands, &seeded_config("C1", "C11")).unwrap();

    assert_eq!(suptops.len(), 1);
    assert_matched_names(&suptops[0], &ligands, &[("C1", "C11"), ("N1", "N11")]);

    // averaged: C pairs to 0.27, N pairs to -0.27
    assert!((ligands.left.atoms[0].charge - 0.27).abs() < 1e-9);
    assert!((ligands.right.atoms[0].charge - 0.27).abs() < 1e-9);
    assert!((ligands.left.atoms[1].charge + 0.27).abs() < 1e-9);
    // totals stay integral
    assert!(ligands.left.total_charge().abs() < 1e-9);
    assert!(ligands.right.total_charge().abs() < 1e-9);
    // input charges remain recorded
    assert_eq!(ligands.left.atoms[0].original_charge, 0.30);
}

/// The dual-topology bond list covers matched edges, bonds into the matched
/// region, and the generated IDs collapse each pair into one atom.
#[test]
fn dual_topology_bonds_use_generated_ids() {
    let mut ligands = build_pair(
        &[
            atom("C1", "C3", 0.0, [0.0, 0.0, 0.0]),
            atom("N1", "N3", 0.0, [1.5, 0.0, 0.0]),
            atom("O1", "O", 0.0, [3.0, 0.0, 0.0]),
        ],
        &[bond("C1", "N1"), bond("N1", "O1")],
        &[
            atom("C11", "C3", 0.0, [0.0, 0.0, 0.0]),
            atom("N11", "N3", 0.0, [1.5, 0.0, 0.0]),
            atom("H11", "HN", 0.0, [1.5, 1.0, 0.0]),
        ],
        &[bond("C11", "N11"), bond("N11", "H11")],
    );

    let suptops =
        superimpose_topologies(&mut ligands, &seeded_config("C1", "C11")).unwrap();
    let suptop = &suptops[0];

    // pairs C (1) and N (2); disappearing O1 (3); appearing H11 (4)
    assert_eq!(suptop.generated_left_id(0), 1);
    assert_eq!(suptop.generated_right_id(0), 1);
    assert_eq!(suptop.generated_left_id(2), 3);
    assert_eq!(suptop.generated_right_id(2), 4);

    let bonds = suptop.dual_topology_bonds(&ligands);
    let expected: std::collections::BTreeSet<(usize, usize, BondOrder)> = [
        (1, 2, BondOrder::Single),
        (2, 3, BondOrder::Single),
        (2, 4, BondOrder::Single),
    ]
    .into_iter()
    .collect();
    assert_eq!(bonds, expected);
}

/// The final alignment writes the mobile ligand into the reference frame.
#[test]
fn output_coordinates_are_aligned_to_the_left_ligand() {
    let mut ligands = build_pair(
        &[
            atom("C1", "C3", 0.0, [0.0, 0.0, 0.0]),
            atom("N1", "N3", 0.0, [1.5, 0.0, 0.0]),
        ],
        &[bond("C1", "N1")],
        &[
            atom("C11", "C3", 0.0, [10.0, 3.0, -2.0]),
            atom("N11", "N3", 0.0, [11.5, 3.0, -2.0]),
        ],
        &[bond("C11", "N11")],
    );

    let suptops =
        superimpose_topologies(&mut ligands, &seeded_config("C1", "C11")).unwrap();
    let suptop = &suptops[0];

    assert!(suptop.rmsd(&ligands) < 1e-9);
    assert!((ligands.right.atoms[0].position - ligands.left.atoms[0].position).norm() < 1e-9);
}
