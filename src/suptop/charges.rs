//! Charge-driven refinement: per-pair tolerance, net-charge balancing, and
//! redistribution of the averaging drift over the unmatched atoms.

use super::mapping::{Pair, SuperimposedTopology};
use crate::core::error::LigandValidationError;
use crate::core::LigandPair;

/// How far a per-side charge total may sit from its nearest integer.
const CHARGE_SUM_TOLERANCE: f64 = 0.01;

/// Checks that both ligands carry the same integer total charge.
///
/// # Errors
///
/// Returns [`LigandValidationError`] when either total does not round to an
/// integer within 0.01 e, or the two totals disagree by more than 0.01 e.
pub fn validate_charges(ligands: &LigandPair) -> Result<i64, LigandValidationError> {
    let left_total = ligands.left.total_charge();
    if (left_total - left_total.round()).abs() > CHARGE_SUM_TOLERANCE {
        return Err(LigandValidationError::NonIntegerTotalCharge {
            side: "left",
            total: left_total,
        });
    }
    let right_total = ligands.right.total_charge();
    if (right_total - right_total.round()).abs() > CHARGE_SUM_TOLERANCE {
        return Err(LigandValidationError::NonIntegerTotalCharge {
            side: "right",
            total: right_total,
        });
    }
    if (left_total - right_total).abs() > CHARGE_SUM_TOLERANCE {
        return Err(LigandValidationError::TotalChargeMismatch {
            left: left_total,
            right: right_total,
        });
    }
    Ok(left_total.round() as i64)
}

impl SuperimposedTopology {
    /// Net charge difference across the matched pairs: Σ (qL − qR).
    pub fn net_charge(&self, ligands: &LigandPair) -> f64 {
        self.matched_pairs()
            .iter()
            .map(|&(l, r)| ligands.left.atoms[l].charge - ligands.right.atoms[r].charge)
            .sum()
    }

    /// The largest absolute charge difference found among the pairs.
    pub fn worst_charge_match(&self, ligands: &LigandPair) -> f64 {
        self.matched_pairs()
            .iter()
            .map(|&(l, r)| (ligands.left.atoms[l].charge - ligands.right.atoms[r].charge).abs())
            .fold(0.0, f64::max)
    }

    /// Removes every pair whose charges differ by more than `atol`.
    ///
    /// Pairs are visited in reverse order; each removal is recorded with its
    /// absolute difference and the log is sorted by difference, descending.
    pub fn refine_against_charges(&mut self, ligands: &LigandPair, atol: f64) -> Vec<(Pair, f64)> {
        let too_different: Vec<(Pair, f64)> = self
            .matched_pairs()
            .iter()
            .rev()
            .copied()
            .filter_map(|(l, r)| {
                let left = &ligands.left.atoms[l];
                let right = &ligands.right.atoms[r];
                if left.charge_eq(right, atol) {
                    None
                } else {
                    Some(((l, r), (right.charge - left.charge).abs()))
                }
            })
            .collect();

        for &(pair, difference) in &too_different {
            self.remove_pair(pair);
            self.removed_charge_mismatch.push((pair, difference));
        }
        self.removed_charge_mismatch
            .sort_by(|a, b| b.1.total_cmp(&a.1));
        too_different
    }

    /// Removes the single pair with the worst charge difference.
    ///
    /// Returns the removed absolute difference, or 0.0 when every pair has
    /// identical charges (in which case nothing is removed). The removal is
    /// recorded in the net-charge log.
    pub fn remove_worst_charge_match(&mut self, ligands: &LigandPair) -> f64 {
        let largest = self.worst_charge_match(ligands);
        if largest == 0.0 {
            return 0.0;
        }
        let worst = self
            .matched_pairs()
            .iter()
            .copied()
            .find(|&(l, r)| {
                (ligands.left.atoms[l].charge - ligands.right.atoms[r].charge).abs() == largest
            })
            .expect("a pair with the largest difference exists");
        self.remove_pair(worst);
        self.removed_net_charge.push((worst, largest));
        largest
    }

    /// Averages the charges of every matched pair and spreads the resulting
    /// drift uniformly over the unmatched atoms of each side.
    ///
    /// Both per-side integer totals are preserved. Should run after the last
    /// filter that can change the pairing.
    ///
    /// # Errors
    ///
    /// Returns [`LigandValidationError`] when the input (or resulting)
    /// totals are not the same integer.
    pub fn redistribute_charges(
        &self,
        ligands: &mut LigandPair,
    ) -> Result<(), LigandValidationError> {
        validate_charges(ligands)?;

        let mut left_drift_total = 0.0;
        let mut right_drift_total = 0.0;
        for &(l, r) in self.matched_pairs() {
            let left_charge = ligands.left.atoms[l].charge;
            let right_charge = ligands.right.atoms[r].charge;
            if left_charge != right_charge {
                let average = (left_charge + right_charge) / 2.0;
                left_drift_total += left_charge - average;
                right_drift_total += right_charge - average;
                ligands.left.atoms[l].charge = average;
                ligands.right.atoms[r].charge = average;
            }
        }
        log::info!(
            "total charge imbalance after averaging: L={:.3} R={:.3}",
            left_drift_total,
            right_drift_total
        );

        let left_unmatched = self.disappearing_atoms(ligands);
        let right_unmatched = self.appearing_atoms(ligands);
        if left_unmatched.is_empty() && left_drift_total != 0.0 {
            log::warn!("no unmatched left atoms to carry the charge drift");
        }
        if right_unmatched.is_empty() && right_drift_total != 0.0 {
            log::warn!("no unmatched right atoms to carry the charge drift");
        }

        if !left_unmatched.is_empty() {
            let per_atom = left_drift_total / left_unmatched.len() as f64;
            for index in left_unmatched {
                ligands.left.atoms[index].charge += per_atom;
            }
        }
        if !right_unmatched.is_empty() {
            let per_atom = right_drift_total / right_unmatched.len() as f64;
            for index in right_unmatched {
                ligands.right.atoms[index].charge += per_atom;
            }
        }

        validate_charges(ligands)?;
        Ok(())
    }
}
