//! Coordinate alignment of the two ligands over the matched region.
//!
//! The mobile side is translated to the centroid of its matched atoms and
//! rotated onto the reference side with the optimal (Kabsch) rotation from an
//! SVD of the covariance matrix. RMSD over the matched pairs ranks mirrors
//! and alternative mappings.

use super::mapping::SuperimposedTopology;
use crate::core::LigandPair;
use nalgebra::{Matrix3, Point3, Vector3};

impl SuperimposedTopology {
    /// Root-mean-square deviation over the matched pairs, in the current
    /// coordinate frames.
    ///
    /// # Panics
    ///
    /// Panics when no pair is matched.
    pub fn rmsd(&self, ligands: &LigandPair) -> f64 {
        assert!(!self.is_empty(), "rmsd requires at least one matched pair");
        let sum_sq: f64 = self
            .matched_pairs()
            .iter()
            .map(|&(l, r)| {
                (ligands.left.atoms[l].position - ligands.right.atoms[r].position).norm_squared()
            })
            .sum();
        (sum_sq / self.len() as f64).sqrt()
    }

    /// RMSD over the matched pairs after optimal superposition.
    ///
    /// Coordinates are not modified; the result is what
    /// [`SuperimposedTopology::align_and_overwrite`] would leave behind.
    ///
    /// # Panics
    ///
    /// Panics when no pair is matched.
    pub fn aligned_rmsd(&self, ligands: &LigandPair) -> f64 {
        self.superposition(ligands).2
    }

    /// Aligns the mobile ligand onto the reference over the matched region
    /// and writes the transformed coordinates back into both topologies.
    ///
    /// Which side is mobile is governed by `left_coords_are_ref`. Both sides
    /// end up expressed in the reference frame: the reference keeps its
    /// coordinates, the mobile side is rotated about its matched centroid and
    /// translated onto the reference centroid. Returns the matched-region
    /// RMSD after the transform.
    ///
    /// # Panics
    ///
    /// Panics when no pair is matched.
    pub fn align_and_overwrite(&self, ligands: &mut LigandPair) -> f64 {
        let (rotation, mobile_centroid, rmsd) = self.superposition(ligands);
        let reference_centroid = self.reference_centroid(ligands);

        let mobile = if self.left_coords_are_ref {
            &mut ligands.right
        } else {
            &mut ligands.left
        };
        for atom in &mut mobile.atoms {
            let centered = atom.position.coords - mobile_centroid;
            atom.position = Point3::from(reference_centroid + rotation * centered);
        }
        rmsd
    }

    /// Optimal rotation, mobile matched centroid, and post-rotation RMSD.
    fn superposition(&self, ligands: &LigandPair) -> (Matrix3<f64>, Vector3<f64>, f64) {
        assert!(!self.is_empty(), "alignment requires at least one matched pair");

        let (reference, mobile): (Vec<Point3<f64>>, Vec<Point3<f64>>) = self
            .matched_pairs()
            .iter()
            .map(|&(l, r)| {
                let left = ligands.left.atoms[l].position;
                let right = ligands.right.atoms[r].position;
                if self.left_coords_are_ref {
                    (left, right)
                } else {
                    (right, left)
                }
            })
            .unzip();

        let centroid = |points: &[Point3<f64>]| {
            points
                .iter()
                .fold(Vector3::zeros(), |acc, p| acc + p.coords)
                / points.len() as f64
        };
        let reference_centroid = centroid(&reference);
        let mobile_centroid = centroid(&mobile);

        let mut covariance = Matrix3::zeros();
        for (q, p) in reference.iter().zip(&mobile) {
            let q_centered = q.coords - reference_centroid;
            let p_centered = p.coords - mobile_centroid;
            covariance += q_centered * p_centered.transpose();
        }

        let rotation = kabsch_rotation(&covariance);

        let sum_sq: f64 = reference
            .iter()
            .zip(&mobile)
            .map(|(q, p)| {
                let q_centered = q.coords - reference_centroid;
                let p_rotated = rotation * (p.coords - mobile_centroid);
                (q_centered - p_rotated).norm_squared()
            })
            .sum();
        let rmsd = (sum_sq / reference.len() as f64).sqrt();

        (rotation, mobile_centroid, rmsd)
    }

    fn reference_centroid(&self, ligands: &LigandPair) -> Vector3<f64> {
        let sum: Vector3<f64> = self
            .matched_pairs()
            .iter()
            .map(|&(l, r)| {
                if self.left_coords_are_ref {
                    ligands.left.atoms[l].position.coords
                } else {
                    ligands.right.atoms[r].position.coords
                }
            })
            .sum();
        sum / self.len() as f64
    }
}

/// The rotation minimizing Σ‖R·p − q‖² for the centered covariance Σ q·pᵀ.
///
/// The determinant of the candidate rotation is corrected so a reflection is
/// never returned.
fn kabsch_rotation(covariance: &Matrix3<f64>) -> Matrix3<f64> {
    let svd = covariance.svd(true, true);
    let u = svd.u.expect("3x3 SVD always yields U");
    let v_t = svd.v_t.expect("3x3 SVD always yields V^T");

    let sign = (u * v_t).determinant().signum();
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, sign));
    u * correction * v_t
}
