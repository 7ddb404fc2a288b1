//! Shear phonon contribution by fictitious-strain energy balance.
//!
//! A self-shear component `c_K` (Voigt 44, 55 or 66) is obtained by imposing
//! a fictitious strain that excites only the off-diagonal positions of `K`,
//! rotating it into its principal axes where only longitudinal and
//! off-diagonal couplings contribute, and solving
//!
//! ```text
//! c_K = 2 (U_rot - U_orig) / (F_ij F_kl multiplicity(K))
//! ```
//!
//! for the one unknown. In this model the adiabatic and isothermal shear
//! values coincide; the rotation carries no entropy-strain correction.
//!
//! Components coupling two different Voigt rows are not implemented.

use std::collections::BTreeMap;

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use ndarray::{Array1, Array2};

use thermoelast_core::error::{Error, Result};
use thermoelast_core::voigt::ModulusIndex;

const NZ_ATOL: f64 = 1e-8;

/// Solver for one self-shear component under a given axial strain table
/// (`[N_TV, 3]`).
#[derive(Debug, Clone)]
pub struct ShearSolver {
    key: ModulusIndex,
    strain: Array2<f64>,
    fictitious: Matrix3<f64>,
    eigenvalues: Vector3<f64>,
    rotation: Matrix3<f64>,
}

impl ShearSolver {
    pub fn new(key: ModulusIndex, strain: Array2<f64>) -> Result<Self> {
        if !key.is_shear() {
            return Err(Error::numeric(format!("{key} is not a shear component")));
        }
        if key.e1() != key.e2() {
            return Err(Error::ShearNotImplemented(key.to_string()));
        }

        let mut fictitious = Matrix3::zeros();
        let (i, j) = key.e1().pair();
        fictitious[(i as usize - 1, j as usize - 1)] = 1.0;
        fictitious[(j as usize - 1, i as usize - 1)] = 1.0;

        let eigen = SymmetricEigen::new(fictitious);
        Ok(Self {
            key,
            strain,
            fictitious,
            eigenvalues: eigen.eigenvalues,
            rotation: eigen.eigenvectors,
        })
    }

    pub fn key(&self) -> ModulusIndex {
        self.key
    }

    /// The axial strain table in the original frame.
    pub fn strain(&self) -> &Array2<f64> {
        &self.strain
    }

    /// The axial strain table rotated into the principal axes of the
    /// fictitious strain: `diag(R^T diag(e) R)` per volume row.
    pub fn strain_rotated(&self) -> Array2<f64> {
        let ntv = self.strain.nrows();
        let mut out = Array2::zeros((ntv, 3));
        for m in 0..ntv {
            for k in 0..3 {
                let mut acc = 0.0;
                for a in 0..3 {
                    let r = self.rotation[(a, k)];
                    acc += r * r * self.strain[(m, a)];
                }
                out[(m, k)] = acc;
            }
        }
        out
    }

    fn fictitious_rotated(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&self.eigenvalues)
    }

    fn energy_pairs(
        f: &Matrix3<f64>,
        skip: Option<ModulusIndex>,
    ) -> Vec<(ModulusIndex, f64)> {
        let mut nz = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                if f[(r, c)].abs() > NZ_ATOL {
                    nz.push((r, c));
                }
            }
        }
        let mut pairs = Vec::new();
        for &(i, j) in &nz {
            for &(k, l) in &nz {
                let key = ModulusIndex::from_standard(
                    i as u8 + 1,
                    j as u8 + 1,
                    k as u8 + 1,
                    l as u8 + 1,
                )
                .expect("valid fictitious-strain subscripts");
                if skip == Some(key) {
                    continue;
                }
                pairs.push((key, f[(i, j)] * f[(k, l)]));
            }
        }
        pairs
    }

    /// Components needed from the original frame (everything coupled by the
    /// fictitious strain except the target itself), deduplicated.
    pub fn modulus_keys(&self) -> Vec<ModulusIndex> {
        let mut keys: Vec<ModulusIndex> = Self::energy_pairs(&self.fictitious, Some(self.key))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Components needed from the rotated frame, deduplicated.
    pub fn modulus_keys_rotated(&self) -> Vec<ModulusIndex> {
        let mut keys: Vec<ModulusIndex> = Self::energy_pairs(&self.fictitious_rotated(), None)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    fn strain_energy(
        f: &Matrix3<f64>,
        skip: Option<ModulusIndex>,
        moduli: &BTreeMap<ModulusIndex, Array2<f64>>,
        dims: (usize, usize),
    ) -> Result<Array2<f64>> {
        let mut energy = Array2::zeros(dims);
        for (key, weight) in Self::energy_pairs(f, skip) {
            let c = moduli
                .get(&key)
                .ok_or_else(|| Error::numeric(format!("missing dependency {key} for shear solve")))?;
            energy.scaled_add(weight / 2.0, c);
        }
        Ok(energy)
    }

    /// Solve the strain-energy balance for the target component, given the
    /// dependency results in both frames (`[N_T, N_TV]` each).
    pub fn solve(
        &self,
        moduli: &BTreeMap<ModulusIndex, Array2<f64>>,
        moduli_rotated: &BTreeMap<ModulusIndex, Array2<f64>>,
        dims: (usize, usize),
    ) -> Result<Array2<f64>> {
        let u_orig = Self::strain_energy(&self.fictitious, Some(self.key), moduli, dims)?;
        let u_rot =
            Self::strain_energy(&self.fictitious_rotated(), None, moduli_rotated, dims)?;

        let (i, j, k, l) = self.key.standard();
        let denom = self.fictitious[(i as usize - 1, j as usize - 1)]
            * self.fictitious[(k as usize - 1, l as usize - 1)]
            * self.key.multiplicity() as f64;
        Ok((u_rot - u_orig).mapv(|u| 2.0 * u / denom))
    }
}
