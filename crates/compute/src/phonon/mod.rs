//! Phonon contributions to the thermal elastic constants.
//!
//! The longitudinal and off-diagonal components have closed-form zero-point
//! and thermal terms ([`nonshear`]); shear components are reduced to those by
//! an eigen-rotation of a fictitious strain ([`shear`]).

pub mod nonshear;
pub mod shear;

use ndarray::{Array1, Array2, Array3, ArrayView3};

/// Shared per-calculation phonon context: the refined grids, the interpolated
/// modes and the thermodynamic fields the kernels consume.
#[derive(Debug, Clone)]
pub struct PhononContext {
    /// Refined volume grid, bohr^3, `[N_TV]`
    pub v_array: Array1<f64>,
    /// Temperature grid, K, `[N_T]`
    pub t_array: Array1<f64>,
    /// Interpolated mode frequencies, cm^-1, `[N_TV, N_q, N_p]`
    pub freq: Array3<f64>,
    /// Mode-Grueneisen parameters `gamma`, `[N_TV, N_q, N_p]`
    pub gamma: Array3<f64>,
    /// `V dgamma/dV`, `[N_TV, N_q, N_p]`
    pub vdg_dv: Array3<f64>,
    /// q-point weights, `[N_q]`
    pub q_weights: Array1<f64>,
    /// Atoms per cell
    pub na: usize,
    /// `P(T, V)` in Ry/bohr^3, `[N_T, N_TV]`
    pub pressures: Array2<f64>,
    /// `C_V(T, V)` in Ry/K, `[N_T, N_TV]`
    pub heat_capacity: Array2<f64>,
    /// Static pressure on the refined grid, Ry/bohr^3, `[N_TV]`
    pub static_p: Array1<f64>,
}

impl PhononContext {
    pub fn dims(&self) -> (usize, usize) {
        (self.t_array.len(), self.v_array.len())
    }
}

/// Weighted average of a per-mode quantity over branches and q-points,
/// with the Gamma-point acoustic entries zeroed first:
///
/// ```text
/// avg(X)[V] = sum_q w_q mean_p(X) / sum_q w_q
/// ```
pub fn average_over_modes(amount: ArrayView3<f64>, q_weights: &Array1<f64>) -> Array1<f64> {
    let (ntv, nq, np) = amount.dim();
    let wsum: f64 = q_weights.sum();
    let mut out = Array1::zeros(ntv);
    for m in 0..ntv {
        let mut acc = 0.0;
        for j in 0..nq {
            let mut sum_p = 0.0;
            for k in 0..np {
                if j == 0 && k < 3 {
                    continue; // Gamma-point acoustic modes carry no weight
                }
                sum_p += amount[(m, j, k)];
            }
            acc += q_weights[j] * sum_p / np as f64;
        }
        out[m] = acc / wsum;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_average_zeroes_gamma_acoustic() {
        // one volume, two q-points, four branches
        let mut x = Array3::zeros((1, 2, 4));
        x.slice_mut(ndarray::s![0, 0, ..]).assign(&array![9.0, 9.0, 9.0, 4.0]);
        x.slice_mut(ndarray::s![0, 1, ..]).assign(&array![2.0, 2.0, 2.0, 2.0]);
        let w = array![1.0, 3.0];
        let avg = average_over_modes(x.view(), &w);
        // q=0 contributes only its fourth branch: mean_p = 4/4 = 1
        let expect = (1.0 * 1.0 + 3.0 * 2.0) / 4.0;
        assert!((avg[0] - expect).abs() < 1e-12);
    }
}
