//! Longitudinal and off-diagonal phonon contributions.
//!
//! The phonon part splits into a zero-point term and a thermal term,
//!
//! ```text
//! c^ph_ij(T, V) = c^zpm_ij(V) + c^th_ij(T, V)
//! ```
//!
//! built from the strain-Grueneisen parameters, i.e. the mode-Grueneisen
//! parameters scaled by prefactors of the axial strain fractions. The
//! isothermal-to-adiabatic correction comes from the entropy-strain
//! derivative,
//!
//! ```text
//! c^S_ij - c^T_ij = T / (V C_V) (dS/de_ii) (dS/de_jj)
//! ```
//!
//! Both values are returned on the full `(T, V)` grid. The 4-D `(T, V, q, p)`
//! intermediate is folded one temperature row at a time.

use ndarray::{Array1, Array2, Array3, Zip};

use thermoelast_core::error::Result;
use thermoelast_core::units::{HC_OVER_KB_CM_K, HC_RY_CM, KB_RY_PER_K};

use super::{average_over_modes, PhononContext};

/// Which closed-form kernel applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonshearKind {
    Longitudinal,
    OffDiagonal,
}

/// One longitudinal or off-diagonal kernel instance, bound to a pair of
/// axial strain fractions `(e_i/Delta, e_j/Delta)` over the volume grid.
pub struct NonshearKernel<'a> {
    ctx: &'a PhononContext,
    kind: NonshearKind,
    e: (Array1<f64>, Array1<f64>),
}

impl<'a> NonshearKernel<'a> {
    pub fn new(ctx: &'a PhononContext, kind: NonshearKind, e: (Array1<f64>, Array1<f64>)) -> Self {
        Self { ctx, kind, e }
    }

    /// `(value_isothermal, value_adiabatic)`, each `[N_T, N_TV]` in
    /// Ry/bohr^3.
    pub fn compute(&self) -> Result<(Array2<f64>, Array2<f64>)> {
        let ctx = self.ctx;
        let (nt, ntv) = ctx.dims();
        let na = ctx.na as f64;

        // prefactors over volume: 1/5 for longitudinal, 1/15 off-diagonal
        let denom = match self.kind {
            NonshearKind::Longitudinal => 5.0,
            NonshearKind::OffDiagonal => 15.0,
        };
        let prod = &self.e.0 * &self.e.1;
        let p0: Array1<f64> = prod.mapv(|x| 1.0 / (denom * x));
        let p1a: Array1<f64> = self.e.0.mapv(|x| 1.0 / (3.0 * x));
        let p1b: Array1<f64> = self.e.1.mapv(|x| 1.0 / (3.0 * x));

        // strain-Grueneisen arrays, broadcast over (q, p)
        let shape = ctx.freq.dim();
        let scale = |pref: &Array1<f64>, base: &Array3<f64>| -> Array3<f64> {
            let mut out = base.clone();
            for m in 0..shape.0 {
                out.index_axis_mut(ndarray::Axis(0), m).mapv_inplace(|x| x * pref[m]);
            }
            out
        };
        let g0 = scale(&p0, &ctx.vdg_dv);
        let g1a = scale(&p1a, &ctx.gamma);
        let g1b = scale(&p1b, &ctx.gamma);
        let g2 = {
            let gamma2 = &ctx.gamma * &ctx.gamma;
            scale(&p0, &gamma2)
        };

        // zero-point contribution over volume
        let mut zpm_combo: Array3<f64> = (&g2 - &g0) * &ctx.freq;
        if self.kind == NonshearKind::Longitudinal {
            zpm_combo += &(&g1a * &ctx.freq);
        }
        let zpm: Array1<f64> = average_over_modes(zpm_combo.view(), &ctx.q_weights)
            * (HC_RY_CM / 2.0 * 3.0 * na)
            / &ctx.v_array;

        let mut iso = Array2::zeros((nt, ntv));
        let mut delta = Array2::zeros((nt, ntv));

        for (i, &t) in ctx.t_array.iter().enumerate() {
            if t == 0.0 {
                // thermal and adiabatic corrections vanish on the T = 0 row
                iso.row_mut(i).assign(&zpm);
                continue;
            }

            // Q_qm = hc w / (kB T), with the occupation factors clamped to
            // zero on the silent (zero-frequency) entries
            let mut q1 = Array3::zeros(shape);
            let mut q2 = Array3::zeros(shape);
            Zip::from(&mut q1).and(&mut q2).and(&ctx.freq).for_each(|q1, q2, &w| {
                if w > 0.0 {
                    let q = HC_OVER_KB_CM_K * w / t;
                    let expm1 = q.exp_m1();
                    *q1 = q / expm1;
                    if q < 500.0 {
                        *q2 = q * q * (q.exp()) / (expm1 * expm1);
                    }
                }
            });

            let mut th_combo: Array3<f64> = &g2 - &g0;
            if self.kind == NonshearKind::Longitudinal {
                th_combo += &g1a;
            }
            let th_combo = -(&q2 * &g2) + &q1 * &th_combo;
            let th = average_over_modes(th_combo.view(), &ctx.q_weights)
                * (KB_RY_PER_K * t * 3.0 * na)
                / &ctx.v_array;
            iso.row_mut(i).assign(&(&zpm + &th));

            // entropy-strain correction
            let avg_a = average_over_modes((&q2 * &g1a).view(), &ctx.q_weights);
            let avg_b = average_over_modes((&q2 * &g1b).view(), &ctx.q_weights);
            let factor = (3.0 * KB_RY_PER_K * na) * (3.0 * KB_RY_PER_K * na);
            for m in 0..ntv {
                let cv = ctx.heat_capacity[(i, m)];
                delta[(i, m)] = if cv > 0.0 {
                    t / (ctx.v_array[m] * cv) * avg_a[m] * avg_b[m] * factor
                } else {
                    0.0
                };
            }
        }

        // the off-diagonal modulus picks up the pressure excess over static
        if self.kind == NonshearKind::OffDiagonal {
            for i in 0..nt {
                for m in 0..ntv {
                    iso[(i, m)] += ctx.pressures[(i, m)] - ctx.static_p[m];
                }
            }
        }

        let adia = &iso + &delta;
        Ok((iso, adia))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::{Array1, Array3};

    /// A context with a single active mode per q-point and flat gamma.
    pub(crate) fn context() -> PhononContext {
        let ntv = 4;
        let nq = 2;
        let np = 4;
        let v_array: Array1<f64> = Array1::linspace(130.0, 100.0, ntv);
        let t_array = Array1::from_vec(vec![0.0, 200.0, 400.0]);
        let mut freq = Array3::zeros((ntv, nq, np));
        let mut gamma = Array3::zeros((ntv, nq, np));
        for m in 0..ntv {
            let w = 500.0 * (120.0 / v_array[m]).powf(1.0 / 3.0);
            for j in 0..nq {
                for k in 0..np {
                    if j == 0 && k < 3 {
                        continue;
                    }
                    freq[(m, j, k)] = w;
                    gamma[(m, j, k)] = 1.0 / 3.0;
                }
            }
        }
        let vdg_dv = Array3::zeros((ntv, nq, np));
        let nt = t_array.len();
        let mut heat_capacity = ndarray::Array2::zeros((nt, ntv));
        for i in 1..nt {
            heat_capacity.row_mut(i).fill(1e-4);
        }
        PhononContext {
            v_array,
            t_array,
            freq,
            gamma,
            vdg_dv,
            q_weights: Array1::from_vec(vec![1.0, 3.0]),
            na: 2,
            pressures: ndarray::Array2::zeros((nt, ntv)),
            heat_capacity,
            static_p: Array1::zeros(ntv),
        }
    }

    fn fractions(ntv: usize) -> (Array1<f64>, Array1<f64>) {
        (Array1::from_elem(ntv, 1.0 / 3.0), Array1::from_elem(ntv, 1.0 / 3.0))
    }

    #[test]
    fn test_adiabatic_not_below_isothermal_for_longitudinal() {
        let ctx = context();
        let kernel = NonshearKernel::new(&ctx, NonshearKind::Longitudinal, fractions(4));
        let (iso, adia) = kernel.compute().unwrap();
        for ((i, m), &vi) in iso.indexed_iter() {
            assert!(adia[(i, m)] >= vi - 1e-15);
        }
        // equality on the T = 0 row
        for m in 0..4 {
            assert!((adia[(0, m)] - iso[(0, m)]).abs() < 1e-18);
        }
    }

    #[test]
    fn test_zero_point_row_is_temperature_independent_part() {
        let ctx = context();
        let kernel = NonshearKernel::new(&ctx, NonshearKind::Longitudinal, fractions(4));
        let (iso, _) = kernel.compute().unwrap();
        // T = 0 keeps only the zero-point term, which must be positive here
        // (gamma^2 and gamma terms dominate with vdg_dv = 0)
        for m in 0..4 {
            assert!(iso[(0, m)] > 0.0);
        }
    }

    #[test]
    fn test_off_diagonal_includes_pressure_excess() {
        let mut ctx = context();
        ctx.pressures.fill(2e-3);
        ctx.static_p.fill(5e-4);
        let kernel_a = NonshearKernel::new(&ctx, NonshearKind::OffDiagonal, fractions(4));
        let (iso_a, _) = kernel_a.compute().unwrap();
        ctx.pressures.fill(5e-4);
        let kernel_b = NonshearKernel::new(&ctx, NonshearKind::OffDiagonal, fractions(4));
        let (iso_b, _) = kernel_b.compute().unwrap();
        for ((i, m), &vb) in iso_b.indexed_iter() {
            assert!((iso_a[(i, m)] - vb - 1.5e-3).abs() < 1e-12);
        }
    }
}
