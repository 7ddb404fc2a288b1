//! Voigt-Reuss-Hill aggregate moduli and acoustic wave velocities.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1};

use thermoelast_core::error::{Error, Result};
use thermoelast_core::units::{AVOGADRO, RY_TO_KG_KM2_S2};
use thermoelast_core::voigt::ModulusIndex;

/// Aggregate fields on the `(T, V)` grid; moduli in Ry/bohr^3, velocities in
/// km/s.
#[derive(Debug, Clone)]
pub struct Aggregates {
    pub bulk_modulus_voigt: Array2<f64>,
    pub bulk_modulus_reuss: Array2<f64>,
    pub bulk_modulus_voigt_reuss_hill: Array2<f64>,
    pub shear_modulus_voigt: Array2<f64>,
    pub shear_modulus_reuss: Array2<f64>,
    pub shear_modulus_voigt_reuss_hill: Array2<f64>,
    pub primary_velocities: Array2<f64>,
    pub secondary_velocities: Array2<f64>,
    pub bulk_velocities: Array2<f64>,
}

fn get<'a>(
    fields: &'a BTreeMap<ModulusIndex, Array2<f64>>,
    sym: &str,
    what: &str,
) -> Result<&'a Array2<f64>> {
    let key = ModulusIndex::parse(sym)?;
    fields
        .get(&key)
        .ok_or_else(|| Error::numeric(format!("{what} averages require component {key}")))
}

/// Compute the VRH averages and sound velocities from the adiabatic moduli
/// and compliances.
///
/// `cellmass` is in g/mol; the refined volume grid is in bohr^3.
pub fn compute(
    moduli: &BTreeMap<ModulusIndex, Array2<f64>>,
    compliances: &BTreeMap<ModulusIndex, Array2<f64>>,
    v_array: ArrayView1<f64>,
    cellmass: f64,
) -> Result<Aggregates> {
    let [c11, c22, c33] = ["c11", "c22", "c33"].map(|s| get(moduli, s, "bulk"));
    let [c12, c23, c13] = ["c12", "c23", "c13"].map(|s| get(moduli, s, "bulk"));
    let [c44, c55, c66] = ["c44", "c55", "c66"].map(|s| get(moduli, s, "shear"));
    let [s11, s22, s33] = ["s11", "s22", "s33"].map(|s| get(compliances, s, "bulk"));
    let [s12, s23, s13] = ["s12", "s23", "s13"].map(|s| get(compliances, s, "bulk"));
    let [s44, s55, s66] = ["s44", "s55", "s66"].map(|s| get(compliances, s, "shear"));

    let c_diag = c11?.clone() + c22? + c33?;
    let c_off = c12?.clone() + c23? + c13?;
    let c_shear = c44?.clone() + c55? + c66?;
    let s_diag = s11?.clone() + s22? + s33?;
    let s_off = s12?.clone() + s23? + s13?;
    let s_shear = s44?.clone() + s55? + s66?;

    let bulk_modulus_voigt = (&c_diag + &(&c_off * 2.0)) / 9.0;
    let bulk_modulus_reuss = (&s_diag + &(&s_off * 2.0)).mapv(|s| 1.0 / s);
    let bulk_modulus_voigt_reuss_hill = (&bulk_modulus_voigt + &bulk_modulus_reuss) / 2.0;

    let shear_modulus_voigt = (&c_diag - &c_off + &(&c_shear * 3.0)) / 15.0;
    let shear_modulus_reuss =
        (&(&s_diag * 4.0) - &(&s_off * 4.0) + &(&s_shear * 3.0)).mapv(|s| 15.0 / s);
    let shear_modulus_voigt_reuss_hill = (&shear_modulus_voigt + &shear_modulus_reuss) / 2.0;

    // kg per cell
    let mass = cellmass * 1e-3 / AVOGADRO;
    let velocity = |modulus: &Array2<f64>| -> Array2<f64> {
        let mut out = modulus.clone();
        for ((_, m), value) in out.indexed_iter_mut() {
            *value = (*value * v_array[m] * RY_TO_KG_KM2_S2 / mass).sqrt();
        }
        out
    };

    let primary_velocities = velocity(
        &(&bulk_modulus_voigt_reuss_hill + &(&shear_modulus_voigt_reuss_hill * (4.0 / 3.0))),
    );
    let secondary_velocities = velocity(&shear_modulus_voigt_reuss_hill);
    let bulk_velocities = velocity(&bulk_modulus_voigt_reuss_hill);

    Ok(Aggregates {
        bulk_modulus_voigt,
        bulk_modulus_reuss,
        bulk_modulus_voigt_reuss_hill,
        shear_modulus_voigt,
        shear_modulus_reuss,
        shear_modulus_voigt_reuss_hill,
        primary_velocities,
        secondary_velocities,
        bulk_velocities,
    })
}
