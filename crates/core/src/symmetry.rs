//! Crystal-symmetry constrained completion of elastic-constant tables.
//!
//! The known columns and the per-system equality constraints are stacked into
//! one linear system over the 21 independent `c_ij` symbols,
//!
//! ```text
//! [ I_known ]       [ c_known(V) ]
//! [ C_symm  ] x  =  [     0      ]
//! ```
//!
//! and solved by least squares independently across volumes. The constraint
//! equations are pre-baked per crystal system; the symbolic derivation that
//! produced them is not part of this crate.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::ElastData;
use crate::voigt::ModulusIndex;

/// Crystal systems with pre-baked symmetry constraints.
///
/// `trigonal6`/`trigonal7` and `tetragonal6`/`tetragonal7` distinguish the
/// Laue classes with six and seven independent components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrystalSystem {
    Triclinic,
    Monoclinic,
    Orthorhombic,
    Trigonal6,
    Trigonal7,
    Tetragonal6,
    Tetragonal7,
    Hexagonal,
    Cubic,
}

/// One term of a constraint equation: `coeff * c_(i,j)`.
type Term = (f64, (u8, u8));

/// Equations of the form `sum_k coeff_k * c_k = 0`.
fn constraint_equations(system: CrystalSystem) -> Vec<Vec<Term>> {
    use CrystalSystem::*;

    let eq = |a: (u8, u8), b: (u8, u8)| vec![(1.0, a), (-1.0, b)];
    let neg = |a: (u8, u8), b: (u8, u8)| vec![(1.0, a), (1.0, b)];
    let zero = |a: (u8, u8)| vec![(1.0, a)];
    // a = (c11 - c12) / 2
    let half = |a: (u8, u8)| vec![(1.0, a), (-0.5, (1, 1)), (0.5, (1, 2))];

    let zeros = |pairs: &[(u8, u8)]| pairs.iter().map(|&p| zero(p)).collect::<Vec<_>>();

    // the off-block components vanishing for every orthotropic-or-higher class
    const ORTHO_ZEROS: [(u8, u8); 12] = [
        (1, 4), (1, 5), (1, 6), (2, 4), (2, 5), (2, 6),
        (3, 4), (3, 5), (3, 6), (4, 5), (4, 6), (5, 6),
    ];

    match system {
        Triclinic => vec![],
        Monoclinic => {
            // unique axis b: c14, c16, c24, c26, c34, c36, c45, c56 vanish
            zeros(&[(1, 4), (1, 6), (2, 4), (2, 6), (3, 4), (3, 6), (4, 5), (5, 6)])
        }
        Orthorhombic => zeros(&ORTHO_ZEROS),
        Cubic => {
            let mut eqs = vec![
                eq((2, 2), (1, 1)),
                eq((3, 3), (1, 1)),
                eq((1, 3), (1, 2)),
                eq((2, 3), (1, 2)),
                eq((5, 5), (4, 4)),
                eq((6, 6), (4, 4)),
            ];
            eqs.extend(zeros(&ORTHO_ZEROS));
            eqs
        }
        Hexagonal => {
            let mut eqs = vec![
                eq((2, 2), (1, 1)),
                eq((2, 3), (1, 3)),
                eq((5, 5), (4, 4)),
                half((6, 6)),
            ];
            eqs.extend(zeros(&ORTHO_ZEROS));
            eqs
        }
        Tetragonal6 => {
            let mut eqs = vec![
                eq((2, 2), (1, 1)),
                eq((2, 3), (1, 3)),
                eq((5, 5), (4, 4)),
            ];
            eqs.extend(zeros(&ORTHO_ZEROS));
            eqs
        }
        Tetragonal7 => {
            let mut eqs = vec![
                eq((2, 2), (1, 1)),
                eq((2, 3), (1, 3)),
                eq((5, 5), (4, 4)),
                neg((2, 6), (1, 6)),
            ];
            eqs.extend(zeros(&[
                (1, 4), (1, 5), (2, 4), (2, 5), (3, 4), (3, 5), (3, 6), (4, 5), (4, 6), (5, 6),
            ]));
            eqs
        }
        Trigonal6 => {
            let mut eqs = vec![
                eq((2, 2), (1, 1)),
                eq((2, 3), (1, 3)),
                neg((2, 4), (1, 4)),
                eq((5, 6), (1, 4)),
                eq((5, 5), (4, 4)),
                half((6, 6)),
            ];
            eqs.extend(zeros(&[
                (1, 5), (1, 6), (2, 5), (2, 6), (3, 4), (3, 5), (3, 6), (4, 5), (4, 6),
            ]));
            eqs
        }
        Trigonal7 => {
            let mut eqs = vec![
                eq((2, 2), (1, 1)),
                eq((2, 3), (1, 3)),
                neg((2, 4), (1, 4)),
                eq((5, 6), (1, 4)),
                neg((2, 5), (1, 5)),
                neg((4, 6), (1, 5)),
                eq((5, 5), (4, 4)),
                half((6, 6)),
            ];
            eqs.extend(zeros(&[(1, 6), (2, 6), (3, 4), (3, 5), (3, 6), (4, 5)]));
            eqs
        }
    }
}

/// The 21 symbols in canonical order: c11, c12, .., c16, c22, .., c66.
fn all_symbols() -> Vec<ModulusIndex> {
    let mut symbols = Vec::with_capacity(21);
    for i in 1..=6u8 {
        for j in i..=6u8 {
            symbols.push(ModulusIndex::from_voigt(i, j).unwrap());
        }
    }
    symbols
}

/// Policies of the completion step.
#[derive(Debug, Clone)]
pub struct FillOptions {
    /// Accept a constraint system that does not determine all 21 components
    pub ignore_rank: bool,
    /// Accept inputs that disagree with the symmetry constraints
    pub ignore_residuals: bool,
    /// Per-volume sum-of-squares tolerance on the fit residual (GPa^2)
    pub residual_atol: f64,
    /// Components within this magnitude of zero across all volumes are dropped
    pub drop_atol: f64,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            ignore_rank: false,
            ignore_residuals: false,
            residual_atol: 0.1,
            drop_atol: 1e-8,
        }
    }
}

/// Complete a column table of elastic constants under the symmetry
/// constraints of `system`.
///
/// Keys are canonical subscripts, each column holds the values across the
/// volume points (any consistent unit; GPa in this crate).
pub fn fill_cij(
    table: &BTreeMap<ModulusIndex, Vec<f64>>,
    system: CrystalSystem,
    opts: &FillOptions,
) -> Result<BTreeMap<ModulusIndex, Vec<f64>>> {
    let equations = constraint_equations(system);
    if equations.is_empty() {
        return Ok(table.clone());
    }

    let symbols = all_symbols();
    let nsym = symbols.len();
    let nvol = table
        .values()
        .next()
        .map(|col| col.len())
        .ok_or_else(|| Error::config("elastic-constant table has no columns"))?;

    let nrows = table.len() + equations.len();
    let mut a = DMatrix::<f64>::zeros(nrows, nsym);
    let mut b = DMatrix::<f64>::zeros(nrows, nvol);

    for (row, (key, col)) in table.iter().enumerate() {
        let idx = symbols.iter().position(|s| s == key).unwrap();
        a[(row, idx)] = 1.0;
        for (v, &value) in col.iter().enumerate() {
            b[(row, v)] = value;
        }
    }
    for (n, equation) in equations.iter().enumerate() {
        let row = table.len() + n;
        for &(coeff, pair) in equation {
            let key = ModulusIndex::from_voigt(pair.0, pair.1)?;
            let idx = symbols.iter().position(|s| *s == key).unwrap();
            a[(row, idx)] += coeff;
        }
    }

    let svd = a.clone().svd(true, true);
    let smax = svd.singular_values.max();
    let eps = f64::EPSILON * nrows.max(nsym) as f64 * smax;
    let rank = svd.rank(eps);
    let x = svd
        .solve(&b, eps)
        .map_err(|e| Error::numeric(format!("symmetry fill least squares: {e}")))?;

    if rank < nsym && !opts.ignore_rank {
        return Err(Error::RankDeficient { rank, expected: nsym });
    }

    let residual = &a * &x - &b;
    let mut worst = (0usize, 0.0f64);
    for v in 0..nvol {
        let r2: f64 = residual.column(v).iter().map(|r| r * r).sum();
        if r2 > worst.1 {
            worst = (v, r2);
        }
    }
    debug!(residual = worst.1, volume = worst.0, "symmetry fill residual");
    if worst.1 > opts.residual_atol && !opts.ignore_residuals {
        return Err(Error::ResidualTooLarge(format!(
            "{:.3e} at volume point {} exceeds {:.3e}",
            worst.1, worst.0, opts.residual_atol
        )));
    }

    let mut filled = BTreeMap::new();
    for (idx, key) in symbols.iter().enumerate() {
        let col: Vec<f64> = (0..nvol).map(|v| x[(idx, v)]).collect();
        if col.iter().all(|&value| value.abs() <= opts.drop_atol) {
            continue;
        }
        filled.insert(*key, col);
    }
    Ok(filled)
}

/// Apply [`fill_cij`] in place on parsed elastic-constant data.
pub fn apply_symmetry(elast: &mut ElastData, system: CrystalSystem, opts: &FillOptions) -> Result<()> {
    let keys = elast.modulus_keys();
    let mut table = BTreeMap::new();
    for key in keys {
        let col = elast
            .column(key)
            .ok_or_else(|| Error::numeric(format!("missing column {key}")))?;
        table.insert(key, col);
    }
    let filled = fill_cij(&table, system, opts)?;
    for (v, volume) in elast.volumes.iter_mut().enumerate() {
        volume.moduli = filled.iter().map(|(key, col)| (*key, col[v])).collect();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sym: &str) -> ModulusIndex {
        ModulusIndex::parse(sym).unwrap()
    }

    /// A cubic table with all nine nonzero columns at two volume points.
    fn cubic_table() -> BTreeMap<ModulusIndex, Vec<f64>> {
        let mut table = BTreeMap::new();
        let c11 = vec![300.0, 320.0];
        let c12 = vec![100.0, 110.0];
        let c44 = vec![80.0, 85.0];
        for sym in ["c11", "c22", "c33"] {
            table.insert(key(sym), c11.clone());
        }
        for sym in ["c12", "c13", "c23"] {
            table.insert(key(sym), c12.clone());
        }
        for sym in ["c44", "c55", "c66"] {
            table.insert(key(sym), c44.clone());
        }
        table
    }

    #[test]
    fn test_fill_recovers_dropped_column() {
        let table = cubic_table();
        for dropped in ["c22", "c12", "c55"] {
            let mut broken = table.clone();
            broken.remove(&key(dropped));
            let filled = fill_cij(&broken, CrystalSystem::Cubic, &FillOptions::default()).unwrap();
            let got = &filled[&key(dropped)];
            let want = &table[&key(dropped)];
            for (g, w) in got.iter().zip(want) {
                assert!((g - w).abs() < 1e-6, "{dropped}: {g} != {w}");
            }
        }
    }

    #[test]
    fn test_fill_idempotent() {
        let opts = FillOptions::default();
        let once = fill_cij(&cubic_table(), CrystalSystem::Cubic, &opts).unwrap();
        let twice = fill_cij(&once, CrystalSystem::Cubic, &opts).unwrap();
        assert_eq!(once.keys().collect::<Vec<_>>(), twice.keys().collect::<Vec<_>>());
        for (k, col) in &once {
            for (a, b) in col.iter().zip(&twice[k]) {
                assert!((a - b).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_fill_drops_zero_columns() {
        let filled =
            fill_cij(&cubic_table(), CrystalSystem::Cubic, &FillOptions::default()).unwrap();
        assert_eq!(filled.len(), 9);
        assert!(!filled.contains_key(&key("c14")));
        assert!(!filled.contains_key(&key("c45")));
    }

    #[test]
    fn test_fill_rejects_wrong_system() {
        // monoclinic-looking data violates the cubic equalities
        let mut table = cubic_table();
        table.insert(key("c22"), vec![400.0, 420.0]);
        let err = fill_cij(&table, CrystalSystem::Cubic, &FillOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ResidualTooLarge(_)));

        let opts = FillOptions { ignore_residuals: true, ..FillOptions::default() };
        assert!(fill_cij(&table, CrystalSystem::Cubic, &opts).is_ok());
    }

    #[test]
    fn test_fill_rejects_missing_rank() {
        // dropping an independent component leaves the system underdetermined
        let mut table = cubic_table();
        for sym in ["c44", "c55", "c66"] {
            table.remove(&key(sym));
        }
        let err = fill_cij(&table, CrystalSystem::Cubic, &FillOptions::default()).unwrap_err();
        assert!(matches!(err, Error::RankDeficient { .. }));

        let opts = FillOptions { ignore_rank: true, ..FillOptions::default() };
        assert!(fill_cij(&table, CrystalSystem::Cubic, &opts).is_ok());
    }

    #[test]
    fn test_trigonal7_relations() {
        // seven independent components; check the dependent ones come out
        let mut table = BTreeMap::new();
        table.insert(key("c11"), vec![470.0]);
        table.insert(key("c12"), vec![170.0]);
        table.insert(key("c13"), vec![120.0]);
        table.insert(key("c14"), vec![-25.0]);
        table.insert(key("c15"), vec![-10.0]);
        table.insert(key("c33"), vec![380.0]);
        table.insert(key("c44"), vec![110.0]);
        let filled =
            fill_cij(&table, CrystalSystem::Trigonal7, &FillOptions::default()).unwrap();
        assert!((filled[&key("c22")][0] - 470.0).abs() < 1e-6);
        assert!((filled[&key("c24")][0] - 25.0).abs() < 1e-6);
        assert!((filled[&key("c56")][0] - -25.0).abs() < 1e-6);
        assert!((filled[&key("c46")][0] - 10.0).abs() < 1e-6);
        assert!((filled[&key("c66")][0] - (470.0 - 170.0) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_triclinic_passthrough() {
        let table = cubic_table();
        let filled =
            fill_cij(&table, CrystalSystem::Triclinic, &FillOptions::default()).unwrap();
        assert_eq!(filled, table);
    }
}
