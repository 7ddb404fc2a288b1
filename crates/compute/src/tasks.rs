//! Dependency-resolved scheduling of the phonon-kernel calculations.
//!
//! Every requested component becomes a task; shear tasks depend on the
//! longitudinal/off-diagonal kernels needed in both the original and the
//! rotated frames. Tasks are deduplicated by canonicalized parameters (the
//! strain arrays are quantized on a 1e-8 grid before hashing), assembled
//! into a DAG, executed in topological order, and memoized into isothermal
//! and adiabatic result maps.

use std::collections::{BTreeMap, HashMap};

use ndarray::{Array1, Array2};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use thermoelast_core::error::{Error, Result};
use thermoelast_core::voigt::ModulusIndex;

use crate::phonon::nonshear::{NonshearKernel, NonshearKind};
use crate::phonon::shear::ShearSolver;
use crate::phonon::PhononContext;

const QUANTUM: f64 = 1e8;

fn quantize(values: impl Iterator<Item = f64>) -> Vec<i64> {
    values.map(|x| (x * QUANTUM).round() as i64).collect()
}

/// Canonical identity of one phonon-kernel invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskParams {
    Nonshear {
        kind: NonshearKind,
        a: Vec<i64>,
        b: Vec<i64>,
    },
    Shear {
        strain: Vec<i64>,
        key: ModulusIndex,
    },
}

/// Axial strain fractions for a non-shear component: the strain columns of
/// the two axes involved, each normalized by the per-volume strain sum.
fn strain_fractions(strain: &Array2<f64>, key: ModulusIndex) -> (Array1<f64>, Array1<f64>) {
    let (i, _, k, _) = key.standard();
    let sums: Array1<f64> = strain.rows().into_iter().map(|row| row.sum()).collect();
    let a = Array1::from_iter(
        (0..strain.nrows()).map(|m| strain[(m, i as usize - 1)] / sums[m]),
    );
    let b = Array1::from_iter(
        (0..strain.nrows()).map(|m| strain[(m, k as usize - 1)] / sums[m]),
    );
    (a, b)
}

impl TaskParams {
    pub fn create(strain: &Array2<f64>, key: ModulusIndex) -> Self {
        if key.is_shear() {
            Self::Shear { strain: quantize(strain.iter().copied()), key }
        } else {
            let kind = if key.is_longitudinal() {
                NonshearKind::Longitudinal
            } else {
                NonshearKind::OffDiagonal
            };
            let (a, b) = strain_fractions(strain, key);
            Self::Nonshear {
                kind,
                a: quantize(a.iter().copied()),
                b: quantize(b.iter().copied()),
            }
        }
    }
}

enum Payload {
    Nonshear {
        kind: NonshearKind,
        e: (Array1<f64>, Array1<f64>),
    },
    Shear(ShearSolver),
}

pub(crate) struct TaskGraph {
    tasks: Vec<(TaskParams, Payload)>,
    graph: DiGraph<usize, ()>,
}

impl TaskGraph {
    /// Build the deduplicated task DAG for `keys` under the initial strain.
    pub(crate) fn build(strain: &Array2<f64>, keys: &[ModulusIndex]) -> Result<Self> {
        let mut tasks: Vec<(TaskParams, Payload)> = Vec::new();
        let mut index: HashMap<TaskParams, usize> = HashMap::new();
        let mut nodes: Vec<NodeIndex> = Vec::new();
        let mut graph: DiGraph<usize, ()> = DiGraph::new();

        let mut queue: Vec<(Array2<f64>, ModulusIndex, Option<usize>)> =
            keys.iter().map(|&key| (strain.clone(), key, None)).collect();

        while let Some((strain, key, parent)) = queue.pop() {
            let params = TaskParams::create(&strain, key);
            let current = match index.get(&params) {
                Some(&existing) => existing,
                None => {
                    let payload = if key.is_shear() {
                        let solver = ShearSolver::new(key, strain.clone())?;
                        for dep in solver.modulus_keys() {
                            queue.push((solver.strain().clone(), dep, Some(tasks.len())));
                        }
                        let rotated = solver.strain_rotated();
                        for dep in solver.modulus_keys_rotated() {
                            queue.push((rotated.clone(), dep, Some(tasks.len())));
                        }
                        Payload::Shear(solver)
                    } else {
                        let kind = if key.is_longitudinal() {
                            NonshearKind::Longitudinal
                        } else {
                            NonshearKind::OffDiagonal
                        };
                        Payload::Nonshear { kind, e: strain_fractions(&strain, key) }
                    };
                    let id = tasks.len();
                    tasks.push((params.clone(), payload));
                    index.insert(params, id);
                    nodes.push(graph.add_node(id));
                    debug!(task = id, %key, "new phonon task");
                    id
                }
            };
            if let Some(parent) = parent {
                graph.update_edge(nodes[current], nodes[parent], ());
            }
        }

        Ok(Self { tasks, graph })
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn nonshear_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|(_, p)| matches!(p, Payload::Nonshear { .. }))
            .count()
    }

    /// Execute all tasks in topological order; dependencies are read from
    /// the isothermal result map, as the shear balance is isothermal.
    fn execute(
        &self,
        ctx: &PhononContext,
    ) -> Result<HashMap<TaskParams, (Array2<f64>, Array2<f64>)>> {
        let order = toposort(&self.graph, None)
            .map_err(|_| Error::numeric("phonon task graph contains a cycle"))?;

        let mut results: HashMap<TaskParams, (Array2<f64>, Array2<f64>)> = HashMap::new();
        for node in order {
            let id = self.graph[node];
            let (params, payload) = &self.tasks[id];
            let value = match payload {
                Payload::Nonshear { kind, e } => {
                    let kernel = NonshearKernel::new(ctx, *kind, e.clone());
                    kernel.compute()?
                }
                Payload::Shear(solver) => {
                    let lookup = |strain: &Array2<f64>,
                                  keys: Vec<ModulusIndex>|
                     -> Result<BTreeMap<ModulusIndex, Array2<f64>>> {
                        keys.into_iter()
                            .map(|key| {
                                let params = TaskParams::create(strain, key);
                                let (iso, _) = results.get(&params).ok_or_else(|| {
                                    Error::numeric(format!(
                                        "dependency {key} not resolved before shear task"
                                    ))
                                })?;
                                Ok((key, iso.clone()))
                            })
                            .collect()
                    };
                    let moduli = lookup(solver.strain(), solver.modulus_keys())?;
                    let rotated =
                        lookup(&solver.strain_rotated(), solver.modulus_keys_rotated())?;
                    let value = solver.solve(&moduli, &rotated, ctx.dims())?;
                    // adiabatic and isothermal shear values coincide here
                    (value.clone(), value)
                }
            };
            results.insert(params.clone(), value);
        }
        Ok(results)
    }
}

/// Phonon contributions for the requested components, `[N_T, N_TV]` each.
#[derive(Debug, Clone)]
pub struct PhononContribution {
    pub isothermal: BTreeMap<ModulusIndex, Array2<f64>>,
    pub adiabatic: BTreeMap<ModulusIndex, Array2<f64>>,
}

/// Resolve the task DAG for `keys` under `strain` and execute it.
pub fn calculate_phonon_contribution(
    ctx: &PhononContext,
    strain: &Array2<f64>,
    keys: &[ModulusIndex],
) -> Result<PhononContribution> {
    let graph = TaskGraph::build(strain, keys)?;
    debug!(tasks = graph.len(), "phonon task graph resolved");
    let results = graph.execute(ctx)?;

    let mut isothermal = BTreeMap::new();
    let mut adiabatic = BTreeMap::new();
    for &key in keys {
        let params = TaskParams::create(strain, key);
        let (iso, adia) = results
            .get(&params)
            .ok_or_else(|| Error::numeric(format!("no result for requested component {key}")))?;
        isothermal.insert(key, iso.clone());
        adiabatic.insert(key, adia.clone());
    }
    Ok(PhononContribution { isothermal, adiabatic })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonon::nonshear::tests::context;

    fn keys(symbols: &[&str]) -> Vec<ModulusIndex> {
        symbols.iter().map(|s| ModulusIndex::parse(s).unwrap()).collect()
    }

    fn isotropic_strain(ntv: usize) -> Array2<f64> {
        Array2::from_elem((ntv, 3), 1.0 / 3.0)
    }

    #[test]
    fn test_longitudinal_tasks_deduplicate() {
        // equal strain fractions collapse c11/c22/c33 into one kernel
        let strain = isotropic_strain(4);
        let graph = TaskGraph::build(&strain, &keys(&["c11", "c22", "c33"])).unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_shear_reuses_rotated_frame_kernels() {
        let strain = isotropic_strain(4);
        // one shear key: the rotated frame needs one longitudinal and one
        // off-diagonal kernel beyond the shear task itself (the two rotated
        // longitudinal keys share identical fractions)
        let graph = TaskGraph::build(&strain, &keys(&["c44"])).unwrap();
        assert_eq!(graph.nonshear_count(), 2);
        assert_eq!(graph.len(), 3);

        // more shear keys sharing the rotation add no non-shear kernels
        let graph = TaskGraph::build(&strain, &keys(&["c44", "c55", "c66"])).unwrap();
        assert_eq!(graph.nonshear_count(), 2);
        assert_eq!(graph.len(), 5);

        // block components reuse those same kernels
        let graph =
            TaskGraph::build(&strain, &keys(&["c11", "c12", "c44", "c55", "c66"])).unwrap();
        assert_eq!(graph.nonshear_count(), 2);
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn test_execution_order_resolves_dependencies() {
        let ctx = context();
        let strain = isotropic_strain(4);
        let result =
            calculate_phonon_contribution(&ctx, &strain, &keys(&["c11", "c12", "c44"])).unwrap();
        let c44 = ModulusIndex::parse("c44").unwrap();
        let c11 = ModulusIndex::parse("c11").unwrap();
        let c12 = ModulusIndex::parse("c12").unwrap();
        // the balance reduces to (c11 - c12) / 2 under an isotropic strain
        let iso = &result.isothermal;
        for ((i, m), &v) in iso[&c44].indexed_iter() {
            let expect = (iso[&c11][(i, m)] - iso[&c12][(i, m)]) / 2.0;
            assert!((v - expect).abs() < 1e-12);
        }
        // shear adiabatic equals isothermal by construction
        for (a, b) in result.adiabatic[&c44].iter().zip(result.isothermal[&c44].iter()) {
            assert!((a - b).abs() < 1e-18);
        }
    }

    #[test]
    fn test_mixed_row_shear_rejected() {
        let ctx = context();
        let strain = isotropic_strain(4);
        let err =
            calculate_phonon_contribution(&ctx, &strain, &keys(&["c45"])).unwrap_err();
        assert!(matches!(err, Error::ShearNotImplemented(_)));
    }
}
