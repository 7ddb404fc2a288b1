//! thermoelast Core Library
//!
//! This crate provides the value types, unit constants, input data model and
//! symmetry machinery shared by the thermoelast workspace:
//! - Voigt / standard subscript algebra for elastic tensor components
//! - Exact unit-conversion constants (Rydberg atomic units <-> GPa, A^3, ...)
//! - Configuration model (YAML or JSON, selected by extension)
//! - Parsers for the traditional phonon/energy and elastic-constant inputs
//! - Crystal-symmetry constrained completion of elastic-constant tables

pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod symmetry;
pub mod units;
pub mod voigt;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{ElastData, QhaInputData};
pub use symmetry::CrystalSystem;
pub use voigt::{CalcKind, ModulusIndex, StrainIndex};

/// Version of the thermoelast workspace
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
