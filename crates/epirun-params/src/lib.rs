//! Sweep specifications and their resolution into concrete parameter sets.
//!
//! A specification is a nested mapping whose list-valued leaves vary across
//! runs. [`ParameterGenerator`] samples it, merges fixed parameters, evaluates
//! `@reference` expressions, expands lockdown blocks and numbers each run.

pub mod expr;
pub mod fixed;
pub mod generator;
pub mod lockdown;
pub mod paths;
pub mod resolve;
pub mod sampling;
pub mod selection;
pub mod table;
pub mod value;

pub use epirun_core::errors::SweepError;
pub use expr::{is_expression, Expression};
pub use fixed::{apply_fixed_parameters, OnConflict};
pub use generator::{GeneratorOptions, ParameterGenerator, RUN_NUMBER_KEY};
pub use lockdown::expand_lockdown;
pub use paths::{enumerate_paths, flatten, get_at_path, set_at_path, unflatten, ParamMap, ParamPath};
pub use resolve::{resolve_expressions, PATH_SEPARATOR};
pub use selection::RunSelection;
pub use table::{read_parameter_table, write_parameter_table, TableFormat};
pub use value::{ListReading, ParamValue, SamplingKind, SweepSpec};
