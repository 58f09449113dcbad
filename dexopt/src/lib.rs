#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
mod alias;
mod design;
mod error;
mod information;
mod linalg;
mod model;
mod optimal_design;
mod power;
mod sampler;

pub use alias::{AliasAnalysis, alias_list};
pub use design::{Design, d_criterion};
pub use error::{Error, Result};
pub use information::{DeltaMethod, InformationMatrix};
pub use linalg::{EPS_SQRT, independent_columns, lstsq};
pub use model::{Model, ModelEvaluator, ModelOrder, Term, factor_name, factor_names};
pub use optimal_design::{ExchangeCriteria, OptimalDesign, build_optimal};
pub use power::f_power;
pub use sampler::{
    HitAndRun, SamplerOptions, box_constraints, cox_grid, cox_points, hit_and_run,
    uniform_simplex_sample,
};
