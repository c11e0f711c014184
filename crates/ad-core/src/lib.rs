//! ABC posterior diagnostics core library.
//!
//! - Prior-predictive sampling from a hierarchical prior document
//! - Aggregation of per-run posterior sample collections
//! - Percentile bands for prior/posterior comparison
//! - Derived census columns for forecast comparison
//!
//! The binary entry point is in `main.rs`.

pub mod aggregate;
pub mod bands;
pub mod census;
pub mod error;
pub mod exit_codes;
pub mod forecast;
pub mod logging;
pub mod output;
pub mod params;
pub mod sampler;
pub mod samples;
pub mod table;
pub mod trace;

pub use aggregate::{
    AggregatedDistribution, AggregatedValue, AggregationError, MissingParameterPolicy,
    PosteriorAggregator,
};
pub use bands::{
    compare_parameters, BandError, ParameterBands, ParameterComparison, PercentileBandComputer,
    ScalarBand, VectorBand,
};
pub use census::{DerivedCountProjector, DerivedCountRow, ProjectionError};
pub use error::{Error, ErrorCategory, Result};
pub use exit_codes::ExitCode;
pub use output::OutputFormat;
pub use params::ParamKind;
pub use sampler::{DrawMatrix, PriorDraws, PriorPredictiveSampler, PriorPredictiveSet, SamplerError};
pub use samples::{LoadError, NestedValue, ParamValue, ParameterSample, SampleCollection};
pub use table::{Table, TableError};
