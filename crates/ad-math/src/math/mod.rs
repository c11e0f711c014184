//! Core math modules.

pub mod stable;
pub mod dirichlet;
pub mod normal;
pub mod poisson;
pub mod summary;
