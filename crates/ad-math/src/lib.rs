//! ABC diagnostics math utilities.

pub mod math;

pub use math::stable::*;
pub use math::dirichlet;
pub use math::normal;
pub use math::poisson::*;
pub use math::summary::*;
