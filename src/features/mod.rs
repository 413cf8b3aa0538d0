//! Regressor selection, imputation and encoding.
//!
//! The output of this stage is a `FeatureFrame` plus the `FrozenSchema` every
//! later stage (fit, future frame, prediction) must reproduce exactly.

pub mod encode;
pub mod frame;
pub mod impute;
pub mod prepare;

pub use encode::*;
pub use frame::*;
pub use impute::*;
pub use prepare::*;
