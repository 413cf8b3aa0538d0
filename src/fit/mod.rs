//! Model fitting.
//!
//! Responsibilities:
//!
//! - place trend changepoints over the leading part of the history
//! - choose seasonal components from the history length and sampling interval
//! - solve the penalized least squares problem and derive interval widths

pub mod changepoints;
pub mod fitter;
pub mod seasonality;

pub use changepoints::*;
pub use fitter::*;
pub use seasonality::*;
