//! Quadrupole distortion model and the point type it operates on.

pub mod model;
pub mod types;

pub use model::*;
pub use types::*;
