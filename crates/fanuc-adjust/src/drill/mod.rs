//! Drill-file text handling: coordinate lines, output names and the
//! in-memory adjustment pass.

pub mod adjust;
pub mod line;
pub mod naming;

pub use adjust::*;
pub use line::*;
pub use naming::*;
