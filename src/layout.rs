//! Layered layout: same-rank grouping, two solver passes, band clustering.

mod bands;
mod builtin;
mod engine;
mod grouping;
mod js;
mod options;
mod slot;
mod solver;

pub use bands::assign_bands;
pub use builtin::BuiltinLayeredSolver;
pub use engine::LayoutEngine;
pub use grouping::SameRankGroups;
pub use js::JsSolver;
pub use options::{Direction, LayoutOptions, keys};
pub use slot::{LayoutSlot, Ticket};
pub use solver::{LayeredSolver, SolverEdge, SolverError, SolverGraph, SolverNode};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("Invalid layout option {key}: {value:?}")]
    InvalidOption { key: String, value: String },
    #[error("Invalid layout options JSON: {0}")]
    Options(#[from] serde_json::Error),
}
