//! Human-readable graph dumps.
pub mod dump;

pub use dump::format_graph;
