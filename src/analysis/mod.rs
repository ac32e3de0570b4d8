//! Structural analyses over a `Graph`.
pub mod topology;
