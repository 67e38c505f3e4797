//! Traffic Flow Library
//!
//! A discrete-time microscopic traffic simulation with exporters and post-hoc analysis.

pub mod analysis;
pub mod export;
pub mod simulation;
