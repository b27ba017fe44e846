//! Core library for the map workbench: an interactive spatial query and
//! analysis engine over in-memory geographic datasets.

pub mod aggregate;
pub mod analysis;
pub mod capability;
pub mod dataset;
pub mod draw;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod query;
pub mod styles;
pub mod units;

pub use engine::Workbench;
pub use error::WorkbenchError;
