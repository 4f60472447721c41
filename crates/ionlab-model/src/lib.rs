//! Data model for ionlab.
//!
//! `Ion` is a real (physical) degree of freedom, `SurfaceVertex` a fictitious
//! one carrying the induced charge on the discretized interface, and
//! `RunControl` the externally-supplied configuration the dynamics consumes.

pub mod config;
pub mod particle;
pub mod vertex;

pub use config::{ConfigError, RunControl};
pub use particle::Ion;
pub use vertex::SurfaceVertex;
