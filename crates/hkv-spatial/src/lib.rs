//! Spatial (multi-dimensional to scalar) key projection.
//!
//! Converts the declared coordinate columns of a spatial index into one
//! ordered z-value segment, and knows where in the index's declared columns
//! the collapsed range lives.

pub mod handler;
pub mod space;

pub use handler::SpatialColumnHandler;
pub use space::{Space, MAX_DIMENSIONS, MAX_Z_BITS};
