//! Coordinate reference system registry and geometry reprojection.
//!
//! Definitions are loaded once from a CSV file of proj4 strings keyed by
//! authority code. Transformations go through `proj4rs`.

pub mod error;
pub mod registry;
pub mod transform;

pub use error::{ProjectionError, ProjectionResult};
pub use registry::{CrsDefinition, CrsRegistry};
pub use transform::{transform_geometry, Reprojector, SridGeometry};
