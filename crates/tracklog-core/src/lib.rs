// ABOUTME: Core library for tracklog, containing the recorded point types and GPX export.
// ABOUTME: This crate defines the shared data model used by the store and the binary.

pub mod export;
pub mod model;
pub mod session;

pub use export::{DEFAULT_CREATOR, ExportError, build_gpx, export_gpx};
pub use model::{FixError, LocationFix, Tagged, Trackpoint, Waypoint};
pub use session::SessionBuffer;
