// ABOUTME: Module root for session exporters.
// ABOUTME: Re-exports the GPX builder and serializer for convenient access.

pub mod gpx;

pub use self::gpx::{DEFAULT_CREATOR, ExportError, build_gpx, export_gpx};
