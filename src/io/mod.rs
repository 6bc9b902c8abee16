//! File loaders: marker manifests and recorded tracking traces.

pub mod markers;
pub mod trace;

pub use markers::{load_marker_manifest, read_marker_manifest};
pub use trace::{TraceEntry, load_trace, read_trace, write_trace};
