//! Marker manifest: CSV with a header row
//! `name,src,estimated_real_world_width`.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use csv::{ReaderBuilder, Trim};

use crate::registry::MarkerSpec;

pub fn load_marker_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<MarkerSpec>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    read_marker_manifest(file).with_context(|| format!("Invalid marker manifest {}", path.display()))
}

pub fn read_marker_manifest<R: Read>(reader: R) -> Result<Vec<MarkerSpec>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(reader);

    let mut specs = Vec::new();
    for (row, rec) in rdr.deserialize::<MarkerSpec>().enumerate() {
        let spec = rec.with_context(|| format!("row {}", row + 1))?;
        specs.push(spec);
    }
    ensure!(!specs.is_empty(), "manifest lists no markers");
    Ok(specs)
}
