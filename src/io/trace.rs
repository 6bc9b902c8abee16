//! Recorded tracking traces.
//!
//! CSV without header, `#` starts a comment:
//!
//! ```text
//! timestamp_ns, kind, src [, m0 .. m15]
//! ```
//!
//! `kind` is `added`, `removed` or `updated`. `updated` rows carry the 16
//! column-major matrix elements; `added` rows may carry them; `removed`
//! rows carry none.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use crate::geometry::TransformMatrix;
use crate::tracking::{EventKind, TrackingEvent};

/// Number of leading columns before the matrix.
const HEADER_COLUMNS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub timestamp_ns: u64,
    pub event: TrackingEvent,
}

pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TraceEntry>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    read_trace(file).with_context(|| format!("Invalid tracking trace {}", path.display()))
}

pub fn read_trace<R: Read>(reader: R) -> Result<Vec<TraceEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(reader);

    let mut entries: Vec<TraceEntry> = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        // Comment lines are skipped, so count input lines rather than records.
        let line = rec.position().map_or(0, |p| p.line());
        let entry = parse_record(&rec).with_context(|| format!("line {}", line))?;
        if let Some(prev) = entries.last() {
            ensure!(
                entry.timestamp_ns >= prev.timestamp_ns,
                "line {}: timestamp {} goes backwards",
                line,
                entry.timestamp_ns
            );
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_record(rec: &StringRecord) -> Result<TraceEntry> {
    ensure!(rec.len() >= HEADER_COLUMNS, "expected at least {} columns", HEADER_COLUMNS);
    let timestamp_ns: u64 = rec[0].parse().context("bad timestamp")?;
    let kind: EventKind = rec[1].parse()?;
    let src = rec[2].to_string();
    ensure!(!src.is_empty(), "empty image reference");

    let matrix = match rec.len() - HEADER_COLUMNS {
        0 => None,
        16 => {
            let mut m = [0.0; 16];
            for (i, v) in m.iter_mut().enumerate() {
                let field = &rec[HEADER_COLUMNS + i];
                *v = field
                    .parse()
                    .with_context(|| format!("bad matrix element m{} '{}'", i, field))?;
            }
            Some(TransformMatrix::from_column_major(m))
        }
        n => bail!("expected 0 or 16 matrix elements, got {}", n),
    };

    let event = match (kind, matrix) {
        (EventKind::Added, transform) => TrackingEvent::Added { src, transform },
        (EventKind::Removed, None) => TrackingEvent::Removed { src },
        (EventKind::Removed, Some(_)) => bail!("removed events carry no matrix"),
        (EventKind::Updated, Some(transform)) => TrackingEvent::Updated { src, transform },
        (EventKind::Updated, None) => bail!("updated events need a matrix"),
    };

    Ok(TraceEntry {
        timestamp_ns,
        event,
    })
}

/// Write entries in the format [`read_trace`] accepts.
pub fn write_trace<W: Write>(writer: W, entries: &[TraceEntry]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(writer);

    for entry in entries {
        let mut row = vec![
            entry.timestamp_ns.to_string(),
            entry.event.kind().to_string(),
            entry.event.src().to_string(),
        ];
        let matrix = match &entry.event {
            TrackingEvent::Added { transform, .. } => transform.as_ref(),
            TrackingEvent::Updated { transform, .. } => Some(transform),
            TrackingEvent::Removed { .. } => None,
        };
        if let Some(m) = matrix {
            row.extend(m.as_slice().iter().map(|v| v.to_string()));
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    const TRACE: &str = "\
# timestamp_ns,kind,src,m0..m15
1000,added,images/marker3.jpg
2000,updated,images/marker3.jpg,1,0,0,0,0,1,0,0,0,0,1,0,1,2,3,1
3000, removed , images/marker3.jpg
";

    #[test]
    fn test_read_trace() {
        let entries = read_trace(TRACE.as_bytes()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].event, TrackingEvent::added("images/marker3.jpg"));
        assert_eq!(entries[1].timestamp_ns, 2000);
        match &entries[1].event {
            TrackingEvent::Updated { transform, .. } => {
                assert_eq!(transform.position(), Vector3::new(1.0, 2.0, 3.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(entries[2].event, TrackingEvent::removed("images/marker3.jpg"));
    }

    #[test]
    fn test_rejects_malformed_records() {
        for bad in [
            "1000,updated,images/a.jpg\n",
            "1000,removed,images/a.jpg,1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1\n",
            "1000,added,images/a.jpg,1,2,3\n",
            "abc,added,images/a.jpg\n",
            "1000,spotted,images/a.jpg\n",
            "1000,added\n",
            "2000,added,images/a.jpg\n1000,removed,images/a.jpg\n",
        ] {
            assert!(read_trace(bad.as_bytes()).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_error_reports_input_line() {
        let text = "\
# recorded on device
# timestamp_ns,kind,src
0,added,images/a.jpg
1000,spotted,images/a.jpg
";
        let err = read_trace(text.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 4"), "{:#}", err);

        let text = "# header\n2000,added,images/a.jpg\n# gap\n1000,removed,images/a.jpg\n";
        let err = read_trace(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 4"), "{}", err);
    }

    #[test]
    fn test_write_then_read() {
        let entries = read_trace(TRACE.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_trace(&mut buf, &entries).unwrap();
        assert_eq!(read_trace(buf.as_slice()).unwrap(), entries);
    }
}
