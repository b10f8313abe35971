//! ParaView data collection (`.pvd`) files.
//!
//! A collection lists snapshot files together with their simulated time so
//! viewers can play them back as one time series.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One snapshot entry of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Simulated time of the snapshot.
    pub time: f64,
    /// Snapshot file, written relative to the collection file when possible.
    pub file: PathBuf,
}

/// Write a collection file listing `datasets` in order.
///
/// Entries whose path lies inside the collection's directory are written
/// relative to it, so the directory can be moved as a whole.
pub fn save<P: AsRef<Path>>(datasets: &[DataSet], path: P) -> Result<()> {
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, r#"<?xml version="1.0"?>"#)?;
    writeln!(
        w,
        r#"<VTKFile type="Collection" version="0.1" byte_order="LittleEndian">"#
    )?;
    writeln!(w, r#"  <Collection>"#)?;
    for ds in datasets {
        let file = ds.file.strip_prefix(base).unwrap_or(&ds.file);
        let name = file.to_string_lossy();
        writeln!(
            w,
            r#"    <DataSet timestep="{:?}" part="0" file="{}"/>"#,
            ds.time,
            quick_xml::escape::escape(&*name)
        )?;
    }
    writeln!(w, r#"  </Collection>"#)?;
    writeln!(w, r#"</VTKFile>"#)?;

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_lists_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        let datasets = vec![
            DataSet {
                time: 0.0,
                file: dir.path().join("moth-0.vtu"),
            },
            DataSet {
                time: 0.1,
                file: dir.path().join("moth-1.vtu"),
            },
        ];
        let path = dir.path().join("moth.pvd");
        save(&datasets, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#"<DataSet timestep="0.0" part="0" file="moth-0.vtu"/>"#));
        assert!(text.contains(r#"<DataSet timestep="0.1" part="0" file="moth-1.vtu"/>"#));
        assert_eq!(text.matches("<DataSet").count(), 2);
    }
}
