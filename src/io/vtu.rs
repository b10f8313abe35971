//! VTK XML unstructured-grid (`.vtu`) snapshots.
//!
//! Snapshots are written with ASCII data arrays. Floating-point values use
//! Rust's shortest round-trip formatting (exponent form for very large or
//! small magnitudes), so reading a file back with [`load`] reproduces the
//! written `f64` values exactly.
//!
//! Layout of a written file:
//!
//! ```text
//! <VTKFile type="UnstructuredGrid" ...>
//!   <UnstructuredGrid>
//!     <FieldData>   TimeValue
//!     <Piece NumberOfPoints=N NumberOfCells=M>
//!       <PointData> scalar attribute, 3-component vector attribute
//!       <Points>    Float64 x 3
//!       <Cells>     connectivity, offsets, types (10 = tetrahedron)
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{SnapshotData, SnapshotWriter};
use crate::error::{MeshError, Result};
use crate::mesh::VTK_TETRA;

/// Writes `<directory>/<prefix>-<index>.vtu` snapshots.
#[derive(Debug, Clone)]
pub struct VtuWriter {
    directory: PathBuf,
    prefix: String,
}

impl VtuWriter {
    /// Create a writer for the given output directory and file prefix.
    ///
    /// The directory is not created; see [`ensure_directory`](Self::ensure_directory).
    pub fn new<P: Into<PathBuf>, S: Into<String>>(directory: P, prefix: S) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    /// Path of the `.pvd` collection indexing this writer's snapshots.
    pub fn collection_path(&self) -> PathBuf {
        self.directory.join(format!("{}.pvd", self.prefix))
    }

    /// Create the output directory and its parents if missing.
    pub fn ensure_directory(&self) -> Result<()> {
        fs::create_dir_all(&self.directory)?;
        Ok(())
    }
}

impl SnapshotWriter for VtuWriter {
    fn path_for(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}-{}.vtu", self.prefix, index))
    }

    fn write_snapshot(&self, index: usize, data: &SnapshotData<'_>) -> Result<PathBuf> {
        let path = self.path_for(index);
        save(data, &path)?;
        log::debug!("wrote snapshot {} to {}", index, path.display());
        Ok(path)
    }
}

/// Write a snapshot to a `.vtu` file.
///
/// I/O failures (missing directory, permissions) propagate as
/// [`MeshError::Io`]; nothing is cleaned up on a partial write.
pub fn save<P: AsRef<Path>>(data: &SnapshotData<'_>, path: P) -> Result<()> {
    data.validate()?;
    let file = File::create(path.as_ref())?;
    let mut w = BufWriter::new(file);
    write_to(&mut w, data)?;
    w.flush()?;
    Ok(())
}

/// Write a snapshot document to any writer.
pub fn write_to<W: Write>(w: &mut W, data: &SnapshotData<'_>) -> Result<()> {
    writeln!(w, r#"<?xml version="1.0"?>"#)?;
    writeln!(
        w,
        r#"<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian" header_type="UInt64">"#
    )?;
    writeln!(w, r#"  <UnstructuredGrid>"#)?;
    writeln!(w, r#"    <FieldData>"#)?;
    writeln!(
        w,
        r#"      <DataArray type="Float64" Name="TimeValue" NumberOfTuples="1" format="ascii">{:?}</DataArray>"#,
        data.time
    )?;
    writeln!(w, r#"    </FieldData>"#)?;
    writeln!(
        w,
        r#"    <Piece NumberOfPoints="{}" NumberOfCells="{}">"#,
        data.points.len(),
        data.tetrahedra.len()
    )?;

    writeln!(
        w,
        r#"      <PointData Scalars="{}" Vectors="{}">"#,
        escape(data.scalar_name),
        escape(data.vector_name)
    )?;
    writeln!(
        w,
        r#"        <DataArray type="Float64" Name="{}" format="ascii">"#,
        escape(data.scalar_name)
    )?;
    for s in data.scalars {
        writeln!(w, "          {:?}", s)?;
    }
    writeln!(w, r#"        </DataArray>"#)?;
    writeln!(
        w,
        r#"        <DataArray type="Float64" Name="{}" NumberOfComponents="3" format="ascii">"#,
        escape(data.vector_name)
    )?;
    for v in data.vectors {
        writeln!(w, "          {:?} {:?} {:?}", v.x, v.y, v.z)?;
    }
    writeln!(w, r#"        </DataArray>"#)?;
    writeln!(w, r#"      </PointData>"#)?;

    writeln!(w, r#"      <Points>"#)?;
    writeln!(
        w,
        r#"        <DataArray type="Float64" Name="Points" NumberOfComponents="3" format="ascii">"#
    )?;
    for p in data.points {
        writeln!(w, "          {:?} {:?} {:?}", p.x, p.y, p.z)?;
    }
    writeln!(w, r#"        </DataArray>"#)?;
    writeln!(w, r#"      </Points>"#)?;

    writeln!(w, r#"      <Cells>"#)?;
    writeln!(
        w,
        r#"        <DataArray type="Int64" Name="connectivity" format="ascii">"#
    )?;
    for [a, b, c, d] in data.tetrahedra {
        writeln!(w, "          {} {} {} {}", a, b, c, d)?;
    }
    writeln!(w, r#"        </DataArray>"#)?;
    writeln!(w, r#"        <DataArray type="Int64" Name="offsets" format="ascii">"#)?;
    for i in 1..=data.tetrahedra.len() {
        writeln!(w, "          {}", 4 * i)?;
    }
    writeln!(w, r#"        </DataArray>"#)?;
    writeln!(w, r#"        <DataArray type="UInt8" Name="types" format="ascii">"#)?;
    for _ in data.tetrahedra {
        writeln!(w, "          {}", VTK_TETRA)?;
    }
    writeln!(w, r#"        </DataArray>"#)?;
    writeln!(w, r#"      </Cells>"#)?;

    writeln!(w, r#"    </Piece>"#)?;
    writeln!(w, r#"  </UnstructuredGrid>"#)?;
    writeln!(w, r#"</VTKFile>"#)?;
    Ok(())
}

fn escape(name: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(name)
}

/// A named per-point data array read back from a `.vtu` file.
#[derive(Debug, Clone, PartialEq)]
pub struct PointArray {
    /// Array name.
    pub name: String,
    /// Components per point.
    pub components: usize,
    /// Flat values, `components` per point.
    pub values: Vec<f64>,
}

/// Contents of a `.vtu` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VtuGrid {
    /// Point coordinates.
    pub points: Vec<Point3<f64>>,
    /// Point data arrays in file order.
    pub point_data: Vec<PointArray>,
    /// Flat cell connectivity.
    pub connectivity: Vec<usize>,
    /// End offset of each cell in `connectivity`.
    pub offsets: Vec<usize>,
    /// VTK cell type of each cell.
    pub types: Vec<u8>,
    /// `TimeValue` field data, if present.
    pub time: Option<f64>,
}

impl VtuGrid {
    /// Number of points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of cells.
    pub fn num_cells(&self) -> usize {
        self.types.len()
    }

    /// Look up a single-component point array by name.
    pub fn scalars(&self, name: &str) -> Option<&[f64]> {
        self.point_data
            .iter()
            .find(|a| a.name == name && a.components == 1)
            .map(|a| a.values.as_slice())
    }

    /// Look up a 3-component point array by name.
    pub fn vectors(&self, name: &str) -> Option<Vec<Vector3<f64>>> {
        self.point_data
            .iter()
            .find(|a| a.name == name && a.components == 3)
            .map(|a| {
                a.values
                    .chunks_exact(3)
                    .map(|c| Vector3::new(c[0], c[1], c[2]))
                    .collect()
            })
    }

    /// Cells as tetrahedra; fails if any cell is not a linear tetrahedron.
    pub fn tetrahedra(&self) -> Result<Vec<[usize; 4]>> {
        let mut start = 0;
        let mut tets = Vec::with_capacity(self.types.len());
        for (cell, (&end, &ty)) in self.offsets.iter().zip(&self.types).enumerate() {
            if ty != VTK_TETRA || end < start || end - start != 4 || end > self.connectivity.len() {
                return Err(MeshError::InvalidParameter {
                    name: "cell",
                    value: cell.to_string(),
                    reason: "not a linear tetrahedron",
                });
            }
            let c = &self.connectivity[start..end];
            tets.push([c[0], c[1], c[2], c[3]]);
            start = end;
        }
        Ok(tets)
    }
}

/// Which section of the document the reader is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    FieldData,
    PointData,
    Points,
    Cells,
}

/// Load a `.vtu` file written with ASCII data arrays.
///
/// # Example
///
/// ```no_run
/// use tetsnap::io::vtu;
///
/// let grid = vtu::load("lab/moth-0.vtu").unwrap();
/// println!("{} points, {} cells", grid.num_points(), grid.num_cells());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<VtuGrid> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse(&content).map_err(|message| MeshError::LoadError {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse a `.vtu` document held in memory.
pub fn parse(content: &str) -> std::result::Result<VtuGrid, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut grid = VtuGrid::default();
    let mut section = Section::Other;
    // Active DataArray: (name, components, format)
    let mut array: Option<(String, usize, String)> = None;
    let mut text = String::new();
    let mut expected: Option<(usize, usize)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"Piece" => {
                    let points = parse_attr::<usize>(e, "NumberOfPoints")?.unwrap_or(0);
                    let cells = parse_attr::<usize>(e, "NumberOfCells")?.unwrap_or(0);
                    expected = Some((points, cells));
                }
                b"FieldData" => section = Section::FieldData,
                b"PointData" => section = Section::PointData,
                b"Points" => section = Section::Points,
                b"Cells" => section = Section::Cells,
                b"DataArray" => {
                    let name = attr(e, "Name")?.unwrap_or_default();
                    let components = parse_attr::<usize>(e, "NumberOfComponents")?.unwrap_or(1);
                    let format = attr(e, "format")?.unwrap_or_else(|| "ascii".to_string());
                    array = Some((name, components, format));
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if array.is_some() {
                    let s = t.unescape().map_err(|e| format!("XML text error: {e}"))?;
                    text.push_str(&s);
                    text.push(' ');
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"FieldData" | b"PointData" | b"Points" | b"Cells" => section = Section::Other,
                b"DataArray" => {
                    if let Some((name, components, format)) = array.take() {
                        if format != "ascii" {
                            return Err(format!(
                                "data array '{name}' uses unsupported format '{format}'"
                            ));
                        }
                        store_array(&mut grid, section, name, components, &text)?;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {e}")),
            _ => {}
        }
    }

    if let Some((points, cells)) = expected {
        if grid.points.len() != points {
            return Err(format!(
                "piece declares {} points, found {}",
                points,
                grid.points.len()
            ));
        }
        if grid.types.len() != cells || grid.offsets.len() != cells {
            return Err(format!(
                "piece declares {} cells, found {} types and {} offsets",
                cells,
                grid.types.len(),
                grid.offsets.len()
            ));
        }
    } else {
        return Err("document has no Piece element".to_string());
    }

    for a in &grid.point_data {
        if a.values.len() != a.components * grid.points.len() {
            return Err(format!(
                "point array '{}' has {} values for {} points",
                a.name,
                a.values.len(),
                grid.points.len()
            ));
        }
    }

    Ok(grid)
}

fn store_array(
    grid: &mut VtuGrid,
    section: Section,
    name: String,
    components: usize,
    text: &str,
) -> std::result::Result<(), String> {
    match section {
        Section::Points => {
            let values = parse_numbers::<f64>(&name, text)?;
            if values.len() % 3 != 0 {
                return Err(format!("point coordinates have {} values", values.len()));
            }
            grid.points = values
                .chunks_exact(3)
                .map(|c| Point3::new(c[0], c[1], c[2]))
                .collect();
        }
        Section::PointData => {
            let values = parse_numbers::<f64>(&name, text)?;
            grid.point_data.push(PointArray {
                name,
                components,
                values,
            });
        }
        Section::Cells => match name.as_str() {
            "connectivity" => grid.connectivity = parse_numbers(&name, text)?,
            "offsets" => grid.offsets = parse_numbers(&name, text)?,
            "types" => grid.types = parse_numbers(&name, text)?,
            _ => {}
        },
        Section::FieldData => {
            if name == "TimeValue" {
                grid.time = parse_numbers::<f64>(&name, text)?.first().copied();
            }
        }
        Section::Other => {}
    }
    Ok(())
}

fn parse_numbers<T: std::str::FromStr>(name: &str, text: &str) -> std::result::Result<Vec<T>, String> {
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<T>()
                .map_err(|_| format!("data array '{name}' has invalid value '{tok}'"))
        })
        .collect()
}

fn attr(e: &BytesStart<'_>, key: &str) -> std::result::Result<Option<String>, String> {
    for a in e.attributes() {
        let a = a.map_err(|err| format!("bad attribute: {err}"))?;
        if a.key.as_ref() == key.as_bytes() {
            let value = a
                .unescape_value()
                .map_err(|err| format!("bad attribute value: {err}"))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_attr<T: std::str::FromStr>(
    e: &BytesStart<'_>,
    key: &str,
) -> std::result::Result<Option<T>, String> {
    match attr(e, key)? {
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("attribute {key}=\"{v}\" is not a number")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<Point3<f64>>, Vec<f64>, Vec<Vector3<f64>>, Vec<[usize; 4]>) {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0 / 3.0),
        ];
        let scalars = points.iter().map(|p| p.x * p.x + p.y * p.y).collect();
        let vectors = vec![
            Vector3::new(0.1, -0.2, 0.3),
            Vector3::new(1e-300, 2.5e10, -0.0),
            Vector3::new(std::f64::consts::PI, 0.0, 1.0),
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(0.7, 0.8, 0.9),
        ];
        let tets = vec![[0, 1, 2, 3], [1, 2, 3, 4]];
        (points, scalars, vectors, tets)
    }

    #[test]
    fn test_write_then_parse_reproduces_arrays() {
        let (points, scalars, vectors, tets) = sample();
        let data = SnapshotData {
            points: &points,
            scalar_name: "smth",
            scalars: &scalars,
            vector_name: "vel",
            vectors: &vectors,
            tetrahedra: &tets,
            time: 0.30000000000000004,
        };

        let mut buf = Vec::new();
        write_to(&mut buf, &data).unwrap();
        let grid = parse(std::str::from_utf8(&buf).unwrap()).unwrap();

        assert_eq!(grid.num_points(), 5);
        assert_eq!(grid.num_cells(), 2);
        assert_eq!(grid.points, points);
        assert_eq!(grid.scalars("smth").unwrap(), scalars.as_slice());
        assert_eq!(grid.vectors("vel").unwrap(), vectors);
        assert_eq!(grid.tetrahedra().unwrap(), tets);
        assert_eq!(grid.offsets, vec![4, 8]);
        assert_eq!(grid.types, vec![VTK_TETRA, VTK_TETRA]);
        assert_eq!(grid.time, Some(0.30000000000000004));
    }

    #[test]
    fn test_extreme_magnitudes_use_exponent_form() {
        let points = [Point3::new(1e-300, 2.5e20, 0.5); 4];
        let scalars = [1e-300; 4];
        let vectors = [Vector3::new(-1e300, 0.0, 1.0); 4];
        let tets = [[0, 1, 2, 3]];
        let data = SnapshotData {
            points: &points,
            scalar_name: "smth",
            scalars: &scalars,
            vector_name: "vel",
            vectors: &vectors,
            tetrahedra: &tets,
            time: 1e-7,
        };

        let mut buf = Vec::new();
        write_to(&mut buf, &data).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().all(|l| l.len() < 200), "{}", text);
        assert!(text.contains("1e-300 2.5e20 0.5"));
        assert!(text.contains(">1e-7<"));

        let grid = parse(&text).unwrap();
        assert_eq!(grid.points, points);
        assert_eq!(grid.vectors("vel").unwrap(), vectors);
        assert_eq!(grid.time, Some(1e-7));
    }

    #[test]
    fn test_writer_paths_are_distinct_per_index() {
        let writer = VtuWriter::new("lab", "moth");
        assert_eq!(writer.path_for(0), PathBuf::from("lab/moth-0.vtu"));
        assert_eq!(writer.path_for(12), PathBuf::from("lab/moth-12.vtu"));
        assert_ne!(writer.path_for(1), writer.path_for(11));
        assert_eq!(writer.collection_path(), PathBuf::from("lab/moth.pvd"));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = VtuWriter::new(dir.path().join("does-not-exist"), "moth");
        let (points, scalars, vectors, tets) = sample();
        let data = SnapshotData {
            points: &points,
            scalar_name: "smth",
            scalars: &scalars,
            vector_name: "vel",
            vectors: &vectors,
            tetrahedra: &tets,
            time: 0.0,
        };
        assert!(matches!(writer.write_snapshot(0, &data), Err(MeshError::Io(_))));
    }

    #[test]
    fn test_parse_rejects_point_count_mismatch() {
        let doc = r#"<?xml version="1.0"?>
<VTKFile type="UnstructuredGrid">
  <UnstructuredGrid>
    <Piece NumberOfPoints="2" NumberOfCells="0">
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="ascii">0 0 0</DataArray>
      </Points>
      <Cells>
        <DataArray type="Int64" Name="connectivity" format="ascii"></DataArray>
        <DataArray type="Int64" Name="offsets" format="ascii"></DataArray>
        <DataArray type="UInt8" Name="types" format="ascii"></DataArray>
      </Cells>
    </Piece>
  </UnstructuredGrid>
</VTKFile>"#;
        let err = parse(doc).unwrap_err();
        assert!(err.contains("declares 2 points"), "{}", err);
    }

    #[test]
    fn test_parse_rejects_binary_arrays() {
        let doc = r#"<VTKFile><UnstructuredGrid><Piece NumberOfPoints="0" NumberOfCells="0">
<Points><DataArray type="Float64" NumberOfComponents="3" format="binary">AAAA</DataArray></Points>
</Piece></UnstructuredGrid></VTKFile>"#;
        assert!(parse(doc).unwrap_err().contains("unsupported format"));
    }

    #[test]
    fn test_non_tetra_cells_rejected() {
        let grid = VtuGrid {
            connectivity: vec![0, 1, 2],
            offsets: vec![3],
            types: vec![5],
            ..Default::default()
        };
        assert!(grid.tetrahedra().is_err());
    }
}
