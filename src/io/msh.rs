//! Gmsh MSH format reader.
//!
//! Reads ASCII files in format 2.2 and 4.1 and keeps what a volume mesh
//! needs: node tags and coordinates in file order, and the connectivity of
//! every 4-node tetrahedron (element type 4). Lines, triangles and other
//! element types are skipped.
//!
//! # Example
//!
//! ```no_run
//! use tetsnap::io::msh;
//!
//! let raw = msh::load("moth.msh").unwrap();
//! println!("{} nodes, {} tetrahedra", raw.num_nodes(), raw.num_tetrahedra());
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::{RawMesh, GMSH_TETRA};

/// Load a Gmsh MSH file.
///
/// The result is not validated; node tag contiguity and element references
/// are checked when the [`RawMesh`] is turned into a mesh.
pub fn load<P: AsRef<Path>>(path: P) -> Result<RawMesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read(BufReader::new(file)).map_err(|message| MeshError::LoadError {
        path: path.to_path_buf(),
        message,
    })
}

/// Read MSH data from any buffered reader.
pub fn read<R: BufRead>(reader: R) -> std::result::Result<RawMesh, String> {
    let mut lines = Lines::new(reader);
    let mut version: Option<u32> = None;
    let mut raw = RawMesh::default();
    let mut seen_nodes = false;

    while let Some(line) = lines.next_line()? {
        match line.as_str() {
            "$MeshFormat" => {
                let header = lines.expect("mesh format header")?;
                let fields: Vec<&str> = header.split_whitespace().collect();
                if fields.len() < 3 {
                    return Err(lines.error("malformed $MeshFormat header"));
                }
                let major = fields[0]
                    .split('.')
                    .next()
                    .and_then(|m| m.parse::<u32>().ok())
                    .ok_or_else(|| lines.error(&format!("bad version '{}'", fields[0])))?;
                if !(major == 2 || major == 4) {
                    return Err(format!("unsupported MSH version {}", fields[0]));
                }
                if fields[1] != "0" {
                    return Err("binary MSH files are not supported".to_string());
                }
                version = Some(major);
                lines.skip_to("$EndMeshFormat")?;
            }
            "$Nodes" => {
                let (tags, coords) = match require_version(version)? {
                    4 => read_nodes_v4(&mut lines)?,
                    _ => read_nodes_v2(&mut lines)?,
                };
                raw.node_tags = tags;
                raw.coords = coords;
                seen_nodes = true;
            }
            "$Elements" => {
                raw.tetrahedra = match require_version(version)? {
                    4 => read_elements_v4(&mut lines)?,
                    _ => read_elements_v2(&mut lines)?,
                };
            }
            s if s.starts_with('$') && !s.starts_with("$End") => {
                let end = format!("$End{}", &s[1..]);
                lines.skip_to(&end)?;
            }
            _ => {}
        }
    }

    if version.is_none() {
        return Err("missing $MeshFormat section".to_string());
    }
    if !seen_nodes {
        return Err("missing $Nodes section".to_string());
    }

    Ok(raw)
}

/// Counts come from the file; growth past this is left to the vectors.
const PREALLOC_LIMIT: usize = 1 << 20;

fn require_version(version: Option<u32>) -> std::result::Result<u32, String> {
    version.ok_or_else(|| "section found before $MeshFormat".to_string())
}

/// Line source that tracks the current line number for error messages.
struct Lines<R> {
    inner: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            inner: reader.lines(),
            line_no: 0,
        }
    }

    /// Next non-empty trimmed line, or `None` at end of input.
    fn next_line(&mut self) -> std::result::Result<Option<String>, String> {
        for line in self.inner.by_ref() {
            self.line_no += 1;
            let line = line.map_err(|e| format!("read error at line {}: {}", self.line_no, e))?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
        Ok(None)
    }

    fn expect(&mut self, what: &str) -> std::result::Result<String, String> {
        self.next_line()?
            .ok_or_else(|| format!("unexpected end of file, expected {}", what))
    }

    fn skip_to(&mut self, end: &str) -> std::result::Result<(), String> {
        while let Some(line) = self.next_line()? {
            if line == end {
                return Ok(());
            }
        }
        Err(format!("unexpected end of file, expected {}", end))
    }

    fn error(&self, message: &str) -> String {
        format!("line {}: {}", self.line_no, message)
    }

    /// Parse every whitespace-separated field of the next line.
    fn numbers<T: std::str::FromStr>(&mut self, what: &str) -> std::result::Result<Vec<T>, String> {
        let line = self.expect(what)?;
        line.split_whitespace()
            .map(|tok| {
                tok.parse::<T>()
                    .map_err(|_| self.error(&format!("invalid {} value '{}'", what, tok)))
            })
            .collect()
    }
}

fn read_nodes_v2<R: BufRead>(
    lines: &mut Lines<R>,
) -> std::result::Result<(Vec<usize>, Vec<f64>), String> {
    let count = lines.numbers::<usize>("node count")?;
    let n = *count.first().ok_or_else(|| lines.error("missing node count"))?;
    let mut tags = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    let mut coords = Vec::with_capacity(3 * n.min(PREALLOC_LIMIT));

    for _ in 0..n {
        let line = lines.expect("node")?;
        let mut fields = line.split_whitespace();
        let tag = fields
            .next()
            .and_then(|t| t.parse::<usize>().ok())
            .ok_or_else(|| lines.error("invalid node tag"))?;
        let xyz: Vec<f64> = fields
            .take(3)
            .map(|t| t.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| lines.error("invalid node coordinate"))?;
        if xyz.len() != 3 {
            return Err(lines.error("node line needs three coordinates"));
        }
        tags.push(tag);
        coords.extend_from_slice(&xyz);
    }

    lines.skip_to("$EndNodes")?;
    Ok((tags, coords))
}

fn read_nodes_v4<R: BufRead>(
    lines: &mut Lines<R>,
) -> std::result::Result<(Vec<usize>, Vec<f64>), String> {
    let header = lines.numbers::<usize>("node section header")?;
    if header.len() < 4 {
        return Err(lines.error("node section header needs 4 fields"));
    }
    let (num_blocks, total) = (header[0], header[1]);
    let mut tags = Vec::with_capacity(total.min(PREALLOC_LIMIT));
    let mut coords = Vec::with_capacity(3 * total.min(PREALLOC_LIMIT));

    for _ in 0..num_blocks {
        let block = lines.numbers::<usize>("node block header")?;
        if block.len() < 4 {
            return Err(lines.error("node block header needs 4 fields"));
        }
        let parametric = block[2] != 0;
        let n = block[3];

        for _ in 0..n {
            let tag = lines.numbers::<usize>("node tag")?;
            tags.push(*tag.first().ok_or_else(|| lines.error("missing node tag"))?);
        }
        for _ in 0..n {
            let xyz = lines.numbers::<f64>("node coordinate")?;
            // Parametric nodes carry extra u/v values after x y z
            if xyz.len() < 3 || (!parametric && xyz.len() != 3) {
                return Err(lines.error("node coordinate line needs three values"));
            }
            coords.extend_from_slice(&xyz[..3]);
        }
    }

    if tags.len() != total {
        return Err(format!(
            "node section declares {} nodes, found {}",
            total,
            tags.len()
        ));
    }

    lines.skip_to("$EndNodes")?;
    Ok((tags, coords))
}

fn read_elements_v2<R: BufRead>(lines: &mut Lines<R>) -> std::result::Result<Vec<usize>, String> {
    let count = lines.numbers::<usize>("element count")?;
    let n = *count.first().ok_or_else(|| lines.error("missing element count"))?;
    let mut tets = Vec::new();

    for _ in 0..n {
        // elm-number elm-type number-of-tags <tags> node-number-list
        let fields = lines.numbers::<usize>("element")?;
        if fields.len() < 3 {
            return Err(lines.error("element line too short"));
        }
        if fields[1] != GMSH_TETRA {
            continue;
        }
        let start = fields[2]
            .checked_add(3)
            .filter(|&start| start <= fields.len())
            .ok_or_else(|| lines.error("element tag count out of range"))?;
        if fields.len() - start != 4 {
            return Err(lines.error("tetrahedron needs exactly four nodes"));
        }
        tets.extend_from_slice(&fields[start..]);
    }

    lines.skip_to("$EndElements")?;
    Ok(tets)
}

fn read_elements_v4<R: BufRead>(lines: &mut Lines<R>) -> std::result::Result<Vec<usize>, String> {
    let header = lines.numbers::<usize>("element section header")?;
    if header.len() < 4 {
        return Err(lines.error("element section header needs 4 fields"));
    }
    let num_blocks = header[0];
    let mut tets = Vec::new();

    for _ in 0..num_blocks {
        // entityDim entityTag elementType numElementsInBlock
        let block = lines.numbers::<usize>("element block header")?;
        if block.len() < 4 {
            return Err(lines.error("element block header needs 4 fields"));
        }
        let is_tet = block[2] == GMSH_TETRA;
        for _ in 0..block[3] {
            if !is_tet {
                lines.expect("element")?;
                continue;
            }
            let fields = lines.numbers::<usize>("element")?;
            if fields.len() != 5 {
                return Err(lines.error("tetrahedron needs exactly four nodes"));
            }
            tets.extend_from_slice(&fields[1..]);
        }
    }

    lines.skip_to("$EndElements")?;
    Ok(tets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSH4: &str = "\
$MeshFormat
4.1 0 8
$EndMeshFormat
$Entities
1 0 0 1
1 0 0 0 0
1 0 0 0 1 1 1 0 0
$EndEntities
$Nodes
2 5 1 5
0 1 0 1
1
0 0 0
3 1 0 4
2
3
4
5
1 0 0
0 1 0
0 0 1
1 1 1
$EndNodes
$Elements
2 3 1 3
2 1 2 1
1 1 2 3
3 1 4 2
2 1 2 3 4
3 2 3 4 5
$EndElements
";

    const MSH2: &str = "\
$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
4
1 0 0 0
2 1 0 0
3 0 1 0
4 0 0 1
$EndNodes
$Elements
2
1 2 2 0 1 1 2 3
2 4 2 0 1 1 2 3 4
$EndElements
";

    #[test]
    fn test_read_v4() {
        let raw = read(MSH4.as_bytes()).unwrap();
        assert_eq!(raw.node_tags, vec![1, 2, 3, 4, 5]);
        assert_eq!(raw.coords.len(), 15);
        assert_eq!(&raw.coords[12..], &[1.0, 1.0, 1.0]);
        assert_eq!(raw.tetrahedra, vec![1, 2, 3, 4, 2, 3, 4, 5]);
    }

    #[test]
    fn test_read_v2() {
        let raw = read(MSH2.as_bytes()).unwrap();
        assert_eq!(raw.node_tags, vec![1, 2, 3, 4]);
        assert_eq!(raw.coords[3], 1.0);
        assert_eq!(raw.tetrahedra, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_surface_only_mesh_has_no_tetrahedra() {
        let text = MSH2.replace("2 4 2 0 1 1 2 3 4", "2 2 2 0 1 2 3 4");
        let raw = read(text.as_bytes()).unwrap();
        assert!(raw.tetrahedra.is_empty());
    }

    #[test]
    fn test_binary_rejected() {
        let text = MSH4.replace("4.1 0 8", "4.1 1 8");
        assert!(read(text.as_bytes()).unwrap_err().contains("binary"));
    }

    #[test]
    fn test_missing_format_rejected() {
        assert!(read("$Nodes\n0\n$EndNodes\n".as_bytes()).is_err());
        assert!(read("".as_bytes()).unwrap_err().contains("$MeshFormat"));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let text = &MSH2[..MSH2.find("$Elements").unwrap() + 12];
        let err = read(text.as_bytes()).unwrap_err();
        assert!(err.contains("end of file") || err.contains("line"), "{}", err);
    }

    #[test]
    fn test_huge_counts_fail_without_panicking() {
        let v4_nodes = "$MeshFormat\n4.1 0 8\n$EndMeshFormat\n\
                        $Nodes\n0 18446744073709551615 1 1\n$EndNodes\n";
        assert!(read(v4_nodes.as_bytes()).unwrap_err().contains("declares"));

        let v2_nodes = "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n\
                        $Nodes\n18446744073709551615\n1 0 0 0\n$EndNodes\n";
        assert!(read(v2_nodes.as_bytes()).is_err());

        let v2_elements = MSH2.replace("2 4 2 0 1 1 2 3 4", "2 4 18446744073709551615 1 2 3 4");
        let err = read(v2_elements.as_bytes()).unwrap_err();
        assert!(err.contains("out of range"), "{}", err);

        let v2_elements = MSH2.replace("2 4 2 0 1 1 2 3 4", "2 4 18446744073709551612 1 2 3 4");
        assert!(read(v2_elements.as_bytes()).unwrap_err().contains("out of range"));
    }

    #[test]
    fn test_huge_count_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.msh");
        std::fs::write(
            &path,
            "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n$Nodes\n1000000000000\n$EndNodes\n",
        )
        .unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, MeshError::LoadError { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        assert!(matches!(
            load("/nonexistent/dir/mesh.msh"),
            Err(MeshError::Io(_))
        ));
    }
}
