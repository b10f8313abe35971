//! End-to-end runs: `.msh` in, `.vtu` snapshots out.

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use tetsnap::io::{pvd, vtu};
use tetsnap::mesh::{SCALAR_FIELD_NAME, VELOCITY_FIELD_NAME};
use tetsnap::prelude::*;

/// Two tetrahedra sharing the face (2, 3, 4).
const TWO_TETS_MSH4: &str = "\
$MeshFormat
4.1 0 8
$EndMeshFormat
$Nodes
1 5 1 5
3 1 0 5
1
2
3
4
5
0 0 0
1 0 0
0 1 0
0 0 1
1 1 1
$EndNodes
$Elements
1 2 1 2
3 1 4 2
1 1 2 3 4
2 5 2 3 4
$EndElements
";

fn write_msh(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("input.msh");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_msh_to_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_msh(dir.path(), TWO_TETS_MSH4);
    let out = dir.path().join("lab");

    let raw = MshFile::new(&input).load().unwrap();
    let mut mesh = CalcMesh::from_raw(&raw).unwrap();
    let initial = mesh.clone();

    let writer = VtuWriter::new(&out, "moth");
    writer.ensure_directory().unwrap();
    let steps = 5;
    let summary = simulate(&mut mesh, &writer, &SimulateOptions::default().with_steps(steps)).unwrap();
    assert_eq!(summary.snapshots.len(), steps);

    let mut replay = initial;
    for (i, ds) in summary.snapshots.iter().enumerate() {
        assert_eq!(ds.file, out.join(format!("moth-{}.vtu", i)));
        if i > 0 {
            replay.advance(0.1);
        }

        let grid = vtu::load(&ds.file).unwrap();
        assert_eq!(grid.num_points(), 5);
        assert_eq!(grid.num_cells(), 2);
        assert_eq!(grid.tetrahedra().unwrap(), vec![[0, 1, 2, 3], [4, 1, 2, 3]]);
        assert_eq!(grid.points, replay.nodes());
        assert_eq!(grid.scalars(SCALAR_FIELD_NAME).unwrap(), replay.scalar_field());
        assert_eq!(grid.vectors(VELOCITY_FIELD_NAME).unwrap(), replay.velocity());
        assert_relative_eq!(grid.time.unwrap(), ds.time);
    }
}

#[test]
fn test_scalar_field_is_static_and_nodes_move() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_msh(dir.path(), TWO_TETS_MSH4);
    let raw = MshFile::new(&input).load().unwrap();
    let mut mesh = CalcMesh::from_raw(&raw).unwrap();

    let writer = VtuWriter::new(dir.path(), "s");
    simulate(&mut mesh, &writer, &SimulateOptions::default().with_steps(3)).unwrap();

    let first = vtu::load(dir.path().join("s-0.vtu")).unwrap();
    let last = vtu::load(dir.path().join("s-2.vtu")).unwrap();
    assert_eq!(first.scalars(SCALAR_FIELD_NAME), last.scalars(SCALAR_FIELD_NAME));

    // Node 5 at (1, 1, 1) has the largest cube, so v0 = (1, 1, 1).
    // The first move uses v0, the second v0 * cos(67 * tau).
    let factor = (67.0_f64 * 0.1).cos();
    let expected = 1.0 + 0.1 + 0.1 * factor;
    assert_relative_eq!(last.points[4].x, expected, epsilon = 1e-12);
    // Node 1 at the origin never moves
    assert_eq!(last.points[0], first.points[0]);
}

#[test]
fn test_collection_lists_every_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_msh(dir.path(), TWO_TETS_MSH4);
    let raw = MshFile::new(&input).load().unwrap();
    let mut mesh = CalcMesh::from_raw(&raw).unwrap();

    let writer = VtuWriter::new(dir.path(), "moth");
    let summary = simulate(&mut mesh, &writer, &SimulateOptions::default().with_steps(4)).unwrap();
    let collection = dir.path().join("moth.pvd");
    pvd::save(&summary.snapshots, &collection).unwrap();

    let text = fs::read_to_string(&collection).unwrap();
    for i in 0..4 {
        assert!(text.contains(&format!("file=\"moth-{}.vtu\"", i)), "{}", text);
    }
}

#[test]
fn test_surface_only_mesh_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_msh(
        dir.path(),
        "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n\
         $Nodes\n3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n$EndNodes\n\
         $Elements\n1\n1 2 2 0 1 1 2 3\n$EndElements\n",
    );
    let err = MshFile::new(&input).load().unwrap_err();
    assert!(matches!(err, MeshError::NoVolumeElements));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_unwritable_directory_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_msh(dir.path(), TWO_TETS_MSH4);
    let raw = MshFile::new(&input).load().unwrap();
    let mut mesh = CalcMesh::from_raw(&raw).unwrap();

    // Directory was never created
    let writer = VtuWriter::new(dir.path().join("missing"), "moth");
    let err = simulate(&mut mesh, &writer, &SimulateOptions::default().with_steps(2)).unwrap_err();
    assert!(matches!(err, MeshError::Io(_)));
    assert_eq!(err.exit_code(), 4);
}
