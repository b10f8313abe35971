//! Geometry of linear tetrahedra.

use nalgebra::Point3;

/// VTK cell type code for a linear tetrahedron.
pub const VTK_TETRA: u8 = 10;

/// Gmsh element type code for a 4-node tetrahedron.
pub const GMSH_TETRA: usize = 4;

/// Signed volume of the tetrahedron `(a, b, c, d)`.
///
/// Positive when `d` lies on the side of triangle `(a, b, c)` that its
/// right-handed normal points to.
#[inline]
pub fn signed_volume(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    ab.cross(&ac).dot(&ad) / 6.0
}

/// Axis-aligned bounding box of a point set, or `None` if it is empty.
pub fn bounding_box(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;

    for p in points {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }

    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_tetrahedron_volume() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let d = Point3::new(0.0, 0.0, 1.0);

        assert_relative_eq!(signed_volume(&a, &b, &c, &d), 1.0 / 6.0, epsilon = 1e-12);
        // Swapping two vertices flips orientation
        assert_relative_eq!(signed_volume(&b, &a, &c, &d), -1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounding_box() {
        let pts = vec![
            Point3::new(1.0, -2.0, 0.5),
            Point3::new(-1.0, 3.0, 0.0),
            Point3::new(0.0, 0.0, 4.0),
        ];
        let (min, max) = bounding_box(&pts).unwrap();
        assert_eq!(min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 3.0, 4.0));
        assert!(bounding_box(&[]).is_none());
    }
}
