//! Triangle mesh data structure.

use nalgebra::{Point3, Vector3};

/// Triangle mesh with vertices and face indices
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3<f32>>>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    pub fn with_vertices_and_faces(vertices: Vec<Point3<f32>>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Compute face normals from the counter-clockwise winding
    pub fn compute_face_normals(&self) -> Vec<Vector3<f32>> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let v1 = self.vertices[face[1]];
                let v2 = self.vertices[face[2]];

                let e1 = v1 - v0;
                let e2 = v2 - v0;

                let n = e1.cross(&e2);
                // Degenerate (zero-area) faces get a zero normal rather than NaN.
                n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
            })
            .collect()
    }

    /// Compute vertex normals by averaging adjacent face normals
    pub fn compute_vertex_normals(&mut self) {
        let mut vertex_normals: Vec<Vector3<f32>> = vec![Vector3::zeros(); self.vertices.len()];
        let face_normals = self.compute_face_normals();

        for (face_idx, face) in self.faces.iter().enumerate() {
            let normal = face_normals[face_idx];
            for &vertex_idx in face.iter() {
                vertex_normals[vertex_idx] += normal;
            }
        }

        for normal in vertex_normals.iter_mut() {
            *normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
        }

        self.normals = Some(vertex_normals);
    }

    /// Calculate mesh bounds
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.vertices.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = self.vertices[0];
        let mut max = self.vertices[0];

        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }

        (min, max)
    }

    /// Calculate surface area
    pub fn surface_area(&self) -> f32 {
        let mut area = 0.0;
        for face in &self.faces {
            let v0 = self.vertices[face[0]];
            let v1 = self.vertices[face[1]];
            let v2 = self.vertices[face[2]];

            let e1 = v1 - v0;
            let e2 = v2 - v0;

            area += e1.cross(&e2).norm() * 0.5;
        }
        area
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh::with_vertices_and_faces(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn face_normal_follows_winding() {
        let mesh = unit_triangle();
        let normals = mesh.compute_face_normals();
        assert_eq!(normals.len(), 1);
        assert!((normals[0] - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn vertex_normals_are_unit_length() {
        let mut mesh = unit_triangle();
        mesh.compute_vertex_normals();
        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 3);
        for n in normals {
            assert!((n.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn bounds_and_area_of_unit_triangle() {
        let mesh = unit_triangle();
        let (min, max) = mesh.bounds();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
        assert!((mesh.surface_area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_mesh_is_well_behaved() {
        let mesh = TriangleMesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.bounds(), (Point3::origin(), Point3::origin()));
        assert_eq!(mesh.surface_area(), 0.0);
    }
}
