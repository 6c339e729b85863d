//! STL (STereoLithography) I/O
//!
//! Writes both ASCII and binary STL. Per-facet normals are recomputed from
//! the triangle winding, so watertight meshes from the surface extractor
//! export with consistent outward orientation regardless of whether vertex
//! normals were attached.

use crate::{Error, Result};
use carve_3d::TriangleMesh;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// On-disk STL flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    Ascii,
    Binary,
}

const BINARY_HEADER_LEN: usize = 80;
const BINARY_TRIANGLE_LEN: usize = 4 * 12 + 2;

fn facet_normal(v0: &Point3<f32>, v1: &Point3<f32>, v2: &Point3<f32>) -> Vector3<f32> {
    let n = (v1 - v0).cross(&(v2 - v0));
    n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
}

fn facet_vertices<'a>(
    mesh: &'a TriangleMesh,
    face: &[usize; 3],
) -> Result<(&'a Point3<f32>, &'a Point3<f32>, &'a Point3<f32>)> {
    let get = |i: usize| {
        mesh.vertices
            .get(i)
            .ok_or_else(|| Error::InvalidInput(format!("face references missing vertex {i}")))
    };
    Ok((get(face[0])?, get(face[1])?, get(face[2])?))
}

/// Write a mesh as ASCII STL.
pub fn write_stl_ascii<W: Write>(writer: &mut W, mesh: &TriangleMesh, name: &str) -> Result<()> {
    writeln!(writer, "solid {name}")?;
    for face in &mesh.faces {
        let (v0, v1, v2) = facet_vertices(mesh, face)?;
        let n = facet_normal(v0, v1, v2);
        writeln!(writer, "facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "  outer loop")?;
        for v in [v0, v1, v2] {
            writeln!(writer, "    vertex {:e} {:e} {:e}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "  endloop")?;
        writeln!(writer, "endfacet")?;
    }
    writeln!(writer, "endsolid {name}")?;
    Ok(())
}

/// Write a mesh as binary STL: 80-byte header, little-endian triangle count,
/// then 50 bytes per facet.
pub fn write_stl_binary<W: Write>(writer: &mut W, mesh: &TriangleMesh) -> Result<()> {
    let count = u32::try_from(mesh.num_faces())
        .map_err(|_| Error::InvalidInput(format!("{} facets exceed STL limit", mesh.num_faces())))?;

    let mut header = [0u8; BINARY_HEADER_LEN];
    let tag = b"carved silhouette mesh";
    header[..tag.len()].copy_from_slice(tag);
    writer.write_all(&header)?;
    writer.write_all(&count.to_le_bytes())?;

    for face in &mesh.faces {
        let (v0, v1, v2) = facet_vertices(mesh, face)?;
        let n = facet_normal(v0, v1, v2);
        for value in [
            n.x, n.y, n.z, v0.x, v0.y, v0.z, v1.x, v1.y, v1.z, v2.x, v2.y, v2.z,
        ] {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

/// Read an STL file, auto-detecting the flavour.
///
/// Binary detection uses the length invariant (84 bytes of preamble plus 50
/// per facet) rather than the header text, since binary files are allowed to
/// begin with the bytes `solid`. Vertices are not deduplicated.
pub fn read_stl<R: Read>(reader: &mut R) -> Result<TriangleMesh> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    if looks_binary(&bytes) {
        read_binary(&bytes)
    } else {
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| Error::Parse("STL is neither valid binary nor UTF-8 text".to_string()))?;
        read_ascii(text)
    }
}

fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.len() < BINARY_HEADER_LEN + 4 {
        return false;
    }
    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[BINARY_HEADER_LEN..BINARY_HEADER_LEN + 4]);
    let count = u32::from_le_bytes(count) as usize;
    bytes.len() == BINARY_HEADER_LEN + 4 + count * BINARY_TRIANGLE_LEN
}

fn read_binary(bytes: &[u8]) -> Result<TriangleMesh> {
    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[BINARY_HEADER_LEN..BINARY_HEADER_LEN + 4]);
    let count = u32::from_le_bytes(count) as usize;

    let mut vertices = Vec::with_capacity(count * 3);
    let mut faces = Vec::with_capacity(count);
    let mut offset = BINARY_HEADER_LEN + 4;

    for _ in 0..count {
        let f32_at = |o: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[o..o + 4]);
            f32::from_le_bytes(b)
        };
        // Skip the stored normal; it is rederived from the winding on write.
        let base = vertices.len();
        for v in 0..3 {
            let o = offset + 12 + v * 12;
            vertices.push(Point3::new(f32_at(o), f32_at(o + 4), f32_at(o + 8)));
        }
        faces.push([base, base + 1, base + 2]);
        offset += BINARY_TRIANGLE_LEN;
    }

    Ok(TriangleMesh::with_vertices_and_faces(vertices, faces))
}

fn read_ascii(text: &str) -> Result<TriangleMesh> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    let mut tokens = text.split_whitespace();
    match tokens.next() {
        Some("solid") => {}
        _ => return Err(Error::Parse("ASCII STL must start with 'solid'".to_string())),
    }

    let mut pending: Vec<Point3<f32>> = Vec::with_capacity(3);
    while let Some(token) = tokens.next() {
        match token {
            "vertex" => {
                let mut coords = [0.0f32; 3];
                for c in &mut coords {
                    let t = tokens
                        .next()
                        .ok_or_else(|| Error::Parse("truncated vertex".to_string()))?;
                    *c = t
                        .parse()
                        .map_err(|_| Error::Parse(format!("invalid coordinate: {t}")))?;
                }
                pending.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            "endloop" => {
                if pending.len() != 3 {
                    return Err(Error::Parse(format!(
                        "facet with {} vertices, expected 3",
                        pending.len()
                    )));
                }
                let base = vertices.len();
                vertices.extend(pending.drain(..));
                faces.push([base, base + 1, base + 2]);
            }
            _ => {}
        }
    }

    Ok(TriangleMesh::with_vertices_and_faces(vertices, faces))
}

/// Save a mesh to `path` in the requested flavour.
pub fn save_stl<P: AsRef<Path>>(path: P, mesh: &TriangleMesh, format: StlFormat) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    match format {
        StlFormat::Ascii => {
            let name = path
                .as_ref()
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("mesh");
            write_stl_ascii(&mut writer, mesh, name)?;
        }
        StlFormat::Binary => write_stl_binary(&mut writer, mesh)?,
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tetrahedron() -> TriangleMesh {
        TriangleMesh::with_vertices_and_faces(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn binary_round_trip_preserves_geometry() {
        let mesh = tetrahedron();
        let mut buf = Vec::new();
        write_stl_binary(&mut buf, &mesh).unwrap();
        assert_eq!(buf.len(), 84 + 4 * 50);

        let parsed = read_stl(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed.num_faces(), 4);
        assert_eq!(parsed.num_vertices(), 12);
        assert!((parsed.surface_area() - mesh.surface_area()).abs() < 1e-5);
    }

    #[test]
    fn ascii_round_trip_preserves_geometry() {
        let mesh = tetrahedron();
        let mut buf = Vec::new();
        write_stl_ascii(&mut buf, &mesh, "tetra").unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("solid tetra"));
        assert!(text.trim_end().ends_with("endsolid tetra"));

        let parsed = read_stl(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed.num_faces(), 4);
        assert!((parsed.surface_area() - mesh.surface_area()).abs() < 1e-4);
    }

    #[test]
    fn empty_mesh_is_valid_in_both_flavours() {
        let mesh = TriangleMesh::new();

        let mut buf = Vec::new();
        write_stl_binary(&mut buf, &mesh).unwrap();
        assert_eq!(buf.len(), 84);
        assert!(read_stl(&mut Cursor::new(buf)).unwrap().is_empty());

        let mut buf = Vec::new();
        write_stl_ascii(&mut buf, &mesh, "empty").unwrap();
        assert!(read_stl(&mut Cursor::new(buf)).unwrap().is_empty());
    }

    #[test]
    fn face_with_missing_vertex_is_rejected() {
        let mesh = TriangleMesh::with_vertices_and_faces(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![[0, 1, 7]],
        );
        let mut buf = Vec::new();
        assert!(write_stl_binary(&mut buf, &mesh).is_err());
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        let mut cursor = Cursor::new(b"not an stl file at all".to_vec());
        assert!(read_stl(&mut cursor).is_err());
    }

    #[test]
    fn save_stl_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.stl");
        save_stl(&path, &tetrahedron(), StlFormat::Binary).unwrap();

        let mut file = File::open(&path).unwrap();
        let parsed = read_stl(&mut file).unwrap();
        assert_eq!(parsed.num_faces(), 4);
    }
}
