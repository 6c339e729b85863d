//! Marching-cubes isosurface extraction.
//!
//! Lookup-table formulation with slab-based edge vertex deduplication: edge
//! crossings are computed once per edge and shared between the cells on
//! either side, so the output mesh is watertight wherever the field is.
//! Vertices come out in grid-index space; [`extract_surface`] rescales them
//! into the world frame of a [`VoxelGrid`].

#![allow(clippy::unreadable_literal)]

use crate::mesh::TriangleMesh;
use crate::voxel::VoxelGrid;
use carve_core::{Error, Result};
use nalgebra::{Point3, Vector3};

/// Extract the isosurface of a scalar field sampled on a regular lattice.
///
/// `field` holds one sample per grid node in layout `(i * ny + j) * nz + k`.
/// The surface sits where the field crosses `iso_level`; crossing positions
/// are linearly interpolated along cell edges. Returned vertices live in
/// grid-index space and carry accumulated, normalized vertex normals.
pub fn marching_cubes(
    field: &[f32],
    iso_level: f32,
    nx: usize,
    ny: usize,
    nz: usize,
) -> Result<TriangleMesh> {
    if field.len() != nx * ny * nz {
        return Err(Error::InvalidInput(format!(
            "field has {} samples, expected {}x{}x{} = {}",
            field.len(),
            nx,
            ny,
            nz,
            nx * ny * nz
        )));
    }
    if nx < 2 || ny < 2 || nz < 2 {
        return Err(Error::InvalidInput(format!(
            "every field dimension must be at least 2, got {nx}x{ny}x{nz}"
        )));
    }

    let mut vertices: Vec<Point3<f32>> = Vec::new();
    let mut normals: Vec<Vector3<f32>> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    let size = [nx, ny, nz];
    // One vertex-index slot per edge axis at each (x, y), for two z slabs;
    // modular z indexing reuses the slabs as the sweep advances.
    let mut slab_inds: Vec<[u32; 3]> = vec![[0; 3]; nx * ny * 2];

    let mut vs = [0.0_f32; 8];
    let mut edge_indices = [0_u32; 12];

    for z in 0..nz - 1 {
        for y in 0..ny - 1 {
            for x in 0..nx - 1 {
                vs[0] = field[node_index(x, y, z, &size)] - iso_level;
                vs[1] = field[node_index(x + 1, y, z, &size)] - iso_level;
                vs[2] = field[node_index(x, y + 1, z, &size)] - iso_level;
                vs[3] = field[node_index(x + 1, y + 1, z, &size)] - iso_level;
                vs[4] = field[node_index(x, y, z + 1, &size)] - iso_level;
                vs[5] = field[node_index(x + 1, y, z + 1, &size)] - iso_level;
                vs[6] = field[node_index(x, y + 1, z + 1, &size)] - iso_level;
                vs[7] = field[node_index(x + 1, y + 1, z + 1, &size)] - iso_level;

                let config_n = usize::from(vs[0] < 0.0)
                    | usize::from(vs[1] < 0.0) << 1
                    | usize::from(vs[2] < 0.0) << 2
                    | usize::from(vs[3] < 0.0) << 3
                    | usize::from(vs[4] < 0.0) << 4
                    | usize::from(vs[5] < 0.0) << 5
                    | usize::from(vs[6] < 0.0) << 6
                    | usize::from(vs[7] < 0.0) << 7;

                if config_n == 0 || config_n == 255 {
                    continue;
                }

                let mut cell = CellEdges {
                    slab_inds: &mut slab_inds,
                    vertices: &mut vertices,
                    normals: &mut normals,
                    size: &size,
                };

                // X-axis edges; boundary guards keep interior edges from
                // being computed twice.
                if y == 0 && z == 0 {
                    cell.compute(vs[0], vs[1], 0, x, y, z);
                }
                if z == 0 {
                    cell.compute(vs[2], vs[3], 0, x, y + 1, z);
                }
                if y == 0 {
                    cell.compute(vs[4], vs[5], 0, x, y, z + 1);
                }
                cell.compute(vs[6], vs[7], 0, x, y + 1, z + 1);

                // Y-axis edges.
                if x == 0 && z == 0 {
                    cell.compute(vs[0], vs[2], 1, x, y, z);
                }
                if z == 0 {
                    cell.compute(vs[1], vs[3], 1, x + 1, y, z);
                }
                if x == 0 {
                    cell.compute(vs[4], vs[6], 1, x, y, z + 1);
                }
                cell.compute(vs[5], vs[7], 1, x + 1, y, z + 1);

                // Z-axis edges.
                if x == 0 && y == 0 {
                    cell.compute(vs[0], vs[4], 2, x, y, z);
                }
                if y == 0 {
                    cell.compute(vs[1], vs[5], 2, x + 1, y, z);
                }
                if x == 0 {
                    cell.compute(vs[2], vs[6], 2, x, y + 1, z);
                }
                cell.compute(vs[3], vs[7], 2, x + 1, y + 1, z);

                edge_indices[0] = slab_inds[slab_index(x, y, z, &size)][0];
                edge_indices[1] = slab_inds[slab_index(x, y + 1, z, &size)][0];
                edge_indices[2] = slab_inds[slab_index(x, y, z + 1, &size)][0];
                edge_indices[3] = slab_inds[slab_index(x, y + 1, z + 1, &size)][0];
                edge_indices[4] = slab_inds[slab_index(x, y, z, &size)][1];
                edge_indices[5] = slab_inds[slab_index(x + 1, y, z, &size)][1];
                edge_indices[6] = slab_inds[slab_index(x, y, z + 1, &size)][1];
                edge_indices[7] = slab_inds[slab_index(x + 1, y, z + 1, &size)][1];
                edge_indices[8] = slab_inds[slab_index(x, y, z, &size)][2];
                edge_indices[9] = slab_inds[slab_index(x + 1, y, z, &size)][2];
                edge_indices[10] = slab_inds[slab_index(x, y + 1, z, &size)][2];
                edge_indices[11] = slab_inds[slab_index(x + 1, y + 1, z, &size)][2];

                // Bits [3:0] hold the triangle count, then one nibble per
                // triangle-vertex edge index.
                let config = MC_TRIS[config_n];
                let n_triangles = (config & 0xF) as usize;
                let index_base = indices.len();

                let mut offset = 4;
                for _ in 0..n_triangles * 3 {
                    let edge = ((config >> offset) & 0xF) as usize;
                    indices.push(edge_indices[edge]);
                    offset += 4;
                }

                for i in 0..n_triangles {
                    let ia = indices[index_base + i * 3];
                    let ib = indices[index_base + i * 3 + 1];
                    let ic = indices[index_base + i * 3 + 2];
                    accumulate_normal(&vertices, &mut normals, ia, ib, ic);
                }
            }
        }
    }

    for normal in &mut normals {
        let len = normal.norm();
        if len > 1e-10 {
            *normal /= len;
        }
    }

    let faces = indices
        .chunks_exact(3)
        .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
        .collect();

    let mut mesh = TriangleMesh::with_vertices_and_faces(vertices, faces);
    mesh.normals = Some(normals);
    Ok(mesh)
}

/// Extract the surface of an occupancy field defined on `grid` and rescale
/// the result into the grid's world frame.
///
/// The field is zero-padded by one node on every side before extraction, so
/// solids that reach the grid boundary still close into a watertight surface
/// instead of being left open at the domain edge.
pub fn extract_surface(field: &[f32], iso_level: f32, grid: &VoxelGrid) -> Result<TriangleMesh> {
    let r = grid.resolution();
    if field.len() != grid.cell_count() {
        return Err(Error::InvalidInput(format!(
            "field has {} samples, grid expects {}",
            field.len(),
            grid.cell_count()
        )));
    }

    let pd = r + 2;
    let mut padded = vec![0.0_f32; pd * pd * pd];
    for i in 0..r {
        for j in 0..r {
            let src = grid.linear_index(i, j, 0);
            let dst = ((i + 1) * pd + (j + 1)) * pd + 1;
            padded[dst..dst + r].copy_from_slice(&field[src..src + r]);
        }
    }

    let mut mesh = marching_cubes(&padded, iso_level, pd, pd, pd)?;
    for v in &mut mesh.vertices {
        *v = grid.index_to_world(Point3::new(v.x - 1.0, v.y - 1.0, v.z - 1.0));
    }
    Ok(mesh)
}

/// Field sample layout: `(i * ny + j) * nz + k`.
#[inline]
fn node_index(i: usize, j: usize, k: usize, size: &[usize; 3]) -> usize {
    (i * size[1] + j) * size[2] + k
}

/// Slab slot layout: `nx * ny * (k % 2) + j * nx + i`.
#[inline]
fn slab_index(i: usize, j: usize, k: usize, size: &[usize; 3]) -> usize {
    size[0] * size[1] * (k % 2) + j * size[0] + i
}

/// Mutable view of the per-cell edge state while one cell is processed.
struct CellEdges<'a> {
    slab_inds: &'a mut [[u32; 3]],
    vertices: &'a mut Vec<Point3<f32>>,
    normals: &'a mut Vec<Vector3<f32>>,
    size: &'a [usize; 3],
}

impl CellEdges<'_> {
    /// Place an interpolated vertex on the edge `(x, y, z)`..`+axis` when the
    /// field changes sign across it, and record its index in the slab.
    #[inline]
    fn compute(&mut self, va: f32, vb: f32, axis: usize, x: usize, y: usize, z: usize) {
        if (va < 0.0) == (vb < 0.0) {
            return;
        }
        let mut v = Point3::new(x as f32, y as f32, z as f32);
        v[axis] += va / (va - vb);
        let idx = self.vertices.len() as u32;
        self.slab_inds[slab_index(x, y, z, self.size)][axis] = idx;
        self.vertices.push(v);
        self.normals.push(Vector3::zeros());
    }
}

/// Add the geometric normal of triangle `(a, b, c)` to all three vertices.
#[inline]
fn accumulate_normal(
    vertices: &[Point3<f32>],
    normals: &mut [Vector3<f32>],
    a: u32,
    b: u32,
    c: u32,
) {
    let va = vertices[a as usize];
    let vb = vertices[b as usize];
    let vc = vertices[c as usize];
    let ab = va - vb;
    let cb = vc - vb;
    let n = cb.cross(&ab);
    normals[a as usize] += n;
    normals[b as usize] += n;
    normals[c as usize] += n;
}

/// Triangle configuration table, one `u64` per cube configuration.
///
/// Bits `[3:0]` hold the triangle count (0-5); each following nibble is an
/// edge index (0-11) for one triangle vertex.
#[rustfmt::skip]
static MC_TRIS: [u64; 256] = [
    0, 33793, 36945, 159668546,
    18961, 144771090, 5851666, 595283255635,
    20913, 67640146, 193993474, 655980856339,
    88782242, 736732689667, 797430812739, 194554754,
    26657, 104867330, 136709522, 298069416227,
    109224258, 8877909667, 318136408323, 1567994331701604,
    189884450, 350847647843, 559958167731, 3256298596865604,
    447393122899, 651646838401572, 2538311371089956, 737032694307,
    29329, 43484162, 91358498, 374810899075,
    158485010, 178117478419, 88675058979, 433581536604804,
    158486962, 649105605635, 4866906995, 3220959471609924,
    649165714851, 3184943915608436, 570691368417972, 595804498035,
    124295042, 431498018963, 508238522371, 91518530,
    318240155763, 291789778348404, 1830001131721892, 375363605923,
    777781811075, 1136111028516116, 3097834205243396, 508001629971,
    2663607373704004, 680242583802939237, 333380770766129845, 179746658,
    42545, 138437538, 93365810, 713842853011,
    73602098, 69575510115, 23964357683, 868078761575828,
    28681778, 713778574611, 250912709379, 2323825233181284,
    302080811955, 3184439127991172, 1694042660682596, 796909779811,
    176306722, 150327278147, 619854856867, 1005252473234484,
    211025400963, 36712706, 360743481544788, 150627258963,
    117482600995, 1024968212107700, 2535169275963444, 4734473194086550421,
    628107696687956, 9399128243, 5198438490361643573, 194220594,
    104474994, 566996932387, 427920028243, 2014821863433780,
    492093858627, 147361150235284, 2005882975110676, 9671606099636618005,
    777701008947, 3185463219618820, 482784926917540, 2900953068249785909,
    1754182023747364, 4274848857537943333, 13198752741767688709, 2015093490989156,
    591272318771, 2659758091419812, 1531044293118596, 298306479155,
    408509245114388, 210504348563, 9248164405801223541, 91321106,
    2660352816454484, 680170263324308757, 8333659837799955077, 482966828984116,
    4274926723105633605, 3184439197724820, 192104450, 15217,
    45937, 129205250, 129208402, 529245952323,
    169097138, 770695537027, 382310500883, 2838550742137652,
    122763026, 277045793139, 81608128403, 1991870397907988,
    362778151475, 2059003085103236, 2132572377842852, 655681091891,
    58419234, 239280858627, 529092143139, 1568257451898804,
    447235128115, 679678845236084, 2167161349491220, 1554184567314086709,
    165479003923, 1428768988226596, 977710670185060, 10550024711307499077,
    1305410032576132, 11779770265620358997, 333446212255967269, 978168444447012,
    162736434, 35596216627, 138295313843, 891861543990356,
    692616541075, 3151866750863876, 100103641866564, 6572336607016932133,
    215036012883, 726936420696196, 52433666, 82160664963,
    2588613720361524, 5802089162353039525, 214799000387, 144876322,
    668013605731, 110616894681956, 1601657732871812, 430945547955,
    3156382366321172, 7644494644932993285, 3928124806469601813, 3155990846772900,
    339991010498708, 10743689387941597493, 5103845475, 105070898,
    3928064910068824213, 156265010, 1305138421793636, 27185,
    195459938, 567044449971, 382447549283, 2175279159592324,
    443529919251, 195059004769796, 2165424908404116, 1554158691063110021,
    504228368803, 1436350466655236, 27584723588724, 1900945754488837749,
    122971970, 443829749251, 302601798803, 108558722,
    724700725875, 43570095105972, 2295263717447940, 2860446751369014181,
    2165106202149444, 69275726195, 2860543885641537797, 2165106320445780,
    2280890014640004, 11820349930268368933, 8721082628082003989, 127050770,
    503707084675, 122834978, 2538193642857604, 10129,
    801441490467, 2923200302876740, 1443359556281892, 2901063790822564949,
    2728339631923524, 7103874718248233397, 12775311047932294245, 95520290,
    2623783208098404, 1900908618382410757, 137742672547, 2323440239468964,
    362478212387, 727199575803140, 73425410, 34337,
    163101314, 668566030659, 801204361987, 73030562,
    591509145619, 162574594, 100608342969108, 5553,
    724147968595, 1436604830452292, 176259090, 42001,
    143955266, 2385, 18433, 0,
];
