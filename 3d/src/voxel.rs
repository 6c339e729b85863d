//! Fixed-resolution voxel lattice over a cubic world-space region.

use crate::{Error, Result};
use nalgebra::Point3;

/// An `R x R x R` lattice of sample points spanning `[-extent/2, extent/2]^3`.
///
/// The grid owns no occupancy state, only geometry: axis coordinates are
/// computed once at construction and every cell centre derives from them.
/// Flat indices and `(i, j, k)` coordinates are a fixed bijection with layout
/// `(i * R + j) * R + k`; the carving engines and the surface extractor both
/// rely on this exact order.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    resolution: usize,
    extent: f32,
    axis: Vec<f32>,
}

impl VoxelGrid {
    pub fn new(resolution: usize, extent: f32) -> Result<Self> {
        if resolution < 2 {
            return Err(Error::InvalidConfig(format!(
                "voxel resolution must be at least 2, got {resolution}"
            )));
        }
        if !(extent > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "world extent must be positive, got {extent}"
            )));
        }

        let half = extent / 2.0;
        let step = extent / (resolution - 1) as f32;
        let axis = (0..resolution).map(|i| -half + step * i as f32).collect();

        Ok(Self {
            resolution,
            extent,
            axis,
        })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    /// Total number of cells, `R^3`.
    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution * self.resolution
    }

    #[inline]
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.resolution && j < self.resolution && k < self.resolution);
        (i * self.resolution + j) * self.resolution + k
    }

    #[inline]
    pub fn cell_coords(&self, index: usize) -> (usize, usize, usize) {
        debug_assert!(index < self.cell_count());
        let k = index % self.resolution;
        let j = (index / self.resolution) % self.resolution;
        let i = index / (self.resolution * self.resolution);
        (i, j, k)
    }

    /// World-space centre of cell `(i, j, k)`.
    #[inline]
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> Point3<f32> {
        Point3::new(self.axis[i], self.axis[j], self.axis[k])
    }

    /// Map a point in voxel-index space (as produced by marching cubes) back
    /// into world coordinates: `world = (index / R) * extent - extent / 2`.
    #[inline]
    pub fn index_to_world(&self, p: Point3<f32>) -> Point3<f32> {
        let r = self.resolution as f32;
        let half = self.extent / 2.0;
        Point3::new(
            (p.x / r) * self.extent - half,
            (p.y / r) * self.extent - half,
            (p.z / r) * self.extent - half,
        )
    }
}
