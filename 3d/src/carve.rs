//! Silhouette carving engines.
//!
//! Two accumulation modes over the same projection test:
//! - binary carving: a voxel survives only while every processed view
//!   confirms it as foreground (AND-reduction; a single empty mask can
//!   destroy the whole reconstruction, and that fragility is intentional);
//! - vote carving: each view that confirms a voxel adds one vote, and the
//!   caller thresholds the counts afterwards. Votes commute, so view order
//!   does not matter in this mode.
//!
//! In both modes a voxel behind the camera (`w <= 0`) or projecting outside
//! the frame contributes no evidence for that view.

use crate::voxel::VoxelGrid;
use image::GrayImage;
use nalgebra::{Matrix3x4, Vector4};
use rayon::prelude::*;

/// Project one voxel centre through `p` and test the silhouette.
///
/// Returns true only when the voxel lands in front of the camera, inside the
/// frame, and on a foreground pixel.
#[inline]
fn supported(grid: &VoxelGrid, index: usize, p: &Matrix3x4<f64>, mask: &GrayImage) -> bool {
    let (i, j, k) = grid.cell_coords(index);
    let c = grid.cell_center(i, j, k);
    let proj = p * Vector4::new(c.x as f64, c.y as f64, c.z as f64, 1.0);

    let w = proj[2];
    if w <= 0.0 {
        return false;
    }

    let u = (proj[0] / w).round();
    let v = (proj[1] / w).round();
    if u < 0.0 || v < 0.0 || u >= mask.width() as f64 || v >= mask.height() as f64 {
        return false;
    }

    mask.get_pixel(u as u32, v as u32)[0] > 0
}

/// Binary occupancy state: every cell starts solid and is only ever cleared.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    grid: VoxelGrid,
    alive: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(grid: VoxelGrid) -> Self {
        let alive = vec![true; grid.cell_count()];
        Self { grid, alive }
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Apply one view: clear every voxel this view does not confirm.
    ///
    /// Parallel over disjoint slices of the flat index space; no voxel is
    /// touched by two workers.
    pub fn carve_view(&mut self, p: &Matrix3x4<f64>, mask: &GrayImage) {
        let grid = &self.grid;
        self.alive
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, alive)| {
                if *alive && !supported(grid, index, p, mask) {
                    *alive = false;
                }
            });
    }

    pub fn solid_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// True once every voxel is carved away; further views cannot change the
    /// result and processing may stop early.
    pub fn is_exhausted(&self) -> bool {
        !self.alive.iter().any(|&a| a)
    }

    pub fn is_solid(&self, i: usize, j: usize, k: usize) -> bool {
        self.alive[self.grid.linear_index(i, j, k)]
    }

    /// Occupancy as a 0/1 scalar field in grid iteration order.
    pub fn occupancy_field(&self) -> Vec<f32> {
        self.alive
            .iter()
            .map(|&a| if a { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Soft carving state: per-voxel support counts, only ever incremented.
#[derive(Debug, Clone)]
pub struct VoteGrid {
    grid: VoxelGrid,
    votes: Vec<u32>,
    views_applied: u32,
}

impl VoteGrid {
    pub fn new(grid: VoxelGrid) -> Self {
        let votes = vec![0u32; grid.cell_count()];
        Self {
            grid,
            votes,
            views_applied: 0,
        }
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Apply one view: every voxel this view confirms gains one vote.
    pub fn vote_view(&mut self, p: &Matrix3x4<f64>, mask: &GrayImage) {
        let grid = &self.grid;
        self.votes
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, votes)| {
                if supported(grid, index, p, mask) {
                    *votes += 1;
                }
            });
        self.views_applied += 1;
    }

    /// Number of views that have contributed evidence so far.
    pub fn views_applied(&self) -> u32 {
        self.views_applied
    }

    pub fn votes(&self) -> &[u32] {
        &self.votes
    }

    /// Threshold the counts into a 0/1 scalar field: a voxel is solid iff it
    /// collected at least `ceil(fraction * views_applied)` votes.
    pub fn threshold_field(&self, fraction: f32) -> Vec<f32> {
        let threshold = vote_threshold(fraction, self.views_applied);
        self.votes
            .iter()
            .map(|&v| if v >= threshold { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Minimum vote count for a voxel to be considered solid.
///
/// `fraction` is the required share of views that actually contributed
/// evidence; 1.0 demands unanimous support. Always at least 1, so an
/// unvoted voxel never passes.
pub fn vote_threshold(fraction: f32, views_applied: u32) -> u32 {
    let fraction = fraction.clamp(0.0, 1.0);
    ((fraction * views_applied as f32).ceil() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_core::{projection_matrix, Intrinsics, TurntablePose};
    use image::Luma;

    fn small_intrinsics() -> Intrinsics {
        Intrinsics::from_sensor(35.0, 36.0, 24.0, 220, 146).unwrap()
    }

    fn full_mask(k: &Intrinsics) -> GrayImage {
        GrayImage::from_pixel(k.width, k.height, Luma([255]))
    }

    #[test]
    fn full_mask_carves_nothing_inside_frustum() {
        let k = small_intrinsics();
        let grid = VoxelGrid::new(8, 50.0).unwrap();
        let mut occ = OccupancyGrid::new(grid);
        let p = projection_matrix(&TurntablePose::new(0.0, 0.0), 400.0, &k).unwrap();

        occ.carve_view(&p, &full_mask(&k));
        // A small grid near the origin stays fully inside a frame centred on
        // the look-at target.
        assert_eq!(occ.solid_count(), occ.grid().cell_count());
    }

    #[test]
    fn empty_mask_empties_grid_permanently() {
        let k = small_intrinsics();
        let grid = VoxelGrid::new(8, 50.0).unwrap();
        let mut occ = OccupancyGrid::new(grid);
        let empty = GrayImage::new(k.width, k.height);
        let p = projection_matrix(&TurntablePose::new(0.0, 0.0), 400.0, &k).unwrap();

        occ.carve_view(&p, &empty);
        assert!(occ.is_exhausted());

        // Subsequent full views cannot resurrect anything.
        occ.carve_view(&p, &full_mask(&k));
        assert_eq!(occ.solid_count(), 0);
    }

    #[test]
    fn votes_count_supporting_views() {
        let k = small_intrinsics();
        let grid = VoxelGrid::new(8, 50.0).unwrap();
        let mut votes = VoteGrid::new(grid);
        let p = projection_matrix(&TurntablePose::new(0.0, 0.0), 400.0, &k).unwrap();
        let empty = GrayImage::new(k.width, k.height);

        votes.vote_view(&p, &full_mask(&k));
        votes.vote_view(&p, &empty);
        votes.vote_view(&p, &full_mask(&k));

        assert_eq!(votes.views_applied(), 3);
        assert!(votes.votes().iter().all(|&v| v == 2));
    }

    #[test]
    fn vote_threshold_is_never_zero() {
        assert_eq!(vote_threshold(1.0, 0), 1);
        assert_eq!(vote_threshold(0.0, 24), 1);
        assert_eq!(vote_threshold(1.0, 24), 24);
        assert_eq!(vote_threshold(0.5, 24), 12);
        assert_eq!(vote_threshold(0.7, 10), 7);
    }

    #[test]
    fn behind_camera_voxels_are_not_supported() {
        let k = small_intrinsics();
        // Extent far larger than the camera distance, so part of the grid
        // sits behind the camera.
        let grid = VoxelGrid::new(9, 1200.0).unwrap();
        let mut occ = OccupancyGrid::new(grid);
        let p = projection_matrix(&TurntablePose::new(0.0, 0.0), 400.0, &k).unwrap();

        occ.carve_view(&p, &full_mask(&k));
        // Camera sits on +Y at 400; cells at y = +600 are behind it.
        assert!(!occ.is_solid(4, 8, 4));
        assert!(occ.is_solid(4, 4, 4));
    }
}
