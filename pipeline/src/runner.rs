//! The batch carving loop.
//!
//! Views are processed strictly in plan order. Per-view faults (unreadable
//! mask, wrong dimensions, degenerate pose) skip that view and carry on;
//! they withhold evidence rather than supplying an empty silhouette, which
//! in binary mode is the difference between a survivable hiccup and a
//! destroyed reconstruction.

use crate::config::{CarveConfig, CarveMode};
use crate::views::{plan_views, ViewPlan};
use carve_3d::{extract_surface, OccupancyGrid, TriangleMesh, VoteGrid, VoxelGrid};
use carve_core::{projection_matrix, Intrinsics, Result};
use carve_imgproc::clean_silhouette;
use image::GrayImage;
use nalgebra::Matrix3x4;
use std::path::Path;
use tracing::{debug, info, warn};

/// Summary of one reconstruction run.
#[derive(Debug, Clone)]
pub struct CarveReport {
    pub views_planned: usize,
    pub views_applied: usize,
    pub views_skipped: usize,
    /// Whether binary carving stopped before the last view on an empty grid.
    pub early_exit: bool,
    pub solid_voxels: usize,
}

fn view_projection(plan: &ViewPlan, config: &CarveConfig, k: &Intrinsics) -> Option<Matrix3x4<f64>> {
    match projection_matrix(&plan.pose, config.distance, k) {
        Ok(p) => Some(p),
        Err(err) => {
            warn!(pose = ?plan.pose, %err, "skipping view with unusable pose");
            None
        }
    }
}

/// Load and clean one mask, lazily per view. Decode failures and dimension
/// mismatches skip the view.
fn load_mask(plan: &ViewPlan, config: &CarveConfig, k: &Intrinsics) -> Option<GrayImage> {
    let raw = match image::open(&plan.mask_path) {
        Ok(img) => img.to_luma8(),
        Err(err) => {
            warn!(path = %plan.mask_path.display(), %err, "skipping unreadable mask");
            return None;
        }
    };
    if raw.width() != k.width || raw.height() != k.height {
        warn!(
            path = %plan.mask_path.display(),
            width = raw.width(),
            height = raw.height(),
            expected_width = k.width,
            expected_height = k.height,
            "skipping mask with unexpected dimensions"
        );
        return None;
    }
    Some(clean_silhouette(&raw, config.background_label))
}

/// Run a full reconstruction over the masks in `mask_dir`.
///
/// Returns the extracted surface and a run report. An empty mesh is a valid
/// outcome, not an error.
pub fn run(config: &CarveConfig, mask_dir: &Path) -> Result<(TriangleMesh, CarveReport)> {
    config.validate()?;
    let k = config.intrinsics()?;
    let grid = VoxelGrid::new(config.resolution, config.extent)?;
    let plans = plan_views(mask_dir, config)?;

    let mut report = CarveReport {
        views_planned: plans.len(),
        views_applied: 0,
        views_skipped: 0,
        early_exit: false,
        solid_voxels: 0,
    };

    let field = match config.mode {
        CarveMode::Binary => {
            let mut occ = OccupancyGrid::new(grid.clone());
            for plan in &plans {
                let (Some(p), Some(mask)) = (
                    view_projection(plan, config, &k),
                    load_mask(plan, config, &k),
                ) else {
                    report.views_skipped += 1;
                    continue;
                };
                occ.carve_view(&p, &mask);
                report.views_applied += 1;
                debug!(
                    view = report.views_applied,
                    solid = occ.solid_count(),
                    "carved view"
                );
                if occ.is_exhausted() {
                    info!("all voxels carved away, stopping early");
                    report.early_exit = true;
                    break;
                }
            }
            report.solid_voxels = occ.solid_count();
            occ.occupancy_field()
        }
        CarveMode::Vote => {
            let mut votes = VoteGrid::new(grid.clone());
            for plan in &plans {
                let (Some(p), Some(mask)) = (
                    view_projection(plan, config, &k),
                    load_mask(plan, config, &k),
                ) else {
                    report.views_skipped += 1;
                    continue;
                };
                votes.vote_view(&p, &mask);
                report.views_applied += 1;
                debug!(view = report.views_applied, "voted view");
            }
            let field = votes.threshold_field(config.vote_fraction);
            report.solid_voxels = field.iter().filter(|&&v| v > 0.0).count();
            field
        }
    };

    let mesh = extract_surface(&field, config.iso_level, &grid)?;
    if mesh.is_empty() {
        info!("no consistent solid found, mesh is empty");
    } else {
        info!(
            solid_voxels = report.solid_voxels,
            triangles = mesh.num_faces(),
            "surface extracted"
        );
    }

    Ok((mesh, report))
}
