//! View planning: pairing poses with mask files.
//!
//! Mask files are discovered, filtered to the configured extension and
//! sorted lexicographically; that order is the contract with the capture
//! rig and must match the pose enumeration order. Pairing happens once,
//! explicitly, before any carving, so a count mismatch is visible up front
//! instead of surfacing as a silently wrong reconstruction.

use crate::config::CarveConfig;
use carve_core::{Result, TurntablePose};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One planned view: a pose and the mask file that belongs to it.
#[derive(Debug, Clone)]
pub struct ViewPlan {
    pub pose: TurntablePose,
    pub mask_path: PathBuf,
}

/// Sorted mask files under `dir` with the configured extension, minus the
/// configured number of leading files.
fn mask_files(dir: &Path, config: &CarveConfig) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&config.mask_extension))
        })
        .collect();
    files.sort();
    Ok(files.split_off(files.len().min(config.skip)))
}

/// Pair the configured pose sweep with the mask files in `dir`, positionally.
///
/// When the counts differ the shorter sequence wins and the excess is
/// dropped with a warning; that usually means the capture and the sweep
/// configuration disagree.
pub fn plan_views(dir: &Path, config: &CarveConfig) -> Result<Vec<ViewPlan>> {
    let poses = config.poses();
    let files = mask_files(dir, config)?;

    if poses.len() != files.len() {
        warn!(
            poses = poses.len(),
            masks = files.len(),
            "pose/mask count mismatch, processing the shorter sequence"
        );
    }

    Ok(poses
        .into_iter()
        .zip(files)
        .map(|(pose, mask_path)| ViewPlan { pose, mask_path })
        .collect())
}
