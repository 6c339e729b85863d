//! Run configuration.
//!
//! Everything a reconstruction run needs lives in one explicit struct; there
//! are no process-wide tunables. Defaults match the turntable rig the
//! pipeline was built around: a 35 mm lens on a full-frame sensor, camera
//! 400 units from the subject, a 200-unit world cube and a 15° azimuth sweep.

use carve_core::{pose_sweep, Error, Intrinsics, Result, TurntablePose};

/// How per-view evidence is accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarveMode {
    /// AND-reduction: one unsupporting view removes a voxel for good.
    Binary,
    /// Per-voxel vote counts, thresholded after the last view.
    Vote,
}

/// Half-open sweep `start..stop` in `step`-degree increments.
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    pub start_deg: f64,
    pub stop_deg: f64,
    pub step_deg: f64,
}

impl SweepConfig {
    pub fn new(start_deg: f64, stop_deg: f64, step_deg: f64) -> Self {
        Self {
            start_deg,
            stop_deg,
            step_deg,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        let mut out = Vec::new();
        if self.step_deg <= 0.0 {
            return out;
        }
        let mut v = self.start_deg;
        while v < self.stop_deg {
            out.push(v);
            v += self.step_deg;
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct CarveConfig {
    /// Voxel lattice resolution per axis.
    pub resolution: usize,
    /// World cube edge length.
    pub extent: f32,
    /// Camera distance from the origin.
    pub distance: f64,
    pub focal_mm: f64,
    pub sensor_width_mm: f64,
    pub sensor_height_mm: f64,
    pub image_width: u32,
    pub image_height: u32,
    pub azimuth: SweepConfig,
    /// Tilt angles, one full azimuth sweep per entry.
    pub tilts_deg: Vec<f64>,
    pub mode: CarveMode,
    /// Share of contributing views a voxel must satisfy in vote mode.
    pub vote_fraction: f32,
    pub iso_level: f32,
    /// Gray value the raw captures use for the backdrop.
    pub background_label: u8,
    /// Mask files are filtered to this extension before sorting.
    pub mask_extension: String,
    /// Leading mask files to drop after sorting.
    pub skip: usize,
}

impl Default for CarveConfig {
    fn default() -> Self {
        Self {
            resolution: 128,
            extent: 200.0,
            distance: 400.0,
            focal_mm: 35.0,
            sensor_width_mm: 36.0,
            sensor_height_mm: 24.0,
            image_width: 1100,
            image_height: 733,
            azimuth: SweepConfig::new(0.0, 360.0, 15.0),
            tilts_deg: vec![0.0],
            mode: CarveMode::Binary,
            vote_fraction: 1.0,
            iso_level: 0.5,
            background_label: 255,
            mask_extension: "png".to_string(),
            skip: 0,
        }
    }
}

impl CarveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tilts_deg.is_empty() {
            return Err(Error::InvalidConfig("tilt list is empty".to_string()));
        }
        if self.azimuth.values().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "azimuth sweep {:?} yields no poses",
                self.azimuth
            )));
        }
        if !(0.0..=1.0).contains(&self.vote_fraction) {
            return Err(Error::InvalidConfig(format!(
                "vote fraction must be in [0, 1], got {}",
                self.vote_fraction
            )));
        }
        self.intrinsics().map(|_| ())
    }

    pub fn intrinsics(&self) -> Result<Intrinsics> {
        Intrinsics::from_sensor(
            self.focal_mm,
            self.sensor_width_mm,
            self.sensor_height_mm,
            self.image_width,
            self.image_height,
        )
    }

    /// All poses of the run, tilt outer and azimuth inner.
    pub fn poses(&self) -> Vec<TurntablePose> {
        pose_sweep(&self.azimuth.values(), &self.tilts_deg)
    }
}
