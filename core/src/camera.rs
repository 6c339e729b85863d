use crate::{Error, Result};
use nalgebra::{Matrix3, Matrix3x4, Vector3};

/// Pinhole camera intrinsics shared by every view of a capture.
#[derive(Debug, Clone, Copy)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Result<Self> {
        if fx <= 0.0 || fy <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "focal lengths must be positive, got fx={fx}, fy={fy}"
            )));
        }
        if cx < 0.0 || cx >= width as f64 || cy < 0.0 || cy >= height as f64 {
            return Err(Error::InvalidConfig(format!(
                "principal point ({cx}, {cy}) outside {width}x{height} image"
            )));
        }
        Ok(Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        })
    }

    /// Derive intrinsics from a physical lens: focal length and sensor size in
    /// millimetres, image resolution in pixels. The principal point is the
    /// image centre.
    pub fn from_sensor(
        focal_mm: f64,
        sensor_width_mm: f64,
        sensor_height_mm: f64,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if sensor_width_mm <= 0.0 || sensor_height_mm <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sensor dimensions must be positive, got {sensor_width_mm}x{sensor_height_mm} mm"
            )));
        }
        Self::new(
            focal_mm * width as f64 / sensor_width_mm,
            focal_mm * height as f64 / sensor_height_mm,
            width as f64 / 2.0,
            height as f64 / 2.0,
            width,
            height,
        )
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }
}

/// One turntable pose: azimuth around the vertical axis and tilt above the
/// turntable plane, both in degrees. The camera sits on a sphere of fixed
/// radius and looks at the world origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurntablePose {
    pub azimuth_deg: f64,
    pub tilt_deg: f64,
}

impl TurntablePose {
    pub fn new(azimuth_deg: f64, tilt_deg: f64) -> Self {
        Self {
            azimuth_deg,
            tilt_deg,
        }
    }

    /// Camera centre in world coordinates for a given sphere radius.
    ///
    /// Azimuth 0 places the camera on the +Y axis; Z is world-up. The sign of
    /// this expression is a fixed project-wide convention and must match the
    /// rig that produced the masks.
    pub fn camera_center(&self, distance: f64) -> Vector3<f64> {
        let theta = self.azimuth_deg.to_radians();
        let phi = self.tilt_deg.to_radians();
        distance * Vector3::new(phi.cos() * theta.sin(), phi.cos() * theta.cos(), phi.sin())
    }
}

/// Enumerate the Cartesian product of tilt and azimuth sweeps, tilt outer and
/// azimuth inner. This order is the contract the mask files must follow.
pub fn pose_sweep(azimuths_deg: &[f64], tilts_deg: &[f64]) -> Vec<TurntablePose> {
    let mut poses = Vec::with_capacity(azimuths_deg.len() * tilts_deg.len());
    for &tilt in tilts_deg {
        for &azimuth in azimuths_deg {
            poses.push(TurntablePose::new(azimuth, tilt));
        }
    }
    poses
}

/// Build the projection matrix `P = K [R | t]` for one pose.
///
/// Look-at construction: forward points from the camera centre to the origin,
/// world-up is +Z, and `right`/`up`/`forward` form the rows of an orthonormal
/// world-to-camera rotation with forward as the camera z-axis, so depth is
/// positive for points in front of the camera.
///
/// Fails with [`Error::DegeneratePose`] when the camera direction is parallel
/// to world-up (tilt at ±90°), where the right vector is undefined.
pub fn projection_matrix(
    pose: &TurntablePose,
    distance: f64,
    intrinsics: &Intrinsics,
) -> Result<Matrix3x4<f64>> {
    if distance <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "camera distance must be positive, got {distance}"
        )));
    }

    let center = pose.camera_center(distance);
    let forward = (-center).normalize();
    let world_up = Vector3::z();

    let right = world_up.cross(&forward);
    let right_norm = right.norm();
    if right_norm < 1e-9 {
        return Err(Error::DegeneratePose(format!(
            "tilt {}° points the camera along world-up; right vector undefined",
            pose.tilt_deg
        )));
    }
    let right = right / right_norm;
    let up = forward.cross(&right);

    let rotation = Matrix3::from_rows(&[right.transpose(), up.transpose(), forward.transpose()]);
    let translation = -rotation * center;

    let mut extrinsics = Matrix3x4::zeros();
    extrinsics.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    extrinsics.set_column(3, &translation);

    Ok(intrinsics.matrix() * extrinsics)
}
