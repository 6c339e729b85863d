//! `carve` command line: silhouette masks in, STL out.

use carve_io::{save_stl, StlFormat};
use carve_pipeline::{run, CarveConfig, CarveMode, SweepConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Binary,
    Vote,
}

#[derive(Debug, Parser)]
#[command(name = "carve", about = "Turntable shape-from-silhouette reconstruction")]
struct Cli {
    /// Directory of silhouette mask images
    mask_dir: PathBuf,

    /// Output STL path
    #[arg(short, long)]
    output: PathBuf,

    /// Voxel resolution per axis
    #[arg(long, default_value_t = 128)]
    resolution: usize,

    /// World cube edge length
    #[arg(long, default_value_t = 200.0)]
    extent: f32,

    /// Camera distance from the origin
    #[arg(long, default_value_t = 400.0)]
    distance: f64,

    /// Lens focal length in millimetres
    #[arg(long, default_value_t = 35.0)]
    focal: f64,

    /// Sensor width in millimetres
    #[arg(long, default_value_t = 36.0)]
    sensor_width: f64,

    /// Sensor height in millimetres
    #[arg(long, default_value_t = 24.0)]
    sensor_height: f64,

    /// Mask image width in pixels
    #[arg(long, default_value_t = 1100)]
    image_width: u32,

    /// Mask image height in pixels
    #[arg(long, default_value_t = 733)]
    image_height: u32,

    /// Azimuth sweep start, degrees
    #[arg(long, default_value_t = 0.0)]
    azimuth_start: f64,

    /// Azimuth sweep stop (exclusive), degrees
    #[arg(long, default_value_t = 360.0)]
    azimuth_stop: f64,

    /// Azimuth sweep step, degrees
    #[arg(long, default_value_t = 15.0)]
    azimuth_step: f64,

    /// Tilt angle in degrees; repeat for multiple tilt rings
    #[arg(long = "tilt", default_values_t = [0.0])]
    tilts: Vec<f64>,

    /// Evidence accumulation mode
    #[arg(long, value_enum, default_value_t = ModeArg::Binary)]
    mode: ModeArg,

    /// Required share of contributing views per voxel (vote mode)
    #[arg(long, default_value_t = 1.0)]
    vote_fraction: f32,

    /// Isosurface level for surface extraction
    #[arg(long, default_value_t = 0.5)]
    iso_level: f32,

    /// Gray value of the backdrop in raw masks
    #[arg(long, default_value_t = 255)]
    background: u8,

    /// Mask file extension
    #[arg(long, default_value = "png")]
    extension: String,

    /// Leading mask files to drop after sorting
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Write ASCII STL instead of binary
    #[arg(long)]
    ascii: bool,

    /// Worker threads for the carving passes (default: all cores)
    #[arg(long)]
    threads: Option<usize>,
}

impl Cli {
    fn config(&self) -> CarveConfig {
        CarveConfig {
            resolution: self.resolution,
            extent: self.extent,
            distance: self.distance,
            focal_mm: self.focal,
            sensor_width_mm: self.sensor_width,
            sensor_height_mm: self.sensor_height,
            image_width: self.image_width,
            image_height: self.image_height,
            azimuth: SweepConfig::new(self.azimuth_start, self.azimuth_stop, self.azimuth_step),
            tilts_deg: self.tilts.clone(),
            mode: match self.mode {
                ModeArg::Binary => CarveMode::Binary,
                ModeArg::Vote => CarveMode::Vote,
            },
            vote_fraction: self.vote_fraction,
            iso_level: self.iso_level,
            background_label: self.background,
            mask_extension: self.extension.clone(),
            skip: self.skip,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(err) = carve_core::init_global_thread_pool(cli.threads) {
        error!(%err, "failed to configure the thread pool");
        return ExitCode::FAILURE;
    }

    let config = cli.config();
    let (mesh, report) = match run(&config, &cli.mask_dir) {
        Ok(out) => out,
        Err(err) => {
            error!(%err, "reconstruction failed");
            return ExitCode::FAILURE;
        }
    };

    info!(
        planned = report.views_planned,
        applied = report.views_applied,
        skipped = report.views_skipped,
        solid_voxels = report.solid_voxels,
        "carving finished"
    );

    let format = if cli.ascii {
        StlFormat::Ascii
    } else {
        StlFormat::Binary
    };
    if let Err(err) = save_stl(&cli.output, &mesh, format) {
        error!(path = %cli.output.display(), %err, "failed to write mesh");
        return ExitCode::FAILURE;
    }

    info!(path = %cli.output.display(), triangles = mesh.num_faces(), "mesh written");
    ExitCode::SUCCESS
}
