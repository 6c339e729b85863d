//! Batch turntable reconstruction.
//!
//! Wires the camera model, silhouette cleanup, carving engines and surface
//! extraction into a single run over a directory of mask images.

pub mod config;
pub mod runner;
pub mod views;

pub use config::{CarveConfig, CarveMode, SweepConfig};
pub use runner::{run, CarveReport};
pub use views::{plan_views, ViewPlan};

pub use carve_core::{Error, Result};
