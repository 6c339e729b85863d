//! Voxel-space reconstruction: the grid, the carving engines and the
//! marching-cubes surface extractor.

pub mod carve;
pub mod marching_cubes;
pub mod mesh;
pub mod voxel;

pub use carve::{vote_threshold, OccupancyGrid, VoteGrid};
pub use marching_cubes::{extract_surface, marching_cubes};
pub use mesh::TriangleMesh;
pub use voxel::VoxelGrid;

pub use carve_core::{Error, Result};
