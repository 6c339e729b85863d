pub use carve_3d as carving;
pub use carve_core as core;
pub use carve_imgproc as imgproc;
pub use carve_io as io;
pub use carve_pipeline as pipeline;

/// Initialize a single global Rayon thread pool for all CPU-parallel routines.
///
/// Call this once at application startup before carving large volumes.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `CARVE_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    carve_core::init_global_thread_pool(num_threads)
}
