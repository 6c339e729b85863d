//! Mesh file I/O.
//!
//! STL (STereoLithography) in both ASCII and binary flavours, the output
//! format of the carving pipeline.

pub mod stl;

pub use stl::{read_stl, save_stl, write_stl_ascii, write_stl_binary, StlFormat};

pub use carve_core::{Error, Result};
