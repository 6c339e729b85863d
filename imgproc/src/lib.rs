//! Silhouette mask preprocessing.

pub mod silhouette;

pub use silhouette::*;
