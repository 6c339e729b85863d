//! End-to-end runs over synthetic mask directories.

use carve_io::{save_stl, StlFormat};
use carve_pipeline::{run, CarveConfig, CarveMode, SweepConfig};
use image::{GrayImage, Luma};
use std::path::Path;

/// Raw capture: backdrop at 255, subject disk at an arbitrary gray value.
fn write_disk_mask(path: &Path, width: u32, height: u32, radius: f64) {
    let mut img = GrayImage::from_pixel(width, height, Luma([255]));
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            if (dx * dx + dy * dy).sqrt() <= radius {
                img.put_pixel(x, y, Luma([30]));
            }
        }
    }
    img.save(path).unwrap();
}

fn small_config() -> CarveConfig {
    CarveConfig {
        resolution: 32,
        image_width: 220,
        image_height: 146,
        azimuth: SweepConfig::new(0.0, 360.0, 90.0),
        ..CarveConfig::default()
    }
}

#[test]
fn end_to_end_binary_reconstruction() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..24 {
        write_disk_mask(&dir.path().join(format!("view_{i:02}.png")), 1100, 733, 200.0);
    }

    let config = CarveConfig {
        resolution: 64,
        ..CarveConfig::default()
    };
    let (mesh, report) = run(&config, dir.path()).unwrap();

    assert_eq!(report.views_planned, 24);
    assert_eq!(report.views_applied, 24);
    assert_eq!(report.views_skipped, 0);
    assert!(!report.early_exit);
    assert!(report.solid_voxels > 0);
    assert!(report.solid_voxels < 64 * 64 * 64, "carve must remove something");
    assert!(mesh.num_faces() > 0);

    // The reconstruction stays inside the world cube.
    let (min, max) = mesh.bounds();
    for c in [min.x, min.y, min.z, max.x, max.y, max.z] {
        assert!(c.abs() <= 100.0);
    }
}

#[test]
fn vote_mode_matches_binary_on_clean_input() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..4 {
        write_disk_mask(&dir.path().join(format!("v{i}.png")), 220, 146, 40.0);
    }

    let binary = small_config();
    let vote = CarveConfig {
        mode: CarveMode::Vote,
        vote_fraction: 1.0,
        ..small_config()
    };

    let (_, binary_report) = run(&binary, dir.path()).unwrap();
    let (_, vote_report) = run(&vote, dir.path()).unwrap();
    assert_eq!(binary_report.solid_voxels, vote_report.solid_voxels);
}

#[test]
fn unreadable_mask_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_disk_mask(&dir.path().join("a.png"), 220, 146, 40.0);
    std::fs::write(dir.path().join("b.png"), b"definitely not a png").unwrap();
    write_disk_mask(&dir.path().join("c.png"), 220, 146, 40.0);
    write_disk_mask(&dir.path().join("d.png"), 220, 146, 40.0);

    let (mesh, report) = run(&small_config(), dir.path()).unwrap();
    assert_eq!(report.views_planned, 4);
    assert_eq!(report.views_applied, 3);
    assert_eq!(report.views_skipped, 1);
    assert!(mesh.num_faces() > 0);
}

#[test]
fn wrong_dimensions_skip_the_view() {
    let dir = tempfile::tempdir().unwrap();
    write_disk_mask(&dir.path().join("a.png"), 220, 146, 40.0);
    write_disk_mask(&dir.path().join("b.png"), 64, 64, 10.0);

    let (_, report) = run(&small_config(), dir.path()).unwrap();
    assert_eq!(report.views_applied, 1);
    assert_eq!(report.views_skipped, 1);
}

#[test]
fn count_mismatch_processes_the_shorter_sequence() {
    let dir = tempfile::tempdir().unwrap();
    // 4 poses configured, only 2 masks present.
    write_disk_mask(&dir.path().join("a.png"), 220, 146, 40.0);
    write_disk_mask(&dir.path().join("b.png"), 220, 146, 40.0);

    let (_, report) = run(&small_config(), dir.path()).unwrap();
    assert_eq!(report.views_planned, 2);
    assert_eq!(report.views_applied, 2);
}

#[test]
fn empty_mask_directory_yields_uncarved_grid() {
    let dir = tempfile::tempdir().unwrap();
    let (mesh, report) = run(&small_config(), dir.path()).unwrap();
    // No evidence at all: nothing carved, the solid fills the grid and the
    // surface hugs the cube boundary.
    assert_eq!(report.views_applied, 0);
    assert_eq!(report.solid_voxels, 32 * 32 * 32);
    assert!(mesh.num_faces() > 0);
}

#[test]
fn all_empty_masks_produce_an_empty_mesh_with_early_exit() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..4 {
        // Uniform backdrop, no subject.
        GrayImage::from_pixel(220, 146, Luma([255]))
            .save(dir.path().join(format!("v{i}.png")))
            .unwrap();
    }

    let (mesh, report) = run(&small_config(), dir.path()).unwrap();
    assert!(report.early_exit);
    assert_eq!(report.views_applied, 1);
    assert_eq!(report.solid_voxels, 0);
    assert!(mesh.is_empty());
}

#[test]
fn unwritable_output_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_disk_mask(&dir.path().join("a.png"), 220, 146, 40.0);
    let (mesh, _) = run(&small_config(), dir.path()).unwrap();

    let missing = dir.path().join("no_such_dir").join("out.stl");
    assert!(save_stl(&missing, &mesh, StlFormat::Binary).is_err());
}
