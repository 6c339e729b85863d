//! Silhouette mask cleanup.
//!
//! Raw turntable captures label the backdrop with a single gray value and
//! everything else as subject. Cleanup relabels that into a 0/255 binary
//! mask, keeps only the largest connected foreground blob and fills its
//! interior holes, so downstream carving sees exactly one solid silhouette.

use image::GrayImage;
use std::collections::VecDeque;

pub const FOREGROUND: u8 = 255;

const NEIGH_8: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

const NEIGH_4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

fn in_bounds(x: i32, y: i32, w: i32, h: i32) -> bool {
    x >= 0 && y >= 0 && x < w && y < h
}

/// Relabel a raw mask: pixels equal to `background_label` become 0, every
/// other value becomes [`FOREGROUND`]. Pure transform, the input is untouched.
pub fn relabel(raw: &GrayImage, background_label: u8) -> GrayImage {
    let mut dst = GrayImage::new(raw.width(), raw.height());
    for (out_px, &px) in dst.as_mut().iter_mut().zip(raw.as_raw()) {
        *out_px = if px == background_label { 0 } else { FOREGROUND };
    }
    dst
}

/// Label 8-connected foreground components and return `(labels, areas)`.
/// Label 0 is background; `areas[l - 1]` is the pixel count of label `l`.
fn label_components(binary: &GrayImage) -> (Vec<u32>, Vec<u32>) {
    let w = binary.width() as i32;
    let h = binary.height() as i32;
    let data = binary.as_raw();
    let mut labels = vec![0u32; (w * h) as usize];
    let mut areas = Vec::new();
    let mut next_label = 1u32;

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if data[idx] == 0 || labels[idx] != 0 {
                continue;
            }

            let label = next_label;
            next_label += 1;

            let mut q = VecDeque::new();
            q.push_back((x, y));
            labels[idx] = label;
            let mut area = 0u32;

            while let Some((cx, cy)) = q.pop_front() {
                area += 1;
                for &(dx, dy) in &NEIGH_8 {
                    let nx = cx + dx;
                    let ny = cy + dy;
                    if !in_bounds(nx, ny, w, h) {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if data[nidx] == 0 || labels[nidx] != 0 {
                        continue;
                    }
                    labels[nidx] = label;
                    q.push_back((nx, ny));
                }
            }

            areas.push(area);
        }
    }

    (labels, areas)
}

/// Clean a raw silhouette capture into a binary mask with exactly one solid
/// foreground blob (or none, when the capture holds no foreground at all).
///
/// Steps: relabel against `background_label`, keep the largest 8-connected
/// foreground component, then fill its interior holes by flood-filling the
/// true background inward from the image border — any region the border
/// flood cannot reach is enclosed by the blob and becomes foreground.
pub fn clean_silhouette(raw: &GrayImage, background_label: u8) -> GrayImage {
    let binary = relabel(raw, background_label);
    let (labels, areas) = label_components(&binary);

    let mut out = GrayImage::new(raw.width(), raw.height());
    let Some(largest) = areas
        .iter()
        .enumerate()
        .max_by_key(|(_, &area)| area)
        .map(|(i, _)| i as u32 + 1)
    else {
        return out;
    };

    let w = binary.width() as i32;
    let h = binary.height() as i32;

    // Flood the exterior: everything reachable from the border without
    // crossing the largest component.
    let mut exterior = vec![false; (w * h) as usize];
    let mut q = VecDeque::new();
    for x in 0..w {
        for y in [0, h - 1] {
            let idx = (y * w + x) as usize;
            if labels[idx] != largest && !exterior[idx] {
                exterior[idx] = true;
                q.push_back((x, y));
            }
        }
    }
    for y in 0..h {
        for x in [0, w - 1] {
            let idx = (y * w + x) as usize;
            if labels[idx] != largest && !exterior[idx] {
                exterior[idx] = true;
                q.push_back((x, y));
            }
        }
    }
    while let Some((cx, cy)) = q.pop_front() {
        for &(dx, dy) in &NEIGH_4 {
            let nx = cx + dx;
            let ny = cy + dy;
            if !in_bounds(nx, ny, w, h) {
                continue;
            }
            let nidx = (ny * w + nx) as usize;
            if exterior[nidx] || labels[nidx] == largest {
                continue;
            }
            exterior[nidx] = true;
            q.push_back((nx, ny));
        }
    }

    // Component pixels plus enclosed holes are foreground; stray blobs end
    // up in the exterior and are discarded.
    for (idx, out_px) in out.as_mut().iter_mut().enumerate() {
        if labels[idx] == largest || !exterior[idx] {
            *out_px = FOREGROUND;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn count_foreground(mask: &GrayImage) -> usize {
        mask.as_raw().iter().filter(|&&p| p > 0).count()
    }

    #[test]
    fn relabel_swaps_background_and_keeps_subject() {
        let mut raw = GrayImage::new(4, 1);
        raw.put_pixel(0, 0, Luma([255])); // backdrop
        raw.put_pixel(1, 0, Luma([0]));
        raw.put_pixel(2, 0, Luma([17]));
        raw.put_pixel(3, 0, Luma([255]));

        let out = relabel(&raw, 255);
        assert_eq!(out.as_raw(), &[0, 255, 255, 0]);
    }

    #[test]
    fn clean_fills_interior_hole() {
        // 8x8 ring of foreground around an empty centre.
        let mut raw = GrayImage::from_pixel(10, 10, Luma([255]));
        for y in 2..8 {
            for x in 2..8 {
                raw.put_pixel(x, y, Luma([40]));
            }
        }
        for y in 4..6 {
            for x in 4..6 {
                raw.put_pixel(x, y, Luma([255])); // hole, same value as backdrop
            }
        }

        let out = clean_silhouette(&raw, 255);
        assert_eq!(out.get_pixel(4, 4)[0], FOREGROUND, "hole must be filled");
        assert_eq!(count_foreground(&out), 36);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn clean_keeps_only_largest_blob() {
        let mut raw = GrayImage::from_pixel(16, 16, Luma([255]));
        // Large blob.
        for y in 1..9 {
            for x in 1..9 {
                raw.put_pixel(x, y, Luma([10]));
            }
        }
        // Small distant speck.
        raw.put_pixel(13, 13, Luma([10]));
        raw.put_pixel(14, 13, Luma([10]));

        let out = clean_silhouette(&raw, 255);
        assert_eq!(out.get_pixel(13, 13)[0], 0, "speck must be removed");
        assert_eq!(count_foreground(&out), 64);
    }

    #[test]
    fn empty_capture_yields_empty_mask() {
        let raw = GrayImage::from_pixel(8, 8, Luma([255]));
        let out = clean_silhouette(&raw, 255);
        assert_eq!(count_foreground(&out), 0);
    }

    #[test]
    fn blob_touching_border_survives() {
        let mut raw = GrayImage::from_pixel(6, 6, Luma([255]));
        for y in 0..6 {
            for x in 0..3 {
                raw.put_pixel(x, y, Luma([0]));
            }
        }
        let out = clean_silhouette(&raw, 255);
        assert_eq!(count_foreground(&out), 18);
        assert_eq!(out.get_pixel(0, 0)[0], FOREGROUND);
    }
}
