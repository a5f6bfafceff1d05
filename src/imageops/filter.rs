// src/imageops/filter.rs
//
// Smoothing and local contrast normalisation on grey frames.

use crate::types::Frame;

/// Mirror index without repeating the edge pixel (`gfedcb|abcdefgh|gfedcba`).
#[inline]
pub(crate) fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

/// Normalised 1-D Gaussian; sigma derived from the kernel size.
fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (ksize / 2) as isize;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Separable Gaussian blur with a `ksize × ksize` kernel.
pub fn gaussian_blur(src: &Frame, ksize: usize) -> Frame {
    let (w, h) = (src.width, src.height);
    if ksize <= 1 || w == 0 || h == 0 {
        return src.clone();
    }
    let kernel = gaussian_kernel(ksize);
    let half = (ksize / 2) as isize;

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = src.row(y);
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect101(x as isize + k as isize - half, w);
                acc += row[sx] as f32 * weight;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect101(y as isize + k as isize - half, h);
                acc += horizontal[sy * w + x] * weight;
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    Frame::new(out, w, h, 1)
}

/// Contrast-limited adaptive histogram equalisation.
///
/// The frame is cut into `tile_grid = [cols, rows]` tiles. Each tile gets a
/// clipped, redistributed histogram turned into a lookup table; pixels
/// blend the four nearest tile tables bilinearly.
pub fn apply_clahe(src: &Frame, clip_limit: f32, tile_grid: [usize; 2]) -> Frame {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return src.clone();
    }
    let tiles_x = tile_grid[0].clamp(1, w);
    let tiles_y = tile_grid[1].clamp(1, h);
    let tile_w = (w + tiles_x - 1) / tiles_x;
    let tile_h = (h + tiles_y - 1) / tiles_y;

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = ((tx + 1) * tile_w).min(w);
            let y1 = ((ty + 1) * tile_h).min(h);
            luts[ty * tiles_x + tx] = tile_lut(src, x0, y0, x1, y1, clip_limit);
        }
    }

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    let mut out = vec![0u8; w * h];

    for y in 0..h {
        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor() as isize;
        let ya = tyf - ty1 as f32;
        let ty2 = ((ty1 + 1) as usize).min(tiles_y - 1);
        let ty1 = ty1.max(0) as usize;

        for x in 0..w {
            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor() as isize;
            let xa = txf - tx1 as f32;
            let tx2 = ((tx1 + 1) as usize).min(tiles_x - 1);
            let tx1 = tx1.max(0) as usize;

            let v = src.get(x, y) as usize;
            let l11 = luts[ty1 * tiles_x + tx1][v] as f32;
            let l12 = luts[ty1 * tiles_x + tx2][v] as f32;
            let l21 = luts[ty2 * tiles_x + tx1][v] as f32;
            let l22 = luts[ty2 * tiles_x + tx2][v] as f32;

            let top = l11 * (1.0 - xa) + l12 * xa;
            let bottom = l21 * (1.0 - xa) + l22 * xa;
            out[y * w + x] = (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8;
        }
    }

    Frame::new(out, w, h, 1)
}

fn tile_lut(src: &Frame, x0: usize, y0: usize, x1: usize, y1: usize, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let area = x1.saturating_sub(x0) * y1.saturating_sub(y0);
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    let mut hist = [0usize; 256];
    for y in y0..y1 {
        for &v in &src.row(y)[x0..x1] {
            hist[v as usize] += 1;
        }
    }

    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as usize).max(1);
        let mut excess = 0usize;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }

        let redistribute = excess / 256;
        let mut residual = excess - redistribute * 256;
        for bin in hist.iter_mut() {
            *bin += redistribute;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            let mut i = 0;
            while i < 256 && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut sum = 0usize;
    for (i, bin) in hist.iter().enumerate() {
        sum += bin;
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(0, 1), 0);
    }

    #[test]
    fn test_kernel_sums_to_one() {
        let k = gaussian_kernel(7);
        assert_eq!(k.len(), 7);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(k[3] > k[2] && k[2] > k[1]);
    }

    #[test]
    fn test_blur_uniform_is_identity() {
        let src = Frame::filled(20, 15, 1, 123);
        let out = gaussian_blur(&src, 7);
        assert!(out.data.iter().all(|&v| v == 123));
    }

    #[test]
    fn test_blur_softens_step() {
        let mut src = Frame::filled(20, 5, 1, 0);
        for y in 0..5 {
            for x in 10..20 {
                src.data[y * 20 + x] = 255;
            }
        }
        let out = gaussian_blur(&src, 7);
        assert!(out.get(9, 2) > 0);
        assert!(out.get(10, 2) < 255);
        assert_eq!(out.get(0, 2), 0);
        assert_eq!(out.get(19, 2), 255);
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        let mut src = Frame::filled(32, 32, 1, 100);
        for y in 0..32 {
            for x in 16..32 {
                src.data[y * 32 + x] = 110;
            }
        }
        let out = apply_clahe(&src, 15.0, [1, 1]);
        let left = out.get(2, 16) as i32;
        let right = out.get(29, 16) as i32;
        assert!(right - left > 10, "contrast should grow: {} vs {}", left, right);
    }

    #[test]
    fn test_clahe_handles_more_tiles_than_pixels() {
        let src = Frame::filled(5, 3, 1, 40);
        let out = apply_clahe(&src, 15.0, [12, 12]);
        assert_eq!(out.data.len(), 15);
    }
}
