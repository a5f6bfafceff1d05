// src/imageops/resize.rs
//
// Resampling and colour conversion on owned frames.

use crate::types::Frame;

/// Resize with area averaging when shrinking and bilinear when enlarging.
pub fn resize(src: &Frame, dst_w: usize, dst_h: usize) -> Frame {
    if dst_w == src.width && dst_h == src.height {
        return src.clone();
    }
    if dst_w <= src.width && dst_h <= src.height {
        resize_area(src, dst_w, dst_h)
    } else {
        resize_bilinear(src, dst_w, dst_h)
    }
}

/// Height that keeps the aspect ratio at `width`, truncated toward zero.
pub fn scaled_height(src_w: usize, src_h: usize, width: usize) -> usize {
    if src_w == 0 {
        return 0;
    }
    ((width as f64 * (src_h as f64 / src_w as f64)) as usize).max(1)
}

/// Per-destination-index list of (source index, weight) for area averaging.
fn area_taps(src: usize, dst: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let mut taps = Vec::with_capacity(scale.ceil() as usize + 1);
            let mut s = start.floor() as usize;
            while (s as f64) < end && s < src {
                let lo = start.max(s as f64);
                let hi = end.min(s as f64 + 1.0);
                let w = hi - lo;
                if w > 1e-9 {
                    taps.push((s, (w / scale) as f32));
                }
                s += 1;
            }
            taps
        })
        .collect()
}

fn resize_area(src: &Frame, dst_w: usize, dst_h: usize) -> Frame {
    let c = src.channels;
    let x_taps = area_taps(src.width, dst_w);
    let y_taps = area_taps(src.height, dst_h);
    let mut dst = vec![0u8; dst_w * dst_h * c];
    let mut acc = vec![0f32; c];

    for (dy, ys) in y_taps.iter().enumerate() {
        for (dx, xs) in x_taps.iter().enumerate() {
            acc.iter_mut().for_each(|a| *a = 0.0);
            for &(sy, wy) in ys {
                let row = src.row(sy);
                for &(sx, wx) in xs {
                    let w = wy * wx;
                    let base = sx * c;
                    for ch in 0..c {
                        acc[ch] += row[base + ch] as f32 * w;
                    }
                }
            }
            let out = (dy * dst_w + dx) * c;
            for ch in 0..c {
                dst[out + ch] = acc[ch].round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Frame::new(dst, dst_w, dst_h, c)
}

/// Bilinear resize with pixel-centre alignment.
fn resize_bilinear(src: &Frame, dst_w: usize, dst_h: usize) -> Frame {
    let c = src.channels;
    let mut dst = vec![0u8; dst_h * dst_w * c];

    let x_ratio = src.width as f32 / dst_w as f32;
    let y_ratio = src.height as f32 / dst_h as f32;

    for dy in 0..dst_h {
        let sy = ((dy as f32 + 0.5) * y_ratio - 0.5).max(0.0);
        let sy0 = (sy.floor() as usize).min(src.height - 1);
        let sy1 = (sy0 + 1).min(src.height - 1);
        let fy = sy - sy0 as f32;

        for dx in 0..dst_w {
            let sx = ((dx as f32 + 0.5) * x_ratio - 0.5).max(0.0);
            let sx0 = (sx.floor() as usize).min(src.width - 1);
            let sx1 = (sx0 + 1).min(src.width - 1);
            let fx = sx - sx0 as f32;

            for ch in 0..c {
                let p00 = src.data[src.index(sx0, sy0) + ch] as f32;
                let p10 = src.data[src.index(sx1, sy0) + ch] as f32;
                let p01 = src.data[src.index(sx0, sy1) + ch] as f32;
                let p11 = src.data[src.index(sx1, sy1) + ch] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * c + ch] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Frame::new(dst, dst_w, dst_h, c)
}

/// BGR → grey with BT.601 weights. Grey input is returned as a copy.
pub fn to_grayscale(src: &Frame) -> Frame {
    if src.channels == 1 {
        return src.clone();
    }
    let data = src
        .data
        .chunks_exact(src.channels)
        .map(|px| {
            let (b, g, r) = (px[0] as f32, px[1] as f32, px[2] as f32);
            (0.114 * b + 0.587 * g + 0.299 * r).round().min(255.0) as u8
        })
        .collect();
    Frame::new(data, src.width, src.height, 1)
}

/// Grey → BGR, for drawing coloured overlays on grey frames.
pub fn to_bgr(src: &Frame) -> Frame {
    if src.channels == 3 {
        return src.clone();
    }
    let data = src.data.iter().flat_map(|&v| [v, v, v]).collect();
    Frame::new(data, src.width, src.height, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_area_preserves_uniform() {
        let src = Frame::filled(640, 480, 3, 200);
        let dst = resize(&src, 240, 180);
        assert_eq!(dst.data.len(), 240 * 180 * 3);
        assert!(dst.data.iter().all(|&v| v == 200));
    }

    #[test]
    fn test_resize_area_averages_blocks() {
        // 4x1 → 2x1: [0, 100, 200, 255] → [50, 228]
        let src = Frame::new(vec![0, 100, 200, 255], 4, 1, 1);
        let dst = resize(&src, 2, 1);
        assert_eq!(dst.data, vec![50, 228]);
    }

    #[test]
    fn test_resize_same_size_is_copy() {
        let src = Frame::new((0..16).collect(), 4, 4, 1);
        assert_eq!(resize(&src, 4, 4), src);
    }

    #[test]
    fn test_resize_upscale() {
        let src = Frame::filled(10, 10, 1, 77);
        let dst = resize(&src, 20, 20);
        assert_eq!(dst.width, 20);
        assert!(dst.data.iter().all(|&v| v == 77));
    }

    #[test]
    fn test_scaled_height_truncates() {
        assert_eq!(scaled_height(640, 480, 240), 180);
        assert_eq!(scaled_height(1920, 1080, 240), 135);
        assert_eq!(scaled_height(1000, 333, 240), 79);
    }

    #[test]
    fn test_grayscale_weights() {
        // pure red, pure green, pure blue in BGR order
        let src = Frame::new(vec![0, 0, 255, 0, 255, 0, 255, 0, 0], 3, 1, 3);
        let gray = to_grayscale(&src);
        assert_eq!(gray.data, vec![76, 150, 29]);
    }
}
