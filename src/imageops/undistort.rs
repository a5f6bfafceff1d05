// src/imageops/undistort.rs
//
// Lens undistortion by inverse mapping: every output pixel is projected
// through the Brown-Conrady model into the distorted source and sampled
// bilinearly. Pixels that map outside the source stay black.

use crate::types::{CameraIntrinsics, Frame};

/// Intrinsics rescaled to the live frame resolution.
struct Scaled {
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

fn scale_intrinsics(k: &CameraIntrinsics, width: usize, height: usize) -> Scaled {
    let [cal_w, cal_h] = k.calibration_size;
    let sx = if cal_w > 0 { width as f64 / cal_w as f64 } else { 1.0 };
    let sy = if cal_h > 0 { height as f64 / cal_h as f64 } else { 1.0 };
    Scaled {
        fx: k.camera_matrix[0][0] * sx,
        fy: k.camera_matrix[1][1] * sy,
        cx: k.camera_matrix[0][2] * sx,
        cy: k.camera_matrix[1][2] * sy,
    }
}

pub fn undistort(src: &Frame, intrinsics: &CameraIntrinsics) -> Frame {
    let (w, h, c) = (src.width, src.height, src.channels);
    if w == 0 || h == 0 {
        return src.clone();
    }
    let s = scale_intrinsics(intrinsics, w, h);
    if s.fx == 0.0 || s.fy == 0.0 {
        return src.clone();
    }
    let [k1, k2, p1, p2, k3] = intrinsics.dist_coeffs;

    let mut out = vec![0u8; w * h * c];
    for v in 0..h {
        let y = (v as f64 - s.cy) / s.fy;
        for u in 0..w {
            let x = (u as f64 - s.cx) / s.fx;
            let r2 = x * x + y * y;
            let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
            let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;

            let su = xd * s.fx + s.cx;
            let sv = yd * s.fy + s.cy;
            if su <= -1.0 || sv <= -1.0 || su >= w as f64 || sv >= h as f64 {
                continue;
            }
            let su = su.clamp(0.0, (w - 1) as f64);
            let sv = sv.clamp(0.0, (h - 1) as f64);

            let x0 = su.floor() as usize;
            let y0 = sv.floor() as usize;
            let x1 = (x0 + 1).min(w - 1);
            let y1 = (y0 + 1).min(h - 1);
            let fx = su - x0 as f64;
            let fy = sv - y0 as f64;

            let dst = (v * w + u) * c;
            for ch in 0..c {
                let p00 = src.data[src.index(x0, y0) + ch] as f64;
                let p10 = src.data[src.index(x1, y0) + ch] as f64;
                let p01 = src.data[src.index(x0, y1) + ch] as f64;
                let p11 = src.data[src.index(x1, y1) + ch] as f64;
                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;
                out[dst + ch] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Frame::new(out, w, h, c)
}
