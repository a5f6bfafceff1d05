// src/imageops/edges.rs
//
// Canny edge detector: Sobel 3×3 gradients with border clamping, L1
// magnitude, direction-aligned non-maximum suppression and 8-neighbour
// hysteresis. Output is a binary 0/255 grey frame.

use crate::types::Frame;

const TAN_22_5_DEG: f32 = 0.414_213_56;

// pixel classes after suppression
const NOT_EDGE: u8 = 0;
const WEAK: u8 = 1;
const STRONG: u8 = 2;

/// Integer Sobel gradients; out-of-frame samples clamp to the border.
fn sobel(src: &Frame) -> (Vec<i32>, Vec<i32>) {
    let (w, h) = (src.width, src.height);
    let mut gx = vec![0i32; w * h];
    let mut gy = vec![0i32; w * h];

    for y in 0..h {
        let rows = [
            src.row(y.saturating_sub(1)),
            src.row(y),
            src.row((y + 1).min(h - 1)),
        ];
        for x in 0..w {
            let xl = x.saturating_sub(1);
            let xr = (x + 1).min(w - 1);
            let p = |r: usize, c: usize| rows[r][c] as i32;

            gx[y * w + x] = (p(0, xr) + 2 * p(1, xr) + p(2, xr)) - (p(0, xl) + 2 * p(1, xl) + p(2, xl));
            gy[y * w + x] = (p(2, xl) + 2 * p(2, x) + p(2, xr)) - (p(0, xl) + 2 * p(0, x) + p(0, xr));
        }
    }
    (gx, gy)
}

pub fn canny(src: &Frame, low: f32, high: f32) -> Frame {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return src.clone();
    }
    let (low, high) = if low > high { (high, low) } else { (low, high) };

    let (gx, gy) = sobel(src);
    let mag: Vec<i32> = gx.iter().zip(&gy).map(|(a, b)| a.abs() + b.abs()).collect();
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    // Non-maximum suppression
    let mut class = vec![NOT_EDGE; w * h];
    let mut stack: Vec<usize> = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = mag[i];
            if m as f32 <= low {
                continue;
            }
            let (xs, ys) = (gx[i], gy[i]);
            let ax = xs.abs() as f32;
            let ay = ys.abs() as f32;
            let (xi, yi) = (x as isize, y as isize);

            let is_max = if ay < ax * TAN_22_5_DEG {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ay > ax / TAN_22_5_DEG {
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                let s: isize = if (xs ^ ys) < 0 { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
            };

            if is_max {
                if m as f32 > high {
                    class[i] = STRONG;
                    stack.push(i);
                } else {
                    class[i] = WEAK;
                }
            }
        }
    }

    // Hysteresis: grow strong edges through connected weak pixels
    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as isize, (i / w) as isize);
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if class[j] == WEAK {
                    class[j] = STRONG;
                    stack.push(j);
                }
            }
        }
    }

    let data = class
        .into_iter()
        .map(|c| if c == STRONG { 255 } else { 0 })
        .collect();
    Frame::new(data, w, h, 1)
}
