// src/imageops/hough.rs
//
// Progressive probabilistic Hough transform (ρ = 1 px, θ = 1°).
//
// Edge points are visited in random order. Each point votes into the
// accumulator; once a cell reaches the threshold the line through that
// point is walked in both directions across the edge mask, tolerating up
// to `max_line_gap` missing pixels. Pixels on the walked corridor are
// removed from the mask, and from the accumulator when the segment is long
// enough to be reported. The sampling RNG is seeded with a constant so the
// same edge map always yields the same segments.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Frame, LineSegment};

const NUM_ANGLE: usize = 180;
const SHIFT: i64 = 16;
const SAMPLING_SEED: u64 = 0x0b5e_55ed;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Minimum accumulator votes before a line is traced
    pub threshold: u32,
    pub min_line_length: f32,
    pub max_line_gap: u32,
}

pub fn hough_lines_p(edges: &Frame, params: &HoughParams) -> Vec<LineSegment> {
    let (w, h) = (edges.width, edges.height);
    let mut lines = Vec::new();
    if w == 0 || h == 0 {
        return lines;
    }

    let num_rho = (w + h) * 2 + 1;
    let rho_offset = ((num_rho - 1) / 2) as i64;
    let theta = std::f32::consts::PI / NUM_ANGLE as f32;
    let trig: Vec<(f32, f32)> = (0..NUM_ANGLE)
        .map(|n| {
            let t = n as f32 * theta;
            (t.cos(), t.sin())
        })
        .collect();

    let mut accum = vec![0i32; NUM_ANGLE * num_rho];
    let mut mask = vec![false; w * h];
    let mut points: Vec<(usize, usize)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if edges.data[y * w + x] != 0 {
                mask[y * w + x] = true;
                points.push((x, y));
            }
        }
    }

    let rho_index = |x: usize, y: usize, n: usize| -> usize {
        let (c, s) = trig[n];
        let r = (x as f32 * c + y as f32 * s).round() as i64 + rho_offset;
        n * num_rho + r as usize
    };

    let threshold = params.threshold as i32;
    let line_gap = params.max_line_gap as i64;
    let min_len = params.min_line_length;
    let mut rng = StdRng::seed_from_u64(SAMPLING_SEED);

    let mut count = points.len();
    while count > 0 {
        let idx = rng.gen_range(0..count);
        let (px, py) = points[idx];
        points[idx] = points[count - 1];
        count -= 1;

        if !mask[py * w + px] {
            continue;
        }

        // Vote and remember the strongest angle for this point
        let mut max_val = threshold - 1;
        let mut max_n = 0;
        for n in 0..NUM_ANGLE {
            let cell = &mut accum[rho_index(px, py, n)];
            *cell += 1;
            if max_val < *cell {
                max_val = *cell;
                max_n = n;
            }
        }
        if max_val < threshold {
            continue;
        }

        // Walk along the line direction in fixed point
        let (cos_t, sin_t) = trig[max_n];
        let a = -sin_t;
        let b = cos_t;
        let x_major = a.abs() > b.abs();
        let (x0, y0, dx0, dy0) = if x_major {
            let dx0: i64 = if a > 0.0 { 1 } else { -1 };
            let dy0 = (b * (1i64 << SHIFT) as f32 / a.abs()).round() as i64;
            (px as i64, ((py as i64) << SHIFT) + (1 << (SHIFT - 1)), dx0, dy0)
        } else {
            let dy0: i64 = if b > 0.0 { 1 } else { -1 };
            let dx0 = (a * (1i64 << SHIFT) as f32 / b.abs()).round() as i64;
            (((px as i64) << SHIFT) + (1 << (SHIFT - 1)), py as i64, dx0, dy0)
        };
        let to_pixel = |x: i64, y: i64| -> (i64, i64) {
            if x_major {
                (x, y >> SHIFT)
            } else {
                (x >> SHIFT, y)
            }
        };
        let inside = |j: i64, i: i64| j >= 0 && i >= 0 && j < w as i64 && i < h as i64;

        let mut line_end = [(px as i64, py as i64); 2];
        for (k, end) in line_end.iter_mut().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            let mut gap = 0;
            loop {
                let (j, i) = to_pixel(x, y);
                if !inside(j, i) {
                    break;
                }
                if mask[i as usize * w + j as usize] {
                    gap = 0;
                    *end = (j, i);
                } else {
                    gap += 1;
                    if gap > line_gap {
                        break;
                    }
                }
                x += dx;
                y += dy;
            }
        }

        let good_line = ((line_end[1].0 - line_end[0].0).abs() as f32) >= min_len
            || ((line_end[1].1 - line_end[0].1).abs() as f32) >= min_len;

        // Clear the corridor; retract its votes when the segment is kept
        for (k, end) in line_end.iter().enumerate() {
            let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
            let (mut x, mut y) = (x0, y0);
            loop {
                let (j, i) = to_pixel(x, y);
                if !inside(j, i) {
                    break;
                }
                let m = i as usize * w + j as usize;
                if mask[m] {
                    if good_line {
                        for n in 0..NUM_ANGLE {
                            accum[rho_index(j as usize, i as usize, n)] -= 1;
                        }
                    }
                    mask[m] = false;
                }
                if (j, i) == *end {
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        if good_line {
            lines.push(LineSegment::new(
                line_end[0].0 as i32,
                line_end[0].1 as i32,
                line_end[1].0 as i32,
                line_end[1].1 as i32,
            ));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> HoughParams {
        HoughParams {
            threshold: 35,
            min_line_length: 35.0,
            max_line_gap: 10,
        }
    }

    #[test]
    fn test_empty_edges() {
        let f = Frame::filled(50, 50, 1, 0);
        assert!(hough_lines_p(&f, &params()).is_empty());
    }

    #[test]
    fn test_short_segment_below_threshold() {
        let mut f = Frame::filled(60, 60, 1, 0);
        for i in 0..20 {
            f.data[(10 + i) * 60 + 10 + i] = 255;
        }
        assert!(hough_lines_p(&f, &params()).is_empty());
    }

    #[test]
    fn test_vertical_line_found() {
        let mut f = Frame::filled(80, 80, 1, 0);
        for y in 5..75 {
            f.data[y * 80 + 40] = 255;
        }
        let lines = hough_lines_p(&f, &params());
        assert_eq!(lines.len(), 1);
        let l = lines[0];
        assert_eq!(l.x1, 40);
        assert_eq!(l.x2, 40);
        assert_eq!((l.y1 - l.y2).abs(), 69);
    }

    #[test]
    fn test_diagonal_line_found() {
        let mut f = Frame::filled(100, 100, 1, 0);
        for i in 0..60 {
            f.data[(20 + i) * 100 + 20 + i] = 255;
        }
        let lines = hough_lines_p(&f, &params());
        assert_eq!(lines.len(), 1);
        let angle = lines[0].abs_angle_deg();
        assert!((angle - 45.0).abs() < 2.0 || (angle - 135.0).abs() < 2.0, "angle {}", angle);
        assert!((lines[0].x1 - lines[0].x2).abs() >= 35);
    }

    #[test]
    fn test_deterministic() {
        let mut f = Frame::filled(120, 90, 1, 0);
        for i in 0..70 {
            f.data[(10 + i) * 120 + 10 + i] = 255;
            f.data[(10 + i) * 120 + 110 - i] = 255;
        }
        let a = hough_lines_p(&f, &params());
        let b = hough_lines_p(&f, &params());
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }
}
