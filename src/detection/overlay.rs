// src/detection/overlay.rs
//
// Debug rendering on BGR frames: kept lines, centre guide, markers.

use crate::types::{Frame, LineSegment};

pub type Bgr = [u8; 3];

pub const BLUE: Bgr = [255, 0, 0];
pub const GREEN: Bgr = [0, 255, 0];
pub const RED: Bgr = [0, 0, 255];
pub const CYAN: Bgr = [255, 255, 0];

fn put(frame: &mut Frame, x: i32, y: i32, color: Bgr) {
    if x < 0 || y < 0 || x as usize >= frame.width || y as usize >= frame.height {
        return;
    }
    let i = frame.index(x as usize, y as usize);
    frame.data[i..i + 3].copy_from_slice(&color);
}

/// Bresenham line, clipped to the frame.
pub fn draw_line(frame: &mut Frame, x0: i32, y0: i32, x1: i32, y1: i32, color: Bgr) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;
    loop {
        put(frame, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Extend a segment to the frame borders, the way the kept lines are shown.
pub fn draw_extended(frame: &mut Frame, seg: &LineSegment, color: Bgr) {
    let (w, h) = (frame.width as f32, frame.height as f32);
    match seg.slope_intercept() {
        None => draw_line(frame, seg.x1, 0, seg.x1, h as i32, color),
        Some((m, c)) if m.abs() < 1.0 => {
            draw_line(frame, 0, c as i32, w as i32, (m * w + c) as i32, color);
        }
        Some((m, c)) => {
            draw_line(frame, (-c / m) as i32, 0, ((h - c) / m) as i32, h as i32, color);
        }
    }
}

pub fn fill_circle(frame: &mut Frame, cx: i32, cy: i32, radius: i32, color: Bgr) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

pub fn center_guide(frame: &mut Frame, color: Bgr) {
    let x = (frame.width / 2) as i32;
    draw_line(frame, x, 0, x, frame.height as i32 - 1, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endpoints_painted() {
        let mut f = Frame::filled(10, 10, 3, 0);
        draw_line(&mut f, 1, 1, 8, 5, RED);
        assert_eq!(&f.data[f.index(1, 1)..f.index(1, 1) + 3], &RED);
        assert_eq!(&f.data[f.index(8, 5)..f.index(8, 5) + 3], &RED);
    }

    #[test]
    fn test_clipping_is_safe() {
        let mut f = Frame::filled(10, 10, 3, 0);
        draw_line(&mut f, -20, -5, 30, 40, GREEN);
        fill_circle(&mut f, 0, 0, 4, BLUE);
        assert_eq!(&f.data[0..3], &BLUE);
    }

    #[test]
    fn test_center_guide() {
        let mut f = Frame::filled(8, 4, 3, 0);
        center_guide(&mut f, CYAN);
        for y in 0..4 {
            let i = f.index(4, y);
            assert_eq!(&f.data[i..i + 3], &CYAN);
        }
    }
}
