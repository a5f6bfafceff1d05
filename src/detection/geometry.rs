// src/detection/geometry.rs
//
// Line classification and vanishing-point geometry.

use crate::types::{AngleBands, LineSegment};

const MIN_SLOPE_DIFF: f32 = 1e-5;

/// `y = m x + c` for every segment that is neither horizontal nor vertical.
pub fn diagonal_lines(lines: &[LineSegment], bands: &AngleBands) -> Vec<(f32, f32)> {
    lines
        .iter()
        .filter(|l| {
            let a = l.abs_angle_deg();
            !bands.is_horizontal(a) && !bands.is_vertical(a)
        })
        .filter_map(LineSegment::slope_intercept)
        .collect()
}

pub fn vertical_lines(lines: &[LineSegment], bands: &AngleBands) -> Vec<LineSegment> {
    lines
        .iter()
        .filter(|l| bands.is_vertical(l.abs_angle_deg()))
        .copied()
        .collect()
}

/// Pairwise intersections of opposite-slope lines lying strictly inside
/// `(-w, 2w) × (-h, 2h)`.
pub fn intersections(lines: &[(f32, f32)], width: usize, height: usize) -> Vec<(f32, f32)> {
    let (w, h) = (width as f32, height as f32);
    let mut points = Vec::new();
    for (i, &(m1, c1)) in lines.iter().enumerate() {
        for &(m2, c2) in &lines[i + 1..] {
            if (m1 - m2).abs() < MIN_SLOPE_DIFF || m1 * m2 > 0.0 {
                continue;
            }
            let x = (c2 - c1) / (m1 - m2);
            let y = m1 * x + c1;
            if x > -w && x < 2.0 * w && y > -h && y < 2.0 * h {
                points.push((x, y));
            }
        }
    }
    points
}

/// Median; mean of the two middle values for even counts.
pub fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_filter() {
        let bands = AngleBands::default();
        let lines = [
            LineSegment::new(0, 0, 50, 2),   // horizontal
            LineSegment::new(10, 0, 11, 40), // vertical
            LineSegment::new(0, 0, 30, 30),  // diagonal
            LineSegment::new(0, 30, 30, 0),  // diagonal
        ];
        let diag = diagonal_lines(&lines, &bands);
        assert_eq!(diag.len(), 2);
        assert!((diag[0].0 - 1.0).abs() < 1e-6);
        assert!((diag[1].0 + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_same_sign_pairs_skipped() {
        let lines = [(1.0, 0.0), (2.0, -10.0)];
        assert!(intersections(&lines, 100, 100).is_empty());
    }

    #[test]
    fn test_opposite_pair_intersects() {
        // y = x and y = -x + 100 meet at (50, 50)
        let pts = intersections(&[(1.0, 0.0), (-1.0, 100.0)], 100, 100);
        assert_eq!(pts.len(), 1);
        assert!((pts[0].0 - 50.0).abs() < 1e-4);
        assert!((pts[0].1 - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_bounds_are_strict() {
        // meets at x = 200 = 2w, excluded
        let pts = intersections(&[(1.0, -200.0), (-1.0, 200.0)], 100, 100);
        assert!(pts.is_empty());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }
}
