// src/imageops/components.rs

use crate::types::Frame;

/// Keep 8-connected foreground components whose pixel count exceeds
/// `min_area`. Foreground is any non-zero pixel; survivors are set to 255.
pub fn connected_components_filtered(src: &Frame, min_area: usize) -> Frame {
    let (w, h) = (src.width, src.height);
    let mut out = vec![0u8; w * h];
    let mut visited = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();
    let mut component: Vec<usize> = Vec::new();

    for start in 0..w * h {
        if visited[start] || src.data[start] == 0 {
            continue;
        }

        component.clear();
        visited[start] = true;
        stack.push(start);

        while let Some(i) = stack.pop() {
            component.push(i);
            let (x, y) = (i % w, i / w);
            let x0 = x.saturating_sub(1);
            let y0 = y.saturating_sub(1);
            let x1 = (x + 1).min(w - 1);
            let y1 = (y + 1).min(h - 1);
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let j = ny * w + nx;
                    if !visited[j] && src.data[j] != 0 {
                        visited[j] = true;
                        stack.push(j);
                    }
                }
            }
        }

        if component.len() > min_area {
            for &i in &component {
                out[i] = 255;
            }
        }
    }

    Frame::new(out, w, h, 1)
}
