// Drawing tools. Each one paints a single layer of the canvas; the change is
// only recorded once the editor commits it.

use tracing::{debug, trace};

use super::canvas::{Canvas, Color, Layer};

pub trait Tool {
    fn apply(&self, canvas: &Canvas, layer: &Layer, x: u32, y: u32);

    fn name(&self) -> &str;
}

fn stamp_square(canvas: &Canvas, layer: &Layer, x: u32, y: u32, size: u32, color: Color) {
    let half = (size / 2) as i64;
    for dy in -half..=half {
        for dx in -half..=half {
            let px = x as i64 + dx;
            let py = y as i64 + dy;
            if px >= 0 && py >= 0 {
                canvas.set_pixel(layer, px as u32, py as u32, color);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Brush {
    pub size: u32,
    pub color: Color,
}

impl Brush {
    pub fn new(size: u32, color: Color) -> Self {
        Self { size, color }
    }
}

impl Tool for Brush {
    fn apply(&self, canvas: &Canvas, layer: &Layer, x: u32, y: u32) {
        trace!("Brush at ({}, {}) size {} color {:?}", x, y, self.size, self.color);
        stamp_square(canvas, layer, x, y, self.size, self.color);
    }

    fn name(&self) -> &str {
        "Brush"
    }
}

/// Paints transparency back onto a layer.
#[derive(Debug, Clone)]
pub struct Eraser {
    pub size: u32,
}

impl Eraser {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Tool for Eraser {
    fn apply(&self, canvas: &Canvas, layer: &Layer, x: u32, y: u32) {
        trace!("Eraser at ({}, {}) size {}", x, y, self.size);
        stamp_square(canvas, layer, x, y, self.size, Color::TRANSPARENT);
    }

    fn name(&self) -> &str {
        "Eraser"
    }
}

#[derive(Debug, Clone)]
pub struct Fill {
    pub color: Color,
}

impl Fill {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Tool for Fill {
    fn apply(&self, canvas: &Canvas, layer: &Layer, x: u32, y: u32) {
        let Some(target) = canvas.get_pixel(layer, x, y) else {
            debug!("Fill outside canvas at ({}, {})", x, y);
            return;
        };
        if target == self.color {
            return;
        }

        let mut pending = vec![(x, y)];
        let mut filled = 0usize;
        while let Some((px, py)) = pending.pop() {
            if canvas.get_pixel(layer, px, py) != Some(target) {
                continue;
            }
            canvas.set_pixel(layer, px, py, self.color);
            filled += 1;
            if px > 0 {
                pending.push((px - 1, py));
            }
            if py > 0 {
                pending.push((px, py - 1));
            }
            if px + 1 < canvas.width() {
                pending.push((px + 1, py));
            }
            if py + 1 < canvas.height() {
                pending.push((px, py + 1));
            }
        }
        debug!(filled, "flood fill completed");
    }

    fn name(&self) -> &str {
        "Fill"
    }
}
