use serde::{Deserialize, Serialize};

/// Point in the surface's centred coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Drawing surface abstraction. The platform owns the actual canvas; the
/// core only emits lines and translucent washes into it.
pub trait DrawSurface {
    /// Current surface dimensions in pixels.
    fn size(&self) -> (f32, f32);

    /// Washes the whole surface with a translucent colour, leaving earlier
    /// strokes to fade out as a trail.
    fn clear_with_fade(&mut self, color: [u8; 3], alpha: f32);

    fn draw_line(&mut self, from: Point, to: Point, stroke_weight: f32);
}

/// A single recorded stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawnLine {
    pub from: Point,
    pub to: Point,
    pub stroke_weight: f32,
}

/// Surface that records draw calls instead of rasterising them. Backs the
/// command line demo and the test suites.
#[derive(Debug, Default)]
pub struct MemorySurface {
    width: f32,
    height: f32,
    pub lines: Vec<DrawnLine>,
    pub washes: usize,
}

impl MemorySurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            lines: Vec::new(),
            washes: 0,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Drains the recorded strokes, returning how many there were.
    pub fn take_line_count(&mut self) -> usize {
        let count = self.lines.len();
        self.lines.clear();
        count
    }
}

impl DrawSurface for MemorySurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear_with_fade(&mut self, _color: [u8; 3], _alpha: f32) {
        self.washes += 1;
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke_weight: f32) {
        self.lines.push(DrawnLine {
            from,
            to,
            stroke_weight,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_surface_records_and_drains() {
        let mut surface = MemorySurface::new(800.0, 600.0);
        assert_eq!(surface.size(), (800.0, 600.0));

        surface.clear_with_fade([247, 241, 219], 0.1);
        surface.draw_line(Point::new(0.0, 0.0), Point::new(10.0, 5.0), 2.0);
        assert_eq!(surface.washes, 1);
        assert_eq!(surface.take_line_count(), 1);
        assert!(surface.lines.is_empty());
    }
}
