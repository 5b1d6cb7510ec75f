//! Drawing surface abstraction and the two primitives every compositor uses.
//!
//! Compositors receive a `&mut dyn Surface` per frame and never keep it. The
//! in-memory [`CommandSurface`] records drawing commands so the terminal widget
//! can rasterize them, and so tests can inspect exactly what a frame drew.

use super::color::Color;

/// A 2D pixel surface with rectangle fill primitives.
pub trait Surface {
    /// Width in pixels.
    fn width(&self) -> f64;
    /// Height in pixels.
    fn height(&self) -> f64;
    /// Erases everything drawn so far.
    fn clear(&mut self);
    /// Fills an axis-aligned rectangle. `h` is always non-negative here.
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color);
    /// Fills a rectangle with rounded corners of the given radius.
    fn fill_round_rect(&mut self, x: f64, y: f64, w: f64, h: f64, radius: f64, color: Color);
}

/// One recorded drawing command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOp {
    Clear,
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        radius: f64,
        color: Color,
    },
}

/// Surface that records its drawing commands for later rasterization.
#[derive(Debug, Clone, Default)]
pub struct CommandSurface {
    width: f64,
    height: f64,
    ops: Vec<DrawOp>,
}

impl CommandSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Changes the pixel size. Existing commands are dropped.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.ops.clear();
    }

    /// Commands drawn since the last clear.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Rectangles drawn since the last clear, in drawing order.
    #[cfg(test)]
    pub fn rects(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Rect { .. }))
    }
}

impl Surface for CommandSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            w,
            h,
            radius: 0.0,
            color,
        });
    }

    fn fill_round_rect(&mut self, x: f64, y: f64, w: f64, h: f64, radius: f64, color: Color) {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            w,
            h,
            radius,
            color,
        });
    }
}

/// Geometry and style of one amplitude bar.
#[derive(Debug, Clone, Copy)]
pub struct Bar {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    /// May be negative; the bar then extends upwards from `y`.
    pub h: f64,
    pub color: Color,
    pub rounded: f64,
}

/// Draws one bar, normalizing negative heights and skipping empty ones.
pub fn paint_bar(surface: &mut dyn Surface, bar: Bar) {
    let (y, h) = if bar.h < 0.0 {
        (bar.y + bar.h, -bar.h)
    } else {
        (bar.y, bar.h)
    };

    if h == 0.0 || bar.w <= 0.0 || !h.is_finite() || !y.is_finite() {
        return;
    }

    if bar.rounded > 0.0 {
        surface.fill_round_rect(bar.x, y, bar.w, h, bar.rounded, bar.color);
    } else {
        surface.fill_rect(bar.x, y, bar.w, h, bar.color);
    }
}

/// Clears the surface and paints the background unless it is transparent.
///
/// Returns `false` when the surface has no drawable area, in which case the
/// caller should skip the rest of the frame.
pub fn reset_surface(surface: &mut dyn Surface, background: Color) -> bool {
    let (width, height) = (surface.width(), surface.height());
    if width <= 0.0 || height <= 0.0 {
        return false;
    }

    surface.clear();
    if !background.is_transparent() {
        surface.fill_rect(0.0, 0.0, width, height, background);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_bar_flips_negative_height() {
        let mut surface = CommandSurface::new(10.0, 10.0);
        paint_bar(
            &mut surface,
            Bar {
                x: 1.0,
                y: 8.0,
                w: 2.0,
                h: -6.0,
                color: Color::WHITE,
                rounded: 0.0,
            },
        );

        assert_eq!(
            surface.ops(),
            &[DrawOp::Rect {
                x: 1.0,
                y: 2.0,
                w: 2.0,
                h: 6.0,
                radius: 0.0,
                color: Color::WHITE
            }]
        );
    }

    #[test]
    fn test_paint_bar_skips_degenerate_bars() {
        let mut surface = CommandSurface::new(10.0, 10.0);
        let bar = Bar {
            x: 0.0,
            y: 5.0,
            w: 2.0,
            h: 0.0,
            color: Color::WHITE,
            rounded: 5.0,
        };
        paint_bar(&mut surface, bar);
        paint_bar(&mut surface, Bar { h: f64::NAN, ..bar });
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_reset_surface_fills_opaque_background() {
        let mut surface = CommandSurface::new(4.0, 3.0);
        assert!(reset_surface(&mut surface, Color::Rgb(1, 2, 3)));
        assert_eq!(surface.ops().len(), 2);
        assert_eq!(surface.ops()[0], DrawOp::Clear);

        assert!(reset_surface(&mut surface, Color::Transparent));
        assert_eq!(surface.ops(), &[DrawOp::Clear]);
    }

    #[test]
    fn test_reset_surface_rejects_empty_surface() {
        let mut surface = CommandSurface::new(0.0, 20.0);
        assert!(!reset_surface(&mut surface, Color::WHITE));
        assert!(surface.ops().is_empty());
    }
}
