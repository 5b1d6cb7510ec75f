//! Rasterizes a [`CommandSurface`] into terminal cells.
//!
//! One surface pixel maps to one terminal column and half a terminal row;
//! each cell shows its two vertically stacked pixels with half-block glyphs.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;

use super::color::Color;
use super::surface::{CommandSurface, DrawOp};

const UPPER_HALF: &str = "▀";
const LOWER_HALF: &str = "▄";
const FULL_BLOCK: &str = "█";

/// Surface size in pixels for a terminal area.
pub fn surface_size(area: Rect) -> (f64, f64) {
    (f64::from(area.width), f64::from(area.height) * 2.0)
}

/// Pixel grid produced by replaying drawing commands.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<Option<Color>>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![None; width * height],
        }
    }

    /// Replays every command of `surface`.
    pub fn rasterize(surface: &CommandSurface, width: usize, height: usize) -> Self {
        let mut grid = Self::new(width, height);
        for op in surface.ops() {
            match *op {
                DrawOp::Clear => grid.pixels.fill(None),
                DrawOp::Rect {
                    x,
                    y,
                    w,
                    h,
                    radius,
                    color,
                } => grid.fill(x, y, w, h, radius, color),
            }
        }
        grid
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels[y * self.width + x]
    }

    /// Fills every pixel whose center lies inside the (rounded) rectangle.
    fn fill(&mut self, x: f64, y: f64, w: f64, h: f64, radius: f64, color: Color) {
        if color.is_transparent() || w <= 0.0 || h <= 0.0 {
            return;
        }

        let radius = radius.clamp(0.0, w.min(h) / 2.0);
        let (right, bottom) = (x + w, y + h);

        let first_col = (x - 0.5).ceil().max(0.0) as usize;
        let first_row = (y - 0.5).ceil().max(0.0) as usize;

        for row in first_row..self.height {
            let cy = row as f64 + 0.5;
            if cy >= bottom {
                break;
            }
            for col in first_col..self.width {
                let cx = col as f64 + 0.5;
                if cx >= right {
                    break;
                }
                if inside_corners(cx, cy, x, y, right, bottom, radius) {
                    self.pixels[row * self.width + col] = Some(color);
                }
            }
        }
    }
}

/// Whether a point inside the rectangle survives the corner rounding.
fn inside_corners(cx: f64, cy: f64, x: f64, y: f64, right: f64, bottom: f64, radius: f64) -> bool {
    if radius <= 0.0 {
        return true;
    }

    let corner_x = if cx < x + radius {
        x + radius
    } else if cx > right - radius {
        right - radius
    } else {
        return true;
    };
    let corner_y = if cy < y + radius {
        y + radius
    } else if cy > bottom - radius {
        bottom - radius
    } else {
        return true;
    };

    let (dx, dy) = (cx - corner_x, cy - corner_y);
    dx * dx + dy * dy <= radius * radius
}

/// Draws the waveform surface into the given area.
pub struct WaveformWidget<'a> {
    surface: &'a CommandSurface,
}

impl<'a> WaveformWidget<'a> {
    pub fn new(surface: &'a CommandSurface) -> Self {
        Self { surface }
    }
}

impl Widget for WaveformWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = area.width as usize;
        let height = area.height as usize * 2;
        let grid = PixelGrid::rasterize(self.surface, width, height);

        for row in 0..area.height {
            for col in 0..area.width {
                let top = grid.get(col as usize, row as usize * 2);
                let bottom = grid.get(col as usize, row as usize * 2 + 1);

                let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) else {
                    continue;
                };

                match (top, bottom) {
                    (None, None) => {}
                    (Some(top), None) => {
                        cell.set_symbol(UPPER_HALF).set_fg(top.into());
                    }
                    (None, Some(bottom)) => {
                        cell.set_symbol(LOWER_HALF).set_fg(bottom.into());
                    }
                    (Some(top), Some(bottom)) if top == bottom => {
                        cell.set_symbol(FULL_BLOCK).set_fg(top.into());
                    }
                    (Some(top), Some(bottom)) => {
                        cell.set_symbol(UPPER_HALF)
                            .set_fg(top.into())
                            .set_bg(bottom.into());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::surface::Surface;

    const RED: Color = Color::Rgb(255, 0, 0);
    const BLUE: Color = Color::Rgb(0, 0, 255);

    #[test]
    fn test_fill_uses_pixel_centers() {
        let mut surface = CommandSurface::new(6.0, 4.0);
        surface.fill_rect(1.0, 1.0, 2.0, 2.0, RED);

        let grid = PixelGrid::rasterize(&surface, 6, 4);
        assert_eq!(grid.get(1, 1), Some(RED));
        assert_eq!(grid.get(2, 2), Some(RED));
        assert_eq!(grid.get(0, 1), None);
        assert_eq!(grid.get(3, 1), None);
        assert_eq!(grid.get(1, 3), None);
    }

    #[test]
    fn test_rounded_corners_are_cut() {
        let mut surface = CommandSurface::new(8.0, 8.0);
        surface.fill_round_rect(0.0, 0.0, 8.0, 8.0, 4.0, RED);

        let grid = PixelGrid::rasterize(&surface, 8, 8);
        assert_eq!(grid.get(0, 0), None);
        assert_eq!(grid.get(7, 7), None);
        assert_eq!(grid.get(4, 0), Some(RED));
        assert_eq!(grid.get(4, 4), Some(RED));
    }

    #[test]
    fn test_clear_erases_earlier_rects() {
        let mut surface = CommandSurface::new(4.0, 4.0);
        surface.fill_rect(0.0, 0.0, 4.0, 4.0, RED);
        surface.clear();
        surface.fill_rect(0.0, 0.0, 1.0, 1.0, BLUE);

        let grid = PixelGrid::rasterize(&surface, 4, 4);
        assert_eq!(grid.get(0, 0), Some(BLUE));
        assert_eq!(grid.get(3, 3), None);
    }

    #[test]
    fn test_render_uses_half_blocks() {
        let mut surface = CommandSurface::new(3.0, 2.0);
        surface.fill_rect(0.0, 0.0, 1.0, 1.0, RED);
        surface.fill_rect(1.0, 1.0, 1.0, 1.0, BLUE);
        surface.fill_rect(2.0, 0.0, 1.0, 2.0, RED);

        let area = Rect::new(0, 0, 3, 1);
        let mut buf = Buffer::empty(area);
        WaveformWidget::new(&surface).render(area, &mut buf);

        assert_eq!(buf[(0, 0)].symbol(), UPPER_HALF);
        assert_eq!(buf[(1, 0)].symbol(), LOWER_HALF);
        assert_eq!(buf[(2, 0)].symbol(), FULL_BLOCK);
        assert_eq!(buf[(2, 0)].fg, ratatui::style::Color::Rgb(255, 0, 0));
    }
}
