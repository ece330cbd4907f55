//! Drawing into caller-owned 32-bit pixel buffers.
//!
//! All writes are clipped against the buffer; coordinates are signed so callers can
//! pass partially or fully off-screen shapes.

use thiserror::Error;

use crate::{grid::FieldGrid, tiles::TileClassifier};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("pixel buffer holds {actual} pixels, expected {width}x{height}")]
    SizeMismatch {
        width: usize,
        height: usize,
        actual: usize,
    },
}

/// Row-major view over a pixel buffer owned by the presentation surface.
#[derive(Debug)]
pub struct Canvas<'a> {
    pixels: &'a mut [u32],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(pixels: &'a mut [u32], width: usize, height: usize) -> Result<Self, CanvasError> {
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(CanvasError::SizeMismatch {
                width,
                height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &*self.pixels
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as u64) < self.width as u64 && (y as u64) < self.height as u64 {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    pub fn pixel(&self, x: i64, y: i64) -> Option<u32> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }

    /// Write one pixel; returns `false` when the point lies outside the buffer.
    #[inline]
    pub fn put_pixel(&mut self, x: i64, y: i64, color: u32) -> bool {
        match self.index(x, y) {
            Some(idx) => {
                self.pixels[idx] = color;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Fill the axis-aligned rectangle with top-left corner `(x, y)`, clipped to the buffer.
    pub fn draw_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: u32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w as i64).min(self.width as i64);
        let y1 = y.saturating_add(h as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for row in y0..y1 {
            let start = row as usize * self.width;
            self.pixels[start + x0 as usize..start + x1 as usize].fill(color);
        }
    }

    /// Draw a segment between both endpoints inclusive, stepping along the major axis.
    pub fn draw_line(&mut self, x1: i64, y1: i64, x2: i64, y2: i64, color: u32) {
        let dx = x2 - x1;
        let dy = y2 - y1;

        if dx == 0 && dy == 0 {
            self.put_pixel(x1, y1, color);
            return;
        }

        if dx.abs() < dy.abs() {
            let (x1, y1, y2) = if y1 > y2 { (x2, y2, y1) } else { (x1, y1, y2) };
            for y in y1..=y2 {
                let x = dx * (y - y1) / dy + x1;
                self.put_pixel(x, y, color);
            }
        } else {
            let (x1, y1, x2) = if x1 > x2 { (x2, y2, x1) } else { (x1, y1, x2) };
            for x in x1..=x2 {
                let y = dy * (x - x1) / dx + y1;
                self.put_pixel(x, y, color);
            }
        }
    }
}

/// How the grid is turned into colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Classified terrain tiles.
    #[default]
    Terrain,
    /// Grayscale proportional to `value / max_value`.
    Heightmap,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Terrain => DisplayMode::Heightmap,
            DisplayMode::Heightmap => DisplayMode::Terrain,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Unknown tags decode as [`DisplayMode::Terrain`].
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DisplayMode::Heightmap,
            _ => DisplayMode::Terrain,
        }
    }
}

/// Clear the canvas and paint one block per grid cell.
///
/// Block size is `canvas / grid` per axis with truncating division.
pub fn render_field(
    canvas: &mut Canvas<'_>,
    grid: &FieldGrid,
    classifier: &TileClassifier,
    mode: DisplayMode,
    background: u32,
) {
    canvas.clear(background);
    if grid.is_empty() {
        return;
    }

    let cell_w = (canvas.width() / grid.width as usize) as u32;
    let cell_h = (canvas.height() / grid.height as usize) as u32;
    let max_value = grid.max_value().max(1);

    for (idx, cell) in grid.cells().iter().enumerate() {
        let color = match mode {
            DisplayMode::Terrain => classifier.classify(cell.value).color(),
            DisplayMode::Heightmap => {
                gray((cell.value.min(max_value) as u64 * 0xFF / max_value as u64) as u32)
            }
        };
        let (gx, gy) = grid.coords(idx);
        canvas.draw_rect(
            gx as i64 * cell_w as i64,
            gy as i64 * cell_h as i64,
            cell_w,
            cell_h,
            color,
        );
    }
}

#[inline]
fn gray(level: u32) -> u32 {
    0xFF00_0000 | (level << 16) | (level << 8) | level
}

/// Swap the red and blue channels of a packed `0xAABBGGRR` color.
pub fn abgr_to_argb(abgr: u32) -> u32 {
    let r = abgr & 0xFF;
    let g = (abgr >> 8) & 0xFF;
    let b = (abgr >> 16) & 0xFF;
    let a = (abgr >> 24) & 0xFF;
    (a << 24) | (r << 16) | (g << 8) | b
}
