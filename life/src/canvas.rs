use crate::error::{LifeError, Result};

/// Pixel value written into the canvas; indexes [`PALETTE`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    Background = 0,
    Dead = 1,
    Alive = 2,
}

/// Background, dead, alive.
pub const PALETTE: [[u8; 3]; 3] = [[13, 13, 18], [46, 46, 56], [242, 242, 242]];

/// Scaled, palette-indexed mirror of the grid, one byte per pixel, row-major.
///
/// Each cell owns a `scale`×`scale` square. The painted block is one pixel
/// smaller in each direction so a background grid line separates cells.
pub struct Canvas {
    grid_width: usize,
    grid_height: usize,
    scale: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(grid_width: usize, grid_height: usize, scale: usize) -> Result<Self> {
        if scale == 0 {
            return Err(LifeError::ZeroScale);
        }
        if grid_width == 0 || grid_height == 0 {
            return Err(LifeError::EmptyGrid {
                width: grid_width,
                height: grid_height,
            });
        }
        let len = grid_width
            .checked_mul(scale)
            .and_then(|w| w.checked_mul(grid_height))
            .and_then(|wh| wh.checked_mul(scale))
            .ok_or(LifeError::GridTooLarge {
                width: grid_width,
                height: grid_height,
            })?;

        Ok(Self {
            grid_width,
            grid_height,
            scale,
            pixels: vec![Shade::Background as u8; len],
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.grid_width * self.scale
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.grid_height * self.scale
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn shade_at(&self, px: usize, py: usize) -> u8 {
        self.pixels[py * self.width() + px]
    }

    fn block_size(&self) -> usize {
        if self.scale == 1 {
            1
        } else {
            self.scale - 1
        }
    }

    /// Paint the block of grid cell (x, y).
    pub fn paint_cell(&mut self, x: usize, y: usize, alive: bool) {
        let shade = (if alive { Shade::Alive } else { Shade::Dead }) as u8;
        let stride = self.width();
        let block = self.block_size();
        let (left, top) = (x * self.scale, y * self.scale);

        for row in top..top + block {
            let start = row * stride + left;
            self.pixels[start..start + block].fill(shade);
        }
    }

    /// The copy of the pixels of block (x, y), row by row.
    pub fn block(&self, x: usize, y: usize) -> Vec<u8> {
        let stride = self.width();
        let (left, top) = (x * self.scale, y * self.scale);
        (top..top + self.scale)
            .flat_map(|row| self.pixels[row * stride + left..row * stride + left + self.scale].iter().copied())
            .collect()
    }

    /// Grid cell under canvas pixel position `at`, if any.
    pub fn cell_at(&self, at: [f32; 2]) -> Option<(usize, usize)> {
        let [px, py] = at;
        if !px.is_finite() || !py.is_finite() || px < 0.0 || py < 0.0 {
            return None;
        }
        let x = px as usize / self.scale;
        let y = py as usize / self.scale;
        (x < self.grid_width && y < self.grid_height).then_some((x, y))
    }

    /// Expand into RGBA8 through [`PALETTE`]. `out` must hold `width * height * 4` bytes.
    pub fn write_rgba(&self, out: &mut [u8]) {
        for (rgba, &index) in out.chunks_exact_mut(4).zip(&self.pixels) {
            let [r, g, b] = PALETTE[index as usize];
            rgba.copy_from_slice(&[r, g, b, 255]);
        }
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = vec![0; self.pixels.len() * 4];
        self.write_rgba(&mut out);
        out
    }
}
