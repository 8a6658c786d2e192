use image::{Rgba, RgbaImage};

use crate::processing::color::Color;
use crate::processing::grid::BlockGrid;

/// Per-pixel output of a pixellation pass.
///
/// Holds one color per source pixel (row-major); every pixel of a block carries
/// that block's average.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixellation {
    width: u32,
    height: u32,
    grid: BlockGrid,
    colors: Vec<Color>,
}

impl Pixellation {
    pub(crate) fn new(width: u32, height: u32, grid: BlockGrid, colors: Vec<Color>) -> Self {
        debug_assert_eq!(colors.len(), width as usize * height as usize);
        Self {
            width,
            height,
            grid,
            colors,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn into_colors(self) -> Vec<Color> {
        self.colors
    }

    /// Color of pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the image. [`Pixellation::get_color`]
    /// returns `None` instead.
    pub fn color_at(&self, x: u32, y: u32) -> Color {
        match self.get_color(x, y) {
            Some(color) => color,
            None => panic!("pixel ({x}, {y}) outside {}x{} pixellation", self.width, self.height),
        }
    }

    pub fn get_color(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.colors[y as usize * self.width as usize + x as usize])
    }

    /// Average color of block `(column, row)`.
    ///
    /// # Panics
    ///
    /// Panics if the block is outside the grid; see
    /// [`Pixellation::get_block_color`].
    pub fn block_color(&self, column: u32, row: u32) -> Color {
        match self.get_block_color(column, row) {
            Some(color) => color,
            None => panic!(
                "block ({column}, {row}) outside {}x{} grid",
                self.grid.columns(),
                self.grid.rows()
            ),
        }
    }

    pub fn get_block_color(&self, column: u32, row: u32) -> Option<Color> {
        if column >= self.grid.columns() || row >= self.grid.rows() {
            return None;
        }
        let cell = self.grid.cell_rect(column, row);
        self.get_color(cell.x, cell.y)
    }

    /// One color per block, row-major over the grid.
    pub fn block_colors(&self) -> Vec<Color> {
        self.grid
            .cells()
            .map(|cell| self.color_at(cell.x, cell.y))
            .collect()
    }

    /// Renders the mosaic back into an 8-bit image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (pixel, color) in out.pixels_mut().zip(&self.colors) {
            *pixel = Rgba::from(*color);
        }
        out
    }
}
