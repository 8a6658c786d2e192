use std::fmt;

use serde::Deserialize;

use crate::error::{ReduceError, Result};

/// Side length of a pixellation block, in pixels.
///
/// Any positive size is valid. A block larger than the image covers the whole
/// image, so the result is a single cell holding the image average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "i64")]
pub struct BlockSize(u32);

impl BlockSize {
    pub fn new(value: u32) -> Result<Self> {
        Self::try_from(i64::from(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for BlockSize {
    type Error = ReduceError;

    fn try_from(value: i64) -> Result<Self> {
        if value < 1 {
            return Err(ReduceError::invalid(
                "block_size",
                format!("must be at least 1, got {value}"),
            ));
        }
        // anything past u32::MAX already covers every representable image
        Ok(Self(u32::try_from(value).unwrap_or(u32::MAX)))
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self(16)
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pixel rectangle covered by one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// Partition of a `width x height` image into square blocks.
///
/// Blocks on the right and bottom edges are clipped to the image, so every
/// pixel lands in exactly one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    width: u32,
    height: u32,
    block: u32,
}

impl BlockGrid {
    pub fn new(width: u32, height: u32, block_size: BlockSize) -> Self {
        Self {
            width,
            height,
            block: block_size.get(),
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block
    }

    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.block)
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.block)
    }

    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block `(column, row)` owning pixel `(x, y)`.
    pub fn cell_of(&self, x: u32, y: u32) -> (u32, u32) {
        (x / self.block, y / self.block)
    }

    pub fn cell_rect(&self, column: u32, row: u32) -> CellRect {
        let x = column * self.block;
        let y = row * self.block;
        CellRect {
            x,
            y,
            width: self.block.min(self.width.saturating_sub(x)),
            height: self.block.min(self.height.saturating_sub(y)),
        }
    }

    /// Row-major iterator over every cell.
    pub fn cells(&self) -> impl Iterator<Item = CellRect> + '_ {
        (0..self.rows()).flat_map(move |row| (0..self.columns()).map(move |col| self.cell_rect(col, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_rejects_non_positive_values() {
        for bad in [0i64, -1, -64] {
            let err = BlockSize::try_from(bad).unwrap_err();
            assert!(matches!(
                err,
                ReduceError::InvalidParameter {
                    name: "block_size",
                    ..
                }
            ));
        }
        assert!(BlockSize::new(0).is_err());
        assert_eq!(BlockSize::new(1).unwrap().get(), 1);
    }

    #[test]
    fn block_size_has_no_upper_bound() {
        assert_eq!(BlockSize::new(5000).unwrap().get(), 5000);
        assert_eq!(BlockSize::new(u32::MAX).unwrap().get(), u32::MAX);
        assert_eq!(BlockSize::try_from(i64::MAX).unwrap().get(), u32::MAX);

        let grid = BlockGrid::new(10, 10, BlockSize::new(u32::MAX).unwrap());
        assert_eq!((grid.columns(), grid.rows()), (1, 1));
        let cell = grid.cell_rect(0, 0);
        assert_eq!((cell.x, cell.y, cell.width, cell.height), (0, 0, 10, 10));
        assert_eq!(grid.cell_of(9, 9), (0, 0));
    }

    #[test]
    fn cells_cover_every_pixel_once() {
        for (w, h, n) in [(17, 9, 4), (8, 8, 8), (1, 1, 3), (30, 7, 1), (5, 12, 16)] {
            let grid = BlockGrid::new(w, h, BlockSize::new(n).unwrap());
            let mut hits = vec![0u32; (w * h) as usize];
            for cell in grid.cells() {
                for y in cell.y..cell.y + cell.height {
                    for x in cell.x..cell.x + cell.width {
                        hits[(y * w + x) as usize] += 1;
                    }
                }
            }
            assert!(hits.iter().all(|&c| c == 1), "{w}x{h} block {n}");
            let total: u64 = grid.cells().map(|c| c.area()).sum();
            assert_eq!(total, u64::from(w * h));
        }
    }

    #[test]
    fn edge_cells_are_clipped() {
        let grid = BlockGrid::new(10, 5, BlockSize::new(4).unwrap());
        assert_eq!((grid.columns(), grid.rows()), (3, 2));
        assert_eq!(grid.len(), 6);
        let corner = grid.cell_rect(2, 1);
        assert_eq!((corner.x, corner.y, corner.width, corner.height), (8, 4, 2, 1));
    }

    #[test]
    fn cell_of_agrees_with_cell_rect() {
        let grid = BlockGrid::new(13, 11, BlockSize::new(5).unwrap());
        for y in 0..11 {
            for x in 0..13 {
                let (col, row) = grid.cell_of(x, y);
                assert!(grid.cell_rect(col, row).contains(x, y));
            }
        }
    }

    #[test]
    fn block_size_deserializes_with_validation() {
        let size: BlockSize = serde_yaml::from_str("24").unwrap();
        assert_eq!(size.get(), 24);
        assert!(serde_yaml::from_str::<BlockSize>("0").is_err());
        assert!(serde_yaml::from_str::<BlockSize>("-8").is_err());
        assert_eq!(serde_yaml::from_str::<BlockSize>("5000").unwrap().get(), 5000);
    }
}
