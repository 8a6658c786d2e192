//! CPU implementation of both reductions.
//!
//! Parallelised over block rows / scan lines with rayon. Used when no GPU is
//! available and as the reference the GPU kernels are checked against.

use rayon::prelude::*;
use tracing::debug;

use crate::processing::color::Color;
use crate::processing::extents::{ContentMatcher, EdgeExtents, ScanningParameters, UNSET_MAX, UNSET_MIN};
use crate::processing::grid::{BlockGrid, BlockSize, CellRect};
use crate::processing::pixellation::Pixellation;
use crate::processing::source::SourceImage;

pub fn pixellate(image: &SourceImage, block_size: BlockSize) -> Pixellation {
    let width = image.width();
    let height = image.height();
    let grid = BlockGrid::new(width, height, block_size);
    let columns = grid.columns();

    let averages: Vec<Color> = (0..grid.rows())
        .into_par_iter()
        .flat_map_iter(|row| (0..columns).map(move |col| block_average(image, grid.cell_rect(col, row))))
        .collect();

    let mut colors = vec![Color::default(); image.pixel_count()];
    let block = block_size.get();
    colors
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, line)| {
            let block_row = &averages[(y as u32 / block * columns) as usize..][..columns as usize];
            for (x, slot) in line.iter_mut().enumerate() {
                *slot = block_row[x / block as usize];
            }
        });

    debug!(
        width,
        height,
        block = block,
        blocks = averages.len(),
        "cpu pixellation complete"
    );
    Pixellation::new(width, height, grid, colors)
}

fn block_average(image: &SourceImage, cell: CellRect) -> Color {
    let mut sums = [0u64; 4];
    for y in cell.y..cell.y + cell.height {
        let line = &image.row(y)[cell.x as usize..(cell.x + cell.width) as usize];
        for pixel in line {
            for (sum, &channel) in sums.iter_mut().zip(pixel) {
                *sum += u64::from(channel);
            }
        }
    }
    Color::from_block_sums(sums, cell.area())
}

pub fn find_edges(image: &SourceImage, params: &ScanningParameters) -> EdgeExtents {
    let matcher = params.matcher();
    let width = image.width();
    let height = image.height();

    let (column_top, column_bottom) = column_extents(image, matcher);
    let (row_left, row_right): (Vec<u32>, Vec<u32>) = (0..height)
        .into_par_iter()
        .map(|y| scan_row(image.row(y), matcher))
        .unzip();

    let extents = EdgeExtents::reduce(&column_top, &column_bottom, &row_left, &row_right);
    debug!(width, height, ?extents, "cpu edge scan complete");
    extents
}

/// First and last content row of every column.
///
/// Walks the image row by row so each worker reads contiguous memory, then
/// merges the per-worker partial extents elementwise.
fn column_extents(image: &SourceImage, matcher: ContentMatcher) -> (Vec<u32>, Vec<u32>) {
    let width = image.width() as usize;
    let unset = || (vec![UNSET_MIN; width], vec![UNSET_MAX; width]);
    (0..image.height())
        .into_par_iter()
        .fold(unset, |(mut top, mut bottom), y| {
            for (x, &pixel) in image.row(y).iter().enumerate() {
                if matcher.is_content(pixel) {
                    top[x] = top[x].min(y);
                    bottom[x] = bottom[x].max(y);
                }
            }
            (top, bottom)
        })
        .reduce(unset, |(mut top, mut bottom), (other_top, other_bottom)| {
            for (t, o) in top.iter_mut().zip(other_top) {
                *t = (*t).min(o);
            }
            for (b, o) in bottom.iter_mut().zip(other_bottom) {
                *b = (*b).max(o);
            }
            (top, bottom)
        })
}

fn scan_row(line: &[[u8; 4]], matcher: ContentMatcher) -> (u32, u32) {
    first_and_last(line.len() as u32, |x| matcher.is_content(line[x as usize]))
}

/// First and last index in `0..len` satisfying `hit`, or the sentinels.
fn first_and_last(len: u32, hit: impl Fn(u32) -> bool) -> (u32, u32) {
    match (0..len).find(|&i| hit(i)) {
        Some(first) => {
            let last = (first..len).rev().find(|&i| hit(i)).unwrap_or(first);
            (first, last)
        }
        None => (UNSET_MIN, UNSET_MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn first_and_last_handles_single_and_missing_hits() {
        assert_eq!(first_and_last(5, |i| i == 3), (3, 3));
        assert_eq!(first_and_last(5, |i| i == 1 || i == 4), (1, 4));
        assert_eq!(first_and_last(5, |_| false), (UNSET_MIN, UNSET_MAX));
        assert_eq!(first_and_last(0, |_| true), (UNSET_MIN, UNSET_MAX));
    }

    #[test]
    fn column_extents_match_per_column_scan() {
        let img = RgbaImage::from_fn(53, 97, |x, y| {
            let hit = (x * 31 + y * 17) % 23 == 0 && x % 7 != 3;
            Rgba(if hit { [255, 0, 0, 255] } else { [0, 0, 0, 255] })
        });
        let image = SourceImage::new(img).unwrap();
        let params = ScanningParameters::exact(Color::BLACK).unwrap();
        let matcher = params.matcher();

        let (top, bottom) = column_extents(&image, matcher);
        assert_eq!(top.len(), 53);
        for x in 0..image.width() {
            let expected = first_and_last(image.height(), |y| matcher.is_content(image.pixel(x, y)));
            assert_eq!((top[x as usize], bottom[x as usize]), expected, "column {x}");
        }
        // columns with x % 7 == 3 never hold content
        assert_eq!((top[3], bottom[3]), (UNSET_MIN, UNSET_MAX));
    }
}
