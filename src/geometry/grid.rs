use super::{Rect, Size};

/// Upper bound on a configured column or slat count, before doubling.
pub const MAX_REQUESTED: u32 = 256;

/// Requested count limited so every slot keeps at least one pixel.
fn clamp_request(requested: u32, extent: u32) -> u32 {
    requested.clamp(1, (extent / 2).clamp(1, MAX_REQUESTED))
}

/// Square-ish grid over the target surface.
///
/// The requested column count is doubled and rows are chosen so cells stay
/// close to square. Requests wider than half the frame are capped. Cells are integer-sized; the last column and row absorb
/// the division remainder so the grid tiles the frame exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    pub width: u32,
    pub height: u32,
    pub cols: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub col: u32,
    pub row: u32,
    pub rect: Rect,
}

impl BlockGrid {
    pub fn new(width: u32, height: u32, requested_cols: u32) -> Self {
        let cols = clamp_request(requested_cols, width) * 2;
        let rows = if width == 0 {
            2
        } else {
            ((cols as f32 * height as f32 / width as f32).round() as u32).max(2)
        };
        Self {
            width,
            height,
            cols,
            rows,
        }
    }

    pub fn for_size(size: Size, requested_cols: u32) -> Self {
        Self::new(size.width, size.height, requested_cols)
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn cell_rect(&self, col: u32, row: u32) -> Rect {
        let (x, w) = span(self.width, self.cols, col);
        let (y, h) = span(self.height, self.rows, row);
        Rect::new(x as f32, y as f32, w as f32, h as f32)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| GridCell {
                col,
                row,
                rect: self.cell_rect(col, row),
            })
        })
    }
}

/// Offset and length of slot `index` when `extent` is divided into `count`
/// integer slots, with the last slot taking the remainder.
fn span(extent: u32, count: u32, index: u32) -> (u32, u32) {
    let unit = extent / count.max(1);
    let offset = index * unit;
    let len = if index + 1 >= count {
        extent.saturating_sub(offset)
    } else {
        unit
    };
    (offset, len)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripAxis {
    /// Vertical slats laid out left to right.
    Columns,
    /// Horizontal slats laid out top to bottom.
    Rows,
}

/// One-dimensional partition into `requested·2` slats spanning the frame.
pub fn strips(size: Size, requested: u32, axis: StripAxis) -> Vec<Rect> {
    let extent = match axis {
        StripAxis::Columns => size.width,
        StripAxis::Rows => size.height,
    };
    let count = clamp_request(requested, extent) * 2;
    (0..count)
        .map(|i| match axis {
            StripAxis::Columns => {
                let (x, w) = span(size.width, count, i);
                Rect::new(x as f32, 0.0, w as f32, size.height as f32)
            }
            StripAxis::Rows => {
                let (y, h) = span(size.height, count, i);
                Rect::new(0.0, y as f32, size.width as f32, h as f32)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_grid_dimensions() {
        let grid = BlockGrid::new(600, 400, 4);
        assert_eq!(grid.cols, 8);
        assert_eq!(grid.rows, 5);
        assert_eq!(grid.cell_count(), 40);
        assert_eq!(grid.cells().count(), 40);
        let first = grid.cells().next().unwrap();
        assert_eq!((first.col, first.row), (0, 0));
        assert_eq!((first.rect.x, first.rect.y), (0.0, 0.0));
        assert_eq!((first.rect.width, first.rect.height), (75.0, 80.0));
    }

    #[test]
    fn rows_never_drop_below_two() {
        let grid = BlockGrid::new(1000, 50, 1);
        assert_eq!(grid.cols, 2);
        assert_eq!(grid.rows, 2);
    }

    #[test]
    fn cells_tile_the_frame_exactly() {
        for &(w, h, c) in &[(601, 397, 4), (1920, 1080, 7), (33, 77, 5), (5, 5, 9)] {
            let grid = BlockGrid::new(w, h, c);
            let area: f32 = grid.cells().map(|cell| cell.rect.area()).sum();
            assert_eq!(area as u64, w as u64 * h as u64, "{w}x{h} c={c}");
            let last = grid.cell_rect(grid.cols - 1, grid.rows - 1);
            assert_eq!(last.right(), w as f32);
            assert_eq!(last.bottom(), h as f32);
        }
    }

    #[test]
    fn oversized_requests_are_capped() {
        let grid = BlockGrid::new(600, 400, u32::MAX);
        assert_eq!(grid.cols, MAX_REQUESTED * 2);
        assert_eq!(grid.cells().count(), grid.cell_count());

        let narrow = BlockGrid::new(10, 400, 50);
        assert_eq!(narrow.cols, 10);
        assert!(narrow.cells().all(|cell| cell.rect.width >= 1.0));

        assert_eq!(strips(Size::new(100, 8), u32::MAX, StripAxis::Rows).len(), 8);
        assert_eq!(strips(Size::new(0, 8), 3, StripAxis::Columns).len(), 2);
    }

    #[test]
    fn strips_absorb_remainder() {
        let slats = strips(Size::new(100, 50), 3, StripAxis::Columns);
        assert_eq!(slats.len(), 6);
        assert_eq!(slats[0].width, 16.0);
        assert_eq!(slats[5].x, 80.0);
        assert_eq!(slats[5].width, 20.0);
    }
}
