//! Traversal order strategies over a task-unit grid (spec.md §4.6): eight
//! line-scan reading orders (with an optional snake toggle) and a
//! center-out spiral in either chirality. Both produce the same thing — a
//! `Vec<usize>` of grid indices, each visited exactly once — so a task
//! manager is fully described by [`TaskManager::order`].

use crate::grid::TaskGrid;

/// One of the eight reading orders named in spec.md §4.6. The first pair of
/// letters is the intra-row (or intra-column) scan direction, the second
/// pair is the direction rows (or columns) themselves are traversed in —
/// `Lrtb` reads "each row left-to-right, rows top-to-bottom"; `Tbrl` reads
/// "each column top-to-bottom, columns right-to-left".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOrder {
    Lrtb,
    Lrbt,
    Rltb,
    Rlbt,
    Tblr,
    Tbrl,
    Btlr,
    Btrl,
}

impl LineOrder {
    /// `(row_major, x_ascending, y_ascending)`: row-major orders scan a
    /// full row of `x` before advancing `y`; column-major orders scan a
    /// full column of `y` before advancing `x`.
    fn axes(self) -> (bool, bool, bool) {
        match self {
            LineOrder::Lrtb => (true, true, true),
            LineOrder::Lrbt => (true, true, false),
            LineOrder::Rltb => (true, false, true),
            LineOrder::Rlbt => (true, false, false),
            LineOrder::Tblr => (false, true, true),
            LineOrder::Tbrl => (false, false, true),
            LineOrder::Btlr => (false, true, false),
            LineOrder::Btrl => (false, false, false),
        }
    }
}

/// Spiral chirality (spec.md §4.6): `Trigonometric` turns counterclockwise
/// (the mathematical convention, angles increasing); `Inverse` turns
/// clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chirality {
    Trigonometric,
    Inverse,
}

/// The task-manager variant (spec.md §4.6): either a line scan (optionally
/// snaked) or a center-out spiral.
#[derive(Clone, Copy, Debug)]
pub enum TaskManager {
    Line { order: LineOrder, snake: bool },
    Spiral { chirality: Chirality },
}

impl TaskManager {
    /// The grid-index traversal order for a `cols * rows` grid; every index
    /// in `0..cols*rows` appears exactly once (spec.md §8 properties 10-11).
    pub fn order(&self, grid: &TaskGrid) -> Vec<usize> {
        match self {
            TaskManager::Line { order, snake } => line_order(grid, *order, *snake),
            TaskManager::Spiral { chirality } => spiral_order(grid, *chirality),
        }
    }
}

fn line_order(grid: &TaskGrid, order: LineOrder, snake: bool) -> Vec<usize> {
    let (row_major, x_ascending, y_ascending) = order.axes();
    let cols = grid.cols();
    let rows = grid.rows();
    let mut out = Vec::with_capacity(cols * rows);
    if row_major {
        for outer in 0..rows {
            let y = if y_ascending { outer } else { rows - 1 - outer };
            let flip = snake && outer % 2 == 1;
            for inner in 0..cols {
                let x = if x_ascending != flip { inner } else { cols - 1 - inner };
                out.push(grid.index_of(x, y));
            }
        }
    } else {
        for outer in 0..cols {
            let x = if x_ascending { outer } else { cols - 1 - outer };
            let flip = snake && outer % 2 == 1;
            for inner in 0..rows {
                let y = if y_ascending != flip { inner } else { rows - 1 - inner };
                out.push(grid.index_of(x, y));
            }
        }
    }
    out
}

/// Classical step-doubling spiral: walk 1 step, turn, 1 step, turn, 2
/// steps, turn, 2 steps, turn, 3 steps, ... starting from the grid's center
/// and growing outward. This enumerates an infinite grid without ever
/// revisiting a cell; restricting to the finite `cols * rows` rectangle
/// just means out-of-bounds steps are skipped rather than emitted — "outside
/// the image is treated as turnable" (spec.md §4.6) falls out naturally
/// since the turn schedule never depends on what is or isn't in bounds.
fn spiral_order(grid: &TaskGrid, chirality: Chirality) -> Vec<usize> {
    let cols = grid.cols() as isize;
    let rows = grid.rows() as isize;
    let total = (cols * rows) as usize;
    let mut out = Vec::with_capacity(total);
    if total == 0 {
        return out;
    }

    // Trigonometric (CCW) cycles right -> up -> left -> down; inverse (CW)
    // cycles right -> down -> left -> up.
    let directions: [(isize, isize); 4] = match chirality {
        Chirality::Trigonometric => [(1, 0), (0, -1), (-1, 0), (0, 1)],
        Chirality::Inverse => [(1, 0), (0, 1), (-1, 0), (0, -1)],
    };

    let mut x = (cols - 1) / 2;
    let mut y = (rows - 1) / 2;
    let in_bounds = |x: isize, y: isize| x >= 0 && x < cols && y >= 0 && y < rows;
    if in_bounds(x, y) {
        out.push((y * cols + x) as usize);
    }

    let mut dir_index = 0usize;
    let mut leg_length = 1usize;
    // Bound on ring radius: once the spiral's square has grown past both
    // dimensions, every remaining in-bounds cell has necessarily been
    // emitted, so this cannot run away even if `total` were miscomputed.
    let max_leg = cols.max(rows) as usize * 2 + 2;

    'rings: while out.len() < total {
        for _ in 0..2 {
            let (dx, dy) = directions[dir_index % 4];
            for _ in 0..leg_length {
                x += dx;
                y += dy;
                if in_bounds(x, y) {
                    out.push((y * cols + x) as usize);
                }
            }
            dir_index += 1;
            if out.len() >= total {
                break 'rings;
            }
        }
        leg_length += 1;
        if leg_length > max_leg {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Area;

    fn grid(cols_px: usize, rows_px: usize) -> TaskGrid {
        TaskGrid::new(Area::whole_image(cols_px, rows_px), 1, 1)
    }

    fn assert_permutation(order: &[usize], total: usize) {
        assert_eq!(order.len(), total);
        let mut seen = vec![false; total];
        for &i in order {
            assert!(!seen[i], "index {i} repeated");
            seen[i] = true;
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn every_line_order_visits_every_cell_exactly_once() {
        let g = grid(5, 4);
        let orders = [
            LineOrder::Lrtb,
            LineOrder::Lrbt,
            LineOrder::Rltb,
            LineOrder::Rlbt,
            LineOrder::Tblr,
            LineOrder::Tbrl,
            LineOrder::Btlr,
            LineOrder::Btrl,
        ];
        for order in orders {
            for snake in [false, true] {
                let result = line_order(&g, order, snake);
                assert_permutation(&result, 20);
            }
        }
    }

    #[test]
    fn lrtb_is_plain_row_major_ascending() {
        let g = grid(3, 2);
        let result = line_order(&g, LineOrder::Lrtb, false);
        assert_eq!(result, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn snake_reverses_every_other_row() {
        let g = grid(3, 3);
        let result = line_order(&g, LineOrder::Lrtb, true);
        assert_eq!(result, vec![0, 1, 2, 5, 4, 3, 6, 7, 8]);
    }

    #[test]
    fn spiral_visits_every_cell_exactly_once_square_and_rectangular() {
        for (w, h) in [(5, 5), (6, 6), (7, 4), (4, 7), (1, 1), (1, 5), (9, 3)] {
            let g = grid(w, h);
            for chirality in [Chirality::Trigonometric, Chirality::Inverse] {
                let result = spiral_order(&g, chirality);
                assert_permutation(&result, w * h);
            }
        }
    }

    #[test]
    fn spiral_starts_at_the_grid_center() {
        let g = grid(5, 5);
        let result = spiral_order(&g, Chirality::Trigonometric);
        assert_eq!(result[0], g.index_of(2, 2));
    }
}
