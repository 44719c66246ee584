pub const SIDE: usize = 5;
pub const CELL_COUNT: usize = SIDE * SIDE;

/// Row-major 5x5 board. A cell holds the emoji that was placed there, or
/// `None` while empty. Written cells are never overwritten.
pub type Board = Vec<Option<String>>;

const MAIN_DIAGONAL: [usize; SIDE] = [0, 6, 12, 18, 24];
const ANTI_DIAGONAL: [usize; SIDE] = [4, 8, 12, 16, 20];

pub fn empty_board() -> Board {
    vec![None; CELL_COUNT]
}

pub fn in_bounds(index: usize) -> bool {
    index < CELL_COUNT
}

/// Returns the five cell indices completed by `emoji`, if any. Checked in
/// fixed order: rows, columns, main diagonal, anti-diagonal.
pub fn winning_line(board: &[Option<String>], emoji: &str) -> Option<[usize; SIDE]> {
    let holds = |i: usize| board[i].as_deref() == Some(emoji);

    for row in 0..SIDE {
        let start = row * SIDE;
        if (start..start + SIDE).all(|i| holds(i)) {
            return Some([start, start + 1, start + 2, start + 3, start + 4]);
        }
    }

    for col in 0..SIDE {
        if (0..SIDE).all(|step| holds(col + step * SIDE)) {
            return Some([
                col,
                col + SIDE,
                col + 2 * SIDE,
                col + 3 * SIDE,
                col + 4 * SIDE,
            ]);
        }
    }

    if MAIN_DIAGONAL.iter().all(|&i| holds(i)) {
        return Some(MAIN_DIAGONAL);
    }
    if ANTI_DIAGONAL.iter().all(|&i| holds(i)) {
        return Some(ANTI_DIAGONAL);
    }

    None
}
