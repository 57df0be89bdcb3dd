//! Text rendering of die faces with a drop shadow.

const PIP_ROWS: usize = 3;
const PIP_COLS: usize = 3;
const INNER_WIDTH: usize = PIP_COLS * 2 + 1;
const FACE_HEIGHT: usize = PIP_ROWS + 2;
const FACE_WIDTH: usize = INNER_WIDTH + 2;
const SHADOW_OFFSET: usize = 1;
const PIP_CHAR: char = '●';
const SHADOW_CHAR: char = '░';

type Face = [&'static str; PIP_ROWS];

const FACES: [Face; 6] = [
    ["   ", " 1 ", "   "],
    ["1  ", "   ", "  1"],
    ["1  ", " 1 ", "  1"],
    ["1 1", "   ", "1 1"],
    ["1 1", " 1 ", "1 1"],
    ["1 1", "1 1", "1 1"],
];

/// Lines for the face showing `value`. Anything outside 1..=6 renders blank.
pub fn render(value: u8) -> Vec<String> {
    let face = usize::from(value)
        .checked_sub(1)
        .and_then(|index| FACES.get(index));
    let mut canvas = vec![vec![' '; FACE_WIDTH + SHADOW_OFFSET]; FACE_HEIGHT + SHADOW_OFFSET];

    paint_shadow(&mut canvas);
    paint_frame(&mut canvas);
    if let Some(face) = face {
        paint_pips(&mut canvas, face);
    }

    canvas
        .into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect()
}

/// Face to show on animation frame `tick` while the die is still spinning.
pub fn spinning(tick: u64) -> Vec<String> {
    render((tick % 6) as u8 + 1)
}

/// Height in rows of a rendered face.
pub fn height() -> usize {
    FACE_HEIGHT + SHADOW_OFFSET
}

fn paint_frame(canvas: &mut [Vec<char>]) {
    let right = FACE_WIDTH - 1;
    let bottom = FACE_HEIGHT - 1;
    for x in 1..right {
        canvas[0][x] = '─';
        canvas[bottom][x] = '─';
    }
    for row in canvas.iter_mut().take(bottom).skip(1) {
        row[0] = '│';
        row[right] = '│';
        for cell in row.iter_mut().take(right).skip(1) {
            *cell = ' ';
        }
    }
    canvas[0][0] = '╭';
    canvas[0][right] = '╮';
    canvas[bottom][0] = '╰';
    canvas[bottom][right] = '╯';
}

fn paint_shadow(canvas: &mut [Vec<char>]) {
    for y in SHADOW_OFFSET..FACE_HEIGHT + SHADOW_OFFSET {
        for x in SHADOW_OFFSET..FACE_WIDTH + SHADOW_OFFSET {
            place(canvas, y, x, SHADOW_CHAR);
        }
    }
}

fn paint_pips(canvas: &mut [Vec<char>], face: &Face) {
    for (row_idx, row) in face.iter().enumerate() {
        for (col_idx, symbol) in row.chars().enumerate() {
            if symbol != '1' {
                continue;
            }
            place(canvas, row_idx + 1, 2 + col_idx * 2, PIP_CHAR);
        }
    }
}

fn place(canvas: &mut [Vec<char>], y: usize, x: usize, ch: char) {
    if y >= canvas.len() || x >= canvas[y].len() {
        return;
    }
    canvas[y][x] = ch;
}
