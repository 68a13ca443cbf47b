//! Betting board topology.
//!
//! [`generate_board`] builds every biddable cell of a single-zero table: the
//! 37 straight numbers, the inside combinations derived from the 12×3 grid
//! (splits, corners, streets, lines) and the outside bets (halves, columns,
//! dozens, parity and color). Every cell carries its own canonical number set;
//! settlement never looks at anything else.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, sync::LazyLock};

use super::{
    errors::{RouletteError, RouletteResult},
    wheel::{MAX_NUMBER, RED_NUMBERS},
};

/// Rows of the number grid.
pub const GRID_ROWS: u8 = 12;

/// Columns of the number grid.
pub const GRID_COLUMNS: u8 = 3;

/// Kind of wager. Each kind has one payout and one cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Straight,
    Split,
    Street,
    Corner,
    /// Double street: two consecutive rows
    Line,
    Column,
    Dozen,
    /// 1 to 18 or 19 to 36
    Half,
    /// Even or odd
    Parity,
    /// Red or black
    Color,
}

impl BetType {
    /// Every bet type, inside bets first.
    pub const ALL: [BetType; 10] = [
        BetType::Straight,
        BetType::Split,
        BetType::Street,
        BetType::Corner,
        BetType::Line,
        BetType::Column,
        BetType::Dozen,
        BetType::Half,
        BetType::Parity,
        BetType::Color,
    ];

    /// Profit multiple paid on a win, stake excluded.
    pub const fn odds(self) -> u32 {
        match self {
            BetType::Straight => 35,
            BetType::Split => 17,
            BetType::Street => 11,
            BetType::Corner => 8,
            BetType::Line => 5,
            BetType::Column | BetType::Dozen => 2,
            BetType::Half | BetType::Parity | BetType::Color => 1,
        }
    }

    /// How many numbers a cell of this type covers.
    pub const fn cardinality(self) -> usize {
        match self {
            BetType::Straight => 1,
            BetType::Split => 2,
            BetType::Street => 3,
            BetType::Corner => 4,
            BetType::Line => 6,
            BetType::Column | BetType::Dozen => 12,
            BetType::Half | BetType::Parity | BetType::Color => 18,
        }
    }

    /// Inside bets sit on the number grid itself.
    pub const fn is_inside(self) -> bool {
        matches!(
            self,
            BetType::Straight | BetType::Split | BetType::Street | BetType::Corner | BetType::Line
        )
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Straight => write!(f, "straight"),
            BetType::Split => write!(f, "split"),
            BetType::Street => write!(f, "street"),
            BetType::Corner => write!(f, "corner"),
            BetType::Line => write!(f, "line"),
            BetType::Column => write!(f, "column"),
            BetType::Dozen => write!(f, "dozen"),
            BetType::Half => write!(f, "half"),
            BetType::Parity => write!(f, "parity"),
            BetType::Color => write!(f, "color"),
        }
    }
}

impl std::str::FromStr for BetType {
    type Err = RouletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BetType::ALL
            .into_iter()
            .find(|bet_type| bet_type.to_string() == s)
            .ok_or_else(|| RouletteError::validation(format!("unknown bet type {s:?}")))
    }
}

/// Identity of a cell: its bet type plus its sorted numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub bet_type: BetType,
    pub numbers: BTreeSet<u8>,
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.bet_type)?;
        for (i, n) in self.numbers.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{n}")?;
        }
        Ok(())
    }
}

/// A biddable area of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub label: String,
    pub numbers: BTreeSet<u8>,
    pub bet_type: BetType,
    pub odds: u32,
}

impl Cell {
    /// Build a cell, checking the number set against the bet type.
    ///
    /// # Errors
    ///
    /// * `RouletteError::Validation` - Empty set, number above 36, wrong
    ///   cardinality, or zero outside a straight bet
    pub fn new(
        label: impl Into<String>,
        numbers: impl IntoIterator<Item = u8>,
        bet_type: BetType,
    ) -> RouletteResult<Self> {
        let numbers: BTreeSet<u8> = numbers.into_iter().collect();

        if numbers.is_empty() {
            return Err(RouletteError::validation("cell covers no numbers"));
        }
        if let Some(n) = numbers.iter().find(|&&n| n > MAX_NUMBER) {
            return Err(RouletteError::validation(format!(
                "number {n} is not on the wheel"
            )));
        }
        if numbers.len() != bet_type.cardinality() {
            return Err(RouletteError::validation(format!(
                "{bet_type} bet must cover {} numbers, got {}",
                bet_type.cardinality(),
                numbers.len()
            )));
        }
        if bet_type != BetType::Straight && numbers.contains(&0) {
            return Err(RouletteError::validation(format!(
                "zero cannot be part of a {bet_type} bet"
            )));
        }

        Ok(Self {
            label: label.into(),
            numbers,
            bet_type,
            odds: bet_type.odds(),
        })
    }

    pub fn key(&self) -> CellKey {
        CellKey {
            bet_type: self.bet_type,
            numbers: self.numbers.clone(),
        }
    }

    pub fn covers(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }
}

/// The whole board, grouped the way the table is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// 1 to 18, 19 to 36
    pub outside_bets: Vec<Cell>,
    /// 12 rows of 3 straight cells, `[1, 2, 3]` first
    pub number_board_rows: Vec<Vec<Cell>>,
    pub zero_cell: Cell,
    pub column_bets: Vec<Cell>,
    pub dozen_bets: Vec<Cell>,
    /// EVEN, RED, BLACK, ODD
    pub even_odd_red_black: Vec<Cell>,
    pub split_bets: Vec<Cell>,
    pub corner_bets: Vec<Cell>,
    pub street_bets: Vec<Cell>,
    pub double_street_bets: Vec<Cell>,
}

impl Board {
    /// Iterate every cell on the board.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.outside_bets
            .iter()
            .chain(self.number_board_rows.iter().flatten())
            .chain(std::iter::once(&self.zero_cell))
            .chain(&self.column_bets)
            .chain(&self.dozen_bets)
            .chain(&self.even_odd_red_black)
            .chain(&self.split_bets)
            .chain(&self.corner_bets)
            .chain(&self.street_bets)
            .chain(&self.double_street_bets)
    }

    /// Find the canonical cell for a key.
    pub fn find(&self, key: &CellKey) -> Option<&Cell> {
        self.cells()
            .find(|cell| cell.bet_type == key.bet_type && cell.numbers == key.numbers)
    }

    /// Straight cell for `number`, zero included.
    pub fn straight(&self, number: u8) -> Option<&Cell> {
        if number == 0 {
            return Some(&self.zero_cell);
        }
        self.number_board_rows
            .iter()
            .flatten()
            .find(|cell| cell.covers(number))
    }

    /// Outside cell by its label (`RED`, `1 to 12`, ...).
    pub fn outside(&self, label: &str) -> Option<&Cell> {
        self.cells()
            .filter(|cell| !cell.bet_type.is_inside())
            .find(|cell| cell.label == label)
    }
}

static BOARD: LazyLock<Board> = LazyLock::new(generate_board);

/// Memoized board shared by every caller.
pub fn board() -> &'static Board {
    &BOARD
}

fn grid_number(row: u8, col: u8) -> u8 {
    row * GRID_COLUMNS + col + 1
}

fn joined(numbers: &[u8], sep: &str) -> String {
    numbers
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

// Every generated set satisfies `Cell::new`, so construction cannot fail here.
fn cell(label: impl Into<String>, numbers: &[u8], bet_type: BetType) -> Cell {
    let numbers: BTreeSet<u8> = numbers.iter().copied().collect();
    Cell {
        label: label.into(),
        numbers,
        bet_type,
        odds: bet_type.odds(),
    }
}

/// Generate the full board.
///
/// Pure and deterministic; [`board`] caches the result.
pub fn generate_board() -> Board {
    let outside_bets = vec![
        cell("1 to 18", &(1..=18).collect::<Vec<u8>>(), BetType::Half),
        cell("19 to 36", &(19..=36).collect::<Vec<u8>>(), BetType::Half),
    ];

    let number_board_rows = (0..GRID_ROWS)
        .map(|row| {
            (0..GRID_COLUMNS)
                .map(|col| {
                    let n = grid_number(row, col);
                    cell(n.to_string(), &[n], BetType::Straight)
                })
                .collect()
        })
        .collect();

    let zero_cell = cell("0", &[0], BetType::Straight);

    // Top line of the felt first: 3, 6, ..., 36.
    let column_bets = [0u8, 2, 1]
        .into_iter()
        .map(|residue| {
            let numbers: Vec<u8> = (1..=MAX_NUMBER).filter(|n| n % 3 == residue).collect();
            cell("2 to 1", &numbers, BetType::Column)
        })
        .collect();

    let dozen_bets = (0..3u8)
        .map(|dozen| {
            let first = dozen * 12 + 1;
            let last = first + 11;
            let numbers: Vec<u8> = (first..=last).collect();
            cell(format!("{first} to {last}"), &numbers, BetType::Dozen)
        })
        .collect();

    let evens: Vec<u8> = (1..=MAX_NUMBER).filter(|n| n % 2 == 0).collect();
    let odds: Vec<u8> = (1..=MAX_NUMBER).filter(|n| n % 2 == 1).collect();
    let blacks: Vec<u8> = (1..=MAX_NUMBER)
        .filter(|n| !RED_NUMBERS.contains(n))
        .collect();
    let even_odd_red_black = vec![
        cell("EVEN", &evens, BetType::Parity),
        cell("RED", &RED_NUMBERS, BetType::Color),
        cell("BLACK", &blacks, BetType::Color),
        cell("ODD", &odds, BetType::Parity),
    ];

    let mut split_bets = Vec::new();
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLUMNS {
            let n = grid_number(row, col);
            if col + 1 < GRID_COLUMNS {
                split_bets.push(cell(format!("{n}-{}", n + 1), &[n, n + 1], BetType::Split));
            }
            if row + 1 < GRID_ROWS {
                split_bets.push(cell(format!("{n}-{}", n + 3), &[n, n + 3], BetType::Split));
            }
        }
    }

    let mut corner_bets = Vec::new();
    for row in 0..GRID_ROWS - 1 {
        for col in 0..GRID_COLUMNS - 1 {
            let n = grid_number(row, col);
            let numbers = [n, n + 1, n + 3, n + 4];
            corner_bets.push(cell(joined(&numbers, ","), &numbers, BetType::Corner));
        }
    }

    let street_bets = (0..GRID_ROWS)
        .map(|row| {
            let n = grid_number(row, 0);
            let numbers = [n, n + 1, n + 2];
            cell(joined(&numbers, ","), &numbers, BetType::Street)
        })
        .collect();

    let double_street_bets = (0..GRID_ROWS - 1)
        .map(|row| {
            let n = grid_number(row, 0);
            let numbers: Vec<u8> = (n..n + 6).collect();
            cell(joined(&numbers, ","), &numbers, BetType::Line)
        })
        .collect();

    Board {
        outside_bets,
        number_board_rows,
        zero_cell,
        column_bets,
        dozen_bets,
        even_odd_red_black,
        split_bets,
        corner_bets,
        street_bets,
        double_street_bets,
    }
}
