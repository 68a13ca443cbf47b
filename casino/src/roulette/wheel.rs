//! Wheel facts: pocket colors, pocket order and the server-side spin.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest pocket on a single-zero wheel.
pub const MAX_NUMBER: u8 = 36;

/// Number of pockets on a single-zero wheel.
pub const POCKET_COUNT: usize = MAX_NUMBER as usize + 1;

/// The official red pockets.
pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Pocket order around a European wheel, clockwise from zero.
pub const WHEEL_ORDER: [u8; POCKET_COUNT] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

/// Pocket color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
    Green,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
            Color::Green => write!(f, "green"),
        }
    }
}

/// Returns true if `number` is one of the red pockets.
pub fn is_red(number: u8) -> bool {
    RED_NUMBERS.contains(&number)
}

/// Color of a pocket. Zero, and anything off the wheel, is green.
pub fn color_of(number: u8) -> Color {
    match number {
        1..=MAX_NUMBER if is_red(number) => Color::Red,
        1..=MAX_NUMBER => Color::Black,
        _ => Color::Green,
    }
}

/// Position of `number` in [`WHEEL_ORDER`].
pub fn wheel_position(number: u8) -> Option<usize> {
    WHEEL_ORDER.iter().position(|&n| n == number)
}

/// Draw a pocket uniformly from `0..=36`.
///
/// The caller owns the RNG so tests can seed it.
pub fn spin<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random_range(0..=MAX_NUMBER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_red_and_black_partition_nonzero_numbers() {
        let reds = (1..=MAX_NUMBER).filter(|&n| color_of(n) == Color::Red).count();
        let blacks = (1..=MAX_NUMBER)
            .filter(|&n| color_of(n) == Color::Black)
            .count();
        assert_eq!(reds, 18);
        assert_eq!(blacks, 18);
        assert_eq!(color_of(0), Color::Green);
    }

    #[test]
    fn test_wheel_order_is_a_permutation() {
        let pockets: BTreeSet<u8> = WHEEL_ORDER.iter().copied().collect();
        assert_eq!(pockets.len(), POCKET_COUNT);
        assert_eq!(pockets, (0..=MAX_NUMBER).collect());
        assert_eq!(wheel_position(0), Some(0));
        assert_eq!(wheel_position(37), None);
    }

    #[test]
    fn test_wheel_alternates_colors() {
        for pair in WHEEL_ORDER[1..].windows(2) {
            assert_ne!(color_of(pair[0]), color_of(pair[1]));
        }
    }

    #[test]
    fn test_spin_stays_on_the_wheel() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            assert!(spin(&mut rng) <= MAX_NUMBER);
        }
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color::Red.to_string(), "red");
        assert_eq!(Color::Green.to_string(), "green");
    }
}
