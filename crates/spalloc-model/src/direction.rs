//! The six hex-grid directions a board may link in, and the legacy rotated
//! naming accepted on input (Glossary: "Direction naming").

use crate::error::SpallocError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::SouthWest,
    ];

    /// The reciprocal direction: a link from `b1` in direction `d` is the
    /// same link as one from `b2` in direction `d.opposite()`.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthWest => Direction::NorthEast,
        }
    }

    /// Canonical short name, as used in `dead_links` maps and pending-change
    /// per-FPGA flag names (N, S, E, W, NE, SW).
    pub fn canonical_name(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
            Direction::NorthEast => "NE",
            Direction::SouthWest => "SW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

impl FromStr for Direction {
    type Err = SpallocError;

    /// Accepts both the canonical {N, S, E, W, NE, SW} names and the older
    /// rotated naming {east, northEast, north, west, southWest, south},
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Direction::North),
            "s" | "south" => Ok(Direction::South),
            "e" | "east" => Ok(Direction::East),
            "w" | "west" => Ok(Direction::West),
            "ne" | "northeast" => Ok(Direction::NorthEast),
            "sw" | "southwest" => Ok(Direction::SouthWest),
            other => Err(SpallocError::bad_request(format!(
                "unknown link direction: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn legacy_rotated_names_map_onto_canonical_directions() {
        assert_eq!("east".parse::<Direction>().unwrap(), Direction::East);
        assert_eq!("northEast".parse::<Direction>().unwrap(), Direction::NorthEast);
        assert_eq!("north".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("west".parse::<Direction>().unwrap(), Direction::West);
        assert_eq!("southWest".parse::<Direction>().unwrap(), Direction::SouthWest);
        assert_eq!("south".parse::<Direction>().unwrap(), Direction::South);
    }
}
