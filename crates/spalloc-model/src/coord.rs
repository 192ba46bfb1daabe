//! Coordinate types shared by the topology model, the catalogue store and
//! the wire format (§6's bracketed `[x:N,y:N,z:N]` forms).

use crate::error::SpallocError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A triad coordinate: x, y identify the triad on the machine's grid; z
/// identifies which of the triad's up-to-three boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triad {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Triad {
    pub fn new(x: u32, y: u32, z: u8) -> Result<Self, SpallocError> {
        if z > 2 {
            return Err(SpallocError::bad_request(format!("bad coordinate: z={z}")));
        }
        Ok(Self { x, y, z })
    }
}

impl fmt::Display for Triad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[x:{},y:{},z:{}]", self.x, self.y, self.z)
    }
}

impl FromStr for Triad {
    type Err = SpallocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y, z) = parse_bracketed_3(s, ('x', 'y', 'z'))?;
        Triad::new(x, y, z as u8)
    }
}

/// Serialises to the bracketed `[x:N,y:N,z:N]` wire form (spec §6):
/// accepted both as a bare value and as a map key (machine descriptions
/// key `board_locations`/`dead_links` by triad).
impl Serialize for Triad {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

/// Accepts either the bracketed string form or the structured `{x,y,z}`
/// form (spec §6: "implementations must accept both structured and
/// stringified forms").
impl<'de> Deserialize<'de> for Triad {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Struct { x: u32, y: u32, z: u8 },
        }
        match Repr::deserialize(d)? {
            Repr::Str(s) => s.parse().map_err(D::Error::custom),
            Repr::Struct { x, y, z } => Triad::new(x, y, z).map_err(D::Error::custom),
        }
    }
}

/// A physical coordinate: cabinet, frame, board-within-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Physical {
    pub cabinet: u32,
    pub frame: u32,
    pub board: u32,
}

impl fmt::Display for Physical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[c:{},f:{},b:{}]", self.cabinet, self.frame, self.board)
    }
}

impl FromStr for Physical {
    type Err = SpallocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cabinet, frame, board) = parse_bracketed_3(s, ('c', 'f', 'b'))?;
        Ok(Self { cabinet, frame, board })
    }
}

impl Serialize for Physical {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Physical {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Struct { cabinet: u32, frame: u32, board: u32 },
        }
        match Repr::deserialize(d)? {
            Repr::Str(s) => s.parse().map_err(D::Error::custom),
            Repr::Struct { cabinet, frame, board } => Ok(Physical { cabinet, frame, board }),
        }
    }
}

/// A BMP address: cabinet + frame only (it serves every board in that frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CabinetFrame {
    pub cabinet: u32,
    pub frame: u32,
}

impl fmt::Display for CabinetFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[c:{},f:{}]", self.cabinet, self.frame)
    }
}

impl FromStr for CabinetFrame {
    type Err = SpallocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cabinet, frame) = parse_bracketed_2(s)?;
        Ok(Self { cabinet, frame })
    }
}

impl Serialize for CabinetFrame {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CabinetFrame {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Struct { cabinet: u32, frame: u32 },
        }
        match Repr::deserialize(d)? {
            Repr::Str(s) => s.parse().map_err(D::Error::custom),
            Repr::Struct { cabinet, frame } => Ok(CabinetFrame { cabinet, frame }),
        }
    }
}

/// Root-chip coordinates in chips, derived from a [`Triad`] by the
/// topology model (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipCoord {
    pub x: u32,
    pub y: u32,
}

fn parse_bracketed_3(s: &str, names: (char, char, char)) -> Result<(u32, u32, u32), SpallocError> {
    let inner = strip_brackets(s)?;
    let mut parts = inner.split(',');
    let a = parse_field(parts.next(), names.0)?;
    let b = parse_field(parts.next(), names.1)?;
    let c = parse_field(parts.next(), names.2)?;
    if parts.next().is_some() {
        return Err(SpallocError::bad_request(format!("trailing fields in {s}")));
    }
    Ok((a, b, c))
}

fn parse_bracketed_2(s: &str) -> Result<(u32, u32), SpallocError> {
    let inner = strip_brackets(s)?;
    let mut parts = inner.split(',');
    let a = parse_field(parts.next(), 'c')?;
    let b = parse_field(parts.next(), 'f')?;
    if parts.next().is_some() {
        return Err(SpallocError::bad_request(format!("trailing fields in {s}")));
    }
    Ok((a, b))
}

fn strip_brackets(s: &str) -> Result<&str, SpallocError> {
    let s = s.trim();
    s.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| SpallocError::bad_request(format!("not a bracketed coordinate: {s}")))
}

fn parse_field(field: Option<&str>, expected: char) -> Result<u32, SpallocError> {
    let field = field.ok_or_else(|| SpallocError::bad_request("missing coordinate field"))?;
    let field = field.trim();
    let (name, value) = field
        .split_once(':')
        .ok_or_else(|| SpallocError::bad_request(format!("malformed field: {field}")))?;
    if name.trim().chars().next() != Some(expected) {
        return Err(SpallocError::bad_request(format!(
            "expected field '{expected}', got '{name}'"
        )));
    }
    value
        .trim()
        .parse()
        .map_err(|_| SpallocError::bad_request(format!("not a number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triad_round_trips_through_its_string_form() {
        let t = Triad::new(3, 4, 1).unwrap();
        let s = t.to_string();
        assert_eq!(s.parse::<Triad>().unwrap(), t);
    }

    #[test]
    fn physical_round_trips() {
        let p = Physical { cabinet: 1, frame: 2, board: 5 };
        assert_eq!(p.to_string().parse::<Physical>().unwrap(), p);
    }

    #[test]
    fn bad_z_is_rejected() {
        assert!(Triad::new(0, 0, 3).is_err());
    }

    #[test]
    fn malformed_bracket_is_bad_request() {
        let err = "x:0,y:0,z:0".parse::<Triad>().unwrap_err();
        assert!(matches!(err, SpallocError::BadRequest(_)));
    }
}
