//! The topology model (spec §4.1): triad <-> chip coordinate transforms,
//! wrap-around neighbour movement, and the dead-link predicate.
//!
//! Grounded on the REDESIGN FLAG in spec §9 ("Global mutable state... replace
//! with a value owned by the Topology Model"): the movement table is a
//! `const` array, not a lazily-initialised process-wide map, so there is no
//! singleton to init/tear down.

use spalloc_model::{Direction, SpallocError, Triad};

/// Triad-chip spacing in chips (S), and the two intra-triad sub-board
/// chip offsets (A, B) from spec §4.1.
pub const S: u32 = spalloc_model::TRIAD_CHIP_SPACING;
pub const A: u32 = 8;
pub const B: u32 = 4;

/// One entry of the movement table: the `(dx, dy, dz)` to apply when
/// stepping from a board at a given `z` in direction `d`.
#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub z: u8,
    pub direction: Direction,
    pub dx: i64,
    pub dy: i64,
    pub dz: i64,
}

/// The 18 `(z, direction) -> (dx, dy, dz)` entries (spec §4.1).
///
/// N/S/E/W step to the neighbouring triad in the plane, at the same
/// sub-board position `z`. NE/SW stay within the same triad and cycle
/// between its three sub-boards (`z -> z+1` for NE, `z -> z-1` for SW,
/// modulo 3) — the triad's three boards form a ring under NE/SW.
pub const MOVEMENT_TABLE: [Move; 18] = [
    Move { z: 0, direction: Direction::North, dx: 0, dy: 1, dz: 0 },
    Move { z: 0, direction: Direction::South, dx: 0, dy: -1, dz: 0 },
    Move { z: 0, direction: Direction::East, dx: 1, dy: 0, dz: 0 },
    Move { z: 0, direction: Direction::West, dx: -1, dy: 0, dz: 0 },
    Move { z: 0, direction: Direction::NorthEast, dx: 0, dy: 0, dz: 1 },
    Move { z: 0, direction: Direction::SouthWest, dx: 0, dy: 0, dz: -1 },
    Move { z: 1, direction: Direction::North, dx: 0, dy: 1, dz: 0 },
    Move { z: 1, direction: Direction::South, dx: 0, dy: -1, dz: 0 },
    Move { z: 1, direction: Direction::East, dx: 1, dy: 0, dz: 0 },
    Move { z: 1, direction: Direction::West, dx: -1, dy: 0, dz: 0 },
    Move { z: 1, direction: Direction::NorthEast, dx: 0, dy: 0, dz: 1 },
    Move { z: 1, direction: Direction::SouthWest, dx: 0, dy: 0, dz: -1 },
    Move { z: 2, direction: Direction::North, dx: 0, dy: 1, dz: 0 },
    Move { z: 2, direction: Direction::South, dx: 0, dy: -1, dz: 0 },
    Move { z: 2, direction: Direction::East, dx: 1, dy: 0, dz: 0 },
    Move { z: 2, direction: Direction::West, dx: -1, dy: 0, dz: 0 },
    Move { z: 2, direction: Direction::NorthEast, dx: 0, dy: 0, dz: 1 },
    Move { z: 2, direction: Direction::SouthWest, dx: 0, dy: 0, dz: -1 },
];

fn movement(z: u8, direction: Direction) -> Move {
    MOVEMENT_TABLE
        .iter()
        .copied()
        .find(|m| m.z == z && m.direction == direction)
        .expect("movement table covers all 18 (z, direction) pairs")
}

/// Derive a board's root-chip coordinates from its triad (spec §4.1).
pub fn root_chip(triad: Triad) -> Result<spalloc_model::ChipCoord, SpallocError> {
    let (ox, oy) = match triad.z {
        0 => (0, 0),
        1 => (A, B),
        2 => (B, A),
        z => return Err(SpallocError::bad_request(format!("bad coordinate: z={z}"))),
    };
    Ok(spalloc_model::ChipCoord { x: triad.x * S + ox, y: triad.y * S + oy })
}

/// Move one step from `triad` in `direction`, wrapping x/y modulo the
/// machine's width/height (the torus). `z` cycles through {0,1,2} and
/// never needs wrapping beyond that range, per spec §4.1.
pub fn mv(triad: Triad, direction: Direction, width: u32, height: u32) -> Triad {
    let m = movement(triad.z, direction);
    let nx = wrap(triad.x as i64 + m.dx, width);
    let ny = wrap(triad.y as i64 + m.dy, height);
    let nz = (triad.z as i64 + m.dz).rem_euclid(3) as u8;
    Triad { x: nx, y: ny, z: nz }
}

fn wrap(v: i64, modulus: u32) -> u32 {
    v.rem_euclid(modulus as i64) as u32
}

/// What the dead-link predicate needs to know about a machine: which
/// triads are dead, and which (triad, direction) pairs were explicitly
/// marked dead by the machine description or an operator.
///
/// Implemented both by the Machine Loader (against the raw description,
/// before any rows exist) and by the Allocation Engine (against the
/// catalogue's live board/link state), so the one predicate in
/// [`is_link_dead`] serves both (spec §4.1 and §4.2 state the same rule).
pub trait BoardLiveness {
    fn is_board_dead(&self, triad: Triad) -> bool;
    fn has_marked_dead_link(&self, triad: Triad, direction: Direction) -> bool;
}

/// spec §4.1: board `b` has a dead outbound link in direction `d` iff `b`
/// is dead, OR the dead-link map at `b` names `d`, OR the board at
/// `b.move(d)` is dead, OR that board's reciprocal link is dead.
pub fn is_link_dead(
    view: &impl BoardLiveness,
    triad: Triad,
    direction: Direction,
    width: u32,
    height: u32,
) -> bool {
    if view.is_board_dead(triad) {
        return true;
    }
    if view.has_marked_dead_link(triad, direction) {
        return true;
    }
    let neighbour = mv(triad, direction, width, height);
    if view.is_board_dead(neighbour) {
        return true;
    }
    if view.has_marked_dead_link(neighbour, direction.opposite()) {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct AllLive;
    impl BoardLiveness for AllLive {
        fn is_board_dead(&self, _triad: Triad) -> bool {
            false
        }
        fn has_marked_dead_link(&self, _triad: Triad, _direction: Direction) -> bool {
            false
        }
    }

    #[test]
    fn root_chip_matches_the_spec_formula() {
        let t0 = Triad::new(2, 3, 0).unwrap();
        assert_eq!(root_chip(t0).unwrap(), spalloc_model::ChipCoord { x: 24, y: 36 });
        let t1 = Triad::new(2, 3, 1).unwrap();
        assert_eq!(root_chip(t1).unwrap(), spalloc_model::ChipCoord { x: 32, y: 40 });
        let t2 = Triad::new(2, 3, 2).unwrap();
        assert_eq!(root_chip(t2).unwrap(), spalloc_model::ChipCoord { x: 28, y: 44 });
    }

    #[test]
    fn all_live_board_has_no_dead_links() {
        let t = Triad::new(0, 0, 0).unwrap();
        for d in Direction::ALL {
            assert!(!is_link_dead(&AllLive, t, d, 4, 4));
        }
    }

    proptest! {
        #[test]
        fn movement_is_composable(x in 0u32..8, y in 0u32..8, z in 0u8..3, di in 0usize..6) {
            let width = 8;
            let height = 8;
            let t = Triad { x, y, z };
            let d = Direction::ALL[di];
            let stepped = mv(t, d, width, height);
            let back = mv(stepped, d.opposite(), width, height);
            prop_assert_eq!(back, t);
        }

        #[test]
        fn z_is_always_valid_after_a_legal_step(x in 0u32..8, y in 0u32..8, z in 0u8..3, di in 0usize..6) {
            let t = Triad { x, y, z };
            let d = Direction::ALL[di];
            let stepped = mv(t, d, 8, 8);
            prop_assert!(stepped.z <= 2);
        }
    }
}
