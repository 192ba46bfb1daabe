//! Pure region-search functions for the Allocation Engine (spec §4.4 step
//! 3): rectangle window search, connectivity under the live-link graph,
//! and the enclosing-rectangle policy for number-of-boards requests.
//!
//! Kept independent of the store so the search itself is unit-testable
//! against a small in-memory [`RegionView`] (spec §9's "Open question: the
//! precise enclosing-rectangle search order is configurable" — this is the
//! `RectanglePolicy` seam that statement asks for).

use spalloc_model::{Direction, Triad};
use spalloc_topology::mv;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardStatus {
    /// No board exists at this triad (non-rectangular machine footprint).
    Missing,
    /// Exists but not allocatable (disabled, or no IP/physical assigned).
    Dead,
    Allocated,
    Free,
}

/// What the search needs to know about a machine's boards and links.
/// Implemented over the Catalogue Store's snapshot of a machine by
/// [`crate::snapshot::MachineSnapshot`]; implemented directly by tests.
pub trait RegionView {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn status(&self, triad: Triad) -> BoardStatus;
    fn live_link(&self, from: Triad, direction: Direction) -> bool;
}

#[derive(Debug, Clone)]
pub struct RectangleMatch {
    pub anchor_x: u32,
    pub anchor_y: u32,
    pub boards: Vec<Triad>,
}

fn window_triads(ax: u32, ay: u32, w: u32, h: u32) -> Vec<Triad> {
    let mut triads = Vec::with_capacity((w * h * 3) as usize);
    for y in ay..ay + h {
        for x in ax..ax + w {
            for z in 0..3u8 {
                triads.push(Triad { x, y, z });
            }
        }
    }
    triads
}

fn neighbour_in(
    view: &impl RegionView,
    triad: Triad,
    direction: Direction,
    window: &HashSet<Triad>,
) -> Option<Triad> {
    let n = mv(triad, direction, view.width(), view.height());
    window.contains(&n).then_some(n)
}

fn bfs_component(
    view: &impl RegionView,
    start: Triad,
    allowed: &HashSet<Triad>,
    window: &HashSet<Triad>,
) -> HashSet<Triad> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(t) = queue.pop_front() {
        for d in Direction::ALL {
            if !view.live_link(t, d) {
                continue;
            }
            let Some(n) = neighbour_in(view, t, d, window) else { continue };
            if allowed.contains(&n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    seen
}

fn sort_anchor_order(boards: &mut [Triad]) {
    boards.sort_by_key(|t| (t.y, t.x, t.z));
}

/// spec §4.4 step 3, "Rectangle (w×h boards)": every triad position in the
/// window must have at least one live board, up to `max_dead_boards`
/// entirely-dead exceptions, and the live boards must form a single
/// connected component.
pub fn find_fixed_rectangle(
    view: &impl RegionView,
    w: u32,
    h: u32,
    max_dead_boards: u32,
) -> Option<RectangleMatch> {
    if w == 0 || h == 0 || w > view.width() || h > view.height() {
        return None;
    }
    for ay in 0..=(view.height() - h) {
        for ax in 0..=(view.width() - w) {
            if let Some(mut boards) = try_fixed_anchor(view, ax, ay, w, h, max_dead_boards) {
                sort_anchor_order(&mut boards);
                return Some(RectangleMatch { anchor_x: ax, anchor_y: ay, boards });
            }
        }
    }
    None
}

/// Walks the window one triad position at a time rather than one board at
/// a time: spec §8 Scenario 2's `max_dead_boards` tolerance binds triad
/// positions that are entirely dead (a hole in the rectangle's triad-
/// boundary coverage), not individual dead sub-boards. A triad position
/// with at least one live sub-board still fills the boundary; its dead
/// sub-boards are simply left out of the allocated selection, free of
/// charge against the tolerance.
fn try_fixed_anchor(
    view: &impl RegionView,
    ax: u32,
    ay: u32,
    w: u32,
    h: u32,
    max_dead_boards: u32,
) -> Option<Vec<Triad>> {
    let window = window_triads(ax, ay, w, h);
    let mut holes = 0u32;
    let mut live = Vec::new();
    for y in ay..ay + h {
        for x in ax..ax + w {
            let mut any_live = false;
            for z in 0..3u8 {
                match view.status(Triad { x, y, z }) {
                    BoardStatus::Allocated => return None,
                    BoardStatus::Free => {
                        live.push(Triad { x, y, z });
                        any_live = true;
                    }
                    BoardStatus::Dead | BoardStatus::Missing => {}
                }
            }
            if !any_live {
                holes += 1;
            }
        }
    }
    if holes > max_dead_boards || live.is_empty() {
        return None;
    }
    let window_set: HashSet<Triad> = window.into_iter().collect();
    let live_set: HashSet<Triad> = live.iter().copied().collect();
    let component = bfs_component(view, live[0], &live_set, &window_set);
    if component.len() == live.len() {
        Some(live)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct NumBoardsMatch {
    pub anchor_x: u32,
    pub anchor_y: u32,
    pub boards: Vec<Triad>,
}

/// Smallest `(w, h)` (in triads) whose triad capacity (`w*h*3` boards) can
/// hold `n` boards, preferring the smallest `max(w, h)`, then smallest
/// area, then smallest `w` (spec §9's open question on enclosing-rectangle
/// policy, resolved here as documented in the grounding ledger).
pub fn enclosing_rectangle(n: u32, max_w: u32, max_h: u32) -> Option<(u32, u32)> {
    if n == 0 {
        return Some((1, 1));
    }
    let mut best: Option<(u32, u32)> = None;
    for h in 1..=max_h.max(1) {
        for w in 1..=max_w.max(1) {
            let capacity = w as u64 * h as u64 * 3;
            if capacity < n as u64 {
                continue;
            }
            let key = (w.max(h), w as u64 * h as u64, w);
            let is_better = match best {
                None => true,
                Some((bw, bh)) => key < (bw.max(bh), bw as u64 * bh as u64, bw),
            };
            if is_better {
                best = Some((w, h));
            }
        }
    }
    best
}

/// spec §4.4 step 3, "Number of boards n": find the smallest enclosing
/// rectangle, then the largest connected free component within it; accept
/// iff that component has at least `n` boards.
pub fn find_number_of_boards(
    view: &impl RegionView,
    n: u32,
    max_dead_boards: u32,
) -> Option<NumBoardsMatch> {
    let (w, h) = enclosing_rectangle(n, view.width(), view.height())?;
    if w > view.width() || h > view.height() {
        return None;
    }
    for ay in 0..=(view.height() - h) {
        for ax in 0..=(view.width() - w) {
            if let Some(mut boards) = try_number_anchor(view, ax, ay, w, h, n, max_dead_boards) {
                sort_anchor_order(&mut boards);
                return Some(NumBoardsMatch { anchor_x: ax, anchor_y: ay, boards });
            }
        }
    }
    None
}

fn try_number_anchor(
    view: &impl RegionView,
    ax: u32,
    ay: u32,
    w: u32,
    h: u32,
    n: u32,
    max_dead_boards: u32,
) -> Option<Vec<Triad>> {
    let window = window_triads(ax, ay, w, h);
    let window_set: HashSet<Triad> = window.iter().copied().collect();
    let mut dead = 0u32;
    let mut free = Vec::new();
    for &t in &window {
        match view.status(t) {
            BoardStatus::Free => free.push(t),
            BoardStatus::Dead | BoardStatus::Missing => dead += 1,
            BoardStatus::Allocated => {}
        }
    }
    if dead > max_dead_boards || (free.len() as u32) < n {
        return None;
    }
    let free_set: HashSet<Triad> = free.iter().copied().collect();
    let mut best: Vec<Triad> = Vec::new();
    let mut visited: HashSet<Triad> = HashSet::new();
    for &t in &free {
        if visited.contains(&t) {
            continue;
        }
        let component = bfs_component(view, t, &free_set, &window_set);
        visited.extend(component.iter().copied());
        if component.len() > best.len() {
            best = component.into_iter().collect();
        }
    }
    if (best.len() as u32) < n {
        return None;
    }
    sort_anchor_order(&mut best);
    best.truncate(n as usize);
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Grid {
        width: u32,
        height: u32,
        dead: HashSet<Triad>,
        allocated: HashSet<Triad>,
        dead_links: HashSet<(Triad, Direction)>,
    }

    impl Grid {
        fn all_live(width: u32, height: u32) -> Self {
            Self { width, height, dead: HashSet::new(), allocated: HashSet::new(), dead_links: HashSet::new() }
        }
    }

    impl RegionView for Grid {
        fn width(&self) -> u32 {
            self.width
        }
        fn height(&self) -> u32 {
            self.height
        }
        fn status(&self, triad: Triad) -> BoardStatus {
            if triad.x >= self.width || triad.y >= self.height {
                return BoardStatus::Missing;
            }
            if self.allocated.contains(&triad) {
                BoardStatus::Allocated
            } else if self.dead.contains(&triad) {
                BoardStatus::Dead
            } else {
                BoardStatus::Free
            }
        }
        fn live_link(&self, from: Triad, direction: Direction) -> bool {
            if self.status(from) != BoardStatus::Free {
                return false;
            }
            if self.dead_links.contains(&(from, direction)) {
                return false;
            }
            let to = mv(from, direction, self.width, self.height);
            self.status(to) == BoardStatus::Free
        }
    }

    #[test]
    fn single_board_rectangle_matches_its_own_triad() {
        let grid = Grid::all_live(1, 1);
        let m = find_fixed_rectangle(&grid, 1, 1, 0).unwrap();
        assert_eq!((m.anchor_x, m.anchor_y), (0, 0));
        assert_eq!(m.boards.len(), 3);
    }

    #[test]
    fn dead_triad_excludes_the_first_anchor() {
        let mut grid = Grid::all_live(3, 3);
        grid.dead.insert(Triad { x: 1, y: 1, z: 1 });
        // Triad (1,1) still has two live sub-boards, so the 2x2 window
        // anchored at (0,0) still fills its triad boundary: the dead board
        // is excluded from the selection but the anchor wins outright, even
        // at max_dead_boards=0.
        let m = find_fixed_rectangle(&grid, 2, 2, 0).unwrap();
        assert_eq!((m.anchor_x, m.anchor_y), (0, 0));
        assert!(!m.boards.contains(&Triad { x: 1, y: 1, z: 1 }));
    }

    #[test]
    fn number_of_boards_tolerates_one_dead_board() {
        let mut grid = Grid::all_live(3, 3);
        grid.dead.insert(Triad { x: 0, y: 0, z: 2 });
        let m = find_number_of_boards(&grid, 3, 1).unwrap();
        assert_eq!(m.boards.len(), 3);
        assert!(!m.boards.contains(&Triad { x: 0, y: 0, z: 2 }));
    }

    #[test]
    fn enclosing_rectangle_prefers_square_ish_shapes() {
        assert_eq!(enclosing_rectangle(3, 8, 8), Some((1, 1)));
        assert_eq!(enclosing_rectangle(4, 8, 8), Some((2, 1)));
        assert_eq!(enclosing_rectangle(12, 8, 8), Some((2, 2)));
    }

    #[test]
    fn already_allocated_board_fails_the_anchor() {
        let mut grid = Grid::all_live(1, 1);
        grid.allocated.insert(Triad { x: 0, y: 0, z: 0 });
        assert!(find_fixed_rectangle(&grid, 1, 1, 0).is_none());
    }
}
