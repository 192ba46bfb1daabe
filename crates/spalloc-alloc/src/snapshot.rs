//! Builds an in-memory [`RegionView`] of one machine from the Catalogue
//! Store, so the pure search in [`crate::search`] never touches SQL.

use crate::error::Result;
use crate::search::{BoardStatus, RegionView};
use spalloc_model::{BoardId, Direction, MachineId, Triad};
use spalloc_store::Store;
use std::collections::HashMap;

pub struct MachineSnapshot {
    width: u32,
    height: u32,
    board_ids: HashMap<Triad, BoardId>,
    status: HashMap<Triad, BoardStatus>,
    live_links: HashMap<(Triad, Direction), bool>,
}

impl MachineSnapshot {
    pub async fn load(store: &Store, machine_id: MachineId) -> Result<Self> {
        let machine = spalloc_store::machine_repo::get_machine_by_id(store.pool(), machine_id).await?;
        let (width, height) = (machine.width, machine.height);
        let boards = spalloc_store::machine_repo::list_boards_ordered(store.pool(), machine_id).await?;
        let links = spalloc_store::machine_repo::list_links(store.pool(), machine_id).await?;

        let mut board_ids = HashMap::new();
        let mut status = HashMap::new();
        let mut by_id = HashMap::new();
        for board in &boards {
            board_ids.insert(board.triad, board.id);
            by_id.insert(board.id, board.triad);
            let st = if board.allocated_job.is_some() {
                BoardStatus::Allocated
            } else if board.is_dead() {
                BoardStatus::Dead
            } else {
                BoardStatus::Free
            };
            status.insert(board.triad, st);
        }

        let mut live_links = HashMap::new();
        for link in &links {
            let (Some(&from), Some(&to)) =
                (by_id.get(&link.from_board), by_id.get(&link.to_board))
            else {
                continue;
            };
            live_links.insert((from, link.direction), link.live);
            live_links.insert((to, link.direction.opposite()), link.live);
        }

        Ok(Self { width, height, board_ids, status, live_links })
    }

    pub fn board_id(&self, triad: Triad) -> Option<BoardId> {
        self.board_ids.get(&triad).copied()
    }
}

impl RegionView for MachineSnapshot {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn status(&self, triad: Triad) -> BoardStatus {
        self.status.get(&triad).copied().unwrap_or(BoardStatus::Missing)
    }

    fn live_link(&self, from: Triad, direction: Direction) -> bool {
        self.live_links.get(&(from, direction)).copied().unwrap_or(false)
    }
}
