//! Resolves the three `BoardSelector` kinds (spec §4.8: "XYZ, CFB, IP") to
//! a catalogue row for `setBoardState`/`getBoardState`.

use crate::error::Result;
use spalloc_model::{Board, BoardSelector, MachineId, SpallocError};
use spalloc_store::Store;

pub async fn resolve(store: &Store, machine: MachineId, selector: BoardSelector) -> Result<Board> {
    let found = match selector {
        BoardSelector::Triad(t) => spalloc_store::machine_repo::get_board_by_triad(store.pool(), machine, t).await?,
        BoardSelector::Physical(p) => {
            spalloc_store::machine_repo::get_board_by_physical(store.pool(), machine, p).await?
        }
        BoardSelector::Ip(ip) => spalloc_store::machine_repo::get_board_by_ip(store.pool(), ip).await?,
    };
    found.ok_or_else(|| SpallocError::not_found(format!("no board matching {selector:?}")))
}
