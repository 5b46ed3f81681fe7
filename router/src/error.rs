use crate::rooms::{DoorId, RoomId};
use pcb_common::db::core::BoardError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutorouteError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("autoroute was stopped")]
    Stopped,
    #[error("backtrack element {0} is inconsistent")]
    InvalidBacktrack(usize),
    #[error("expansion room {0:?} does not exist")]
    MissingRoom(RoomId),
    #[error("expansion door {0:?} does not exist")]
    MissingDoor(DoorId),
    #[error("no net is selected, call init_connection first")]
    NoNet,
    #[error("cannot locate the found connection: {0}")]
    Locate(String),
}
