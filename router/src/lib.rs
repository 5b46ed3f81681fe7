pub mod batch;
pub mod control;
pub mod drill;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod insert;
pub mod item_info;
pub mod locate;
pub mod maze;
pub mod neighbours;
pub mod rooms;
pub mod search_tree;

pub use batch::{BatchReport, route_board};
pub use control::AutorouteControl;
pub use engine::{AutorouteEngine, AutorouteResult};
pub use error::AutorouteError;
