pub mod int_box;
pub mod line;
pub mod octagon;
pub mod point;
pub mod rtree;
pub mod shape;
pub mod simplex;

pub use int_box::IntBox;
pub use line::{CRIT_INT, EPSILON, FloatLine, Line, Side};
pub use octagon::IntOctagon;
pub use point::{FloatPoint, IntPoint};
pub use shape::TileShape;
pub use simplex::{GeometryError, Simplex};
