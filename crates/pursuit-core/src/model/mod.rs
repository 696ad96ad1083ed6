pub mod cell;
pub mod direction;
pub mod layout;

pub use cell::{Cell, manhattan};
pub use direction::Direction;
pub use layout::{Layout, LayoutError};
