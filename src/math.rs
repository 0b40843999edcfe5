//! Integer grid mathematics: coordinates, directions, and axis-aligned boxes.

mod aab;
mod coord;
mod face;

pub use aab::BoxPart;
pub use coord::{GridCoordinate, GridPoint, GridVector};
pub use face::{Face4, Face6};
