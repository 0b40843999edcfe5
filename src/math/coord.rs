//! Numeric types for grid positions.
//! This module is private but reexported by its parent.

/// Coordinate type for grid cell positions. The world is a lattice of unit cubes
/// addressed by these.
pub type GridCoordinate = i32;

/// The position of a grid cell, identified by its most-negative corner.
pub type GridPoint = euclid::default::Point3D<GridCoordinate>;

/// An offset between two [`GridPoint`]s.
pub type GridVector = euclid::default::Vector3D<GridCoordinate>;
