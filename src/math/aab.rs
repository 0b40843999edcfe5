//! Axis-aligned integer boxes used as components of block shapes.
//! This module is private but reexported by its parent.

use core::fmt;

use crate::math::{Face6, GridCoordinate};

/// One axis-aligned box of a block shape, in block-local coordinates.
///
/// Coordinates range over `0..=16`; a full cell is `(0, 0, 0)` to `(16, 16, 16)`.
/// The box must have positive extent on every axis.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct BoxPart {
    lower: [GridCoordinate; 3],
    upper: [GridCoordinate; 3],
}

impl BoxPart {
    /// The extent of a block cell in shape coordinates.
    pub const EXTENT: GridCoordinate = 16;

    /// The box spanning the entire cell.
    pub const FULL: BoxPart = BoxPart {
        lower: [0, 0, 0],
        upper: [Self::EXTENT, Self::EXTENT, Self::EXTENT],
    };

    /// Constructs a box from its most-negative and most-positive corners.
    ///
    /// Panics if any coordinate is outside `0..=16` or if the box would have
    /// zero or negative extent on some axis; that is a programmer error in a
    /// shape definition and is rejected eagerly.
    #[track_caller]
    pub fn new(lower: [GridCoordinate; 3], upper: [GridCoordinate; 3]) -> Self {
        for axis in 0..3 {
            assert!(
                (0..=Self::EXTENT).contains(&lower[axis])
                    && (0..=Self::EXTENT).contains(&upper[axis])
                    && lower[axis] < upper[axis],
                "invalid box {lower:?}..{upper:?} on axis {axis}",
            );
        }
        Self { lower, upper }
    }

    /// The most-negative corner.
    #[inline]
    pub fn lower(&self) -> [GridCoordinate; 3] {
        self.lower
    }

    /// The most-positive corner.
    #[inline]
    pub fn upper(&self) -> [GridCoordinate; 3] {
        self.upper
    }

    /// Whether this box spans the entire cell.
    #[inline]
    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// Whether this box contains the (open) unit cell centered on integer
    /// sub-coordinates, used by coverage tests.
    #[inline]
    pub(crate) fn contains_cell(&self, x: GridCoordinate, y: GridCoordinate, z: GridCoordinate) -> bool {
        self.lower[0] <= x
            && x < self.upper[0]
            && self.lower[1] <= y
            && y < self.upper[1]
            && self.lower[2] <= z
            && z < self.upper[2]
    }

    /// Projects this box onto the given cell face, if the box touches it.
    ///
    /// Returns the 2D rectangle `[u0, v0, u1, v1]` in the face plane's
    /// remaining two axes (in XYZ order).
    pub(crate) fn face_rect(&self, face: Face6) -> Option<[GridCoordinate; 4]> {
        let (axis, boundary_is_upper) = match face {
            Face6::NX => (0, false),
            Face6::PX => (0, true),
            Face6::NY => (1, false),
            Face6::PY => (1, true),
            Face6::NZ => (2, false),
            Face6::PZ => (2, true),
        };
        let touching = if boundary_is_upper {
            self.upper[axis] == Self::EXTENT
        } else {
            self.lower[axis] == 0
        };
        if !touching {
            return None;
        }
        let (u, v) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        Some([self.lower[u], self.lower[v], self.upper[u], self.upper[v]])
    }
}

impl fmt::Debug for BoxPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x0, y0, z0] = self.lower;
        let [x1, y1, z1] = self.upper;
        write!(f, "BoxPart({x0} {y0} {z0})..({x1} {y1} {z1})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_box() {
        assert!(BoxPart::FULL.is_full());
        assert!(!BoxPart::new([0, 0, 0], [16, 15, 16]).is_full());
    }

    #[test]
    #[should_panic(expected = "invalid box")]
    fn zero_extent_rejected() {
        BoxPart::new([4, 4, 4], [4, 8, 8]);
    }

    #[test]
    #[should_panic(expected = "invalid box")]
    fn out_of_range_rejected() {
        BoxPart::new([0, 0, 0], [17, 16, 16]);
    }

    #[test]
    fn face_rect_requires_touching() {
        let slab = BoxPart::new([0, 0, 0], [16, 8, 16]);
        assert_eq!(slab.face_rect(Face6::NY), Some([0, 0, 16, 16]));
        assert_eq!(slab.face_rect(Face6::PY), None);
        assert_eq!(slab.face_rect(Face6::PX), Some([0, 0, 8, 16]));
    }
}
