//! Axis-aligned unit directions: the [`Face6`] and [`Face4`] types.
//! This module is private but reexported by its parent.

use crate::math::GridVector;

/// Identifies one of the six faces of a grid cell, or equivalently an orthogonal
/// unit vector. This is the adjacency relation of the world: every cell has
/// exactly one neighbor per `Face6`, and no diagonal neighbors.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, exhaust::Exhaust)]
#[repr(u8)]
pub enum Face6 {
    /// Negative X; the face whose normal vector is `(-1, 0, 0)`.
    NX = 1,
    /// Negative Y; the face whose normal vector is `(0, -1, 0)`; downward.
    NY = 2,
    /// Negative Z; the face whose normal vector is `(0, 0, -1)`.
    NZ = 3,
    /// Positive X; the face whose normal vector is `(1, 0, 0)`.
    PX = 4,
    /// Positive Y; the face whose normal vector is `(0, 1, 0)`; upward.
    PY = 5,
    /// Positive Z; the face whose normal vector is `(0, 0, 1)`.
    PZ = 6,
}

impl Face6 {
    /// All the values of [`Face6`].
    pub const ALL: [Face6; 6] = [
        Face6::NX,
        Face6::NY,
        Face6::NZ,
        Face6::PX,
        Face6::PY,
        Face6::PZ,
    ];

    /// Returns the opposite face (maps negative to positive and vice versa).
    #[inline]
    pub const fn opposite(self) -> Face6 {
        match self {
            Face6::NX => Face6::PX,
            Face6::NY => Face6::PY,
            Face6::NZ => Face6::PZ,
            Face6::PX => Face6::NX,
            Face6::PY => Face6::NY,
            Face6::PZ => Face6::NZ,
        }
    }

    /// Returns the unit vector in the direction of this face.
    #[inline]
    pub fn normal_vector(self) -> GridVector {
        match self {
            Face6::NX => GridVector::new(-1, 0, 0),
            Face6::NY => GridVector::new(0, -1, 0),
            Face6::NZ => GridVector::new(0, 0, -1),
            Face6::PX => GridVector::new(1, 0, 0),
            Face6::PY => GridVector::new(0, 1, 0),
            Face6::PZ => GridVector::new(0, 0, 1),
        }
    }

    /// Whether this face lies in the horizontal (XZ) plane.
    #[inline]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Face6::NX | Face6::PX | Face6::NZ | Face6::PZ)
    }

    /// The [`Face4`] corresponding to this face, if it is horizontal.
    #[inline]
    pub const fn horizontal(self) -> Option<Face4> {
        match self {
            Face6::NZ => Some(Face4::North),
            Face6::PX => Some(Face4::East),
            Face6::PZ => Some(Face4::South),
            Face6::NX => Some(Face4::West),
            Face6::NY | Face6::PY => None,
        }
    }
}

/// The four horizontal directions; the adjacency relation of coplanar wire
/// connectivity. North is −Z, east is +X.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, exhaust::Exhaust)]
#[repr(u8)]
pub enum Face4 {
    /// −Z.
    North = 0,
    /// +X.
    East = 1,
    /// +Z.
    South = 2,
    /// −X.
    West = 3,
}

impl Face4 {
    /// All the values of [`Face4`], in the order wire connectivity is evaluated.
    pub const ALL: [Face4; 4] = [Face4::North, Face4::East, Face4::South, Face4::West];

    /// Returns the opposite horizontal direction.
    #[inline]
    pub const fn opposite(self) -> Face4 {
        match self {
            Face4::North => Face4::South,
            Face4::East => Face4::West,
            Face4::South => Face4::North,
            Face4::West => Face4::East,
        }
    }

    /// Widens this direction to the six-face type.
    #[inline]
    pub const fn face6(self) -> Face6 {
        match self {
            Face4::North => Face6::NZ,
            Face4::East => Face6::PX,
            Face4::South => Face6::PZ,
            Face4::West => Face6::NX,
        }
    }

    /// Returns the unit vector in the direction of this face.
    #[inline]
    pub fn normal_vector(self) -> GridVector {
        self.face6().normal_vector()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhaust::Exhaust as _;

    #[test]
    fn face6_opposite_is_involution() {
        for face in Face6::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_ne!(face.opposite(), face);
        }
    }

    #[test]
    fn face6_normals_are_unit_and_opposed() {
        for face in Face6::ALL {
            let v = face.normal_vector();
            assert_eq!(v.x.abs() + v.y.abs() + v.z.abs(), 1, "{face:?}");
            assert_eq!(v + face.opposite().normal_vector(), GridVector::zero());
        }
    }

    #[test]
    fn face6_all_matches_exhaust() {
        let exhausted: Vec<Face6> = Face6::exhaust().collect();
        assert_eq!(exhausted.len(), 6);
        for face in Face6::ALL {
            assert!(exhausted.contains(&face));
        }
    }

    #[test]
    fn face4_round_trips_through_face6() {
        for dir in Face4::ALL {
            assert_eq!(dir.face6().horizontal(), Some(dir));
            assert_eq!(dir.opposite().face6(), dir.face6().opposite());
        }
        assert_eq!(Face6::PY.horizontal(), None);
        assert_eq!(Face6::NY.horizontal(), None);
    }
}
