//! Derived block geometry and its caches.
//!
//! A [`Shape`] is the result of expensive boolean box algebra and is therefore
//! a flyweight: shapes are shared via [`Arc`] and compared by identity, never
//! structurally. The two caches here exploit that — the full-cube test cache
//! ([`FullCubeCache`]) and the pairwise face-occlusion cache
//! ([`OcclusionCache`]) both key on shape identity, which is sound because
//! equal shape values reached through the state table are the same allocation.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, Weak};

use lru::LruCache;
use once_cell::sync::Lazy;

use crate::math::{BoxPart, Face6, GridCoordinate};

/// Capacity of [`FullCubeCache`].
pub const FULL_CUBE_CACHE_SIZE: usize = 512;

/// Capacity of each [`OcclusionCache`] instance.
pub const OCCLUSION_CACHE_SIZE: usize = 256;

static EMPTY: Lazy<Shape> = Lazy::new(|| Shape(Arc::new(ShapeData { parts: Vec::new() })));
static CUBE: Lazy<Shape> = Lazy::new(|| {
    Shape(Arc::new(ShapeData {
        parts: vec![BoxPart::FULL],
    }))
});

/// A block shape: the union of a list of axis-aligned boxes in block-local
/// coordinates.
///
/// `Shape` is a flyweight. [`PartialEq`] and [`Hash`] are **identity**-based
/// (pointer comparison), which is the intended fast substitute for structural
/// equality within one process run; build shapes once and share them.
#[derive(Clone)]
pub struct Shape(Arc<ShapeData>);

struct ShapeData {
    parts: Vec<BoxPart>,
}

impl Shape {
    /// The shape with no volume at all.
    pub fn empty() -> Shape {
        EMPTY.clone()
    }

    /// The canonical full-cell cube. All solid full blocks should share this
    /// instance so that identity-keyed cache lookups hit.
    pub fn cube() -> Shape {
        CUBE.clone()
    }

    /// Constructs a shape from boxes. The canonical [`Shape::empty`] and
    /// [`Shape::cube`] instances are returned for their equivalents so that
    /// identity comparison covers the common cases.
    pub fn from_parts(parts: Vec<BoxPart>) -> Shape {
        if parts.is_empty() {
            Self::empty()
        } else if parts.iter().any(BoxPart::is_full) {
            Self::cube()
        } else {
            Shape(Arc::new(ShapeData { parts }))
        }
    }

    /// Constructs the shape of a single box.
    pub fn single(part: BoxPart) -> Shape {
        Self::from_parts(vec![part])
    }

    /// The union of two shapes. This allocates a new flyweight unless one
    /// operand is empty or full.
    pub fn union(&self, other: &Shape) -> Shape {
        if self.is_empty() || other.same(&CUBE) {
            other.clone()
        } else if other.is_empty() || self.same(&CUBE) {
            self.clone()
        } else {
            let mut parts = self.0.parts.clone();
            parts.extend_from_slice(&other.0.parts);
            Shape(Arc::new(ShapeData { parts }))
        }
    }

    /// Whether the shape has no volume.
    pub fn is_empty(&self) -> bool {
        self.0.parts.is_empty()
    }

    /// The component boxes.
    pub fn parts(&self) -> &[BoxPart] {
        &self.0.parts
    }

    /// Identity comparison; same as `==` but named to make call sites explicit.
    #[inline]
    pub fn same(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Whether this shape is indistinguishable from a solid cube.
    ///
    /// This is the uncached geometric test; go through
    /// [`FullCubeCache::is_full_cube`] on hot paths.
    pub fn covers_full_cube(&self) -> bool {
        let mut xs = vec![0, BoxPart::EXTENT];
        let mut ys = vec![0, BoxPart::EXTENT];
        let mut zs = vec![0, BoxPart::EXTENT];
        for part in &self.0.parts {
            let [x0, y0, z0] = part.lower();
            let [x1, y1, z1] = part.upper();
            xs.extend([x0, x1]);
            ys.extend([y0, y1]);
            zs.extend([z0, z1]);
        }
        for axis in [&mut xs, &mut ys, &mut zs] {
            axis.sort_unstable();
            axis.dedup();
        }
        // Boxes are integer-aligned, so each compressed cell is covered iff
        // its most-negative corner is inside some box.
        for &x in &xs[..xs.len() - 1] {
            for &y in &ys[..ys.len() - 1] {
                for &z in &zs[..zs.len() - 1] {
                    if !self.0.parts.iter().any(|p| p.contains_cell(x, y, z)) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// The rectangles of this shape that lie in the plane of the given face.
    fn face_rects(&self, face: Face6) -> Vec<[GridCoordinate; 4]> {
        self.0
            .parts
            .iter()
            .filter_map(|p| p.face_rect(face))
            .collect()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shape").field(&self.0.parts).finish()
    }
}

impl PartialEq for Shape {
    /// Identity comparison, per the flyweight contract.
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}
impl Eq for Shape {}

impl std::hash::Hash for Shape {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// The derived shapes of one block state, for the three distinct queries the
/// engine makes of block geometry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShapeSet {
    /// Shape used for physical collision.
    pub collision: Shape,
    /// Shape used for visual occlusion tests.
    pub visual: Shape,
    /// Shape used for cursor targeting.
    pub interaction: Shape,
}

impl ShapeSet {
    /// A shape set using the same shape for every purpose.
    pub fn uniform(shape: Shape) -> Self {
        Self {
            collision: shape.clone(),
            visual: shape.clone(),
            interaction: shape,
        }
    }

    /// The all-empty shape set (air).
    pub fn empty() -> Self {
        Self::uniform(Shape::empty())
    }

    /// A non-colliding shape set: visible and targetable but no collision.
    pub fn passable(shape: Shape) -> Self {
        Self {
            collision: Shape::empty(),
            visual: shape.clone(),
            interaction: shape,
        }
    }
}

/// Bounded, weak, identity-keyed memo for "is this shape a full solid cube?".
///
/// Used pervasively for sturdiness and support tests. Entries hold only weak
/// references, so shapes dropped elsewhere are reclaimed rather than pinned.
/// Safe to share across threads.
#[derive(Debug, Default)]
pub struct FullCubeCache {
    entries: Mutex<HashMap<usize, FullCubeEntry>>,
}

#[derive(Debug)]
struct FullCubeEntry {
    shape: Weak<ShapeData>,
    full: bool,
}

impl FullCubeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `shape` is indistinguishable from a solid cube, memoized by
    /// shape identity.
    pub fn is_full_cube(&self, shape: &Shape) -> bool {
        let key = shape.key();
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(entry) = entries.get(&key) {
            // A dead weak means the address was reused by a different shape.
            if entry.shape.strong_count() > 0 {
                return entry.full;
            }
        }
        let full = shape.covers_full_cube();
        if entries.len() >= FULL_CUBE_CACHE_SIZE {
            entries.retain(|_, e| e.shape.strong_count() > 0);
            if entries.len() >= FULL_CUBE_CACHE_SIZE {
                entries.clear();
            }
        }
        entries.insert(
            key,
            FullCubeEntry {
                shape: Arc::downgrade(&shape.0),
                full,
            },
        );
        full
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Strict-LRU cache for pairwise face-occlusion tests.
///
/// Keyed by the *unordered* pair of shape identities plus the queried face
/// (normalized under the swap, which is valid because the occlusion predicate
/// is symmetric in the pair). Each concurrent caller owns its own instance and
/// passes it by `&mut`; the cache is deliberately not shared, so it needs no
/// locking.
pub struct OcclusionCache {
    entries: LruCache<OcclusionKey, bool>,
}

#[derive(Clone, Copy, Eq, Hash, PartialEq)]
struct OcclusionKey {
    a: usize,
    b: usize,
    face: Face6,
}

impl OcclusionCache {
    pub fn new() -> Self {
        const CAP: NonZeroUsize = NonZeroUsize::new(OCCLUSION_CACHE_SIZE).unwrap();
        Self {
            entries: LruCache::new(CAP),
        }
    }

    /// Whether the `face` face of `a`, together with the matching face of the
    /// neighbor shape `b`, fully occludes the shared cell boundary.
    ///
    /// A hit promotes the entry to most-recently-used; insertion past capacity
    /// evicts the least-recently-used entry.
    pub fn face_occludes(&mut self, a: &Shape, b: &Shape, face: Face6) -> bool {
        let (a, b, face) = normalize(a, b, face);
        let key = OcclusionKey {
            a: a.key(),
            b: b.key(),
            face,
        };
        if let Some(&hit) = self.entries.get(&key) {
            return hit;
        }
        let result = face_union_covers(a, b, face);
        self.entries.put(key, result);
        result
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the pair is currently cached, without touching recency.
    #[cfg(test)]
    pub(crate) fn contains(&self, a: &Shape, b: &Shape, face: Face6) -> bool {
        let (a, b, face) = normalize(a, b, face);
        self.entries
            .peek(&OcclusionKey {
                a: a.key(),
                b: b.key(),
                face,
            })
            .is_some()
    }
}

impl Default for OcclusionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OcclusionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcclusionCache")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Normalizes an occlusion query to its unordered-pair form.
fn normalize<'s>(a: &'s Shape, b: &'s Shape, face: Face6) -> (&'s Shape, &'s Shape, Face6) {
    if a.key() <= b.key() {
        (a, b, face)
    } else {
        (b, a, face.opposite())
    }
}

/// The occlusion predicate: project `a`'s `face` face and `b`'s opposite face
/// onto the shared plane and test whether their union covers the whole face.
fn face_union_covers(a: &Shape, b: &Shape, face: Face6) -> bool {
    let mut rects = a.face_rects(face);
    rects.extend(b.face_rects(face.opposite()));
    if rects.is_empty() {
        return false;
    }
    let mut us = vec![0, BoxPart::EXTENT];
    let mut vs = vec![0, BoxPart::EXTENT];
    for &[u0, v0, u1, v1] in &rects {
        us.extend([u0, u1]);
        vs.extend([v0, v1]);
    }
    for axis in [&mut us, &mut vs] {
        axis.sort_unstable();
        axis.dedup();
    }
    for &u in &us[..us.len() - 1] {
        for &v in &vs[..vs.len() - 1] {
            if !rects
                .iter()
                .any(|&[u0, v0, u1, v1]| u0 <= u && u < u1 && v0 <= v && v < v1)
            {
                return false;
            }
        }
    }
    true
}
