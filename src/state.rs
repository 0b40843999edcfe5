//! The block-state flyweight table.
//!
//! A [`StateDefinition`] owns every [`BlockState`] of one block type: the full
//! Cartesian product of its declared property domains, constructed once at
//! startup and interned. Semantically equal assignments resolve to the same
//! instance, so the rest of the engine compares states by identity
//! ([`BlockState::same`]) instead of deep equality.

use std::fmt;
use std::sync::{Arc, Weak};

use arcstr::ArcStr;
use itertools::Itertools as _;
use once_cell::sync::OnceCell;

use crate::behavior::BlockKind;
use crate::math::GridPoint;
use crate::property::{self, Assignment, Property, PropertyValue};
use crate::shape::{FullCubeCache, ShapeSet};
use crate::world::Grid;

/// Stable dense identifier of a [`BlockState`] within one
/// [`Registry`](crate::registry::Registry), for compact storage.
pub type StateId = u32;

/// Identifier of a block type within one registry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BlockId(pub(crate) u16);

impl BlockId {
    /// Index into the registry's block table.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// State-invariant scalar properties, computed eagerly at table build-out
/// because they are consulted on hot paths.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StateFlags {
    /// The state is empty space.
    pub is_air: bool,
    /// The state has a nonempty collision shape.
    pub blocks_motion: bool,
    /// The state is a solid conductor that signal can pass through.
    pub conducts_signal: bool,
    /// The collision shape is indistinguishable from a solid cube; used for
    /// sturdiness and support tests.
    pub full_cube: bool,
}

/// An immutable flyweight combining a block type with one legal assignment of
/// its declared properties.
///
/// Cheap to clone (shared). [`PartialEq`] and [`Hash`] are identity-based:
/// the flyweight invariant guarantees that equal assignments are the same
/// allocation. Grid cells "change state" by pointing at a different
/// `BlockState`, never by mutating one.
#[derive(Clone)]
pub struct BlockState(Arc<StateData>);

struct StateData {
    block: BlockId,
    block_name: ArcStr,
    kind: BlockKind,
    definition: Weak<DefinitionInner>,
    ordinal: u32,
    assignment: Vec<(Property, PropertyValue)>,
    flags: StateFlags,
    /// Memoized derived geometry; left unset for dynamic-shape blocks, whose
    /// geometry depends on neighboring cells.
    shapes: OnceCell<ShapeSet>,
    /// Assigned when the owning registry is built.
    id: OnceCell<StateId>,
}

impl BlockState {
    /// The owning block type.
    #[inline]
    pub fn block(&self) -> BlockId {
        self.0.block
    }

    /// The owning block type's name.
    pub fn block_name(&self) -> &ArcStr {
        &self.0.block_name
    }

    /// The owning block type's behavior kind.
    #[inline]
    pub fn kind(&self) -> BlockKind {
        self.0.kind
    }

    /// Position of this state within its definition's state list.
    #[inline]
    pub fn ordinal(&self) -> u32 {
        self.0.ordinal
    }

    /// The property assignment of this state, in declared property order.
    pub fn assignment(&self) -> &Assignment {
        &self.0.assignment
    }

    /// The value assigned to `property`, if the block declares it.
    pub fn get(&self, property: &Property) -> Option<&PropertyValue> {
        property::lookup(&self.0.assignment, property)
    }

    /// [`Self::get`] narrowed to boolean properties.
    pub fn get_bool(&self, property: &Property) -> Option<bool> {
        property::lookup_bool(&self.0.assignment, property)
    }

    /// [`Self::get`] narrowed to integer properties.
    pub fn get_int(&self, property: &Property) -> Option<u8> {
        property::lookup_int(&self.0.assignment, property)
    }

    /// [`Self::get`] narrowed to enumeration properties.
    pub fn get_name(&self, property: &Property) -> Option<&ArcStr> {
        property::lookup_name(&self.0.assignment, property)
    }

    /// The eagerly computed scalar flags.
    #[inline]
    pub fn flags(&self) -> StateFlags {
        self.0.flags
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.0.flags.is_air
    }

    #[inline]
    pub fn blocks_motion(&self) -> bool {
        self.0.flags.blocks_motion
    }

    #[inline]
    pub fn conducts_signal(&self) -> bool {
        self.0.flags.conducts_signal
    }

    #[inline]
    pub fn full_cube(&self) -> bool {
        self.0.flags.full_cube
    }

    /// Identity comparison; same as `==` but named to make call sites explicit.
    #[inline]
    pub fn same(&self, other: &BlockState) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether two states belong to the same block type.
    #[inline]
    pub fn same_block(&self, other: &BlockState) -> bool {
        self.0.block == other.0.block
    }

    /// The sibling state differing from this one only in `property`.
    ///
    /// Panics if the block does not declare `property` or `value` is not in
    /// its domain; both are programmer errors.
    #[track_caller]
    pub fn with(&self, property: &Property, value: PropertyValue) -> BlockState {
        let definition = self.definition();
        let index = definition
            .properties
            .iter()
            .position(|p| p == property)
            .unwrap_or_else(|| {
                panic!(
                    "block {:?} has no property {:?}",
                    self.0.block_name,
                    property.name()
                )
            });
        let value_index = property.index_of(&value).unwrap_or_else(|| {
            panic!("{value:?} is not a legal value of {:?}", property.name())
        }) as u32;

        // States are laid out row-major over the property domains, so a
        // sibling is one mixed-radix digit replacement away.
        let stride: u32 = definition.properties[index + 1..]
            .iter()
            .map(|p| p.domain_len() as u32)
            .product();
        let radix = property.domain_len() as u32;
        let current = (self.0.ordinal / stride) % radix;
        let ordinal = self.0.ordinal - current * stride + value_index * stride;
        definition.states()[ordinal as usize].clone()
    }

    /// The memoized shape set, or [`None`] for dynamic-shape blocks.
    pub fn static_shapes(&self) -> Option<&ShapeSet> {
        self.0.shapes.get()
    }

    /// The shape set of this state as placed at `position` in `grid`.
    ///
    /// For ordinary blocks this is the memoized per-state result; blocks whose
    /// kind is marked dynamic recompute from world context on every query.
    pub fn shapes_in(&self, grid: &dyn Grid, position: GridPoint) -> ShapeSet {
        match self.0.shapes.get() {
            Some(shapes) => shapes.clone(),
            None => self.0.kind.behavior().shape_in_world(grid, position, self),
        }
    }

    /// The registry-wide dense id of this state.
    ///
    /// Panics if the owning registry has not been built yet.
    pub fn id(&self) -> StateId {
        *self
            .0
            .id
            .get()
            .expect("BlockState::id called before registry build")
    }

    pub(crate) fn initialize_id(&self, id: StateId) {
        self.0
            .id
            .set(id)
            .expect("BlockState id assigned more than once");
    }

    fn definition(&self) -> Arc<DefinitionInner> {
        self.0
            .definition
            .upgrade()
            .expect("state definition dropped while its states are alive")
    }
}

impl fmt::Debug for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.block_name)?;
        if !self.0.assignment.is_empty() {
            write!(f, "[")?;
            for (i, (p, v)) in self.0.assignment.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={v:?}", p.name())?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl PartialEq for BlockState {
    /// Identity comparison, per the flyweight contract.
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}
impl Eq for BlockState {}

impl std::hash::Hash for BlockState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// The interned set of every [`BlockState`] of one block type.
#[derive(Clone)]
pub struct StateDefinition(Arc<DefinitionInner>);

pub(crate) struct DefinitionInner {
    block: BlockId,
    name: ArcStr,
    kind: BlockKind,
    properties: Vec<Property>,
    default_ordinal: u32,
    /// Set exactly once at the end of [`StateDefinition::build`]; the cell
    /// only exists because states hold a back-reference to this struct.
    states: OnceCell<Vec<BlockState>>,
}

impl DefinitionInner {
    fn states(&self) -> &[BlockState] {
        self.states
            .get()
            .expect("state definition queried before build-out finished")
    }
}

impl StateDefinition {
    /// Builds the full state table for one block type: the Cartesian product
    /// of `properties`' domains, in row-major order with the first property
    /// varying slowest.
    ///
    /// Every state eagerly computes its [`StateFlags`], and blocks without
    /// dynamic shapes compute and install their shape sets immediately, so
    /// later queries are lookups. Panics on duplicate property names (a
    /// programmer error).
    pub(crate) fn build(
        block: BlockId,
        name: ArcStr,
        kind: BlockKind,
        properties: Vec<Property>,
        default: &Assignment,
        full_cube_cache: &FullCubeCache,
    ) -> StateDefinition {
        for (i, property) in properties.iter().enumerate() {
            assert!(
                !properties[..i].iter().any(|p| p.name() == property.name()),
                "block {name:?} declares property {:?} twice",
                property.name(),
            );
        }

        let inner = Arc::new(DefinitionInner {
            block,
            name: name.clone(),
            kind,
            default_ordinal: ordinal_of(&properties, default, &name),
            properties: properties.clone(),
            states: OnceCell::new(),
        });

        let combinations: Vec<Vec<PropertyValue>> = if properties.is_empty() {
            vec![Vec::new()]
        } else {
            properties
                .iter()
                .map(|p| p.domain().to_vec())
                .multi_cartesian_product()
                .collect()
        };

        let behavior = kind.behavior();
        let states: Vec<BlockState> = combinations
            .into_iter()
            .enumerate()
            .map(|(ordinal, values)| {
                let assignment: Vec<(Property, PropertyValue)> =
                    properties.iter().cloned().zip(values).collect();
                let shapes = behavior.shapes(&assignment);
                let full_cube = full_cube_cache.is_full_cube(&shapes.collision);
                let flags = StateFlags {
                    is_air: kind.is_air(),
                    blocks_motion: kind.collidable() && !shapes.collision.is_empty(),
                    conducts_signal: kind.conducts_signal() && full_cube,
                    full_cube,
                };
                let shape_cell = OnceCell::new();
                if !kind.dynamic_shape() {
                    shape_cell.set(shapes).expect("fresh cell");
                }
                BlockState(Arc::new(StateData {
                    block,
                    block_name: name.clone(),
                    kind,
                    definition: Arc::downgrade(&inner),
                    ordinal: ordinal as u32,
                    assignment,
                    flags,
                    shapes: shape_cell,
                    id: OnceCell::new(),
                }))
            })
            .collect();

        inner
            .states
            .set(states)
            .expect("state definition built twice");
        StateDefinition(inner)
    }

    /// The block type this definition describes.
    pub fn block(&self) -> BlockId {
        self.0.block
    }

    /// The block type's name.
    pub fn name(&self) -> &ArcStr {
        &self.0.name
    }

    /// The declared properties, in order.
    pub fn properties(&self) -> &[Property] {
        &self.0.properties
    }

    /// Every state of this block type, in ordinal order.
    pub fn states(&self) -> &[BlockState] {
        self.0.states()
    }

    /// An arbitrary but deterministic state (ordinal zero), for callers that
    /// need "some state of this block" before configuring it.
    pub fn any(&self) -> &BlockState {
        &self.0.states()[0]
    }

    /// The block's chosen default state.
    pub fn default_state(&self) -> &BlockState {
        &self.0.states()[self.0.default_ordinal as usize]
    }
}

impl fmt::Debug for StateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDefinition")
            .field("name", &self.0.name)
            .field("kind", &self.0.kind)
            .field("properties", &self.0.properties)
            .field("states", &self.0.states().len())
            .finish()
    }
}

/// Computes the row-major ordinal of a (possibly partial) assignment;
/// unassigned properties take their first domain value.
#[track_caller]
fn ordinal_of(properties: &[Property], assignment: &Assignment, block_name: &ArcStr) -> u32 {
    let mut ordinal = 0u32;
    for property in properties {
        ordinal *= property.domain_len() as u32;
        if let Some(value) = property::lookup(assignment, property) {
            let index = property.index_of(value).unwrap_or_else(|| {
                panic!(
                    "default {value:?} is not a legal value of {:?} on block {block_name:?}",
                    property.name()
                )
            });
            ordinal += index as u32;
        }
    }
    for (property, _) in assignment {
        assert!(
            properties.contains(property),
            "default assignment names property {:?} which block {block_name:?} does not declare",
            property.name(),
        );
    }
    ordinal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use pretty_assertions::assert_eq;

    fn test_definition() -> StateDefinition {
        let powered = Property::boolean("powered");
        let level = Property::int("level", 0, 3);
        StateDefinition::build(
            BlockId(7),
            arcstr::literal!("fixture"),
            BlockKind::Solid,
            vec![powered.clone(), level],
            &[(powered, PropertyValue::Bool(true))],
            &FullCubeCache::new(),
        )
    }

    #[test]
    fn cardinality_is_exact_cartesian_product() {
        let definition = test_definition();
        assert_eq!(definition.states().len(), 2 * 4);
    }

    #[test]
    fn equal_assignments_are_reference_equal() {
        let definition = test_definition();
        let level = Property::int("level", 0, 3);
        let a = definition.any().with(&level, PropertyValue::Int(2));
        let b = definition.any().with(&level, PropertyValue::Int(2));
        assert!(a.same(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn with_replaces_one_property_and_holds_the_rest() {
        let definition = test_definition();
        let powered = Property::boolean("powered");
        let level = Property::int("level", 0, 3);

        let state = definition
            .any()
            .with(&powered, PropertyValue::Bool(true))
            .with(&level, PropertyValue::Int(3));
        assert_eq!(state.get_bool(&powered), Some(true));
        assert_eq!(state.get_int(&level), Some(3));

        let toggled = state.with(&powered, PropertyValue::Bool(false));
        assert_eq!(toggled.get_bool(&powered), Some(false));
        assert_eq!(toggled.get_int(&level), Some(3));
        // Round trip returns the identical instance.
        assert!(
            toggled
                .with(&powered, PropertyValue::Bool(true))
                .same(&state)
        );
    }

    #[test]
    fn default_state_uses_declared_defaults_and_first_values() {
        let definition = test_definition();
        let powered = Property::boolean("powered");
        let level = Property::int("level", 0, 3);
        let default = definition.default_state();
        assert_eq!(default.get_bool(&powered), Some(true));
        assert_eq!(default.get_int(&level), Some(0));
    }

    #[test]
    fn states_know_their_ordinals() {
        let definition = test_definition();
        for (i, state) in definition.states().iter().enumerate() {
            assert_eq!(state.ordinal() as usize, i);
        }
    }

    #[test]
    fn flags_computed_eagerly_for_solid_blocks() {
        let definition = test_definition();
        let flags = definition.any().flags();
        assert!(flags.blocks_motion);
        assert!(flags.full_cube);
        assert!(flags.conducts_signal);
        assert!(!flags.is_air);
    }

    #[test]
    #[should_panic(expected = "declares property")]
    fn duplicate_property_rejected() {
        let powered = Property::boolean("powered");
        StateDefinition::build(
            BlockId(0),
            arcstr::literal!("broken"),
            BlockKind::Solid,
            vec![powered.clone(), powered],
            &[],
            &FullCubeCache::new(),
        );
    }

    #[test]
    #[should_panic(expected = "is not a legal value")]
    fn with_rejects_foreign_values() {
        let definition = test_definition();
        let level = Property::int("level", 0, 3);
        definition.any().with(&level, PropertyValue::Int(9));
    }
}
