//! Per-block-kind behavior: the capability trait and the closed set of kinds.
//!
//! Block behavior is a closed set of tagged variants ([`BlockKind`]) dispatched
//! through the [`Behavior`] trait, not an open class hierarchy: a new kind of
//! block adds a variant and a trait impl. All impls are stateless unit structs;
//! everything a behavior needs arrives through its parameters.

use once_cell::sync::Lazy;

use crate::math::{BoxPart, Face4, Face6, GridPoint};
use crate::property::{Assignment, Property, PropertyValue};
use crate::scan::scan_toward;
use crate::shape::{Shape, ShapeSet};
use crate::state::BlockState;
use crate::update::{UpdateFlags, UpdateSession};
use crate::world::{Effect, Grid};

/// Every kind of block behavior in the system.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BlockKind {
    /// Empty space.
    Air,
    /// An inert full solid cube.
    Solid,
    /// A solid cube that breaks when any neighbor becomes air.
    Brittle,
    /// An orientable, toggleable signal source.
    Lever,
    /// Redstone wire; see [`crate::wire`].
    Wire,
    /// Two-cell door, upper and lower halves kept consistent.
    Door,
    /// Fire; needs sturdy support and has world-dependent geometry.
    Fire,
    /// Pointed dripstone; drips onto receptacles below.
    Dripstone,
    /// A fillable receptacle with a level.
    Composter,
    /// Two-cell bed, head and foot parts kept consistent.
    Bed,
}

impl BlockKind {
    /// The behavior implementation for this kind.
    pub fn behavior(self) -> &'static dyn Behavior {
        match self {
            BlockKind::Air => &AirBehavior,
            BlockKind::Solid => &SolidBehavior,
            BlockKind::Brittle => &BrittleBehavior,
            BlockKind::Lever => &LeverBehavior,
            BlockKind::Wire => &crate::wire::WireBehavior,
            BlockKind::Door => &DoorBehavior,
            BlockKind::Fire => &FireBehavior,
            BlockKind::Dripstone => &DripstoneBehavior,
            BlockKind::Composter => &ComposterBehavior,
            BlockKind::Bed => &BedBehavior,
        }
    }

    /// Whether this kind is empty space.
    #[inline]
    pub fn is_air(self) -> bool {
        matches!(self, BlockKind::Air)
    }

    /// Whether this kind participates in collision at all.
    pub fn collidable(self) -> bool {
        matches!(
            self,
            BlockKind::Solid
                | BlockKind::Brittle
                | BlockKind::Door
                | BlockKind::Dripstone
                | BlockKind::Composter
                | BlockKind::Bed
        )
    }

    /// Whether a full cube of this kind passes signal through itself.
    pub fn conducts_signal(self) -> bool {
        matches!(self, BlockKind::Solid | BlockKind::Brittle)
    }

    /// Whether geometry depends on neighboring cells and so cannot be
    /// memoized per state.
    pub fn dynamic_shape(self) -> bool {
        matches!(self, BlockKind::Fire)
    }
}

/// The per-kind capability interface.
///
/// All methods other than [`shapes`](Self::shapes) have no-op or delegating
/// defaults; kinds override exactly the reactions they care about.
/// `update_shape` must be a pure function of its arguments and grid reads.
pub trait Behavior: Sync {
    /// Static geometry of a state, from its property assignment alone.
    fn shapes(&self, assignment: &Assignment) -> ShapeSet;

    /// Geometry of a state as placed in the world. Only kinds reporting
    /// [`BlockKind::dynamic_shape`] should need to override this.
    fn shape_in_world(&self, _grid: &dyn Grid, _position: GridPoint, state: &BlockState) -> ShapeSet {
        self.shapes(state.assignment())
    }

    /// The state this cell should take given that `neighbor` in `direction`
    /// just became `neighbor_position`'s state. Returning the current state
    /// means no change.
    fn update_shape(
        &self,
        _session: &UpdateSession<'_>,
        _position: GridPoint,
        state: &BlockState,
        _direction: Face6,
        _neighbor_position: GridPoint,
        _neighbor: &BlockState,
    ) -> BlockState {
        state.clone()
    }

    /// Reaction to a completed state change at `changed_position`, which is
    /// the neighbor of this cell in `direction`.
    fn neighbor_changed(
        &self,
        _session: &mut UpdateSession<'_>,
        _position: GridPoint,
        _state: &BlockState,
        _direction: Face6,
        _changed_position: GridPoint,
        _flags: UpdateFlags,
    ) {
    }

    /// Reaction to this state having been placed over `replaced`.
    fn on_placed(
        &self,
        _session: &mut UpdateSession<'_>,
        _position: GridPoint,
        _state: &BlockState,
        _replaced: &BlockState,
        _flags: UpdateFlags,
    ) {
    }

    /// Reaction to this state having been replaced by `replacement`.
    fn on_removed(
        &self,
        _session: &mut UpdateSession<'_>,
        _position: GridPoint,
        _state: &BlockState,
        _replacement: &BlockState,
        _flags: UpdateFlags,
    ) {
    }

    /// Occasional scheduled tick; the entry point for slow ambient behavior.
    fn random_tick(&self, _session: &mut UpdateSession<'_>, _position: GridPoint, _state: &BlockState) {}

    /// Signal strength this state emits toward the neighbor in `toward`.
    fn signal(
        &self,
        _session: &mut UpdateSession<'_>,
        _position: GridPoint,
        _state: &BlockState,
        _toward: Face6,
    ) -> u8 {
        0
    }

    /// Whether a wire next to this state, approaching from `from`, should
    /// connect to it.
    fn connects_to_wire(&self, _state: &BlockState, _from: Face4) -> bool {
        false
    }

    /// Re-derivation of positions outside the 6-neighborhood that depend on
    /// this cell. Called from `set_state` unless `SKIP_WIRE_SHAPE_UPDATE`.
    fn update_indirect_neighbors(
        &self,
        _session: &mut UpdateSession<'_>,
        _position: GridPoint,
        _flags: UpdateFlags,
    ) {
    }
}

// Shared property descriptors. Statics so that every lookup site uses the
// value-equal descriptor without re-parsing names.
pub static POWERED: Lazy<Property> = Lazy::new(|| Property::boolean("powered"));
pub static OPEN: Lazy<Property> = Lazy::new(|| Property::boolean("open"));
pub static HANGING: Lazy<Property> = Lazy::new(|| Property::boolean("hanging"));
pub static FACING: Lazy<Property> =
    Lazy::new(|| Property::enumerated("facing", ["north", "east", "south", "west"]));
pub static HALF: Lazy<Property> = Lazy::new(|| Property::enumerated("half", ["lower", "upper"]));
pub static PART: Lazy<Property> = Lazy::new(|| Property::enumerated("part", ["foot", "head"]));
pub static LEVEL: Lazy<Property> = Lazy::new(|| Property::int("level", 0, 8));

/// Maximum steps when locating a dripstone formation's tip.
const TIP_SCAN_STEPS: u32 = 11;
/// Maximum air cells a drip may fall through to a receptacle.
const DRIP_SCAN_STEPS: u32 = 11;
/// Maximum horizontal distance searched for a bed stand-up position.
const STAND_UP_SCAN_STEPS: u32 = 7;

/// Decodes the `facing` property; states without it face north.
pub fn facing_of(state: &BlockState) -> Face4 {
    match state.get_name(&FACING).map(|n| n.as_str()) {
        Some("east") => Face4::East,
        Some("south") => Face4::South,
        Some("west") => Face4::West,
        _ => Face4::North,
    }
}

struct AirBehavior;

impl Behavior for AirBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::empty()
    }
}

struct SolidBehavior;

impl Behavior for SolidBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::uniform(Shape::cube())
    }
}

/// Breaks to air whenever an adjacent cell becomes air, so removing one block
/// of a connected formation takes the rest of it down (bounded by the update
/// budget).
struct BrittleBehavior;

impl Behavior for BrittleBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::uniform(Shape::cube())
    }

    fn neighbor_changed(
        &self,
        session: &mut UpdateSession<'_>,
        position: GridPoint,
        state: &BlockState,
        _direction: Face6,
        changed_position: GridPoint,
        _flags: UpdateFlags,
    ) {
        if !state.is_air() && session.state_at(changed_position).is_air() {
            let air = session.registry().air_state().clone();
            session.set_state(position, air, UpdateFlags::ALL);
        }
    }
}

struct LeverBehavior;

impl Behavior for LeverBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::passable(Shape::single(BoxPart::new([5, 0, 5], [11, 6, 11])))
    }

    fn signal(
        &self,
        _session: &mut UpdateSession<'_>,
        _position: GridPoint,
        state: &BlockState,
        _toward: Face6,
    ) -> u8 {
        if state.get_bool(&POWERED).unwrap_or(false) {
            crate::wire::MAX_POWER
        } else {
            0
        }
    }

    fn connects_to_wire(&self, _state: &BlockState, _from: Face4) -> bool {
        true
    }
}

/// Flips a lever and propagates the consequences. Returns `false` if the cell
/// does not hold a lever.
pub fn toggle_lever(session: &mut UpdateSession<'_>, position: GridPoint) -> bool {
    let state = session.state_at(position);
    if state.kind() != BlockKind::Lever {
        return false;
    }
    let powered = state.get_bool(&POWERED).unwrap_or(false);
    session.effects().play_effect(position, Effect::LeverToggled);
    let next = state.with(&POWERED, PropertyValue::Bool(!powered));
    session.set_state(position, next, UpdateFlags::ALL)
}

struct DoorBehavior;

impl DoorBehavior {
    fn is_upper(state: &BlockState) -> bool {
        state.get_name(&HALF).map(|n| n.as_str()) == Some("upper")
    }
}

impl Behavior for DoorBehavior {
    fn shapes(&self, assignment: &Assignment) -> ShapeSet {
        let open = crate::property::lookup_bool(assignment, &OPEN).unwrap_or(false);
        let part = if open {
            BoxPart::new([0, 0, 0], [3, 16, 16])
        } else {
            BoxPart::new([0, 0, 0], [16, 16, 3])
        };
        ShapeSet::uniform(Shape::single(part))
    }

    fn neighbor_changed(
        &self,
        session: &mut UpdateSession<'_>,
        position: GridPoint,
        state: &BlockState,
        _direction: Face6,
        _changed_position: GridPoint,
        _flags: UpdateFlags,
    ) {
        let upper = Self::is_upper(state);
        let partner_face = if upper { Face6::NY } else { Face6::PY };
        let partner_position = position + partner_face.normal_vector();
        let partner = session.state_at(partner_position);

        // A half whose partner disappeared breaks; the upper half never drops
        // so the pair yields one item total.
        if !partner.same_block(state) || Self::is_upper(&partner) == upper {
            let mut flags = UpdateFlags::ALL;
            if upper {
                flags |= UpdateFlags::SUPPRESS_DROPS;
            }
            let air = session.registry().air_state().clone();
            session.set_state(position, air, flags);
            return;
        }

        // The lower half owns the redstone response for the pair.
        if !upper {
            let powered = session.incoming_power(position).max(session.incoming_power(partner_position)) > 0;
            if powered != state.get_bool(&POWERED).unwrap_or(false) {
                session.effects().play_effect(position, Effect::DoorToggled);
                let next = state
                    .with(&POWERED, PropertyValue::Bool(powered))
                    .with(&OPEN, PropertyValue::Bool(powered));
                session.set_state(position, next, UpdateFlags::ALL);
                let partner_next = partner
                    .with(&POWERED, PropertyValue::Bool(powered))
                    .with(&OPEN, PropertyValue::Bool(powered));
                session.set_state(partner_position, partner_next, UpdateFlags::ALL);
            }
        }
    }
}

struct FireBehavior;

impl FireBehavior {
    fn base_shape() -> Shape {
        Shape::single(BoxPart::new([0, 0, 0], [16, 4, 16]))
    }

    fn wall_part(direction: Face4) -> BoxPart {
        match direction {
            Face4::North => BoxPart::new([0, 0, 0], [16, 16, 2]),
            Face4::East => BoxPart::new([14, 0, 0], [16, 16, 16]),
            Face4::South => BoxPart::new([0, 0, 14], [16, 16, 16]),
            Face4::West => BoxPart::new([0, 0, 0], [2, 16, 16]),
        }
    }
}

impl Behavior for FireBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::passable(Self::base_shape())
    }

    /// Flames climb the faces of adjacent full cubes, so the visual shape
    /// depends on the neighborhood, not just the state.
    fn shape_in_world(&self, grid: &dyn Grid, position: GridPoint, _state: &BlockState) -> ShapeSet {
        let mut shape = Self::base_shape();
        for direction in Face4::ALL {
            let neighbor = grid.state_at(position + direction.normal_vector());
            if neighbor.full_cube() {
                shape = shape.union(&Shape::single(Self::wall_part(direction)));
            }
        }
        ShapeSet::passable(shape)
    }

    fn neighbor_changed(
        &self,
        session: &mut UpdateSession<'_>,
        position: GridPoint,
        state: &BlockState,
        _direction: Face6,
        _changed_position: GridPoint,
        _flags: UpdateFlags,
    ) {
        if state.is_air() {
            return;
        }
        let below = session.state_at(position + Face6::NY.normal_vector());
        if !below.full_cube() {
            session.effects().play_effect(position, Effect::Extinguished);
            let air = session.registry().air_state().clone();
            session.set_state(position, air, UpdateFlags::ALL | UpdateFlags::SUPPRESS_DROPS);
        }
    }
}

struct DripstoneBehavior;

impl Behavior for DripstoneBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::uniform(Shape::single(BoxPart::new([6, 0, 6], [10, 16, 10])))
    }

    fn random_tick(&self, session: &mut UpdateSession<'_>, position: GridPoint, state: &BlockState) {
        if !state.get_bool(&HANGING).unwrap_or(false) {
            return;
        }
        // Walk down the formation to the first cell past its tip.
        let past_tip = scan_toward(
            session.grid(),
            position,
            Face6::NY,
            TIP_SCAN_STEPS,
            |s, _| !s.same_block(state),
            |s, _| s.same_block(state),
        );
        let Some(past_tip) = past_tip else { return };
        if !session.state_at(past_tip).is_air() {
            return;
        }
        // Then let the drip fall through air to a receptacle.
        let receptacle = scan_toward(
            session.grid(),
            past_tip,
            Face6::NY,
            DRIP_SCAN_STEPS,
            |s, _| s.kind() == BlockKind::Composter,
            |s, _| s.is_air(),
        );
        if let Some(receptacle) = receptacle {
            session.effects().play_effect(receptacle, Effect::Drip);
            fill_composter(session, receptacle);
        }
    }
}

struct ComposterBehavior;

impl Behavior for ComposterBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::uniform(Shape::single(BoxPart::new([0, 0, 0], [16, 15, 16])))
    }
}

/// Raises a composter's fill level by one, up to its maximum of 8. Returns
/// whether the level changed.
pub fn fill_composter(session: &mut UpdateSession<'_>, position: GridPoint) -> bool {
    let state = session.state_at(position);
    if state.kind() != BlockKind::Composter {
        return false;
    }
    let level = state.get_int(&LEVEL).unwrap_or(0);
    if level >= 8 {
        return false;
    }
    session.effects().play_effect(position, Effect::ComposterFilled);
    session.set_state(
        position,
        state.with(&LEVEL, PropertyValue::Int(level + 1)),
        UpdateFlags::ALL,
    )
}

struct BedBehavior;

impl BedBehavior {
    fn is_head(state: &BlockState) -> bool {
        state.get_name(&PART).map(|n| n.as_str()) == Some("head")
    }

    /// Direction from this part toward its partner.
    fn partner_direction(state: &BlockState) -> Face4 {
        let facing = facing_of(state);
        if Self::is_head(state) {
            facing.opposite()
        } else {
            facing
        }
    }
}

impl Behavior for BedBehavior {
    fn shapes(&self, _assignment: &Assignment) -> ShapeSet {
        ShapeSet::uniform(Shape::single(BoxPart::new([0, 0, 0], [16, 9, 16])))
    }

    fn neighbor_changed(
        &self,
        session: &mut UpdateSession<'_>,
        position: GridPoint,
        state: &BlockState,
        _direction: Face6,
        _changed_position: GridPoint,
        _flags: UpdateFlags,
    ) {
        let partner_position = position + Self::partner_direction(state).normal_vector();
        let partner = session.state_at(partner_position);
        if !partner.same_block(state) || Self::is_head(&partner) == Self::is_head(state) {
            let mut flags = UpdateFlags::ALL;
            if Self::is_head(state) {
                flags |= UpdateFlags::SUPPRESS_DROPS;
            }
            let air = session.registry().air_state().clone();
            session.set_state(position, air, flags);
        }
    }
}

/// Finds a safe position to stand next to the bed part at `position`: an air
/// cell with solid footing, searched horizontally in each direction in turn.
pub fn bed_stand_up_position(grid: &dyn Grid, position: GridPoint) -> Option<GridPoint> {
    for direction in Face4::ALL {
        let found = scan_toward(
            grid,
            position,
            direction.face6(),
            STAND_UP_SCAN_STEPS,
            |s, p| {
                s.is_air() && grid.state_at(p + Face6::NY.normal_vector()).blocks_motion()
            },
            |s, _| !s.blocks_motion(),
        );
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Dispatches a random tick to whatever occupies `position`.
pub fn random_tick_at(session: &mut UpdateSession<'_>, position: GridPoint) {
    let state = session.state_at(position);
    state.kind().behavior().random_tick(session, position, &state);
}
