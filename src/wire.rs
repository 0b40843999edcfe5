//! Redstone wire: per-direction connectivity, the dot/cross shape law, and
//! power resolution.
//!
//! Wire is the hardest block in the system because its state depends on cells
//! that are not direct 6-neighbors (the diagonal climb and descend cases) and
//! because power changes cascade through whole connected networks. Power
//! resolution is a strategy point ([`SignalEvaluator`]) with two
//! interchangeable implementations.

use std::collections::{HashMap, HashSet};

use arcstr::ArcStr;
use once_cell::sync::Lazy;

use crate::behavior::{Behavior, BlockKind};
use crate::math::{BoxPart, Face4, Face6, GridPoint};
use crate::property::{self, Assignment, Property, PropertyValue};
use crate::shape::{Shape, ShapeSet};
use crate::state::BlockState;
use crate::update::{UpdateFlags, UpdateSession, UPDATE_BUDGET};
use crate::world::{Effect, Grid};

/// The strongest signal any source can emit.
pub const MAX_POWER: u8 = 15;

/// Per-direction connectivity classification of a wire cell.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, exhaust::Exhaust)]
pub enum RedstoneSide {
    /// No connection in this direction.
    #[default]
    None,
    /// Coplanar connection.
    Side,
    /// The connection climbs onto the neighbor's top face.
    Up,
}

impl RedstoneSide {
    #[inline]
    pub fn is_connected(self) -> bool {
        !matches!(self, RedstoneSide::None)
    }

    /// The property-value name of this side.
    pub fn name(self) -> &'static str {
        match self {
            RedstoneSide::None => "none",
            RedstoneSide::Side => "side",
            RedstoneSide::Up => "up",
        }
    }

    fn from_name(name: &str) -> RedstoneSide {
        match name {
            "side" => RedstoneSide::Side,
            "up" => RedstoneSide::Up,
            _ => RedstoneSide::None,
        }
    }
}

pub static NORTH: Lazy<Property> =
    Lazy::new(|| Property::enumerated("north", ["none", "side", "up"]));
pub static EAST: Lazy<Property> =
    Lazy::new(|| Property::enumerated("east", ["none", "side", "up"]));
pub static SOUTH: Lazy<Property> =
    Lazy::new(|| Property::enumerated("south", ["none", "side", "up"]));
pub static WEST: Lazy<Property> =
    Lazy::new(|| Property::enumerated("west", ["none", "side", "up"]));
pub static POWER: Lazy<Property> = Lazy::new(|| Property::int("power", 0, MAX_POWER));

/// The wire side property for one horizontal direction.
pub fn side_property(direction: Face4) -> &'static Property {
    match direction {
        Face4::North => &NORTH,
        Face4::East => &EAST,
        Face4::South => &SOUTH,
        Face4::West => &WEST,
    }
}

/// Decodes one side of a wire state.
pub fn side_of(state: &BlockState, direction: Face4) -> RedstoneSide {
    state
        .get_name(side_property(direction))
        .map(|n| RedstoneSide::from_name(n))
        .unwrap_or_default()
}

/// Decodes the power level of a wire state.
pub fn power_of(state: &BlockState) -> u8 {
    state.get_int(&POWER).unwrap_or(0)
}

fn is_wire(state: &BlockState) -> bool {
    state.kind() == BlockKind::Wire
}

/// Raw connectivity of the wire at `position` toward one horizontal direction.
///
/// The upward diagonal check runs before the sideways check. The order is
/// semantically significant (the checks are not commutative when a conductor
/// carries a wire on top) and must not be reordered.
fn connection_toward(grid: &dyn Grid, position: GridPoint, direction: Face4) -> RedstoneSide {
    let up = Face6::PY.normal_vector();
    let neighbor_position = position + direction.normal_vector();
    let neighbor = grid.state_at(neighbor_position);

    // Climb onto the neighbor's top face, but only when this cell's own top
    // is open (nothing sturdy immediately above).
    let top_open = !grid.state_at(position + up).full_cube();
    if top_open && neighbor.full_cube() && is_wire(&grid.state_at(neighbor_position + up)) {
        return RedstoneSide::Up;
    }

    if is_wire(&neighbor)
        || neighbor
            .kind()
            .behavior()
            .connects_to_wire(&neighbor, direction.opposite())
    {
        return RedstoneSide::Side;
    }

    // Descend across the neighbor's cell when it does not block the way.
    if !neighbor.full_cube() && is_wire(&grid.state_at(neighbor_position - up)) {
        return RedstoneSide::Side;
    }
    RedstoneSide::None
}

/// All four connections of the wire at `position`, with the presentation law
/// applied.
pub fn connections_at(grid: &dyn Grid, position: GridPoint) -> [RedstoneSide; 4] {
    let mut sides = [RedstoneSide::None; 4];
    for direction in Face4::ALL {
        sides[direction as usize] = connection_toward(grid, position, direction);
    }
    apply_shape_law(sides)
}

/// A wire with no connections presents the isotropic dot. The moment any side
/// connects, a disconnected side whose own perpendicular axis carries no
/// connection is forced to `Side`, so a single east connection reads as an
/// east-west line rather than a one-armed stub.
fn apply_shape_law(mut sides: [RedstoneSide; 4]) -> [RedstoneSide; 4] {
    let ns = sides[Face4::North as usize].is_connected() || sides[Face4::South as usize].is_connected();
    let ew = sides[Face4::East as usize].is_connected() || sides[Face4::West as usize].is_connected();
    if !ns && !ew {
        return sides;
    }
    for direction in Face4::ALL {
        let cross_axis_connected = match direction {
            Face4::North | Face4::South => ew,
            Face4::East | Face4::West => ns,
        };
        let side = &mut sides[direction as usize];
        if !side.is_connected() && !cross_axis_connected {
            *side = RedstoneSide::Side;
        }
    }
    sides
}

/// The sibling of `state` with the given side assignment, power preserved.
pub fn with_connections(state: &BlockState, sides: [RedstoneSide; 4]) -> BlockState {
    let mut next = state.clone();
    for direction in Face4::ALL {
        let name = sides[direction as usize].name();
        next = next.with(
            side_property(direction),
            PropertyValue::Name(ArcStr::from(name)),
        );
    }
    next
}

/// Wire cells whose power can feed the wire at `position`: the four coplanar
/// neighbors plus the climb and descend diagonals, mirroring connectivity.
fn wire_neighbors(grid: &dyn Grid, position: GridPoint) -> Vec<GridPoint> {
    let up = Face6::PY.normal_vector();
    let top_open = !grid.state_at(position + up).full_cube();
    let mut found = Vec::new();
    for direction in Face4::ALL {
        let neighbor_position = position + direction.normal_vector();
        let neighbor = grid.state_at(neighbor_position);
        if is_wire(&neighbor) {
            found.push(neighbor_position);
            continue;
        }
        if top_open && neighbor.full_cube() && is_wire(&grid.state_at(neighbor_position + up)) {
            found.push(neighbor_position + up);
        }
        if !neighbor.full_cube() && is_wire(&grid.state_at(neighbor_position - up)) {
            found.push(neighbor_position - up);
        }
    }
    found
}

/// The power the wire at `position` should carry: direct non-wire sources at
/// full strength, adjacent wires decayed by exactly one hop, floored at 0.
///
/// Sources are queried with wire emission latched off, so two wires never
/// recurse into each other's source queries.
fn target_power(session: &mut UpdateSession<'_>, position: GridPoint) -> u8 {
    let direct = session.without_wire_power(|s| s.incoming_power(position));
    let mut from_wires = 0u8;
    for neighbor_position in wire_neighbors(session.grid(), position) {
        from_wires = from_wires.max(power_of(&session.state_at(neighbor_position)));
    }
    direct.max(from_wires.saturating_sub(1))
}

/// Power resolution strategy for wire networks. Selected per
/// [`Registry`](crate::registry::Registry); both implementations satisfy the
/// same observable decay law and differ in cascade shape and update count.
pub trait SignalEvaluator: Send + Sync {
    /// Recomputes power for the wire at `position` after a change at or next
    /// to it.
    fn wire_changed(&self, session: &mut UpdateSession<'_>, position: GridPoint, state: &BlockState);
}

/// Local recompute strategy: derive this wire's power from its immediate
/// surroundings and let ordinary neighbor propagation carry the change
/// outward. Decreases converge by repeated decay, so large networks pay many
/// intermediate updates, all bounded by the session budget.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultEvaluator;

impl SignalEvaluator for DefaultEvaluator {
    fn wire_changed(&self, session: &mut UpdateSession<'_>, position: GridPoint, state: &BlockState) {
        let target = target_power(session, position);
        if power_of(state) != target {
            let next = state.with(&POWER, PropertyValue::Int(target));
            session.set_state(position, next, UpdateFlags::ALL);
        }
    }
}

/// Network sweep strategy: collect the connected wire network breadth-first,
/// recompute every member from non-wire sources alone, relax the one-per-hop
/// decay to a fixpoint, then write the final levels back in a single pass.
/// Produces far fewer intermediate states than [`DefaultEvaluator`] on large
/// networks.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExperimentalEvaluator;

/// Upper bound on network size one sweep will collect.
const NETWORK_LIMIT: usize = UPDATE_BUDGET as usize;

impl SignalEvaluator for ExperimentalEvaluator {
    fn wire_changed(&self, session: &mut UpdateSession<'_>, position: GridPoint, _state: &BlockState) {
        if session.in_wire_sweep() {
            // A sweep already in progress will visit this wire.
            return;
        }
        session.with_wire_sweep(|session| {
            // Collect the network.
            let mut network: Vec<GridPoint> = vec![position];
            let mut seen: HashSet<GridPoint> = HashSet::from([position]);
            let mut next = 0;
            while next < network.len() && network.len() < NETWORK_LIMIT {
                let member = network[next];
                next += 1;
                for neighbor in wire_neighbors(session.grid(), member) {
                    if seen.insert(neighbor) {
                        network.push(neighbor);
                    }
                }
            }

            // Zero phase: every member restarts from its non-wire sources.
            let mut power: HashMap<GridPoint, u8> = HashMap::with_capacity(network.len());
            for &member in &network {
                let direct = session.without_wire_power(|s| s.incoming_power(member));
                power.insert(member, direct);
            }

            // Relax phase: propagate decayed power until nothing rises.
            loop {
                let mut changed = false;
                for index in 0..network.len() {
                    let member = network[index];
                    let mut best = power[&member];
                    for neighbor in wire_neighbors(session.grid(), member) {
                        // Wires just outside the collected network keep their
                        // stored power.
                        let feed = power
                            .get(&neighbor)
                            .copied()
                            .unwrap_or_else(|| power_of(&session.state_at(neighbor)));
                        best = best.max(feed.saturating_sub(1));
                    }
                    if best > power[&member] {
                        power.insert(member, best);
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }
            }

            // Write back. Member wires notified here see the sweep guard and
            // do not recurse; non-wire neighbors react normally.
            for &member in &network {
                let current = session.state_at(member);
                if !is_wire(&current) {
                    continue;
                }
                let target = power[&member];
                if power_of(&current) != target {
                    let next = current.with(&POWER, PropertyValue::Int(target));
                    session.set_state(member, next, UpdateFlags::ALL);
                }
            }
        });
    }
}

/// The wire behavior itself.
pub struct WireBehavior;

impl WireBehavior {
    fn dot_part() -> BoxPart {
        BoxPart::new([5, 0, 5], [11, 1, 11])
    }

    fn arm_part(direction: Face4) -> BoxPart {
        match direction {
            Face4::North => BoxPart::new([5, 0, 0], [11, 1, 11]),
            Face4::East => BoxPart::new([5, 0, 5], [16, 1, 11]),
            Face4::South => BoxPart::new([5, 0, 5], [11, 1, 16]),
            Face4::West => BoxPart::new([0, 0, 5], [11, 1, 11]),
        }
    }

    fn climb_part(direction: Face4) -> BoxPart {
        match direction {
            Face4::North => BoxPart::new([5, 0, 0], [11, 16, 1]),
            Face4::East => BoxPart::new([15, 0, 5], [16, 16, 11]),
            Face4::South => BoxPart::new([5, 0, 15], [11, 16, 16]),
            Face4::West => BoxPart::new([0, 0, 5], [1, 16, 11]),
        }
    }

    /// Visual shape for a side assignment: the dot alone, or the dot plus an
    /// arm per connected side (and a wall strip for climbing sides).
    fn shape_for(sides: [RedstoneSide; 4]) -> Shape {
        let mut shape = Shape::single(Self::dot_part());
        for direction in Face4::ALL {
            match sides[direction as usize] {
                RedstoneSide::None => {}
                RedstoneSide::Side => {
                    shape = shape.union(&Shape::single(Self::arm_part(direction)));
                }
                RedstoneSide::Up => {
                    shape = shape
                        .union(&Shape::single(Self::arm_part(direction)))
                        .union(&Shape::single(Self::climb_part(direction)));
                }
            }
        }
        shape
    }

    fn sides_from(assignment: &Assignment) -> [RedstoneSide; 4] {
        let mut sides = [RedstoneSide::None; 4];
        for direction in Face4::ALL {
            if let Some(name) = property::lookup_name(assignment, side_property(direction)) {
                sides[direction as usize] = RedstoneSide::from_name(name);
            }
        }
        sides
    }
}

impl Behavior for WireBehavior {
    fn shapes(&self, assignment: &Assignment) -> ShapeSet {
        ShapeSet::passable(Self::shape_for(Self::sides_from(assignment)))
    }

    fn update_shape(
        &self,
        session: &UpdateSession<'_>,
        position: GridPoint,
        state: &BlockState,
        _direction: Face6,
        _neighbor_position: GridPoint,
        _neighbor: &BlockState,
    ) -> BlockState {
        // Wire needs sturdy footing.
        let below = session.state_at(position + Face6::NY.normal_vector());
        if !below.full_cube() {
            return session.registry().air_state().clone();
        }
        with_connections(state, connections_at(session.grid(), position))
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
            let air = session.registry().air_state().clone();
            session.set_state(position, air, UpdateFlags::ALL);
            return;
        }
        let evaluator = session.registry().wire_evaluator();
        evaluator.wire_changed(session, position, state);
    }

    fn on_placed(
        &self,
        session: &mut UpdateSession<'_>,
        position: GridPoint,
        state: &BlockState,
        _replaced: &BlockState,
        _flags: UpdateFlags,
    ) {
        let connected = with_connections(state, connections_at(session.grid(), position));
        if !connected.same(state) {
            session.effects().play_effect(position, Effect::WireShapeChanged);
            session.set_state(position, connected, UpdateFlags::ALL);
        }
        let current = session.state_at(position);
        if is_wire(&current) {
            let evaluator = session.registry().wire_evaluator();
            evaluator.wire_changed(session, position, &current);
        }
    }

    fn signal(
        &self,
        session: &mut UpdateSession<'_>,
        _position: GridPoint,
        state: &BlockState,
        toward: Face6,
    ) -> u8 {
        // The latch: a wire mid-recomputation exposes no signal.
        if !session.wires_give_power() {
            return 0;
        }
        // Wires never power the cell above them.
        if toward == Face6::PY {
            return 0;
        }
        power_of(state)
    }

    fn connects_to_wire(&self, _state: &BlockState, _from: Face4) -> bool {
        true
    }

    /// Wire connectivity reaches cells outside the 6-neighborhood, so a wire
    /// change re-derives the diagonal climb and descend positions explicitly.
    fn update_indirect_neighbors(
        &self,
        session: &mut UpdateSession<'_>,
        position: GridPoint,
        flags: UpdateFlags,
    ) {
        let up = Face6::PY.normal_vector();
        for direction in Face4::ALL {
            let across = position + direction.normal_vector();
            for diagonal in [across + up, across - up] {
                let current = session.state_at(diagonal);
                if !is_wire(&current) {
                    continue;
                }
                let next = with_connections(&current, connections_at(session.grid(), diagonal));
                if !next.same(&current) {
                    session.effects().play_effect(diagonal, Effect::WireShapeChanged);
                    session.set_state(diagonal, next, flags & !UpdateFlags::NOTIFY_NEIGHBORS);
                }
            }
        }
    }
}
