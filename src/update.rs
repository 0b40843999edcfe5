//! Neighbor update propagation: the cascade machinery behind every cell change.

use bitflags::bitflags;

use crate::math::{Face6, GridPoint};
use crate::registry::Registry;
use crate::state::BlockState;
use crate::world::{EffectSink, Fluid, Grid};

bitflags! {
    /// Side-effect controls for a state change and the cascade it triggers.
    ///
    /// The bit assignments are a public interop contract and must not be
    /// renumbered.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct UpdateFlags: u32 {
        /// Run neighbor-changed reactions in the six adjacent cells.
        const NOTIFY_NEIGHBORS = 1 << 0;
        /// Announce the change to connected clients.
        const NOTIFY_CLIENTS = 1 << 1;
        /// The change is not rendered even when clients are notified.
        const INVISIBLE = 1 << 2;
        /// Clients re-render immediately rather than batching.
        const IMMEDIATE = 1 << 3;
        /// The caller asserts neighbor shapes are already consistent; skip
        /// re-deriving them.
        const KNOWN_SHAPE = 1 << 4;
        /// Broken blocks do not drop items.
        const SUPPRESS_DROPS = 1 << 5;
        /// The block was moved by an external mover rather than destroyed.
        const MOVED = 1 << 6;
        /// Skip the wire-specific diagonal shape re-derivation.
        const SKIP_WIRE_SHAPE_UPDATE = 1 << 7;
        /// Skip block-entity bookkeeping side effects.
        const SKIP_BLOCK_ENTITY = 1 << 8;
        /// Skip the placed-block reaction.
        const SKIP_ON_PLACE = 1 << 9;

        /// Quietest possible change.
        const NONE = Self::INVISIBLE.bits();
        /// The ordinary in-game change: propagate and announce.
        const ALL = Self::NOTIFY_NEIGHBORS.bits() | Self::NOTIFY_CLIENTS.bits();
        /// [`Self::ALL`] with immediate client re-render.
        const ALL_IMMEDIATE = Self::ALL.bits() | Self::IMMEDIATE.bits();
        /// Suppress every per-block side effect hook.
        const SKIP_ALL_SIDEEFFECTS =
            Self::SKIP_BLOCK_ENTITY.bits() | Self::SKIP_ON_PLACE.bits();
    }
}

/// Maximum number of state changes one root mutation may transitively cause.
/// When the budget runs out the cascade stops silently; this is the engine's
/// termination guarantee under cyclic configurations.
pub const UPDATE_BUDGET: u32 = 512;

/// Fixed neighbor visitation order, so that cascades are reproducible given
/// the same input grid.
pub const UPDATE_ORDER: [Face6; 6] = [
    Face6::NX,
    Face6::PX,
    Face6::NY,
    Face6::PY,
    Face6::NZ,
    Face6::PZ,
];

/// One root mutation's cascade.
///
/// A session borrows the grid, the effect sink, and the registry, and owns the
/// monotonically decreasing update budget. Create one per externally triggered
/// change and let it run to completion; everything inside is synchronous and
/// single-threaded.
pub struct UpdateSession<'a> {
    registry: &'a Registry,
    grid: &'a mut dyn Grid,
    effects: &'a mut dyn EffectSink,
    budget: u32,
    /// Cleared while a wire computes the signal it exposes, so that wires do
    /// not recursively query each other as sources. See
    /// [`crate::wire`] for the querying side.
    wires_give_power: bool,
    /// Set while a network-sweeping wire evaluator is writing results back,
    /// so member wires being notified do not start a nested sweep.
    wire_sweep: bool,
}

impl<'a> UpdateSession<'a> {
    pub fn new(
        registry: &'a Registry,
        grid: &'a mut dyn Grid,
        effects: &'a mut dyn EffectSink,
    ) -> Self {
        Self {
            registry,
            grid,
            effects,
            budget: UPDATE_BUDGET,
            wires_give_power: true,
            wire_sweep: false,
        }
    }

    /// The registry this cascade runs against.
    #[inline]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Read access to the grid.
    #[inline]
    pub fn grid(&self) -> &dyn Grid {
        &*self.grid
    }

    /// Shorthand for `self.grid().state_at(position)`.
    pub fn state_at(&self, position: GridPoint) -> BlockState {
        self.grid.state_at(position)
    }

    pub fn fluid_at(&self, position: GridPoint) -> Fluid {
        self.grid.fluid_at(position)
    }

    /// The effect sink.
    pub fn effects(&mut self) -> &mut dyn EffectSink {
        &mut *self.effects
    }

    /// Budget remaining for further state changes in this cascade.
    #[inline]
    pub fn remaining_budget(&self) -> u32 {
        self.budget
    }

    /// Whether a wire queried as a signal source right now would answer.
    #[inline]
    pub fn wires_give_power(&self) -> bool {
        self.wires_give_power
    }

    /// Runs `body` with wire signal emission latched off. Wires queried inside
    /// report 0, which breaks mutual wire-to-wire source recursion.
    pub fn without_wire_power<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.wires_give_power;
        self.wires_give_power = false;
        let result = body(self);
        self.wires_give_power = previous;
        result
    }

    /// Whether a network-sweeping wire evaluation is already in progress.
    #[inline]
    pub fn in_wire_sweep(&self) -> bool {
        self.wire_sweep
    }

    /// Runs `body` with the wire-sweep guard set.
    pub fn with_wire_sweep<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.wire_sweep;
        self.wire_sweep = true;
        let result = body(self);
        self.wire_sweep = previous;
        result
    }

    fn try_spend(&mut self) -> bool {
        match self.budget.checked_sub(1) {
            Some(rest) => {
                self.budget = rest;
                true
            }
            None => {
                log::debug!("update budget exhausted; halting propagation");
                false
            }
        }
    }

    /// Applies `state` at `position` and runs the consequences `flags` allow.
    ///
    /// Returns whether a change was applied. A no-op assignment (identical
    /// state) and a budget-exhausted assignment both return `false`; the
    /// latter is silent by design.
    pub fn set_state(
        &mut self,
        position: GridPoint,
        state: BlockState,
        flags: UpdateFlags,
    ) -> bool {
        let old = self.grid.state_at(position);
        if old.same(&state) {
            return false;
        }
        if !self.try_spend() {
            return false;
        }
        log::trace!("set {position:?} to {state:?} (was {old:?})");
        self.grid.set_state_raw(position, state.clone());

        if !old.same_block(&state) {
            if state.is_air()
                && !old.is_air()
                && !flags.contains(UpdateFlags::SUPPRESS_DROPS)
                && !flags.contains(UpdateFlags::MOVED)
            {
                self.effects.drop_items(position, &old);
            }
            if !flags.contains(UpdateFlags::SKIP_BLOCK_ENTITY) {
                old.kind()
                    .behavior()
                    .on_removed(self, position, &old, &state, flags);
            }
            if !flags.contains(UpdateFlags::SKIP_ON_PLACE) {
                state
                    .kind()
                    .behavior()
                    .on_placed(self, position, &state, &old, flags);
            }
        }

        // Wire connectivity depends on cells outside the 6-neighborhood, so
        // both the departing and the arriving state get a chance to re-derive
        // the diagonal positions.
        if !flags.contains(UpdateFlags::SKIP_WIRE_SHAPE_UPDATE) {
            old.kind()
                .behavior()
                .update_indirect_neighbors(self, position, flags);
            state
                .kind()
                .behavior()
                .update_indirect_neighbors(self, position, flags);
        }

        if flags.contains(UpdateFlags::NOTIFY_NEIGHBORS) {
            self.notify_neighbors(position, flags);
        }
        if !flags.contains(UpdateFlags::KNOWN_SHAPE) {
            self.update_neighbor_shapes(position, flags);
        }
        true
    }

    /// Runs the neighbor-changed reaction of each of the six adjacent cells,
    /// in [`UPDATE_ORDER`].
    pub fn notify_neighbors(&mut self, position: GridPoint, flags: UpdateFlags) {
        for face in UPDATE_ORDER {
            let neighbor_position = position + face.normal_vector();
            let neighbor = self.grid.state_at(neighbor_position);
            neighbor.kind().behavior().neighbor_changed(
                self,
                neighbor_position,
                &neighbor,
                face.opposite(),
                position,
                flags,
            );
        }
    }

    /// Asks each of the six adjacent cells for its would-be state given the
    /// change at `position`, applying any answers that differ.
    ///
    /// Applied changes clear `NOTIFY_NEIGHBORS` (shape re-derivation cascades
    /// through this path itself) and recurse through [`Self::set_state`], so
    /// they stay budget-bounded.
    pub fn update_neighbor_shapes(&mut self, position: GridPoint, flags: UpdateFlags) {
        let changed = self.grid.state_at(position);
        for face in UPDATE_ORDER {
            let neighbor_position = position + face.normal_vector();
            self.update_shape_at(neighbor_position, face.opposite(), position, &changed, flags);
        }
    }

    /// Re-derives the state of the cell at `position` in response to
    /// `neighbor` at `neighbor_position` (in direction `direction` from the
    /// cell) having changed.
    pub fn update_shape_at(
        &mut self,
        position: GridPoint,
        direction: Face6,
        neighbor_position: GridPoint,
        neighbor: &BlockState,
        flags: UpdateFlags,
    ) {
        let current = self.grid.state_at(position);
        let updated = current.kind().behavior().update_shape(
            self,
            position,
            &current,
            direction,
            neighbor_position,
            neighbor,
        );
        if !updated.same(&current) {
            self.set_state(
                position,
                updated,
                flags & !UpdateFlags::NOTIFY_NEIGHBORS,
            );
        }
    }

    /// The strongest signal reaching `position` from its six neighbors,
    /// excluding wires if the emission latch is currently off.
    pub fn incoming_power(&mut self, position: GridPoint) -> u8 {
        let mut power = 0;
        for face in UPDATE_ORDER {
            let neighbor_position = position + face.normal_vector();
            let neighbor = self.grid.state_at(neighbor_position);
            let signal = neighbor.kind().behavior().signal(
                self,
                neighbor_position,
                &neighbor,
                face.opposite(),
            );
            power = power.max(signal);
            if power >= crate::wire::MAX_POWER {
                break;
            }
        }
        power
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flag_bits_match_the_interop_contract() {
        assert_eq!(UpdateFlags::NOTIFY_NEIGHBORS.bits(), 1 << 0);
        assert_eq!(UpdateFlags::NOTIFY_CLIENTS.bits(), 1 << 1);
        assert_eq!(UpdateFlags::INVISIBLE.bits(), 1 << 2);
        assert_eq!(UpdateFlags::IMMEDIATE.bits(), 1 << 3);
        assert_eq!(UpdateFlags::KNOWN_SHAPE.bits(), 1 << 4);
        assert_eq!(UpdateFlags::SUPPRESS_DROPS.bits(), 1 << 5);
        assert_eq!(UpdateFlags::MOVED.bits(), 1 << 6);
        assert_eq!(UpdateFlags::SKIP_WIRE_SHAPE_UPDATE.bits(), 1 << 7);
        assert_eq!(UpdateFlags::SKIP_BLOCK_ENTITY.bits(), 1 << 8);
        assert_eq!(UpdateFlags::SKIP_ON_PLACE.bits(), 1 << 9);
    }

    #[test]
    fn composite_flags_are_fixed_combinations() {
        assert_eq!(UpdateFlags::NONE, UpdateFlags::INVISIBLE);
        assert_eq!(
            UpdateFlags::ALL,
            UpdateFlags::NOTIFY_NEIGHBORS | UpdateFlags::NOTIFY_CLIENTS
        );
        assert_eq!(
            UpdateFlags::ALL_IMMEDIATE,
            UpdateFlags::ALL | UpdateFlags::IMMEDIATE
        );
        assert_eq!(
            UpdateFlags::SKIP_ALL_SIDEEFFECTS,
            UpdateFlags::SKIP_BLOCK_ENTITY | UpdateFlags::SKIP_ON_PLACE
        );
    }

    #[test]
    fn update_order_is_the_documented_sequence() {
        assert_eq!(
            UPDATE_ORDER,
            [
                Face6::NX,
                Face6::PX,
                Face6::NY,
                Face6::PY,
                Face6::NZ,
                Face6::PZ
            ]
        );
    }
}
