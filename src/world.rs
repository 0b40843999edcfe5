//! Interfaces to the surrounding world: grid storage and side-effect sinks.
//!
//! The simulation core does not own world storage, rendering, sound, or loot.
//! It talks to those collaborators through the narrow traits here, and hosts
//! (including this crate's own tests) supply the implementations.

use std::collections::HashMap;

use crate::math::GridPoint;
use crate::state::BlockState;

/// The fluid occupying a cell, as far as block behavior cares.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Fluid {
    #[default]
    None,
    Water,
}

/// Read/write access to cell states; the world-grid collaborator.
///
/// Implementations store which [`BlockState`] each cell points to. They never
/// mutate states and they perform no propagation of their own;
/// [`set_state_raw`](Self::set_state_raw) is the dumb store, and all update
/// semantics live in [`UpdateSession`](crate::update::UpdateSession).
pub trait Grid {
    /// The state of the cell at `position`. Unoccupied cells report the
    /// grid's background state (normally air).
    fn state_at(&self, position: GridPoint) -> BlockState;

    /// Stores `state` at `position` with no side effects whatsoever.
    fn set_state_raw(&mut self, position: GridPoint, state: BlockState);

    /// The fluid at `position`.
    fn fluid_at(&self, _position: GridPoint) -> Fluid {
        Fluid::None
    }
}

/// An externally visible consequence of a block update, identified for the
/// effects collaborator to render, sound, or ignore. Fired and forgotten,
/// never awaited.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Effect {
    /// A wire snapped between its dot and directional shapes.
    WireShapeChanged,
    /// A door opened or closed.
    DoorToggled,
    /// A lever was switched.
    LeverToggled,
    /// A fire went out.
    Extinguished,
    /// A dripstone drip landed in a receptacle.
    Drip,
    /// A composter's fill level rose.
    ComposterFilled,
}

/// Receiver for side effects the core triggers but does not implement:
/// audiovisual effects and item drops.
pub trait EffectSink {
    /// Reports `effect` happening at `position`.
    fn play_effect(&mut self, position: GridPoint, effect: Effect);

    /// Requests item drops for a block broken at `position`. Loot computation
    /// is the host's business; the core only decides whether to call this.
    fn drop_items(&mut self, position: GridPoint, broken: &BlockState);
}

/// An [`EffectSink`] that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EffectSink for NullSink {
    fn play_effect(&mut self, _position: GridPoint, _effect: Effect) {}
    fn drop_items(&mut self, _position: GridPoint, _broken: &BlockState) {}
}

/// An [`EffectSink`] that records everything it receives, for tests and
/// headless hosts.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub effects: Vec<(GridPoint, Effect)>,
    pub drops: Vec<(GridPoint, BlockState)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EffectSink for RecordingSink {
    fn play_effect(&mut self, position: GridPoint, effect: Effect) {
        self.effects.push((position, effect));
    }
    fn drop_items(&mut self, position: GridPoint, broken: &BlockState) {
        self.drops.push((position, broken.clone()));
    }
}

/// Hash-map-backed [`Grid`] for tests and small hosts. Cells not explicitly
/// set report the background state given at construction.
#[derive(Clone, Debug)]
pub struct SparseGrid {
    cells: HashMap<GridPoint, BlockState>,
    fluids: HashMap<GridPoint, Fluid>,
    background: BlockState,
}

impl SparseGrid {
    /// Creates an empty grid whose every cell is `background` (normally the
    /// registry's air state).
    pub fn new(background: BlockState) -> Self {
        Self {
            cells: HashMap::new(),
            fluids: HashMap::new(),
            background,
        }
    }

    /// Sets the fluid at a position.
    pub fn set_fluid(&mut self, position: GridPoint, fluid: Fluid) {
        if fluid == Fluid::None {
            self.fluids.remove(&position);
        } else {
            self.fluids.insert(position, fluid);
        }
    }

    /// Number of cells holding a non-background state.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Grid for SparseGrid {
    fn state_at(&self, position: GridPoint) -> BlockState {
        self.cells
            .get(&position)
            .unwrap_or(&self.background)
            .clone()
    }

    fn set_state_raw(&mut self, position: GridPoint, state: BlockState) {
        if state.same(&self.background) {
            self.cells.remove(&position);
        } else {
            self.cells.insert(position, state);
        }
    }

    fn fluid_at(&self, position: GridPoint) -> Fluid {
        self.fluids.get(&position).copied().unwrap_or_default()
    }
}
