//! Block registration and the process-wide state table.
//!
//! The [`Registry`] is an explicit context object, built once at startup and
//! passed into every [`UpdateSession`](crate::update::UpdateSession); there is
//! no global mutable table, so tests construct a fresh registry each. After
//! [`RegistryBuilder::build`] the registry is read-only and safe to share.

use std::collections::HashMap;
use std::fmt;

use arcstr::ArcStr;

use crate::behavior::BlockKind;
use crate::property::{Property, PropertyValue};
use crate::shape::FullCubeCache;
use crate::state::{BlockId, BlockState, StateDefinition, StateId};
use crate::wire::{DefaultEvaluator, SignalEvaluator};

/// Registration failures a host can meaningfully handle.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("block {0:?} is already registered")]
    DuplicateName(ArcStr),

    /// The id-fallback contract requires a well-known empty state, so the
    /// block registered first must be air.
    #[error("the first registered block must be air, got {0:?}")]
    FirstBlockNotAir(ArcStr),

    #[error("no blocks were registered")]
    Empty,
}

struct PendingBlock {
    name: ArcStr,
    kind: BlockKind,
    properties: Vec<Property>,
    default: Vec<(Property, PropertyValue)>,
}

/// Accumulates block declarations and produces a [`Registry`].
pub struct RegistryBuilder {
    pending: Vec<PendingBlock>,
    evaluator: Box<dyn SignalEvaluator>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            evaluator: Box::new(DefaultEvaluator),
        }
    }

    /// Declares a block type. `default` may assign any subset of
    /// `properties`; unassigned properties default to their first value.
    pub fn register(
        &mut self,
        name: impl Into<ArcStr>,
        kind: BlockKind,
        properties: Vec<Property>,
        default: Vec<(Property, PropertyValue)>,
    ) -> Result<BlockId, RegistryError> {
        let name = name.into();
        if self.pending.iter().any(|p| p.name == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let id = BlockId(self.pending.len() as u16);
        self.pending.push(PendingBlock {
            name,
            kind,
            properties,
            default,
        });
        Ok(id)
    }

    /// Selects the wire power resolution strategy. Defaults to
    /// [`DefaultEvaluator`].
    pub fn set_wire_evaluator(&mut self, evaluator: Box<dyn SignalEvaluator>) -> &mut Self {
        self.evaluator = evaluator;
        self
    }

    /// Builds every state table and assigns the dense global state ids, in
    /// registration order.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let Some(first) = self.pending.first() else {
            return Err(RegistryError::Empty);
        };
        if !first.kind.is_air() {
            return Err(RegistryError::FirstBlockNotAir(first.name.clone()));
        }

        let full_cube_cache = FullCubeCache::new();
        let mut by_name = HashMap::with_capacity(self.pending.len());
        let mut blocks = Vec::with_capacity(self.pending.len());
        for (index, pending) in self.pending.into_iter().enumerate() {
            by_name.insert(pending.name.clone(), BlockId(index as u16));
            blocks.push(StateDefinition::build(
                BlockId(index as u16),
                pending.name,
                pending.kind,
                pending.properties,
                &pending.default,
                &full_cube_cache,
            ));
        }

        let mut states = Vec::new();
        for definition in &blocks {
            for state in definition.states() {
                state.initialize_id(states.len() as StateId);
                states.push(state.clone());
            }
        }
        log::debug!(
            "registry built: {} blocks, {} states",
            blocks.len(),
            states.len()
        );

        Ok(Registry {
            blocks,
            by_name,
            states,
            evaluator: self.evaluator,
            full_cube_cache,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The read-only context the simulation runs against: every block type, the
/// dense global state-id table, the wire evaluation strategy, and the shared
/// full-cube cache.
pub struct Registry {
    blocks: Vec<StateDefinition>,
    by_name: HashMap<ArcStr, BlockId>,
    states: Vec<BlockState>,
    evaluator: Box<dyn SignalEvaluator>,
    full_cube_cache: FullCubeCache,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The definition of a registered block type.
    pub fn definition(&self, block: BlockId) -> &StateDefinition {
        &self.blocks[block.index()]
    }

    /// Looks a block type up by name.
    pub fn block_by_name(&self, name: &str) -> Option<&StateDefinition> {
        self.by_name.get(name).map(|&id| self.definition(id))
    }

    /// [`Self::block_by_name`] for names the caller knows are registered.
    #[track_caller]
    pub fn expect_block(&self, name: &str) -> &StateDefinition {
        self.block_by_name(name)
            .unwrap_or_else(|| panic!("block {name:?} is not registered"))
    }

    /// The well-known empty state.
    pub fn air_state(&self) -> &BlockState {
        self.blocks[0].default_state()
    }

    /// The state with the given dense id. Unknown ids degrade silently to the
    /// air state; hot paths must not fail on stale stored ids.
    pub fn state_by_id(&self, id: StateId) -> &BlockState {
        self.states.get(id as usize).unwrap_or_else(|| {
            log::trace!("unknown state id {id}, substituting air");
            self.air_state()
        })
    }

    /// Total number of states across all block types.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The configured wire power resolution strategy.
    pub fn wire_evaluator(&self) -> &dyn SignalEvaluator {
        &*self.evaluator
    }

    /// The shared full-cube test cache.
    pub fn full_cube_cache(&self) -> &FullCubeCache {
        &self.full_cube_cache
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("blocks", &self.blocks.len())
            .field("states", &self.states.len())
            .finish_non_exhaustive()
    }
}
