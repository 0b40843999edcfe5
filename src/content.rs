//! The standard block set.
//!
//! One ready-made [`Registry`] covering every [`BlockKind`], for hosts that
//! want the stock behaviors and for this crate's own scenario tests.

use crate::behavior::{self, BlockKind};
use crate::property::PropertyValue;
use crate::registry::{Registry, RegistryBuilder, RegistryError};
use crate::wire::{self, DefaultEvaluator, SignalEvaluator};

/// Builds the standard block set with the [`DefaultEvaluator`] wire strategy.
pub fn standard_registry() -> Registry {
    standard_registry_with(Box::new(DefaultEvaluator))
}

/// Builds the standard block set with the given wire strategy.
pub fn standard_registry_with(evaluator: Box<dyn SignalEvaluator>) -> Registry {
    let mut builder = Registry::builder();
    builder.set_wire_evaluator(evaluator);
    install(&mut builder).expect("standard block set is internally consistent");
    builder
        .build()
        .expect("standard block set is internally consistent")
}

fn install(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder.register("air", BlockKind::Air, vec![], vec![])?;
    builder.register("stone", BlockKind::Solid, vec![], vec![])?;
    builder.register("scaffolding", BlockKind::Brittle, vec![], vec![])?;
    builder.register(
        "lever",
        BlockKind::Lever,
        vec![behavior::POWERED.clone(), behavior::FACING.clone()],
        vec![],
    )?;
    builder.register(
        "redstone_wire",
        BlockKind::Wire,
        vec![
            wire::NORTH.clone(),
            wire::EAST.clone(),
            wire::SOUTH.clone(),
            wire::WEST.clone(),
            wire::POWER.clone(),
        ],
        vec![],
    )?;
    builder.register(
        "oak_door",
        BlockKind::Door,
        vec![
            behavior::HALF.clone(),
            behavior::OPEN.clone(),
            behavior::POWERED.clone(),
            behavior::FACING.clone(),
        ],
        vec![],
    )?;
    builder.register("fire", BlockKind::Fire, vec![], vec![])?;
    builder.register(
        "pointed_dripstone",
        BlockKind::Dripstone,
        vec![behavior::HANGING.clone()],
        vec![(behavior::HANGING.clone(), PropertyValue::Bool(true))],
    )?;
    builder.register(
        "composter",
        BlockKind::Composter,
        vec![behavior::LEVEL.clone()],
        vec![],
    )?;
    builder.register(
        "bed",
        BlockKind::Bed,
        vec![behavior::PART.clone(), behavior::FACING.clone()],
        vec![],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wire_has_the_full_state_product() {
        let registry = standard_registry();
        let wire = registry.expect_block("redstone_wire");
        // 3 sides to the fourth power times 16 power levels.
        assert_eq!(wire.states().len(), 3 * 3 * 3 * 3 * 16);
    }

    #[test]
    fn every_kind_is_registered() {
        let registry = standard_registry();
        for name in [
            "air",
            "stone",
            "scaffolding",
            "lever",
            "redstone_wire",
            "oak_door",
            "fire",
            "pointed_dripstone",
            "composter",
            "bed",
        ] {
            assert!(registry.block_by_name(name).is_some(), "{name}");
        }
        assert!(registry.air_state().is_air());
    }

    #[test]
    fn solid_blocks_get_eager_full_cube_flags() {
        let registry = standard_registry();
        let stone = registry.expect_block("stone").default_state();
        assert!(stone.full_cube());
        assert!(stone.conducts_signal());
        assert!(stone.blocks_motion());

        let wire = registry.expect_block("redstone_wire").default_state();
        assert!(!wire.full_cube());
        assert!(!wire.blocks_motion());
    }

    #[test]
    fn dripstone_defaults_to_hanging() {
        let registry = standard_registry();
        let dripstone = registry.expect_block("pointed_dripstone").default_state();
        assert_eq!(dripstone.get_bool(&crate::behavior::HANGING), Some(true));
    }
}
