//! End-to-end scenarios exercising propagation, wire resolution, and the
//! supplemental block behaviors against a real grid.

use pretty_assertions::assert_eq;
use rstest::rstest;

use gridstone::behavior::{self, BlockKind};
use gridstone::content;
use gridstone::math::{Face4, GridPoint};
use gridstone::state::BlockState;
use gridstone::wire::{self, ExperimentalEvaluator, RedstoneSide};
use gridstone::world::{Effect, Grid, RecordingSink, SparseGrid};
use gridstone::{PropertyValue, Registry, UpdateFlags, UpdateSession};

fn p(x: i32, y: i32, z: i32) -> GridPoint {
    GridPoint::new(x, y, z)
}

struct World {
    registry: Registry,
    grid: SparseGrid,
    sink: RecordingSink,
}

impl World {
    fn new() -> World {
        World::with_registry(content::standard_registry())
    }

    fn with_registry(registry: Registry) -> World {
        let grid = SparseGrid::new(registry.air_state().clone());
        World {
            registry,
            grid,
            sink: RecordingSink::new(),
        }
    }

    /// Places a block's default state without triggering updates, for setup.
    fn place(&mut self, position: GridPoint, name: &str) {
        let state = self.registry.expect_block(name).default_state().clone();
        self.grid.set_state_raw(position, state);
    }

    fn state(&self, position: GridPoint) -> BlockState {
        self.grid.state_at(position)
    }

    fn session(&mut self) -> UpdateSession<'_> {
        UpdateSession::new(&self.registry, &mut self.grid, &mut self.sink)
    }
}

/// Stone floor plus a lever feeding a 16-cell wire line; returns the wire
/// powers by distance after the lever is switched on.
fn powered_line_levels(registry: Registry) -> Vec<u8> {
    let mut world = World::with_registry(registry);
    for x in 0..=16 {
        world.place(p(x, 0, 0), "stone");
    }
    world.place(p(0, 1, 0), "lever");
    for x in 1..=16 {
        world.place(p(x, 1, 0), "redstone_wire");
    }

    let mut session = world.session();
    assert!(behavior::toggle_lever(&mut session, p(0, 1, 0)));

    (1..=16).map(|x| wire::power_of(&world.state(p(x, 1, 0)))).collect()
}

#[test]
fn power_decays_one_per_hop() {
    let levels = powered_line_levels(content::standard_registry());
    let expected: Vec<u8> = (0..16).map(|k| 15u8.saturating_sub(k)).collect();
    assert_eq!(levels, expected);
}

#[test]
fn experimental_evaluator_matches_the_decay_law() {
    let levels =
        powered_line_levels(content::standard_registry_with(Box::new(ExperimentalEvaluator)));
    let expected: Vec<u8> = (0..16).map(|k| 15u8.saturating_sub(k)).collect();
    assert_eq!(levels, expected);
}

#[rstest]
#[case::default_strategy(content::standard_registry())]
#[case::experimental_strategy(content::standard_registry_with(Box::new(ExperimentalEvaluator)))]
fn switching_the_lever_off_depowers_the_line(#[case] registry: Registry) {
    let mut world = World::with_registry(registry);
    for x in 0..=8 {
        world.place(p(x, 0, 0), "stone");
    }
    world.place(p(0, 1, 0), "lever");
    for x in 1..=8 {
        world.place(p(x, 1, 0), "redstone_wire");
    }

    let mut session = world.session();
    behavior::toggle_lever(&mut session, p(0, 1, 0));
    let mut session = world.session();
    behavior::toggle_lever(&mut session, p(0, 1, 0));

    for x in 1..=8 {
        assert_eq!(wire::power_of(&world.state(p(x, 1, 0))), 0, "x={x}");
    }
}

#[test]
fn lone_wire_presents_a_dot() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    let wire_state = world.registry.expect_block("redstone_wire").default_state().clone();

    let mut session = world.session();
    session.set_state(p(0, 1, 0), wire_state, UpdateFlags::ALL);

    let placed = world.state(p(0, 1, 0));
    for direction in Face4::ALL {
        assert_eq!(wire::side_of(&placed, direction), RedstoneSide::None, "{direction:?}");
    }
}

#[test]
fn one_neighbor_snaps_both_wires_into_a_line() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    world.place(p(1, 0, 0), "stone");
    let wire_state = world.registry.expect_block("redstone_wire").default_state().clone();

    let mut session = world.session();
    session.set_state(p(0, 1, 0), wire_state.clone(), UpdateFlags::ALL);
    session.set_state(p(1, 1, 0), wire_state, UpdateFlags::ALL);

    // Each wire has exactly one real connection, yet both present a full
    // east-west line and nothing on the north-south axis.
    for position in [p(0, 1, 0), p(1, 1, 0)] {
        let state = world.state(position);
        assert_eq!(wire::side_of(&state, Face4::East), RedstoneSide::Side);
        assert_eq!(wire::side_of(&state, Face4::West), RedstoneSide::Side);
        assert_eq!(wire::side_of(&state, Face4::North), RedstoneSide::None);
        assert_eq!(wire::side_of(&state, Face4::South), RedstoneSide::None);
    }
}

#[test]
fn wire_climbs_a_conductor_when_its_own_top_is_open() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    world.place(p(1, 1, 0), "stone");
    world.place(p(0, 1, 0), "redstone_wire");
    let wire_state = world.registry.expect_block("redstone_wire").default_state().clone();

    let mut session = world.session();
    session.set_state(p(1, 2, 0), wire_state, UpdateFlags::ALL);

    // The lower wire's east connection climbs onto the block's top.
    let lower = world.state(p(0, 1, 0));
    assert_eq!(wire::side_of(&lower, Face4::East), RedstoneSide::Up);
    assert_eq!(wire::side_of(&lower, Face4::West), RedstoneSide::Side);
}

#[test]
fn cascading_removal_halts_at_the_update_budget() {
    let mut world = World::new();
    for x in 0..600 {
        world.place(p(x, 0, 0), "scaffolding");
    }

    let air = world.registry.air_state().clone();
    let mut session = world.session();
    session.set_state(p(0, 0, 0), air, UpdateFlags::ALL);
    assert_eq!(session.remaining_budget(), 0);

    // The root change plus 511 cascading breaks spend the whole budget.
    assert!(world.state(p(511, 0, 0)).is_air());
    assert_eq!(world.state(p(512, 0, 0)).kind(), BlockKind::Brittle);
    assert_eq!(world.state(p(599, 0, 0)).kind(), BlockKind::Brittle);
    assert!(world.sink.drops.len() <= 512);
}

#[test]
fn mutually_adjacent_wires_settle_instead_of_recursing() {
    let mut world = World::new();
    for x in 0..2 {
        world.place(p(x, 0, 0), "stone");
    }
    // Stale power with no source anywhere.
    let wire_def = world.registry.expect_block("redstone_wire").clone();
    let hot = wire_def
        .default_state()
        .with(&wire::POWER, PropertyValue::Int(15));
    world.grid.set_state_raw(p(0, 1, 0), hot.clone());
    world.grid.set_state_raw(p(1, 1, 0), hot);

    // Any adjacent change re-triggers evaluation; both wires must drain to 0
    // within one session rather than querying each other forever.
    let stone = world.registry.expect_block("stone").default_state().clone();
    let mut session = world.session();
    session.set_state(p(0, 2, 0), stone, UpdateFlags::ALL);
    assert!(session.remaining_budget() > 0);

    assert_eq!(wire::power_of(&world.state(p(0, 1, 0))), 0);
    assert_eq!(wire::power_of(&world.state(p(1, 1, 0))), 0);
}

#[test]
fn wire_without_footing_breaks() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    world.place(p(0, 1, 0), "redstone_wire");

    let air = world.registry.air_state().clone();
    let mut session = world.session();
    session.set_state(p(0, 0, 0), air, UpdateFlags::ALL);

    assert!(world.state(p(0, 1, 0)).is_air());
    assert!(
        world
            .sink
            .drops
            .iter()
            .any(|(_, state)| state.kind() == BlockKind::Wire)
    );
}

#[test]
fn powered_lever_opens_both_door_halves() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    let door = world.registry.expect_block("oak_door").clone();
    let lower = door.default_state().clone();
    let upper = lower.with(&behavior::HALF, PropertyValue::Name("upper".into()));
    world.grid.set_state_raw(p(0, 1, 0), lower);
    world.grid.set_state_raw(p(0, 2, 0), upper);
    world.place(p(1, 1, 0), "lever");

    let mut session = world.session();
    behavior::toggle_lever(&mut session, p(1, 1, 0));

    for position in [p(0, 1, 0), p(0, 2, 0)] {
        let state = world.state(position);
        assert_eq!(state.get_bool(&behavior::OPEN), Some(true), "{position:?}");
        assert_eq!(state.get_bool(&behavior::POWERED), Some(true));
    }
    assert!(world.sink.effects.contains(&(p(0, 1, 0), Effect::DoorToggled)));

    let mut session = world.session();
    behavior::toggle_lever(&mut session, p(1, 1, 0));
    assert_eq!(
        world.state(p(0, 1, 0)).get_bool(&behavior::OPEN),
        Some(false)
    );
}

#[test]
fn half_a_door_cannot_stand() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    let door = world.registry.expect_block("oak_door").clone();
    let lower = door.default_state().clone();
    let upper = lower.with(&behavior::HALF, PropertyValue::Name("upper".into()));
    world.grid.set_state_raw(p(0, 1, 0), lower);
    world.grid.set_state_raw(p(0, 2, 0), upper);

    let air = world.registry.air_state().clone();
    let mut session = world.session();
    session.set_state(p(0, 2, 0), air, UpdateFlags::ALL);

    assert!(world.state(p(0, 1, 0)).is_air());
}

#[test]
fn fire_is_extinguished_when_its_support_goes() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    world.place(p(0, 1, 0), "fire");

    let air = world.registry.air_state().clone();
    let mut session = world.session();
    session.set_state(p(0, 0, 0), air, UpdateFlags::ALL);

    assert!(world.state(p(0, 1, 0)).is_air());
    assert!(world.sink.effects.contains(&(p(0, 1, 0), Effect::Extinguished)));
    // Fire never drops anything.
    assert!(
        world
            .sink
            .drops
            .iter()
            .all(|(_, state)| state.kind() != BlockKind::Fire)
    );
}

#[test]
fn fire_shape_climbs_adjacent_walls() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    world.place(p(0, 1, 0), "fire");

    let isolated = world.state(p(0, 1, 0)).shapes_in(&world.grid, p(0, 1, 0));
    world.place(p(1, 1, 0), "stone");
    let against_wall = world.state(p(0, 1, 0)).shapes_in(&world.grid, p(0, 1, 0));

    assert_eq!(isolated.visual.parts().len(), 1);
    assert_eq!(against_wall.visual.parts().len(), 2);
}

#[test]
fn hanging_dripstone_fills_a_composter_below() {
    let mut world = World::new();
    world.place(p(0, 5, 0), "stone");
    world.place(p(0, 4, 0), "pointed_dripstone");
    world.place(p(0, 3, 0), "pointed_dripstone");
    world.place(p(0, 0, 0), "composter");

    let mut session = world.session();
    behavior::random_tick_at(&mut session, p(0, 4, 0));

    let composter = world.state(p(0, 0, 0));
    assert_eq!(composter.get_int(&behavior::LEVEL), Some(1));
    assert!(world.sink.effects.contains(&(p(0, 0, 0), Effect::Drip)));
    assert!(
        world
            .sink
            .effects
            .contains(&(p(0, 0, 0), Effect::ComposterFilled))
    );
}

#[test]
fn dripstone_gives_up_past_its_scan_ceiling() {
    let mut world = World::new();
    world.place(p(0, 20, 0), "stone");
    world.place(p(0, 19, 0), "pointed_dripstone");
    // Receptacle twelve air cells below the tip: one beyond the drip scan.
    world.place(p(0, 6, 0), "composter");

    let mut session = world.session();
    behavior::random_tick_at(&mut session, p(0, 19, 0));

    assert_eq!(world.state(p(0, 6, 0)).get_int(&behavior::LEVEL), Some(0));
}

#[test]
fn bed_finds_a_stand_up_position_with_footing() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    world.place(p(0, 0, -1), "stone");
    world.place(p(0, 0, 1), "stone");
    let bed = world.registry.expect_block("bed").clone();
    let foot = bed.default_state().clone();
    let head = foot.with(&behavior::PART, PropertyValue::Name("head".into()));
    // Foot faces north, head in the cell beyond.
    world.grid.set_state_raw(p(0, 1, 0), foot);
    world.grid.set_state_raw(p(0, 1, -1), head);
    // Block the east so the south candidate wins.
    world.place(p(1, 1, 0), "stone");

    let found = behavior::bed_stand_up_position(&world.grid, p(0, 1, 0));
    assert_eq!(found, Some(p(0, 1, 1)));
}

#[test]
fn bed_without_its_partner_breaks() {
    let mut world = World::new();
    world.place(p(0, 0, 0), "stone");
    world.place(p(0, 0, -1), "stone");
    let bed = world.registry.expect_block("bed").clone();
    let foot = bed.default_state().clone();
    let head = foot.with(&behavior::PART, PropertyValue::Name("head".into()));
    world.grid.set_state_raw(p(0, 1, 0), foot);
    world.grid.set_state_raw(p(0, 1, -1), head);

    let air = world.registry.air_state().clone();
    let mut session = world.session();
    session.set_state(p(0, 1, -1), air, UpdateFlags::ALL);

    assert!(world.state(p(0, 1, 0)).is_air());
}
