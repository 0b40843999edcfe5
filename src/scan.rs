//! Bounded directional search over grid cells.

use crate::math::{Face6, GridPoint};
use crate::state::BlockState;
use crate::world::Grid;

/// Scans from `start` (exclusive) along `direction` for up to `max_steps`
/// cells.
///
/// At each cell, `is_target` is tested first; a hit returns that position.
/// Otherwise `may_pass` decides whether the scan continues; a refusal or
/// running out of steps returns [`None`]. Exhaustion is not an error, it is
/// the termination guarantee.
///
/// Shared by tip location for hanging formations, receptacle location below a
/// drip, and stand-up placement near beds.
pub fn scan_toward(
    grid: &dyn Grid,
    start: GridPoint,
    direction: Face6,
    max_steps: u32,
    mut is_target: impl FnMut(&BlockState, GridPoint) -> bool,
    mut may_pass: impl FnMut(&BlockState, GridPoint) -> bool,
) -> Option<GridPoint> {
    let step = direction.normal_vector();
    let mut cursor = start;
    for _ in 0..max_steps {
        cursor += step;
        let state = grid.state_at(cursor);
        if is_target(&state, cursor) {
            return Some(cursor);
        }
        if !may_pass(&state, cursor) {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::math::GridPoint;
    use crate::world::SparseGrid;

    #[test]
    fn scan_stops_at_the_step_ceiling() {
        let registry = content::standard_registry();
        let stone = registry.expect_block("stone").default_state().clone();
        let mut grid = SparseGrid::new(registry.air_state().clone());
        // Target six cells down, ceiling five: never found, never overstepped.
        grid.set_state_raw(GridPoint::new(0, -6, 0), stone.clone());

        let mut visited = 0;
        let found = scan_toward(
            &grid,
            GridPoint::new(0, 0, 0),
            Face6::NY,
            5,
            |state, _| {
                visited += 1;
                state.same(&stone)
            },
            |state, _| state.is_air(),
        );
        assert_eq!(found, None);
        assert_eq!(visited, 5);
    }

    #[test]
    fn scan_finds_target_within_ceiling() {
        let registry = content::standard_registry();
        let stone = registry.expect_block("stone").default_state().clone();
        let mut grid = SparseGrid::new(registry.air_state().clone());
        grid.set_state_raw(GridPoint::new(0, -3, 0), stone.clone());

        let found = scan_toward(
            &grid,
            GridPoint::new(0, 0, 0),
            Face6::NY,
            5,
            |state, _| state.same(&stone),
            |state, _| state.is_air(),
        );
        assert_eq!(found, Some(GridPoint::new(0, -3, 0)));
    }

    #[test]
    fn scan_halts_early_on_impassable_cell() {
        let registry = content::standard_registry();
        let stone = registry.expect_block("stone").default_state().clone();
        let lever = registry.expect_block("lever").default_state().clone();
        let mut grid = SparseGrid::new(registry.air_state().clone());
        grid.set_state_raw(GridPoint::new(0, -1, 0), lever);
        grid.set_state_raw(GridPoint::new(0, -2, 0), stone.clone());

        let found = scan_toward(
            &grid,
            GridPoint::new(0, 0, 0),
            Face6::NY,
            5,
            |state, _| state.same(&stone),
            |state, _| state.is_air(),
        );
        assert_eq!(found, None);
    }

    #[test]
    fn start_cell_is_excluded() {
        let registry = content::standard_registry();
        let stone = registry.expect_block("stone").default_state().clone();
        let mut grid = SparseGrid::new(registry.air_state().clone());
        grid.set_state_raw(GridPoint::new(0, 0, 0), stone.clone());
        grid.set_state_raw(GridPoint::new(0, -1, 0), stone.clone());

        let found = scan_toward(
            &grid,
            GridPoint::new(0, 0, 0),
            Face6::NY,
            5,
            |state, _| state.same(&stone),
            |state, _| state.is_air(),
        );
        assert_eq!(found, Some(GridPoint::new(0, -1, 0)));
    }
}
