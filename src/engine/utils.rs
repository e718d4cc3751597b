use std::collections::BTreeSet;

use crate::rng::Rng;
use crate::types::Vec2;

/// Picks `count` distinct lattice cells within `radius` of the origin,
/// skipping the origin itself since every round starts there.
pub fn scatter_treasures(rng: &mut Rng, count: usize, radius: i32) -> Vec<Vec2> {
    let radius = radius.max(1);
    let side = (2 * radius + 1) as usize;
    let capacity = side * side - 1;
    let target = count.min(capacity);

    let mut picked = BTreeSet::new();
    while picked.len() < target {
        let cell = Vec2::new(rng.int(-radius, radius), rng.int(-radius, radius));
        if cell == Vec2::ORIGIN {
            continue;
        }
        picked.insert(cell);
    }
    picked.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_is_deterministic_per_seed() {
        let a = scatter_treasures(&mut Rng::new(7), 12, 6);
        let b = scatter_treasures(&mut Rng::new(7), 12, 6);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn scatter_stays_in_range_and_off_origin() {
        for seed in 1..=200u32 {
            for cell in scatter_treasures(&mut Rng::new(seed), 5, 3) {
                assert!(cell.x.abs() <= 3 && cell.y.abs() <= 3);
                assert_ne!(cell, Vec2::ORIGIN);
            }
        }
    }

    #[test]
    fn scatter_caps_count_at_available_cells() {
        let cells = scatter_treasures(&mut Rng::new(3), 100, 1);
        assert_eq!(cells.len(), 8);
    }
}
