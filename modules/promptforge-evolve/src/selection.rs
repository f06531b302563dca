//! Tournament selection and top-K elitism.

use rand::Rng;

use promptforge_common::{composite_or_zero, Individual};

use crate::traits::IdSource;

/// Pick the fittest of `size` uniform random draws (with replacement).
/// Unevaluated individuals compare as fitness 0.
pub fn tournament<'a, R: Rng>(
    population: &'a [Individual],
    size: usize,
    rng: &mut R,
) -> &'a Individual {
    debug_assert!(!population.is_empty());
    let mut best = &population[rng.random_range(0..population.len())];
    for _ in 1..size {
        let candidate = &population[rng.random_range(0..population.len())];
        if composite_or_zero(candidate) > composite_or_zero(best) {
            best = candidate;
        }
    }
    best
}

/// Copy the top `count` individuals by composite fitness into the next
/// generation. Each elite is a new individual (fresh id, generation+1,
/// parent link to the original, fitness cleared) — elites are always
/// re-scored in the new generation's context rather than reusing the
/// prior score.
pub fn elites(population: &[Individual], count: usize, ids: &dyn IdSource) -> Vec<Individual> {
    let mut ranked: Vec<&Individual> = population.iter().collect();
    ranked.sort_by(|a, b| composite_or_zero(b).total_cmp(&composite_or_zero(a)));
    ranked
        .into_iter()
        .take(count)
        .map(|elite| elite.advanced_copy(ids.next_id()))
        .collect()
}
