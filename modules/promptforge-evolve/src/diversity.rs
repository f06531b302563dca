//! Population heterogeneity via pairwise trigram-set Jaccard distance.
//!
//! Each text becomes its set of overlapping 3-character substrings;
//! diversity is the mean Jaccard distance over all unordered pairs.
//! 0 means an identical population, 1 means no shared trigrams anywhere.

use std::collections::HashSet;

use promptforge_common::{composite_or_zero, Individual};

/// Diversity below this triggers immigration.
pub const IMMIGRATION_THRESHOLD: f64 = 0.15;

fn trigram_set(text: &str) -> HashSet<(char, char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(3)
        .map(|w| (w[0], w[1], w[2]))
        .collect()
}

/// Jaccard distance between two trigram sets. Two texts too short to form
/// any trigram count as identical.
fn jaccard_distance(a: &HashSet<(char, char, char)>, b: &HashSet<(char, char, char)>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    1.0 - intersection as f64 / union as f64
}

/// Mean pairwise Jaccard distance across the population, in [0, 1].
/// Defined as 0 for populations smaller than 2.
pub fn population_diversity(population: &[Individual]) -> f64 {
    if population.len() < 2 {
        return 0.0;
    }
    let sets: Vec<_> = population.iter().map(|i| trigram_set(&i.text)).collect();
    let mut total = 0.0;
    let mut pairs = 0u64;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            total += jaccard_distance(&sets[i], &sets[j]);
            pairs += 1;
        }
    }
    total / pairs as f64
}

/// The replacement target for an immigrant: the worst-fitness slot outside
/// the protected elite prefix. None when every slot is an elite.
pub fn worst_non_elite_index(population: &[Individual], elitism_count: usize) -> Option<usize> {
    population
        .iter()
        .enumerate()
        .skip(elitism_count)
        .min_by(|(_, a), (_, b)| composite_or_zero(a).total_cmp(&composite_or_zero(b)))
        .map(|(idx, _)| idx)
}
