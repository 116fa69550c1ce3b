use hanabi_bot::policy::Genome;
use rand::Rng;
use rand::seq::index;
use rand_distr::{Distribution, Geometric};

use super::Individual;

/// Rates are clamped below this so the swap count distribution stays proper.
const MAX_MUTATION_RATE: f64 = 0.99;

/// Copies `parent` and exchanges two distinct positions `1 + Geometric(1 - rate)` times.
pub fn swap_mutation<R: Rng + ?Sized>(parent: &Genome, rate: f64, rng: &mut R) -> Genome {
    let mut child = parent.clone();
    let len = child.len();
    if len < 2 {
        return child;
    }
    let swaps = 1 + extra_swaps(rate, rng);
    for _ in 0..swaps {
        let picked = index::sample(rng, len, 2);
        child.swap(picked.index(0), picked.index(1));
    }
    child
}

fn extra_swaps<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> u64 {
    let rate = if rate.is_finite() {
        rate.clamp(0.0, MAX_MUTATION_RATE)
    } else {
        0.0
    };
    Geometric::new(1.0 - rate).map_or(0, |distribution| distribution.sample(rng))
}

/// `ceil(len * percentage / 100)`, never more than `len`.
pub fn survivor_count(len: usize, percentage: f64) -> usize {
    let wanted = (len as f64 * percentage / 100.0).ceil();
    if wanted <= 0.0 {
        0
    } else {
        (wanted as usize).min(len)
    }
}

/// Best `percentage` percent by fitness; ties keep their input order.
pub fn top_percent(mut individuals: Vec<Individual>, percentage: f64) -> Vec<Individual> {
    let keep = survivor_count(individuals.len(), percentage);
    individuals.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    individuals.truncate(keep);
    individuals
}

pub fn random_population<R: Rng + ?Sized>(size: usize, genome_len: usize, rng: &mut R) -> Vec<Genome> {
    (0..size).map(|_| Genome::shuffled(genome_len, rng)).collect()
}
