//! Prominence scoring from population and feature type.

/// Population term saturates here (reached at 5,000,000 inhabitants)
const MAX_POPULATION_SCORE: f64 = 50.0;
const POPULATION_DIVISOR: f64 = 100_000.0;

const POPULATED_PLACE_SCORE: f64 = 30.0;
const ADMIN_DIVISION_SCORE: f64 = 20.0;

/// Score in `[0, 80]`: population term plus feature-class term.
pub fn score_attributes(population: Option<u64>, feature_class: &str, feature_code: &str) -> f64 {
    population_score(population) + feature_score(feature_class, feature_code)
}

/// `min(50, population / 100000)`, linear in raw population.
pub fn population_score(population: Option<u64>) -> f64 {
    match population {
        Some(p) => (p as f64 / POPULATION_DIVISOR).min(MAX_POPULATION_SCORE),
        None => 0.0,
    }
}

pub fn feature_score(feature_class: &str, feature_code: &str) -> f64 {
    let class_score = match feature_class {
        "P" => POPULATED_PLACE_SCORE,
        "A" => ADMIN_DIVISION_SCORE,
        _ => 0.0,
    };

    // Feature codes (PPLC, ADM1, ...) are accepted but do not adjust the
    // score yet. Weighting capitals or admin levels belongs here.
    let _ = feature_code;

    class_score
}
