//! Distance-decayed proximity scoring.

use geo::{Distance, Haversine, Point};

use crate::models::Coordinates;

const MAX_PROXIMITY_SCORE: f64 = 20.0;
/// Score lost per kilometer (reaches zero at 200 km)
const DECAY_PER_KM: f64 = 0.1;

/// Great-circle distance in kilometers on a spherical Earth (mean radius).
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let origin = Point::new(a.lon, a.lat);
    let destination = Point::new(b.lon, b.lat);
    Haversine.distance(origin, destination) / 1000.0
}

/// Score in `[0, 20]`. No reference point is a defined zero term.
pub fn score_proximity(reference: Option<Coordinates>, candidate: Coordinates) -> f64 {
    let Some(reference) = reference else {
        return 0.0;
    };

    let km = distance_km(reference, candidate);
    (MAX_PROXIMITY_SCORE - km * DECAY_PER_KM).max(0.0)
}
