//! Great-circle distance between geographic coordinates.

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Computes the Haversine distance in kilometers between two
/// `(latitude, longitude)` pairs given in degrees.
///
/// Inputs are assumed range-valid (callers check latitude −90..90 and
/// longitude −180..180 at the request boundary); the result is always
/// finite and non-negative. Identical points yield 0, antipodal points
/// roughly 20015 km.
pub fn distance_km(origin: (f64, f64), destination: (f64, f64)) -> f64 {
    let (lat1, lon1) = origin;
    let (lat2, lon2) = destination;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::distance_km;

    const HAMBURG: (f64, f64) = (53.551086, 9.993682);
    const FRANKFURT: (f64, f64) = (50.110924, 8.682127);

    #[test]
    fn identical_points_are_zero() {
        assert_eq!(distance_km(HAMBURG, HAMBURG), 0.0);
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let d = distance_km((0.0, 0.0), (0.0, 180.0));
        assert!((d - 20015.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn hamburg_to_frankfurt_is_short_range() {
        let d = distance_km(HAMBURG, FRANKFURT);
        assert!((380.0..400.0).contains(&d), "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_km(HAMBURG, FRANKFURT);
        let back = distance_km(FRANKFURT, HAMBURG);
        assert!((there - back).abs() < 1e-9);
    }
}
