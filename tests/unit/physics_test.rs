//! Physics model properties.

use climbwise::metrics::physics::{air_density, power_required, speed_from_power};

const MASS_KG: f64 = 78.0;
const CRR: f64 = 0.005;
const CDA: f64 = 0.321;

#[test]
fn test_speed_power_round_trip() {
    for altitude in [0.0, 1500.0] {
        for grade in [0.0, 3.0, 8.0, 12.0] {
            for speed in 1..=15 {
                let speed = speed as f64;
                let power = power_required(MASS_KG, grade, CRR, CDA, altitude, speed);
                let solved = speed_from_power(power, MASS_KG, grade, CRR, CDA, altitude);
                assert!(
                    (solved - speed).abs() < 0.1,
                    "grade {} alt {}: {} m/s came back as {}",
                    grade,
                    altitude,
                    speed,
                    solved
                );
            }
        }
    }
}

#[test]
fn test_no_power_no_speed() {
    assert_eq!(speed_from_power(0.0, MASS_KG, 5.0, CRR, CDA, 0.0), 0.0);
    assert_eq!(speed_from_power(-50.0, MASS_KG, 5.0, CRR, CDA, 0.0), 0.0);
}

#[test]
fn test_air_thins_with_altitude() {
    assert!((air_density(0.0) - 1.225).abs() < 1e-9);
    assert!(air_density(2000.0) < air_density(1000.0));
}

#[test]
fn test_steeper_needs_more_power() {
    let flat = power_required(MASS_KG, 0.0, CRR, CDA, 0.0, 5.0);
    let steep = power_required(MASS_KG, 10.0, CRR, CDA, 0.0, 5.0);
    assert!(steep > flat * 3.0);
}
