//! Cycling physics model.
//!
//! Force balance over gravity, rolling resistance and aerodynamic drag,
//! with air density adjusted for altitude. All functions are pure.

/// Physics constants
pub const GRAVITY: f64 = 9.81; // m/s²
pub const SEA_LEVEL_AIR_DENSITY: f64 = 1.225; // kg/m³
const AIR_DENSITY_DECAY: f64 = 0.0001185; // per meter

/// Solver limits for [`speed_from_power`]
const MAX_ITERATIONS: usize = 20;
const POWER_TOLERANCE_WATTS: f64 = 0.1;
const MIN_SPEED: f64 = 0.1;
const MAX_SPEED: f64 = 30.0;
const INITIAL_SPEED: f64 = 3.0;

/// Air density at the given altitude.
pub fn air_density(altitude_m: f64) -> f64 {
    SEA_LEVEL_AIR_DENSITY * (-AIR_DENSITY_DECAY * altitude_m).exp()
}

/// Gravity component along the road.
///
/// Positive uphill, negative downhill.
pub fn gravity_force(mass_kg: f64, grade_percent: f64) -> f64 {
    let angle = (grade_percent / 100.0).atan();
    mass_kg * GRAVITY * angle.sin()
}

/// Rolling resistance force.
pub fn rolling_resistance(mass_kg: f64, grade_percent: f64, crr: f64) -> f64 {
    let angle = (grade_percent / 100.0).atan();
    mass_kg * GRAVITY * crr * angle.cos()
}

/// Aerodynamic drag force (still air).
pub fn aero_drag(cda: f64, altitude_m: f64, speed_mps: f64) -> f64 {
    0.5 * air_density(altitude_m) * cda * speed_mps * speed_mps
}

/// Total resistive force at the given conditions.
pub fn total_force(
    mass_kg: f64,
    grade_percent: f64,
    crr: f64,
    cda: f64,
    altitude_m: f64,
    speed_mps: f64,
) -> f64 {
    gravity_force(mass_kg, grade_percent)
        + rolling_resistance(mass_kg, grade_percent, crr)
        + aero_drag(cda, altitude_m, speed_mps)
}

/// Power required to hold a speed: P = F_total * v.
pub fn power_required(
    mass_kg: f64,
    grade_percent: f64,
    crr: f64,
    cda: f64,
    altitude_m: f64,
    speed_mps: f64,
) -> f64 {
    total_force(mass_kg, grade_percent, crr, cda, altitude_m, speed_mps) * speed_mps
}

/// Solve [`power_required`] for speed with Newton-Raphson iteration.
///
/// # Arguments
/// * `power_watts` - Rider power output
/// * `mass_kg` - Rider plus bike mass
///
/// # Returns
/// Speed in m/s, clamped to [0.1, 30]. Zero for non-positive power.
pub fn speed_from_power(
    power_watts: f64,
    mass_kg: f64,
    grade_percent: f64,
    crr: f64,
    cda: f64,
    altitude_m: f64,
) -> f64 {
    if power_watts <= 0.0 {
        return 0.0;
    }

    let rho = air_density(altitude_m);
    let mut v = INITIAL_SPEED;

    for _ in 0..MAX_ITERATIONS {
        let force = total_force(mass_kg, grade_percent, crr, cda, altitude_m, v);
        let error = force * v - power_watts;

        if error.abs() < POWER_TOLERANCE_WATTS {
            break;
        }

        // dP/dv = F + v * dF/dv, where dF_air/dv = rho * CdA * v
        let derivative = force + v * rho * cda * v;
        if derivative <= 0.0 {
            // Steep descents can make the force balance negative; nudge upward
            v = (v * 1.5).clamp(MIN_SPEED, MAX_SPEED);
            continue;
        }

        v = (v - error / derivative).clamp(MIN_SPEED, MAX_SPEED);
    }

    v
}
