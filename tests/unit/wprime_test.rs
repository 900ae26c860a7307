//! W' balance model properties.

use climbwise::metrics::{AnaerobicBalanceModel, WPrimeStatus};
use climbwise::sensors::Sample;
use climbwise::storage::AthleteProfile;

fn model() -> AnaerobicBalanceModel {
    let mut model = AnaerobicBalanceModel::new();
    model.set_profile(&AthleteProfile {
        ftp: 250,
        weight_kg: 70.0,
        cp: 238,
        ..Default::default()
    });
    model
}

fn tick(model: &mut AnaerobicBalanceModel, second: i64, power: u16) {
    model.update(&Sample {
        power_watts: power,
        timestamp_ms: 1_000_000 + second * 1000,
        has_data: true,
        ..Default::default()
    });
}

#[test]
fn test_balance_stays_in_bounds() {
    let mut model = model();
    // Deterministic mix of sprints, threshold and recovery
    let mut power: u32 = 17;
    for second in 0..2000 {
        power = (power * 73 + 41) % 900;
        tick(&mut model, second, power.max(1) as u16);
        let balance = model.balance();
        assert!((0.0..=20_000.0).contains(&balance), "balance {} out of bounds", balance);
    }
}

#[test]
fn test_holding_cp_at_full_balance_is_neutral() {
    let mut model = model();
    for second in 0..300 {
        tick(&mut model, second, 238);
    }
    assert_eq!(model.balance(), 20_000.0);
    assert_eq!(model.state().status, WPrimeStatus::Fresh);
}

#[test]
fn test_above_cp_depletes_each_tick() {
    let mut model = model();
    tick(&mut model, 0, 400);
    let mut previous = model.balance();
    for second in 1..60 {
        tick(&mut model, second, 400);
        assert!(model.balance() < previous);
        previous = model.balance();
    }
}

#[test]
fn test_sprint_to_empty_then_recover() {
    let mut model = model();
    for second in 0..200 {
        tick(&mut model, second, 800);
    }
    assert_eq!(model.balance(), 0.0);
    assert_eq!(model.state().status, WPrimeStatus::Empty);

    for second in 200..260 {
        tick(&mut model, second, 100);
    }
    assert!(model.balance() > 0.0);
    assert!(model.state().time_to_full.is_some());
    assert!(model.state().time_to_empty.is_none());
}
