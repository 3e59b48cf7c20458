use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_nanos(7), SimTime(7));
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime::MAX);
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime::MAX);
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime::MAX);
}

#[test]
fn sim_time_arithmetic_saturates() {
    assert_eq!(SimTime::MAX.saturating_add(SimTime(1)), SimTime::MAX);
    assert_eq!(SimTime(3).saturating_sub(SimTime(5)), SimTime::ZERO);
    assert_eq!(SimTime(3).checked_add(SimTime(4)), Some(SimTime(7)));
    assert_eq!(SimTime::MAX.checked_add(SimTime(1)), None);
    assert_eq!(SimTime::checked_from_micros(7), Some(SimTime(7_000)));
    assert_eq!(SimTime::checked_from_micros(u64::MAX / 1_000), Some(SimTime(u64::MAX / 1_000 * 1_000)));
    assert_eq!(SimTime::checked_from_micros(u64::MAX / 1_000 + 1), None);
}

#[test]
fn sim_time_display_marks_infinity() {
    assert_eq!(SimTime(42).to_string(), "42ns");
    assert_eq!(SimTime::MAX.to_string(), "+inf");
    assert!(SimTime::MAX.is_max());
    assert!(SimTime::ZERO.is_zero());
}
