//! Tests for the priority-ordered collateral waterfall.
//!
//! Critical invariants tested:
//! - Holdings are visited strictly by priority, ties in insertion order
//! - A holding that can cover the rest alone gives up only the minimal
//!   whole-unit count (value rounded up, never down)
//! - Holdings without a priority are ineligible and never move
//! - Quantities are conserved between the two books, per code
//! - Whatever cannot be covered is reported back, not silently dropped

use collateral_simulator_core_rs::{
    allocate_initial, units_needed, waterfall_transfer, Holding, Portfolio, PriorityOrder,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Eligible holding with an explicit priority.
fn holding(quantity: u64, unit_price: Decimal, priority: u32) -> Holding {
    Holding::new(quantity, unit_price, false).with_priority(priority)
}

/// Source book with A (100 units at 10, priority 2) and B (100 units at 5,
/// priority 1). Descending order visits A first.
fn two_tier_source() -> Portfolio {
    let mut source = Portfolio::new();
    source.insert("A", holding(100, dec!(10), 2));
    source.insert("B", holding(100, dec!(5), 1));
    source
}

#[test]
fn test_units_needed_rounds_up() {
    assert_eq!(units_needed(dec!(900), dec!(10)), 90);
    assert_eq!(units_needed(dec!(95), dec!(10)), 10);
    assert_eq!(units_needed(dec!(0.1), dec!(10)), 1);
    assert_eq!(units_needed(dec!(0), dec!(10)), 0);
}

#[test]
fn test_initial_allocation_takes_minimal_units_from_top_priority() {
    let mut source = two_tier_source();

    let (collateral, uncovered) = allocate_initial(&mut source, dec!(900));

    assert_eq!(uncovered, Decimal::ZERO);

    // 900 / 10.0 = 90 units of A; B is untouched.
    assert_eq!(collateral.get("A").unwrap().quantity, 90);
    assert!(collateral.get("B").is_none());
    assert_eq!(source.get("A").unwrap().quantity, 10);
    assert_eq!(source.get("B").unwrap().quantity, 100);
    assert_eq!(collateral.total_value(), dec!(900));
}

#[test]
fn test_waterfall_cascades_into_lower_priorities() {
    let mut source = two_tier_source();

    let (collateral, uncovered) = allocate_initial(&mut source, dec!(1050));

    assert_eq!(uncovered, Decimal::ZERO);

    // A covers 1000 and drains completely; B tops up the last 50 with
    // ceil(50 / 5.0) = 10 units.
    assert_eq!(collateral.get("A").unwrap().quantity, 100);
    assert_eq!(collateral.get("B").unwrap().quantity, 10);
    assert_eq!(source.get("A").unwrap().quantity, 0);
    assert_eq!(source.get("B").unwrap().quantity, 90);
    assert_eq!(collateral.total_value(), dec!(1050));
}

#[test]
fn test_partial_unit_requirements_overshoot_never_undershoot() {
    let mut source = Portfolio::new();
    source.insert("A", holding(100, dec!(10), 1));

    let (collateral, uncovered) = allocate_initial(&mut source, dec!(95));

    assert_eq!(uncovered, Decimal::ZERO);
    assert_eq!(collateral.get("A").unwrap().quantity, 10);
    assert!(collateral.total_value() >= dec!(95));
}

#[test]
fn test_exhausted_source_reports_the_uncovered_remainder() {
    let mut source = two_tier_source();

    let (collateral, uncovered) = allocate_initial(&mut source, dec!(2000));

    // 1000 from A plus 500 from B still leaves 500 uncovered.
    assert_eq!(uncovered, dec!(500));
    assert_eq!(collateral.get("A").unwrap().quantity, 100);
    assert_eq!(collateral.get("B").unwrap().quantity, 100);

    // Drained positions stay on the source book at zero.
    assert_eq!(source.get("A").unwrap().quantity, 0);
    assert_eq!(source.get("B").unwrap().quantity, 0);
}

#[test]
fn test_holdings_without_priority_never_move() {
    let mut source = Portfolio::new();
    source.insert("A", holding(10, dec!(10), 1));
    source.insert("CASH", Holding::new(1_000, dec!(1), false)); // no priority

    let (collateral, uncovered) = allocate_initial(&mut source, dec!(500));

    // A's 100 is all the waterfall may use; the unprioritized cash position
    // is not collateral-eligible even though it could cover the rest.
    assert_eq!(uncovered, dec!(400));
    assert_eq!(collateral.get("A").unwrap().quantity, 10);
    assert!(collateral.get("CASH").is_none());
    assert_eq!(source.get("CASH").unwrap().quantity, 1_000);
}

#[test]
fn test_ascending_order_visits_lowest_priority_first() {
    let mut giver = two_tier_source();
    let mut receiver = Portfolio::new();

    let remainder = waterfall_transfer(
        &mut giver,
        &mut receiver,
        dec!(400),
        PriorityOrder::Ascending,
    );

    assert_eq!(remainder, Decimal::ZERO);

    // B (priority 1) is drained before A is considered.
    assert_eq!(receiver.get("B").unwrap().quantity, 80);
    assert!(receiver.get("A").is_none());
    assert_eq!(giver.get("B").unwrap().quantity, 20);
}

#[test]
fn test_equal_priorities_keep_insertion_order() {
    let mut giver = Portfolio::new();
    giver.insert("FIRST", holding(100, dec!(10), 1));
    giver.insert("SECOND", holding(100, dec!(10), 1));
    let mut receiver = Portfolio::new();

    waterfall_transfer(
        &mut giver,
        &mut receiver,
        dec!(100),
        PriorityOrder::Descending,
    );

    assert_eq!(receiver.get("FIRST").unwrap().quantity, 10);
    assert!(receiver.get("SECOND").is_none());
}

#[test]
fn test_transfer_into_existing_position_adds_quantities() {
    let mut giver = Portfolio::new();
    giver.insert("A", holding(100, dec!(10), 1));
    let mut receiver = Portfolio::new();
    receiver.insert("A", holding(5, dec!(10), 1));

    waterfall_transfer(
        &mut giver,
        &mut receiver,
        dec!(200),
        PriorityOrder::Descending,
    );

    assert_eq!(receiver.get("A").unwrap().quantity, 25);
    assert_eq!(giver.get("A").unwrap().quantity, 80);
}

#[test]
fn test_quantities_are_conserved_per_code() {
    let mut giver = two_tier_source();
    let mut receiver = Portfolio::new();

    waterfall_transfer(
        &mut giver,
        &mut receiver,
        dec!(1337),
        PriorityOrder::Descending,
    );

    for code in ["A", "B"] {
        let left = giver.get(code).map(|h| h.quantity).unwrap_or(0);
        let right = receiver.get(code).map(|h| h.quantity).unwrap_or(0);
        assert_eq!(left + right, 100, "total quantity of {code} changed");
    }
}

#[test]
fn test_exact_full_cover_drains_the_holding_and_stops() {
    let mut giver = two_tier_source();
    let mut receiver = Portfolio::new();

    // A's value is exactly the target: every unit of A moves, none of B.
    let remainder = waterfall_transfer(
        &mut giver,
        &mut receiver,
        dec!(1000),
        PriorityOrder::Descending,
    );

    assert_eq!(remainder, Decimal::ZERO);
    assert_eq!(receiver.get("A").unwrap().quantity, 100);
    assert!(receiver.get("B").is_none());
}

#[test]
fn test_covering_holding_is_never_passed_over() {
    // The walk passes over a holding when the whole-unit take would
    // overdraw it, leaving the shortfall to lower priorities. With exact
    // decimal marks that take never exceeds a holding whose value covers
    // the remainder (ceil(r / p) <= q whenever r <= p * q), so the
    // boundary cases land in the covering branch instead of the pass-over.
    for remaining in [dec!(934.9), dec!(935.0), dec!(934.99)] {
        let mut giver = Portfolio::new();
        giver.insert("EDGE", holding(100, dec!(9.35), 2));
        giver.insert("BACKSTOP", holding(1000, dec!(1), 1));
        let mut receiver = Portfolio::new();

        let remainder =
            waterfall_transfer(&mut giver, &mut receiver, remaining, PriorityOrder::Descending);

        assert_eq!(remainder, Decimal::ZERO);
        assert!(
            receiver.get("EDGE").unwrap().quantity <= 100,
            "take overdrew the covering holding at target {remaining}",
        );
        assert!(receiver.get("BACKSTOP").is_none());
    }
}

#[test]
fn test_zero_target_moves_nothing() {
    let mut giver = two_tier_source();
    let mut receiver = Portfolio::new();

    let remainder = waterfall_transfer(
        &mut giver,
        &mut receiver,
        Decimal::ZERO,
        PriorityOrder::Descending,
    );

    assert_eq!(remainder, Decimal::ZERO);
    assert!(receiver.is_empty());
    assert_eq!(giver.get("A").unwrap().quantity, 100);
}
