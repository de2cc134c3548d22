//! Property-based tests for fee arithmetic.
//!
//! For every valid amount, a device-success response yields a ledger
//! amount of exactly `amount * 0.99` at the default 1% fee rate.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::engine::split_fee;

/// Strategy for amounts between 0.01 and 1,000,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #[test]
    fn net_is_ninety_nine_percent(amount in amount()) {
        let (net, _fee) = split_fee(amount, dec!(0.01));
        prop_assert_eq!(net, amount * dec!(0.99));
    }

    #[test]
    fn fee_and_net_sum_to_gross(amount in amount()) {
        let (net, fee) = split_fee(amount, dec!(0.01));
        prop_assert_eq!(net + fee, amount);
    }

    #[test]
    fn fee_is_never_negative(amount in amount(), rate_bps in 0u32..=10_000) {
        let rate = Decimal::new(i64::from(rate_bps), 4);
        let (net, fee) = split_fee(amount, rate);
        prop_assert!(fee >= Decimal::ZERO);
        prop_assert!(net <= amount);
    }
}
