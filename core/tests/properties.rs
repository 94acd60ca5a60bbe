//! Property tests over the parsing and gating primitives.

#![allow(clippy::unwrap_used)]

use cakepicnic_core::domain::CheckInState;
use cakepicnic_core::types::{Category, Seat, TxHash, WalletAddress};
use proptest::prelude::*;

fn check_in_state() -> impl Strategy<Value = CheckInState> {
    prop_oneof![
        Just(CheckInState::None),
        Just(CheckInState::In),
        Just(CheckInState::Out),
    ]
}

proptest! {
    #[test]
    fn wallet_parse_normalizes_any_hex_casing(hex in "[0-9a-fA-F]{40}") {
        let parsed = WalletAddress::parse(&format!("0x{hex}")).unwrap();
        prop_assert_eq!(parsed.as_str(), format!("0x{}", hex.to_ascii_lowercase()));
    }

    #[test]
    fn wallet_parse_rejects_wrong_lengths(hex in "[0-9a-f]{1,39}|[0-9a-f]{41,80}") {
        let candidate = format!("0x{hex}");
        prop_assert!(WalletAddress::parse(&candidate).is_err());
    }

    #[test]
    fn tx_hash_parse_is_idempotent(hex in "[0-9a-fA-F]{64}") {
        let once = TxHash::parse(&format!("0x{hex}")).unwrap();
        let twice = TxHash::parse(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn tx_hash_rejects_non_hex(s in "0x[g-z!-/]{64}") {
        prop_assert!(TxHash::parse(&s).is_err());
    }

    #[test]
    fn seat_requires_positive_coordinates(table in i16::MIN..=0, seat in 1_i16..=200) {
        prop_assert!(Seat::new(table, seat).is_err());
        prop_assert!(Seat::new(seat, table).is_err());
        prop_assert!(Seat::new(seat, seat).is_ok());
    }

    #[test]
    fn out_never_advances(to in check_in_state()) {
        prop_assert!(!CheckInState::Out.can_advance_to(to));
    }

    #[test]
    fn only_adjacent_forward_transitions_exist(
        from in check_in_state(),
        to in check_in_state(),
    ) {
        let allowed = matches!(
            (from, to),
            (CheckInState::None, CheckInState::In) | (CheckInState::In, CheckInState::Out)
        );
        prop_assert_eq!(from.can_advance_to(to), allowed);
    }
}

#[test]
fn category_roundtrips_through_its_string_form() {
    for category in Category::ALL {
        assert_eq!(Category::parse(category.as_str()).unwrap(), category);
    }
}
