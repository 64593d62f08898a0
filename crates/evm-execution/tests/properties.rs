//! # Property Tests
//!
//! Gas accounting, block hash resolution and registry serialization checked
//! over generated inputs.

use evm_execution::evm::gas::{compute_refund, intrinsic_gas, minimum_gas_used};
use evm_execution::evm::HashResolver;
use evm_execution::prelude::*;
use proptest::prelude::*;

fn rules() -> ChainRules {
    ForkSchedule::all_active().rules(9000, 1)
}

fn header(height: u64) -> BlockHeader {
    BlockHeader {
        chain_id: "ledger_9000-1".into(),
        height,
        time: 1_700_000_000 + height,
        ..BlockHeader::default()
    }
}

fn store_up_to(height: u64) -> InMemoryHeaderStore {
    let mut store = InMemoryHeaderStore::new();
    for h in 1..height {
        store.record(&header(h));
    }
    store
}

proptest! {
    #[test]
    fn prop_intrinsic_gas_monotonic_in_payload(
        payload in prop::collection::vec(any::<u8>(), 0..512),
        extra in prop::collection::vec(any::<u8>(), 1..64),
        is_creation in any::<bool>(),
    ) {
        let rules = rules();
        let base = intrinsic_gas(&payload, &[], is_creation, &rules).unwrap();
        let mut longer = payload.clone();
        longer.extend_from_slice(&extra);
        let grown = intrinsic_gas(&longer, &[], is_creation, &rules).unwrap();
        prop_assert!(grown > base);
    }

    #[test]
    fn prop_intrinsic_gas_monotonic_in_access_list(
        keys in 0usize..16,
        more in 1usize..16,
    ) {
        let rules = rules();
        let tuple = |n: usize| AccessTuple {
            address: Address::from_low_u64(1),
            storage_keys: vec![Hash::ZERO; n],
        };
        let base = intrinsic_gas(&[], &[tuple(keys)], false, &rules).unwrap();
        let grown = intrinsic_gas(&[], &[tuple(keys + more)], false, &rules).unwrap();
        prop_assert!(grown > base);
        prop_assert!(base >= gas::costs::TX_BASE + gas::costs::ACCESS_LIST_ADDRESS);
    }

    #[test]
    fn prop_refund_bounded(raw in any::<u64>(), used in any::<u64>(), london in any::<bool>()) {
        let quotient = if london { 5 } else { 2 };
        let refund = compute_refund(raw, used, quotient);
        prop_assert!(refund <= raw);
        prop_assert!(refund <= used / quotient);
    }

    #[test]
    fn prop_minimum_gas_never_exceeds_limit(limit in any::<u64>(), num in 0u64..100, extra in 0u64..100) {
        let floor = minimum_gas_used(limit, GasMultiplier::new(num, num + extra + 1)).unwrap();
        prop_assert!(floor <= limit);
    }

    #[test]
    fn prop_future_height_is_zero(current in 1u64..64, ahead in 1u64..1_000) {
        let store = store_up_to(current);
        let ctx = BlockContext::new(9000, current, 0).with_header(&header(current));
        let resolver = HashResolver::new(&store);
        prop_assert_eq!(resolver.resolve(&ctx, current + ahead), Hash::ZERO);
    }

    #[test]
    fn prop_resolve_idempotent(current in 2u64..64, target in 0u64..128) {
        let store = store_up_to(current);
        let ctx = BlockContext::new(9000, current, 0).with_header(&header(current));
        let resolver = HashResolver::new(&store);
        let first = resolver.resolve(&ctx, target);
        prop_assert_eq!(first, resolver.resolve(&ctx, target));
        if (1..=current).contains(&target) {
            prop_assert!(!first.is_zero());
        }
    }

    #[test]
    fn prop_registry_serde_round_trip(count in 1usize..12) {
        let mut registry = TokenPairRegistry::new();
        for i in 0..count {
            let owner = if i % 2 == 0 { OwnerKind::Module } else { OwnerKind::External };
            let address = Address::from_low_u64(0x1000 + i as u64);
            registry.register(TokenPair::new(address, format!("coin{i}"), owner)).unwrap();
        }

        let json = serde_json::to_string(&registry).unwrap();
        let restored: TokenPairRegistry = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&restored, &registry);
        for pair in registry.iter() {
            prop_assert_eq!(restored.lookup_by_address(&pair.address), Some(pair));
            prop_assert_eq!(restored.lookup(&pair.denom), Some(pair));
        }
    }
}

#[test]
fn test_registry_rejects_duplicate_address_on_load() {
    let pair = |denom: &str| TokenPair::new(Address::new([0xAA; 20]), denom, OwnerKind::External);
    let json = serde_json::to_string(&vec![pair("uone"), pair("utwo")]).unwrap();
    let err = serde_json::from_str::<TokenPairRegistry>(&json).unwrap_err();
    assert!(err.to_string().contains("already registered"));
}
