//! # ERC20 Bridge Through the Engine
//!
//! Token pair precompiles reached by ordinary messages: allowances backed by
//! authorization grants, expiry, and rollback of failed bridge calls.

use evm_execution::evm::precompiles::abi::{
    approval_event_topic, encode_call, encode_revert_reason, selectors, transfer_event_topic,
    uint_word,
};
use evm_execution::prelude::*;

// =============================================================================
// TEST HELPERS
// =============================================================================

const FEE_DENOM: &str = "aledger";
const TOKEN: &str = "uusdx";
const PROPOSER: &[u8] = b"validator-1";
const APPROVED_AT: u64 = 1_000;
const EXPIRATION: u64 = 100;

type Engine =
    StateTransition<InMemoryLedger, InMemoryHeaderStore, NativeInterpreter, StaticValidatorSet>;

fn alice() -> Address {
    Address::from_low_u64(0xa11ce)
}

fn bob() -> Address {
    Address::from_low_u64(0xb0b)
}

fn carol() -> Address {
    Address::from_low_u64(0xca401)
}

fn token() -> Address {
    Address::new([0x22; 20])
}

fn genesis(enabled: bool) -> GenesisState {
    GenesisState {
        params: Erc20Params {
            enable_erc20: enabled,
            native_precompiles: vec![],
            dynamic_precompiles: vec![token()],
        },
        token_pairs: vec![TokenPair::new(token(), TOKEN, OwnerKind::External)],
    }
}

fn engine(enabled: bool) -> Engine {
    let params = ExecutionParams {
        min_gas_multiplier: GasMultiplier::DISABLED,
        approval_expiration_secs: EXPIRATION,
        ..ExecutionParams::default()
    };
    let mut ledger = InMemoryLedger::new();
    ledger.create_account(&params.fee_collector);
    for account in [alice(), bob()] {
        ledger.mint(&account, FEE_DENOM, U256::from(10_000_000u64));
    }
    ledger.mint(&alice(), TOKEN, U256::from(1_000));

    StateTransition::from_genesis(
        ledger,
        InMemoryHeaderStore::new(),
        NativeInterpreter,
        StaticValidatorSet::new().with_validator(PROPOSER, Address::from_low_u64(0x0be7a7)),
        params,
        genesis(enabled),
    )
    .unwrap()
}

fn block_at(time: u64) -> BlockContext {
    BlockContext {
        proposer: PROPOSER.to_vec(),
        ..BlockContext::new(9000, 10, time)
    }
}

fn call_token(engine: &mut Engine, from: Address, input: Vec<u8>, time: u64) -> Receipt {
    let nonce = engine.state().nonce(&from);
    let msg = Message::call(
        from,
        token(),
        U256::zero(),
        Bytes::from(input),
        200_000,
        U256::one(),
        nonce,
    );
    engine
        .apply_message(&msg, &block_at(time), &mut ResourceMeter::infinite(), true)
        .unwrap()
}

fn approve(engine: &mut Engine, spender: Address, amount: u64) -> Receipt {
    let input = encode_call(
        selectors::APPROVE,
        &[spender.to_word(), uint_word(U256::from(amount))],
    );
    call_token(engine, alice(), input, APPROVED_AT)
}

fn transfer_from(engine: &mut Engine, amount: u64, time: u64) -> Receipt {
    let input = encode_call(
        selectors::TRANSFER_FROM,
        &[
            alice().to_word(),
            carol().to_word(),
            uint_word(U256::from(amount)),
        ],
    );
    call_token(engine, bob(), input, time)
}

fn allowance(engine: &mut Engine, time: u64) -> U256 {
    let input = encode_call(selectors::ALLOWANCE, &[alice().to_word(), bob().to_word()]);
    let sender = carol_funded(engine);
    let receipt = call_token(engine, sender, input, time);
    U256::from_big_endian(receipt.return_data.as_slice())
}

/// Carol only needs gas money for queries.
fn carol_funded(engine: &mut Engine) -> Address {
    if engine.state().balance(&carol(), FEE_DENOM).is_zero() {
        engine
            .state_mut()
            .mint(&carol(), FEE_DENOM, U256::from(10_000_000u64));
    }
    carol()
}

fn token_balance(engine: &Engine, account: Address) -> U256 {
    engine.state().balance(&account, TOKEN)
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn test_transfer_through_precompile() {
    let mut engine = engine(true);
    let input = encode_call(
        selectors::TRANSFER,
        &[carol().to_word(), uint_word(U256::from(250))],
    );
    let receipt = call_token(&mut engine, alice(), input, APPROVED_AT);

    assert!(!receipt.reverted);
    assert_eq!(token_balance(&engine, alice()), U256::from(750));
    assert_eq!(token_balance(&engine, carol()), U256::from(250));
    assert_eq!(receipt.logs.len(), 1);
    assert_eq!(receipt.logs[0].address, token());
    assert_eq!(receipt.logs[0].topics[0], transfer_event_topic());
}

#[test]
fn test_transfer_from_above_allowance_is_unauthorized() {
    let mut engine = engine(true);
    let receipt = approve(&mut engine, bob(), 50);
    assert_eq!(receipt.logs[0].topics[0], approval_event_topic());

    let receipt = transfer_from(&mut engine, 100, APPROVED_AT + 1);
    assert!(receipt.reverted);
    assert!(receipt.vm_error.starts_with("unauthorized"));
    assert_eq!(
        receipt.return_data.as_slice(),
        encode_revert_reason(&receipt.vm_error).as_slice()
    );
    assert!(receipt.logs.is_empty());

    assert_eq!(token_balance(&engine, alice()), U256::from(1_000));
    assert_eq!(token_balance(&engine, carol()), U256::zero());
    assert_eq!(allowance(&mut engine, APPROVED_AT + 1), U256::from(50));
}

#[test]
fn test_transfer_from_spends_allowance() {
    let mut engine = engine(true);
    approve(&mut engine, bob(), 50);

    let receipt = transfer_from(&mut engine, 30, APPROVED_AT + 1);
    assert!(!receipt.reverted);
    assert_eq!(token_balance(&engine, carol()), U256::from(30));
    assert_eq!(allowance(&mut engine, APPROVED_AT + 1), U256::from(20));

    // Spending the rest removes the grant entirely.
    transfer_from(&mut engine, 20, APPROVED_AT + 1);
    assert!(engine.state().grant(&alice(), &bob()).is_none());
}

#[test]
fn test_expired_grant_treated_as_absent() {
    let mut engine = engine(true);
    approve(&mut engine, bob(), 50);
    let expiry = APPROVED_AT + EXPIRATION;

    assert_eq!(allowance(&mut engine, expiry), U256::from(50));
    assert_eq!(allowance(&mut engine, expiry + 1), U256::zero());

    let receipt = transfer_from(&mut engine, 10, expiry + 1);
    assert!(receipt.reverted);
    assert!(receipt.vm_error.starts_with("unauthorized"));
    assert_eq!(token_balance(&engine, alice()), U256::from(1_000));

    let receipt = transfer_from(&mut engine, 10, expiry);
    assert!(!receipt.reverted);
    assert_eq!(token_balance(&engine, carol()), U256::from(10));
}

#[test]
fn test_failed_precompile_consumes_all_gas() {
    let mut engine = engine(true);
    let receipt = transfer_from(&mut engine, 1, APPROVED_AT);
    assert!(receipt.reverted);
    assert_eq!(receipt.gas_used, 200_000);
}

#[test]
fn test_value_to_precompile_reverts() {
    let mut engine = engine(true);
    let input = encode_call(selectors::TOTAL_SUPPLY, &[]);
    let msg = Message::call(
        alice(),
        token(),
        U256::from(5),
        Bytes::from(input),
        100_000,
        U256::one(),
        0,
    );
    let receipt = engine
        .apply_message(&msg, &block_at(APPROVED_AT), &mut ResourceMeter::infinite(), true)
        .unwrap();
    assert!(receipt.reverted);
    assert_eq!(receipt.vm_error, PrecompileError::NonPayable.to_string());
    assert_eq!(engine.state().balance(&token(), FEE_DENOM), U256::zero());
}

#[test]
fn test_queries() {
    let mut engine = engine(true);
    let sender = carol_funded(&mut engine);

    let input = encode_call(selectors::BALANCE_OF, &[alice().to_word()]);
    let receipt = call_token(&mut engine, sender, input, APPROVED_AT);
    assert_eq!(
        U256::from_big_endian(receipt.return_data.as_slice()),
        U256::from(1_000)
    );

    let input = encode_call(selectors::TOTAL_SUPPLY, &[]);
    let receipt = call_token(&mut engine, sender, input, APPROVED_AT);
    assert_eq!(
        U256::from_big_endian(receipt.return_data.as_slice()),
        U256::from(1_000)
    );
}

#[test]
fn test_disabled_bridge_is_plain_account() {
    let mut engine = engine(false);
    let input = encode_call(
        selectors::TRANSFER,
        &[carol().to_word(), uint_word(U256::from(250))],
    );
    let receipt = call_token(&mut engine, alice(), input, APPROVED_AT);

    assert!(!receipt.reverted);
    assert!(receipt.return_data.as_slice().is_empty());
    assert_eq!(token_balance(&engine, carol()), U256::zero());
}

#[test]
fn test_toggled_pair_is_not_exposed() {
    let mut engine = engine(true);
    engine.registry_mut().toggle(TOKEN).unwrap();

    let input = encode_call(
        selectors::TRANSFER,
        &[carol().to_word(), uint_word(U256::from(250))],
    );
    call_token(&mut engine, alice(), input, APPROVED_AT);
    assert_eq!(token_balance(&engine, carol()), U256::zero());
}
