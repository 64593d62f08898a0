//! # ERC20 Bridge Precompile
//!
//! Exposes one host denomination through the ERC-20 interface. Balances live
//! in the host ledger; allowances are authorization grants from the owner to
//! the spender, so they obey the same expiry and allow-list rules as grants
//! created outside the EVM.

use super::abi::{self, selectors, ArgReader};
use super::{Precompile, PrecompileCall, PrecompileOutput};
use crate::domain::entities::{AuthorizationGrant, Log};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::PrecompileError;
use crate::ports::outbound::StateDb;
use tracing::debug;

/// Base gas of state-changing methods.
pub const TX_BASE_GAS: u64 = 2_000;
/// Per-input-byte gas of state-changing methods.
pub const TX_GAS_PER_BYTE: u64 = 30;
/// Base gas of queries.
pub const QUERY_BASE_GAS: u64 = 1_000;
/// Per-input-byte gas of queries.
pub const QUERY_GAS_PER_BYTE: u64 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    Transfer,
    TransferFrom,
    Approve,
    IncreaseAllowance,
    DecreaseAllowance,
    Allowance,
    BalanceOf,
    TotalSupply,
}

impl Method {
    fn from_selector(selector: [u8; 4]) -> Option<Self> {
        Some(match selector {
            selectors::TRANSFER => Self::Transfer,
            selectors::TRANSFER_FROM => Self::TransferFrom,
            selectors::APPROVE => Self::Approve,
            selectors::INCREASE_ALLOWANCE => Self::IncreaseAllowance,
            selectors::DECREASE_ALLOWANCE => Self::DecreaseAllowance,
            selectors::ALLOWANCE => Self::Allowance,
            selectors::BALANCE_OF => Self::BalanceOf,
            selectors::TOTAL_SUPPLY => Self::TotalSupply,
            _ => return None,
        })
    }

    const fn is_transaction(self) -> bool {
        matches!(
            self,
            Self::Transfer
                | Self::TransferFrom
                | Self::Approve
                | Self::IncreaseAllowance
                | Self::DecreaseAllowance
        )
    }

    fn required_gas(self, input_len: usize) -> u64 {
        let (base, per_byte) = if self.is_transaction() {
            (TX_BASE_GAS, TX_GAS_PER_BYTE)
        } else {
            (QUERY_BASE_GAS, QUERY_GAS_PER_BYTE)
        };
        (input_len as u64)
            .saturating_mul(per_byte)
            .saturating_add(base)
    }
}

/// ERC-20 view of a single host denomination.
#[derive(Clone, Debug)]
pub struct Erc20Precompile {
    address: Address,
    denom: String,
    approval_expiration_secs: u64,
}

impl Erc20Precompile {
    /// Creates the precompile for `denom` at `address`.
    #[must_use]
    pub fn new(address: Address, denom: impl Into<String>, approval_expiration_secs: u64) -> Self {
        Self {
            address,
            denom: denom.into(),
            approval_expiration_secs,
        }
    }

    /// Bound denomination.
    #[must_use]
    pub fn denom(&self) -> &str {
        &self.denom
    }

    fn emit(&self, state: &mut dyn StateDb, topic: Hash, from: Address, to: Address, amount: U256) {
        state.add_log(Log::new(
            self.address,
            vec![topic, Hash::from_address(from), Hash::from_address(to)],
            Bytes::from(abi::encode_uint(amount)),
        ));
    }

    /// Grant from `owner` to `spender`, treating expired grants as absent.
    fn live_grant(
        state: &dyn StateDb,
        owner: &Address,
        spender: &Address,
        block_time: u64,
    ) -> Option<AuthorizationGrant> {
        state
            .grant(owner, spender)
            .filter(|grant| !grant.is_expired(block_time))
    }

    fn move_funds(
        &self,
        state: &mut dyn StateDb,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), PrecompileError> {
        let available = state.balance(&from, &self.denom);
        if available < amount {
            return Err(PrecompileError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        state.transfer(&from, &to, &self.denom, amount)?;
        self.emit(state, abi::transfer_event_topic(), from, to, amount);
        Ok(())
    }

    fn transfer(
        &self,
        call: &PrecompileCall<'_>,
        args: &[u8],
        state: &mut dyn StateDb,
    ) -> Result<Vec<u8>, PrecompileError> {
        let mut reader = ArgReader::new(args, 2)?;
        let to = reader.address()?;
        let amount = reader.uint()?;

        self.move_funds(state, call.caller, to, amount)?;
        Ok(abi::encode_bool(true))
    }

    fn transfer_from(
        &self,
        call: &PrecompileCall<'_>,
        args: &[u8],
        state: &mut dyn StateDb,
    ) -> Result<Vec<u8>, PrecompileError> {
        let mut reader = ArgReader::new(args, 3)?;
        let from = reader.address()?;
        let to = reader.address()?;
        let amount = reader.uint()?;

        if from == call.caller {
            self.move_funds(state, from, to, amount)?;
            return Ok(abi::encode_bool(true));
        }

        let mut grant = Self::live_grant(state, &from, &call.caller, call.block_time)
            .ok_or_else(|| {
                PrecompileError::Unauthorized(format!(
                    "no authorization from {from:?} to {:?}",
                    call.caller
                ))
            })?;

        if !grant.allows_recipient(&to) {
            return Err(PrecompileError::Unauthorized(format!(
                "recipient {to:?} is not in the allow list"
            )));
        }

        let limit = grant.limit_for(&self.denom);
        if limit < amount {
            return Err(PrecompileError::Unauthorized(format!(
                "requested amount {amount} exceeds allowance {limit}"
            )));
        }

        self.move_funds(state, from, to, amount)?;

        grant.set_limit(&self.denom, limit - amount);
        if grant.spend_limit.is_empty() {
            state.revoke_grant(&from, &call.caller);
        } else {
            state.set_grant(grant);
        }
        Ok(abi::encode_bool(true))
    }

    fn approve(
        &self,
        call: &PrecompileCall<'_>,
        args: &[u8],
        state: &mut dyn StateDb,
    ) -> Result<Vec<u8>, PrecompileError> {
        let mut reader = ArgReader::new(args, 2)?;
        let spender = reader.address()?;
        let amount = reader.uint()?;
        let owner = call.caller;

        match Self::live_grant(state, &owner, &spender, call.block_time) {
            Some(mut grant) => {
                grant.set_limit(&self.denom, amount);
                if grant.spend_limit.is_empty() {
                    state.revoke_grant(&owner, &spender);
                } else {
                    state.set_grant(grant);
                }
            }
            None if amount.is_zero() => {
                // An expired leftover is cleared, nothing else to do.
                state.revoke_grant(&owner, &spender);
            }
            None => {
                let expiration = call.block_time.saturating_add(self.approval_expiration_secs);
                state.set_grant(AuthorizationGrant::new(
                    owner,
                    spender,
                    self.denom.clone(),
                    amount,
                    Some(expiration),
                ));
            }
        }

        self.emit(state, abi::approval_event_topic(), owner, spender, amount);
        Ok(abi::encode_bool(true))
    }

    fn adjust_allowance(
        &self,
        call: &PrecompileCall<'_>,
        args: &[u8],
        state: &mut dyn StateDb,
        increase: bool,
    ) -> Result<Vec<u8>, PrecompileError> {
        let mut reader = ArgReader::new(args, 2)?;
        let spender = reader.address()?;
        let delta = reader.uint()?;
        let owner = call.caller;

        let mut grant = Self::live_grant(state, &owner, &spender, call.block_time)
            .ok_or_else(|| {
                PrecompileError::Unauthorized(format!(
                    "no allowance from {owner:?} to {spender:?}"
                ))
            })?;

        let current = grant.limit_for(&self.denom);
        let updated = if increase {
            current.checked_add(delta)
        } else {
            current.checked_sub(delta)
        }
        .ok_or(PrecompileError::AllowanceOverflow)?;

        grant.set_limit(&self.denom, updated);
        if grant.spend_limit.is_empty() {
            state.revoke_grant(&owner, &spender);
        } else {
            state.set_grant(grant);
        }

        self.emit(state, abi::approval_event_topic(), owner, spender, updated);
        Ok(abi::encode_bool(true))
    }

    fn allowance(
        &self,
        call: &PrecompileCall<'_>,
        args: &[u8],
        state: &dyn StateDb,
    ) -> Result<Vec<u8>, PrecompileError> {
        let mut reader = ArgReader::new(args, 2)?;
        let owner = reader.address()?;
        let spender = reader.address()?;

        let remaining = Self::live_grant(state, &owner, &spender, call.block_time)
            .map(|grant| grant.limit_for(&self.denom))
            .unwrap_or_default();
        Ok(abi::encode_uint(remaining))
    }
}

impl Precompile for Erc20Precompile {
    fn address(&self) -> Address {
        self.address
    }

    fn run(
        &self,
        call: &PrecompileCall<'_>,
        state: &mut dyn StateDb,
    ) -> Result<PrecompileOutput, PrecompileError> {
        let (selector, args) = abi::split_selector(call.input)?;
        let method =
            Method::from_selector(selector).ok_or(PrecompileError::UnknownMethod(selector))?;

        let gas_used = method.required_gas(call.input.len());
        if gas_used > call.gas_limit {
            return Err(PrecompileError::OutOfGas);
        }
        if !call.value.is_zero() {
            return Err(PrecompileError::NonPayable);
        }
        if call.is_static && method.is_transaction() {
            return Err(PrecompileError::WriteProtection);
        }

        debug!(
            precompile = ?self.address,
            denom = %self.denom,
            ?method,
            caller = ?call.caller,
            "ERC20 precompile call"
        );

        let output = match method {
            Method::Transfer => self.transfer(call, args, state)?,
            Method::TransferFrom => self.transfer_from(call, args, state)?,
            Method::Approve => self.approve(call, args, state)?,
            Method::IncreaseAllowance => self.adjust_allowance(call, args, state, true)?,
            Method::DecreaseAllowance => self.adjust_allowance(call, args, state, false)?,
            Method::Allowance => self.allowance(call, args, state)?,
            Method::BalanceOf => {
                let account = ArgReader::new(args, 1)?.address()?;
                abi::encode_uint(state.balance(&account, &self.denom))
            }
            Method::TotalSupply => {
                ArgReader::new(args, 0)?;
                abi::encode_uint(state.total_supply(&self.denom))
            }
        };

        Ok(PrecompileOutput {
            gas_used,
            output: Bytes::from(output),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLedger;
    use crate::evm::precompiles::abi::{encode_call, uint_word};
    use crate::ports::outbound::{GrantStore, Ledger, LogSink};

    const DENOM: &str = "uusdx";

    fn setup() -> (Erc20Precompile, InMemoryLedger, Address, Address) {
        let precompile = Erc20Precompile::new(Address::new([0xAA; 20]), DENOM, 3_600);
        let mut ledger = InMemoryLedger::new();
        let alice = Address::from_low_u64(0xa11ce);
        let bob = Address::from_low_u64(0xb0b);
        ledger.mint(&alice, DENOM, U256::from(1_000));
        (precompile, ledger, alice, bob)
    }

    fn call<'a>(input: &'a [u8], caller: Address) -> PrecompileCall<'a> {
        PrecompileCall {
            input,
            caller,
            value: U256::zero(),
            gas_limit: 100_000,
            is_static: false,
            block_time: 1_000,
        }
    }

    fn decode_uint(output: &PrecompileOutput) -> U256 {
        U256::from_big_endian(output.output.as_slice())
    }

    #[test]
    fn test_transfer_moves_balance_and_logs() {
        let (precompile, mut ledger, alice, bob) = setup();
        let input = encode_call(selectors::TRANSFER, &[bob.to_word(), uint_word(U256::from(300))]);

        let out = precompile.run(&call(&input, alice), &mut ledger).unwrap();
        assert_eq!(out.gas_used, TX_BASE_GAS + TX_GAS_PER_BYTE * 68);
        assert_eq!(ledger.balance(&alice, DENOM), U256::from(700));
        assert_eq!(ledger.balance(&bob, DENOM), U256::from(300));

        let logs = ledger.take_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].topics[0], abi::transfer_event_topic());
        assert_eq!(logs[0].topics[2], Hash::from_address(bob));
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let (precompile, mut ledger, alice, bob) = setup();
        let input = encode_call(selectors::TRANSFER, &[alice.to_word(), uint_word(U256::from(1))]);
        let err = precompile.run(&call(&input, bob), &mut ledger).unwrap_err();
        assert_eq!(
            err,
            PrecompileError::InsufficientFunds {
                required: U256::from(1),
                available: U256::zero()
            }
        );
    }

    #[test]
    fn test_approve_then_allowance() {
        let (precompile, mut ledger, alice, bob) = setup();
        let approve = encode_call(selectors::APPROVE, &[bob.to_word(), uint_word(U256::from(50))]);
        precompile.run(&call(&approve, alice), &mut ledger).unwrap();

        let grant = ledger.grant(&alice, &bob).unwrap();
        assert_eq!(grant.expiration, Some(1_000 + 3_600));

        let query = encode_call(selectors::ALLOWANCE, &[alice.to_word(), bob.to_word()]);
        let out = precompile.run(&call(&query, bob), &mut ledger).unwrap();
        assert_eq!(out.gas_used, QUERY_BASE_GAS + QUERY_GAS_PER_BYTE * 68);
        assert_eq!(decode_uint(&out), U256::from(50));
    }

    #[test]
    fn test_approve_zero_revokes() {
        let (precompile, mut ledger, alice, bob) = setup();
        let approve = encode_call(selectors::APPROVE, &[bob.to_word(), uint_word(U256::from(50))]);
        precompile.run(&call(&approve, alice), &mut ledger).unwrap();

        let revoke = encode_call(selectors::APPROVE, &[bob.to_word(), uint_word(U256::zero())]);
        precompile.run(&call(&revoke, alice), &mut ledger).unwrap();
        assert!(ledger.grant(&alice, &bob).is_none());
    }

    #[test]
    fn test_transfer_from_within_limit() {
        let (precompile, mut ledger, alice, bob) = setup();
        let carol = Address::from_low_u64(0xca01);
        ledger.set_grant(AuthorizationGrant::new(alice, bob, DENOM, U256::from(50), None));

        let input = encode_call(
            selectors::TRANSFER_FROM,
            &[alice.to_word(), carol.to_word(), uint_word(U256::from(20))],
        );
        precompile.run(&call(&input, bob), &mut ledger).unwrap();

        assert_eq!(ledger.balance(&carol, DENOM), U256::from(20));
        assert_eq!(ledger.grant(&alice, &bob).unwrap().limit_for(DENOM), U256::from(30));
    }

    #[test]
    fn test_transfer_from_exhausting_grant_deletes_it() {
        let (precompile, mut ledger, alice, bob) = setup();
        ledger.set_grant(AuthorizationGrant::new(alice, bob, DENOM, U256::from(50), None));

        let input = encode_call(
            selectors::TRANSFER_FROM,
            &[alice.to_word(), bob.to_word(), uint_word(U256::from(50))],
        );
        precompile.run(&call(&input, bob), &mut ledger).unwrap();
        assert!(ledger.grant(&alice, &bob).is_none());
    }

    #[test]
    fn test_transfer_from_self_needs_no_grant() {
        let (precompile, mut ledger, alice, bob) = setup();
        let input = encode_call(
            selectors::TRANSFER_FROM,
            &[alice.to_word(), bob.to_word(), uint_word(U256::from(10))],
        );
        precompile.run(&call(&input, alice), &mut ledger).unwrap();
        assert_eq!(ledger.balance(&bob, DENOM), U256::from(10));
    }

    #[test]
    fn test_transfer_from_disallowed_recipient() {
        let (precompile, mut ledger, alice, bob) = setup();
        let carol = Address::from_low_u64(0xca01);
        ledger.set_grant(
            AuthorizationGrant::new(alice, bob, DENOM, U256::from(50), None)
                .with_allow_list(vec![bob]),
        );

        let input = encode_call(
            selectors::TRANSFER_FROM,
            &[alice.to_word(), carol.to_word(), uint_word(U256::from(10))],
        );
        let err = precompile.run(&call(&input, bob), &mut ledger).unwrap_err();
        assert!(matches!(err, PrecompileError::Unauthorized(_)));
    }

    #[test]
    fn test_adjust_allowance() {
        let (precompile, mut ledger, alice, bob) = setup();
        ledger.set_grant(AuthorizationGrant::new(alice, bob, DENOM, U256::from(50), None));

        let inc = encode_call(
            selectors::INCREASE_ALLOWANCE,
            &[bob.to_word(), uint_word(U256::from(25))],
        );
        precompile.run(&call(&inc, alice), &mut ledger).unwrap();
        assert_eq!(ledger.grant(&alice, &bob).unwrap().limit_for(DENOM), U256::from(75));

        let dec = encode_call(
            selectors::DECREASE_ALLOWANCE,
            &[bob.to_word(), uint_word(U256::from(100))],
        );
        let err = precompile.run(&call(&dec, alice), &mut ledger).unwrap_err();
        assert_eq!(err, PrecompileError::AllowanceOverflow);

        let overflow = encode_call(
            selectors::INCREASE_ALLOWANCE,
            &[bob.to_word(), uint_word(U256::MAX)],
        );
        let err = precompile.run(&call(&overflow, alice), &mut ledger).unwrap_err();
        assert_eq!(err, PrecompileError::AllowanceOverflow);
    }

    #[test]
    fn test_adjust_missing_allowance_fails() {
        let (precompile, mut ledger, alice, bob) = setup();
        let inc = encode_call(
            selectors::INCREASE_ALLOWANCE,
            &[bob.to_word(), uint_word(U256::from(1))],
        );
        let err = precompile.run(&call(&inc, alice), &mut ledger).unwrap_err();
        assert!(matches!(err, PrecompileError::Unauthorized(_)));
    }

    #[test]
    fn test_queries() {
        let (precompile, mut ledger, alice, _) = setup();
        let balance = encode_call(selectors::BALANCE_OF, &[alice.to_word()]);
        let out = precompile.run(&call(&balance, alice), &mut ledger).unwrap();
        assert_eq!(decode_uint(&out), U256::from(1_000));

        let supply = encode_call(selectors::TOTAL_SUPPLY, &[]);
        let out = precompile.run(&call(&supply, alice), &mut ledger).unwrap();
        assert_eq!(decode_uint(&out), U256::from(1_000));
    }

    #[test]
    fn test_call_guards() {
        let (precompile, mut ledger, alice, bob) = setup();
        let input = encode_call(selectors::TRANSFER, &[bob.to_word(), uint_word(U256::from(1))]);

        let unknown = [0xde, 0xad, 0xbe, 0xef];
        assert_eq!(
            precompile.run(&call(&unknown, alice), &mut ledger).unwrap_err(),
            PrecompileError::UnknownMethod(unknown)
        );

        let mut low_gas = call(&input, alice);
        low_gas.gas_limit = 100;
        assert_eq!(
            precompile.run(&low_gas, &mut ledger).unwrap_err(),
            PrecompileError::OutOfGas
        );

        let mut paying = call(&input, alice);
        paying.value = U256::one();
        assert_eq!(
            precompile.run(&paying, &mut ledger).unwrap_err(),
            PrecompileError::NonPayable
        );

        let mut read_only = call(&input, alice);
        read_only.is_static = true;
        assert_eq!(
            precompile.run(&read_only, &mut ledger).unwrap_err(),
            PrecompileError::WriteProtection
        );

        let query = encode_call(selectors::BALANCE_OF, &[alice.to_word()]);
        let mut static_query = call(&query, alice);
        static_query.is_static = true;
        assert!(precompile.run(&static_query, &mut ledger).is_ok());
    }
}
