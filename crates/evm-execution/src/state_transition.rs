//! # State Transition
//!
//! Applies one EVM message to the ledger:
//!
//! ```text
//! Validated -> GasComputed -> Executed | Reverted -> Refunded -> Settled
//! ```
//!
//! Everything from gas purchase onwards runs inside a message scope on the
//! ledger. Interpreter writes run inside a nested execution scope that is
//! dropped when execution fails, so a reverted message still pays for gas.
//! Any error after the purchase rolls the whole message scope back.

use crate::config::ExecutionParams;
use crate::domain::entities::{
    BlockContext, FeeTerms, GasState, Message, Receipt, TransitionPhase,
};
use crate::domain::value_objects::U256;
use crate::errors::{ConfigError, GenesisError, LedgerError, TransitionError, ValidationError};
use crate::evm::execution_config::ExecutionConfig;
use crate::evm::gas::{intrinsic_gas, minimum_gas_used, MAX_INIT_CODE_SIZE};
use crate::evm::host::ExecutionHost;
use crate::evm::meter::{reconcile_resource_meter, ResourceMeter};
use crate::evm::precompiles::PrecompileSet;
use crate::genesis::GenesisState;
use crate::metrics;
use crate::ports::inbound::MessageExecutor;
use crate::ports::outbound::{
    HeaderStore, Interpreter, InterpreterResult, ScopeId, StateDb, Tracer, ValidatorSet,
};
use crate::registry::TokenPairRegistry;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// VM error reported when access control blocks a message.
pub const ERR_PERMISSION_DENIED: &str = "permission denied";

/// The state transition engine.
pub struct StateTransition<S, H, I, V>
where
    S: StateDb,
    H: HeaderStore,
    I: Interpreter,
    V: ValidatorSet,
{
    state: S,
    headers: H,
    interpreter: I,
    validators: V,
    params: ExecutionParams,
    registry: TokenPairRegistry,
    /// Precompile table and the height it was built for.
    precompiles: Option<(u64, Arc<PrecompileSet>)>,
    tracer: Option<Arc<dyn Tracer>>,
    proposer: Vec<u8>,
}

impl<S, H, I, V> StateTransition<S, H, I, V>
where
    S: StateDb,
    H: HeaderStore,
    I: Interpreter,
    V: ValidatorSet,
{
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns error if `params` fail validation.
    pub fn new(
        state: S,
        headers: H,
        interpreter: I,
        validators: V,
        params: ExecutionParams,
        registry: TokenPairRegistry,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            state,
            headers,
            interpreter,
            validators,
            params,
            registry,
            precompiles: None,
            tracer: None,
            proposer: Vec::new(),
        })
    }

    /// Creates an engine from a genesis document.
    ///
    /// Genesis ERC20 parameters replace `params.erc20`.
    ///
    /// # Errors
    ///
    /// Returns error if the genesis is invalid or the resulting parameters
    /// fail validation.
    pub fn from_genesis(
        state: S,
        headers: H,
        interpreter: I,
        validators: V,
        mut params: ExecutionParams,
        genesis: GenesisState,
    ) -> Result<Self, GenesisError> {
        let (erc20, registry) = genesis.into_parts()?;
        params.erc20 = erc20;
        Ok(Self::new(state, headers, interpreter, validators, params, registry)?)
    }

    /// Reports every message to `tracer`.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Credits `COINBASE` to this proposer instead of the block proposer.
    /// An empty value restores the default.
    pub fn set_proposer(&mut self, proposer: impl Into<Vec<u8>>) {
        self.proposer = proposer.into();
    }

    /// Ledger state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable ledger state, for block-level operations between messages.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Historical headers.
    pub fn headers_mut(&mut self) -> &mut H {
        &mut self.headers
    }

    /// Execution parameters.
    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    /// Token pair registry.
    pub fn registry(&self) -> &TokenPairRegistry {
        &self.registry
    }

    /// Mutable registry. The precompile table is rebuilt on next use.
    pub fn registry_mut(&mut self) -> &mut TokenPairRegistry {
        self.precompiles = None;
        &mut self.registry
    }

    /// Replaces the parameters. The precompile table is rebuilt on next use.
    ///
    /// # Errors
    ///
    /// Returns error if `params` fail validation; the old ones stay.
    pub fn update_params(&mut self, params: ExecutionParams) -> Result<(), ConfigError> {
        params.validate()?;
        self.params = params;
        self.precompiles = None;
        Ok(())
    }

    /// Precompile table for `height`, built on first use per block.
    ///
    /// # Errors
    ///
    /// Returns error if the ERC20 parameters and the registry disagree.
    pub fn precompiles_for(&mut self, height: u64) -> Result<Arc<PrecompileSet>, TransitionError> {
        if let Some((built_at, set)) = &self.precompiles {
            if *built_at == height {
                return Ok(Arc::clone(set));
            }
        }
        let set = Arc::new(PrecompileSet::build(
            &self.registry,
            &self.params.erc20,
            self.params.approval_expiration_secs,
        )?);
        metrics::set_precompile_table_size(set.len());
        self.precompiles = Some((height, Arc::clone(&set)));
        Ok(set)
    }

    /// Pre-execution checks. Returns the effective gas price.
    fn validate(
        &self,
        config: &ExecutionConfig,
        msg: &Message,
        meter_limit: u64,
    ) -> Result<U256, ValidationError> {
        let rules = &config.rules;

        if msg.gas_limit > meter_limit {
            return Err(ValidationError::GasLimitExceedsMeter {
                gas_limit: msg.gas_limit,
                meter_limit,
            });
        }
        if msg.fee.is_dynamic() && !rules.is_london {
            return Err(ValidationError::DynamicFeeNotSupported);
        }
        if !msg.access_list.is_empty() && !rules.is_berlin {
            return Err(ValidationError::AccessListNotSupported);
        }
        if let FeeTerms::Dynamic { fee_cap, tip_cap } = msg.fee {
            if tip_cap > fee_cap {
                return Err(ValidationError::TipAboveFeeCap {
                    tip: tip_cap,
                    fee_cap,
                });
            }
        }
        if let (true, Some(base_fee)) = (rules.is_london, config.base_fee) {
            let fee_cap = msg.fee.max_gas_price();
            if fee_cap < base_fee {
                return Err(ValidationError::FeeCapBelowBaseFee { fee_cap, base_fee });
            }
        }
        if msg.is_contract_creation() && rules.is_shanghai && msg.data.len() > MAX_INIT_CODE_SIZE {
            return Err(ValidationError::InitCodeTooLarge {
                size: msg.data.len(),
                max: MAX_INIT_CODE_SIZE,
            });
        }

        let expected = self.state.nonce(&msg.from);
        if expected != msg.nonce {
            return Err(ValidationError::NonceMismatch {
                expected,
                got: msg.nonce,
            });
        }

        let price = msg.fee.effective_gas_price(config.base_fee);
        let required = price
            .checked_mul(U256::from(msg.gas_limit))
            .and_then(|fee| fee.checked_add(msg.value))
            .ok_or(ValidationError::CostOverflow)?;
        let available = self.state.balance(&msg.from, &config.evm_denom);
        if available < required {
            return Err(ValidationError::InsufficientBalance {
                required,
                available,
            });
        }

        Ok(price)
    }

    /// Phases after gas purchase. Runs inside the message scope.
    fn execute_phases(
        &mut self,
        config: &ExecutionConfig,
        msg: &Message,
        block: &BlockContext,
        meter: &mut ResourceMeter,
        price: U256,
        intrinsic: u64,
    ) -> Result<Receipt, TransitionError> {
        let mut phases = vec![TransitionPhase::Validated];
        let denom = config.evm_denom.as_str();
        let collector = config.fee_collector;

        // GasComputed: buy the whole gas limit up front.
        if !self.state.account_exists(&collector) {
            return Err(TransitionError::FeeSettlement(LedgerError::UnknownAccount(
                collector,
            )));
        }
        let purchase = price.saturating_mul(U256::from(msg.gas_limit));
        self.state
            .transfer(&msg.from, &collector, denom, purchase)
            .map_err(TransitionError::FeeSettlement)?;
        phases.push(TransitionPhase::GasComputed);

        // Executed / Reverted
        self.state.set_nonce(&msg.from, msg.nonce.saturating_add(1));

        let available = msg.gas_limit - intrinsic;
        let policy = config.access_control.for_message(msg.is_contract_creation());
        let result = if policy.allows(&msg.from) {
            self.run_interpreter(config, msg, block, available)?
        } else {
            warn!(
                sender = ?msg.from,
                create = msg.is_contract_creation(),
                "Message blocked by access control"
            );
            InterpreterResult::failure(0, ERR_PERMISSION_DENIED)
        };
        phases.push(if result.reverted {
            TransitionPhase::Reverted
        } else {
            TransitionPhase::Executed
        });

        // Refunded
        let mut gas = GasState::new(msg.gas_limit);
        gas.consume(intrinsic);
        gas.consume(result.gas_used);
        gas.add_refund(result.refund);
        let refunded = gas.settle_refund(config.rules.refund_quotient());
        let floor = minimum_gas_used(msg.gas_limit, config.min_gas_multiplier)?;
        gas.apply_floor(floor);
        reconcile_resource_meter(meter, gas.used());
        phases.push(TransitionPhase::Refunded);
        debug!(
            intrinsic,
            execution = result.gas_used,
            refunded,
            floor,
            charged = gas.used(),
            "Gas reconciled"
        );

        // Settled: return what was bought but not used.
        let leftover = gas.remaining();
        if leftover > msg.gas_limit {
            return Err(TransitionError::RefundExceedsGasLimit {
                leftover,
                limit: msg.gas_limit,
            });
        }
        if leftover > 0 {
            let refund = price.saturating_mul(U256::from(leftover));
            self.state
                .transfer(&collector, &msg.from, denom, refund)
                .map_err(TransitionError::FeeSettlement)?;
        }
        phases.push(TransitionPhase::Settled);

        Ok(Receipt {
            gas_used: gas.used(),
            effective_gas_price: price,
            logs: self.state.take_logs(),
            reverted: result.reverted,
            vm_error: result.vm_error.unwrap_or_default(),
            return_data: result.return_data,
            contract_address: result.created,
            phases,
        })
    }

    /// Runs the interpreter inside its own scope.
    fn run_interpreter(
        &mut self,
        config: &ExecutionConfig,
        msg: &Message,
        block: &BlockContext,
        available: u64,
    ) -> Result<InterpreterResult, TransitionError> {
        let scope = self.state.begin_scope();
        let mut host = ExecutionHost::new(&mut self.state, &self.headers, block, &config.precompiles);
        let result = self.interpreter.execute(config, msg, available, &mut host);

        if result.gas_used > available {
            self.state.rollback_scope(scope)?;
            return Err(TransitionError::InterpreterGasOverflow {
                used: result.gas_used,
                available,
            });
        }

        if result.reverted {
            debug!(vm_error = ?result.vm_error, "Execution reverted");
            self.state.rollback_scope(scope)?;
        } else {
            self.state.commit_scope(scope)?;
        }
        Ok(result)
    }

    fn close_scope(&mut self, scope: ScopeId, commit: bool) -> Result<(), TransitionError> {
        if commit {
            self.state.commit_scope(scope)?;
        } else {
            self.state.rollback_scope(scope)?;
        }
        Ok(())
    }
}

impl<S, H, I, V> MessageExecutor for StateTransition<S, H, I, V>
where
    S: StateDb,
    H: HeaderStore,
    I: Interpreter,
    V: ValidatorSet,
{
    #[instrument(
        skip(self, msg, block, meter),
        fields(from = ?msg.from, nonce = msg.nonce, height = block.height)
    )]
    fn apply_message(
        &mut self,
        msg: &Message,
        block: &BlockContext,
        meter: &mut ResourceMeter,
        commit: bool,
    ) -> Result<Receipt, TransitionError> {
        let precompiles = self.precompiles_for(block.height)?;
        let mut config = ExecutionConfig::build(
            &self.params,
            block,
            &self.proposer,
            &self.validators,
            precompiles,
        )?;
        if let Some(tracer) = &self.tracer {
            config = config.with_tracer(Arc::clone(tracer));
        }

        let prechecked = self.validate(&config, msg, meter.limit()).map_err(TransitionError::from).and_then(
            |price| {
                let intrinsic = intrinsic_gas(
                    msg.data.as_slice(),
                    &msg.access_list,
                    msg.is_contract_creation(),
                    &config.rules,
                )?;
                if intrinsic > msg.gas_limit {
                    return Err(TransitionError::IntrinsicGasExceedsLimit {
                        intrinsic,
                        limit: msg.gas_limit,
                    });
                }
                Ok((price, intrinsic))
            },
        );
        let (price, intrinsic) = match prechecked {
            Ok(checked) => checked,
            Err(err) => {
                warn!(%err, "Message rejected");
                metrics::record_message_rejected(err.reason());
                return Err(err);
            }
        };

        if let Some(tracer) = &config.tracer {
            tracer.on_message_start(msg, block);
        }

        let scope = self.state.begin_scope();
        let receipt = match self.execute_phases(&config, msg, block, meter, price, intrinsic) {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(%err, "Message failed after gas purchase, rolling back");
                metrics::record_message_rejected(err.reason());
                self.state.rollback_scope(scope)?;
                return Err(err);
            }
        };
        self.close_scope(scope, commit)?;

        metrics::record_message_applied(receipt.gas_used, receipt.reverted);
        if let Some(tracer) = &config.tracer {
            tracer.on_message_end(&receipt);
        }
        info!(
            gas_used = receipt.gas_used,
            reverted = receipt.reverted,
            logs = receipt.logs.len(),
            commit,
            "Message applied"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryHeaderStore, InMemoryLedger, StaticValidatorSet};
    use crate::domain::entities::{OwnerKind, TokenPair};
    use crate::domain::rules::ForkSchedule;
    use crate::domain::value_objects::{Address, Bytes};
    use crate::evm::gas::GasMultiplier;
    use crate::evm::interpreter::NativeInterpreter;
    use crate::ports::outbound::{Host, Ledger};

    const PROPOSER: &[u8] = b"proposer";

    fn alice() -> Address {
        Address::from_low_u64(0xa11ce)
    }

    fn bob() -> Address {
        Address::from_low_u64(0xb0b)
    }

    fn block() -> BlockContext {
        BlockContext {
            proposer: PROPOSER.to_vec(),
            ..BlockContext::new(9000, 10, 1_700_000_000)
        }
    }

    fn params() -> ExecutionParams {
        ExecutionParams {
            min_gas_multiplier: GasMultiplier::DISABLED,
            ..ExecutionParams::default()
        }
    }

    fn engine_with<I: Interpreter>(
        interpreter: I,
        params: ExecutionParams,
    ) -> StateTransition<InMemoryLedger, InMemoryHeaderStore, I, StaticValidatorSet> {
        let mut ledger = InMemoryLedger::new();
        ledger.create_account(&params.fee_collector);
        ledger.mint(&alice(), &params.evm_denom, U256::from(10_000_000u64));
        let validators =
            StaticValidatorSet::new().with_validator(PROPOSER, Address::from_low_u64(0xc0ffee));
        StateTransition::new(
            ledger,
            InMemoryHeaderStore::new(),
            interpreter,
            validators,
            params,
            TokenPairRegistry::new(),
        )
        .unwrap()
    }

    fn transfer(gas_limit: u64) -> Message {
        Message::call(
            alice(),
            bob(),
            U256::from(100),
            Bytes::new(),
            gas_limit,
            U256::from(10),
            0,
        )
    }

    /// Reports more gas than it was handed.
    struct Greedy;

    impl Interpreter for Greedy {
        fn execute(
            &self,
            config: &ExecutionConfig,
            msg: &Message,
            gas: u64,
            host: &mut dyn Host,
        ) -> InterpreterResult {
            let to = msg.to.unwrap_or_default();
            host.state()
                .transfer(&msg.from, &to, &config.evm_denom, msg.value)
                .unwrap();
            InterpreterResult::success(gas + 1, Bytes::new())
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = ExecutionParams {
            evm_denom: String::new(),
            ..params()
        };
        let result = StateTransition::new(
            InMemoryLedger::new(),
            InMemoryHeaderStore::new(),
            NativeInterpreter,
            StaticValidatorSet::new(),
            bad,
            TokenPairRegistry::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dynamic_fee_requires_london() {
        let p = ExecutionParams {
            forks: ForkSchedule::frontier(),
            ..params()
        };
        let mut engine = engine_with(NativeInterpreter, p);
        let msg = transfer(21_000).with_fee(FeeTerms::Dynamic {
            fee_cap: U256::from(10),
            tip_cap: U256::from(1),
        });
        let err = engine
            .apply_message(&msg, &block(), &mut ResourceMeter::infinite(), true)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransaction(ValidationError::DynamicFeeNotSupported)
        );
    }

    #[test]
    fn test_tip_above_fee_cap_rejected() {
        let mut engine = engine_with(NativeInterpreter, params());
        let msg = transfer(21_000).with_fee(FeeTerms::Dynamic {
            fee_cap: U256::from(5),
            tip_cap: U256::from(6),
        });
        let err = engine
            .apply_message(&msg, &block(), &mut ResourceMeter::infinite(), true)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidTransaction(ValidationError::TipAboveFeeCap { .. })
        ));
    }

    #[test]
    fn test_fee_cap_below_base_fee_rejected() {
        let mut engine = engine_with(NativeInterpreter, params());
        let ctx = BlockContext {
            base_fee: Some(U256::from(20)),
            ..block()
        };
        let msg = transfer(21_000).with_fee(FeeTerms::Dynamic {
            fee_cap: U256::from(10),
            tip_cap: U256::from(1),
        });
        let err = engine
            .apply_message(&msg, &ctx, &mut ResourceMeter::infinite(), true)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidTransaction(ValidationError::FeeCapBelowBaseFee { .. })
        ));
    }

    #[test]
    fn test_legacy_price_below_base_fee_rejected() {
        let mut engine = engine_with(NativeInterpreter, params());
        let ctx = BlockContext {
            base_fee: Some(U256::from(20)),
            ..block()
        };
        let mut meter = ResourceMeter::infinite();
        let err = engine
            .apply_message(&transfer(21_000), &ctx, &mut meter, true)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransaction(ValidationError::FeeCapBelowBaseFee {
                fee_cap: U256::from(10),
                base_fee: U256::from(20),
            })
        );
        assert_eq!(engine.state().nonce(&alice()), 0);
        assert_eq!(meter.consumed(), 0);
    }

    #[test]
    fn test_base_fee_ignored_before_london() {
        let p = ExecutionParams {
            forks: ForkSchedule {
                london: None,
                shanghai: None,
                ..ForkSchedule::all_active()
            },
            ..params()
        };
        let mut engine = engine_with(NativeInterpreter, p);
        let ctx = BlockContext {
            base_fee: Some(U256::from(20)),
            ..block()
        };
        let receipt = engine
            .apply_message(&transfer(21_000), &ctx, &mut ResourceMeter::infinite(), true)
            .unwrap();
        assert_eq!(receipt.effective_gas_price, U256::from(10));
    }

    #[test]
    fn test_unknown_proposer_is_config_error() {
        let mut engine = engine_with(NativeInterpreter, params());
        let ctx = BlockContext {
            proposer: b"stranger".to_vec(),
            ..block()
        };
        let err = engine
            .apply_message(&transfer(21_000), &ctx, &mut ResourceMeter::infinite(), true)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::Config(ConfigError::CoinbaseResolution(_))
        ));
    }

    #[test]
    fn test_proposer_override() {
        let mut engine = engine_with(NativeInterpreter, params());
        let ctx = BlockContext {
            proposer: b"stranger".to_vec(),
            ..block()
        };
        engine.set_proposer(PROPOSER);
        assert!(engine
            .apply_message(&transfer(21_000), &ctx, &mut ResourceMeter::infinite(), true)
            .is_ok());
    }

    #[test]
    fn test_interpreter_gas_overflow_rolls_back_message() {
        let mut engine = engine_with(Greedy, params());
        let before = engine.state().balance(&alice(), "aledger");
        let mut meter = ResourceMeter::infinite();

        let err = engine
            .apply_message(&transfer(30_000), &block(), &mut meter, true)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InterpreterGasOverflow {
                used: 9_001,
                available: 9_000
            }
        );
        assert_eq!(engine.state().balance(&alice(), "aledger"), before);
        assert_eq!(engine.state().balance(&bob(), "aledger"), U256::zero());
        assert_eq!(engine.state().nonce(&alice()), 0);
        assert_eq!(engine.state().scope_depth(), 0);
        assert_eq!(meter.consumed(), 0);
    }

    #[test]
    fn test_precompile_table_cached_per_height() {
        let pair = TokenPair::new(Address::new([0x22; 20]), "uusdx", OwnerKind::External);
        let mut p = params();
        p.erc20.dynamic_precompiles = vec![pair.address];
        let mut engine = engine_with(NativeInterpreter, p);
        engine.registry_mut().register(pair).unwrap();

        let first = engine.precompiles_for(10).unwrap();
        let again = engine.precompiles_for(10).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.len(), 1);

        engine.registry_mut().toggle("uusdx").unwrap();
        let rebuilt = engine.precompiles_for(10).unwrap();
        assert!(rebuilt.is_empty());
    }

    #[test]
    fn test_unregistered_precompile_fails_message() {
        let mut p = params();
        p.erc20.dynamic_precompiles = vec![Address::new([0x22; 20])];
        let mut engine = engine_with(NativeInterpreter, p);
        let err = engine
            .apply_message(&transfer(21_000), &block(), &mut ResourceMeter::infinite(), true)
            .unwrap_err();
        assert_eq!(err.reason(), "registry");
    }

    #[test]
    fn test_update_params_keeps_old_on_error() {
        let mut engine = engine_with(NativeInterpreter, params());
        let bad = ExecutionParams {
            min_gas_multiplier: GasMultiplier::new(3, 2),
            ..params()
        };
        assert!(engine.update_params(bad).is_err());
        assert_eq!(engine.params(), &params());
    }
}
